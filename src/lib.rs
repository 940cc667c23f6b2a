//! HackMap local store
//!
//! Persistent collections for the hackathon directory, shared by every open
//! tab, with change signalling so each tab re-reads after any write.

pub mod api;
pub mod config;
pub mod errors;
pub mod mail;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod search;
pub mod seed;
pub mod store;
pub mod tab;

pub use api::CollectionApi;
pub use config::Config;
pub use errors::StoreError;
pub use notify::{ChangeBus, ChangeNotifier};
pub use store::Store;
pub use tab::Tab;

#[cfg(test)]
mod tests;
