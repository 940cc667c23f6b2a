//! Payload-free change notifications within a tab and across tabs.
//!
//! A [`ChangeBus`] plays the role of the origin-wide channel every tab listens
//! on. Each tab owns a [`ChangeNotifier`]: `notify()` runs the tab's own
//! handlers once, in subscription order, and posts the tab id on the bus.
//! Other tabs run their handlers from a listener task; a tab ignores its own
//! bus message, so no handler sees a single broadcast twice.
//!
//! Writes made through [`ChangeNotifier::commit`] also record the store
//! revision they produced, so a [`RevisionWatcher`] on the same tab only
//! signals revisions written by someone else.

mod watcher;

pub use watcher::RevisionWatcher;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::errors::StoreError;
use crate::store::Store;

/// Identifies the tab that raised a signal.
pub type TabId = u64;

static NEXT_TAB_ID: AtomicU64 = AtomicU64::new(1);

const BUS_CAPACITY: usize = 256;

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct HandlerRegistry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

type SharedRegistry = Arc<Mutex<HandlerRegistry>>;

/// Run every handler currently registered, outside the registry lock.
fn dispatch(registry: &SharedRegistry) -> usize {
    let handlers: Vec<Handler> = registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .handlers
        .iter()
        .map(|(_, h)| Arc::clone(h))
        .collect();

    for handler in &handlers {
        handler();
    }
    handlers.len()
}

/// Origin-wide broadcast channel shared by all tabs of a process.
#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<TabId>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

struct NotifierInner {
    tab_id: TabId,
    bus: ChangeBus,
    registry: SharedRegistry,
    listener: Option<JoinHandle<()>>,
    /// Highest store revision this tab has already signalled for
    seen_revision: tokio::sync::Mutex<i64>,
}

impl Drop for NotifierInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// One tab's view of the change signal.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

impl ChangeNotifier {
    /// Attach a new tab to the bus.
    ///
    /// Signals from other tabs are only delivered when this is called inside a
    /// Tokio runtime; outside one the notifier works for its own tab only.
    pub fn new(bus: &ChangeBus) -> Self {
        let tab_id = NEXT_TAB_ID.fetch_add(1, Ordering::Relaxed);
        let registry: SharedRegistry = Arc::default();

        let listener = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let receiver = bus.sender.subscribe();
                Some(runtime.spawn(listen(tab_id, receiver, Arc::clone(&registry))))
            }
            Err(_) => {
                tracing::warn!("Tab {} created outside a runtime; cross-tab signals disabled", tab_id);
                None
            }
        };

        Self {
            inner: Arc::new(NotifierInner {
                tab_id,
                bus: bus.clone(),
                registry,
                listener,
                seen_revision: tokio::sync::Mutex::new(0),
            }),
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.inner.tab_id
    }

    /// Tell this tab and every other tab that some collection may have changed.
    pub fn notify(&self) {
        let delivered = dispatch(&self.inner.registry);
        // No receivers just means no other tab is open
        let _ = self.inner.bus.sender.send(self.inner.tab_id);
        tracing::debug!(
            tab = self.inner.tab_id,
            local_handlers = delivered,
            "Change broadcast"
        );
    }

    /// Run `write` against `store`, record the revision it produced and notify.
    ///
    /// Nothing is signalled when the write fails.
    pub async fn commit<T, Fut>(&self, store: &Store, write: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut seen = self.inner.seen_revision.lock().await;
        let written = write.await?;
        match store.revision().await {
            Ok(revision) => *seen = (*seen).max(revision),
            Err(e) => tracing::warn!(tab = self.inner.tab_id, "Could not read revision after write: {}", e),
        }
        drop(seen);

        self.notify();
        Ok(written)
    }

    /// Record `revision` as observed; true when it is newer than anything seen so far.
    pub(crate) async fn observe_revision(&self, revision: i64) -> bool {
        let mut seen = self.inner.seen_revision.lock().await;
        if revision > *seen {
            *seen = revision;
            true
        } else {
            false
        }
    }

    /// Run this tab's handlers without telling other tabs.
    pub fn notify_local(&self) {
        dispatch(&self.inner.registry);
    }

    /// Register a handler for every signal this tab receives.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut registry = self
            .inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.next_id += 1;
        let id = registry.next_id;
        registry.handlers.push((id, Arc::new(handler)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner.registry),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .handlers
            .len()
    }
}

async fn listen(tab_id: TabId, mut receiver: broadcast::Receiver<TabId>, registry: SharedRegistry) {
    loop {
        match receiver.recv().await {
            Ok(origin) if origin == tab_id => continue,
            Ok(origin) => {
                tracing::trace!(tab = tab_id, origin, "Change signal from another tab");
                dispatch(&registry);
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                // Signals carry nothing, so one dispatch covers everything missed
                tracing::warn!(tab = tab_id, missed, "Change listener lagged");
                dispatch(&registry);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Handle returned by [`ChangeNotifier::subscribe`]; dropping it deregisters the handler.
#[must_use = "dropping a Subscription immediately deregisters its handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<HandlerRegistry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    /// Keep the handler registered for the lifetime of the notifier.
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .handlers
                .retain(|(id, _)| *id != self.id);
        }
    }
}
