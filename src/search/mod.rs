//! Tantivy-based search over the directory.
//!
//! Indexes hackathons and shared ideas with field boosting. The index is
//! derived data: it is rebuilt from a fresh snapshot after every change signal.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::models::{Hackathon, Idea};

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_TAGS: f32 = 8.0;
const BOOST_THEME: f32 = 6.0;
const BOOST_DESCRIPTION: f32 = 4.0;
const BOOST_LOCATION: f32 = 2.0;

const KIND_HACKATHON: &str = "hackathon";
const KIND_IDEA: &str = "idea";

/// What a search hit points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Hackathon,
    Idea,
}

/// Search hit with relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub kind: SearchKind,
    pub record_id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    kind: Field,
    record_id: Field,
    title: Field,
    theme: Field,
    description: Field,
    tags: Field,
    location: Field,
}

/// Full-text index over hackathons and ideas.
pub struct DirectoryIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl DirectoryIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| StoreError::Search(format!("Failed to create index directory: {}", e)))?;

        let (schema, fields) = build_schema();
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema))
            .map_err(|e| StoreError::Search(format!("Failed to open/create index: {}", e)))?;

        Self::from_index(index, fields)
    }

    /// Create an index that lives only in memory.
    pub fn in_memory() -> Result<Self, StoreError> {
        let (schema, fields) = build_schema();
        Self::from_index(Index::create_in_ram(schema), fields)
    }

    fn from_index(index: Index, fields: SearchFields) -> Result<Self, StoreError> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| StoreError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| StoreError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index.
    pub async fn rebuild(&self, hackathons: &[Hackathon], ideas: &[Idea]) -> Result<(), StoreError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;

        for hackathon in hackathons {
            writer.add_document(self.hackathon_document(hackathon))?;
        }
        for idea in ideas {
            writer.add_document(self.idea_document(idea))?;
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::debug!(
            hackathons = hackathons.len(),
            ideas = ideas.len(),
            "Search index rebuilt"
        );
        Ok(())
    }

    /// Search hackathons and ideas matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_boosts = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.tags, BOOST_TAGS),
            (self.fields.theme, BOOST_THEME),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.location, BOOST_LOCATION),
        ];

        // Validate against all fields first so malformed queries are reported
        let query_parser = QueryParser::for_index(
            &self.index,
            field_boosts.iter().map(|(field, _)| *field).collect(),
        );
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| StoreError::Search(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_boosts {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit + offset))
            .map_err(|e| StoreError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let kind = match doc.get_first(self.fields.kind)?.as_str()? {
                    KIND_HACKATHON => SearchKind::Hackathon,
                    KIND_IDEA => SearchKind::Idea,
                    _ => return None,
                };
                let record_id = doc.get_first(self.fields.record_id)?.as_str()?.to_string();
                Some(SearchResult {
                    kind,
                    record_id,
                    score,
                })
            })
            .collect();

        Ok(results)
    }

    fn hackathon_document(&self, hackathon: &Hackathon) -> TantivyDocument {
        doc!(
            self.fields.kind => KIND_HACKATHON,
            self.fields.record_id => hackathon.id.clone(),
            self.fields.title => hackathon.title.clone(),
            self.fields.theme => hackathon.theme.clone(),
            self.fields.description => hackathon.description.clone(),
            self.fields.tags => join_tags(hackathon.tags.iter()),
            self.fields.location => hackathon.location.clone()
        )
    }

    fn idea_document(&self, idea: &Idea) -> TantivyDocument {
        doc!(
            self.fields.kind => KIND_IDEA,
            self.fields.record_id => idea.id.clone(),
            self.fields.title => idea.title.clone(),
            self.fields.description => idea.description.clone(),
            self.fields.tags => join_tags(idea.tags.iter())
        )
    }
}

fn build_schema() -> (Schema, SearchFields) {
    let mut schema_builder = Schema::builder();
    let fields = SearchFields {
        kind: schema_builder.add_text_field("kind", STRING | STORED),
        record_id: schema_builder.add_text_field("record_id", STRING | STORED),
        title: schema_builder.add_text_field("title", TEXT | STORED),
        theme: schema_builder.add_text_field("theme", TEXT),
        description: schema_builder.add_text_field("description", TEXT),
        tags: schema_builder.add_text_field("tags", TEXT),
        location: schema_builder.add_text_field("location", TEXT),
    };
    (schema_builder.build(), fields)
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a String>) -> String {
    tags.map(String::as_str).collect::<Vec<_>>().join(" ")
}
