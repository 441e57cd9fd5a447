//! Records returned by the knowledge-base API and the envelopes they arrive in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A knowledge-base page.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
    pub parent_id: Option<String>,
    pub markdown: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A single full-text search hit.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub page_id: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub icon: Option<String>,
}

/// One page of `list_pages` results.
#[derive(Debug, Clone, PartialEq)]
pub struct PageList {
    pub pages: Vec<Page>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// One page of `search` results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// A page that links to another page.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Backlink {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub link_count: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// The page link graph, optionally centred on one page.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

/// Acknowledgement of a deleted page.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DeletedPage {
    pub id: String,
    pub deleted_at: Option<String>,
}

/// A structured database attached to a page, as listed.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DatabaseSummary {
    pub id: String,
    pub title: String,
    pub page_id: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub column_count: u64,
    #[serde(default)]
    pub row_count: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// One column of a database schema.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Choices of a select column.
    pub options: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct DatabaseSchema {
    #[serde(default)]
    pub columns: Vec<Column>,
}

/// A database with its column schema.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Database {
    pub id: String,
    pub title: String,
    pub page_id: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub schema: DatabaseSchema,
    #[serde(default)]
    pub row_count: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A database row. `properties` maps column ids to typed values.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub page_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// One page of `query_rows` results.
#[derive(Debug, Clone, PartialEq)]
pub struct RowList {
    pub rows: Vec<Row>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// Acknowledgement of a deleted row.
pub type DeletedRow = DeletedPage;

/// Success envelope: `{ "data": ..., "meta": { ... } }`.
#[derive(Deserialize, Debug)]
pub(crate) struct Envelope<T> {
    pub data: T,
    pub meta: Option<ListMeta>,
}

/// Success envelope of a list endpoint. A missing or `null` `data` is an
/// empty list.
#[derive(Deserialize, Debug)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct ListEnvelope<T> {
    #[serde(default)]
    data: Option<Vec<T>>,
    pub meta: Option<ListMeta>,
}

impl<T> ListEnvelope<T> {
    /// Splits into the items and the pagination metadata.
    pub fn into_parts(self) -> (Vec<T>, ListMeta) {
        (self.data.unwrap_or_default(), self.meta.unwrap_or_default())
    }
}

/// Pagination metadata; any field may be missing.
#[derive(Deserialize, Debug, Default, PartialEq)]
pub(crate) struct ListMeta {
    pub total: Option<u64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListMeta {
    /// Resolves `(total, limit, offset)`, falling back to the item count and
    /// the requested window for whatever the server left out.
    pub fn resolve(&self, count: usize, limit: u32, offset: u32) -> (u64, u32, u32) {
        (
            self.total.unwrap_or(count as u64),
            self.limit.unwrap_or(limit),
            self.offset.unwrap_or(offset),
        )
    }
}
