//! Client for the SymbioKnowledgeBase agent API.
//!
//! ```no_run
//! use symbio_kb::{ClientConfig, KbClient, KnowledgeBase};
//!
//! # async fn run() -> symbio_kb::Result<()> {
//! let config = ClientConfig::new("https://kb.example.com", "skb_live_...")?;
//! let kb = KbClient::new(&config)?;
//! let results = kb.search("deployment guide", 20, 0).await?;
//! if let Some(hit) = results.results.first() {
//!     let page = kb.read_page(&hit.page_id).await?;
//!     println!("{}", page.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod runtime;

pub use client::{KbClient, KnowledgeBase, ListPagesQuery, NewPage};
pub use config::ClientConfig;
pub use error::{ApiError, Error, Result};
pub use model::{
    Backlink, Column, Database, DatabaseSchema, DatabaseSummary, DeletedPage, DeletedRow, Graph,
    GraphEdge, GraphNode, Page, PageList, Row, RowList, SearchResult, SearchResults,
};
