use anyhow::{Context, Result};
use log::debug;

use crate::client::KnowledgeBase;
use crate::model::SearchResults;

use super::page_line;

/// Full-text search and print one block per hit.
#[tracing::instrument(skip(kb))]
pub async fn search<K: KnowledgeBase>(kb: &K, query: &str, limit: u32, offset: u32) -> Result<()> {
    let results = kb
        .search(query, limit, offset)
        .await
        .with_context(|| format!("Search for '{}' failed", query))?;

    debug!("Got {} search result(s)", results.results.len());
    print!("{}", render_search_results(&results));
    Ok(())
}

fn render_search_results(results: &SearchResults) -> String {
    if results.results.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = format!(
        "Found {} result(s) (showing {}-{})\n",
        results.total,
        results.offset.saturating_add(1),
        (results.offset as usize).saturating_add(results.results.len())
    );
    for hit in &results.results {
        out.push_str(&format!(
            "{} (score: {:.3})\n    {}\n",
            page_line(&hit.page_id, hit.icon.as_deref(), &hit.title),
            hit.score,
            hit.snippet
        ));
    }
    out
}
