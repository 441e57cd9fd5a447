use anyhow::{Context, Result};
use log::debug;

use crate::client::{KnowledgeBase, ListPagesQuery, NewPage};
use crate::model::{Page, PageList};

use super::render_page_summary;

/// Print a page with its metadata and markdown body.
#[tracing::instrument(skip(kb))]
pub async fn read<K: KnowledgeBase>(kb: &K, id: &str) -> Result<()> {
    let page = kb
        .read_page(id)
        .await
        .with_context(|| format!("Failed to read page {}", id))?;
    print!("{}", render_page(&page));
    Ok(())
}

#[tracing::instrument(skip(kb, page), fields(title = %page.title))]
pub async fn create<K: KnowledgeBase>(kb: &K, page: &NewPage) -> Result<()> {
    let created = kb
        .create_page(page)
        .await
        .with_context(|| format!("Failed to create page '{}'", page.title))?;
    println!("Created page {} {}", created.id, created.title);
    Ok(())
}

#[tracing::instrument(skip(kb, markdown))]
pub async fn update<K: KnowledgeBase>(kb: &K, id: &str, markdown: &str) -> Result<()> {
    let updated = kb
        .update_page(id, markdown)
        .await
        .with_context(|| format!("Failed to update page {}", id))?;
    match updated.updated_at {
        Some(at) => println!("Updated page {} at {}", updated.id, at),
        None => println!("Updated page {}", updated.id),
    }
    Ok(())
}

#[tracing::instrument(skip(kb))]
pub async fn delete<K: KnowledgeBase>(kb: &K, id: &str) -> Result<()> {
    let deleted = kb
        .delete_page(id)
        .await
        .with_context(|| format!("Failed to delete page {}", id))?;
    println!("Deleted page {}", deleted.id);
    Ok(())
}

/// List pages with pagination metadata.
#[tracing::instrument(skip(kb))]
pub async fn list<K: KnowledgeBase>(kb: &K, query: &ListPagesQuery) -> Result<()> {
    let list = kb
        .list_pages(query)
        .await
        .context("Failed to list pages")?;
    debug!("Got {} page(s) of {}", list.pages.len(), list.total);
    print!("{}", render_page_list(&list));
    Ok(())
}

fn render_page(page: &Page) -> String {
    let mut out = String::new();
    match &page.icon {
        Some(icon) => out.push_str(&format!("{} {}\n", icon, page.title)),
        None => out.push_str(&format!("{}\n", page.title)),
    }
    out.push_str(&format!("id: {}\n", page.id));
    if let Some(parent) = &page.parent_id {
        out.push_str(&format!("parent: {}\n", parent));
    }
    if let Some(created) = &page.created_at {
        out.push_str(&format!("created: {}\n", created));
    }
    if let Some(updated) = &page.updated_at {
        out.push_str(&format!("updated: {}\n", updated));
    }
    if let Some(markdown) = page.markdown.as_deref().filter(|m| !m.is_empty()) {
        out.push('\n');
        out.push_str(markdown);
        if !markdown.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn render_page_list(list: &PageList) -> String {
    if list.pages.is_empty() {
        return format!("No pages (total: {}).\n", list.total);
    }
    let mut out = format!(
        "Total pages: {} (limit {}, offset {})\n",
        list.total, list.limit, list.offset
    );
    for page in &list.pages {
        out.push_str(&render_page_summary(page));
        out.push('\n');
    }
    out
}
