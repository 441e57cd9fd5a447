//! CLI command handlers.
//!
//! Each handler drives one [`KnowledgeBase`](crate::client::KnowledgeBase)
//! operation and prints a plain-text rendering of the result to stdout.

mod databases;
mod graph;
mod pages;
mod search;

pub use databases::{add_row, delete_row, list_databases, rows, show_database, update_row};
pub use graph::{backlinks, graph};
pub use pages::{create, delete, list, read, update};
pub use search::search;

use crate::model::Page;

/// Short form of an id for one-line listings.
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// `[id] icon title` line used by the listing commands.
fn page_line(id: &str, icon: Option<&str>, title: &str) -> String {
    match icon {
        Some(icon) => format!("[{}] {} {}", short_id(id), icon, title),
        None => format!("[{}] {}", short_id(id), title),
    }
}

fn render_page_summary(page: &Page) -> String {
    page_line(&page.id, page.icon.as_deref(), &page.title)
}
