use anyhow::{Context, Result, bail};
use log::debug;
use serde_json::{Map, Value};

use crate::client::KnowledgeBase;
use crate::model::{Database, DatabaseSummary, RowList};

use super::page_line;

#[tracing::instrument(skip(kb))]
pub async fn list_databases<K: KnowledgeBase>(kb: &K) -> Result<()> {
    let databases = kb
        .list_databases()
        .await
        .context("Failed to list databases")?;
    print!("{}", render_database_list(&databases));
    Ok(())
}

/// Print a database with its column schema.
#[tracing::instrument(skip(kb))]
pub async fn show_database<K: KnowledgeBase>(kb: &K, id: &str) -> Result<()> {
    let database = kb
        .read_database(id)
        .await
        .with_context(|| format!("Failed to read database {}", id))?;
    print!("{}", render_database(&database));
    Ok(())
}

#[tracing::instrument(skip(kb))]
pub async fn rows<K: KnowledgeBase>(kb: &K, database_id: &str, limit: u32, offset: u32) -> Result<()> {
    let rows = kb
        .query_rows(database_id, limit, offset)
        .await
        .with_context(|| format!("Failed to query rows of database {}", database_id))?;
    debug!("Got {} row(s) of {}", rows.rows.len(), rows.total);
    print!("{}", render_rows(&rows)?);
    Ok(())
}

/// Add a row from a JSON object of column values.
#[tracing::instrument(skip(kb, properties))]
pub async fn add_row<K: KnowledgeBase>(kb: &K, database_id: &str, properties: &str) -> Result<()> {
    let properties = parse_properties(properties)?;
    let row = kb
        .create_row(database_id, &properties)
        .await
        .with_context(|| format!("Failed to create row in database {}", database_id))?;
    println!("Created row {} in database {}", row.id, database_id);
    Ok(())
}

#[tracing::instrument(skip(kb, properties))]
pub async fn update_row<K: KnowledgeBase>(
    kb: &K,
    database_id: &str,
    row_id: &str,
    properties: &str,
) -> Result<()> {
    let properties = parse_properties(properties)?;
    let row = kb
        .update_row(database_id, row_id, &properties)
        .await
        .with_context(|| format!("Failed to update row {}", row_id))?;
    match row.updated_at {
        Some(at) => println!("Updated row {} at {}", row.id, at),
        None => println!("Updated row {}", row.id),
    }
    Ok(())
}

#[tracing::instrument(skip(kb))]
pub async fn delete_row<K: KnowledgeBase>(kb: &K, database_id: &str, row_id: &str) -> Result<()> {
    let deleted = kb
        .delete_row(database_id, row_id)
        .await
        .with_context(|| format!("Failed to delete row {}", row_id))?;
    println!("Deleted row {}", deleted.id);
    Ok(())
}

fn parse_properties(json: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(json).context("Row properties are not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("Row properties must be a JSON object"),
    }
}

fn render_database_list(databases: &[DatabaseSummary]) -> String {
    if databases.is_empty() {
        return "No databases.\n".to_string();
    }
    let mut out = format!("{} database(s)\n", databases.len());
    for db in databases {
        out.push_str(&format!(
            "{} ({} column(s), {} row(s))\n",
            page_line(&db.id, db.icon.as_deref(), &db.title),
            db.column_count,
            db.row_count
        ));
    }
    out
}

fn render_database(database: &Database) -> String {
    let mut out = format!(
        "{}\nid: {}\nrows: {}\n",
        database.title, database.id, database.row_count
    );
    if let Some(page_id) = &database.page_id {
        out.push_str(&format!("page: {}\n", page_id));
    }
    if database.schema.columns.is_empty() {
        return out;
    }
    out.push_str("\nColumns:\n");
    for column in &database.schema.columns {
        out.push_str(&format!("  {} ({})", column.name, column.kind));
        if let Some(options) = column.options.as_ref().filter(|o| !o.is_empty()) {
            out.push_str(&format!(" [{}]", options.join(", ")));
        }
        out.push('\n');
    }
    out
}

fn render_rows(rows: &RowList) -> Result<String> {
    if rows.rows.is_empty() {
        return Ok(format!("No rows (total: {}).\n", rows.total));
    }
    let mut out = format!(
        "Total rows: {} (limit {}, offset {})\n",
        rows.total, rows.limit, rows.offset
    );
    for row in &rows.rows {
        out.push_str(&format!(
            "\nRow {}:\n{}\n",
            row.id,
            serde_json::to_string_pretty(&row.properties)?
        ));
    }
    Ok(out)
}
