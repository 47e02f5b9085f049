use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::catalog::error::{CatalogError, Result};
use crate::database::schema::{PRAGMAS, SCHEMA};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// An item joined with its category's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub image_name: String,
}

pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    prepare(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Returns the id for `name`, inserting the category the first time it is seen.
///
/// The UNIQUE constraint on `categories.name` makes the insert a no-op for a
/// name that already exists, so concurrent callers converge on one row.
pub fn resolve_or_create_category(conn: &Connection, name: &str) -> Result<i64> {
    conn.prepare_cached("INSERT OR IGNORE INTO categories (name) VALUES (?1)")?
        .execute(params![name])?;

    let id = conn
        .prepare_cached("SELECT id FROM categories WHERE name = ?1")?
        .query_row(params![name], |row| row.get(0))
        .optional()?;

    id.ok_or_else(|| CatalogError::ConstraintViolation(format!("category {:?} vanished after insert", name)))
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare_cached("SELECT id, name FROM categories ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Inserts an item; an unknown `category_id` surfaces as `ConstraintViolation`.
pub fn insert_item(conn: &Connection, name: &str, category_id: i64, image_name: &str) -> Result<i64> {
    conn.prepare_cached("INSERT INTO items (name, category_id, image_name) VALUES (?1, ?2, ?3)")?
        .execute(params![name, category_id, image_name])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_items(conn: &Connection) -> Result<Vec<ItemRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT items.id, items.name, categories.name, items.image_name
         FROM items
         JOIN categories ON categories.id = items.category_id
         ORDER BY items.id",
    )?;
    let rows = stmt.query_map([], item_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Items whose name contains `keyword`, using SQLite's LIKE collation
/// (case-insensitive for ASCII). An empty keyword matches every item.
pub fn search_items(conn: &Connection, keyword: &str) -> Result<Vec<ItemRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT items.id, items.name, categories.name, items.image_name
         FROM items
         JOIN categories ON categories.id = items.category_id
         WHERE items.name LIKE '%' || ?1 || '%' ESCAPE '\\'
         ORDER BY items.id",
    )?;
    let rows = stmt.query_map(params![escape_like(keyword)], item_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        image_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
