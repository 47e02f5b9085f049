use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::catalog::error::{CatalogError, Result};
use crate::database::repo::{self, Category, ItemRow};
use crate::storage::image_store::ImageStore;

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub image: Option<Vec<u8>>,
}

/// What `add_item` stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReceipt {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub image_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub image_name: String,
}

impl From<ItemRow> for ItemView {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            image_name: row.image_name,
        }
    }
}

/// Composes the image store, category registry and item catalog.
///
/// The connection sits behind a mutex; it is only held for the SQL of one
/// operation, never across image file I/O.
pub struct CatalogService {
    conn: Mutex<Connection>,
    images: ImageStore,
}

impl CatalogService {
    pub fn new(conn: Connection, images: ImageStore) -> Self {
        Self {
            conn: Mutex::new(conn),
            images,
        }
    }

    pub fn open(db_path: &Path, image_dir: &Path) -> Result<Self> {
        let conn = repo::open(db_path)?;
        let images = ImageStore::open(image_dir)?;
        info!("Catalog opened (db: {:?}, images: {:?})", db_path, images.root());
        Ok(Self::new(conn, images))
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn add_item(&self, item: NewItem) -> Result<ItemReceipt> {
        let NewItem { name, category, image } = item;
        if name.trim().is_empty() {
            return Err(CatalogError::BadRequest("name is required".to_string()));
        }
        if category.trim().is_empty() {
            return Err(CatalogError::BadRequest("category is required".to_string()));
        }

        // The asset is on disk before any row can reference it.
        let image_name = match image.as_deref() {
            Some(bytes) => self.images.put(bytes)?,
            None => String::new(),
        };

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let category_id = repo::resolve_or_create_category(&tx, &category)?;
        let id = repo::insert_item(&tx, &name, category_id, &image_name)?;
        tx.commit()?;

        info!("Added item {} ({:?}, category {:?}, image {:?})", id, name, category, image_name);
        Ok(ItemReceipt {
            id,
            name,
            category,
            image_name,
        })
    }

    pub fn list_items(&self) -> Result<Vec<ItemView>> {
        let conn = self.lock();
        Ok(repo::list_items(&conn)?.into_iter().map(ItemView::from).collect())
    }

    pub fn search_items(&self, keyword: &str) -> Result<Vec<ItemView>> {
        let conn = self.lock();
        Ok(repo::search_items(&conn, keyword)?.into_iter().map(ItemView::from).collect())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.lock();
        repo::list_categories(&conn)
    }

    pub fn get_image(&self, filename: &str) -> Result<Vec<u8>> {
        self.images.get(filename)
    }

    /// A panic while holding the lock leaves no half-applied SQL behind
    /// (uncommitted transactions roll back on drop), so the guard is recovered.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
