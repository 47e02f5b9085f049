use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::error::Result as CatalogResult;
use crate::catalog::service::{CatalogService, ItemReceipt, ItemView, NewItem};
use crate::database::repo::Category;
use crate::server::AppState;
use crate::server::error::HttpError;

#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

#[derive(Serialize)]
pub struct ItemsResponse {
    pub items: Vec<ItemView>,
}

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Serialize)]
pub struct AddItemResponse {
    pub message: String,
    #[serde(flatten)]
    pub item: ItemReceipt,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub keyword: String,
}

/// Runs a synchronous catalog call off the async workers.
async fn blocking<T, F>(state: AppState, f: F) -> Result<T, HttpError>
where
    T: Send + 'static,
    F: FnOnce(&CatalogService) -> CatalogResult<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || f(state.catalog.as_ref())).await?;
    Ok(result?)
}

pub async fn root() -> Json<Message> {
    Json(Message {
        message: "Hello, world!".to_string(),
    })
}

pub async fn list_items(State(state): State<AppState>) -> Result<Json<ItemsResponse>, HttpError> {
    let items = blocking(state, |catalog| catalog.list_items()).await?;
    info!("Listing {} item(s)", items.len());
    Ok(Json(ItemsResponse { items }))
}

/// Multipart form with `name`, `category` and an optional `image` file.
pub async fn add_item(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AddItemResponse>, HttpError> {
    let mut name = None;
    let mut category = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("name") => name = Some(field.text().await?),
            Some("category") => category = Some(field.text().await?),
            Some("image") => image = Some(field.bytes().await?.to_vec()),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| HttpError::BadRequest("name is required".to_string()))?;
    let category = category.ok_or_else(|| HttpError::BadRequest("category is required".to_string()))?;

    let item = blocking(state, move |catalog| catalog.add_item(NewItem { name, category, image })).await?;
    info!("Receive item: {}, {}", item.name, item.category);

    Ok(Json(AddItemResponse {
        message: format!("item received: {}", item.name),
        item,
    }))
}

pub async fn search_items(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ItemsResponse>, HttpError> {
    let items = blocking(state, move |catalog| catalog.search_items(&params.keyword)).await?;
    Ok(Json(ItemsResponse { items }))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<CategoriesResponse>, HttpError> {
    let categories = blocking(state, |catalog| catalog.list_categories()).await?;
    Ok(Json(CategoriesResponse { categories }))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let bytes = blocking(state, move |catalog| catalog.get_image(&filename)).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
