//! Product catalog API endpoints.

use std::sync::Arc;

use api_protocol::{
    MAX_IMAGE_BYTES, MAX_PRODUCT_IMAGES, MessageResponse, PRODUCT_IMAGES_FIELD, ProductForm,
    ProductListResponse, ProductQuery, ProductResponse,
};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use entities::Product;
use shop_store::{ProductFilter, ShopStore, StoreError};

use crate::api::parse_id;
use crate::error::{ServerError, ServerResult};
use crate::extract::ValidQuery;
use crate::services::images::{ImageUpload, upload_all};
use crate::state::AppState;

fn product_not_found() -> ServerError {
    ServerError::NotFound("Product not found".to_string())
}

fn multipart_error(e: MultipartError) -> ServerError {
    ServerError::InvalidInput(e.body_text())
}

/// Reads the text fields and image files of a product form.
async fn read_product_form(mut multipart: Multipart) -> ServerResult<(ProductForm, Vec<ImageUpload>)> {
    let mut form = ProductForm::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name != PRODUCT_IMAGES_FIELD {
            let value = field.text().await.map_err(multipart_error)?;
            form.set_field(&name, value)?;
            continue;
        }

        if images.len() == MAX_PRODUCT_IMAGES {
            return Err(ServerError::InvalidInput(format!(
                "Too many files. At most {MAX_PRODUCT_IMAGES} images are allowed"
            )));
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(ServerError::InvalidInput(
                "Only image files are allowed".to_string(),
            ));
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > MAX_IMAGE_BYTES {
            return Err(ServerError::InvalidInput(format!(
                "File too large. Images must be at most {} MB",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        images.push(ImageUpload {
            file_name,
            content_type,
            data,
        });
    }

    Ok((form, images))
}

/// Lists active products with filters and pagination.
pub async fn list_products<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidQuery(query): ValidQuery<ProductQuery>,
) -> ServerResult<Json<ProductListResponse>> {
    let (products, total) = state.store.list_products(query.to_filter()).await?;

    Ok(Json(ProductListResponse::new(products, query.page(), total)))
}

/// Gets a single product.
pub async fn get_product<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ServerResult<Json<Product>> {
    let product = state
        .store
        .get_product(parse_id(&id, "Product")?)
        .await?
        .ok_or_else(product_not_found)?;

    Ok(Json(product))
}

/// Creates a product from a multipart form.
pub async fn create_product<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    multipart: Multipart,
) -> ServerResult<(StatusCode, Json<ProductResponse>)> {
    let (form, uploads) = read_product_form(multipart).await?;
    let mut product = form.into_product(Vec::new())?;

    product.images = upload_all(state.images.as_ref(), uploads).await;
    let product = state.store.create_product(product).await?;

    tracing::info!(
        product_id = %product.id,
        name = %product.name,
        images = product.images.len(),
        "Product created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created successfully".to_string(),
            product,
        }),
    ))
}

/// Updates the fields present in a multipart form and appends new images.
pub async fn update_product<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ServerResult<Json<ProductResponse>> {
    let id = parse_id(&id, "Product")?;
    let (form, uploads) = read_product_form(multipart).await?;

    if state.store.get_product(id).await?.is_none() {
        return Err(product_not_found());
    }
    let mut patch = form.into_patch()?;
    patch.new_images = upload_all(state.images.as_ref(), uploads).await;

    let product = state
        .store
        .patch_product(id, patch)
        .await?
        .ok_or_else(product_not_found)?;

    tracing::info!(product_id = %product.id, "Product updated");

    Ok(Json(ProductResponse {
        message: "Product updated successfully".to_string(),
        product,
    }))
}

/// Deletes a product.
pub async fn delete_product<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ServerResult<Json<MessageResponse>> {
    let id = parse_id(&id, "Product")?;

    state.store.delete_product(id).await.map_err(|e| match e {
        StoreError::NotFound { .. } => product_not_found(),
        other => other.into(),
    })?;

    tracing::info!(product_id = %id, "Product deleted");

    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

/// Lists every product, active or not, newest first.
pub async fn list_all_products<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<Vec<Product>>> {
    let (products, _) = state.store.list_products(ProductFilter::default()).await?;

    Ok(Json(products))
}
