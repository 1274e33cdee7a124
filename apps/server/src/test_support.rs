//! Helpers for driving the router in tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use entities::{Product, User, UserRole};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use shop_store::{MemoryShopStore, ShopStore};
use tower::ServiceExt;

use crate::config::Config;
use crate::services::images::{ImageError, ImageStorage, ImageUpload};
use crate::state::AppState;
use crate::{create_app, create_state};

pub const TEST_SECRET: &str = "test-secret-key-for-jwt-signing";
const BOUNDARY: &str = "asali-test-boundary";

/// Image storage that keeps uploads in memory.
#[derive(Debug, Default)]
pub struct MemoryImageStorage {
    uploads: Mutex<Vec<String>>,
}

impl MemoryImageStorage {
    pub fn object_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStorage for MemoryImageStorage {
    async fn upload(&self, object_name: &str, _upload: &ImageUpload) -> Result<String, ImageError> {
        self.uploads.lock().unwrap().push(object_name.to_string());
        Ok(format!("https://images.test/{object_name}"))
    }
}

/// One part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A router over a fresh in-memory store.
pub struct TestApp {
    pub state: Arc<AppState<MemoryShopStore>>,
    pub images: Arc<MemoryImageStorage>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let images = Arc::new(MemoryImageStorage::default());
        Self::with_storage(MemoryShopStore::new(), images.clone(), images)
    }

    /// Builds the app over `store`, routing uploads to `storage`. `images`
    /// is what [`TestApp::images`] reports.
    pub fn with_storage(
        store: MemoryShopStore,
        storage: Arc<dyn ImageStorage>,
        images: Arc<MemoryImageStorage>,
    ) -> Self {
        let state = create_state(Config::new(TEST_SECRET), store, storage);
        let router = create_app(state.clone());
        Self {
            state,
            images,
            router,
        }
    }

    pub fn store(&self) -> &MemoryShopStore {
        &self.state.store
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Sends a request with an optional bearer token and JSON body.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.json(Method::GET, uri, token, None).await
    }

    /// Sends a multipart form.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        parts: &[Part<'_>],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    /// Stores a user directly and returns it with a valid token.
    pub async fn user(&self, email: &str, role: UserRole) -> (User, String) {
        let user = self
            .store()
            .create_user(User::new("Test User", email).with_role(role))
            .await
            .unwrap();
        let token = self.state.jwt_manager.generate_token(user.id).unwrap();
        (user, token)
    }

    pub async fn product(&self, name: &str, price: i64, stock: i32) -> Product {
        self.store()
            .create_product(Product::new(name, "", Decimal::from(price), "dresses", stock))
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, product: &Product) -> i32 {
        self.store()
            .get_product(product.id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }
}
