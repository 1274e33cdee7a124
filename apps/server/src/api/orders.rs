//! Order API endpoints.

use std::sync::Arc;

use api_protocol::{
    CreateOrderRequest, OrderListResponse, OrderQuery, OrderResponse, PopulatedOrder,
    StatsResponse, UpdateOrderStatusRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use entities::{Order, OrderStatus};
use shop_store::{OrderFilter, ShopStore};

use crate::api::parse_id;
use crate::error::{ServerError, ServerResult};
use crate::extract::{ValidJson, ValidQuery};
use crate::middleware::AuthenticatedUser;
use crate::services::order_flow::{self, populate_orders};
use crate::state::AppState;

fn order_not_found() -> ServerError {
    ServerError::NotFound("Order not found".to_string())
}

async fn populate_one<S: ShopStore>(
    store: &S,
    order: Order,
    with_customer: bool,
) -> ServerResult<PopulatedOrder> {
    populate_orders(store, vec![order], with_customer)
        .await?
        .pop()
        .ok_or_else(|| ServerError::Internal("populated order went missing".to_string()))
}

/// Places an order for the caller.
pub async fn create_order<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<CreateOrderRequest>,
) -> ServerResult<(StatusCode, Json<OrderResponse>)> {
    let order = order_flow::place_order(&state.store, user.id(), request).await?;
    let order = populate_one(&state.store, order, false).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order created successfully".to_string(),
            order,
        }),
    ))
}

/// Lists the caller's orders, newest first.
pub async fn my_orders<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ServerResult<Json<Vec<PopulatedOrder>>> {
    let filter = OrderFilter {
        customer: Some(user.id()),
        ..Default::default()
    };
    let (orders, _) = state.store.list_orders(filter).await?;

    Ok(Json(populate_orders(&state.store, orders, false).await?))
}

/// Gets one order. Only its customer and admins may read it.
pub async fn get_order<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ServerResult<Json<PopulatedOrder>> {
    let order = state
        .store
        .get_order(parse_id(&id, "Order")?)
        .await?
        .ok_or_else(order_not_found)?;

    if !order.is_owned_by(user.id()) && !user.is_admin() {
        return Err(ServerError::Forbidden("Access denied".to_string()));
    }

    Ok(Json(populate_one(&state.store, order, true).await?))
}

/// Cancels one of the caller's orders and restores its stock.
pub async fn cancel_order<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ServerResult<Json<OrderResponse<Order>>> {
    let order = order_flow::cancel_order(&state.store, parse_id(&id, "Order")?, user.id()).await?;

    Ok(Json(OrderResponse {
        message: "Order cancelled successfully".to_string(),
        order,
    }))
}

/// Lists all orders with an optional status filter.
pub async fn list_all_orders<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidQuery(query): ValidQuery<OrderQuery>,
) -> ServerResult<Json<OrderListResponse>> {
    let (orders, total) = state.store.list_orders(query.to_filter()?).await?;
    let orders = populate_orders(&state.store, orders, true).await?;

    Ok(Json(OrderListResponse::new(orders, query.page(), total)))
}

/// Sets an order's status without any transition checks.
pub async fn update_order_status<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateOrderStatusRequest>,
) -> ServerResult<Json<OrderResponse>> {
    let status = request
        .status()
        .ok_or_else(|| ServerError::InvalidInput(format!("Invalid status: {}", request.status)))?;

    let order = state
        .store
        .set_order_status(parse_id(&id, "Order")?, status)
        .await?
        .ok_or_else(order_not_found)?;

    if status == OrderStatus::Cancelled {
        // TODO: decide whether admin cancellation should restore stock like
        // the customer path does.
        tracing::warn!(
            order_id = %order.id,
            admin_id = %admin.id(),
            "Order cancelled by admin, stock was not restored"
        );
    } else {
        tracing::info!(order_id = %order.id, admin_id = %admin.id(), status = %status, "Order status updated");
    }

    Ok(Json(OrderResponse {
        message: "Order status updated successfully".to_string(),
        order: populate_one(&state.store, order, true).await?,
    }))
}

/// Aggregates order counts and revenue.
pub async fn order_stats<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<StatsResponse>> {
    Ok(Json(state.store.order_stats().await?.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use entities::{Product, UserRole};
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    fn order_body(lines: &[(&Product, i32)]) -> Value {
        let items: Vec<Value> = lines
            .iter()
            .map(|(product, quantity)| json!({ "productId": product.id, "quantity": quantity }))
            .collect();
        json!({
            "items": items,
            "shippingAddress": { "street": "1 Moi Ave", "city": "Nairobi", "country": "Kenya" }
        })
    }

    async fn place(app: &TestApp, token: &str, lines: &[(&Product, i32)]) -> (StatusCode, Value) {
        app.json(Method::POST, "/api/orders", Some(token), Some(order_body(lines)))
            .await
    }

    #[tokio::test]
    async fn test_create_order_totals_and_reserves_stock() {
        let app = TestApp::new();
        let (customer, token) = app.user("c@b.co", UserRole::Customer).await;
        let dress = app.product("Dress", 10, 5).await;
        let scarf = app.product("Scarf", 5, 3).await;

        let (status, body) = place(&app, &token, &[(&dress, 2), (&scarf, 1)]).await;

        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["message"], "Order created successfully");
        assert_eq!(body["order"]["totalAmount"], 25.0);
        assert_eq!(body["order"]["status"], "pending");
        assert_eq!(body["order"]["customer"], customer.id.to_string());
        assert_eq!(body["order"]["items"][0]["product"]["name"], "Dress");
        assert_eq!(app.stock_of(&dress).await, 3);
        assert_eq!(app.stock_of(&scarf).await, 2);
    }

    #[tokio::test]
    async fn test_insufficient_stock_releases_earlier_items() {
        let app = TestApp::new();
        let (_, token) = app.user("c@b.co", UserRole::Customer).await;
        let dress = app.product("Dress", 10, 5).await;
        let scarf = app.product("Scarf", 5, 1).await;

        let (status, body) = place(&app, &token, &[(&dress, 2), (&scarf, 3)]).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Insufficient stock for Scarf. Available: 1");
        assert_eq!(app.stock_of(&dress).await, 5);
        assert_eq!(app.stock_of(&scarf).await, 1);

        let (_, body) = app.get("/api/orders/my-orders", Some(&token)).await;
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_create_order_validation() {
        let app = TestApp::new();
        let (_, token) = app.user("c@b.co", UserRole::Customer).await;

        let (status, body) = place(&app, &token, &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Order must contain at least one item");

        let (status, _) = app
            .json(Method::POST, "/api/orders", None, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_order_visibility() {
        let app = TestApp::new();
        let (_, owner_token) = app.user("owner@b.co", UserRole::Customer).await;
        let (_, other_token) = app.user("other@b.co", UserRole::Customer).await;
        let (_, admin_token) = app.user("admin@b.co", UserRole::Admin).await;
        let dress = app.product("Dress", 10, 5).await;

        let (_, body) = place(&app, &owner_token, &[(&dress, 1)]).await;
        let uri = format!("/api/orders/{}", body["order"]["_id"].as_str().unwrap());

        let (status, body) = app.get(&uri, Some(&owner_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["customer"]["email"], "owner@b.co");

        let (status, body) = app.get(&uri, Some(&other_token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied");

        let (status, _) = app.get(&uri, Some(&admin_token)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.get("/api/orders/my-orders", Some(&other_token)).await;
        assert_eq!(body.as_array().unwrap().len(), 0);

        let (status, body) = app.get("/api/orders/nope", Some(&owner_token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Order not found");
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let app = TestApp::new();
        let (_, token) = app.user("c@b.co", UserRole::Customer).await;
        let (_, other_token) = app.user("other@b.co", UserRole::Customer).await;
        let dress = app.product("Dress", 10, 5).await;

        let (_, body) = place(&app, &token, &[(&dress, 2)]).await;
        let uri = format!("/api/orders/{}/cancel", body["order"]["_id"].as_str().unwrap());

        let (status, _) = app.json(Method::PATCH, &uri, Some(&other_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.json(Method::PATCH, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Order cancelled successfully");
        assert_eq!(body["order"]["status"], "cancelled");
        assert_eq!(app.stock_of(&dress).await, 5);

        let (status, body) = app.json(Method::PATCH, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot cancel order at this stage");
        assert_eq!(app.stock_of(&dress).await, 5);
    }

    #[tokio::test]
    async fn test_admin_status_updates() {
        let app = TestApp::new();
        let (_, token) = app.user("c@b.co", UserRole::Customer).await;
        let (_, admin_token) = app.user("admin@b.co", UserRole::Admin).await;
        let dress = app.product("Dress", 10, 5).await;

        let (_, body) = place(&app, &token, &[(&dress, 1)]).await;
        let id = body["order"]["_id"].as_str().unwrap().to_string();
        let status_uri = format!("/api/orders/{id}/status");

        let (status, body) = app
            .json(
                Method::PATCH,
                &status_uri,
                Some(&admin_token),
                Some(json!({ "status": "lost" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid status"));

        let (status, body) = app
            .json(
                Method::PATCH,
                &status_uri,
                Some(&admin_token),
                Some(json!({ "status": "shipped" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Order status updated successfully");
        assert_eq!(body["order"]["status"], "shipped");

        // Shipped orders can no longer be cancelled by the customer.
        let (status, _) = app
            .json(Method::PATCH, &format!("/api/orders/{id}/cancel"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(
                Method::PATCH,
                &status_uri,
                Some(&token),
                Some(json!({ "status": "delivered" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_listing_and_stats() {
        let app = TestApp::new();
        let (_, token) = app.user("c@b.co", UserRole::Customer).await;
        let (_, admin_token) = app.user("admin@b.co", UserRole::Admin).await;
        let dress = app.product("Dress", 10, 50).await;

        for _ in 0..3 {
            place(&app, &token, &[(&dress, 1)]).await;
        }
        let (_, body) = place(&app, &token, &[(&dress, 2)]).await;
        let uri = format!("/api/orders/{}/cancel", body["order"]["_id"].as_str().unwrap());
        app.json(Method::PATCH, &uri, Some(&token), None).await;

        let (status, body) = app
            .get("/api/orders/admin/all?page=1&limit=2", Some(&admin_token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orders"].as_array().unwrap().len(), 2);
        assert_eq!(body["total"], 4);
        assert_eq!(body["totalPages"], 2);
        assert_eq!(body["orders"][0]["customer"]["email"], "c@b.co");

        let (_, body) = app
            .get("/api/orders/admin/all?status=cancelled", Some(&admin_token))
            .await;
        assert_eq!(body["total"], 1);

        let (status, _) = app
            .get("/api/orders/admin/all?status=lost", Some(&admin_token))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app.get("/api/orders/admin/stats", Some(&admin_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalOrders"], 4);
        assert_eq!(body["totalRevenue"], 30.0);
    }
}
