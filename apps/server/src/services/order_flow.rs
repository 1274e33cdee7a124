//! Order placement and cancellation.
//!
//! Placement reserves stock item by item with [`ShopStore::reserve_stock`].
//! When an item cannot be reserved, or the order cannot be written, the
//! items reserved so far are given back with [`ShopStore::restore_stock`].
//! Items after the failing one are never touched.

use std::collections::HashMap;

use api_protocol::{CreateOrderRequest, PopulatedOrder};
use entities::{Order, OrderItem, OrderStatus, Product, User};
use rust_decimal::Decimal;
use shop_store::{ShopStore, StockReservation};
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};

const NOT_CANCELLABLE: &str = "Cannot cancel order at this stage";
const TOTAL_TOO_LARGE: &str = "Order total is too large";

/// Places an order for `customer`.
pub async fn place_order<S: ShopStore + ?Sized>(
    store: &S,
    customer: Uuid,
    request: CreateOrderRequest,
) -> ServerResult<Order> {
    let mut reserved = Vec::with_capacity(request.items.len());
    let result = reserve_and_create(store, customer, request, &mut reserved).await;

    if let Err(e) = &result {
        tracing::info!(
            customer = %customer,
            reserved = reserved.len(),
            error = %e,
            "Order placement failed, releasing reserved stock"
        );
        release_stock(store, &reserved).await;
    }
    result
}

async fn reserve_and_create<S: ShopStore + ?Sized>(
    store: &S,
    customer: Uuid,
    request: CreateOrderRequest,
    reserved: &mut Vec<(Uuid, i32)>,
) -> ServerResult<Order> {
    let mut items = Vec::with_capacity(request.items.len());
    let mut total = Decimal::ZERO;

    for item in request.items {
        let product = match store.reserve_stock(item.product_id, item.quantity).await? {
            StockReservation::Reserved(product) => product,
            StockReservation::Insufficient(product) => {
                return Err(ServerError::InsufficientStock {
                    name: product.name,
                    available: product.stock,
                });
            }
            StockReservation::NotFound => {
                return Err(ServerError::NotFound(format!(
                    "Product not found: {}",
                    item.product_id
                )));
            }
        };
        reserved.push((product.id, item.quantity));

        let line = OrderItem {
            product: product.id,
            quantity: item.quantity,
            size: item.size,
            color: item.color,
            price: product.price,
        };
        total = line
            .line_total()
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| ServerError::InvalidInput(TOTAL_TOO_LARGE.to_string()))?;
        items.push(line);
    }

    let order = Order::new(customer, items, request.shipping_address)
        .ok_or_else(|| ServerError::InvalidInput(TOTAL_TOO_LARGE.to_string()))?;
    let order = store.create_order(order).await?;

    tracing::info!(
        order_id = %order.id,
        customer = %customer,
        total_amount = %order.total_amount,
        "Order created"
    );
    Ok(order)
}

/// Gives back `quantity` units per entry. Each increment is independent;
/// failures are logged and skipped.
async fn release_stock<S: ShopStore + ?Sized>(store: &S, items: &[(Uuid, i32)]) {
    for &(product_id, quantity) in items {
        match store.restore_stock(product_id, quantity).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                product_id = %product_id,
                quantity,
                "Product no longer exists, stock not restored"
            ),
            Err(e) => tracing::warn!(
                product_id = %product_id,
                quantity,
                error = %e,
                "Failed to restore stock"
            ),
        }
    }
}

/// Cancels a pending or confirmed order placed by `requester` and returns
/// its stock.
pub async fn cancel_order<S: ShopStore + ?Sized>(
    store: &S,
    order_id: Uuid,
    requester: Uuid,
) -> ServerResult<Order> {
    let order = store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Order not found".to_string()))?;

    if !order.is_owned_by(requester) {
        return Err(ServerError::Forbidden("Access denied".to_string()));
    }
    if !order.status.is_cancellable() {
        return Err(ServerError::InvalidState(NOT_CANCELLABLE.to_string()));
    }

    // Lost a race with another cancellation or an admin status change.
    let cancelled = store
        .transition_order_status(order_id, &OrderStatus::CANCELLABLE, OrderStatus::Cancelled)
        .await?
        .ok_or_else(|| ServerError::InvalidState(NOT_CANCELLABLE.to_string()))?;

    let items: Vec<(Uuid, i32)> = cancelled
        .items
        .iter()
        .map(|item| (item.product, item.quantity))
        .collect();
    release_stock(store, &items).await;

    tracing::info!(order_id = %order_id, customer = %requester, "Order cancelled");
    Ok(cancelled)
}

/// Resolves the products of every order, and the customers too when
/// `with_customer` is set. Missing references stay as bare ids.
pub async fn populate_orders<S: ShopStore + ?Sized>(
    store: &S,
    orders: Vec<Order>,
    with_customer: bool,
) -> ServerResult<Vec<PopulatedOrder>> {
    let mut products: HashMap<Uuid, Product> = HashMap::new();
    let mut customers: HashMap<Uuid, Option<User>> = HashMap::new();

    for order in &orders {
        for item in &order.items {
            if !products.contains_key(&item.product) {
                if let Some(product) = store.get_product(item.product).await? {
                    products.insert(product.id, product);
                }
            }
        }
        if with_customer && !customers.contains_key(&order.customer) {
            customers.insert(order.customer, store.get_user(order.customer).await?);
        }
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let customer = customers.get(&order.customer).and_then(Option::as_ref);
            PopulatedOrder::new(order, &products, customer)
        })
        .collect())
}
