//! Response types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use entities::{Order, OrderStatus, Product, ShippingAddress, User, UserRole};
use rust_decimal::Decimal;
use serde::Serialize;
use shop_store::{OrderStats, StatusStat};
use uuid::Uuid;

use crate::Page;

// ============================================================================
// Users
// ============================================================================

/// User as returned by register, login and role changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// User summary including contact details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            address: user.address.clone(),
            phone: user.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse<U = UserSummary> {
    pub message: String,
    pub token: String,
    pub user: U,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
}

/// A message plus the user it concerns.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse<U = UserSummary> {
    pub message: String,
    pub user: U,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminCheckResponse {
    pub message: String,
    pub user: UserSummary,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsersResponse {
    pub message: String,
    pub users: Vec<User>,
    pub total: usize,
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total_pages: u64,
    pub current_page: u32,
    pub total: u64,
}

impl ProductListResponse {
    pub fn new(products: Vec<Product>, page: Page, total: u64) -> Self {
        Self {
            products,
            total_pages: page.total_pages(total),
            current_page: page.page,
            total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub message: String,
    pub product: Product,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

/// A line item's product: the full document while it exists, otherwise the
/// bare identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductRef {
    Product(Product),
    Id(Uuid),
}

/// Customer fields exposed on populated orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for CustomerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// An order's customer: the summary when it was resolved, otherwise the
/// bare identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Customer(CustomerSummary),
    Id(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedOrderItem {
    pub product: ProductRef,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub price: Decimal,
}

/// An order with its references resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedOrder {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub customer: CustomerRef,
    pub items: Vec<PopulatedOrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PopulatedOrder {
    /// Resolves item products from `products` and the customer from
    /// `customer`. Anything missing is rendered as its identifier.
    pub fn new(order: Order, products: &HashMap<Uuid, Product>, customer: Option<&User>) -> Self {
        let customer = match customer {
            Some(user) if user.id == order.customer => {
                CustomerRef::Customer(CustomerSummary::from(user))
            }
            _ => CustomerRef::Id(order.customer),
        };
        let items = order
            .items
            .into_iter()
            .map(|item| PopulatedOrderItem {
                product: products
                    .get(&item.product)
                    .cloned()
                    .map_or(ProductRef::Id(item.product), ProductRef::Product),
                quantity: item.quantity,
                size: item.size,
                color: item.color,
                price: item.price,
            })
            .collect();

        Self {
            id: order.id,
            customer,
            items,
            total_amount: order.total_amount,
            status: order.status,
            shipping_address: order.shipping_address,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse<O = PopulatedOrder> {
    pub message: String,
    pub order: O,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub orders: Vec<PopulatedOrder>,
    pub total_pages: u64,
    pub current_page: u32,
    pub total: u64,
}

impl OrderListResponse {
    pub fn new(orders: Vec<PopulatedOrder>, page: Page, total: u64) -> Self {
        Self {
            orders,
            total_pages: page.total_pages(total),
            current_page: page.page,
            total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub status_stats: Vec<StatusStat>,
    pub total_orders: u64,
    pub total_revenue: Decimal,
}

impl From<OrderStats> for StatsResponse {
    fn from(stats: OrderStats) -> Self {
        Self {
            status_stats: stats.by_status,
            total_orders: stats.total_orders,
            total_revenue: stats.total_revenue,
        }
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the process started serving.
    pub uptime: f64,
}
