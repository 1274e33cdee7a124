//! Shop store trait definitions.

use async_trait::async_trait;
use chrono::Utc;
use entities::{Order, OrderStatus, Product, User, UserRole};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::StoreResult;

/// Filter options for listing products.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Only return products visible in the public listing.
    pub active_only: bool,
    /// Filter by exact category.
    pub category: Option<String>,
    /// Filter by featured flag.
    pub featured: Option<bool>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

impl ProductFilter {
    /// Returns true if `product` passes every predicate of this filter.
    /// Pagination is not considered.
    pub fn matches(&self, product: &Product) -> bool {
        (!self.active_only || product.is_active)
            && self
                .category
                .as_ref()
                .is_none_or(|category| &product.category == category)
            && self.featured.is_none_or(|featured| product.featured == featured)
            && self
                .search
                .as_ref()
                .is_none_or(|search| product.matches_search(search))
    }
}

/// Filter options for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Filter by owning customer.
    pub customer: Option<Uuid>,
    /// Filter by status.
    pub status: Option<OrderStatus>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

impl OrderFilter {
    /// Returns true if `order` passes every predicate of this filter.
    pub fn matches(&self, order: &Order) -> bool {
        self.customer.is_none_or(|customer| order.customer == customer)
            && self.status.is_none_or(|status| order.status == status)
    }
}

/// Fields of a product to overwrite. Absent fields keep their stored value
/// and `new_images` is appended to the stored images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub new_images: Vec<String>,
}

impl ProductPatch {
    /// Applies the patch to `product` and bumps `updated_at`.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(sizes) = self.sizes {
            product.sizes = sizes;
        }
        if let Some(colors) = self.colors {
            product.colors = colors;
        }
        if let Some(featured) = self.featured {
            product.featured = featured;
        }
        product.images.extend(self.new_images);
        product.updated_at = Utc::now();
    }
}

/// Self-service profile fields. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdate {
    /// Applies the update to `user` and bumps `updated_at`.
    pub fn apply_to(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(address) = self.address {
            user.address = Some(address);
        }
        user.updated_at = Utc::now();
    }
}

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, PartialEq)]
pub enum StockReservation {
    /// Stock was decremented; carries the product as it is after the write.
    Reserved(Product),
    /// Stock was left untouched because it is lower than requested; carries
    /// the current product.
    Insufficient(Product),
    /// No such product.
    NotFound,
}

/// Per-status order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStat {
    /// The status being aggregated.
    #[serde(rename = "_id")]
    pub status: OrderStatus,
    /// Number of orders in this status.
    pub count: u64,
    /// Sum of their totals.
    pub total_amount: Decimal,
}

/// Order statistics for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderStats {
    /// Aggregates per status that has at least one order.
    pub by_status: Vec<StatusStat>,
    /// Number of orders overall.
    pub total_orders: u64,
    /// Sum of totals of every order that is not cancelled.
    pub total_revenue: Decimal,
}

impl OrderStats {
    /// Builds the statistics from per-status groups.
    pub fn from_groups(mut by_status: Vec<StatusStat>) -> Self {
        by_status.sort_by_key(|stat| stat.status as u8);
        let total_orders = by_status.iter().map(|stat| stat.count).sum();
        let total_revenue = by_status
            .iter()
            .filter(|stat| stat.status != OrderStatus::Cancelled)
            .map(|stat| stat.total_amount)
            .sum();

        Self {
            by_status,
            total_orders,
            total_revenue,
        }
    }
}

/// Trait for shop storage operations.
#[async_trait]
pub trait ShopStore: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Creates a new user. Fails with `AlreadyExists` if the email is taken.
    async fn create_user(&self, user: User) -> StoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Gets a user by email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Lists all users, newest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Overwrites the profile fields present in `update`. Returns `None` if
    /// the user is absent.
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>>;

    /// Sets the role. Returns `None` if the user is absent.
    async fn set_user_role(&self, id: Uuid, role: UserRole) -> StoreResult<Option<User>>;

    /// Links a Google account to a user that has none yet. Returns `None` if
    /// the user is absent or already linked.
    async fn link_google_id(&self, id: Uuid, google_id: &str) -> StoreResult<Option<User>>;

    // =========================================================================
    // Product operations
    // =========================================================================

    /// Creates a new product.
    async fn create_product(&self, product: Product) -> StoreResult<Product>;

    /// Gets a product by ID.
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

    /// Lists products newest first, returning the page and the total number
    /// of matches.
    async fn list_products(&self, filter: ProductFilter) -> StoreResult<(Vec<Product>, u64)>;

    /// Applies `patch` as one atomic write. Returns `None` if the product is
    /// absent.
    async fn patch_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>>;

    /// Deletes a product.
    async fn delete_product(&self, id: Uuid) -> StoreResult<()>;

    /// Decrements stock by `quantity` if and only if at least `quantity`
    /// units are available, as one atomic write.
    async fn reserve_stock(&self, id: Uuid, quantity: i32) -> StoreResult<StockReservation>;

    /// Increments stock by `quantity`. Returns false if the product no longer
    /// exists.
    async fn restore_stock(&self, id: Uuid, quantity: i32) -> StoreResult<bool>;

    // =========================================================================
    // Order operations
    // =========================================================================

    /// Creates a new order.
    async fn create_order(&self, order: Order) -> StoreResult<Order>;

    /// Gets an order by ID.
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// Lists orders newest first, returning the page and the total number of
    /// matches.
    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<(Vec<Order>, u64)>;

    /// Sets the status unconditionally. Returns `None` if the order is absent.
    async fn set_order_status(&self, id: Uuid, status: OrderStatus)
        -> StoreResult<Option<Order>>;

    /// Sets the status only if the current status is one of `from`, as one
    /// atomic write. Returns `None` if the order is absent or its status did
    /// not match.
    async fn transition_order_status(
        &self,
        id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> StoreResult<Option<Order>>;

    /// Aggregates order counts and totals per status.
    async fn order_stats(&self) -> StoreResult<OrderStats>;
}
