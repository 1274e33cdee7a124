//! PostgreSQL shop store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Order, OrderItem, OrderStatus, Product, ShippingAddress, User, UserRole};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    OrderFilter, OrderStats, ProductFilter, ProductPatch, ProfileUpdate, ShopStore, StatusStat,
    StockReservation, StoreError, StoreResult,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        google_id TEXT,
        role TEXT NOT NULL DEFAULT 'customer',
        phone TEXT,
        address TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        category TEXT NOT NULL,
        stock INTEGER NOT NULL CHECK (stock >= 0),
        sizes TEXT[] NOT NULL DEFAULT '{}',
        colors TEXT[] NOT NULL DEFAULT '{}',
        images TEXT[] NOT NULL DEFAULT '{}',
        featured BOOLEAN NOT NULL DEFAULT FALSE,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        customer_id UUID NOT NULL REFERENCES users (id),
        items JSONB NOT NULL,
        total_amount NUMERIC(24, 2) NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        shipping_address JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_products_created_at ON products (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer_id ON orders (customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at DESC)",
];

const USER_COLUMNS: &str =
    "id, name, email, password_hash, google_id, role, phone, address, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, stock, sizes, colors, \
     images, featured, is_active, created_at, updated_at";

const ORDER_COLUMNS: &str =
    "id, customer_id, items, total_amount, status, shipping_address, created_at, updated_at";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: Option<String>,
    google_id: Option<String>,
    role: String,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        let role = UserRole::parse(&row.role)
            .ok_or_else(|| StoreError::CorruptRecord(format!("unknown role '{}'", row.role)))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            google_id: row.google_id,
            role,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    stock: i32,
    sizes: Vec<String>,
    colors: Vec<String>,
    images: Vec<String>,
    featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            stock: row.stock,
            sizes: row.sizes,
            colors: row.colors,
            images: row.images,
            featured: row.featured,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    items: Json<Vec<OrderItem>>,
    total_amount: Decimal,
    status: String,
    shipping_address: Json<ShippingAddress>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> StoreResult<Self> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            StoreError::CorruptRecord(format!("unknown order status '{}'", row.status))
        })?;
        Ok(Self {
            id: row.id,
            customer: row.customer_id,
            items: row.items.0,
            total_amount: row.total_amount,
            status,
            shipping_address: row.shipping_address.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Maps a unique-constraint violation onto `AlreadyExists`.
fn map_unique_violation(
    entity_type: &'static str,
    id: String,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::already_exists(entity_type, id);
            }
        }
        StoreError::Database(e)
    }
}

/// `INSERT` of every column in `columns`, returning the stored row.
fn insert_returning(table: &str, columns: &str) -> String {
    let placeholders: Vec<String> = (1..=columns.split(',').count())
        .map(|i| format!("${i}"))
        .collect();
    format!(
        "INSERT INTO {table} ({columns}) VALUES ({}) RETURNING {columns}",
        placeholders.join(", ")
    )
}

/// Single-statement partial product update. `$1` is the id; absent fields
/// are bound as NULL and keep their stored value.
fn patch_product_sql() -> String {
    format!(
        r#"
        UPDATE products
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            category = COALESCE($5, category),
            stock = COALESCE($6, stock),
            sizes = COALESCE($7, sizes),
            colors = COALESCE($8, colors),
            featured = COALESCE($9, featured),
            images = images || $10::TEXT[],
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    )
}

/// Appends the WHERE clause shared by the product page and count queries.
fn push_product_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE TRUE");
    if filter.active_only {
        builder.push(" AND is_active");
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND featured = ").push_bind(featured);
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        builder
            .push(" AND (position(")
            .push_bind(needle.clone())
            .push(" IN lower(name)) > 0 OR position(")
            .push_bind(needle)
            .push(" IN lower(description)) > 0)");
    }
}

/// Appends the WHERE clause shared by the order page and count queries.
fn push_order_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    builder.push(" WHERE TRUE");
    if let Some(customer) = filter.customer {
        builder.push(" AND customer_id = ").push_bind(customer);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

fn push_pagination(builder: &mut QueryBuilder<'_, Postgres>, limit: Option<u32>, offset: Option<u32>) {
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }
    if let Some(offset) = offset {
        builder.push(" OFFSET ").push_bind(i64::from(offset));
    }
}

/// PostgreSQL shop store (for deployments).
#[derive(Debug, Clone)]
pub struct PostgresShopStore {
    pool: PgPool,
}

impl PostgresShopStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Initializes the database tables.
    pub async fn init(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Shop schema initialized");
        Ok(())
    }
}

#[async_trait]
impl ShopStore for PostgresShopStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(&insert_returning("users", USER_COLUMNS))
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.google_id)
            .bind(user.role.as_str())
            .bind(&user.phone)
            .bind(&user.address)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation("User", user.email.clone()))?;
        User::try_from(row)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), phone = COALESCE($3, phone),
                address = COALESCE($4, address), updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.phone)
        .bind(update.address)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn link_google_id(&self, id: Uuid, google_id: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET google_id = $2, updated_at = NOW()
            WHERE id = $1 AND google_id IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(google_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    // =========================================================================
    // Product operations
    // =========================================================================

    async fn create_product(&self, product: Product) -> StoreResult<Product> {
        let row: ProductRow = sqlx::query_as(&insert_returning("products", PRODUCT_COLUMNS))
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.category)
            .bind(product.stock)
            .bind(&product.sizes)
            .bind(&product.colors)
            .bind(&product.images)
            .bind(product.featured)
            .bind(product.is_active)
            .bind(product.created_at)
            .bind(product.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation("Product", product.id.to_string()))?;
        Ok(row.into())
    }

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Product::from))
    }

    async fn list_products(&self, filter: ProductFilter) -> StoreResult<(Vec<Product>, u64)> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_product_conditions(&mut count_query, &filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_product_conditions(&mut page_query, &filter);
        page_query.push(" ORDER BY created_at DESC, id");
        push_pagination(&mut page_query, filter.limit, filter.offset);
        let rows: Vec<ProductRow> = page_query.build_query_as().fetch_all(&self.pool).await?;

        Ok((
            rows.into_iter().map(Product::from).collect(),
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    async fn patch_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&patch_product_sql())
            .bind(id)
            .bind(patch.name)
            .bind(patch.description)
            .bind(patch.price)
            .bind(patch.category)
            .bind(patch.stock)
            .bind(patch.sizes)
            .bind(patch.colors)
            .bind(patch.featured)
            .bind(patch.new_images)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id.to_string()));
        }
        Ok(())
    }

    async fn reserve_stock(&self, id: Uuid, quantity: i32) -> StoreResult<StockReservation> {
        let reserved: Option<ProductRow> = sqlx::query_as(&format!(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = reserved {
            return Ok(StockReservation::Reserved(row.into()));
        }

        Ok(match self.get_product(id).await? {
            Some(product) => StockReservation::Insufficient(product),
            None => StockReservation::NotFound,
        })
    }

    async fn restore_stock(&self, id: Uuid, quantity: i32) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(quantity)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Order operations
    // =========================================================================

    async fn create_order(&self, order: Order) -> StoreResult<Order> {
        let row: OrderRow = sqlx::query_as(&insert_returning("orders", ORDER_COLUMNS))
            .bind(order.id)
            .bind(order.customer)
            .bind(Json(&order.items))
            .bind(order.total_amount)
            .bind(order.status.as_str())
            .bind(Json(&order.shipping_address))
            .bind(order.created_at)
            .bind(order.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation("Order", order.id.to_string()))?;
        Order::try_from(row)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<(Vec<Order>, u64)> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_order_conditions(&mut count_query, &filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_conditions(&mut page_query, &filter);
        page_query.push(" ORDER BY created_at DESC, id");
        push_pagination(&mut page_query, filter.limit, filter.offset);
        let rows: Vec<OrderRow> = page_query.build_query_as().fetch_all(&self.pool).await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((orders, u64::try_from(total).unwrap_or_default()))
    }

    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn transition_order_status(
        &self,
        id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> StoreResult<Option<Order>> {
        let from: Vec<&str> = from.iter().map(OrderStatus::as_str).collect();
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&from)
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn order_stats(&self) -> StoreResult<OrderStats> {
        let rows: Vec<(String, i64, Decimal)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*), COALESCE(SUM(total_amount), 0)
            FROM orders
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let groups = rows
            .into_iter()
            .map(|(status, count, total_amount)| {
                let status = OrderStatus::parse(&status).ok_or_else(|| {
                    StoreError::CorruptRecord(format!("unknown order status '{status}'"))
                })?;
                Ok(StatusStat {
                    status,
                    count: u64::try_from(count).unwrap_or_default(),
                    total_amount,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(OrderStats::from_groups(groups))
    }
}
