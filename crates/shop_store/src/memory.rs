//! In-memory shop store implementation for development and testing.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use entities::{Order, OrderStatus, Product, User, UserRole};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    OrderFilter, OrderStats, ProductFilter, ProductPatch, ProfileUpdate, ShopStore, StatusStat,
    StockReservation, StoreError, StoreResult,
};

/// In-memory shop store.
///
/// Every write takes the relevant map's write lock for its whole
/// read-modify-write, which gives the same per-record atomicity the
/// PostgreSQL store gets from single-statement updates.
#[derive(Debug, Default, Clone)]
pub struct MemoryShopStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl MemoryShopStore {
    /// Creates a new in-memory shop store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Applies offset/limit to an already sorted result set.
fn paginate<T>(items: Vec<T>, offset: Option<u32>, limit: Option<u32>) -> Vec<T> {
    let iter = items.into_iter().skip(offset.unwrap_or(0) as usize);
    match limit {
        Some(limit) => iter.take(limit as usize).collect(),
        None => iter.collect(),
    }
}

#[async_trait]
impl ShopStore for MemoryShopStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(StoreError::already_exists("User", user.email));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(result)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            update.apply_to(user);
            user.clone()
        }))
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn link_google_id(&self, id: Uuid, google_id: &str) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(&id)
            .filter(|user| user.google_id.is_none())
            .map(|user| {
                user.google_id = Some(google_id.to_string());
                user.updated_at = Utc::now();
                user.clone()
            }))
    }

    // =========================================================================
    // Product operations
    // =========================================================================

    async fn create_product(&self, product: Product) -> StoreResult<Product> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(StoreError::already_exists("Product", product.id.to_string()));
        }
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }

    async fn list_products(&self, filter: ProductFilter) -> StoreResult<(Vec<Product>, u64)> {
        let products = self.products.read().await;
        let mut result: Vec<Product> = products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = result.len() as u64;
        Ok((paginate(result, filter.offset, filter.limit), total))
    }

    async fn patch_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&id).map(|product| {
            patch.apply_to(product);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
        let mut products = self.products.write().await;
        if products.remove(&id).is_none() {
            return Err(StoreError::not_found("Product", id.to_string()));
        }
        Ok(())
    }

    async fn reserve_stock(&self, id: Uuid, quantity: i32) -> StoreResult<StockReservation> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Ok(StockReservation::NotFound);
        };
        if !product.has_stock_for(quantity) {
            return Ok(StockReservation::Insufficient(product.clone()));
        }
        product.stock -= quantity;
        product.updated_at = Utc::now();
        Ok(StockReservation::Reserved(product.clone()))
    }

    async fn restore_stock(&self, id: Uuid, quantity: i32) -> StoreResult<bool> {
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(product) => {
                product.stock += quantity;
                product.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Order operations
    // =========================================================================

    async fn create_order(&self, order: Order) -> StoreResult<Order> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::already_exists("Order", order.id.to_string()));
        }
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<(Vec<Order>, u64)> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = result.len() as u64;
        Ok((paginate(result, filter.offset, filter.limit), total))
    }

    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> StoreResult<Option<Order>> {
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(&id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }

    async fn transition_order_status(
        &self,
        id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> StoreResult<Option<Order>> {
        let mut orders = self.orders.write().await;
        Ok(orders
            .get_mut(&id)
            .filter(|order| from.contains(&order.status))
            .map(|order| {
                order.status = to;
                order.updated_at = Utc::now();
                order.clone()
            }))
    }

    async fn order_stats(&self) -> StoreResult<OrderStats> {
        let orders = self.orders.read().await;
        let mut groups: HashMap<OrderStatus, (u64, Decimal)> = HashMap::new();
        for order in orders.values() {
            let entry = groups.entry(order.status).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += order.total_amount;
        }

        Ok(OrderStats::from_groups(
            groups
                .into_iter()
                .map(|(status, (count, total_amount))| StatusStat {
                    status,
                    count,
                    total_amount,
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use entities::{OrderItem, ShippingAddress};

    use super::*;

    fn product(name: &str, price: i64, stock: i32) -> Product {
        Product::new(name, "", Decimal::from(price), "general", stock)
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: Some("Amina".to_string()),
            street: "Kenyatta Ave 1".to_string(),
            city: "Nakuru".to_string(),
            state: None,
            postal_code: None,
            country: "Kenya".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryShopStore::new();
        store
            .create_user(User::new("First", "same@example.com"))
            .await
            .unwrap();

        let result = store.create_user(User::new("Second", "same@example.com")).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_profile_update_keeps_role() {
        let store = MemoryShopStore::new();
        let user = store
            .create_user(User::new("Wanjiru", "wanjiru@example.com").with_role(UserRole::Admin))
            .await
            .unwrap();

        store.set_user_role(user.id, UserRole::Customer).await.unwrap();
        let updated = store
            .update_profile(
                user.id,
                ProfileUpdate {
                    phone: Some("0700000000".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.role, UserRole::Customer);
        assert_eq!(updated.name, "Wanjiru");
        assert_eq!(updated.phone.as_deref(), Some("0700000000"));
        assert!(store
            .update_profile(Uuid::new_v4(), ProfileUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_link_google_id_only_once() {
        let store = MemoryShopStore::new();
        let user = store
            .create_user(User::new("Otieno", "otieno@example.com"))
            .await
            .unwrap();

        let linked = store.link_google_id(user.id, "google-1").await.unwrap();
        assert_eq!(linked.unwrap().google_id.as_deref(), Some("google-1"));

        assert!(store.link_google_id(user.id, "google-2").await.unwrap().is_none());
        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.google_id.as_deref(), Some("google-1"));
    }

    #[tokio::test]
    async fn test_patch_product_keeps_concurrent_reservation() {
        let store = MemoryShopStore::new();
        let created = store
            .create_product(product("Kitenge Dress", 40, 5).with_images(vec!["a.jpg".to_string()]))
            .await
            .unwrap();

        store.reserve_stock(created.id, 2).await.unwrap();
        let patched = store
            .patch_product(
                created.id,
                ProductPatch {
                    name: Some("Kitenge Maxi Dress".to_string()),
                    new_images: vec!["b.jpg".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(patched.name, "Kitenge Maxi Dress");
        assert_eq!(patched.stock, 3);
        assert_eq!(patched.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(store.get_product(created.id).await.unwrap().unwrap().stock, 3);
        assert!(store
            .patch_product(Uuid::new_v4(), ProductPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reserve_stock() {
        let store = MemoryShopStore::new();
        let created = store.create_product(product("Shirt", 10, 3)).await.unwrap();

        let reserved = store.reserve_stock(created.id, 2).await.unwrap();
        assert!(matches!(reserved, StockReservation::Reserved(ref p) if p.stock == 1));

        let insufficient = store.reserve_stock(created.id, 2).await.unwrap();
        assert!(matches!(insufficient, StockReservation::Insufficient(ref p) if p.stock == 1));

        let missing = store.reserve_stock(Uuid::new_v4(), 1).await.unwrap();
        assert_eq!(missing, StockReservation::NotFound);

        assert_eq!(store.get_product(created.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let store = MemoryShopStore::new();
        let created = store.create_product(product("Limited", 10, 5)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.reserve_stock(created.id, 1).await.unwrap()
            }));
        }

        let mut reserved = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), StockReservation::Reserved(_)) {
                reserved += 1;
            }
        }

        assert_eq!(reserved, 5);
        assert_eq!(store.get_product(created.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_restore_stock() {
        let store = MemoryShopStore::new();
        let created = store.create_product(product("Hat", 5, 0)).await.unwrap();

        assert!(store.restore_stock(created.id, 4).await.unwrap());
        assert!(!store.restore_stock(Uuid::new_v4(), 4).await.unwrap());
        assert_eq!(store.get_product(created.id).await.unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_list_products_paginates_newest_first() {
        let store = MemoryShopStore::new();
        let mut last = None;
        for i in 0..25 {
            let mut p = product(&format!("Product {i}"), 1, 1);
            p.created_at = Utc::now() + chrono::Duration::seconds(i);
            last = Some(store.create_product(p).await.unwrap());
        }

        let (page, total) = store
            .list_products(ProductFilter {
                limit: Some(10),
                offset: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 25);
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].name, "Product 14");

        let (first_page, _) = store
            .list_products(ProductFilter {
                limit: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first_page[0].id, last.unwrap().id);
    }

    #[tokio::test]
    async fn test_transition_order_status_is_guarded() {
        let store = MemoryShopStore::new();
        let item = OrderItem {
            product: Uuid::new_v4(),
            quantity: 1,
            size: None,
            color: None,
            price: Decimal::from(7),
        };
        let order = store
            .create_order(Order::new(Uuid::new_v4(), vec![item], address()).unwrap())
            .await
            .unwrap();

        let cancelled = store
            .transition_order_status(order.id, &OrderStatus::CANCELLABLE, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.unwrap().status, OrderStatus::Cancelled);

        let again = store
            .transition_order_status(order.id, &OrderStatus::CANCELLABLE, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_order_stats() {
        let store = MemoryShopStore::new();
        let customer = Uuid::new_v4();
        let item = |price: i64| OrderItem {
            product: Uuid::new_v4(),
            quantity: 1,
            size: None,
            color: None,
            price: Decimal::from(price),
        };

        store
            .create_order(Order::new(customer, vec![item(10)], address()).unwrap())
            .await
            .unwrap();
        let cancelled = store
            .create_order(Order::new(customer, vec![item(30)], address()).unwrap())
            .await
            .unwrap();
        store
            .set_order_status(cancelled.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let stats = store.order_stats().await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_revenue, Decimal::from(10));
        assert_eq!(stats.by_status.len(), 2);
    }
}
