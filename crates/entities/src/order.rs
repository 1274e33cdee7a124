//! Order entity definitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation.
    #[default]
    Pending,
    /// Confirmed by the shop.
    Confirmed,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled; stock may have been restored.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Statuses from which a customer may cancel.
    pub const CANCELLABLE: [OrderStatus; 2] = [Self::Pending, Self::Confirmed];

    /// Converts the status to a string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if a customer may still cancel.
    pub fn is_cancellable(&self) -> bool {
        Self::CANCELLABLE.contains(self)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShippingAddress {
    /// Recipient name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Street and house number.
    pub street: String,
    /// City or town.
    pub city: String,
    /// State, county or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal or ZIP code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country.
    pub country: String,
    /// Contact phone for the courier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One product line of an order, priced at the moment the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Referenced product.
    pub product: Uuid,
    /// Units ordered.
    pub quantity: i32,
    /// Chosen size.
    pub size: Option<String>,
    /// Chosen color.
    pub color: Option<String>,
    /// Unit price snapshot.
    pub price: Decimal,
}

impl OrderItem {
    /// Returns `price * quantity`, or `None` if it does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique identifier.
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Owning customer.
    pub customer: Uuid,
    /// Line-item snapshot.
    pub items: Vec<OrderItem>,
    /// Sum of all line totals at creation time.
    pub total_amount: Decimal,
    /// Current status.
    pub status: OrderStatus,
    /// Destination.
    pub shipping_address: ShippingAddress,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sums the line totals of `items`. `None` on overflow.
    pub fn total_of(items: &[OrderItem]) -> Option<Decimal> {
        items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_total()?))
    }

    /// Creates a pending order. The total is derived from the items; `None`
    /// if it overflows.
    pub fn new(
        customer: Uuid,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
    ) -> Option<Self> {
        let now = Utc::now();
        let total_amount = Self::total_of(&items)?;
        Some(Self {
            id: Uuid::new_v4(),
            customer,
            items,
            total_amount,
            status: OrderStatus::Pending,
            shipping_address,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if `user_id` placed this order.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.customer == user_id
    }
}
