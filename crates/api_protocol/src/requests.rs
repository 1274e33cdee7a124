//! Request types.

use entities::{OrderStatus, Product, ShippingAddress, UserRole};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shop_store::{OrderFilter, ProductFilter, ProductPatch, ProfileUpdate};
use uuid::Uuid;

use crate::{
    require_non_blank, validate_email, validate_page, Page, Validate, ValidationError,
    DEFAULT_ORDER_PAGE_SIZE, DEFAULT_PRODUCT_PAGE_SIZE,
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum number of images accepted by one product upload.
pub const MAX_PRODUCT_IMAGES: usize = 5;

/// Maximum size of a single product image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Auth Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Accepted for compatibility with older clients and ignored: new
    /// accounts are always customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::message(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("email", &self.email)?;
        require_non_blank("password", &self.password)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GoogleLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub google_id: String,
    /// Profile picture URL. Not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl Validate for GoogleLoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if [&self.email, &self.name, &self.google_id]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ValidationError::message(
                "Missing required Google profile information",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl UpdateProfileRequest {
    /// Converts into a store update carrying only the present fields.
    pub fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name,
            phone: self.phone,
            address: self.address,
        }
    }
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => require_non_blank("name", name),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub role: String,
}

impl UpdateRoleRequest {
    /// Returns the requested role, if it is a known one.
    pub fn role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }
}

impl Validate for UpdateRoleRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.role()
            .map(|_| ())
            .ok_or_else(|| ValidationError::message("Invalid role. Must be customer or admin."))
    }
}

// ============================================================================
// Order Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::message(
                "Order must contain at least one item",
            ));
        }
        if self.items.iter().any(|item| item.quantity < 1) {
            return Err(ValidationError::invalid("quantity", "must be at least 1"));
        }

        let address = &self.shipping_address;
        require_non_blank("shippingAddress.street", &address.street)?;
        require_non_blank("shippingAddress.city", &address.city)?;
        require_non_blank("shippingAddress.country", &address.country)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

impl UpdateOrderStatusRequest {
    /// Returns the requested status, if it is a known one.
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::parse(&self.status)
    }
}

fn invalid_status() -> ValidationError {
    let allowed: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
    ValidationError::message(format!(
        "Invalid status. Must be one of: {}",
        allowed.join(", ")
    ))
}

impl Validate for UpdateOrderStatusRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.status().map(|_| ()).ok_or_else(invalid_status)
    }
}

// ============================================================================
// Query Strings
// ============================================================================

/// Query string of the public product listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    /// `"true"` selects featured products, any other value non-featured ones.
    pub featured: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Resolved page.
    pub fn page(&self) -> Page {
        Page::resolve(self.page, self.limit, DEFAULT_PRODUCT_PAGE_SIZE)
    }

    /// Store filter for active products matching this query.
    pub fn to_filter(&self) -> ProductFilter {
        let page = self.page();
        ProductFilter {
            active_only: true,
            category: blank_to_none(&self.category).map(str::to_string),
            featured: blank_to_none(&self.featured).map(|v| v == "true"),
            search: blank_to_none(&self.search).map(str::to_string),
            limit: Some(page.limit),
            offset: Some(page.offset()),
        }
    }
}

impl Validate for ProductQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_page(self.page, self.limit)
    }
}

/// Query string of the admin order listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderQuery {
    /// Resolved page.
    pub fn page(&self) -> Page {
        Page::resolve(self.page, self.limit, DEFAULT_ORDER_PAGE_SIZE)
    }

    /// Store filter for this query.
    pub fn to_filter(&self) -> Result<OrderFilter, ValidationError> {
        let status = blank_to_none(&self.status)
            .map(|status| OrderStatus::parse(status).ok_or_else(invalid_status))
            .transpose()?;
        let page = self.page();

        Ok(OrderFilter {
            customer: None,
            status,
            limit: Some(page.limit),
            offset: Some(page.offset()),
        })
    }
}

impl Validate for OrderQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_page(self.page, self.limit)?;
        self.to_filter().map(|_| ())
    }
}

// ============================================================================
// Product Form
// ============================================================================

/// Text fields of the multipart product form. Every value arrives as a
/// string; `sizes` and `colors` carry JSON arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub sizes: Option<String>,
    pub colors: Option<String>,
    pub stock: Option<String>,
    pub featured: Option<String>,
}

/// Name of the multipart field carrying image files.
pub const PRODUCT_IMAGES_FIELD: &str = "images";

/// Largest price a product may carry; prices are stored as NUMERIC(12, 2).
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

fn parse_price(value: &str) -> Result<Decimal, ValidationError> {
    let price: Decimal = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::invalid("price", "must be a number"))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::invalid("price", "must not be negative"));
    }
    if price.normalize().scale() > 2 {
        return Err(ValidationError::invalid(
            "price",
            "must have at most two decimal places",
        ));
    }
    if price > MAX_PRICE {
        return Err(ValidationError::invalid("price", "is too large"));
    }
    Ok(price)
}

fn parse_stock(value: &str) -> Result<i32, ValidationError> {
    let stock: i32 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::invalid("stock", "must be a whole number"))?;
    if stock < 0 {
        return Err(ValidationError::invalid("stock", "must not be negative"));
    }
    Ok(stock)
}

fn parse_string_list(field: &'static str, value: &str) -> Result<Vec<String>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(value)
        .map_err(|_| ValidationError::invalid(field, "must be a JSON array of strings"))
}

impl ProductForm {
    /// Records a text field. Unknown field names are rejected.
    pub fn set_field(&mut self, name: &str, value: String) -> Result<(), ValidationError> {
        let slot = match name {
            "name" => &mut self.name,
            "description" => &mut self.description,
            "price" => &mut self.price,
            "category" => &mut self.category,
            "sizes" => &mut self.sizes,
            "colors" => &mut self.colors,
            "stock" => &mut self.stock,
            "featured" => &mut self.featured,
            other => {
                return Err(ValidationError::message(format!("Unexpected field {other}")));
            }
        };
        *slot = Some(value);
        Ok(())
    }

    /// Builds a new product. `name`, `price`, `category` and `stock` are
    /// required.
    pub fn into_product(self, images: Vec<String>) -> Result<Product, ValidationError> {
        let name = self.name.ok_or(ValidationError::Required("name"))?;
        require_non_blank("name", &name)?;
        let category = self.category.ok_or(ValidationError::Required("category"))?;
        require_non_blank("category", &category)?;
        let price = parse_price(self.price.as_deref().ok_or(ValidationError::Required("price"))?)?;
        let stock = parse_stock(self.stock.as_deref().ok_or(ValidationError::Required("stock"))?)?;
        let sizes = parse_string_list("sizes", self.sizes.as_deref().unwrap_or_default())?;
        let colors = parse_string_list("colors", self.colors.as_deref().unwrap_or_default())?;

        Ok(
            Product::new(name, self.description.unwrap_or_default(), price, category, stock)
                .with_sizes(sizes)
                .with_colors(colors)
                .with_featured(self.featured.as_deref() == Some("true"))
                .with_images(images),
        )
    }

    /// Converts the fields present in the form into a store patch. Images
    /// are attached by the caller after upload.
    pub fn into_patch(self) -> Result<ProductPatch, ValidationError> {
        if let Some(name) = &self.name {
            require_non_blank("name", name)?;
        }
        if let Some(category) = &self.category {
            require_non_blank("category", category)?;
        }
        Ok(ProductPatch {
            price: self.price.as_deref().map(parse_price).transpose()?,
            stock: self.stock.as_deref().map(parse_stock).transpose()?,
            sizes: self
                .sizes
                .as_deref()
                .map(|v| parse_string_list("sizes", v))
                .transpose()?,
            colors: self
                .colors
                .as_deref()
                .map(|v| parse_string_list("colors", v))
                .transpose()?,
            featured: self.featured.map(|v| v == "true"),
            name: self.name,
            description: self.description,
            category: self.category,
            new_images: Vec::new(),
        })
    }
}
