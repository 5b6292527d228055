use serde::{Deserialize, Serialize};

/// One product entry in the basket, with the price and stock level
/// captured when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: u64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Sale price in cents.
    pub price_cents: i64,
    /// Regular price in cents, kept for the savings calculation.
    #[serde(default)]
    pub original_price_cents: Option<i64>,
    pub quantity: u32,
    /// Stock level captured when the line was added or last reconciled.
    pub stock_available: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartLine {
    pub fn subtotal_cents(&self) -> i64 {
        self.price_cents * i64::from(self.quantity)
    }

    pub fn savings_cents(&self) -> i64 {
        self.original_price_cents
            .map(|regular| (regular - self.price_cents) * i64::from(self.quantity))
            .unwrap_or(0)
    }
}

/// Catalog product as handed to the cart by the storefront. `stock` may be
/// absent for delisted products; the cart treats that as zero available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub stock: Option<StockInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInfo {
    pub sale_price_cents: i64,
    #[serde(default)]
    pub regular_price_cents: Option<i64>,
    pub quantity: u32,
}

/// Immutable copy of a cart line written at checkout-intent time, consumed
/// by the order-creation screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub original_price_cents: Option<i64>,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    pub category: String,
    pub stock_quantity: u32,
}

impl From<&CartLine> for CheckoutLine {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.product_id,
            name: line.name.clone(),
            code: line.code.clone(),
            brand: line.brand.clone(),
            price_cents: line.price_cents,
            original_price_cents: line.original_price_cents,
            quantity: line.quantity,
            image: line.image.clone(),
            category: "productos".into(),
            stock_quantity: line.stock_available,
        }
    }
}
