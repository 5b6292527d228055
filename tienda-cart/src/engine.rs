use std::sync::Arc;

use tienda_store::{get_json, keys, set_json, KeyValueStore};
use tracing::{debug, warn};

use crate::models::{CartLine, CheckoutLine, Product};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Stock insuficiente. Disponible: {0}")]
    InsufficientStock(u32),

    #[error("Producto sin stock disponible")]
    OutOfStock,

    #[error("El carrito está vacío")]
    EmptyCart,

    #[error("Productos con stock insuficiente:\n{0}")]
    StockConflicts(String),
}

/// Owns the mutable pre-order basket. Every mutation keeps the invariant
/// `0 < quantity <= stock_available` on every line and persists the cart
/// to durable storage.
pub struct CartEngine {
    items: Vec<CartLine>,
    store: Arc<dyn KeyValueStore>,
    loading: bool,
    error: Option<CartError>,
}

impl CartEngine {
    /// Restores the cart from durable storage; a missing or corrupt value
    /// starts an empty cart.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let items = get_json(store.as_ref(), keys::CART).unwrap_or_default();
        Self {
            items,
            store,
            loading: false,
            error: None,
        }
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub fn total_price_cents(&self) -> i64 {
        self.items.iter().map(CartLine::subtotal_cents).sum()
    }

    pub fn total_savings_cents(&self) -> i64 {
        self.items.iter().map(CartLine::savings_cents).sum()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<String> {
        self.error.as_ref().map(CartError::to_string)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Adds one unit of `product`. An existing line is incremented; a new
    /// line captures the sale price, regular price and stock snapshot.
    /// Returns false (cart unchanged, error set) when the stock ceiling
    /// would be exceeded or the product has no stock.
    pub fn add_item(&mut self, product: &Product) -> bool {
        let available = product.stock.as_ref().map(|s| s.quantity).unwrap_or(0);

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            if line.quantity >= available {
                self.error = Some(CartError::InsufficientStock(available));
                return false;
            }
            line.quantity += 1;
        } else {
            let Some(stock) = product.stock.as_ref().filter(|s| s.quantity >= 1) else {
                self.error = Some(CartError::OutOfStock);
                return false;
            };
            self.items.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                code: product.code.clone(),
                brand: product.brand.clone(),
                price_cents: stock.sale_price_cents,
                original_price_cents: stock.regular_price_cents,
                quantity: 1,
                stock_available: stock.quantity,
                image: product.image.clone(),
            });
        }

        self.persist();
        self.error = None;
        debug!(product_id = product.id, "added to cart");
        true
    }

    /// Deletes the line if present; absent is a no-op, not an error.
    pub fn remove_item(&mut self, product_id: u64) {
        let before = self.items.len();
        self.items.retain(|line| line.product_id != product_id);
        if self.items.len() != before {
            self.persist();
        }
    }

    /// Sets a line's quantity. Zero removes the line; exceeding the
    /// captured stock is rejected with no mutation.
    pub fn set_quantity(&mut self, product_id: u64, quantity: u32) {
        if quantity == 0 {
            self.remove_item(product_id);
            return;
        }
        let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        else {
            return;
        };
        if quantity <= line.stock_available {
            line.quantity = quantity;
            self.persist();
        } else {
            self.error = Some(CartError::InsufficientStock(line.stock_available));
        }
    }

    pub fn increment(&mut self, product_id: u64) {
        let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        else {
            return;
        };
        if line.quantity < line.stock_available {
            line.quantity += 1;
            self.persist();
        } else {
            self.error = Some(CartError::InsufficientStock(line.stock_available));
        }
    }

    /// Decrements by one; reaching zero removes the line.
    pub fn decrement(&mut self, product_id: u64) {
        let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        else {
            return;
        };
        if line.quantity > 1 {
            line.quantity -= 1;
            self.persist();
        } else {
            self.remove_item(product_id);
        }
    }

    /// Empties the cart and erases the cart and checkout-snapshot keys.
    pub fn clear(&mut self) {
        self.items.clear();
        self.store.remove(keys::CART);
        self.store.remove(keys::CHECKOUT_CART);
    }

    /// Checks every line against its captured stock (stock may have moved
    /// since the line was added). Does not refresh stock remotely; that is
    /// the caller's job via [`CartEngine::reconcile_stock`].
    pub async fn validate(&mut self) -> bool {
        self.loading = true;
        self.error = None;

        let conflicts: Vec<String> = self
            .items
            .iter()
            .filter(|line| line.quantity > line.stock_available)
            .map(|line| {
                format!(
                    "{}: solicitado {}, disponible {}",
                    line.name, line.quantity, line.stock_available
                )
            })
            .collect();

        self.loading = false;
        if conflicts.is_empty() {
            true
        } else {
            self.error = Some(CartError::StockConflicts(conflicts.join("\n")));
            false
        }
    }

    /// Writes an immutable checkout snapshot to durable storage. The live
    /// cart is not mutated. Fails on an empty cart.
    pub fn snapshot_for_checkout(&mut self) -> bool {
        if self.items.is_empty() {
            self.error = Some(CartError::EmptyCart);
            return false;
        }
        let snapshot: Vec<CheckoutLine> = self.items.iter().map(CheckoutLine::from).collect();
        set_json(self.store.as_ref(), keys::CHECKOUT_CART, &snapshot);
        true
    }

    /// Reads back the snapshot written by [`CartEngine::snapshot_for_checkout`].
    pub fn checkout_snapshot(&self) -> Option<Vec<CheckoutLine>> {
        get_json(self.store.as_ref(), keys::CHECKOUT_CART)
    }

    /// External stock-refresh hook: updates the captured stock for a line
    /// and clamps or removes the line if its quantity now exceeds it.
    pub fn reconcile_stock(&mut self, product_id: u64, new_stock: u32) {
        let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        else {
            return;
        };
        line.stock_available = new_stock;
        if line.quantity > new_stock {
            if new_stock == 0 {
                warn!(product_id, "product out of stock, dropping cart line");
                self.remove_item(product_id);
                return;
            }
            line.quantity = new_stock;
        }
        self.persist();
    }

    /// Stashes the cart for the add-to-cart-then-login flow.
    pub fn stash_pending(&self) {
        set_json(self.store.as_ref(), keys::PENDING_CART, &self.items);
    }

    /// Restores a stashed cart after login. Quantities are preserved but
    /// clamped to the captured stock; lines already in the cart win.
    pub fn restore_pending(&mut self) {
        let Some(stashed) =
            get_json::<Vec<CartLine>>(self.store.as_ref(), keys::PENDING_CART)
        else {
            return;
        };
        for mut line in stashed {
            if self.items.iter().any(|l| l.product_id == line.product_id) {
                continue;
            }
            if line.stock_available == 0 {
                continue;
            }
            line.quantity = line.quantity.min(line.stock_available).max(1);
            self.items.push(line);
        }
        self.store.remove(keys::PENDING_CART);
        self.persist();
    }

    fn persist(&self) {
        set_json(self.store.as_ref(), keys::CART, &self.items);
    }
}
