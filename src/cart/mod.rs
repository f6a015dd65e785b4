//! Shopping cart kept on the shopper's side.
//!
//! A [`Cart`] is restored once from a [`KeyValueStore`] slot and mirrors its
//! line items back to that slot after every mutation. Mutations are refused
//! until the restore has finished, so an empty in-memory cart can never
//! overwrite a saved one.

mod storage;

pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::entities::product;

pub const CART_STORAGE_KEY: &str = "forever-shop-cart";
pub const CURRENCY: &str = "FCFA";

/// Denormalized copy of a product taken when it is put in the cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub price: i64,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<&product::Model> for ProductSnapshot {
    fn from(model: &product::Model) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name.clone(),
            slug: model.slug.clone(),
            category: model.category.clone(),
            price: model.price,
            image: model.image.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductSnapshot,
    pub quantity: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartPhase {
    Uninitialized,
    Restoring,
    Ready,
}

impl fmt::Display for CartPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CartPhase::Uninitialized => "uninitialized",
            CartPhase::Restoring => "restoring",
            CartPhase::Ready => "ready",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("cart is not ready yet ({0})")]
    NotReady(CartPhase),
    #[error("cart has already been restored")]
    AlreadyRestored,
}

pub struct Cart<S: KeyValueStore> {
    store: S,
    items: Vec<LineItem>,
    phase: CartPhase,
}

impl<S: KeyValueStore> Cart<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            items: Vec::new(),
            phase: CartPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> CartPhase {
        self.phase
    }

    /// Loads the saved line items. A missing or unreadable slot starts empty.
    pub fn restore(&mut self) -> Result<(), CartError> {
        if self.phase != CartPhase::Uninitialized {
            return Err(CartError::AlreadyRestored);
        }
        self.phase = CartPhase::Restoring;

        let saved = match self.store.get(CART_STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<LineItem>>(&raw).unwrap_or_else(|err| {
                error!(error = %err, "Saved cart is corrupted, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                error!(error = %err, "Failed to read saved cart, starting empty");
                Vec::new()
            }
        };

        self.items.clear();
        for item in saved {
            if item.quantity == 0 {
                warn!(product_id = %item.product.id, "Dropping saved cart line with zero quantity");
                continue;
            }
            self.push(item.product, item.quantity);
        }

        self.phase = CartPhase::Ready;
        debug!(lines = self.items.len(), "Cart restored");
        Ok(())
    }

    /// Adds `quantity` units, merging with an existing line for the same product.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32) -> Result<(), CartError> {
        self.ensure_ready()?;
        if quantity == 0 {
            return Ok(());
        }
        self.push(product, quantity);
        self.persist();
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) -> Result<(), CartError> {
        self.ensure_ready()?;
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        if self.items.len() != before {
            self.persist();
        }
        Ok(())
    }

    /// Sets the quantity of a line already in the cart. Zero or less removes it.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> Result<(), CartError> {
        self.ensure_ready()?;
        if quantity <= 0 {
            return self.remove(product_id);
        }
        if let Some(item) = self.line_mut(product_id) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            self.persist();
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), CartError> {
        self.ensure_ready()?;
        self.items.clear();
        self.persist();
        Ok(())
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of price × quantity, in minor units.
    pub fn total_price(&self) -> i64 {
        self.items
            .iter()
            .map(|item| item.product.price.saturating_mul(i64::from(item.quantity)))
            .fold(0i64, i64::saturating_add)
    }

    pub fn is_in_cart(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| item.product.id == product_id)
    }

    pub fn item_quantity(&self, product_id: &str) -> u32 {
        self.items
            .iter()
            .find(|item| item.product.id == product_id)
            .map_or(0, |item| item.quantity)
    }

    fn ensure_ready(&self) -> Result<(), CartError> {
        match self.phase {
            CartPhase::Ready => Ok(()),
            phase => Err(CartError::NotReady(phase)),
        }
    }

    fn line_mut(&mut self, product_id: &str) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| item.product.id == product_id)
    }

    fn push(&mut self, product: ProductSnapshot, quantity: u32) {
        match self.line_mut(&product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(LineItem { product, quantity }),
        }
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.items)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(CART_STORAGE_KEY, &raw));
        if let Err(err) = result {
            error!(error = %err, "Failed to save cart");
        }
    }
}

/// Renders minor units for display, e.g. `19500` as `19 500 FCFA`.
pub fn format_price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} {CURRENCY}")
}
