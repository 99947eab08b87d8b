//! Cart arithmetic.
//!
//! A cart is an ordered list of lines keyed by product id. Every mutation is
//! clamped against the product's available stock, so a cart never asks for
//! more units than exist. Persistence lives in the storefront; this module
//! only does the arithmetic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PastelId;

/// Errors from cart mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    /// Product has no stock left.
    #[error("product {0} is out of stock")]
    OutOfStock(PastelId),
    /// Product is not in the cart.
    #[error("product {0} is not in the cart")]
    LineNotFound(PastelId),
}

/// A single cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product in this line.
    pub pastel_id: PastelId,
    /// Units requested (always `1..=stock`).
    pub cantidad: u32,
}

/// A shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from stored lines.
    ///
    /// Duplicate product ids are folded together and zero-quantity lines are
    /// dropped.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.cantidad == 0 {
                continue;
            }
            match cart.line_mut(line.pastel_id) {
                Some(existing) => existing.cantidad = existing.cantidad.saturating_add(line.cantidad),
                None => cart.lines.push(line),
            }
        }
        cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Quantity of a product in the cart (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, pastel_id: PastelId) -> u32 {
        self.lines
            .iter()
            .find(|l| l.pastel_id == pastel_id)
            .map_or(0, |l| l.cantidad)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, l| acc.saturating_add(l.cantidad))
    }

    /// Add `cantidad` units of a product, clamped to `stock`.
    ///
    /// Returns the resulting quantity of the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `cantidad` is zero, or
    /// `CartError::OutOfStock` if `stock` is zero.
    pub fn add(&mut self, pastel_id: PastelId, cantidad: u32, stock: u32) -> Result<u32, CartError> {
        if cantidad == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if stock == 0 {
            return Err(CartError::OutOfStock(pastel_id));
        }

        if let Some(line) = self.line_mut(pastel_id) {
            line.cantidad = line.cantidad.saturating_add(cantidad).min(stock);
            return Ok(line.cantidad);
        }

        let cantidad = cantidad.min(stock);
        self.lines.push(CartLine {
            pastel_id,
            cantidad,
        });
        Ok(cantidad)
    }

    /// Set a line's quantity, clamped to `stock`.
    ///
    /// A quantity of zero, or a product with no stock, removes the line.
    /// Returns the resulting quantity (0 when removed).
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product is not in the cart.
    pub fn set_quantity(
        &mut self,
        pastel_id: PastelId,
        cantidad: u32,
        stock: u32,
    ) -> Result<u32, CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.pastel_id == pastel_id)
            .ok_or(CartError::LineNotFound(pastel_id))?;

        let clamped = cantidad.min(stock);
        if clamped == 0 {
            self.lines.remove(index);
            return Ok(0);
        }

        if let Some(line) = self.lines.get_mut(index) {
            line.cantidad = clamped;
        }
        Ok(clamped)
    }

    /// Remove a product from the cart. Returns whether it was present.
    pub fn remove(&mut self, pastel_id: PastelId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.pastel_id != pastel_id);
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Re-clamp every line to current stock.
    ///
    /// `stock_of` returns `None` for products that no longer exist; those lines
    /// are dropped along with lines whose stock is now zero. Returns whether
    /// the cart changed.
    pub fn clamp_to_stock(&mut self, stock_of: impl Fn(PastelId) -> Option<u32>) -> bool {
        let before = self.lines.clone();
        self.lines.retain_mut(|line| match stock_of(line.pastel_id) {
            Some(stock) if stock > 0 => {
                line.cantidad = line.cantidad.min(stock);
                true
            }
            _ => false,
        });
        self.lines != before
    }

    /// Merge another cart (typically a guest cart) into this one.
    ///
    /// Quantities of shared products are summed; everything is clamped to
    /// stock afterwards.
    pub fn merge(&mut self, other: &Self, stock_of: impl Fn(PastelId) -> Option<u32>) {
        for line in &other.lines {
            match self.line_mut(line.pastel_id) {
                Some(existing) => {
                    existing.cantidad = existing.cantidad.saturating_add(line.cantidad);
                }
                None => self.lines.push(*line),
            }
        }
        self.clamp_to_stock(stock_of);
    }

    fn line_mut(&mut self, pastel_id: PastelId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.pastel_id == pastel_id)
    }
}
