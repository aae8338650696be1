//! Single-counter stock ledger.
//!
//! `available_quantity` is the only shared mutable resource in the system.
//! Both operations here are compare-and-swap loops over the stored listing,
//! so check-and-decrement happens against the value actually in the tree and
//! the counter can never go negative. No caller may cache a previously read
//! quantity and write it back.

use crate::error::{InsufficientStock, NotFound};
use crate::listing::Listing;
use sled::Tree;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOp {
    Add,
    Subtract,
    Set,
}

impl StockOp {
    /// Subtract and set clamp at 0; add has no upper bound.
    pub fn apply(self, current: u64, amount: u64) -> u64 {
        match self {
            StockOp::Add => current.saturating_add(amount),
            StockOp::Subtract => current.saturating_sub(amount),
            StockOp::Set => amount,
        }
    }
}

impl FromStr for StockOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(StockOp::Add),
            "subtract" => Ok(StockOp::Subtract),
            "set" => Ok(StockOp::Set),
            _ => Err(()),
        }
    }
}

pub struct InventoryLedger {
    listings: Tree,
}

impl InventoryLedger {
    pub fn new(listings: Tree) -> Self {
        Self { listings }
    }

    /// Unconditional administrative override. Subtract and set clamp at 0;
    /// add has no upper bound. Does not check consistency against open
    /// requests. Returns the new quantity.
    pub fn adjust(&self, listing_id: &str, op: StockOp, amount: u64) -> anyhow::Result<u64> {
        loop {
            let current = self
                .listings
                .get(listing_id.as_bytes())?
                .ok_or_else(|| NotFound::Listing(listing_id.to_string()))?;
            let mut listing: Listing = minicbor::decode(current.as_ref())?;

            listing.available_quantity = op.apply(listing.available_quantity, amount);
            listing.touch();

            let new_quantity = listing.available_quantity;
            let swap = self.listings.compare_and_swap(
                listing_id.as_bytes(),
                Some(current),
                Some(minicbor::to_vec(&listing)?),
            )?;
            if swap.is_ok() {
                tracing::info!(
                    "stock adjusted: listing={listing_id} op={op:?} amount={amount} now={new_quantity}"
                );
                return Ok(new_quantity);
            }
            // lost the race against a concurrent write, re-read and retry
        }
    }

    /// Conditional decrement used only by the Confirm transition. Fails with
    /// InsufficientStock when the stored quantity is below the amount; the
    /// failure surfaces immediately and the caller keeps the request in its
    /// prior state. Returns the new quantity.
    pub fn deduct(&self, listing_id: &str, amount: u64) -> anyhow::Result<u64> {
        loop {
            let current = self
                .listings
                .get(listing_id.as_bytes())?
                .ok_or_else(|| NotFound::Listing(listing_id.to_string()))?;
            let mut listing: Listing = minicbor::decode(current.as_ref())?;

            if listing.available_quantity < amount {
                return Err(InsufficientStock {
                    available: listing.available_quantity,
                    requested: amount,
                }
                .into());
            }

            listing.available_quantity -= amount;
            listing.touch();

            let new_quantity = listing.available_quantity;
            let swap = self.listings.compare_and_swap(
                listing_id.as_bytes(),
                Some(current),
                Some(minicbor::to_vec(&listing)?),
            )?;
            if swap.is_ok() {
                tracing::info!("stock deducted: listing={listing_id} amount={amount} now={new_quantity}");
                return Ok(new_quantity);
            }
        }
    }
}
