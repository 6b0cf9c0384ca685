use serde::{Deserialize, Serialize};

use crate::error::{GymResult, PortfolioError};

pub mod params;
pub mod process;

/// One joint draw of the market process.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketSample {
    pub inflation: f64,
    pub fed_rate: f64,
    pub stock_price: f64,
    pub bond_price: f64,
}

/// Anything that can quote the *current* stock and bond price.
///
/// Portfolios borrow a price source for every valuation and trade instead of caching
/// prices, so they always see the latest generated period.
pub trait PriceSource {
    fn stock_price(&self) -> f64;
    fn bond_price(&self) -> f64;
}

/// Standalone stock/bond price histories, for valuing a portfolio outside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    stock: Vec<f64>,
    bond: Vec<f64>,
}

impl PriceHistory {
    /// Fails with [`PortfolioError::EmptyPriceHistory`] if either history is empty.
    pub fn new(stock: Vec<f64>, bond: Vec<f64>) -> GymResult<Self> {
        if stock.is_empty() || bond.is_empty() {
            return Err(PortfolioError::EmptyPriceHistory.into());
        }
        Ok(Self { stock, bond })
    }

    pub fn push(&mut self, stock_price: f64, bond_price: f64) {
        self.stock.push(stock_price);
        self.bond.push(bond_price);
    }

    pub fn stock(&self) -> &[f64] {
        &self.stock
    }

    pub fn bond(&self) -> &[f64] {
        &self.bond
    }
}

impl PriceSource for PriceHistory {
    // Both histories are non-empty by construction and only ever grow.
    fn stock_price(&self) -> f64 {
        self.stock[self.stock.len() - 1]
    }

    fn bond_price(&self) -> f64 {
        self.bond[self.bond.len() - 1]
    }
}

impl PriceSource for MarketSample {
    fn stock_price(&self) -> f64 {
        self.stock_price
    }

    fn bond_price(&self) -> f64 {
        self.bond_price
    }
}
