use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{GymResult, PortfolioError},
    market::PriceSource,
};

/// Relative slack accepted when comparing cash or shares against a requirement.
///
/// Selling exactly the shortfall and re-checking affordability must succeed even when
/// `cash + (amount - cash)` rounds a hair below `amount`.
pub const FUNDS_TOLERANCE: f64 = 1e-9;

// ================================================================================================
// Outcomes
// ================================================================================================

/// Why a trade request had no effect.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    /// Not enough cash, even after selling the other asset for the shortfall.
    InsufficientFunds,
    /// Fewer shares held than the requested sale requires.
    InsufficientHoldings,
    /// Negative or non-finite notional.
    InvalidAmount,
    /// Non-positive or non-finite market price.
    InvalidPrice,
}

/// Result of a single portfolio operation. Rejections are values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TradeOutcome {
    /// Executed in full from available cash or holdings.
    Filled,
    /// Executed after selling `sold` worth of the other asset to cover a cash shortfall.
    CrossFunded { sold: f64 },
    /// Best-effort cash raise that fell short of the request.
    Partial { raised: f64 },
    /// No effect on holdings.
    Rejected(Rejection),
}

impl TradeOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(r) => Some(*r),
            _ => None,
        }
    }
}

/// Asset classes that can be bought and sold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum Asset {
    Stock,
    Bond,
}

impl Asset {
    /// The asset sold to cover a shortfall when buying `self`.
    pub fn other(self) -> Self {
        match self {
            Self::Stock => Self::Bond,
            Self::Bond => Self::Stock,
        }
    }

    fn price(self, px: &impl PriceSource) -> f64 {
        match self {
            Self::Stock => px.stock_price(),
            Self::Bond => px.bond_price(),
        }
    }
}

/// Fraction of total value held in each asset class.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Weights {
    pub stock: f64,
    pub bond: f64,
    pub cash: f64,
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.stock + self.bond + self.cash
    }
}

// ================================================================================================
// Portfolio
// ================================================================================================

/// Cash plus stock and bond share counts.
///
/// Prices are never stored: every read or trade takes a [`PriceSource`] quoting the
/// current period, so `value() == cash + stock_shares * stock_price + bond_shares *
/// bond_price` always holds for the prices passed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    stock_shares: f64,
    bond_shares: f64,
}

impl Portfolio {
    pub fn new(cash: f64, stock_shares: f64, bond_shares: f64) -> GymResult<Self> {
        for (name, v) in [
            ("cash", cash),
            ("stock_shares", stock_shares),
            ("bond_shares", bond_shares),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(PortfolioError::InvalidHoldings(format!(
                    "`{name}` must be finite and >= 0, got {v}"
                ))
                .into());
            }
        }
        Ok(Self {
            cash,
            stock_shares,
            bond_shares,
        })
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn stock_shares(&self) -> f64 {
        self.stock_shares
    }

    pub fn bond_shares(&self) -> f64 {
        self.bond_shares
    }

    pub fn stock_value(&self, px: &impl PriceSource) -> f64 {
        self.stock_shares * px.stock_price()
    }

    pub fn bond_value(&self, px: &impl PriceSource) -> f64 {
        self.bond_shares * px.bond_price()
    }

    pub fn value(&self, px: &impl PriceSource) -> f64 {
        self.cash + self.stock_value(px) + self.bond_value(px)
    }

    /// Stock, bond and cash weights; all zero when the portfolio is worth nothing.
    pub fn weights(&self, px: &impl PriceSource) -> Weights {
        let total = self.value(px);
        if total == 0.0 {
            return Weights::default();
        }
        Weights {
            stock: self.stock_value(px) / total,
            bond: self.bond_value(px) / total,
            cash: self.cash / total,
        }
    }

    pub fn buy_stock(&mut self, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        self.buy(Asset::Stock, amount, px)
    }

    pub fn buy_bond(&mut self, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        self.buy(Asset::Bond, amount, px)
    }

    pub fn sell_stock(&mut self, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        self.sell(Asset::Stock, amount, px)
    }

    pub fn sell_bond(&mut self, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        self.sell(Asset::Bond, amount, px)
    }

    /// Spends `amount` of cash on `asset`.
    ///
    /// If cash is short, sells the other asset for exactly the shortfall once and
    /// re-checks. When that sale is impossible the whole request is a no-op.
    pub fn buy(&mut self, asset: Asset, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        let price = asset.price(px);
        if let Some(r) = check_request(amount, price) {
            return TradeOutcome::Rejected(r);
        }

        if covers(self.cash, amount) {
            self.settle_buy(asset, amount, price);
            return TradeOutcome::Filled;
        }

        let shortfall = amount - self.cash;
        let cover = self.sell(asset.other(), shortfall, px);
        if cover.is_rejected() || !covers(self.cash, amount) {
            return TradeOutcome::Rejected(Rejection::InsufficientFunds);
        }

        self.settle_buy(asset, amount, price);
        TradeOutcome::CrossFunded { sold: shortfall }
    }

    /// Sells `amount` worth of `asset` at the current price.
    pub fn sell(&mut self, asset: Asset, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        let price = asset.price(px);
        if let Some(r) = check_request(amount, price) {
            return TradeOutcome::Rejected(r);
        }

        let to_sell = amount / price;
        let shares = self.shares_mut(asset);
        if !covers(*shares, to_sell) {
            return TradeOutcome::Rejected(Rejection::InsufficientHoldings);
        }

        // Within tolerance of the whole position: fill what is held, credit only that
        let sold = to_sell.min(*shares);
        *shares -= sold;
        self.cash += if sold < to_sell { sold * price } else { amount };
        TradeOutcome::Filled
    }

    /// Raises `amount` of cash by selling stock and bond, half from each when possible.
    ///
    /// A side worth less than half is sold out completely and the remainder is taken from
    /// the other side. If both sides together fall short, everything is liquidated and the
    /// outcome is [`TradeOutcome::Partial`].
    pub fn increase_cash(&mut self, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        if let Some(r) = check_request(amount, px.stock_price())
            .or_else(|| check_request(amount, px.bond_price()))
        {
            return TradeOutcome::Rejected(r);
        }

        let half = amount / 2.0;
        let stock_value = self.stock_value(px);
        let bond_value = self.bond_value(px);
        let before = self.cash;

        if stock_value >= half && bond_value >= half {
            self.sell(Asset::Stock, half, px);
            self.sell(Asset::Bond, half, px);
        } else if stock_value < half && half <= bond_value {
            if bond_value >= amount - stock_value {
                self.liquidate(Asset::Stock, px);
                self.sell(Asset::Bond, amount - stock_value, px);
            } else {
                self.liquidate_all(px);
            }
        } else if bond_value < half && half <= stock_value {
            if stock_value >= amount - bond_value {
                self.liquidate(Asset::Bond, px);
                self.sell(Asset::Stock, amount - bond_value, px);
            } else {
                self.liquidate_all(px);
            }
        } else {
            self.liquidate_all(px);
        }

        let raised = self.cash - before;
        if covers(raised, amount) {
            TradeOutcome::Filled
        } else {
            TradeOutcome::Partial { raised }
        }
    }

    /// Invests `amount` of cash, split evenly between stock and bond.
    ///
    /// Cash is the only funding source here, so a shortfall rejects the request.
    pub fn decrease_cash(&mut self, amount: f64, px: &impl PriceSource) -> TradeOutcome {
        if let Some(r) = check_request(amount, px.stock_price())
            .or_else(|| check_request(amount, px.bond_price()))
        {
            return TradeOutcome::Rejected(r);
        }
        if !covers(self.cash, amount) {
            return TradeOutcome::Rejected(Rejection::InsufficientFunds);
        }

        let half = amount / 2.0;
        self.settle_buy(Asset::Stock, half, px.stock_price());
        self.settle_buy(Asset::Bond, half, px.bond_price());
        TradeOutcome::Filled
    }

    fn settle_buy(&mut self, asset: Asset, amount: f64, price: f64) {
        let spent = amount.min(self.cash);
        self.cash -= spent;
        *self.shares_mut(asset) += spent / price;
    }

    /// Sells every share of `asset`; returns the proceeds.
    fn liquidate(&mut self, asset: Asset, px: &impl PriceSource) -> f64 {
        let price = asset.price(px);
        let shares = self.shares_mut(asset);
        let proceeds = *shares * price;
        *shares = 0.0;
        self.cash += proceeds;
        proceeds
    }

    fn liquidate_all(&mut self, px: &impl PriceSource) {
        self.liquidate(Asset::Bond, px);
        self.liquidate(Asset::Stock, px);
    }

    fn shares_mut(&mut self, asset: Asset) -> &mut f64 {
        match asset {
            Asset::Stock => &mut self.stock_shares,
            Asset::Bond => &mut self.bond_shares,
        }
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================

fn check_request(amount: f64, price: f64) -> Option<Rejection> {
    if !amount.is_finite() || amount < 0.0 {
        return Some(Rejection::InvalidAmount);
    }
    if !price.is_finite() || price <= 0.0 {
        return Some(Rejection::InvalidPrice);
    }
    None
}

fn covers(available: f64, required: f64) -> bool {
    available + FUNDS_TOLERANCE * required.abs().max(1.0) >= required
}

#[cfg(test)]
mod tests {
    use crate::market::PriceHistory;

    use super::*;

    const EPS: f64 = 1e-9;

    fn prices() -> PriceHistory {
        PriceHistory::new(vec![10.0, 20.0, 30.0], vec![100.0, 200.0, 300.0]).unwrap()
    }

    fn sample_portfolio() -> Portfolio {
        Portfolio::new(1000.0, 10.0, 5.0).unwrap()
    }

    fn assert_value_identity(p: &Portfolio, px: &PriceHistory) {
        let expected = p.cash() + p.stock_shares() * px.stock_price() + p.bond_shares() * px.bond_price();
        assert!(
            (p.value(px) - expected).abs() < EPS,
            "value identity broken: {} vs {}",
            p.value(px),
            expected
        );
        assert!(p.stock_shares() >= 0.0 && p.bond_shares() >= 0.0 && p.cash() >= 0.0);
    }

    // ============================================================================================
    // 1. Valuation
    // ============================================================================================

    #[test]
    fn values_holdings_at_the_last_price() {
        let px = prices();
        let p = sample_portfolio();

        assert_eq!(p.stock_value(&px), 300.0);
        assert_eq!(p.bond_value(&px), 1500.0);
        assert_eq!(p.value(&px), 1000.0 + 30.0 * 10.0 + 300.0 * 5.0);
    }

    #[test]
    fn weights_are_value_fractions() {
        let px = prices();
        let w = sample_portfolio().weights(&px);

        assert_eq!(w.stock, 300.0 / 2800.0);
        assert_eq!(w.bond, 1500.0 / 2800.0);
        assert_eq!(w.cash, 1000.0 / 2800.0);
        assert!((w.sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn weights_of_an_empty_portfolio_are_zero() {
        let px = prices();
        let p = Portfolio::new(0.0, 0.0, 0.0).unwrap();
        assert_eq!(p.weights(&px), Weights::default());
    }

    #[test]
    fn valuation_follows_newly_appended_prices() {
        let mut px = prices();
        let p = sample_portfolio();

        px.push(40.0, 100.0);

        assert_eq!(p.value(&px), 1000.0 + 400.0 + 500.0);
    }

    #[test]
    fn rejects_negative_starting_holdings() {
        assert!(Portfolio::new(-1.0, 0.0, 0.0).is_err());
        assert!(Portfolio::new(0.0, f64::NAN, 0.0).is_err());
    }

    // ============================================================================================
    // 2. Buy / Sell
    // ============================================================================================

    #[test]
    fn buy_and_sell_move_shares_and_cash() {
        let px = prices();
        let mut p = sample_portfolio();

        assert_eq!(p.buy_stock(300.0, &px), TradeOutcome::Filled);
        assert!((p.stock_shares() - (10.0 + 300.0 / 30.0)).abs() < EPS);

        assert_eq!(p.sell_stock(200.0, &px), TradeOutcome::Filled);
        assert!((p.stock_shares() - (10.0 + 300.0 / 30.0 - 200.0 / 30.0)).abs() < EPS);

        assert_eq!(p.buy_bond(900.0, &px), TradeOutcome::Filled);
        assert!((p.bond_shares() - (5.0 + 900.0 / 300.0)).abs() < EPS);

        assert_eq!(p.sell_bond(600.0, &px), TradeOutcome::Filled);
        assert!((p.bond_shares() - (5.0 + 900.0 / 300.0 - 600.0 / 300.0)).abs() < EPS);

        assert_value_identity(&p, &px);
    }

    #[test]
    fn buy_then_sell_round_trips() {
        let px = prices();
        let mut p = sample_portfolio();
        let before = p;

        p.buy_stock(450.0, &px);
        p.sell_stock(450.0, &px);

        assert!((p.cash() - before.cash()).abs() < EPS);
        assert!((p.stock_shares() - before.stock_shares()).abs() < EPS);
        assert_eq!(p.bond_shares(), before.bond_shares());
    }

    #[test]
    fn oversized_requests_are_no_ops() {
        let px = prices();
        let mut p = sample_portfolio();

        // Shortfall of 9000 cannot be covered by 1500 worth of bonds
        assert_eq!(
            p.buy_stock(10_000.0, &px),
            TradeOutcome::Rejected(Rejection::InsufficientFunds)
        );
        assert_eq!(p, sample_portfolio(), "failed buy must not touch holdings");

        assert_eq!(
            p.sell_stock(10_000.0, &px),
            TradeOutcome::Rejected(Rejection::InsufficientHoldings)
        );
        assert_eq!(p.stock_shares(), 10.0);

        assert!(p.buy_bond(100_000.0, &px).is_rejected());
        assert_eq!(p.bond_shares(), 5.0);

        assert!(p.sell_bond(10_000.0, &px).is_rejected());
        assert_eq!(p, sample_portfolio());
    }

    #[test]
    fn fills_within_tolerance_never_create_value() {
        // Arrange
        let px = PriceHistory::new(vec![10.0], vec![100.0]).unwrap();
        let mut buyer = Portfolio::new(100.0, 0.0, 0.0).unwrap();
        let mut seller = Portfolio::new(0.0, 10.0, 0.0).unwrap();

        // Act: both requests exceed the position by less than the tolerance
        let bought = buyer.buy_stock(100.0 + 1e-8, &px);
        let sold = seller.sell_stock(100.0 + 1e-8, &px);

        // Assert: only what was available changes hands
        assert_eq!(bought, TradeOutcome::Filled);
        assert_eq!(buyer.cash(), 0.0);
        assert_eq!(buyer.stock_shares(), 10.0);
        assert_eq!(buyer.value(&px), 100.0);

        assert_eq!(sold, TradeOutcome::Filled);
        assert_eq!(seller.stock_shares(), 0.0);
        assert_eq!(seller.cash(), 100.0);
        assert_eq!(seller.value(&px), 100.0);
    }

    #[test]
    fn buy_without_cash_or_other_asset_is_a_pure_no_op() {
        let px = prices();
        let mut p = Portfolio::new(100.0, 3.0, 0.0).unwrap();

        let outcome = p.buy_stock(500.0, &px);

        assert_eq!(outcome.rejection(), Some(Rejection::InsufficientFunds));
        assert_eq!(p.stock_shares(), 3.0);
        assert_eq!(p.cash(), 100.0);
    }

    #[test]
    fn buy_stock_cross_funds_from_bonds() {
        let px = prices();
        let mut p = sample_portfolio();

        // 1200 requested, 1000 cash: sells 200 of bonds first
        let outcome = p.buy_stock(1200.0, &px);

        assert_eq!(outcome, TradeOutcome::CrossFunded { sold: 200.0 });
        assert!(p.cash().abs() < EPS);
        assert!((p.stock_shares() - (10.0 + 1200.0 / 30.0)).abs() < EPS);
        assert!((p.bond_shares() - (5.0 - 200.0 / 300.0)).abs() < EPS);
        assert_value_identity(&p, &px);
    }

    #[test]
    fn buy_bond_cross_funds_from_stocks() {
        let px = prices();
        let mut p = sample_portfolio();

        let outcome = p.buy_bond(1250.0, &px);

        assert_eq!(outcome, TradeOutcome::CrossFunded { sold: 250.0 });
        assert!((p.stock_shares() - (10.0 - 250.0 / 30.0)).abs() < EPS);
        assert_value_identity(&p, &px);
    }

    #[test]
    fn invalid_amounts_and_prices_are_rejected() {
        let px = prices();
        let mut p = sample_portfolio();

        assert_eq!(p.buy_stock(-5.0, &px).rejection(), Some(Rejection::InvalidAmount));
        assert_eq!(p.sell_bond(f64::NAN, &px).rejection(), Some(Rejection::InvalidAmount));

        let zero = PriceHistory::new(vec![0.0], vec![100.0]).unwrap();
        assert_eq!(p.buy_stock(10.0, &zero).rejection(), Some(Rejection::InvalidPrice));
        assert_eq!(p, sample_portfolio());
    }

    // ============================================================================================
    // 3. Cash Management
    // ============================================================================================

    #[test]
    fn increase_cash_splits_evenly_when_both_sides_cover_half() {
        let px = prices();
        let mut p = sample_portfolio();
        let invested_before = p.stock_value(&px) + p.bond_value(&px);

        let outcome = p.increase_cash(500.0, &px);

        assert_eq!(outcome, TradeOutcome::Filled);
        assert!((p.cash() - 1500.0).abs() < EPS);
        let invested_after = p.stock_value(&px) + p.bond_value(&px);
        assert!((invested_before - invested_after - 500.0).abs() < EPS);
        assert!((p.stock_value(&px) - 50.0).abs() < EPS);
        assert!((p.bond_value(&px) - 1250.0).abs() < EPS);
    }

    #[test]
    fn increase_cash_shifts_the_deficit_to_the_richer_side() {
        let px = prices();
        let mut p = sample_portfolio();

        // Stock (300) < half (500) <= bond (1500): sell all stock, 700 of bonds
        let outcome = p.increase_cash(1000.0, &px);

        assert_eq!(outcome, TradeOutcome::Filled);
        assert_eq!(p.stock_shares(), 0.0);
        assert!((p.bond_value(&px) - 800.0).abs() < EPS);
        assert!((p.cash() - 2000.0).abs() < EPS);
    }

    #[test]
    fn increase_cash_shifts_the_deficit_to_the_stock_side() {
        // Arrange: stock 1500, bond 300
        let px = prices();
        let mut p = Portfolio::new(0.0, 50.0, 1.0).unwrap();

        // Act: bond (300) < half (500) <= stock (1500): sell all bonds, 700 of stock
        let outcome = p.increase_cash(1000.0, &px);

        // Assert
        assert_eq!(outcome, TradeOutcome::Filled);
        assert_eq!(p.bond_shares(), 0.0);
        assert!((p.stock_value(&px) - 800.0).abs() < EPS);
        assert!((p.cash() - 1000.0).abs() < EPS);
        assert_value_identity(&p, &px);
    }

    #[test]
    fn increase_cash_liquidates_everything_when_short() {
        let px = prices();
        let mut p = sample_portfolio();

        let outcome = p.increase_cash(5000.0, &px);

        assert_eq!(outcome, TradeOutcome::Partial { raised: 1800.0 });
        assert_eq!(p.stock_shares(), 0.0);
        assert_eq!(p.bond_shares(), 0.0);
        assert!((p.cash() - 2800.0).abs() < EPS);
    }

    #[test]
    fn increase_cash_liquidates_both_when_one_side_is_short_and_total_too() {
        let px = prices();
        // stock 300, bond 1500, request 2000: stock < 1000 <= bond, but 1500 < 2000 - 300
        let mut p = sample_portfolio();

        let outcome = p.increase_cash(2000.0, &px);

        assert!(matches!(outcome, TradeOutcome::Partial { .. }));
        assert_eq!(p.stock_shares(), 0.0);
        assert_eq!(p.bond_shares(), 0.0);
    }

    #[test]
    fn decrease_cash_invests_half_in_each_asset() {
        let px = prices();
        let mut p = sample_portfolio();

        let outcome = p.decrease_cash(600.0, &px);

        assert_eq!(outcome, TradeOutcome::Filled);
        assert!((p.cash() - 400.0).abs() < EPS);
        assert!((p.stock_shares() - (10.0 + 300.0 / 30.0)).abs() < EPS);
        assert!((p.bond_shares() - (5.0 + 300.0 / 300.0)).abs() < EPS);
        assert_value_identity(&p, &px);
    }

    #[test]
    fn decrease_cash_beyond_cash_is_rejected() {
        let px = prices();
        let mut p = sample_portfolio();

        assert_eq!(
            p.decrease_cash(1001.0, &px).rejection(),
            Some(Rejection::InsufficientFunds)
        );
        assert_eq!(p, sample_portfolio());
    }

    #[test]
    fn value_identity_holds_across_a_mixed_sequence() {
        let px = prices();
        let mut p = sample_portfolio();

        p.buy_stock(700.0, &px);
        assert_value_identity(&p, &px);
        p.buy_bond(900.0, &px);
        assert_value_identity(&p, &px);
        p.increase_cash(333.3, &px);
        assert_value_identity(&p, &px);
        p.decrease_cash(100.0, &px);
        assert_value_identity(&p, &px);
        p.sell_bond(50.0, &px);
        assert_value_identity(&p, &px);
        assert!((p.weights(&px).sum() - 1.0).abs() < EPS);
    }
}
