use crate::{
    gym::state::{MarketState, Period, StateLog},
    market::MarketSample,
    portfolio::{Portfolio, Weights},
};

/// Read-only view of a session handed to agents and renderers.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'s> {
    pub period: Period,
    pub max_periods: u32,
    /// Latest market sample; the prices every trade of this period executes at.
    pub market: MarketSample,
    pub portfolio: &'s Portfolio,
    pub states: &'s StateLog,
}

impl<'s> Observation<'s> {
    pub fn portfolio_value(&self) -> f64 {
        self.portfolio.value(&self.market)
    }

    pub fn weights(&self) -> Weights {
        self.portfolio.weights(&self.market)
    }

    pub fn last_state(&self) -> Option<&'s MarketState> {
        self.states.last()
    }

    pub fn window(&self, w: usize) -> Vec<MarketState> {
        self.states.window(w)
    }

    pub fn remaining_periods(&self) -> u32 {
        (i64::from(self.max_periods) - i64::from(self.period.0)).max(0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_periods_spans_the_whole_u32_range() {
        // Arrange
        let portfolio = Portfolio::new(1.0, 0.0, 0.0).unwrap();
        let states = StateLog::default();
        let observe = |period: i32, max_periods: u32| Observation {
            period: Period(period),
            max_periods,
            market: MarketSample::default(),
            portfolio: &portfolio,
            states: &states,
        };

        // Act / Assert
        assert_eq!(observe(0, u32::MAX).remaining_periods(), u32::MAX);
        assert_eq!(observe(5, 18).remaining_periods(), 13);
        assert_eq!(observe(18, 18).remaining_periods(), 0);
        assert_eq!(observe(-3, 2).remaining_periods(), 5);
    }
}
