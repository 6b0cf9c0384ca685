//! Turn-based stock/bond/cash allocation game.
//!
//! A [`market::process::MarketProcess`] generates coupled inflation, fed rate, stock and
//! bond series; a [`gym::session::GameSession`] lets an [`agent::Agent`] rebalance a
//! [`portfolio::Portfolio`] once per period and records a [`gym::state::MarketState`]
//! snapshot after every turn. Batches of games run in parallel and feed the dataset
//! builder and the polars reports.
//!
//! Most users only need the [`prelude`].

pub mod agent;
pub mod data;
pub mod error;
pub mod gym;
mod macros;
pub mod market;
pub mod math;
pub mod portfolio;
pub mod prelude;
pub mod report;
