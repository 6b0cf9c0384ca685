use std::sync::Arc;

use polars::{
    df,
    frame::DataFrame,
    prelude::{DataType, Field, PlSmallStr, Schema, SchemaRef},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::GymResult,
    gym::state::MarketState,
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::polars_to_gym_error,
    },
};

/// Columns of the [`Journal`], one row per period snapshot.
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
    Display,
    PartialOrd,
    Ord,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum JournalCol {
    // === Identifiers ===
    /// Game the snapshot belongs to.
    GameId,
    /// Period of the snapshot; warm-up rows are negative.
    Period,

    // === Market ===
    StockPrice,
    BondPrice,
    FedRate,
    Inflation,

    // === Portfolio ===
    Cash,
    StockValue,
    BondValue,
    PortfolioValue,
    StockWeight,
    BondWeight,
    CashWeight,
}

impl From<JournalCol> for PlSmallStr {
    fn from(value: JournalCol) -> Self {
        value.as_str().into()
    }
}

impl JournalCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Tabular log of market and portfolio snapshots across one or more games.
#[derive(Debug, Clone)]
pub struct Journal {
    df: DataFrame,
    /// Appended to the file base name, e.g. the config hash of the batch.
    tag: Option<String>,
}

impl ReportName for Journal {
    fn base_name(&self) -> String {
        match &self.tag {
            Some(tag) => format!("journal_{tag}"),
            None => "journal".to_string(),
        }
    }
}

impl Report for Journal {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl Journal {
    /// Builds a journal from `(game_id, trajectory)` pairs, in the given order.
    pub fn from_trajectories<'a, I>(trajectories: I) -> GymResult<Self>
    where
        I: IntoIterator<Item = (usize, &'a [MarketState])>,
    {
        let mut soa = JournalSoA::default();
        for (game_id, states) in trajectories {
            for state in states {
                soa.push(game_id as u32, state);
            }
        }
        Ok(Self {
            df: soa.try_into()?,
            tag: None,
        })
    }

    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..self
        }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self {
            df: DataFrame::empty_with_schema(&Self::to_schema()),
            tag: None,
        }
    }
}

impl ToSchema for Journal {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = JournalCol::iter()
            .map(|col| {
                let dtype = match col {
                    JournalCol::GameId => DataType::UInt32,
                    JournalCol::Period => DataType::Int32,

                    JournalCol::StockPrice
                    | JournalCol::BondPrice
                    | JournalCol::FedRate
                    | JournalCol::Inflation
                    | JournalCol::Cash
                    | JournalCol::StockValue
                    | JournalCol::BondValue
                    | JournalCol::PortfolioValue
                    | JournalCol::StockWeight
                    | JournalCol::BondWeight
                    | JournalCol::CashWeight => DataType::Float64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

// ================================================================================================
// Columnar Assembly
// ================================================================================================

#[derive(Default)]
struct JournalSoA {
    game_id: Vec<u32>,
    period: Vec<i32>,
    stock_price: Vec<f64>,
    bond_price: Vec<f64>,
    fed_rate: Vec<f64>,
    inflation: Vec<f64>,
    cash: Vec<f64>,
    stock_value: Vec<f64>,
    bond_value: Vec<f64>,
    portfolio_value: Vec<f64>,
    stock_weight: Vec<f64>,
    bond_weight: Vec<f64>,
    cash_weight: Vec<f64>,
}

impl JournalSoA {
    fn push(&mut self, game_id: u32, s: &MarketState) {
        self.game_id.push(game_id);
        self.period.push(s.period.0);
        self.stock_price.push(s.stock_price);
        self.bond_price.push(s.bond_price);
        self.fed_rate.push(s.fed_rate);
        self.inflation.push(s.inflation);
        self.cash.push(s.cash);
        self.stock_value.push(s.stock_value);
        self.bond_value.push(s.bond_value);
        self.portfolio_value.push(s.portfolio_value);
        self.stock_weight.push(s.stock_weight);
        self.bond_weight.push(s.bond_weight);
        self.cash_weight.push(s.cash_weight);
    }
}

impl TryFrom<JournalSoA> for DataFrame {
    type Error = crate::error::GymError;

    fn try_from(value: JournalSoA) -> Result<Self, Self::Error> {
        if value.game_id.is_empty() {
            return Ok(DataFrame::empty_with_schema(&Journal::to_schema()));
        }
        df!(
            JournalCol::GameId.as_str() => value.game_id,
            JournalCol::Period.as_str() => value.period,
            JournalCol::StockPrice.as_str() => value.stock_price,
            JournalCol::BondPrice.as_str() => value.bond_price,
            JournalCol::FedRate.as_str() => value.fed_rate,
            JournalCol::Inflation.as_str() => value.inflation,
            JournalCol::Cash.as_str() => value.cash,
            JournalCol::StockValue.as_str() => value.stock_value,
            JournalCol::BondValue.as_str() => value.bond_value,
            JournalCol::PortfolioValue.as_str() => value.portfolio_value,
            JournalCol::StockWeight.as_str() => value.stock_weight,
            JournalCol::BondWeight.as_str() => value.bond_weight,
            JournalCol::CashWeight.as_str() => value.cash_weight,
        )
        .map_err(|e| polars_to_gym_error("journal", e))
    }
}
