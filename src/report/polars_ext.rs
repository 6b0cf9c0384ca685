use polars::prelude::{DataFrame, JsonFormat, JsonWriter, SerWriter};
use serde_json::Value;

use crate::error::{DataError, GymError, GymResult, IoError};

pub(super) fn polars_to_gym_error(report: &str, e: polars::error::PolarsError) -> GymError {
    GymError::Data(DataError::DataFrame(format!(
        "Error while building {report}: {e}"
    )))
}

pub trait DataFrameExt {
    fn to_json_rows(&self) -> GymResult<Vec<serde_json::Map<String, Value>>>;
}

impl DataFrameExt for DataFrame {
    fn to_json_rows(&self) -> GymResult<Vec<serde_json::Map<String, Value>>> {
        let height = self.height();
        if height == 0 {
            return Ok(Vec::new());
        }

        // Heuristic: approx 2^6 bytes per cell
        let estimated_row_size = self.width() * (1 << 6);
        let mut buf = Vec::with_capacity(height * estimated_row_size);

        JsonWriter::new(&mut buf)
            .with_json_format(JsonFormat::Json)
            .finish(&mut self.clone())
            .map_err(|e| DataError::DataFrame(e.to_string()))?;

        let json_val: Value = serde_json::from_slice(&buf).map_err(IoError::Json)?;

        match json_val {
            Value::Array(rows) => Ok(rows
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            _ => {
                Err(DataError::DataFrame("Polars JSON output was not an array".to_string()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    #[test]
    fn rows_become_json_objects() {
        let df = df![
            "period" => &[0, 1],
            "portfolio_value" => &[500_000.0, 501_000.0]
        ]
        .expect("Failed to create DF");

        let rows = df.to_json_rows().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["period"].as_i64(), Some(1));
        assert_eq!(rows[1]["portfolio_value"].as_f64(), Some(501_000.0));
    }

    #[test]
    fn empty_frame_has_no_rows() {
        assert!(DataFrame::empty().to_json_rows().unwrap().is_empty());
    }
}
