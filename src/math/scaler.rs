use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
};

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, GymResult, IoError};

/// Per-column min-max scaler mapping the fitted range onto `[0, 1]`.
///
/// Columns that were constant during fitting keep a unit scale, so their fitted value maps
/// to 0. The scaler operates on flattened windows: a `(W, 4)` window is one row of `W * 4`
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    data_min: Array1<f64>,
    data_max: Array1<f64>,
    scale: Array1<f64>,
}

impl FeatureScaler {
    /// Learns column minima and maxima from `x` (rows are samples).
    pub fn fit(x: ArrayView2<'_, f64>) -> GymResult<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(DataError::EmptyDataset(format!(
                "cannot fit a scaler on a {}x{} matrix",
                x.nrows(),
                x.ncols()
            ))
            .into());
        }

        let data_min = x.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let data_max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
        let scale = Zip::from(&data_min)
            .and(&data_max)
            .map_collect(|&lo, &hi| {
                let range = hi - lo;
                if range > 0.0 { 1.0 / range } else { 1.0 }
            });

        Ok(Self {
            data_min,
            data_max,
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    pub fn data_min(&self) -> &Array1<f64> {
        &self.data_min
    }

    pub fn data_max(&self) -> &Array1<f64> {
        &self.data_max
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> GymResult<Array2<f64>> {
        self.check_width(x.ncols())?;
        Ok((&x - &self.data_min) * &self.scale)
    }

    pub fn inverse_transform(&self, x: ArrayView2<'_, f64>) -> GymResult<Array2<f64>> {
        self.check_width(x.ncols())?;
        Ok(&x / &self.scale + &self.data_min)
    }

    /// Writes the fitted scaler as JSON, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> GymResult<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir).map_err(|e| {
                IoError::FileSystem(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let file = File::create(path).map_err(IoError::Io)?;
        serde_json::to_writer(BufWriter::new(file), self).map_err(IoError::Json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> GymResult<Self> {
        let file = File::open(path.as_ref()).map_err(IoError::Io)?;
        let scaler = serde_json::from_reader(BufReader::new(file)).map_err(IoError::Json)?;
        Ok(scaler)
    }

    fn check_width(&self, ncols: usize) -> GymResult<()> {
        if ncols != self.n_features() {
            return Err(DataError::ShapeMismatch {
                expected: format!("{} columns", self.n_features()),
                actual: format!("{ncols} columns"),
            }
            .into());
        }
        Ok(())
    }
}
