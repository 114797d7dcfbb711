//! Row-major feature matrix

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::StorageError;

/// `rows x cols` matrix of per-frame features, rows in frame order.
///
/// Frames without a face are stored as zero rows and flagged in `present`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub rows: usize,
    pub cols: usize,
    /// Row-major values, `rows * cols` long
    pub data: Vec<f32>,
    /// `false` for zero-filled rows of absent frames
    pub present: Vec<bool>,
}

impl FeatureMatrix {
    /// Build from per-frame rows; `None` rows are zero-filled
    pub fn from_rows<'a, I>(rows: I, cols: usize) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = Option<&'a [f32]>>,
    {
        let mut data = Vec::new();
        let mut present = Vec::new();

        for (index, row) in rows.into_iter().enumerate() {
            match row {
                Some(values) => {
                    if values.len() != cols {
                        return Err(StorageError::ShapeMismatch(format!(
                            "row {} has {} values, expected {}",
                            index,
                            values.len(),
                            cols
                        )));
                    }
                    data.extend_from_slice(values);
                    present.push(true);
                }
                None => {
                    data.extend(std::iter::repeat(0.0).take(cols));
                    present.push(false);
                }
            }
        }

        Ok(Self {
            rows: present.len(),
            cols,
            data,
            present,
        })
    }

    /// Check that the dimensions agree with the buffers
    pub fn validate(&self) -> Result<(), StorageError> {
        let len = self.rows.checked_mul(self.cols).ok_or_else(|| {
            StorageError::ShapeMismatch(format!("{}x{} matrix overflows", self.rows, self.cols))
        })?;
        if len != self.data.len() {
            return Err(StorageError::ShapeMismatch(format!(
                "{}x{} matrix holds {} values",
                self.rows,
                self.cols,
                self.data.len()
            )));
        }
        if self.present.len() != self.rows {
            return Err(StorageError::ShapeMismatch(format!(
                "{} rows but {} presence flags",
                self.rows,
                self.present.len()
            )));
        }
        Ok(())
    }

    /// One frame's features
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let start = index.checked_mul(self.cols)?;
        self.data.get(start..start.checked_add(self.cols)?)
    }

    /// Number of rows backed by a real observation
    pub fn observed_rows(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    /// Copy into an `ndarray` matrix
    pub fn to_array(&self) -> Result<Array2<f32>, StorageError> {
        Array2::from_shape_vec((self.rows, self.cols), self.data.clone())
            .map_err(|e| StorageError::ShapeMismatch(e.to_string()))
    }
}
