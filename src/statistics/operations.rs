//! Reduction kinds and the multi-axis reduction trait

use crate::errors::{OceanPostError, Result};
use ndarray::ArrayD;

/// NaN-skipping reduction applied along one or more axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatOperation {
    /// Sum of values, NaN contributes nothing
    Sum,
    /// Arithmetic mean
    Mean,
    /// Population standard deviation (ddof = 0)
    Std,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Linearly interpolated quantile, `q` in `[0, 1]`
    Quantile(f64),
}

impl StatOperation {
    /// Name used in log messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Std => "std",
            Self::Min => "minimum",
            Self::Max => "maximum",
            Self::Quantile(_) => "quantile",
        }
    }
}

/// Trait for types that can perform statistical reductions over several axes
pub trait StatisticalReduction<T> {
    /// Reduce over `axes` at once, returning an array with those axes removed
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An axis is out of bounds or listed twice
    /// - A quantile outside `[0, 1]` is requested
    fn reduce_axes(&self, axes: &[usize], operation: StatOperation) -> Result<ArrayD<T>>;
}

impl StatisticalReduction<f64> for ArrayD<f64> {
    fn reduce_axes(&self, axes: &[usize], operation: StatOperation) -> Result<ArrayD<f64>> {
        for (i, &axis) in axes.iter().enumerate() {
            if axis >= self.ndim() {
                return Err(OceanPostError::Generic(format!(
                    "Axis {axis} is out of bounds for array with {} dimensions",
                    self.ndim()
                )));
            }
            if axes[..i].contains(&axis) {
                return Err(OceanPostError::Generic(format!(
                    "Axis {axis} listed more than once"
                )));
            }
        }
        if let StatOperation::Quantile(q) = operation {
            if !(0.0..=1.0).contains(&q) {
                return Err(OceanPostError::InvalidArgument(format!(
                    "Quantile must be between 0 and 1, got {q}"
                )));
            }
        }

        super::parallel::parallel_reduce_axes(self, axes, operation)
    }
}
