//! Parallel computation implementations for statistical operations
//!
//! Reduced axes are moved to the end and flattened so that every output
//! element is produced from one contiguous row. Rows are processed in parallel.

use super::operations::StatOperation;
use crate::errors::Result;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayD, ArrayView1, Axis, IxDyn};

/// Reduces `data` over `axes` with NaN-skipping semantics
///
/// Axes must already be validated by the caller.
///
/// # Errors
///
/// Returns an error if array reshaping fails.
pub fn parallel_reduce_axes(
    data: &ArrayD<f64>,
    axes: &[usize],
    operation: StatOperation,
) -> Result<ArrayD<f64>> {
    if axes.is_empty() {
        return Ok(data.clone());
    }

    let kept: Vec<usize> = (0..data.ndim()).filter(|a| !axes.contains(a)).collect();
    let kept_shape: Vec<usize> = kept.iter().map(|&a| data.shape()[a]).collect();
    let rows: usize = kept_shape.iter().product();
    let row_len: usize = axes.iter().map(|&a| data.shape()[a]).product();

    let mut order = kept;
    order.extend_from_slice(axes);
    let flat: Vec<f64> = data.view().permuted_axes(IxDyn(&order)).iter().copied().collect();
    let matrix = Array2::from_shape_vec((rows, row_len), flat)?;

    log::debug!(
        "⚡ Reducing {rows} rows of {row_len} values ({}) across {} threads",
        operation.as_str(),
        rayon::current_num_threads()
    );

    let result: Vec<f64> = matrix
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| reduce_lane(row, operation))
        .collect();

    Ok(ArrayD::from_shape_vec(IxDyn(&kept_shape), result)?)
}

/// Reduces a single lane, skipping NaN values
pub fn reduce_lane(lane: ArrayView1<f64>, operation: StatOperation) -> f64 {
    let valid = lane.iter().copied().filter(|x| !x.is_nan());
    match operation {
        StatOperation::Sum => valid.sum(),
        StatOperation::Mean => {
            let (sum, count) = valid.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
            if count > 0 {
                sum / count as f64
            } else {
                f64::NAN
            }
        }
        StatOperation::Std => {
            let values: Vec<f64> = valid.collect();
            if values.is_empty() {
                return f64::NAN;
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            (values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
        }
        StatOperation::Min => valid.fold(f64::NAN, f64::min),
        StatOperation::Max => valid.fold(f64::NAN, f64::max),
        StatOperation::Quantile(q) => {
            let mut values: Vec<f64> = valid.collect();
            values.sort_by(f64::total_cmp);
            nan_quantile_sorted(&values, q)
        }
    }
}

/// Linear-interpolation quantile of already sorted values
fn nan_quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn quantile_interpolates_between_neighbours() {
        let lane = array![4.0, 1.0, f64::NAN, 3.0, 2.0];
        assert_eq!(reduce_lane(lane.view(), StatOperation::Quantile(0.5)), 2.5);
        assert_eq!(reduce_lane(lane.view(), StatOperation::Quantile(0.0)), 1.0);
        assert_eq!(reduce_lane(lane.view(), StatOperation::Quantile(1.0)), 4.0);
    }

    #[test]
    fn all_nan_lane() {
        let lane = array![f64::NAN, f64::NAN];
        assert_eq!(reduce_lane(lane.view(), StatOperation::Sum), 0.0);
        assert!(reduce_lane(lane.view(), StatOperation::Mean).is_nan());
        assert!(reduce_lane(lane.view(), StatOperation::Max).is_nan());
    }
}
