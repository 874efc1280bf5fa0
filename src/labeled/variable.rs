//! Named-dimension storage shared by data arrays, coordinates and datasets
//!
//! A [`Variable`] is an `ArrayD<f64>` whose axes carry names. All broadcasting
//! is done by name: operands are permuted into a common dimension order and
//! missing dimensions are inserted as length-one axes before ndarray
//! broadcasting takes over.

use super::attrs::{AttrValue, Attributes};
use crate::errors::{OceanPostError, Result};
use crate::statistics::{StatOperation, StatisticalReduction};
use ndarray::{concatenate, Array1, ArrayD, ArrayViewD, Axis, IxDyn, Slice, Zip};
use std::collections::BTreeMap;
use std::ops::Range;

const UNNAMED: &str = "<unnamed>";

/// Dimension names, values and attributes without any coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Vec<String>,
    data: ArrayD<f64>,
    attrs: Attributes,
}

impl Variable {
    /// Create a variable, checking that every axis has exactly one unique name
    pub fn new<I, S>(dims: I, data: ArrayD<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(OceanPostError::mismatch(format!(
                "{} dimension names given for an array with {} axes",
                dims.len(),
                data.ndim()
            )));
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(OceanPostError::mismatch(format!(
                    "dimension '{dim}' appears more than once"
                )));
            }
        }
        Ok(Self {
            dims,
            data,
            attrs: Attributes::new(),
        })
    }

    /// A one-dimensional coordinate variable
    pub fn coordinate(dim: &str, values: Vec<f64>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            data: Array1::from(values).into_dyn(),
            attrs: Attributes::new(),
        }
    }

    /// A zero-dimensional variable
    pub fn scalar(value: f64) -> Self {
        Self {
            dims: Vec::new(),
            data: ArrayD::from_elem(IxDyn(&[]), value),
            attrs: Attributes::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ArrayD<f64> {
        &mut self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// Axis index of a named dimension
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Length of a named dimension
    pub fn len_of(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|ax| self.data.len_of(Axis(ax)))
    }

    pub(crate) fn require_axis(&self, dim: &str) -> Result<usize> {
        self.axis_of(dim)
            .ok_or_else(|| OceanPostError::DimensionNotFound {
                var: UNNAMED.to_string(),
                dim: dim.to_string(),
            })
    }

    /// Values of a one-dimensional variable
    pub fn values_1d(&self) -> Option<Vec<f64>> {
        (self.ndim() == 1).then(|| self.data.iter().copied().collect())
    }

    /// Value of a zero-dimensional variable
    pub fn scalar_value(&self) -> Option<f64> {
        (self.ndim() == 0).then(|| self.data.iter().copied().next()).flatten()
    }

    pub fn mapv(&self, f: impl Fn(f64) -> f64) -> Variable {
        Variable {
            dims: self.dims.clone(),
            data: self.data.mapv(f),
            attrs: self.attrs.clone(),
        }
    }

    /// Union of dimensions in left-operand order, with matching lengths
    pub(crate) fn broadcast_dims(&self, other: &Variable) -> Result<(Vec<String>, Vec<usize>)> {
        let mut dims = self.dims.clone();
        let mut shape = self.shape().to_vec();
        for (dim, &len) in other.dims.iter().zip(other.shape()) {
            match dims.iter().position(|d| d == dim) {
                Some(i) if shape[i] != len => {
                    return Err(OceanPostError::mismatch(format!(
                        "dimension '{dim}' has length {} and {len}",
                        shape[i]
                    )))
                }
                Some(_) => {}
                None => {
                    dims.push(dim.clone());
                    shape.push(len);
                }
            }
        }
        Ok((dims, shape))
    }

    /// View of the data permuted into `dims` order with unit axes for absent dims
    fn aligned_view(&self, dims: &[String]) -> Result<ArrayViewD<'_, f64>> {
        let order: Vec<usize> = dims.iter().filter_map(|d| self.axis_of(d)).collect();
        if order.len() != self.ndim() {
            return Err(OceanPostError::mismatch(format!(
                "cannot align dimensions {:?} to {:?}",
                self.dims, dims
            )));
        }
        let mut view = self.data.view().permuted_axes(IxDyn(&order));
        for (i, dim) in dims.iter().enumerate() {
            if !self.has_dim(dim) {
                view = view.insert_axis(Axis(i));
            }
        }
        Ok(view)
    }

    /// Materialise the data broadcast against `dims`/`shape`
    pub(crate) fn broadcast_owned(&self, dims: &[String], shape: &[usize]) -> Result<ArrayD<f64>> {
        let view = self.aligned_view(dims)?;
        let view = view.broadcast(IxDyn(shape)).ok_or_else(|| {
            OceanPostError::mismatch(format!(
                "cannot broadcast {:?} {:?} to {:?} {:?}",
                self.dims,
                self.shape(),
                dims,
                shape
            ))
        })?;
        Ok(view.to_owned())
    }

    /// Elementwise combination with name-based broadcasting
    pub fn zip_with(
        &self,
        other: &Variable,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Variable> {
        let (dims, shape) = self.broadcast_dims(other)?;
        let left = self.aligned_view(&dims)?;
        let right = other.aligned_view(&dims)?;
        let broadcast_err = || OceanPostError::mismatch(format!("cannot broadcast to {dims:?}"));
        let left = left.broadcast(IxDyn(&shape)).ok_or_else(broadcast_err)?;
        let right = right.broadcast(IxDyn(&shape)).ok_or_else(broadcast_err)?;
        let data = Zip::from(&left).and(&right).map_collect(|&a, &b| f(a, b));
        Ok(Variable {
            dims,
            data,
            attrs: Attributes::new(),
        })
    }

    /// Reorder axes to `order`, which must name every dimension exactly once
    pub fn transpose(&self, order: &[String]) -> Result<Variable> {
        if order.len() != self.ndim() || order.iter().any(|d| !self.has_dim(d)) {
            return Err(OceanPostError::mismatch(format!(
                "cannot transpose {:?} to {:?}",
                self.dims, order
            )));
        }
        let axes: Vec<usize> = order.iter().filter_map(|d| self.axis_of(d)).collect();
        let data = self
            .data
            .view()
            .permuted_axes(IxDyn(&axes))
            .as_standard_layout()
            .into_owned();
        Ok(Variable {
            dims: order.to_vec(),
            data,
            attrs: self.attrs.clone(),
        })
    }

    /// Insert a new leading dimension of length one
    pub fn expand_dims(&self, dim: &str) -> Result<Variable> {
        if self.has_dim(dim) {
            return Err(OceanPostError::mismatch(format!(
                "dimension '{dim}' already exists"
            )));
        }
        let mut dims = vec![dim.to_string()];
        dims.extend(self.dims.iter().cloned());
        Ok(Variable {
            dims,
            data: self.data.clone().insert_axis(Axis(0)),
            attrs: self.attrs.clone(),
        })
    }

    /// Select one position along `dim`, dropping the dimension
    pub fn isel(&self, dim: &str, index: usize) -> Result<Variable> {
        let axis = self.require_axis(dim)?;
        let len = self.data.len_of(Axis(axis));
        if index >= len {
            return Err(OceanPostError::InvalidArgument(format!(
                "index {index} out of bounds for dimension '{dim}' of length {len}"
            )));
        }
        let mut dims = self.dims.clone();
        dims.remove(axis);
        Ok(Variable {
            dims,
            data: self.data.index_axis(Axis(axis), index).to_owned(),
            attrs: self.attrs.clone(),
        })
    }

    /// Select a contiguous range along `dim`
    pub fn isel_range(&self, dim: &str, range: Range<usize>) -> Result<Variable> {
        let axis = self.require_axis(dim)?;
        let len = self.data.len_of(Axis(axis));
        if range.start > range.end || range.end > len {
            return Err(OceanPostError::InvalidArgument(format!(
                "range {}..{} out of bounds for dimension '{dim}' of length {len}",
                range.start, range.end
            )));
        }
        Ok(Variable {
            dims: self.dims.clone(),
            data: self
                .data
                .slice_axis(Axis(axis), Slice::from(range))
                .to_owned(),
            attrs: self.attrs.clone(),
        })
    }

    /// Select arbitrary positions along `dim`, in the given order
    pub fn isel_indices(&self, dim: &str, indices: &[usize]) -> Result<Variable> {
        let axis = self.require_axis(dim)?;
        let len = self.data.len_of(Axis(axis));
        if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
            return Err(OceanPostError::InvalidArgument(format!(
                "index {bad} out of bounds for dimension '{dim}' of length {len}"
            )));
        }
        Ok(Variable {
            dims: self.dims.clone(),
            data: self.data.select(Axis(axis), indices),
            attrs: self.attrs.clone(),
        })
    }

    /// NaN-skipping reduction over the named dimensions; attributes are dropped
    pub fn reduce(&self, dims: &[&str], operation: StatOperation) -> Result<Variable> {
        let axes = dims
            .iter()
            .map(|d| self.require_axis(d))
            .collect::<Result<Vec<_>>>()?;
        let data = self.data.reduce_axes(&axes, operation)?;
        let kept = self
            .dims
            .iter()
            .enumerate()
            .filter(|(i, _)| !axes.contains(i))
            .map(|(_, d)| d.clone())
            .collect();
        Ok(Variable {
            dims: kept,
            data,
            attrs: Attributes::new(),
        })
    }

    /// Rename dimensions through `mapping`; unknown names are left alone
    pub fn rename_dims(&mut self, mapping: &BTreeMap<String, String>) {
        for dim in &mut self.dims {
            if let Some(new) = mapping.get(dim) {
                *dim = new.clone();
            }
        }
    }

    /// Concatenate along `dim`; pieces lacking `dim` gain it with length one
    pub fn concat(pieces: &[Variable], dim: &str) -> Result<Variable> {
        let first = pieces
            .first()
            .ok_or_else(|| OceanPostError::InvalidArgument("nothing to concatenate".into()))?;

        let template: Vec<String> = match pieces.iter().find(|p| p.has_dim(dim)) {
            Some(p) => p.dims.clone(),
            None => {
                let mut dims = vec![dim.to_string()];
                dims.extend(first.dims.iter().cloned());
                dims
            }
        };

        let aligned = pieces
            .iter()
            .map(|p| {
                let expanded = if p.has_dim(dim) {
                    p.clone()
                } else {
                    p.expand_dims(dim)?
                };
                expanded.transpose(&template)
            })
            .collect::<Result<Vec<_>>>()?;

        let axis = template.iter().position(|d| d == dim).unwrap_or(0);
        let views: Vec<_> = aligned.iter().map(|v| v.data.view()).collect();
        let data = concatenate(Axis(axis), &views).map_err(|e| {
            OceanPostError::mismatch(format!("cannot concatenate along '{dim}': {e}"))
        })?;

        Ok(Variable {
            dims: template,
            data,
            attrs: first.attrs.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn zip_with_broadcasts_by_name() -> Result<()> {
        let a = Variable::new(["y", "x"], array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn())?;
        let b = Variable::new(["x"], array![10.0, 20.0, 30.0].into_dyn())?;
        let c = Variable::new(["t"], array![1.0, 2.0].into_dyn())?;

        let ab = a.zip_with(&b, |p, q| p + q)?;
        assert_eq!(ab.dims(), ["y", "x"]);
        assert_eq!(ab.data()[[1, 2]], 36.0);

        let ba = b.zip_with(&a, |p, q| p * q)?;
        assert_eq!(ba.dims(), ["x", "y"]);
        assert_eq!(ba.shape(), &[3, 2]);
        assert_eq!(ba.data()[[2, 1]], 180.0);

        let ac = a.zip_with(&c, |p, q| p * q)?;
        assert_eq!(ac.dims(), ["y", "x", "t"]);
        assert_eq!(ac.data()[[1, 0, 1]], 8.0);
        Ok(())
    }

    #[test]
    fn mismatched_lengths_are_rejected() -> Result<()> {
        let a = Variable::new(["x"], array![1.0, 2.0].into_dyn())?;
        let b = Variable::new(["x"], array![1.0, 2.0, 3.0].into_dyn())?;
        assert!(matches!(
            a.zip_with(&b, |p, q| p + q),
            Err(OceanPostError::DimensionMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn concat_expands_missing_dimension() -> Result<()> {
        let top = Variable::new(["x"], array![1.0, 2.0].into_dyn())?;
        let rest = Variable::new(["x", "z"], array![[0.0, 0.0], [0.0, 0.0]].into_dyn())?;
        let out = Variable::concat(&[top, rest], "z")?;
        assert_eq!(out.dims(), ["x", "z"]);
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.data()[[1, 0]], 2.0);
        Ok(())
    }
}
