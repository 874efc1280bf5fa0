//! Labeled arrays: a variable plus the coordinates that describe it

use super::attrs::{AttrValue, Attributes};
use super::variable::Variable;
use crate::errors::{OceanPostError, Result};
use crate::statistics::StatOperation;
use ndarray::ArrayD;
use std::collections::BTreeMap;
use std::ops::Range;

/// A named n-dimensional array with coordinates
///
/// Every coordinate's dimensions are a subset of the array's dimensions. A
/// coordinate named after one of the dimensions is that dimension's index.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    name: Option<String>,
    variable: Variable,
    coords: BTreeMap<String, Variable>,
}

impl DataArray {
    /// Create an unnamed array without coordinates
    pub fn new<I, S>(dims: I, data: ArrayD<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::from_variable(Variable::new(dims, data)?))
    }

    pub fn from_variable(variable: Variable) -> Self {
        Self {
            name: None,
            variable,
            coords: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        *self.variable.attrs_mut() = attrs;
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.variable
            .attrs_mut()
            .insert(key.to_string(), value.into());
        self
    }

    /// Attach a coordinate, checking its dimensions against the array
    pub fn with_coord(mut self, name: &str, coord: Variable) -> Result<Self> {
        for (dim, &len) in coord.dims().iter().zip(coord.shape()) {
            match self.variable.len_of(dim) {
                Some(own) if own == len => {}
                Some(own) => {
                    return Err(OceanPostError::mismatch(format!(
                        "coordinate '{name}' has length {len} along '{dim}', array has {own}"
                    )))
                }
                None => {
                    return Err(OceanPostError::mismatch(format!(
                        "coordinate '{name}' uses dimension '{dim}' not present on {}",
                        self.label()
                    )))
                }
            }
        }
        self.coords.insert(name.to_string(), coord);
        Ok(self)
    }

    /// Attach index values for one dimension
    pub fn with_index(self, dim: &str, values: Vec<f64>) -> Result<Self> {
        self.with_coord(dim, Variable::coordinate(dim, values))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn dims(&self) -> &[String] {
        self.variable.dims()
    }

    pub fn data(&self) -> &ArrayD<f64> {
        self.variable.data()
    }

    pub fn shape(&self) -> &[usize] {
        self.variable.shape()
    }

    pub fn ndim(&self) -> usize {
        self.variable.ndim()
    }

    pub fn attrs(&self) -> &Attributes {
        self.variable.attrs()
    }

    pub fn attrs_mut(&mut self) -> &mut Attributes {
        self.variable.attrs_mut()
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn into_variable(self) -> Variable {
        self.variable
    }

    pub fn coords(&self) -> &BTreeMap<String, Variable> {
        &self.coords
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.get(name)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.variable.has_dim(dim)
    }

    pub fn len_of(&self, dim: &str) -> Option<usize> {
        self.variable.len_of(dim)
    }

    /// Index values along `dim`, or positions `0..n` when no index is attached
    pub fn index_values(&self, dim: &str) -> Result<Vec<f64>> {
        let len = self
            .len_of(dim)
            .ok_or_else(|| self.dim_not_found(dim))?;
        Ok(self
            .coords
            .get(dim)
            .and_then(Variable::values_1d)
            .unwrap_or_else(|| (0..len).map(|i| i as f64).collect()))
    }

    fn dim_not_found(&self, dim: &str) -> OceanPostError {
        OceanPostError::DimensionNotFound {
            var: self.label().to_string(),
            dim: dim.to_string(),
        }
    }

    fn rebuild(&self, variable: Variable, keep: impl Fn(&str, &Variable) -> bool) -> Self {
        let coords = self
            .coords
            .iter()
            .filter(|(name, c)| {
                keep(name, c)
                    && c.dims()
                        .iter()
                        .zip(c.shape())
                        .all(|(d, &n)| variable.len_of(d) == Some(n))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            name: self.name.clone(),
            variable,
            coords,
        }
    }

    /// Apply `f` to every value, keeping attributes and coordinates
    pub fn mapv(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            name: self.name.clone(),
            variable: self.variable.mapv(f),
            coords: self.coords.clone(),
        }
    }

    pub fn mul_scalar(&self, factor: f64) -> Self {
        self.mapv(|x| x * factor)
    }

    pub fn add_scalar(&self, offset: f64) -> Self {
        self.mapv(|x| x + offset)
    }

    pub fn div_scalar(&self, divisor: f64) -> Self {
        self.mapv(|x| x / divisor)
    }

    /// Elementwise combination broadcasting by dimension name
    ///
    /// The result carries the left operand's name and the union of both
    /// operands' coordinates; attributes are dropped.
    pub fn zip_with(&self, other: &DataArray, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        let variable = self.variable.zip_with(&other.variable, f)?;
        let mut coords = self.coords.clone();
        for (name, coord) in &other.coords {
            coords.entry(name.clone()).or_insert_with(|| coord.clone());
        }
        Ok(Self {
            name: self.name.clone(),
            variable,
            coords,
        })
    }

    pub fn add(&self, other: &DataArray) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &DataArray) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &DataArray) -> Result<Self> {
        self.zip_with(other, |a, b| a * b)
    }

    pub fn div(&self, other: &DataArray) -> Result<Self> {
        self.zip_with(other, |a, b| a / b)
    }

    /// Keep values where `pred(other)` holds, NaN elsewhere
    pub fn where_by(&self, other: &DataArray, pred: impl Fn(f64) -> bool) -> Result<Self> {
        let mut out = self.zip_with(other, |a, b| if pred(b) { a } else { f64::NAN })?;
        *out.variable.attrs_mut() = self.attrs().clone();
        Ok(out)
    }

    /// NaN-skipping reduction over the named dimensions
    pub fn reduce(&self, dims: &[&str], operation: StatOperation) -> Result<Self> {
        let variable = self
            .variable
            .reduce(dims, operation)
            .map_err(|e| e.for_var(self.label()))?;
        Ok(self.rebuild(variable, |_, c| {
            !c.dims().iter().any(|d| dims.contains(&d.as_str()))
        }))
    }

    pub fn sum(&self, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Sum)
    }

    pub fn mean(&self, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Mean)
    }

    pub fn std(&self, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Std)
    }

    pub fn min(&self, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Min)
    }

    pub fn max(&self, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Max)
    }

    pub fn quantile(&self, q: f64, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Quantile(q))
    }

    /// Select one position along `dim`; coordinates along it become scalars
    pub fn isel(&self, dim: &str, index: usize) -> Result<Self> {
        let variable = self
            .variable
            .isel(dim, index)
            .map_err(|e| e.for_var(self.label()))?;
        let coords = self
            .coords
            .iter()
            .map(|(k, c)| {
                let c = if c.has_dim(dim) {
                    c.isel(dim, index)?
                } else {
                    c.clone()
                };
                Ok((k.clone(), c))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            name: self.name.clone(),
            variable,
            coords,
        })
    }

    pub fn isel_range(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        self.map_along(dim, |v| v.isel_range(dim, range.clone()))
    }

    pub fn isel_indices(&self, dim: &str, indices: &[usize]) -> Result<Self> {
        self.map_along(dim, |v| v.isel_indices(dim, indices))
    }

    fn map_along(&self, dim: &str, f: impl Fn(&Variable) -> Result<Variable>) -> Result<Self> {
        let variable = f(&self.variable).map_err(|e| e.for_var(self.label()))?;
        let coords = self
            .coords
            .iter()
            .map(|(k, c)| {
                let c = if c.has_dim(dim) { f(c)? } else { c.clone() };
                Ok((k.clone(), c))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            name: self.name.clone(),
            variable,
            coords,
        })
    }

    /// Select by exact index value along `dim`
    pub fn sel(&self, dim: &str, value: f64) -> Result<Self> {
        let index = self
            .index_values(dim)?
            .iter()
            .position(|&v| v == value)
            .ok_or_else(|| {
                OceanPostError::InvalidArgument(format!(
                    "value {value} not found in index '{dim}' of {}",
                    self.label()
                ))
            })?;
        self.isel(dim, index)
    }

    /// Rename dimensions and coordinates
    pub fn rename(&self, mapping: &BTreeMap<String, String>) -> Self {
        let mut variable = self.variable.clone();
        variable.rename_dims(mapping);
        let coords = self
            .coords
            .iter()
            .map(|(k, c)| {
                let mut c = c.clone();
                c.rename_dims(mapping);
                (mapping.get(k).cloned().unwrap_or_else(|| k.clone()), c)
            })
            .collect();
        Self {
            name: self.name.clone(),
            variable,
            coords,
        }
    }

    pub fn transpose(&self, order: &[String]) -> Result<Self> {
        Ok(Self {
            name: self.name.clone(),
            variable: self.variable.transpose(order)?,
            coords: self.coords.clone(),
        })
    }

    /// Reorder along `dim` so that its index values increase
    pub fn sortby(&self, dim: &str) -> Result<Self> {
        let order = argsort(&self.index_values(dim)?);
        self.isel_indices(dim, &order)
    }

    /// Concatenate arrays along `dim`
    ///
    /// When `index` is given it becomes the index coordinate of `dim`,
    /// otherwise the pieces' own index or scalar coordinates are joined.
    pub fn concat(arrays: &[DataArray], dim: &str, index: Option<Vec<f64>>) -> Result<Self> {
        let first = arrays
            .first()
            .ok_or_else(|| OceanPostError::InvalidArgument("nothing to concatenate".into()))?;
        let pieces: Vec<Variable> = arrays.iter().map(|a| a.variable.clone()).collect();
        let variable = Variable::concat(&pieces, dim)?;

        let mut out = Self {
            name: first.name.clone(),
            variable,
            coords: BTreeMap::new(),
        };
        for (name, coord) in &first.coords {
            if name != dim && !coord.has_dim(dim) {
                out = out.with_coord(name, coord.clone())?;
            }
        }
        let index = match index {
            Some(values) => Some(values),
            None => join_index(arrays.iter().map(|a| a.coords.get(dim))),
        };
        if let Some(values) = index {
            out = out.with_index(dim, values)?;
        }
        Ok(out)
    }
}

/// Stable argsort with NaN last
pub(crate) fn argsort(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

/// Join index pieces (1-D or scalar) if every piece has one
pub(crate) fn join_index<'a>(pieces: impl Iterator<Item = Option<&'a Variable>>) -> Option<Vec<f64>> {
    let mut values = Vec::new();
    for piece in pieces {
        let piece = piece?;
        match piece.ndim() {
            0 => values.push(piece.scalar_value()?),
            1 => values.extend(piece.data().iter().copied()),
            _ => return None,
        }
    }
    Some(values)
}
