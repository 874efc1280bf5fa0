//! Datasets: named data variables sharing dimensions and coordinates

use super::array::{argsort, join_index, DataArray};
use super::attrs::{AttrValue, Attributes};
use super::time::decode_cf_times;
use super::variable::Variable;
use crate::errors::{OceanPostError, Result};
use crate::statistics::StatOperation;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::ops::Range;

/// A collection of data variables and coordinates over shared dimensions
///
/// Every dimension name maps to a single length across all variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    data_vars: BTreeMap<String, Variable>,
    coords: BTreeMap<String, Variable>,
    attrs: Attributes,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lengths of all dimensions used by data variables or coordinates
    pub fn dims(&self) -> BTreeMap<String, usize> {
        let mut dims = BTreeMap::new();
        for var in self.data_vars.values().chain(self.coords.values()) {
            for (dim, &len) in var.dims().iter().zip(var.shape()) {
                dims.insert(dim.clone(), len);
            }
        }
        dims
    }

    fn check_consistent(&self, name: &str, var: &Variable) -> Result<()> {
        for (other_name, other) in self.data_vars.iter().chain(self.coords.iter()) {
            if other_name == name {
                continue;
            }
            for (dim, &len) in var.dims().iter().zip(var.shape()) {
                match other.len_of(dim) {
                    Some(existing) if existing != len => {
                        return Err(OceanPostError::mismatch(format!(
                            "'{name}' has length {len} along '{dim}' but '{other_name}' has {existing}"
                        )))
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Insert or replace a data variable
    pub fn insert_data_var(&mut self, name: &str, var: Variable) -> Result<()> {
        self.check_consistent(name, &var)?;
        self.coords.remove(name);
        self.data_vars.insert(name.to_string(), var);
        Ok(())
    }

    /// Insert or replace a coordinate
    pub fn insert_coord(&mut self, name: &str, var: Variable) -> Result<()> {
        self.check_consistent(name, &var)?;
        self.data_vars.remove(name);
        self.coords.insert(name.to_string(), var);
        Ok(())
    }

    /// Add `array` as a data variable along with any coordinates not already present
    pub fn assign(mut self, name: &str, array: DataArray) -> Result<Self> {
        self.merge_coords(&array)?;
        self.insert_data_var(name, array.into_variable())?;
        Ok(self)
    }

    /// Add `array` as a coordinate along with its own coordinates
    pub fn assign_coords(mut self, name: &str, array: DataArray) -> Result<Self> {
        self.merge_coords(&array)?;
        self.insert_coord(name, array.into_variable())?;
        Ok(self)
    }

    fn merge_coords(&mut self, array: &DataArray) -> Result<()> {
        for (cname, coord) in array.coords() {
            if !self.coords.contains_key(cname) && !self.data_vars.contains_key(cname) {
                self.insert_coord(cname, coord.clone())?;
            }
        }
        Ok(())
    }

    /// Fetch a data variable or coordinate with its applicable coordinates
    pub fn get(&self, name: &str) -> Result<DataArray> {
        let var = self
            .data_vars
            .get(name)
            .or_else(|| self.coords.get(name))
            .ok_or_else(|| OceanPostError::VariableNotFound {
                var: name.to_string(),
            })?;
        let mut array = DataArray::from_variable(var.clone()).with_name(name);
        for (cname, coord) in &self.coords {
            if cname != name && coord.dims().iter().all(|d| var.has_dim(d)) {
                array = array.with_coord(cname, coord.clone())?;
            }
        }
        Ok(array)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data_vars.contains_key(name) || self.coords.contains_key(name)
    }

    pub fn data_var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.get(name)
    }

    pub fn data_vars(&self) -> &BTreeMap<String, Variable> {
        &self.data_vars
    }

    pub fn coords(&self) -> &BTreeMap<String, Variable> {
        &self.coords
    }

    pub fn data_var_names(&self) -> Vec<String> {
        self.data_vars.keys().cloned().collect()
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub(crate) fn data_var_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.data_vars.get_mut(name)
    }

    pub(crate) fn coord_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.coords.get_mut(name)
    }

    /// Remove variables or coordinates; unknown names are an error
    pub fn drop_vars(mut self, names: &[&str]) -> Result<Self> {
        for name in names {
            if self.data_vars.remove(*name).is_none() && self.coords.remove(*name).is_none() {
                return Err(OceanPostError::VariableNotFound {
                    var: name.to_string(),
                });
            }
        }
        Ok(self)
    }

    /// Rename variables, coordinates and dimensions
    ///
    /// Every key must name a variable, coordinate or dimension.
    pub fn rename(&self, mapping: &[(&str, &str)]) -> Result<Self> {
        let dims = self.dims();
        for (from, _) in mapping {
            if !self.contains(from) && !dims.contains_key(*from) {
                return Err(OceanPostError::VariableNotFound {
                    var: from.to_string(),
                });
            }
        }
        let map: BTreeMap<String, String> = mapping
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        let rename_all = |vars: &BTreeMap<String, Variable>| {
            vars.iter()
                .map(|(k, v)| {
                    let mut v = v.clone();
                    v.rename_dims(&map);
                    (map.get(k).cloned().unwrap_or_else(|| k.clone()), v)
                })
                .collect::<BTreeMap<_, _>>()
        };
        Ok(Self {
            data_vars: rename_all(&self.data_vars),
            coords: rename_all(&self.coords),
            attrs: self.attrs.clone(),
        })
    }

    /// Build a new dataset by transforming every data variable
    ///
    /// Coordinates survive when each of their dimensions still exists with
    /// the same length in the transformed variables; scalar coordinates are
    /// always kept.
    pub fn map_data_vars(&self, f: impl Fn(&str, &DataArray) -> Result<DataArray>) -> Result<Self> {
        let mut out = Dataset {
            data_vars: BTreeMap::new(),
            coords: BTreeMap::new(),
            attrs: self.attrs.clone(),
        };
        for name in self.data_vars.keys() {
            let array = f(name, &self.get(name)?)?;
            out = out.assign(name, array)?;
        }
        let dims = out.dims();
        for (name, coord) in &self.coords {
            if out.contains(name) {
                continue;
            }
            let fits = coord
                .dims()
                .iter()
                .zip(coord.shape())
                .all(|(d, &n)| dims.get(d) == Some(&n));
            if fits {
                out.insert_coord(name, coord.clone())?;
            }
        }
        Ok(out)
    }

    /// Mask every data variable where `pred(other)` does not hold
    pub fn where_by(&self, other: &DataArray, pred: impl Fn(f64) -> bool + Copy) -> Result<Self> {
        self.map_data_vars(|_, da| da.where_by(other, pred))
    }

    /// Reduce each data variable over those of `dims` it has
    ///
    /// Variables without any of the dimensions pass through unchanged.
    pub fn reduce(&self, dims: &[&str], operation: StatOperation) -> Result<Self> {
        self.map_data_vars(|_, da| {
            let present: Vec<&str> = dims.iter().copied().filter(|d| da.has_dim(d)).collect();
            if present.is_empty() {
                Ok(da.clone())
            } else {
                da.reduce(&present, operation)
            }
        })
    }

    pub fn sum(&self, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Sum)
    }

    pub fn mean(&self, dims: &[&str]) -> Result<Self> {
        self.reduce(dims, StatOperation::Mean)
    }

    fn map_all(&self, dim: &str, f: impl Fn(&Variable) -> Result<Variable>) -> Result<Self> {
        if !self.dims().contains_key(dim) {
            return Err(OceanPostError::DimensionNotFound {
                var: "dataset".to_string(),
                dim: dim.to_string(),
            });
        }
        let apply = |vars: &BTreeMap<String, Variable>| {
            vars.iter()
                .map(|(k, v)| {
                    let v = if v.has_dim(dim) {
                        f(v).map_err(|e| e.for_var(k))?
                    } else {
                        v.clone()
                    };
                    Ok((k.clone(), v))
                })
                .collect::<Result<BTreeMap<_, _>>>()
        };
        Ok(Self {
            data_vars: apply(&self.data_vars)?,
            coords: apply(&self.coords)?,
            attrs: self.attrs.clone(),
        })
    }

    /// Select one position along `dim` in every variable
    pub fn isel(&self, dim: &str, index: usize) -> Result<Self> {
        self.map_all(dim, |v| v.isel(dim, index))
    }

    pub fn isel_range(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        self.map_all(dim, |v| v.isel_range(dim, range.clone()))
    }

    pub fn isel_indices(&self, dim: &str, indices: &[usize]) -> Result<Self> {
        self.map_all(dim, |v| v.isel_indices(dim, indices))
    }

    /// Index values of `dim`, or positions when there is no index coordinate
    pub fn index_values(&self, dim: &str) -> Result<Vec<f64>> {
        let len = *self
            .dims()
            .get(dim)
            .ok_or_else(|| OceanPostError::DimensionNotFound {
                var: "dataset".to_string(),
                dim: dim.to_string(),
            })?;
        Ok(self
            .coords
            .get(dim)
            .and_then(Variable::values_1d)
            .unwrap_or_else(|| (0..len).map(|i| i as f64).collect()))
    }

    /// Reorder every variable along `dim` by increasing index value
    pub fn sortby(&self, dim: &str) -> Result<Self> {
        let order = argsort(&self.index_values(dim)?);
        self.isel_indices(dim, &order)
    }

    /// Decode the CF time coordinate `dim` using its `units` and `calendar`
    /// attributes
    pub fn decode_times(&self, dim: &str) -> Result<Vec<NaiveDateTime>> {
        let coord = self
            .coords
            .get(dim)
            .ok_or_else(|| OceanPostError::VariableNotFound {
                var: dim.to_string(),
            })?;
        let units = coord
            .attrs()
            .get("units")
            .and_then(AttrValue::as_str)
            .ok_or_else(|| {
                OceanPostError::TimeDecodeError(format!("coordinate '{dim}' has no units"))
            })?;
        let calendar = coord.attrs().get("calendar").and_then(AttrValue::as_str);
        let values: Vec<f64> = coord.data().iter().copied().collect();
        decode_cf_times(&values, units, calendar)
    }

    /// Concatenate datasets along `dim`
    ///
    /// All datasets must hold the same data variables. Pieces without `dim`
    /// gain it with length one; `index` overrides the joined index values.
    pub fn concat(datasets: &[Dataset], dim: &str, index: Option<Vec<f64>>) -> Result<Self> {
        let first = datasets
            .first()
            .ok_or_else(|| OceanPostError::InvalidArgument("nothing to concatenate".into()))?;

        let mut out = Dataset {
            data_vars: BTreeMap::new(),
            coords: BTreeMap::new(),
            attrs: first.attrs.clone(),
        };
        for name in first.data_vars.keys() {
            let pieces = datasets
                .iter()
                .map(|ds| {
                    ds.data_vars
                        .get(name)
                        .cloned()
                        .ok_or_else(|| OceanPostError::VariableNotFound { var: name.clone() })
                })
                .collect::<Result<Vec<_>>>()?;
            out.insert_data_var(name, Variable::concat(&pieces, dim)?)?;
        }

        for (name, coord) in &first.coords {
            if name == dim {
                continue;
            }
            if coord.has_dim(dim) {
                let pieces = datasets
                    .iter()
                    .filter_map(|ds| ds.coords.get(name).cloned())
                    .collect::<Vec<_>>();
                if pieces.len() == datasets.len() {
                    out.insert_coord(name, Variable::concat(&pieces, dim)?)?;
                }
            } else {
                out.insert_coord(name, coord.clone())?;
            }
        }

        let index = match index {
            Some(values) => Some(values),
            None => join_index(datasets.iter().map(|ds| ds.coords.get(dim))),
        };
        if let Some(values) = index {
            let attrs = first
                .coords
                .get(dim)
                .map(|c| c.attrs().clone())
                .unwrap_or_default();
            out.insert_coord(dim, Variable::coordinate(dim, values).with_attrs(attrs))?;
        }
        Ok(out)
    }
}
