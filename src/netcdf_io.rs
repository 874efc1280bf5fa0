//! NetCDF I/O for labeled datasets
//!
//! Datasets are read with all numeric variables promoted to f64 and with CF
//! packing (`_FillValue`, `missing_value`, `scale_factor`, `add_offset`)
//! decoded. Coordinates are recognised from index variables and from CF
//! `coordinates` attributes. Writing mirrors that layout so a round trip
//! preserves data variables, coordinates and attributes.

use crate::errors::{OceanPostError, Result};
use crate::labeled::{AttrValue, Attributes, Dataset, Variable};
use chrono::Utc;
use log::{debug, info, warn};
use ndarray::{ArrayD, IxDyn};
use netcdf::{create, AttributeValue};
use std::collections::BTreeSet;
use std::{fs, path::Path};

const PACKING_ATTRS: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

fn from_netcdf_attr(value: AttributeValue) -> Option<AttrValue> {
    let value = match value {
        AttributeValue::Str(s) => AttrValue::Str(s),
        AttributeValue::Strs(s) => AttrValue::Strs(s),
        AttributeValue::Double(v) => AttrValue::Float(v),
        AttributeValue::Doubles(v) => AttrValue::Floats(v),
        AttributeValue::Float(v) => AttrValue::Float(f64::from(v)),
        AttributeValue::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        AttributeValue::Schar(v) => AttrValue::Int(i64::from(v)),
        AttributeValue::Uchar(v) => AttrValue::Int(i64::from(v)),
        AttributeValue::Short(v) => AttrValue::Int(i64::from(v)),
        AttributeValue::Ushort(v) => AttrValue::Int(i64::from(v)),
        AttributeValue::Int(v) => AttrValue::Int(i64::from(v)),
        AttributeValue::Uint(v) => AttrValue::Int(i64::from(v)),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Schars(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Uchars(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Shorts(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ushorts(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Uints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Longlongs(v) => AttrValue::Ints(v),
        _ => return None,
    };
    Some(value)
}

fn read_attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
    let mut out = Attributes::new();
    for attr in attrs {
        match attr.value().ok().and_then(from_netcdf_attr) {
            Some(value) => {
                out.insert(attr.name().to_string(), value);
            }
            None => warn!("⚠ Skipped unsupported attribute type for '{}'", attr.name()),
        }
    }
    out
}

/// Names listed in a space-separated CF `coordinates` attribute
fn coordinate_names(attrs: &Attributes) -> Vec<String> {
    attrs
        .get("coordinates")
        .and_then(AttrValue::as_str)
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Apply `_FillValue`/`missing_value` masking and `scale_factor`/`add_offset`
fn decode_packing(values: &mut [f64], attrs: &mut Attributes) {
    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|k| attrs.get(*k).and_then(AttrValue::as_f64))
        .collect();
    let scale = attrs.get("scale_factor").and_then(AttrValue::as_f64);
    let offset = attrs.get("add_offset").and_then(AttrValue::as_f64);

    for v in values.iter_mut() {
        if fills.iter().any(|f| f == v) {
            *v = f64::NAN;
            continue;
        }
        if let Some(scale) = scale {
            *v *= scale;
        }
        if let Some(offset) = offset {
            *v += offset;
        }
    }
    for key in PACKING_ATTRS {
        attrs.remove(key);
    }
}

/// Read every numeric variable of a NetCDF file into a [`Dataset`]
pub fn open_dataset(path: &Path) -> Result<Dataset> {
    let file = netcdf::open(path)?;
    info!("📂 Opening dataset {}", path.display());

    let global_attrs = read_attributes(file.attributes());
    let mut coord_names: BTreeSet<String> = coordinate_names(&global_attrs).into_iter().collect();
    let mut variables = Vec::new();

    for var in file.variables() {
        let name = var.name().to_string();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let mut values = match var.get_values::<f64, _>(..) {
            Ok(values) => values,
            Err(e) => {
                warn!("⚠ Skipping non-numeric variable '{name}': {e}");
                continue;
            }
        };
        let mut attrs = read_attributes(var.attributes());
        decode_packing(&mut values, &mut attrs);

        coord_names.extend(coordinate_names(&attrs));
        attrs.remove("coordinates");

        if dims.len() == 1 && dims[0] == name {
            coord_names.insert(name.clone());
        }
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        variables.push((name, Variable::new(dims, data)?.with_attrs(attrs)));
    }

    let mut ds = Dataset::new();
    for (name, variable) in variables {
        if coord_names.contains(&name) {
            ds.insert_coord(&name, variable)?;
        } else {
            ds.insert_data_var(&name, variable)?;
        }
    }
    let mut global_attrs = global_attrs;
    global_attrs.remove("coordinates");
    *ds.attrs_mut() = global_attrs;

    debug!(
        "Loaded {} data variables and {} coordinates",
        ds.data_vars().len(),
        ds.coords().len()
    );
    Ok(ds)
}

fn put_attr(var: &mut netcdf::VariableMut<'_>, name: &str, value: &AttrValue) -> Result<()> {
    match value {
        AttrValue::Str(s) => var.put_attribute(name, s.clone())?,
        AttrValue::Strs(s) => var.put_attribute(name, s.clone())?,
        AttrValue::Float(v) => var.put_attribute(name, *v)?,
        AttrValue::Floats(v) => var.put_attribute(name, v.clone())?,
        AttrValue::Int(v) => match i32::try_from(*v) {
            Ok(small) => var.put_attribute(name, small)?,
            Err(_) => var.put_attribute(name, *v)?,
        },
        AttrValue::Ints(v) => var.put_attribute(name, v.clone())?,
    };
    Ok(())
}

fn put_global_attr(file: &mut netcdf::FileMut, name: &str, value: &AttrValue) -> Result<()> {
    match value {
        AttrValue::Str(s) => file.add_attribute(name, s.clone())?,
        AttrValue::Strs(s) => file.add_attribute(name, s.clone())?,
        AttrValue::Float(v) => file.add_attribute(name, *v)?,
        AttrValue::Floats(v) => file.add_attribute(name, v.clone())?,
        AttrValue::Int(v) => match i32::try_from(*v) {
            Ok(small) => file.add_attribute(name, small)?,
            Err(_) => file.add_attribute(name, *v)?,
        },
        AttrValue::Ints(v) => file.add_attribute(name, v.clone())?,
    };
    Ok(())
}

/// Writes a [`Dataset`] to a NetCDF-4 file, replacing any existing file
pub struct DatasetWriter<'a> {
    output_path: &'a Path,
}

impl<'a> DatasetWriter<'a> {
    /// Create a new dataset writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write dimensions, coordinates, data variables and attributes
    pub fn write(&self, ds: &Dataset) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }
        let mut file = create(self.output_path)?;

        for (dim_name, &dim_len) in &ds.dims() {
            file.add_dimension(dim_name, dim_len)?;
        }

        // Non-index coordinates are referenced from the variables that use them
        let auxiliary: Vec<(&String, &Variable)> = ds
            .coords()
            .iter()
            .filter(|(name, c)| !(c.ndim() == 1 && c.dims()[0] == **name))
            .collect();
        let mut referenced = BTreeSet::new();

        for (name, coord) in ds.coords() {
            self.write_variable(&mut file, name, coord, None)?;
        }
        for (name, var) in ds.data_vars() {
            let coords: Vec<&str> = auxiliary
                .iter()
                .filter(|(_, c)| c.dims().iter().all(|d| var.has_dim(d)))
                .map(|(n, _)| n.as_str())
                .collect();
            referenced.extend(coords.iter().map(|s| s.to_string()));
            let coords = (!coords.is_empty()).then(|| coords.join(" "));
            self.write_variable(&mut file, name, var, coords)?;
        }

        let mut global = ds.attrs().clone();
        let unreferenced: Vec<String> = auxiliary
            .iter()
            .map(|(n, _)| n.to_string())
            .filter(|n| !referenced.contains(n))
            .collect();
        if !unreferenced.is_empty() {
            global.insert("coordinates".to_string(), unreferenced.join(" ").into());
        }
        let stamp = format!("Created by ocean_post on {}", Utc::now().to_rfc3339());
        let history = match global.get("history").and_then(AttrValue::as_str) {
            Some(previous) => format!("{previous}\n{stamp}"),
            None => stamp,
        };
        global.insert("history".to_string(), history.into());

        for (name, value) in &global {
            put_global_attr(&mut file, name, value)?;
        }

        info!("💾 Wrote dataset to {}", self.output_path.display());
        Ok(())
    }

    fn write_variable(
        &self,
        file: &mut netcdf::FileMut,
        name: &str,
        variable: &Variable,
        coordinates: Option<String>,
    ) -> Result<()> {
        let dim_refs: Vec<&str> = variable.dims().iter().map(String::as_str).collect();
        let mut nc_var = file.add_variable::<f64>(name, &dim_refs)?;
        for (key, value) in variable.attrs() {
            if PACKING_ATTRS.contains(&key.as_str()) || key == "coordinates" {
                continue;
            }
            put_attr(&mut nc_var, key, value)?;
        }
        if let Some(coordinates) = coordinates {
            nc_var.put_attribute("coordinates", coordinates)?;
        }

        let data = variable.data().as_standard_layout();
        match variable.ndim() {
            0 => {
                let value = data.iter().copied().next().ok_or_else(|| {
                    OceanPostError::Generic(format!("scalar variable '{name}' is empty"))
                })?;
                nc_var.put_values(&[value], ..)?;
            }
            _ => nc_var.put(data.view(), ..)?,
        }
        Ok(())
    }
}

/// Write a dataset to `path`
pub fn to_netcdf(ds: &Dataset, path: &Path) -> Result<()> {
    DatasetWriter::new(path).write(ds)
}
