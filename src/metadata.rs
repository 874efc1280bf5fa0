//! Dataset inspection and variable description
//!
//! Prints the structure of a [`Dataset`] (dimensions, coordinates, data
//! variables and global attributes) and quick NaN-aware statistics of a
//! single variable.

use crate::errors::{OceanPostError, Result};
use crate::labeled::{AttrValue, Dataset, Variable};
use crate::statistics::{reduce_lane, StatOperation};
use ndarray::Array1;

/// NaN-skipping summary statistics of one variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    /// Number of finite values
    pub valid: usize,
    pub total: usize,
}

impl VariableSummary {
    pub fn of(var: &Variable) -> Self {
        let flat: Array1<f64> = var.data().iter().copied().collect();
        let stat = |op| reduce_lane(flat.view(), op);
        Self {
            min: stat(StatOperation::Min),
            max: stat(StatOperation::Max),
            mean: stat(StatOperation::Mean),
            std: stat(StatOperation::Std),
            valid: flat.iter().filter(|v| v.is_finite()).count(),
            total: flat.len(),
        }
    }
}

fn shape_line(var: &Variable) -> String {
    if var.ndim() == 0 {
        return "scalar".to_string();
    }
    let shape: Vec<String> = var.shape().iter().map(usize::to_string).collect();
    format!("[{}] = ({})", var.dims().join(", "), shape.join(" × "))
}

fn key_attrs(var: &Variable) -> Option<String> {
    let keys: Vec<String> = ["units", "long_name", "calendar"]
        .iter()
        .filter_map(|k| var.attrs().get(*k).map(|v| format!("{k}: {v}")))
        .collect();
    (!keys.is_empty()).then(|| keys.join(", "))
}

fn print_variables<'a>(header: &str, vars: impl ExactSizeIterator<Item = (&'a String, &'a Variable)>) {
    println!("\n {header}");
    println!("{}", "=".repeat(header.len() + 2));
    if vars.len() == 0 {
        println!("   (none)");
        return;
    }
    for (name, var) in vars {
        println!("    {name}: {}", shape_line(var));
        if let Some(keys) = key_attrs(var) {
            println!("      └─ {keys}");
        }
    }
}

/// Print dimensions, coordinates, data variables and global attributes
pub fn print_dataset_summary(ds: &Dataset) {
    println!("\n Dimensions");
    println!("==============");
    let dims = ds.dims();
    if dims.is_empty() {
        println!("   (No dimensions found)");
    }
    for (name, len) in &dims {
        println!("    {name} = {len}");
    }

    print_variables("Coordinates", ds.coords().iter());
    print_variables("Data variables", ds.data_vars().iter());

    println!("\n Global Attributes");
    println!("=====================");
    if ds.attrs().is_empty() {
        println!("   (none)");
    }
    for (key, value) in ds.attrs() {
        println!("    {key}: {value}");
    }
}

fn attr_kind(value: &AttrValue) -> &'static str {
    match value {
        AttrValue::Str(_) | AttrValue::Strs(_) => "text",
        AttrValue::Int(_) | AttrValue::Ints(_) => "integer",
        AttrValue::Float(_) | AttrValue::Floats(_) => "float",
    }
}

/// Print the shape, attributes and summary statistics of variable `name`
pub fn describe_variable(ds: &Dataset, name: &str) -> Result<VariableSummary> {
    let var = ds
        .data_var(name)
        .or_else(|| ds.coord(name))
        .ok_or_else(|| OceanPostError::VariableNotFound {
            var: name.to_string(),
        })?;
    let kind = if ds.data_var(name).is_some() {
        "data variable"
    } else {
        "coordinate"
    };

    println!("\n Variable Description: {name}");
    println!("={}", "=".repeat(name.len() + 25));
    println!("    Kind: {kind}");
    println!("    Shape: {}", shape_line(var));

    println!("\n  Attributes:");
    if var.attrs().is_empty() {
        println!("    (none)");
    }
    for (key, value) in var.attrs() {
        println!("    {key} ({}): {value}", attr_kind(value));
    }

    let summary = VariableSummary::of(var);
    println!("\n  Statistics ({} of {} values valid):", summary.valid, summary.total);
    println!("    Min: {}", summary.min);
    println!("    Max: {}", summary.max);
    println!("    Mean: {:.4}", summary.mean);
    println!("    Std Dev: {:.4}", summary.std);
    Ok(summary)
}
