//! Finite-volume operators on staggered (Arakawa B/C) grids
//!
//! A [`Grid`] maps logical axes (`"X"`, `"Y"`, ...) to the dimensions that
//! hold each staggered position along them. Interpolation and differencing
//! move data by half a cell between the cell centre and a staggered position,
//! pulling out-of-range neighbours from the axis [`Boundary`] rule.

use crate::errors::{OceanPostError, Result};
use crate::labeled::{DataArray, Dataset, Variable};
use log::debug;
use ndarray::{ArrayD, ArrayView1, Axis, IxDyn, Zip};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Location of a variable along one grid axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisPosition {
    Center,
    Left,
    Right,
    Inner,
    Outer,
}

impl AxisPosition {
    pub const fn as_str(self) -> &'static str {
        match self {
            AxisPosition::Center => "center",
            AxisPosition::Left => "left",
            AxisPosition::Right => "right",
            AxisPosition::Inner => "inner",
            AxisPosition::Outer => "outer",
        }
    }

    /// Offset from the cell centre in half cells
    const fn half_offset(self) -> isize {
        match self {
            AxisPosition::Center => 0,
            AxisPosition::Left | AxisPosition::Outer => -1,
            AxisPosition::Right | AxisPosition::Inner => 1,
        }
    }

    const fn is_staggered_edge(self) -> bool {
        matches!(self, AxisPosition::Inner | AxisPosition::Outer)
    }
}

impl fmt::Display for AxisPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AxisPosition {
    type Err = OceanPostError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "center" => Ok(AxisPosition::Center),
            "left" => Ok(AxisPosition::Left),
            "right" => Ok(AxisPosition::Right),
            "inner" => Ok(AxisPosition::Inner),
            "outer" => Ok(AxisPosition::Outer),
            other => Err(OceanPostError::InvalidArgument(format!(
                "unknown axis position '{other}'"
            ))),
        }
    }
}

/// How values beyond either end of an axis are obtained
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Boundary {
    /// Wrap around
    #[default]
    Periodic,
    /// Repeat the edge value
    Extend,
    /// Use a constant
    Fill(f64),
}

impl Boundary {
    fn value_at(self, lane: &ArrayView1<f64>, k: isize) -> f64 {
        let n = lane.len() as isize;
        if n == 0 {
            return f64::NAN;
        }
        if (0..n).contains(&k) {
            return lane[k as usize];
        }
        match self {
            Boundary::Periodic => lane[k.rem_euclid(n) as usize],
            Boundary::Extend => lane[k.clamp(0, n - 1) as usize],
            Boundary::Fill(value) => value,
        }
    }
}

/// One logical axis: the dimension used for each position
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    name: String,
    positions: BTreeMap<AxisPosition, String>,
    boundary: Boundary,
}

impl GridAxis {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            positions: BTreeMap::new(),
            boundary: Boundary::default(),
        }
    }

    pub fn with_position(mut self, position: AxisPosition, dim: &str) -> Self {
        self.positions.insert(position, dim.to_string());
        self
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn positions(&self) -> &BTreeMap<AxisPosition, String> {
        &self.positions
    }

    /// Dimension holding `position`
    pub fn dim(&self, position: AxisPosition) -> Result<&str> {
        self.positions
            .get(&position)
            .map(String::as_str)
            .ok_or_else(|| {
                OceanPostError::GridError(format!(
                    "axis '{}' has no '{position}' position",
                    self.name
                ))
            })
    }

    /// Position reached by interpolating away from `from`
    fn default_target(&self, from: AxisPosition) -> Result<AxisPosition> {
        if from != AxisPosition::Center {
            return Ok(AxisPosition::Center);
        }
        [
            AxisPosition::Right,
            AxisPosition::Left,
            AxisPosition::Inner,
            AxisPosition::Outer,
        ]
        .into_iter()
        .find(|p| self.positions.contains_key(p))
        .ok_or_else(|| {
            OceanPostError::GridError(format!("axis '{}' has no staggered position", self.name))
        })
    }
}

/// Arakawa grid type of a velocity pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridType {
    /// u and v share the cell corner
    B,
    /// u on the east face, v on the north face
    C,
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridType::B => f.write_str("B"),
            GridType::C => f.write_str("C"),
        }
    }
}

impl FromStr for GridType {
    type Err = OceanPostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "B" | "b" => Ok(GridType::B),
            "C" | "c" => Ok(GridType::C),
            other => Err(OceanPostError::InvalidArgument(format!(
                "unknown grid type '{other}', expected B or C"
            ))),
        }
    }
}

/// A set of staggered axes bound to the dimensions of a dataset
#[derive(Debug, Clone)]
pub struct Grid {
    axes: BTreeMap<String, GridAxis>,
    lengths: BTreeMap<String, usize>,
    indexes: BTreeMap<String, Vec<f64>>,
}

impl Grid {
    /// Bind `axes` to `ds`, validating the staggered dimension lengths
    ///
    /// Every axis needs a centre position. Left and right positions have the
    /// centre length, inner one less and outer one more.
    pub fn new(ds: &Dataset, axes: Vec<GridAxis>) -> Result<Self> {
        let ds_dims = ds.dims();
        let mut grid = Grid {
            axes: BTreeMap::new(),
            lengths: BTreeMap::new(),
            indexes: BTreeMap::new(),
        };

        for axis in axes {
            let center_dim = axis.dim(AxisPosition::Center)?;
            let n = *ds_dims
                .get(center_dim)
                .ok_or_else(|| OceanPostError::DimensionNotFound {
                    var: "dataset".to_string(),
                    dim: center_dim.to_string(),
                })?;

            for (&position, dim) in axis.positions() {
                let len = *ds_dims
                    .get(dim)
                    .ok_or_else(|| OceanPostError::DimensionNotFound {
                        var: "dataset".to_string(),
                        dim: dim.clone(),
                    })?;
                let expected = match position {
                    AxisPosition::Center | AxisPosition::Left | AxisPosition::Right => n,
                    AxisPosition::Inner => n.saturating_sub(1),
                    AxisPosition::Outer => n + 1,
                };
                if len != expected {
                    return Err(OceanPostError::GridError(format!(
                        "axis '{}': dimension '{dim}' at position {position} has length {len}, expected {expected}",
                        axis.name()
                    )));
                }
                grid.lengths.insert(dim.clone(), len);
                if let Some(values) = ds.coord(dim).and_then(Variable::values_1d) {
                    grid.indexes.insert(dim.clone(), values);
                }
            }
            debug!("Grid axis '{}' bound to {:?}", axis.name(), axis.positions());
            grid.axes.insert(axis.name().to_string(), axis);
        }
        Ok(grid)
    }

    pub fn axis(&self, name: &str) -> Result<&GridAxis> {
        self.axes
            .get(name)
            .ok_or_else(|| OceanPostError::GridError(format!("grid has no axis '{name}'")))
    }

    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.keys().map(String::as_str).collect()
    }

    /// Position of `da` along `axis`
    pub fn axis_position(&self, axis: &str, da: &DataArray) -> Result<AxisPosition> {
        let found: Vec<AxisPosition> = self
            .axis(axis)?
            .positions()
            .iter()
            .filter(|(_, dim)| da.has_dim(dim))
            .map(|(&p, _)| p)
            .collect();
        match found.as_slice() {
            [position] => Ok(*position),
            [] => Err(OceanPostError::DimensionNotFound {
                var: da.label().to_string(),
                dim: axis.to_string(),
            }),
            _ => Err(OceanPostError::GridError(format!(
                "{} has several dimensions of axis '{axis}'",
                da.label()
            ))),
        }
    }

    /// Dimension of `da` that belongs to `axis`
    pub fn get_axis_dim(&self, axis: &str, da: &DataArray) -> Result<String> {
        let position = self.axis_position(axis, da)?;
        Ok(self.axis(axis)?.dim(position)?.to_string())
    }

    /// Axes of the grid that `da` varies along
    fn axes_of(&self, da: &DataArray) -> Vec<&str> {
        self.axes
            .values()
            .filter(|a| a.positions().values().any(|d| da.has_dim(d)))
            .map(GridAxis::name)
            .collect()
    }

    /// Interpolate to the default other position along `axis`
    pub fn interp(&self, da: &DataArray, axis: &str) -> Result<DataArray> {
        let from = self.axis_position(axis, da)?;
        let target = self.axis(axis)?.default_target(from)?;
        self.interp_to(da, axis, target)
    }

    /// Interpolate to `target` along `axis`; a no-op if already there
    pub fn interp_to(&self, da: &DataArray, axis: &str, target: AxisPosition) -> Result<DataArray> {
        if self.axis_position(axis, da)? == target {
            return Ok(da.clone());
        }
        self.half_shift(da, axis, target, |a, b| 0.5 * (a + b))
    }

    /// Difference to the default other position along `axis`
    pub fn diff(&self, da: &DataArray, axis: &str) -> Result<DataArray> {
        let from = self.axis_position(axis, da)?;
        let target = self.axis(axis)?.default_target(from)?;
        self.half_shift(da, axis, target, |a, b| b - a)
    }

    /// Apply a two-point stencil moving `da` half a cell to `target`
    fn half_shift(
        &self,
        da: &DataArray,
        axis: &str,
        target: AxisPosition,
        stencil: impl Fn(f64, f64) -> f64 + Send + Sync,
    ) -> Result<DataArray> {
        let grid_axis = self.axis(axis)?;
        let source = self.axis_position(axis, da)?;
        let source_dim = grid_axis.dim(source)?.to_string();
        let target_dim = grid_axis.dim(target)?.to_string();

        let step = target.half_offset() - source.half_offset();
        if step.abs() != 1 {
            return Err(OceanPostError::GridError(format!(
                "cannot move from {source} to {target} along axis '{axis}'"
            )));
        }
        // First neighbour of output point j is source index j + start
        let start = (step - 1) / 2;

        let axis_index = da.variable().require_axis(&source_dim)?;
        let target_len = self.lengths.get(&target_dim).copied().ok_or_else(|| {
            OceanPostError::GridError(format!("unknown length for dimension '{target_dim}'"))
        })?;
        let mut shape = da.shape().to_vec();
        shape[axis_index] = target_len;

        let boundary = grid_axis.boundary();
        let mut data = ArrayD::<f64>::zeros(IxDyn(&shape));
        Zip::from(data.lanes_mut(Axis(axis_index)))
            .and(da.data().lanes(Axis(axis_index)))
            .par_for_each(|mut dst, src| {
                for (j, value) in dst.iter_mut().enumerate() {
                    let k = j as isize + start;
                    *value = stencil(boundary.value_at(&src, k), boundary.value_at(&src, k + 1));
                }
            });

        let mut dims = da.dims().to_vec();
        dims[axis_index] = target_dim.clone();
        let mut out = DataArray::from_variable(Variable::new(dims, data)?);
        if let Some(name) = da.name() {
            out = out.with_name(name);
        }
        for (cname, coord) in da.coords() {
            if !coord.has_dim(&source_dim) {
                out = out.with_coord(cname, coord.clone())?;
            }
        }
        if let Some(index) = self.indexes.get(&target_dim) {
            out = out.with_index(&target_dim, index.clone())?;
        }
        Ok(out)
    }
}

/// Infer the Arakawa grid type from the positions of `u` and `v`
pub fn infer_gridtype(grid: &Grid, u: &DataArray, v: &DataArray) -> Result<GridType> {
    let u_pos = (grid.axis_position("X", u)?, grid.axis_position("Y", u)?);
    let v_pos = (grid.axis_position("X", v)?, grid.axis_position("Y", v)?);

    if [u_pos.0, u_pos.1, v_pos.0, v_pos.1]
        .iter()
        .any(|p| p.is_staggered_edge())
    {
        return Err(OceanPostError::UnsupportedPosition(
            "`inner` or `outer` grid positions are not supported".to_string(),
        ));
    }

    use AxisPosition::{Center, Right};
    match (u_pos, v_pos) {
        ((Right, Right), (Right, Right)) => Ok(GridType::B),
        ((Right, Center), (Center, Right)) => Ok(GridType::C),
        _ => Err(OceanPostError::GridTypeNotRecognized {
            u: format!("({}, {})", u_pos.0, u_pos.1),
            v: format!("({}, {})", v_pos.0, v_pos.1),
        }),
    }
}

/// Require `a` and `b` to have the same set of dimensions
pub fn check_dims(a: &DataArray, b: &DataArray, name: &str) -> Result<()> {
    let same = a.ndim() == b.ndim() && b.dims().iter().all(|d| a.has_dim(d));
    if same {
        Ok(())
    } else {
        Err(OceanPostError::mismatch(format!(
            "{name} dimensions {:?} do not match {:?}",
            b.dims(),
            a.dims()
        )))
    }
}

/// Interpolate every data variable to `target` along each grid axis it has
pub fn interp_all(grid: &Grid, ds: &Dataset, target: AxisPosition) -> Result<Dataset> {
    ds.map_data_vars(|_, da| {
        grid.axes_of(da)
            .into_iter()
            .try_fold(da.clone(), |acc, axis| grid.interp_to(&acc, axis, target))
    })
}

/// Relative vorticity of the horizontal velocity `(u, v)`
///
/// `dx` is the zonal cell width at the u points, `dy` the meridional width
/// at the v points and `area` the cell area at the vorticity points. The
/// grid type is inferred when not given.
pub fn calculate_rel_vorticity(
    grid: &Grid,
    u: &DataArray,
    v: &DataArray,
    dx: &DataArray,
    dy: &DataArray,
    area: &DataArray,
    gridtype: Option<GridType>,
) -> Result<DataArray> {
    let gridtype = match gridtype {
        Some(gridtype) => gridtype,
        None => infer_gridtype(grid, u, v)?,
    };
    check_dims(u, dx, "dx")?;
    check_dims(v, dy, "dy")?;

    let v_dy = v.mul(dy)?;
    let u_dx = u.mul(dx)?;
    let circulation = match gridtype {
        GridType::B => {
            let dv = grid.diff(&grid.interp(&v_dy, "Y")?, "X")?;
            let du = grid.diff(&grid.interp(&u_dx, "X")?, "Y")?;
            dv.sub(&du)?
        }
        GridType::C => grid.diff(&v_dy, "X")?.sub(&grid.diff(&u_dx, "Y")?)?,
    };
    check_dims(&circulation, area, "area")?;
    debug!("Computed relative vorticity on a {gridtype} grid");
    Ok(circulation.div(area)?.with_name("relative_vorticity"))
}
