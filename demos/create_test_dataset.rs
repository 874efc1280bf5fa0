//! Creates a small model-like NetCDF dataset and grid-spec file for trying ocean_post.
//!
//! The data file has a tracer, an oxygen field with land points and layer
//! `rho_dzt`. A second file holds B-grid velocities with their cell widths,
//! and the grid-spec file holds `area_t` on `gridlon_t`/`gridlat_t`, as in
//! the model grid files.

use ndarray::{Array1, Array2, Array3, Array4};
use netcdf::create;
use std::path::Path;

const NT: usize = 24;
const NZ: usize = 4;
const NY: usize = 5;
const NX: usize = 8;

fn is_land(y: usize, x: usize) -> bool {
    y == 0 && x < 2
}

/// Index variables for horizontal axes, 10 degrees apart in y and 45 in x
fn add_horizontal_axes(
    file: &mut netcdf::FileMut,
    axes: &[(&str, f64)],
) -> Result<(), Box<dyn std::error::Error>> {
    for &(name, start) in axes {
        let (n, step, units) = if name.starts_with('y') {
            (NY, 10.0, "degrees_N")
        } else {
            (NX, 45.0, "degrees_E")
        };
        let mut var = file.add_variable::<f64>(name, &[name])?;
        var.put_attribute("units", units)?;
        let values = Array1::from_iter((0..n).map(|i| start + step * i as f64));
        var.put(values.view(), ..)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_path = Path::new("test_ocean.nc");
    let velocity_path = Path::new("test_velocity.nc");
    let grid_path = Path::new("test_gridspec.nc");

    println!("🔨 Creating test dataset: {}", data_path.display());
    if data_path.exists() {
        std::fs::remove_file(data_path)?
    }
    let mut file = create(data_path)?;

    file.add_attribute("title", "Synthetic ocean model output")?;
    file.add_attribute("created_by", "create_test_dataset.rs")?;

    file.add_dimension("time", NT)?;
    file.add_dimension("st_ocean", NZ)?;
    file.add_dimension("yt_ocean", NY)?;
    file.add_dimension("xt_ocean", NX)?;

    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("units", "days since 0001-01-01 00:00:00")?;
        time.put_attribute("calendar", "noleap")?;
        let values = Array1::from_iter((0..NT).map(|i| 15.0 + 30.0 * i as f64));
        time.put(values.view(), ..)?;
    }
    {
        let mut depth = file.add_variable::<f64>("st_ocean", &["st_ocean"])?;
        depth.put_attribute("units", "meters")?;
        depth.put_attribute("positive", "down")?;
        let values = Array1::from(vec![5.0, 50.0, 200.0, 1000.0]);
        depth.put(values.view(), ..)?;
    }
    add_horizontal_axes(&mut file, &[("yt_ocean", -20.0), ("xt_ocean", -180.0)])?;

    {
        let mut temp = file.add_variable::<f32>("temp", &["time", "st_ocean", "yt_ocean", "xt_ocean"])?;
        temp.put_attribute("units", "deg_C")?;
        temp.put_attribute("long_name", "Potential temperature")?;
        temp.put_attribute("_FillValue", -1.0e20f32)?;
        let values = Array4::from_shape_fn((NT, NZ, NY, NX), |(t, z, y, x)| {
            if is_land(y, x) {
                -1.0e20
            } else {
                let seasonal = 2.0 * (t as f32 * std::f32::consts::PI / 6.0).cos();
                25.0 - 5.0 * z as f32 - (y as f32 - 2.0).abs() + seasonal
            }
        });
        temp.put(values.view(), ..)?;
    }
    {
        let mut o2 = file.add_variable::<f32>("o2", &["time", "st_ocean", "yt_ocean", "xt_ocean"])?;
        o2.put_attribute("units", "mol/kg")?;
        o2.put_attribute("long_name", "Dissolved oxygen")?;
        o2.put_attribute("_FillValue", -1.0e20f32)?;
        let values = Array4::from_shape_fn((NT, NZ, NY, NX), |(t, z, y, x)| {
            if is_land(y, x) {
                -1.0e20
            } else {
                let minimum_zone = if z == 2 && y == 2 { 0.15 } else { 0.0 };
                2.5e-4 - 4.0e-5 * z as f32 - 1.0e-3 * minimum_zone + 1.0e-6 * t as f32
            }
        });
        o2.put(values.view(), ..)?;
    }
    {
        let mut rho_dzt = file.add_variable::<f64>("rho_dzt", &["time", "st_ocean", "yt_ocean", "xt_ocean"])?;
        rho_dzt.put_attribute("units", "(kg/m^3)*m")?;
        let thickness = [10.0, 80.0, 220.0, 1600.0];
        let values = Array4::from_shape_fn((NT, NZ, NY, NX), |(_, z, _, _)| 1035.0 * thickness[z]);
        rho_dzt.put(values.view(), ..)?;
    }
    drop(file);

    println!("🔨 Creating velocity file: {}", velocity_path.display());
    if velocity_path.exists() {
        std::fs::remove_file(velocity_path)?
    }
    let mut file = create(velocity_path)?;
    file.add_dimension("st_ocean", NZ)?;
    for dim in ["yt_ocean", "yu_ocean"] {
        file.add_dimension(dim, NY)?;
    }
    for dim in ["xt_ocean", "xu_ocean"] {
        file.add_dimension(dim, NX)?;
    }
    add_horizontal_axes(
        &mut file,
        &[
            ("yt_ocean", -20.0),
            ("yu_ocean", -15.0),
            ("xt_ocean", -180.0),
            ("xu_ocean", -157.5),
        ],
    )?;
    for (name, sign) in [("u", 1.0), ("v", -1.0)] {
        let mut var = file.add_variable::<f64>(name, &["st_ocean", "yu_ocean", "xu_ocean"])?;
        var.put_attribute("units", "m/sec")?;
        let values = Array3::from_shape_fn((NZ, NY, NX), |(z, y, x)| {
            sign * 0.1 * ((x as f64 * 0.8).sin() + (y as f64 * 0.6).cos()) / (1.0 + z as f64)
        });
        var.put(values.view(), ..)?;
    }
    for (name, width) in [("dxu", 4.5e6), ("dyu", 1.1e6)] {
        let mut var = file.add_variable::<f64>(name, &["yu_ocean", "xu_ocean"])?;
        var.put_attribute("units", "m")?;
        let values = Array2::from_elem((NY, NX), width);
        var.put(values.view(), ..)?;
    }
    {
        let mut area = file.add_variable::<f64>("area_t", &["yt_ocean", "xt_ocean"])?;
        area.put_attribute("units", "m^2")?;
        let values = Array2::from_elem((NY, NX), 4.5e6 * 1.1e6);
        area.put(values.view(), ..)?;
    }
    drop(file);

    println!("🔨 Creating grid-spec file: {}", grid_path.display());
    if grid_path.exists() {
        std::fs::remove_file(grid_path)?
    }
    let mut grid = create(grid_path)?;
    grid.add_dimension("gridlat_t", NY)?;
    grid.add_dimension("gridlon_t", NX)?;
    {
        let mut area = grid.add_variable::<f64>("area_t", &["gridlat_t", "gridlon_t"])?;
        area.put_attribute("units", "m^2")?;
        let values = Array2::from_shape_fn((NY, NX), |(y, _)| {
            4.5e6 * 1.1e6 * ((-20.0 + 10.0 * y as f64).to_radians()).cos()
        });
        area.put(values.view(), ..)?;
    }

    println!("✅ Successfully created test files with:");
    println!("   📏 Dimensions: time({NT}), st_ocean({NZ}), yt_ocean({NY}), xt_ocean({NX})");
    println!("   📈 Variables: temp, o2, rho_dzt (data); u, v, dxu, dyu, area_t (velocity)");
    println!("\n🧪 Try:");
    println!("   cargo run -- info -f test_ocean.nc");
    println!(
        "   cargo run -- metrics -f test_ocean.nc --gridspec test_gridspec.nc --refvar temp \
         --threshold-var o2 --thresholds 1e-4,2e-4 --odir out --fname run --plots out/plots"
    );
    println!(
        "   cargo run -- vorticity -f test_velocity.nc -o zeta.nc --dx dxu --dy dyu --area area_t"
    );

    Ok(())
}
