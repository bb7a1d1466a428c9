//! Structured hexahedral grids in 3d
use super::{CellType, Grid};
use crate::{Error, Result, Vert3d};

/// `n` uniformly spaced coordinates from `a` to `b`
pub fn uniform_coords(a: f64, b: f64, n: usize) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(Error::from("at least one interval is required"));
    }
    if b <= a {
        return Err(Error::from(&format!("invalid range [{a}, {b}]")));
    }
    let dx = (b - a) / n as f64;
    Ok((0..=n).map(|i| a + i as f64 * dx).collect())
}

/// `n` intervals from `a` to `b` with sizes in geometric progression
/// (`size[i + 1] = ratio * size[i]`)
pub fn geometric_coords(a: f64, b: f64, n: usize, ratio: f64) -> Result<Vec<f64>> {
    if ratio <= 0.0 {
        return Err(Error::from(&format!("invalid ratio {ratio}")));
    }
    if (ratio - 1.0).abs() < 1e-12 {
        return uniform_coords(a, b, n);
    }
    if n == 0 {
        return Err(Error::from("at least one interval is required"));
    }
    if b <= a {
        return Err(Error::from(&format!("invalid range [{a}, {b}]")));
    }
    let h0 = (b - a) * (1.0 - ratio) / (1.0 - ratio.powi(n as i32));
    let mut res = Vec::with_capacity(n + 1);
    let mut x = a;
    let mut h = h0;
    res.push(a);
    for _ in 0..n - 1 {
        x += h;
        h *= ratio;
        res.push(x);
    }
    res.push(b);
    Ok(res)
}

/// Create a hexahedral `Grid` of a box from the coordinates of the grid lines
/// along each axis. Hexahedra use the VTK ordering
pub fn box_grid(x: &[f64], y: &[f64], z: &[f64]) -> Result<Grid> {
    let nx = x.len();
    let ny = y.len();
    let nz = z.len();
    if nx < 2 || ny < 2 || nz < 2 {
        return Err(Error::from("at least 2 coordinates are required along each axis"));
    }
    for c in [x, y, z] {
        if c.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::from("coordinates must be strictly increasing"));
        }
    }

    let idx = |i, j, k| i + j * nx + k * nx * ny;

    let mut verts = vec![Vert3d::zeros(); nx * ny * nz];
    for (i, &x) in x.iter().enumerate() {
        for (j, &y) in y.iter().enumerate() {
            for (k, &z) in z.iter().enumerate() {
                verts[idx(i, j, k)] = Vert3d::new(x, y, z);
            }
        }
    }

    let mut res = Grid::new(verts);
    for k in 0..nz - 1 {
        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                res.add_cell(
                    CellType::Hexahedron,
                    &[
                        idx(i, j, k),
                        idx(i + 1, j, k),
                        idx(i + 1, j + 1, k),
                        idx(i, j + 1, k),
                        idx(i, j, k + 1),
                        idx(i + 1, j, k + 1),
                        idx(i + 1, j + 1, k + 1),
                        idx(i, j + 1, k + 1),
                    ],
                )?;
            }
        }
    }

    Ok(res)
}
