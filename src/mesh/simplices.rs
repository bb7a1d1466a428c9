//! Geometric quantities on simplices and polygonal faces
use crate::Vert3d;
use nalgebra::{SMatrix, SVector};

/// Signed volume of a tetrahedron, positive if `(v1 - v0, v2 - v0, v3 - v0)`
/// is direct
#[must_use]
pub fn tet_vol(v: &[Vert3d; 4]) -> f64 {
    let e1 = v[1] - v[0];
    let e2 = v[2] - v[0];
    let e3 = v[3] - v[0];

    e3.dot(&e1.cross(&e2)) / 6.0
}

/// Scalar jacobian of the affine map from the reference tetrahedron
#[must_use]
pub fn tet_jacobian(v: &[Vert3d; 4]) -> f64 {
    6.0 * tet_vol(v)
}

/// Barycentric coordinates of `p` in a tetrahedron, `None` if the tetrahedron
/// is degenerate
#[must_use]
pub fn tet_bcoords(ge: &[Vert3d; 4], p: &Vert3d) -> Option<[f64; 4]> {
    let a = SMatrix::<f64, 4, 4>::new(
        1.0, 1.0, 1.0, 1.0, ge[0][0], ge[1][0], ge[2][0], ge[3][0], ge[0][1], ge[1][1],
        ge[2][1], ge[3][1], ge[0][2], ge[1][2], ge[2][2], ge[3][2],
    );
    let b = SVector::<f64, 4>::new(1., p[0], p[1], p[2]);
    let x = a.lu().solve(&b)?;
    Some([x[0], x[1], x[2], x[3]])
}

/// Area weighted normal of a planar polygon (the norm is the area). Computed
/// as a fan of triangles from the first vertex
#[must_use]
pub fn polygon_normal(v: &[Vert3d]) -> Vert3d {
    let mut n = Vert3d::zeros();
    for i in 1..v.len().saturating_sub(1) {
        n += (v[i] - v[0]).cross(&(v[i + 1] - v[0]));
    }
    0.5 * n
}
