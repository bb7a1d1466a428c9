use super::{CellType, Grid};
use crate::{Error, Result};

/// Local indices of the 5 tetrahedra a hexahedron is split into. All have a
/// positive volume for a hexahedron with positive volume in VTK ordering
pub const HEX_TO_TETS: [[usize; 4]; 5] = [
    [0, 1, 2, 5],
    [0, 2, 3, 7],
    [0, 5, 2, 7],
    [0, 4, 5, 7],
    [2, 5, 6, 7],
];

/// Convert a hex into 5 tetrahedra
#[must_use]
pub fn hex2tets(hex: &[usize]) -> [[usize; 4]; 5] {
    HEX_TO_TETS.map(|t| t.map(|i| hex[i]))
}

/// Split the hexahedra flagged in `split` into tetrahedra. Other cells are
/// copied unchanged. The points and point arrays are not modified, and the
/// cell arrays of the children are copied from their parent.
///
/// Returns the new grid and the index of the parent of every cell
pub fn tetrahedralize(grid: &Grid, split: &[bool]) -> Result<(Grid, Vec<usize>)> {
    if split.len() != grid.n_cells() {
        return Err(Error::from(&format!(
            "{} flags for {} cells",
            split.len(),
            grid.n_cells()
        )));
    }

    let mut res = Grid::new(grid.points().to_vec());
    let mut parents = Vec::with_capacity(grid.n_cells());
    let mut n_hexas = 0;
    for (i_cell, (c, &flg)) in grid.cells().zip(split).enumerate() {
        let ct = grid.cell_type(i_cell);
        if flg && ct == CellType::Hexahedron {
            for tet in hex2tets(c) {
                res.add_cell(CellType::Tetra, &tet)?;
                parents.push(i_cell);
            }
            n_hexas += 1;
        } else {
            res.add_cell(ct, c)?;
            parents.push(i_cell);
        }
    }

    if res.n_cells() != grid.n_cells() + 4 * n_hexas || res.n_points() != grid.n_points() {
        return Err(Error::geometry(&format!(
            "tetrahedralization of {n_hexas} hexahedra: {} cells / {} points, expected {} / {}",
            res.n_cells(),
            res.n_points(),
            grid.n_cells() + 4 * n_hexas,
            grid.n_points()
        )));
    }

    for (name, arr) in grid.point_data() {
        res.set_point_array(name, arr.clone())?;
    }
    for (name, arr) in grid.cell_data() {
        res.set_cell_array(name, arr.select(&parents))?;
    }

    Ok((res, parents))
}

#[cfg(test)]
mod tests {
    use super::{hex2tets, tetrahedralize};
    use crate::{
        assert_delta,
        mesh::{box_grid, simplices::tet_vol, CellType, DataArray},
        Vert3d,
    };

    #[test]
    fn test_hex2tets_volume() {
        let g = box_grid(&[0., 1., 3.], &[0., 2.], &[-1., 0.5]).unwrap();
        for i in 0..g.n_cells() {
            let hex = g.cell(i);
            let mut vol = 0.0;
            for tet in hex2tets(hex) {
                let v: [Vert3d; 4] = tet.map(|j| g.point(j));
                let v = tet_vol(&v);
                assert!(v > 0.0);
                vol += v;
            }
            let (mini, maxi) = g.extract_cells(&[i]).grid.bounding_box().unwrap();
            let d = maxi - mini;
            assert_delta!(vol, d[0] * d[1] * d[2], 1e-12);
        }
    }

    #[test]
    fn test_tetrahedralize() {
        let mut g = box_grid(&[0., 1., 2., 3.], &[0., 1.], &[0., 1.]).unwrap();
        g.add_cell(CellType::Line, &[0, 1]).unwrap();
        g.set_cell_array("tag", DataArray::from_u16(vec![1, 2, 3, 4]))
            .unwrap();
        g.set_point_array("p", DataArray::zeros_f32(g.n_points(), 2))
            .unwrap();

        // the line flag is ignored, only hexahedra are split
        let split = [true, false, true, true];
        let (t, parents) = tetrahedralize(&g, &split).unwrap();
        assert_eq!(t.n_cells(), g.n_cells() + 4 * 2);
        assert_eq!(t.n_points(), g.n_points());
        assert_eq!(parents.len(), t.n_cells());
        assert_eq!(&parents[..6], [0, 0, 0, 0, 0, 1]);
        assert_eq!(
            t.cell_array("tag").unwrap().as_u16().unwrap(),
            [1, 1, 1, 1, 1, 2, 3, 3, 3, 3, 3, 4]
        );
        assert_eq!(t.cell_type(5), CellType::Hexahedron);
        assert_eq!(t.cell_type(11), CellType::Line);
        assert!(t.point_array("p").is_some());

        assert!(tetrahedralize(&g, &[true]).is_err());
    }
}
