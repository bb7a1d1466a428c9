use femora::{
    assembly::{Progress, SectionParams},
    mask::{NodeMask, StartTags},
    mesh::CellType,
    mesh_part::{Element, Region},
    model::Model,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;

fn model() -> Model {
    let mut model = Model::new();
    model
        .parts_mut()
        .create_mesh_part(
            "soil",
            "GeometricRectangularGrid",
            &json!({
                "x_min": 0.0, "y_min": 0.0, "z_min": -3.0,
                "x_max": 6.0, "y_max": 2.0, "z_max": 0.0,
                "nx": 6, "ny": 2, "nz": 3, "z_ratio": 1.5
            }),
            Element::new(1, "stdBrick", 3).with_material(2),
            Region { tag: 1 },
        )
        .unwrap();
    model
        .parts_mut()
        .create_mesh_part(
            "column",
            "CustomRectangularGrid",
            &json!({"x": [2.0, 3.0], "y": [0.0, 1.0], "z": [0.0, 1.0, 2.0]}),
            Element::new(2, "stdBrick", 6).with_material(3),
            Region::default(),
        )
        .unwrap();
    let mut progress = Progress::none();
    model
        .create_section(&SectionParams::new(&["soil"], 4), &mut progress)
        .unwrap();
    model
        .create_section(&SectionParams::new(&["column"], 1), &mut progress)
        .unwrap();
    model.assemble(true, &mut progress).unwrap();
    model
}

fn random_box(rng: &mut StdRng) -> ([f64; 3], [f64; 3]) {
    let mut a = [0.0; 3];
    let mut b = [0.0; 3];
    for j in 0..3 {
        let u = -3.0 + 9.0 * rng.random::<f64>();
        let v = -3.0 + 9.0 * rng.random::<f64>();
        a[j] = u.min(v);
        b[j] = u.max(v);
    }
    (a, b)
}

#[test]
fn empty_selection() {
    let model = model();
    let m = model.nodes().unwrap().by_ids(&[]);
    assert_eq!(m.len(), 0);
    assert!(m.is_empty());
    assert!(m.to_tags(None).is_empty());
    assert!(m.touching_elements().is_empty());
}

#[test]
fn bbox_matches_coordinates() {
    let model = model();
    let all = model.nodes().unwrap();
    let coords = all.mesh().node_coords().to_vec();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let (a, b) = random_box(&mut rng);
        let expected = coords
            .iter()
            .enumerate()
            .filter(|(_, p)| (0..3).all(|j| p[j] >= a[j] && p[j] <= b[j]))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        assert_eq!(all.by_bbox(a, b).to_list(), expected);
    }
}

#[test]
fn filters_are_pure() {
    let model = model();
    let nodes = model.nodes().unwrap();
    let elems = model.elements().unwrap();
    let n_nodes = nodes.to_list();
    let n_elems = elems.to_list();
    let mut rng = StdRng::seed_from_u64(8);

    for _ in 0..10 {
        let (a, b) = random_box(&mut rng);
        let r = 2.0 * rng.random::<f64>();
        let f = |m: &NodeMask| {
            vec![
                m.by_bbox(a, b).to_list(),
                m.near_point(a, r).to_list(),
                m.along_line(a, b, r).to_list(),
                m.along_axis("y", a[1], b[1]).unwrap().to_list(),
                m.by_core(2).to_list(),
            ]
        };
        assert_eq!(f(&nodes), f(&nodes));
        assert_eq!(nodes.to_list(), n_nodes);

        let g = || {
            vec![
                elems.by_bbox(a, b, true).to_list(),
                elems.by_bbox(a, b, false).to_list(),
                elems.by_material(3).to_list(),
                elems.by_type(CellType::Hexahedron).to_list(),
            ]
        };
        assert_eq!(g(), g());
        assert_eq!(elems.to_list(), n_elems);
    }
}

#[test]
fn degenerate_segment() {
    let model = model();
    let all = model.nodes().unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..20 {
        let (p, _) = random_box(&mut rng);
        let r = 3.0 * rng.random::<f64>();
        assert_eq!(all.along_line(p, p, r).to_list(), all.near_point(p, r).to_list());
    }
}

#[test]
fn attributes_and_tags() {
    let mut model = model();
    let elems = model.elements().unwrap();
    assert_eq!(elems.len(), 36 + 2);
    assert_eq!(elems.by_material(2).len(), 36);
    assert_eq!(elems.by_region(1).len(), 36);
    assert_eq!(elems.by_material(3).by_core(4).len(), 2);
    assert_eq!(elems.by_section(0).len(), 38);

    // the column stands on the soil: its base is shared
    let column = elems.by_material(3).to_nodes();
    assert_eq!(column.len(), 12);
    let base = column.along_axis("z", 0.0, 0.0).unwrap();
    assert_eq!(base.len(), 4);
    // 6 soil cells of the top layer and the bottom column cell
    assert_eq!(base.touching_elements().len(), 6 + 1);

    let soil = elems.by_material(2).to_nodes();
    assert_eq!(soil.intersection(&column).unwrap().to_list(), base.to_list());

    let first = elems.by_ids(&[0]).to_tags(None);
    assert_eq!(first, [1]);
    model.set_start_tags(StartTags {
        node: 0,
        element: 100,
    });
    let elems = model.elements().unwrap();
    assert_eq!(elems.by_ids(&[0]).to_tags(None), [100]);
    // masks of different snapshots cannot be combined
    assert!(model.nodes().unwrap().union(&soil).is_err());
}
