use crate::{
    mesh::{ArrayValues, Grid},
    Result, Vert3d,
};
use base64::Engine as _;
use quick_xml::se::to_utf8_io_writer;
use serde::Serialize;
use std::{
    fmt::Display,
    io::{BufWriter, Write},
};

/// Encoding for vtk files
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VTUEncoding {
    /// Ascii
    Ascii,
    /// Binary
    Binary,
}

#[derive(Serialize)]
#[serde(rename = "VTKFile", rename_all = "PascalCase")]
/// VTU file writer
pub struct VTUFile {
    #[serde(rename = "@type")]
    grid_type: String,
    #[serde(rename = "@version")]
    version: f64,
    #[serde(rename = "@header_type")]
    header_type: String,
    #[serde(rename = "@byte_order")]
    byte_order: String,
    unstructured_grid: UnstructuredGrid,
}

impl VTUFile {
    /// Create a vtu writer for a grid and all its point and cell arrays
    #[must_use]
    pub fn from_grid(grid: &Grid, encoding: VTUEncoding) -> Self {
        let point_data = grid
            .point_data()
            .iter()
            .map(|(name, arr)| DataArray::from_values(name, arr.n_comp(), arr.values(), encoding))
            .collect();
        let cell_data = grid
            .cell_data()
            .iter()
            .map(|(name, arr)| DataArray::from_values(name, arr.n_comp(), arr.values(), encoding))
            .collect();

        Self {
            grid_type: "UnstructuredGrid".to_string(),
            version: 0.1,
            header_type: "UInt32".to_string(),
            byte_order: "LittleEndian".to_string(),
            unstructured_grid: UnstructuredGrid {
                piece: Piece {
                    number_of_points: grid.n_points(),
                    number_of_cells: grid.n_cells(),
                    points: Points::from_verts(grid.points(), encoding),
                    cells: Cells::from_grid(grid, encoding),
                    cell_data: Data {
                        data_array: cell_data,
                    },
                    point_data: Data {
                        data_array: point_data,
                    },
                },
            },
        }
    }

    /// Write the file
    pub fn export(&self, file_name: &str) -> Result<()> {
        let f = std::fs::File::create(file_name)?;
        let mut writer = BufWriter::new(f);
        writeln!(writer, "<?xml version=\"1.0\"?>")?;
        to_utf8_io_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UnstructuredGrid {
    piece: Piece,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Piece {
    #[serde(rename = "@NumberOfPoints")]
    number_of_points: usize,
    #[serde(rename = "@NumberOfCells")]
    number_of_cells: usize,
    points: Points,
    cells: Cells,
    cell_data: Data,
    point_data: Data,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Points {
    data_array: DataArray,
}

impl Points {
    fn from_verts(verts: &[Vert3d], encoding: VTUEncoding) -> Self {
        Self {
            data_array: DataArray::new(
                "Points",
                3,
                verts
                    .iter()
                    .flat_map(|x| [x[0], x[1], x[2]])
                    .collect::<Vec<_>>()
                    .into_iter(),
                encoding,
            ),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Data {
    data_array: Vec<DataArray>,
}

#[derive(Serialize)]
struct DataArray {
    #[serde(rename = "@type")]
    data_type: String,
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@format")]
    format: String,
    #[serde(rename = "@NumberOfComponents")]
    number_of_components: usize,
    #[serde(rename = "$text")]
    data: String,
}

/// Scalar types that can be written in vtu files
trait VTUScalar: Copy + Display {
    const TYPE_NAME: &'static str;
    fn le_bytes(self) -> impl IntoIterator<Item = u8>;
}

macro_rules! impl_vtu_scalar {
    ($t:ty, $name:expr) => {
        impl VTUScalar for $t {
            const TYPE_NAME: &'static str = $name;
            fn le_bytes(self) -> impl IntoIterator<Item = u8> {
                self.to_le_bytes()
            }
        }
    };
}

impl_vtu_scalar!(u8, "UInt8");
impl_vtu_scalar!(u16, "UInt16");
impl_vtu_scalar!(i32, "Int32");
impl_vtu_scalar!(i64, "Int64");
impl_vtu_scalar!(f32, "Float32");
impl_vtu_scalar!(f64, "Float64");

fn encode<T, I: Iterator<Item = u8>>(len: usize, data: I) -> String {
    let capacity = size_of::<u32>() + len * size_of::<T>();

    let mut out = Vec::with_capacity(capacity);
    let header = ((len * size_of::<T>()) as u32).to_le_bytes();
    out.extend_from_slice(&header);
    out.extend(data);
    base64::prelude::BASE64_STANDARD.encode(out)
}

impl DataArray {
    fn new<T: VTUScalar, I: ExactSizeIterator<Item = T>>(
        name: &str,
        number_of_components: usize,
        data: I,
        encoding: VTUEncoding,
    ) -> Self {
        use std::fmt::Write;
        let len = data.len();
        let (format, data) = match encoding {
            VTUEncoding::Ascii => (
                "ascii".to_string(),
                data.fold(String::new(), |mut output, b| {
                    let _ = write!(output, "{b} ");
                    output
                }),
            ),
            VTUEncoding::Binary => (
                "binary".to_string(),
                encode::<T, _>(len, data.flat_map(T::le_bytes)),
            ),
        };

        Self {
            data_type: T::TYPE_NAME.to_string(),
            name: name.to_string(),
            format,
            number_of_components,
            data,
        }
    }

    fn from_values(
        name: &str,
        number_of_components: usize,
        values: &ArrayValues,
        encoding: VTUEncoding,
    ) -> Self {
        match values {
            ArrayValues::UInt16(v) => {
                Self::new(name, number_of_components, v.iter().copied(), encoding)
            }
            ArrayValues::Int32(v) => {
                Self::new(name, number_of_components, v.iter().copied(), encoding)
            }
            ArrayValues::Float32(v) => {
                Self::new(name, number_of_components, v.iter().copied(), encoding)
            }
            ArrayValues::Float64(v) => {
                Self::new(name, number_of_components, v.iter().copied(), encoding)
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Cells {
    data_array: Vec<DataArray>,
}

impl Cells {
    fn from_grid(grid: &Grid, encoding: VTUEncoding) -> Self {
        let connectivity = DataArray::new(
            "connectivity",
            1,
            grid.connectivity().iter().map(|&i| i as i64),
            encoding,
        );
        let offsets = DataArray::new(
            "offsets",
            1,
            grid.offsets()[1..].iter().map(|&i| i as i64),
            encoding,
        );
        let types = DataArray::new(
            "types",
            1,
            grid.cell_types().iter().map(|t| t.vtk_id()),
            encoding,
        );

        Self {
            data_array: vec![connectivity, offsets, types],
        }
    }
}
