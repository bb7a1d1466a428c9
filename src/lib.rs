//! Assembly, partitioning and post-assembly querying of finite element models
//! built from independently meshed parts
use core::fmt;
use env_logger::Env;
use nalgebra::SVector;

pub mod assembly;
pub mod embedded;
pub mod events;
pub mod graph;
pub mod io;
pub mod mask;
pub mod mesh;
pub mod mesh_part;
pub mod model;
pub mod spatialindex;

/// Result
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration or invalid state (bad parameter, nothing assembled, ...)
    Value,
    /// Missing entry in a registry
    Key,
    /// Geometric integrity failure (unmatched points, inverted elements, ...)
    Geometry,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value error"),
            Self::Key => write!(f, "key error"),
            Self::Geometry => write!(f, "geometry error"),
        }
    }
}

/// Error
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Set the error message (invalid value or state)
    #[must_use]
    pub fn from(msg: &str) -> Box<Self> {
        Box::new(Self {
            kind: ErrorKind::Value,
            msg: msg.into(),
        })
    }

    /// Missing registry entry
    #[must_use]
    pub fn key(msg: &str) -> Box<Self> {
        Box::new(Self {
            kind: ErrorKind::Key,
            msg: msg.into(),
        })
    }

    /// Geometric integrity failure
    #[must_use]
    pub fn geometry(msg: &str) -> Box<Self> {
        Box::new(Self {
            kind: ErrorKind::Geometry,
            msg: msg.into(),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// Get the kind of an error returned by this crate, if it is one
#[must_use]
pub fn error_kind(err: &(dyn std::error::Error + 'static)) -> Option<ErrorKind> {
    err.downcast_ref::<Error>().map(Error::kind)
}

/// Vertex in 3D
pub type Vert3d = SVector<f64, 3>;

/// Maximum number of degrees of freedom per node, i.e. the width of the `Mass` point array
pub const FEMORA_MAX_NDF: usize = 9;

/// Tolerance used to merge coincident points when assembling
pub const MERGE_TOL: f64 = 1e-5;

/// Convert a tag or count to the `u16` storage used by the grid arrays
pub fn to_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| -> Box<dyn std::error::Error> {
        Error::from(&format!(
            "{what} = {value} does not fit in the uint16 grid arrays"
        ))
    })
}

/// Initialize the logger with a default level that can be overriden by `RUST_LOG`
pub fn init_log(level: &str) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Assert that two floating point values are closer than a tolerance
#[macro_export]
macro_rules! assert_delta {
    ($x:expr, $y:expr, $d:expr) => {
        assert!(
            ($x - $y).abs() < $d,
            "({:.3e} - {:.3e}).abs() = {:.3e}",
            $x,
            $y,
            ($x - $y).abs()
        )
    };
}
