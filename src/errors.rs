//! Centralized error handling for ocean_post
//!
//! Every fallible operation in the crate returns [`Result`], carrying an
//! [`OceanPostError`] with enough context to tell which variable, dimension or
//! grid axis caused the failure.

use std::fmt;

/// Main error type for ocean_post operations
#[derive(Debug)]
pub enum OceanPostError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Configuration file could not be parsed
    ConfigError(serde_json::Error),

    /// Variable not found in a dataset
    VariableNotFound { var: String },

    /// Dimension not found in variable
    DimensionNotFound { var: String, dim: String },

    /// Operands or inputs disagree on their dimensions
    DimensionMismatch { message: String },

    /// Invalid grid construction or grid operation
    GridError(String),

    /// Velocity positions match neither a B nor a C grid
    GridTypeNotRecognized { u: String, v: String },

    /// Grid positions that the vorticity operators cannot handle
    UnsupportedPosition(String),

    /// Bad user-supplied option
    InvalidArgument(String),

    /// Time axis could not be decoded
    TimeDecodeError(String),

    /// Plot rendering failed
    PlotError(String),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Generic error
    Generic(String),
}

impl fmt::Display for OceanPostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OceanPostError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            OceanPostError::IoError(e) => write!(f, "I/O error: {}", e),
            OceanPostError::ArrayError(e) => write!(f, "Array error: {}", e),
            OceanPostError::ConfigError(e) => write!(f, "Configuration error: {}", e),
            OceanPostError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in dataset", var)
            }
            OceanPostError::DimensionNotFound { var, dim } => {
                write!(f, "Dimension '{}' not found in variable '{}'", dim, var)
            }
            OceanPostError::DimensionMismatch { message } => {
                write!(f, "Dimension mismatch: {}", message)
            }
            OceanPostError::GridError(msg) => write!(f, "Grid error: {}", msg),
            OceanPostError::GridTypeNotRecognized { u, v } => write!(
                f,
                "Gridtype not recognized. Velocity positions are u: {}, v: {}",
                u, v
            ),
            OceanPostError::UnsupportedPosition(msg) => {
                write!(f, "Unsupported grid position: {}", msg)
            }
            OceanPostError::InvalidArgument(msg) => write!(f, "{}", msg),
            OceanPostError::TimeDecodeError(msg) => write!(f, "Time decoding error: {}", msg),
            OceanPostError::PlotError(msg) => write!(f, "Plotting error: {}", msg),
            OceanPostError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            OceanPostError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for OceanPostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OceanPostError::NetCDFError(e) => Some(e),
            OceanPostError::IoError(e) => Some(e),
            OceanPostError::ArrayError(e) => Some(e),
            OceanPostError::ConfigError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for OceanPostError {
    fn from(error: netcdf::Error) -> Self {
        OceanPostError::NetCDFError(error)
    }
}

impl From<std::io::Error> for OceanPostError {
    fn from(error: std::io::Error) -> Self {
        OceanPostError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for OceanPostError {
    fn from(error: ndarray::ShapeError) -> Self {
        OceanPostError::ArrayError(error)
    }
}

impl From<serde_json::Error> for OceanPostError {
    fn from(error: serde_json::Error) -> Self {
        OceanPostError::ConfigError(error)
    }
}

impl From<String> for OceanPostError {
    fn from(error: String) -> Self {
        OceanPostError::Generic(error)
    }
}

impl From<&str> for OceanPostError {
    fn from(error: &str) -> Self {
        OceanPostError::Generic(error.to_string())
    }
}

impl OceanPostError {
    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        OceanPostError::DimensionMismatch {
            message: message.into(),
        }
    }

    /// Attach a variable name to errors raised below the named-array level
    pub(crate) fn for_var(self, name: &str) -> Self {
        match self {
            OceanPostError::DimensionNotFound { dim, .. } => OceanPostError::DimensionNotFound {
                var: name.to_string(),
                dim,
            },
            other => other,
        }
    }
}

/// Result type alias for ocean_post operations
pub type Result<T> = std::result::Result<T, OceanPostError>;
