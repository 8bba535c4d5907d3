pub mod aggregate;
pub mod config;
pub mod dates;
pub mod error;
pub mod io;
pub mod model;
pub mod select;
pub mod transform;

pub use error::{Result, Stage, ToolError};
