pub mod compile;
pub mod context;
pub mod error;
pub mod math;
pub mod mesh;
pub mod operations;
pub mod shared;
pub mod topology;
pub mod uv;

pub use error::{Declined, Outcome, PolyweldError, Result};
