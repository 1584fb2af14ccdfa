//! Environment values module.
//!
//! This module holds the recursive value tree that backs templating contexts
//! and the override-aware merge used to layer environment files.

mod environment;
mod value;

pub use environment::{DEFAULT_ENVIRONMENT, Environment};
pub use value::{Scalar, Value, ValueError, ValueMap};
