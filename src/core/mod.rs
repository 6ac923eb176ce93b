//! Archive client - Core constants, errors, and pluggable traits.
//!
//! This module has no transport dependencies; everything else in the crate
//! builds on the types defined here.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
