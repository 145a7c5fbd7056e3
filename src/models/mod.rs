pub mod common;
pub mod edit;

pub use common::*;
pub use edit::*;
