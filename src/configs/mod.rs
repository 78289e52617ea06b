pub mod base;
pub mod culling;
pub mod logging;

pub use base::*;
pub use culling::*;
pub use logging::*;
