pub mod culling;

pub use culling::{IdleCuller, cull_cycle};
