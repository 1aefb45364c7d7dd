pub mod interpolate;
pub mod physics;
pub mod smooth;
pub mod stats;


pub use interpolate::*;
pub use physics::*;
pub use smooth::*;
pub use stats::*;
