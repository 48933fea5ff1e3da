pub mod curve;
pub mod market;
pub mod position;

pub use curve::*;
pub use market::*;
pub use position::*;
