pub mod critical_point;
pub mod density;
pub mod fixed_point;
pub mod u256;

pub use critical_point::*;
pub use density::*;
pub use fixed_point::*;
pub use u256::*;
