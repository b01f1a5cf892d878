pub mod buffer3;

pub use buffer3::Buffer3;

pub const EPSILON: f64 = 1e-6;
