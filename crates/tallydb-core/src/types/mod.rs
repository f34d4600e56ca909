//! Scalar newtypes shared by the value domain.

mod float64;

pub use float64::Float64;
