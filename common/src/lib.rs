pub mod buffer2;
pub mod float_ext;
pub mod log_setup;
pub mod parallel;

pub use buffer2::Buffer2;
pub use float_ext::FloatExt;

/// Default tolerance used by [`FloatExt::approximately_eq`].
pub const EPSILON: f64 = 1e-6;
