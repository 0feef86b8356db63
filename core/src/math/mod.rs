pub mod chirp;
pub mod fft;

pub use fft::{InverseFftPlan, InverseTransform};
