use serde::{Deserialize, Serialize};

pub use crate::interface::{ChirpTemplate, DataSegment, FilterInput, InspiralEvent, TemplateParams};
pub use crate::math::fft::{InverseFftPlan, InverseTransform};
pub use crate::processing::filter::FilterParams;

/// Sizes the filter workspace when it is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterInitParams {
    pub num_points: usize,
    #[serde(default)]
    pub num_chisq_bins: usize,
    #[serde(default)]
    pub create_rhosq_vec: bool,
}

/// Numeric parameters consumed by every filter call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Sample spacing of the time-domain data in seconds.
    pub delta_t: f32,
    /// Threshold on the normalised SNR squared.
    pub rhosq_thresh: f32,
    /// Samples whose chi-squared is at or above this value never form events.
    pub chisq_thresh: f32,
    pub compute_neg_freq: bool,
    pub maximise_over_chirp: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            delta_t: 1.0 / 4096.0,
            rhosq_thresh: 64.0,
            chisq_thresh: 5.0,
            compute_neg_freq: false,
            maximise_over_chirp: true,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> FilterResult<()> {
        if !(self.delta_t.is_finite() && self.delta_t > 0.0) {
            return Err(FilterError::InvalidDeltaT(self.delta_t));
        }
        if !(self.rhosq_thresh.is_finite() && self.rhosq_thresh > 0.0) {
            return Err(FilterError::InvalidRhosqThresh(self.rhosq_thresh));
        }
        if !(self.chisq_thresh.is_finite() && self.chisq_thresh > 0.0) {
            return Err(FilterError::InvalidChisqThresh(self.chisq_thresh));
        }
        Ok(())
    }
}

/// Common error type for workspace construction and filtering.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("number of points is zero")]
    ZeroPoints,
    #[error("sample spacing must be positive, got {0}")]
    InvalidDeltaT(f32),
    #[error("SNR squared threshold must be positive, got {0}")]
    InvalidRhosqThresh(f32),
    #[error("chi-squared threshold must be positive, got {0}")]
    InvalidChisqThresh(f32),
    #[error("{what} has length {found}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("inverse FFT plan has length {plan}, buffers have length {buffer}")]
    PlanSizeMismatch { plan: usize, buffer: usize },
    #[error("invalid segment: {0}")]
    InvalidSegment(String),
    #[error("invalid template: {0}")]
    InvalidTemplate(String),
    #[error("invalid chi-squared bins: {0}")]
    InvalidChisqBins(String),
    #[error("segment defines {segment} chi-squared bins, workspace was built for {workspace}")]
    ChisqBinMismatch { segment: usize, workspace: usize },
    #[error("corrupted data would be filtered: ignore index {ignore_index} exceeds {limit}")]
    CorruptedData { ignore_index: usize, limit: usize },
    #[error("memory allocation failed for {0}")]
    Allocation(&'static str),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl FilterError {
    /// True when only the current (segment, template) pair is unusable and
    /// the caller may carry on with the next one.
    pub fn is_segment_local(&self) -> bool {
        matches!(self, FilterError::CorruptedData { .. })
    }
}

pub type FilterResult<T> = Result<T, FilterError>;
