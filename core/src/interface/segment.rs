use num_complex::Complex32;

use crate::interface::gps::LigoTimeGps;
use crate::interface::template::{ChirpTemplate, TemplateParams};
use crate::prelude::{FilterError, FilterResult};

/// Conditioned frequency-domain detector data for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    pub data: Vec<Complex32>,
    pub epoch: LigoTimeGps,
    /// Channel name in `IFO:CHANNEL` form, e.g. `H1:LSC-AS_Q`.
    pub name: String,
    pub number: u32,
    pub seg_norm: f32,
    pub f_low: f32,
    /// Length of the inverse-spectrum truncation, in samples.
    pub inv_spec_trunc: u32,
    /// Frequency-bin boundaries of the chi-squared bins; empty disables the
    /// veto.
    pub chisq_bin_vec: Vec<u32>,
}

impl DataSegment {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn num_chisq_bins(&self) -> usize {
        self.chisq_bin_vec.len().saturating_sub(1)
    }

    /// Two-character interferometer prefix of the channel name.
    pub fn ifo_name(&self) -> String {
        self.name.chars().take(2).collect()
    }

    /// Channel name with the `IFO:` prefix removed.
    pub fn channel_name(&self) -> String {
        self.name.chars().skip(3).collect()
    }

    pub(crate) fn validate(&self, num_points: usize) -> FilterResult<()> {
        if self.data.len() != num_points {
            return Err(FilterError::LengthMismatch {
                what: "segment data",
                expected: num_points,
                found: self.data.len(),
            });
        }
        if !(self.seg_norm.is_finite() && self.seg_norm > 0.0) {
            return Err(FilterError::InvalidSegment(format!(
                "segment {} has normalisation {}",
                self.number, self.seg_norm
            )));
        }
        if !(self.f_low.is_finite() && self.f_low > 0.0) {
            return Err(FilterError::InvalidSegment(format!(
                "segment {} has low-frequency cutoff {}",
                self.number, self.f_low
            )));
        }
        validate_chisq_bins(&self.chisq_bin_vec, num_points)
    }
}

/// Bin boundaries must be strictly increasing positive-frequency indices.
pub(crate) fn validate_chisq_bins(bins: &[u32], num_points: usize) -> FilterResult<()> {
    match bins.len() {
        0 => return Ok(()),
        1 => {
            return Err(FilterError::InvalidChisqBins(
                "a single boundary defines no bins".into(),
            ))
        }
        _ => {}
    }
    if bins.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(FilterError::InvalidChisqBins(format!(
            "boundaries are not strictly increasing: {:?}",
            bins
        )));
    }
    let last = bins[bins.len() - 1] as usize;
    if last > num_points / 2 {
        return Err(FilterError::InvalidChisqBins(format!(
            "last boundary {} is above the Nyquist bin {}",
            last,
            num_points / 2
        )));
    }
    Ok(())
}

/// One (template, segment) pair handed to a filter call.
#[derive(Debug, Clone)]
pub struct FilterInput<'a> {
    pub tmplt: TemplateParams,
    pub fc_tmplt: ChirpTemplate,
    pub segment: &'a DataSegment,
}

impl<'a> FilterInput<'a> {
    pub fn new(tmplt: TemplateParams, fc_tmplt: ChirpTemplate, segment: &'a DataSegment) -> Self {
        Self {
            tmplt,
            fc_tmplt,
            segment,
        }
    }
}
