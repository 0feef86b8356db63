//! Frequency-binned chi-squared veto.
//!
//! The correlation spectrum is split into `p` frequency bands, each band is
//! transformed back to the time domain on its own, and at every sample the
//! per-band contributions are compared with the `1/p` share a template-like
//! signal would put into each band.

use ndarray::Array2;
use num_complex::Complex32;
use rustfft::num_traits::Zero;

use crate::interface::segment::validate_chisq_bins;
use crate::math::fft::{InverseFftPlan, InverseTransform};
use crate::prelude::{FilterError, FilterResult};
use crate::processing::workspace::alloc_complex;

/// Workspace for the chi-squared veto: one inverse plan, the band-limited
/// spectrum buffer and one time series per bin.
pub struct ChisqVeto {
    plan: InverseFftPlan,
    qtilde_bin: Vec<Complex32>,
    q_bins: Array2<Complex32>,
}

impl ChisqVeto {
    pub fn new(num_chisq_bins: usize, num_points: usize) -> FilterResult<Self> {
        if num_points == 0 {
            return Err(FilterError::ZeroPoints);
        }
        if num_chisq_bins == 0 {
            return Err(FilterError::InvalidChisqBins(
                "veto workspace needs at least one bin".into(),
            ));
        }

        let plan = InverseFftPlan::new(num_points)?;
        let qtilde_bin = alloc_complex(num_points, "chisq band buffer")?;
        let total = num_chisq_bins
            .checked_mul(num_points)
            .ok_or(FilterError::Allocation("chisq bin series"))?;
        let storage = alloc_complex(total, "chisq bin series")?;
        let q_bins = Array2::from_shape_vec((num_chisq_bins, num_points), storage)
            .map_err(|err| FilterError::Internal(format!("chisq bin series shape: {err}")))?;

        Ok(Self {
            plan,
            qtilde_bin,
            q_bins,
        })
    }

    pub fn num_bins(&self) -> usize {
        self.q_bins.nrows()
    }

    pub fn num_points(&self) -> usize {
        self.q_bins.ncols()
    }

    /// Fills `chisq` with the veto statistic for every sample.
    ///
    /// `qtilde` is the full correlation spectrum, `q` its inverse transform,
    /// `bins` the `p + 1` band boundaries and `chisq_norm` the square root of
    /// the SNR normalisation.
    pub fn compute(
        &mut self,
        chisq: &mut [f32],
        qtilde: &[Complex32],
        q: &[Complex32],
        bins: &[u32],
        chisq_norm: f32,
    ) -> FilterResult<()> {
        let num_points = self.num_points();
        for (what, found) in [
            ("chisq vector", chisq.len()),
            ("qtilde vector", qtilde.len()),
            ("q vector", q.len()),
        ] {
            if found != num_points {
                return Err(FilterError::LengthMismatch {
                    what,
                    expected: num_points,
                    found,
                });
            }
        }
        validate_chisq_bins(bins, num_points)?;
        let num_bins = bins.len().saturating_sub(1);
        if num_bins != self.num_bins() {
            return Err(FilterError::ChisqBinMismatch {
                segment: num_bins,
                workspace: self.num_bins(),
            });
        }

        for (l, band) in bins.windows(2).enumerate() {
            let (lo, hi) = (band[0] as usize, band[1] as usize);
            self.qtilde_bin.fill(Complex32::zero());
            self.qtilde_bin[lo..hi].copy_from_slice(&qtilde[lo..hi]);

            let mut row = self.q_bins.row_mut(l);
            let q_bin = row
                .as_slice_mut()
                .ok_or_else(|| FilterError::Internal("chisq bin series is not contiguous".into()))?;
            self.plan.execute(&self.qtilde_bin, q_bin)?;
        }

        let p = num_bins as f32;
        for (j, value) in chisq.iter_mut().enumerate() {
            let expected = q[j] / p;
            let sum: f32 = self
                .q_bins
                .column(j)
                .iter()
                .map(|q_bin| ((*q_bin - expected) * chisq_norm).norm_sqr())
                .sum();
            *value = p * sum;
        }

        Ok(())
    }
}

/// Places `num_bins + 1` boundaries in `[0, kmax]` so that every bin carries
/// an equal share of the template power below `kmax`.
pub fn compute_chisq_bins(tmplt_power: &[f32], num_bins: usize, kmax: usize) -> FilterResult<Vec<u32>> {
    if num_bins == 0 {
        return Err(FilterError::InvalidChisqBins("number of bins is zero".into()));
    }
    if kmax > tmplt_power.len() || kmax <= num_bins {
        return Err(FilterError::InvalidChisqBins(format!(
            "kmax {} cannot hold {} bins in a spectrum of {} points",
            kmax,
            num_bins,
            tmplt_power.len()
        )));
    }

    let total: f64 = tmplt_power[..kmax].iter().map(|&p| p as f64).sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(FilterError::InvalidChisqBins(format!(
            "template power below kmax is {total}"
        )));
    }

    let increment = total / num_bins as f64;
    let mut next = increment;
    let mut cumulative = 0.0;
    let mut bins = Vec::with_capacity(num_bins + 1);
    bins.push(0u32);

    for (k, &power) in tmplt_power[..kmax].iter().enumerate() {
        if bins.len() == num_bins {
            break;
        }
        cumulative += power as f64;
        if cumulative >= next && k + 1 < kmax {
            bins.push((k + 1) as u32);
            while next <= cumulative {
                next += increment;
            }
        }
    }

    if bins.len() < num_bins {
        return Err(FilterError::InvalidChisqBins(format!(
            "template power is too concentrated to fill {} bins",
            num_bins
        )));
    }
    bins.push(kmax as u32);
    Ok(bins)
}
