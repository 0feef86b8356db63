use num_complex::Complex32;
use rustfft::num_traits::Zero;

use crate::prelude::{FilterError, FilterResult};

/// Writes `qtilde[k] = data[k] * conj(tmplt[k])` over the positive
/// frequencies `[1, n/2)`, and over `[n/2 + 2, n - 1)` when
/// `compute_neg_freq` is set. Every other bin, DC and Nyquist included,
/// is zero.
pub fn correlate(
    qtilde: &mut [Complex32],
    data: &[Complex32],
    tmplt: &[Complex32],
    compute_neg_freq: bool,
) -> FilterResult<()> {
    let num_points = qtilde.len();
    for (what, found) in [("segment data", data.len()), ("template data", tmplt.len())] {
        if found != num_points {
            return Err(FilterError::LengthMismatch {
                what,
                expected: num_points,
                found,
            });
        }
    }

    qtilde.fill(Complex32::zero());

    let half = num_points / 2;
    for k in 1..half {
        qtilde[k] = data[k] * tmplt[k].conj();
    }

    if compute_neg_freq {
        for k in (half + 2)..num_points.saturating_sub(1) {
            qtilde[k] = data[k] * tmplt[k].conj();
        }
    }

    Ok(())
}
