//! Chirp-duration estimate and the sample windows derived from it.

use crate::interface::TemplateParams;
use crate::prelude::{FilterError, FilterResult};

/// Geometrized solar mass in seconds, `G M_sun / c^3`.
pub const MTSUN_SI: f64 = 4.925_491_025_543_576e-6;

/// Post-Newtonian estimate of the time a template spends between `f_low`
/// and coalescence, in seconds.
///
/// The mass scale is twice the lighter component, which over-estimates the
/// duration for unequal masses. Coefficients are rounded to single
/// precision one by one so the sample count derived from the duration is
/// reproducible against existing trigger sets.
pub fn chirp_time(tmplt: &TemplateParams, f_low: f32) -> f32 {
    let eta = tmplt.eta;
    let m = 2.0 * tmplt.mass1.min(tmplt.mass2);
    let pi = std::f64::consts::PI;

    let c0 = (5.0 * m as f64 * MTSUN_SI / (256.0 * eta as f64)) as f32;
    let c2 = (743.0 / 252.0 + eta as f64 * 11.0 / 3.0) as f32;
    let c3 = (-32.0 * pi / 3.0) as f32;
    let c4 = (3_058_673.0 / 508_032.0
        + eta as f64 * (5429.0 / 504.0 + eta as f64 * 617.0 / 72.0)) as f32;
    let x = (pi * m as f64 * MTSUN_SI * f_low as f64).powf(1.0 / 3.0) as f32;
    let x2 = x * x;
    let x3 = x * x2;
    let x4 = x2 * x2;
    let x8 = x4 * x4;

    c0 * (1.0 + c2 * x2 + c3 * x3 + c4 * x4) / x8
}

/// Number of samples spanned by one chirp, plus one, rounded half to even.
///
/// Saturates at `usize::MAX` when the duration is enormous compared with
/// `delta_t`; [`ignore_index`] then rejects the template.
pub fn delta_event_index(tmplt: &TemplateParams, f_low: f32, delta_t: f32) -> FilterResult<usize> {
    let duration = chirp_time(tmplt, f_low);
    if !duration.is_finite() {
        return Err(FilterError::InvalidTemplate(format!(
            "chirp duration is not finite for m1={} m2={} eta={} f_low={}",
            tmplt.mass1, tmplt.mass2, tmplt.eta, f_low
        )));
    }
    // the expansion turns negative for very heavy systems
    let duration = duration.max(0.0);
    Ok(((duration / delta_t) as f64 + 1.0).round_ties_even() as usize)
}

/// Guard band at both ends of the segment.
///
/// Fails with [`FilterError::CorruptedData`] when the chirp plus half the
/// inverse-spectrum truncation does not fit in a quarter of the segment.
/// Otherwise the band is fixed at exactly one quarter of the segment.
pub fn ignore_index(
    num_points: usize,
    inv_spec_trunc: u32,
    delta_event_index: usize,
) -> FilterResult<usize> {
    let limit = num_points / 4;
    let required = (inv_spec_trunc as usize / 2)
        .checked_add(delta_event_index)
        .unwrap_or(usize::MAX);
    if required > limit {
        return Err(FilterError::CorruptedData {
            ignore_index: required,
            limit,
        });
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heavy_binary_from_100hz_is_short() {
        let tmplt = TemplateParams::from_masses(10.0, 10.0);
        let duration = chirp_time(&tmplt, 100.0);
        assert!((duration - 0.035_36).abs() < 1e-4, "duration {duration}");
        assert_eq!(delta_event_index(&tmplt, 100.0, 1.0 / 256.0).unwrap(), 10);
    }

    #[test]
    fn neutron_star_binary_from_40hz_lasts_tens_of_seconds() {
        let tmplt = TemplateParams::from_masses(1.4, 1.4);
        let duration = chirp_time(&tmplt, 40.0);
        assert!((duration - 24.85).abs() < 0.05, "duration {duration}");
    }

    #[test]
    fn zero_cutoff_is_an_invalid_template() {
        let tmplt = TemplateParams::from_masses(1.4, 1.4);
        assert!(matches!(
            delta_event_index(&tmplt, 0.0, 1.0 / 4096.0),
            Err(FilterError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn very_heavy_binary_clamps_to_one_sample() {
        let tmplt = TemplateParams::from_masses(100.0, 100.0);
        assert!(chirp_time(&tmplt, 40.0) < 0.0);
        assert_eq!(delta_event_index(&tmplt, 40.0, 1.0 / 4096.0).unwrap(), 1);
    }

    #[test]
    fn guard_band_is_a_quarter_segment() {
        assert_eq!(ignore_index(1024, 0, 10).unwrap(), 256);
        assert_eq!(ignore_index(1024, 64, 224).unwrap(), 256);
        assert_eq!(
            ignore_index(1024, 64, 225),
            Err(FilterError::CorruptedData {
                ignore_index: 257,
                limit: 256
            })
        );
    }

    #[test]
    fn saturated_chirp_length_is_corrupted_data() {
        let tmplt = TemplateParams::from_masses(10.0, 10.0);
        let delta = delta_event_index(&tmplt, 100.0, 1e-21).unwrap();
        assert_eq!(delta, usize::MAX);
        assert_eq!(
            ignore_index(1024, 64, delta),
            Err(FilterError::CorruptedData {
                ignore_index: usize::MAX,
                limit: 256
            })
        );
    }
}
