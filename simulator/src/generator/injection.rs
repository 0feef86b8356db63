use anyhow::{ensure, Context};
use chirpcore::interface::{ChirpTemplate, DataSegment, LigoTimeGps, TemplateParams};
use chirpcore::math::chirp::MTSUN_SI;
use chirpcore::processing::compute_chisq_bins;
use num_complex::Complex32;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for generating whitened segments with an injected chirp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub num_points: usize,
    pub num_segments: usize,
    pub sample_rate: f32,
    pub mass1: f32,
    pub mass2: f32,
    pub f_low: f32,
    /// Optimal SNR of the injection; zero produces pure noise.
    pub injection_snr: f32,
    /// Sample at which the injected chirp coalesces in every segment.
    pub injection_index: usize,
    /// Standard deviation of each quadrature of the whitened noise.
    pub noise_sigma: f32,
    pub inv_spec_trunc: u32,
    pub seed: u64,
    pub gps_start: LigoTimeGps,
    pub channel: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_points: 65_536,
            num_segments: 4,
            sample_rate: 4096.0,
            mass1: 10.0,
            mass2: 10.0,
            f_low: 40.0,
            injection_snr: 12.0,
            injection_index: 32_768,
            noise_sigma: 1.0,
            inv_spec_trunc: 0,
            seed: 0,
            gps_start: LigoTimeGps::new(1_000_000_000, 0),
            channel: "H1:LSC-STRAIN".into(),
        }
    }
}

impl GeneratorConfig {
    pub fn delta_t(&self) -> f32 {
        1.0 / self.sample_rate
    }
}

/// Template and data segments ready to be filtered.
#[derive(Debug, Clone)]
pub struct SyntheticSearch {
    pub tmplt: TemplateParams,
    pub fc_tmplt: ChirpTemplate,
    pub segments: Vec<DataSegment>,
}

/// Stationary-phase chirp with `f^-7/6` amplitude between `f_low` and the
/// innermost stable circular orbit, coalescing at sample zero.
pub fn stationary_phase_template(config: &GeneratorConfig, tmplt: &TemplateParams) -> ChirpTemplate {
    let n = config.num_points;
    let delta_f = config.sample_rate as f64 / n as f64;
    let total_mass_sec = tmplt.total_mass as f64 * MTSUN_SI;
    let f_isco = 1.0 / (6f64.powf(1.5) * PI * total_mass_sec);
    let eta = tmplt.eta as f64;

    let mut data = vec![Complex32::new(0.0, 0.0); n];
    for (k, value) in data.iter_mut().enumerate().take(n / 2).skip(1) {
        let f = k as f64 * delta_f;
        if f < config.f_low as f64 || f > f_isco {
            continue;
        }
        let amplitude = f.powf(-7.0 / 6.0);
        let psi = -PI / 4.0 + 3.0 / (128.0 * eta) * (PI * total_mass_sec * f).powf(-5.0 / 3.0);
        *value = Complex32::from_polar(amplitude as f32, -(psi.rem_euclid(2.0 * PI)) as f32);
    }
    ChirpTemplate::new(data, 1.0)
}

/// Builds whitened Gaussian-noise segments, each carrying the template
/// delayed to `injection_index`, and the normalisation that makes the
/// mean noise SNR squared equal two.
pub fn build_search(config: &GeneratorConfig) -> anyhow::Result<SyntheticSearch> {
    ensure!(config.num_points >= 4, "segments need at least 4 points");
    ensure!(config.sample_rate > 0.0, "sample rate must be positive");
    ensure!(
        config.injection_index < config.num_points,
        "injection index {} lies outside a {}-point segment",
        config.injection_index,
        config.num_points
    );

    let tmplt = TemplateParams::from_masses(config.mass1, config.mass2);
    let fc_tmplt = stationary_phase_template(config, &tmplt);
    let tmplt_power: f64 = fc_tmplt.power().iter().map(|&p| p as f64).sum();
    ensure!(
        tmplt_power > 0.0,
        "template has no power between {} Hz and ISCO",
        config.f_low
    );

    let n = config.num_points;
    let sigma = config.noise_sigma as f64;
    let normal = Normal::new(0.0, config.noise_sigma).context("building noise distribution")?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    // mean noise |q|^2 is 2 sigma^2 P for template power P
    let norm = 1.0 / (sigma * sigma * tmplt_power);
    let seg_norm = (4.0 * config.delta_t() as f64 / (n as f64 * norm)) as f32;
    let amplitude = (config.injection_snr as f64 * sigma / tmplt_power.sqrt()) as f32;
    let segment_ns = (n as f64 * config.delta_t() as f64 * 1e9).round() as i64;

    let mut segments = Vec::with_capacity(config.num_segments);
    for number in 0..config.num_segments {
        let epoch = config
            .gps_start
            .checked_add_ns(segment_ns * number as i64)
            .context("segment epoch overflows GPS time")?;

        let mut data = vec![Complex32::new(0.0, 0.0); n];
        for (k, value) in data.iter_mut().enumerate().take(n / 2).skip(1) {
            let noise = Complex32::new(normal.sample(&mut rng), normal.sample(&mut rng));
            let phase = -2.0 * PI * ((k * config.injection_index) % n) as f64 / n as f64;
            let delay = Complex32::from_polar(1.0, phase as f32);
            *value = noise + fc_tmplt.data[k] * delay * amplitude;
        }

        segments.push(DataSegment {
            data,
            epoch,
            name: config.channel.clone(),
            number: number as u32,
            seg_norm,
            f_low: config.f_low,
            inv_spec_trunc: config.inv_spec_trunc,
            chisq_bin_vec: Vec::new(),
        });
    }

    Ok(SyntheticSearch {
        tmplt,
        fc_tmplt,
        segments,
    })
}

impl SyntheticSearch {
    /// Attaches equal-power chi-squared bins below Nyquist to every segment.
    pub fn with_chisq_bins(mut self, num_bins: usize) -> anyhow::Result<Self> {
        if num_bins == 0 {
            return Ok(self);
        }
        let kmax = self.fc_tmplt.len() / 2;
        let bins = compute_chisq_bins(&self.fc_tmplt.power(), num_bins, kmax)
            .context("placing chi-squared bins")?;
        for segment in &mut self.segments {
            segment.chisq_bin_vec = bins.clone();
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            num_points: 4096,
            num_segments: 3,
            sample_rate: 1024.0,
            f_low: 60.0,
            injection_index: 2048,
            seed: 7,
            ..Default::default()
        }
    }

    #[test]
    fn builds_contiguous_segments() {
        let search = build_search(&small_config()).unwrap();
        assert_eq!(search.segments.len(), 3);
        assert!(search.segments.iter().all(|s| s.len() == 4096));
        // 4096 samples at 1024 Hz = 4 s per segment
        assert_eq!(search.segments[2].epoch, LigoTimeGps::new(1_000_000_008, 0));
        assert_eq!(search.segments[1].number, 1);
    }

    #[test]
    fn template_is_band_limited() {
        let config = small_config();
        let tmplt = TemplateParams::from_masses(config.mass1, config.mass2);
        let fc_tmplt = stationary_phase_template(&config, &tmplt);
        // 60 Hz is bin 240 at 0.25 Hz resolution
        assert!(fc_tmplt.data[..240].iter().all(|c| c.norm_sqr() == 0.0));
        assert!(fc_tmplt.data[240].norm_sqr() > 0.0);
        assert!(fc_tmplt.data[2048..].iter().all(|c| c.norm_sqr() == 0.0));
    }

    #[test]
    fn noise_is_reproducible_from_seed() {
        let first = build_search(&small_config()).unwrap();
        let second = build_search(&small_config()).unwrap();
        assert_eq!(first.segments, second.segments);

        let other = build_search(&GeneratorConfig {
            seed: 8,
            ..small_config()
        })
        .unwrap();
        assert_ne!(first.segments[0].data, other.segments[0].data);
    }

    #[test]
    fn chisq_bins_are_shared_by_all_segments() {
        let search = build_search(&small_config()).unwrap().with_chisq_bins(8).unwrap();
        let bins = &search.segments[0].chisq_bin_vec;
        assert_eq!(bins.len(), 9);
        assert_eq!(bins[8], 2048);
        assert!(search.segments.iter().all(|s| &s.chisq_bin_vec == bins));
    }

    #[test]
    fn injection_outside_segment_is_rejected() {
        let config = GeneratorConfig {
            injection_index: 4096,
            ..small_config()
        };
        assert!(build_search(&config).is_err());
    }
}
