use num_complex::Complex32;

use crate::interface::{FilterInput, InspiralEvent};
use crate::math::chirp;
use crate::math::fft::{InverseFftPlan, InverseTransform};
use crate::prelude::{FilterConfig, FilterError, FilterInitParams, FilterResult};
use crate::processing::chisq::ChisqVeto;
use crate::processing::correlator::correlate;
use crate::processing::finalizer::EventFinalizer;
use crate::processing::scanner::{scan, ChisqSource, ScanOutcome, ScanWindow};
use crate::processing::workspace::{alloc_complex, alloc_real};
use crate::telemetry::log::LogManager;

/// Per-call workspace of the matched filter.
///
/// Every buffer has the segment length fixed at construction. A workspace
/// is mutated by each call, so concurrent filtering needs one workspace per
/// thread; the [`FilterInput`] itself can be shared.
pub struct FilterParams {
    config: FilterConfig,
    num_points: usize,
    norm: f32,
    chisq_computed: bool,
    inv_plan: Box<dyn InverseTransform>,
    qtilde_vec: Vec<Complex32>,
    q_vec: Vec<Complex32>,
    chisq_vec: Vec<f32>,
    rhosq_vec: Option<Vec<f32>>,
    chisq_veto: Option<ChisqVeto>,
    logger: LogManager,
}

impl FilterParams {
    pub fn new(init: &FilterInitParams, config: FilterConfig) -> FilterResult<Self> {
        if init.num_points == 0 {
            return Err(FilterError::ZeroPoints);
        }
        let plan = InverseFftPlan::new(init.num_points)?;
        Self::with_plan(init, config, Box::new(plan))
    }

    /// Builds the workspace around a caller-supplied inverse transform,
    /// which must match `init.num_points`.
    pub fn with_plan(
        init: &FilterInitParams,
        config: FilterConfig,
        inv_plan: Box<dyn InverseTransform>,
    ) -> FilterResult<Self> {
        let num_points = init.num_points;
        if num_points == 0 {
            return Err(FilterError::ZeroPoints);
        }
        config.validate()?;
        if inv_plan.len() != num_points {
            return Err(FilterError::PlanSizeMismatch {
                plan: inv_plan.len(),
                buffer: num_points,
            });
        }

        let q_vec = alloc_complex(num_points, "qVec")?;
        let qtilde_vec = alloc_complex(num_points, "qtildeVec")?;
        let chisq_vec = alloc_real(num_points, "chisqVec")?;
        let rhosq_vec = if init.create_rhosq_vec {
            Some(alloc_real(num_points, "rhosqVec")?)
        } else {
            None
        };
        let chisq_veto = if init.num_chisq_bins > 0 {
            Some(ChisqVeto::new(init.num_chisq_bins, num_points)?)
        } else {
            None
        };

        Ok(Self {
            config,
            num_points,
            norm: 0.0,
            chisq_computed: false,
            inv_plan,
            qtilde_vec,
            q_vec,
            chisq_vec,
            rhosq_vec,
            chisq_veto,
            logger: LogManager::new(),
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: FilterConfig) -> FilterResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// SNR normalisation `4 dt / (n segNorm)` of the last call.
    pub fn norm(&self) -> f32 {
        self.norm
    }

    /// Whether the last call had to compute the chi-squared veto.
    pub fn chisq_computed(&self) -> bool {
        self.chisq_computed
    }

    /// Complex filter output of the last call.
    pub fn q_vec(&self) -> &[Complex32] {
        &self.q_vec
    }

    pub fn qtilde_vec(&self) -> &[Complex32] {
        &self.qtilde_vec
    }

    /// Chi-squared series of the last call; all zero unless a sample
    /// crossed threshold in a segment with bins.
    pub fn chisq_vec(&self) -> &[f32] {
        &self.chisq_vec
    }

    /// Normalised SNR squared for every sample of the last call, when the
    /// workspace was created with `create_rhosq_vec`.
    pub fn rhosq_vec(&self) -> Option<&[f32]> {
        self.rhosq_vec.as_deref()
    }

    /// Filters one segment with one template and returns its events in
    /// time order.
    ///
    /// Fails with [`FilterError::CorruptedData`] when the template is too
    /// long for the segment's guard band; that error only concerns this
    /// (segment, template) pair.
    pub fn filter_segment(&mut self, input: &FilterInput<'_>) -> FilterResult<Vec<InspiralEvent>> {
        self.config.validate()?;
        let num_points = self.num_points;
        let segment = input.segment;
        segment.validate(num_points)?;

        if input.fc_tmplt.len() != num_points {
            return Err(FilterError::LengthMismatch {
                what: "template data",
                expected: num_points,
                found: input.fc_tmplt.len(),
            });
        }
        let tmplt_norm = input.fc_tmplt.tmplt_norm;
        if !(tmplt_norm.is_finite() && tmplt_norm > 0.0) {
            return Err(FilterError::InvalidTemplate(format!(
                "template {} has normalisation {}",
                input.tmplt.number, tmplt_norm
            )));
        }

        let num_chisq_bins = segment.num_chisq_bins();
        let workspace_bins = self.chisq_veto.as_ref().map_or(0, ChisqVeto::num_bins);
        if num_chisq_bins > 0 && num_chisq_bins != workspace_bins {
            return Err(FilterError::ChisqBinMismatch {
                segment: num_chisq_bins,
                workspace: workspace_bins,
            });
        }

        let delta_t = self.config.delta_t;
        let delta_event_index = chirp::delta_event_index(&input.tmplt, segment.f_low, delta_t)?;
        let ignore_index = chirp::ignore_index(num_points, segment.inv_spec_trunc, delta_event_index)?;
        self.logger.detail(&format!(
            "segment {} template {}: deltaEventIndex {}, filtering [{}, {})",
            segment.number,
            input.tmplt.number,
            delta_event_index,
            ignore_index,
            num_points - ignore_index
        ));

        correlate(
            &mut self.qtilde_vec,
            &segment.data,
            &input.fc_tmplt.data,
            self.config.compute_neg_freq,
        )?;
        self.inv_plan.execute(&self.qtilde_vec, &mut self.q_vec)?;

        let norm = 4.0 * (delta_t / num_points as f32) / segment.seg_norm;
        self.norm = norm;

        if let Some(rhosq) = self.rhosq_vec.as_mut() {
            for (value, q) in rhosq.iter_mut().zip(&self.q_vec) {
                *value = norm * q.norm_sqr();
            }
        }

        let window = ScanWindow {
            ignore_index,
            delta_event_index,
            modqsq_thresh: self.config.rhosq_thresh / norm,
            chisq_thresh: self.config.chisq_thresh,
            maximise_over_chirp: self.config.maximise_over_chirp,
        };

        self.chisq_vec.fill(0.0);
        let mut chisq = LazyChisq {
            veto: self.chisq_veto.as_mut(),
            chisq: &mut self.chisq_vec,
            qtilde: &self.qtilde_vec,
            q: &self.q_vec,
            bins: &segment.chisq_bin_vec,
            chisq_norm: norm.sqrt(),
            computed: false,
        };
        let ScanOutcome {
            clusters,
            crossings,
            chisq_computed,
        } = scan(&self.q_vec, &window, &mut chisq)?;
        self.chisq_computed = chisq_computed;

        let finalizer = EventFinalizer::new(input, norm, delta_t);
        let events = clusters
            .iter()
            .map(|cluster| finalizer.finalize(cluster))
            .collect::<FilterResult<Vec<_>>>()?;

        self.logger.record(&format!(
            "segment {} template {}: {} crossings, {} events, chisq {}",
            segment.number,
            input.tmplt.number,
            crossings,
            events.len(),
            if chisq_computed { "computed" } else { "skipped" }
        ));

        Ok(events)
    }
}

/// Chi-squared computed into the workspace on first demand.
struct LazyChisq<'w> {
    veto: Option<&'w mut ChisqVeto>,
    chisq: &'w mut [f32],
    qtilde: &'w [Complex32],
    q: &'w [Complex32],
    bins: &'w [u32],
    chisq_norm: f32,
    computed: bool,
}

impl ChisqSource for LazyChisq<'_> {
    fn has_bins(&self) -> bool {
        !self.bins.is_empty()
    }

    fn ensure(&mut self) -> FilterResult<()> {
        if self.computed {
            return Ok(());
        }
        let veto = self
            .veto
            .as_mut()
            .ok_or_else(|| FilterError::Internal("chisq veto workspace missing".into()))?;
        veto.compute(self.chisq, self.qtilde, self.q, self.bins, self.chisq_norm)?;
        self.computed = true;
        Ok(())
    }

    fn value(&self, index: usize) -> f32 {
        self.chisq[index]
    }
}
