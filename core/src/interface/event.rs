use serde::{Deserialize, Serialize};

use crate::interface::gps::LigoTimeGps;
use crate::interface::template::TemplateParams;

/// Finalised inspiral trigger emitted by the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspiralEvent {
    /// Cluster id, counting from zero within one filter call.
    pub id: u32,
    pub segment_number: u32,
    /// Sample index of the cluster maximum within the segment.
    pub time_index: usize,
    pub time: LigoTimeGps,
    /// Normalised SNR squared.
    pub snrsq: f32,
    pub chisq: f32,
    pub num_chisq_bins: u32,
    pub sigma: f32,
    pub eff_dist: f32,
    pub ifo_name: String,
    pub channel: String,
    pub tmplt: TemplateParams,
}

impl InspiralEvent {
    pub fn snr(&self) -> f32 {
        self.snrsq.sqrt()
    }
}
