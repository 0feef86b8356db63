use crate::interface::{DataSegment, FilterInput, InspiralEvent, TemplateParams};
use crate::prelude::{FilterError, FilterResult};
use crate::processing::scanner::Cluster;

/// Converts closed clusters into events in physical units.
pub struct EventFinalizer<'a> {
    segment: &'a DataSegment,
    tmplt: &'a TemplateParams,
    tmplt_norm: f32,
    norm: f32,
    delta_t: f32,
}

impl<'a> EventFinalizer<'a> {
    pub fn new(input: &'a FilterInput<'_>, norm: f32, delta_t: f32) -> Self {
        Self {
            segment: input.segment,
            tmplt: &input.tmplt,
            tmplt_norm: input.fc_tmplt.tmplt_norm,
            norm,
            delta_t,
        }
    }

    pub fn finalize(&self, cluster: &Cluster) -> FilterResult<InspiralEvent> {
        let offset_ns = (1e9 * cluster.index as f64 * self.delta_t as f64) as i64;
        let time = self
            .segment
            .epoch
            .checked_add_ns(offset_ns)
            .ok_or_else(|| {
                FilterError::Internal(format!(
                    "event at sample {} overflows the GPS epoch {}",
                    cluster.index, self.segment.epoch
                ))
            })?;

        let (chisq, num_chisq_bins) = match cluster.chisq {
            Some(value) => (value, self.segment.num_chisq_bins() as u32),
            None => (0.0, 0),
        };

        let norm = self.norm as f64;
        let modqsq = cluster.modqsq as f64;
        let seg_norm_sq = (self.segment.seg_norm as f64).powi(2);
        let tmplt_norm = self.tmplt_norm as f64;

        Ok(InspiralEvent {
            id: cluster.id,
            segment_number: self.segment.number,
            time_index: cluster.index,
            time,
            snrsq: (modqsq * norm) as f32,
            chisq,
            num_chisq_bins,
            sigma: (norm * seg_norm_sq * tmplt_norm).sqrt() as f32,
            eff_dist: (tmplt_norm * seg_norm_sq / modqsq).sqrt() as f32,
            ifo_name: self.segment.ifo_name(),
            channel: self.segment.channel_name(),
            tmplt: self.tmplt.clone(),
        })
    }
}
