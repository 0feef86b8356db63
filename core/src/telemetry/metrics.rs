use std::sync::Mutex;

/// Counters shared by every workspace filtering on behalf of one search.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub segments_filtered: usize,
    pub segments_skipped: usize,
    pub events: usize,
    pub chisq_evaluations: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_segment(&self, events: usize, chisq_computed: bool) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.segments_filtered += 1;
            metrics.events += events;
            if chisq_computed {
                metrics.chisq_evaluations += 1;
            }
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.segments_skipped += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_segments_from_several_threads() {
        let metrics = Arc::new(MetricsRecorder::new());
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let metrics = Arc::clone(&metrics);
                scope.spawn(move || {
                    metrics.record_segment(2, true);
                    metrics.record_skipped();
                });
            }
        });

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                segments_filtered: 4,
                segments_skipped: 4,
                events: 8,
                chisq_evaluations: 4,
            }
        );
    }
}
