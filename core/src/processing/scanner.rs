//! Threshold scan of the filter output and clustering of crossings into
//! candidate events.

use num_complex::Complex32;

use crate::prelude::FilterResult;

/// Candidate held while its cluster is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster {
    pub id: u32,
    /// Sample index of the loudest accepted sample so far.
    pub index: usize,
    /// Unnormalised `|q|^2` at `index`.
    pub modqsq: f32,
    /// Chi-squared at `index`, `None` when the segment has no bins.
    pub chisq: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusterState {
    Idle,
    Open(Cluster),
}

/// Groups accepted samples into clusters.
///
/// With `maximise_over_chirp`, a louder sample strictly inside
/// `delta_event_index` of the current maximum moves the maximum, and a
/// sample strictly beyond that window closes the cluster and opens the next.
/// A sample landing exactly on the window edge does neither. Without it
/// every accepted sample closes the open cluster and opens its own.
pub struct EventClusterer {
    state: ClusterState,
    delta_event_index: usize,
    maximise_over_chirp: bool,
    next_id: u32,
}

impl EventClusterer {
    pub fn new(delta_event_index: usize, maximise_over_chirp: bool) -> Self {
        Self {
            state: ClusterState::Idle,
            delta_event_index,
            maximise_over_chirp,
            next_id: 0,
        }
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    /// Feeds one accepted sample; returns the cluster it closed, if any.
    pub fn observe(&mut self, index: usize, modqsq: f32, chisq: Option<f32>) -> Option<Cluster> {
        let current = match self.state {
            ClusterState::Idle => {
                self.state = ClusterState::Open(self.open(index, modqsq, chisq));
                return None;
            }
            ClusterState::Open(cluster) => cluster,
        };

        let window_end = current.index.saturating_add(self.delta_event_index);
        if self.maximise_over_chirp && index < window_end && modqsq > current.modqsq {
            self.state = ClusterState::Open(Cluster {
                index,
                modqsq,
                chisq,
                ..current
            });
            None
        } else if index > window_end || !self.maximise_over_chirp {
            self.state = ClusterState::Open(self.open(index, modqsq, chisq));
            Some(current)
        } else {
            None
        }
    }

    /// Closes the open cluster, if there is one.
    pub fn finish(&mut self) -> Option<Cluster> {
        match std::mem::replace(&mut self.state, ClusterState::Idle) {
            ClusterState::Open(cluster) => Some(cluster),
            ClusterState::Idle => None,
        }
    }

    fn open(&mut self, index: usize, modqsq: f32, chisq: Option<f32>) -> Cluster {
        let id = self.next_id;
        self.next_id += 1;
        Cluster {
            id,
            index,
            modqsq,
            chisq,
        }
    }
}

/// Chi-squared series that is only produced once a sample crosses the SNR
/// threshold.
pub trait ChisqSource {
    fn has_bins(&self) -> bool;

    /// Makes the series available; later calls are no-ops.
    fn ensure(&mut self) -> FilterResult<()>;

    /// Chi-squared at `index`; only meaningful after [`ChisqSource::ensure`].
    fn value(&self, index: usize) -> f32;
}

/// Source for segments without chi-squared bins.
pub struct NoChisq;

impl ChisqSource for NoChisq {
    fn has_bins(&self) -> bool {
        false
    }

    fn ensure(&mut self) -> FilterResult<()> {
        Ok(())
    }

    fn value(&self, _index: usize) -> f32 {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanWindow {
    /// Samples skipped at each end of the segment.
    pub ignore_index: usize,
    pub delta_event_index: usize,
    /// SNR squared threshold divided by the normalisation.
    pub modqsq_thresh: f32,
    pub chisq_thresh: f32,
    pub maximise_over_chirp: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Closed clusters in the order they were opened.
    pub clusters: Vec<Cluster>,
    /// Samples above the SNR threshold, vetoed or not.
    pub crossings: usize,
    pub chisq_computed: bool,
}

/// Walks `q` over `[ignore_index, n - ignore_index)`, applies the veto and
/// clusters the surviving samples.
pub fn scan(q: &[Complex32], window: &ScanWindow, chisq: &mut dyn ChisqSource) -> FilterResult<ScanOutcome> {
    let has_bins = chisq.has_bins();
    let mut clusterer = EventClusterer::new(window.delta_event_index, window.maximise_over_chirp);
    let mut outcome = ScanOutcome::default();

    let end = q.len().saturating_sub(window.ignore_index);
    for j in window.ignore_index..end {
        let modqsq = q[j].norm_sqr();
        if modqsq <= window.modqsq_thresh {
            continue;
        }
        outcome.crossings += 1;

        if has_bins && !outcome.chisq_computed {
            chisq.ensure()?;
            outcome.chisq_computed = true;
        }

        let chisq_value = has_bins.then(|| chisq.value(j));
        if chisq_value.map_or(true, |value| value < window.chisq_thresh) {
            if let Some(closed) = clusterer.observe(j, modqsq, chisq_value) {
                outcome.clusters.push(closed);
            }
        }
    }

    if let Some(last) = clusterer.finish() {
        outcome.clusters.push(last);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 1024;

    struct FixedChisq {
        series: Vec<f32>,
        evaluations: usize,
    }

    impl FixedChisq {
        fn constant(value: f32) -> Self {
            Self {
                series: vec![value; N],
                evaluations: 0,
            }
        }
    }

    impl ChisqSource for FixedChisq {
        fn has_bins(&self) -> bool {
            true
        }

        fn ensure(&mut self) -> FilterResult<()> {
            self.evaluations += 1;
            Ok(())
        }

        fn value(&self, index: usize) -> f32 {
            self.series[index]
        }
    }

    /// Filter output whose squared magnitude is `snrsq` at the given samples
    /// and zero elsewhere.
    fn series(bumps: &[(usize, f32)]) -> Vec<Complex32> {
        let mut q = vec![Complex32::new(0.0, 0.0); N];
        for &(index, snrsq) in bumps {
            q[index] = Complex32::new(snrsq.sqrt(), 0.0);
        }
        q
    }

    fn window(maximise_over_chirp: bool) -> ScanWindow {
        ScanWindow {
            ignore_index: 256,
            delta_event_index: 10,
            modqsq_thresh: 1.0,
            chisq_thresh: 5.0,
            maximise_over_chirp,
        }
    }

    fn peaks(outcome: &ScanOutcome) -> Vec<(usize, f32)> {
        outcome.clusters.iter().map(|c| (c.index, c.modqsq)).collect()
    }

    #[test]
    fn separated_bumps_form_two_events() {
        let q = series(&[(300, 9.0), (301, 16.0), (400, 25.0)]);
        let outcome = scan(&q, &window(true), &mut NoChisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(301, 16.0), (400, 25.0)]);
        assert_eq!(outcome.clusters[0].id, 0);
        assert_eq!(outcome.clusters[1].id, 1);
        assert_eq!(outcome.crossings, 3);
        assert!(!outcome.chisq_computed);
    }

    #[test]
    fn close_bumps_merge_at_the_louder_sample() {
        let q = series(&[(300, 9.0), (305, 36.0), (312, 4.0)]);
        let outcome = scan(&q, &window(true), &mut NoChisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(305, 36.0)]);
    }

    #[test]
    fn quieter_or_equal_samples_do_not_move_the_maximum() {
        let q = series(&[(300, 9.0), (303, 9.0), (306, 4.0)]);
        let outcome = scan(&q, &window(true), &mut NoChisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(300, 9.0)]);
    }

    #[test]
    fn sample_on_window_edge_neither_extends_nor_closes() {
        let q = series(&[(300, 9.0), (310, 49.0)]);
        let outcome = scan(&q, &window(true), &mut NoChisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(300, 9.0)]);

        let q = series(&[(300, 9.0), (311, 49.0)]);
        let outcome = scan(&q, &window(true), &mut NoChisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(300, 9.0), (311, 49.0)]);
    }

    #[test]
    fn without_maximisation_every_crossing_is_an_event() {
        let q = series(&[(300, 9.0), (301, 16.0), (302, 4.0)]);
        let outcome = scan(&q, &window(false), &mut NoChisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(300, 9.0), (301, 16.0), (302, 4.0)]);
    }

    #[test]
    fn guard_bands_are_not_scanned() {
        let q = series(&[(255, 100.0), (768, 100.0), (256, 4.0), (767, 4.0)]);
        let outcome = scan(&q, &window(false), &mut NoChisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(256, 4.0), (767, 4.0)]);
    }

    #[test]
    fn threshold_is_strict() {
        let q = series(&[(300, 1.0)]);
        let outcome = scan(&q, &window(true), &mut NoChisq).unwrap();
        assert!(outcome.clusters.is_empty());
        assert_eq!(outcome.crossings, 0);
    }

    #[test]
    fn large_chisq_everywhere_vetoes_all_events() {
        let q = series(&[(300, 100.0), (500, 100.0)]);
        let mut chisq = FixedChisq::constant(50.0);
        let outcome = scan(&q, &window(true), &mut chisq).unwrap();
        assert!(outcome.clusters.is_empty());
        assert_eq!(outcome.crossings, 2);
        assert_eq!(chisq.evaluations, 1);
    }

    #[test]
    fn chisq_is_only_requested_after_a_crossing() {
        let q = series(&[]);
        let mut chisq = FixedChisq::constant(0.0);
        let outcome = scan(&q, &window(true), &mut chisq).unwrap();
        assert!(!outcome.chisq_computed);
        assert_eq!(chisq.evaluations, 0);
    }

    #[test]
    fn vetoed_sample_does_not_move_the_maximum() {
        let q = series(&[(300, 9.0), (303, 81.0), (305, 16.0)]);
        let mut chisq = FixedChisq::constant(1.0);
        chisq.series[303] = 5.0;
        chisq.series[305] = 2.5;
        let outcome = scan(&q, &window(true), &mut chisq).unwrap();
        assert_eq!(peaks(&outcome), vec![(305, 16.0)]);
        assert_eq!(outcome.clusters[0].chisq, Some(2.5));
    }

    #[test]
    fn clusterer_finish_returns_to_idle() {
        let mut clusterer = EventClusterer::new(10, true);
        assert_eq!(clusterer.state(), ClusterState::Idle);
        assert_eq!(clusterer.observe(100, 4.0, None), None);
        assert!(matches!(clusterer.state(), ClusterState::Open(_)));
        let closed = clusterer.finish().unwrap();
        assert_eq!((closed.id, closed.index), (0, 100));
        assert_eq!(clusterer.state(), ClusterState::Idle);
        assert_eq!(clusterer.finish(), None);
    }

    #[test]
    fn unbounded_window_keeps_one_cluster() {
        let mut clusterer = EventClusterer::new(usize::MAX, true);
        assert_eq!(clusterer.observe(300, 4.0, None), None);
        assert_eq!(clusterer.observe(900, 9.0, None), None);
        let closed = clusterer.finish().unwrap();
        assert_eq!((closed.index, closed.modqsq), (900, 9.0));
    }
}
