pub mod chisq;
pub mod correlator;
pub mod filter;
pub mod finalizer;
pub mod scanner;
pub mod workspace;

pub use chisq::{compute_chisq_bins, ChisqVeto};
pub use filter::FilterParams;
pub use scanner::{Cluster, ClusterState, EventClusterer};
