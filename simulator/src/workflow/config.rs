use crate::generator::injection::GeneratorConfig;
use anyhow::Context;
use chirpcore::{FilterConfig, FilterInitParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub filter: FilterConfig,
    pub generator: GeneratorConfig,
    pub num_chisq_bins: usize,
    pub create_rhosq_vec: bool,
    /// Threads filtering segments concurrently, each with its own workspace.
    /// Zero lets rayon pick one per core.
    pub workers: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            generator: GeneratorConfig::default(),
            num_chisq_bins: 8,
            create_rhosq_vec: false,
            workers: 1,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(num_points: usize, sample_rate: f32, num_chisq_bins: usize) -> Self {
        Self {
            generator: GeneratorConfig {
                num_points,
                sample_rate,
                injection_index: num_points / 2,
                ..Default::default()
            },
            num_chisq_bins,
            ..Default::default()
        }
    }

    /// Filter parameters with the sample spacing taken from the generator.
    pub fn to_filter_config(&self) -> FilterConfig {
        FilterConfig {
            delta_t: self.generator.delta_t(),
            ..self.filter.clone()
        }
    }

    pub fn to_init_params(&self) -> FilterInitParams {
        FilterInitParams {
            num_points: self.generator.num_points,
            num_chisq_bins: self.num_chisq_bins,
            create_rhosq_vec: self.create_rhosq_vec,
        }
    }
}
