use anyhow::Context;
use chirpcore::interface::LigoTimeGps;
use clap::Parser;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic-injection driver for the inspiral matched filter")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 65_536)]
    num_points: usize,
    #[arg(long, default_value_t = 4096.0)]
    sample_rate: f32,
    #[arg(long, default_value_t = 8)]
    chisq_bins: usize,
    #[arg(long)]
    segments: Option<usize>,
    #[arg(long)]
    mass1: Option<f32>,
    #[arg(long)]
    mass2: Option<f32>,
    #[arg(long)]
    f_low: Option<f32>,
    /// Optimal SNR of the injected chirp
    #[arg(long)]
    snr: Option<f32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Epoch of the first segment, e.g. 1000000000.25
    #[arg(long)]
    gps_start: Option<LigoTimeGps>,
    #[arg(long)]
    rhosq_thresh: Option<f32>,
    #[arg(long)]
    chisq_thresh: Option<f32>,
    #[arg(long)]
    workers: Option<usize>,
    /// Write the events as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn workflow_config(&self) -> anyhow::Result<WorkflowConfig> {
        let mut config = match &self.workflow {
            Some(path) => WorkflowConfig::load(path)?,
            None => WorkflowConfig::from_args(self.num_points, self.sample_rate, self.chisq_bins),
        };

        let generator = &mut config.generator;
        if let Some(segments) = self.segments {
            generator.num_segments = segments;
        }
        if let Some(mass1) = self.mass1 {
            generator.mass1 = mass1;
        }
        if let Some(mass2) = self.mass2 {
            generator.mass2 = mass2;
        }
        if let Some(f_low) = self.f_low {
            generator.f_low = f_low;
        }
        if let Some(snr) = self.snr {
            generator.injection_snr = snr;
        }
        if let Some(seed) = self.seed {
            generator.seed = seed;
        }
        if let Some(gps_start) = self.gps_start {
            generator.gps_start = gps_start;
        }
        if let Some(rhosq_thresh) = self.rhosq_thresh {
            config.filter.rhosq_thresh = rhosq_thresh;
        }
        if let Some(chisq_thresh) = self.chisq_thresh {
            config.filter.chisq_thresh = chisq_thresh;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let workflow_config = args.workflow_config()?;

    let runner = Runner::new(workflow_config);
    let result = runner.execute()?;

    println!(
        "Run -> segments {}, skipped {:?}, events {}, chisq evaluations {}",
        result.metrics.segments_filtered,
        result.skipped_segments,
        result.events.len(),
        result.metrics.chisq_evaluations
    );
    for event in &result.events {
        println!(
            "  segment {} event {} at {} ({}) snr {:.2} chisq {:.2}/{} eff_dist {:.3e}",
            event.segment_number,
            event.id,
            event.time,
            event.ifo_name,
            event.snr(),
            event.chisq,
            event.num_chisq_bins,
            event.eff_dist
        );
    }

    if let Some(path) = args.output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)
            .with_context(|| format!("creating event file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &result.events)
            .with_context(|| format!("writing events to {}", path.display()))?;
    }

    Ok(())
}
