//! `inspect`: print the persisted detector state.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::AppContext;
use crate::cli::output::{format_point, output, CommandOutput};
use crate::domain::models::{Attractor, AttractorMetadata, Bounds, DetectorSnapshot};
use crate::domain::ports::SnapshotStore;
use crate::services::{AttractorDetector, DetectorStats};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Include the most recent N trajectory entries
    #[arg(short, long, default_value = "0")]
    pub trajectory: usize,
}

#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub snapshot_found: bool,
    pub taken_at: Option<String>,
    pub dimensions: Vec<String>,
    pub stats: DetectorStats,
    pub attractors: Vec<Attractor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trajectory: Vec<Vec<f64>>,
}

impl CommandOutput for InspectOutput {
    fn to_human(&self) -> String {
        if !self.snapshot_found {
            return "No snapshot persisted yet.".to_string();
        }

        let mut lines = vec!["Detector state:".to_string()];
        if let Some(ref taken_at) = self.taken_at {
            lines.push(format!("  Snapshot taken:   {taken_at}"));
        }
        lines.push(format!("  Dimensions:       {}", self.dimensions.join(", ")));
        lines.push(format!("  Observations:     {}", self.stats.total_observations));
        lines.push(format!("  Trajectory:       {}", self.stats.trajectory_len));
        lines.push(format!("  Basin switches:   {}", self.stats.basin_transitions));
        lines.push(format!(
            "  Current basin:    {}",
            self.stats
                .current_basin
                .map_or_else(|| "none".to_string(), |id| id.to_string())
        ));

        lines.push(format!("Attractors ({}):", self.attractors.len()));
        for a in &self.attractors {
            let extra = match &a.metadata {
                AttractorMetadata::LimitCycle { period, .. } => format!(" period={period}"),
                AttractorMetadata::StrangeAttractor { bounds } => {
                    let spread: Vec<f64> = bounds.iter().map(Bounds::range).collect();
                    format!(" spread={}", format_point(&spread))
                }
                AttractorMetadata::None => String::new(),
            };
            lines.push(format!(
                "  {:<14} {:<17} strength={:.3} seen={} center={}{}",
                a.id.to_string(),
                a.kind.as_str(),
                a.strength,
                a.observation_count,
                format_point(&a.center),
                extra
            ));
        }

        for state in &self.trajectory {
            lines.push(format!("  {}", format_point(state)));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Rebuild a detector from `snapshot` and describe it.
pub async fn describe(
    detector: &AttractorDetector,
    snapshot: Option<DetectorSnapshot>,
    trajectory: usize,
) -> Result<InspectOutput> {
    let taken_at = snapshot.as_ref().map(|s| s.taken_at.to_rfc3339());
    let snapshot_found = snapshot.is_some();
    if let Some(snapshot) = snapshot {
        detector
            .restore(snapshot)
            .await
            .context("Persisted snapshot does not match the current configuration")?;
    }

    Ok(InspectOutput {
        snapshot_found,
        taken_at,
        dimensions: detector.dimensions().names().to_vec(),
        stats: detector.stats().await,
        attractors: detector.attractors().await,
        trajectory: detector
            .trajectory(trajectory)
            .await
            .into_iter()
            .map(|s| s.values)
            .collect(),
    })
}

pub async fn execute(args: InspectArgs, ctx: AppContext, json_mode: bool) -> Result<()> {
    let snapshot = ctx
        .store
        .load()
        .await
        .context("Failed to load snapshot")?;
    let detector = ctx.detector()?;

    let out = describe(&detector, snapshot, args.trajectory).await?;
    output(&out, json_mode);
    Ok(())
}
