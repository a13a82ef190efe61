//! `ingest`: stream observations from stdin into the detector.
//!
//! Each input line is one JSON object, either a raw observation
//! (`{"focus": 80, "pace": 40}`) or a set of behavior flags
//! (`{"flags": {"deep_work": true}}`) that go through the inference rules.
//! Each recorded line produces one JSON outcome line on stdout.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use super::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::ports::SnapshotStore;
use crate::services::{AttractorDetector, PersistenceWorker};

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Ignore any persisted snapshot and start from an empty detector
    #[arg(long)]
    pub fresh: bool,

    /// Suppress per-observation output; print only the summary
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IngestLine {
    Flags { flags: HashMap<String, bool> },
    Raw(HashMap<String, f64>),
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestSummary {
    pub recorded: u64,
    pub skipped: u64,
    pub attractors_created: u64,
    pub attractor_count: usize,
    pub basin_transitions: u64,
}

impl CommandOutput for IngestSummary {
    fn to_human(&self) -> String {
        format!(
            "Recorded {} observations ({} skipped), {} new attractors, {} total, {} basin transitions",
            self.recorded,
            self.skipped,
            self.attractors_created,
            self.attractor_count,
            self.basin_transitions
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Record every line of `reader`, writing outcomes to `writer` unless `quiet`.
///
/// Blank lines are ignored; lines that do not parse are counted and skipped.
pub async fn ingest_lines<R, W>(
    detector: &AttractorDetector,
    reader: R,
    writer: &mut W,
    quiet: bool,
) -> Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = match serde_json::from_str::<IngestLine>(line) {
            Ok(IngestLine::Flags { flags }) => detector.record_flags(&flags).await,
            Ok(IngestLine::Raw(raw)) => detector.record_state(&raw).await,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping unparseable observation");
                summary.skipped += 1;
                continue;
            }
        };

        summary.recorded += 1;
        summary.attractors_created += outcome.detections.iter().filter(|d| d.created).count() as u64;

        if !quiet {
            let mut encoded = serde_json::to_vec(&outcome)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
        }
    }
    writer.flush().await?;

    let stats = detector.stats().await;
    summary.attractor_count = stats.attractor_count;
    summary.basin_transitions = stats.basin_transitions;
    Ok(summary)
}

pub async fn execute(args: IngestArgs, ctx: AppContext, json_mode: bool) -> Result<()> {
    let persistence = ctx.config.persistence.clone();
    let store: Arc<dyn SnapshotStore> = ctx.store.clone();
    let (handle, worker) = PersistenceWorker::spawn(Arc::clone(&store), persistence.clone());

    let detector = ctx.detector()?.with_persistence(handle, persistence.clone());
    if persistence.rehydrate_on_start && !args.fresh {
        detector.rehydrate(store.as_ref()).await;
    }

    let reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let summary = ingest_lines(&detector, reader, &mut stdout, args.quiet).await?;

    detector.flush().await.context("Failed to flush final snapshot")?;
    drop(detector);
    worker.await.context("Persistence worker panicked")?;

    info!(
        recorded = summary.recorded,
        skipped = summary.skipped,
        attractors = summary.attractor_count,
        "ingest finished"
    );
    if args.quiet {
        output(&summary, json_mode);
    }
    Ok(())
}
