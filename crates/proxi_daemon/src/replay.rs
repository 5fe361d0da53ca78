use anyhow::{anyhow, Context};
use proxi_core::{InferenceEngine, StreamingClassifier};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Outcome of replaying a recorded log through the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub samples: u64,
    /// Samples for which a decision was emitted (after warm-up)
    pub decisions: u64,
    pub positive_decisions: u64,
    pub edge_count: u64,
}

/// One line of the trace CSV. Cells are empty during warm-up.
#[derive(Debug, Serialize)]
struct TraceRow {
    index: u64,
    raw: f64,
    smoothed_input: f64,
    score: Option<f32>,
    decision: Option<u8>,
}

/// Replays the CSV at `input`, optionally writing a per-sample trace to `trace`.
pub fn replay_file<E: InferenceEngine>(
    input: &Path,
    column: &str,
    classifier: &mut StreamingClassifier<E>,
    trace: Option<&Path>,
) -> anyhow::Result<ReplaySummary> {
    let file =
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;

    let summary = match trace {
        Some(path) => {
            let out = File::create(path)
                .with_context(|| format!("Failed to create trace {}", path.display()))?;
            let summary = replay_reader(file, column, classifier, Some(out))?;
            info!(trace = %path.display(), "Trace written");
            summary
        }
        None => replay_reader(file, column, classifier, None::<File>)?,
    };

    info!(
        input = %input.display(),
        samples = summary.samples,
        decisions = summary.decisions,
        positive_decisions = summary.positive_decisions,
        edge_count = summary.edge_count,
        "Replay complete"
    );
    Ok(summary)
}

/// Feeds `column` of the CSV read from `input` through `classifier` in row
/// order. Any missing or unparsable value aborts the run.
pub fn replay_reader<R, W, E>(
    input: R,
    column: &str,
    classifier: &mut StreamingClassifier<E>,
    trace: Option<W>,
) -> anyhow::Result<ReplaySummary>
where
    R: Read,
    W: Write,
    E: InferenceEngine,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let idx = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| anyhow!("Column {:?} not found in CSV header", column))?;

    let mut writer = trace.map(csv::Writer::from_writer);

    let mut summary = ReplaySummary {
        samples: 0,
        decisions: 0,
        positive_decisions: 0,
        edge_count: 0,
    };

    for (row, record) in reader.records().enumerate() {
        let row = row + 1;
        let record = record.with_context(|| format!("Failed to read row {}", row))?;
        let cell = record
            .get(idx)
            .ok_or_else(|| anyhow!("Row {}: missing {:?} value", row, column))?;
        let raw: f64 = cell
            .parse()
            .with_context(|| format!("Row {}: invalid value {:?}", row, cell))?;

        let step = classifier
            .ingest(raw)
            .with_context(|| format!("Row {}: classifier failed", row))?;

        summary.samples += 1;
        if let Some(decision) = step.decision {
            summary.decisions += 1;
            if decision {
                summary.positive_decisions += 1;
            }
        }

        if let Some(w) = writer.as_mut() {
            w.serialize(TraceRow {
                index: summary.samples - 1,
                raw,
                smoothed_input: step.smoothed_input,
                score: step.score,
                decision: step.decision.map(u8::from),
            })?;
        }
    }

    if let Some(mut w) = writer {
        w.flush()?;
    }

    summary.edge_count = classifier.edge_count();
    Ok(summary)
}
