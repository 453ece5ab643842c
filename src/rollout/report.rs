//! Per-checkpoint reports and where they go

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::RolloutOutcome;
use crate::error::Result;

/// Why a checkpoint ended without executing its plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    PlanningFailed(String),
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointReport {
    pub checkpoint: String,
    /// Label from the epoch extractor
    pub epoch: String,
    pub planner: String,
    pub instruction: String,
    pub plan: Vec<String>,
    pub outcomes: Vec<RolloutOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CheckpointReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Every planned action was attempted and succeeded
    pub fn is_success(&self) -> bool {
        self.skipped.is_none() && !self.outcomes.is_empty() && self.succeeded() == self.attempted()
    }
}

/// Destination for checkpoint reports
pub trait ReportSink {
    fn report(&mut self, report: &CheckpointReport) -> Result<()>;
}

/// Human-readable summary on stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ReportSink for ConsoleReporter {
    fn report(&mut self, report: &CheckpointReport) -> Result<()> {
        println!();
        println!(
            "\x1b[1mCheckpoint {}\x1b[0m (epoch {}, planner {})",
            report.checkpoint, report.epoch, report.planner
        );
        println!("  Instruction: {}", report.instruction);

        match &report.skipped {
            Some(SkipReason::PlanningFailed(reason)) => {
                println!("  \x1b[31mPlanning failed: {}\x1b[0m", reason);
                println!("  Actions: 0 attempted");
                return Ok(());
            }
            Some(SkipReason::Declined) => {
                println!("  Plan: [{}]", report.plan.join(", "));
                println!("  \x1b[33mPlan not executed (declined)\x1b[0m");
                return Ok(());
            }
            None => {}
        }

        println!("  Plan: [{}]", report.plan.join(", "));
        for outcome in &report.outcomes {
            if outcome.success {
                println!("    \x1b[32m✓\x1b[0m {}", outcome.action);
            } else if let Some(fault) = &outcome.fault {
                println!("    \x1b[31m✗\x1b[0m {} ({})", outcome.action, fault);
            } else {
                println!("    \x1b[31m✗\x1b[0m {}", outcome.action);
            }
        }
        println!(
            "  Succeeded: {}/{}",
            report.succeeded(),
            report.attempted()
        );
        Ok(())
    }
}

/// One JSON object per line in `<dir>/rollouts.jsonl`
pub struct JsonlReporter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlReporter {
    pub const FILE_NAME: &'static str = "rollouts.jsonl";

    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::FILE_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Writing rollout records to {:?}", path);
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonlReporter {
    fn report(&mut self, report: &CheckpointReport) -> Result<()> {
        let line = serde_json::to_string(report)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        debug!("Appended record for {} to {:?}", report.checkpoint, self.path);
        Ok(())
    }
}

/// All reports of one run
#[derive(Debug, Default, Clone)]
pub struct EvaluationSummary {
    pub reports: Vec<CheckpointReport>,
}

impl EvaluationSummary {
    pub fn push(&mut self, report: CheckpointReport) {
        self.reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn successful_checkpoints(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    /// Fixed-width table, one row per checkpoint
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<40} {:>6} {:>8} {:>10}  {}\n",
            "CHECKPOINT", "EPOCH", "PLANNED", "SUCCEEDED", "STATUS"
        ));
        for r in &self.reports {
            let status = match &r.skipped {
                Some(SkipReason::PlanningFailed(_)) => "planning failed",
                Some(SkipReason::Declined) => "declined",
                None if r.is_success() => "ok",
                None => "failed",
            };
            out.push_str(&format!(
                "{:<40} {:>6} {:>8} {:>10}  {}\n",
                shorten(&r.checkpoint, 40),
                r.epoch,
                r.plan.len(),
                r.succeeded(),
                status
            ));
        }
        out.push_str(&format!(
            "{} of {} checkpoints completed every action\n",
            self.successful_checkpoints(),
            self.len()
        ));
        out
    }
}

/// Keep the tail of long paths
fn shorten(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}
