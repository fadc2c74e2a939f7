//! Append-only JSONL run log.
//!
//! One line per event; a run writes `run_started`, one `step_*` per attempted
//! step, and `run_finished`, or `run_started` + `run_rejected` when the
//! program failed validation.

use super::hasher;
use crate::core::types::{ExecutionResult, RunEvent, TimestampedEvent};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_iso8601() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_utc(secs)
}

/// Format seconds since the Unix epoch.
fn format_utc(secs: u64) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (y, m, d) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        y,
        m,
        d,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 → (year, month, day) in the proleptic Gregorian calendar.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

/// Short unique-enough run identifier.
pub fn generate_run_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("run-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Append one event, creating the file and its directory if needed.
pub fn append_event(path: &Path, event: RunEvent) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }
    let line = serde_json::to_string(&TimestampedEvent {
        ts: now_iso8601(),
        event,
    })
    .map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;
    writeln!(file, "{}", line).map_err(|e| format!("write error: {}", e))
}

/// Read every event back. Blank lines are skipped.
pub fn read_events(path: &Path) -> Result<Vec<TimestampedEvent>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str(l)
                .map_err(|e| format!("{}:{}: invalid event: {}", path.display(), i + 1, e))
        })
        .collect()
}

/// Write the events describing one finished `execute` call. Returns the run id.
pub fn record_run(path: &Path, program: &Value, result: &ExecutionResult) -> Result<String, String> {
    let run_id = generate_run_id();
    let tasks = program
        .get("pipeline")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    append_event(
        path,
        RunEvent::RunStarted {
            run_id: run_id.clone(),
            program_hash: hasher::hash_program(program),
            tasks,
            aion_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )?;

    if result.data.is_none() {
        append_event(
            path,
            RunEvent::RunRejected {
                run_id: run_id.clone(),
                errors: result.errors.clone(),
            },
        )?;
        return Ok(run_id);
    }

    for step in &result.execution_plan {
        let event = if step.success {
            RunEvent::StepCompleted {
                run_id: run_id.clone(),
                index: step.index,
                kind: step.kind.clone(),
            }
        } else {
            RunEvent::StepFailed {
                run_id: run_id.clone(),
                index: step.index,
                kind: step.kind.clone(),
                error: step.error.clone().unwrap_or_default(),
            }
        };
        append_event(path, event)?;
    }

    append_event(
        path,
        RunEvent::RunFinished {
            run_id: run_id.clone(),
            success: result.is_success(),
            steps: result.execution_plan.len(),
            rows: result.data.as_ref().map(|t| t.row_count()),
        },
    )?;
    tracing::debug!(run_id = %run_id, path = %path.display(), "recorded run events");
    Ok(run_id)
}
