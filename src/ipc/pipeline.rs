//! Frame pump: newline-delimited detection JSON in, predictions out.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::{
    io::{self, BufRead, Write},
    sync::mpsc::Sender,
    thread,
};

use super::server::SessionEvent;
use crate::landmarks::Detection;
use crate::recorder::{Prediction, SignRecorder};

/// One input line. `record: true` presses the record trigger before the
/// frame is processed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameLine {
    #[serde(default)]
    pub record: bool,
    #[serde(flatten)]
    pub detection: Detection,
}

/// `None` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<FrameLine>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

pub fn prediction_json(frame: u64, p: &Prediction) -> serde_json::Value {
    serde_json::json!({
        "frame": frame,
        "label": p.label,
        "is_recording": p.is_recording,
    })
}

/// Read detections from stdin on a background thread until EOF.
pub fn spawn_stdin_pump(tx: Sender<SessionEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for (lineno, line) in stdin.lock().lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    break;
                }
            };
            match parse_line(&line) {
                Ok(Some(frame)) => {
                    if tx.send(SessionEvent::Frame(frame)).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("skipping input line {}: {e}", lineno + 1),
            }
        }
        debug!("stdin closed");
        let _ = tx.send(SessionEvent::InputClosed);
    })
}

/// Run a recorded session through `recorder`, writing one line per label or
/// recording-state change. Returns every per-frame prediction.
pub fn replay<R: BufRead, W: Write>(
    reader: R,
    recorder: &mut SignRecorder,
    mut out: W,
) -> Result<Vec<Prediction>> {
    let mut predictions = Vec::new();
    let mut last: Option<Prediction> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(frame) = parse_line(&line).with_context(|| format!("line {}", lineno + 1))? else {
            continue;
        };
        if frame.record {
            recorder.start_recording();
        }
        let p = recorder
            .process(&frame.detection)
            .with_context(|| format!("line {}", lineno + 1))?;

        if last.as_ref() != Some(&p) {
            writeln!(out, "{}", prediction_json(predictions.len() as u64, &p))?;
            last = Some(p.clone());
        }
        predictions.push(p);
    }
    Ok(predictions)
}
