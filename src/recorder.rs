//! Recording/prediction state machine.
//!
//! Frames are pumped through [`SignRecorder::process`] one at a time. After
//! [`SignRecorder::start_recording`] the next `seq_len` frames are captured;
//! the frame that fills the window triggers a ranking pass against the
//! reference library and ends the recording on that same call. The label
//! reported for every frame comes from a majority vote over the best matches
//! of the latest ranking.

use log::{debug, info};
use std::collections::HashMap;

use crate::error::SignError;
use crate::landmarks::{self, Detection, FrameLandmarks};
use crate::library::{self, Ranking, ReferenceLibrary};
use crate::sign::SignModel;

pub const NOT_RECOGNISED: &str = "Sign Not Recognised!";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecorderSettings {
    /// Frames per recording window.
    pub seq_len: usize,
    /// Number of best matches that vote on the label.
    pub batch_size: usize,
    /// Minimum share of the vote the winning label needs.
    pub threshold: f64,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            seq_len: 30,
            batch_size: 5,
            threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub label: String,
    pub is_recording: bool,
}

pub struct SignRecorder {
    settings: RecorderSettings,
    library: ReferenceLibrary,
    is_recording: bool,
    recorded_results: Vec<FrameLandmarks>,
    ranking: Option<Ranking>,
}

impl SignRecorder {
    pub fn new(library: ReferenceLibrary, settings: RecorderSettings) -> Self {
        Self {
            recorded_results: Vec::with_capacity(settings.seq_len),
            settings,
            library,
            is_recording: false,
            ranking: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn settings(&self) -> RecorderSettings {
        self.settings
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    #[cfg(test)]
    pub(crate) fn ranking(&self) -> Option<&Ranking> {
        self.ranking.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn captured_frames(&self) -> usize {
        self.recorded_results.len()
    }

    /// Forget the previous result and start capturing a new window.
    pub fn start_recording(&mut self) {
        self.ranking = None;
        self.recorded_results.clear();
        self.is_recording = true;
        info!("recording started ({} frames)", self.settings.seq_len);
    }

    /// Feed one frame. Returns the current label (blank until a ranking with
    /// a non-zero distance exists) and whether a window is being captured.
    pub fn process(&mut self, det: &Detection) -> Result<Prediction, SignError> {
        let frame = landmarks::extract_landmarks(det)?;
        if self.is_recording {
            if self.recorded_results.len() < self.settings.seq_len {
                self.recorded_results.push(frame);
            }
            if self.recorded_results.len() >= self.settings.seq_len {
                self.compute_distances()?;
            }
        }

        let label = match &self.ranking {
            Some(r) if !r.all_zero() => majority_vote(r, self.settings.batch_size, self.settings.threshold),
            _ => String::new(),
        };
        Ok(Prediction {
            label,
            is_recording: self.is_recording,
        })
    }

    fn compute_distances(&mut self) -> Result<(), SignError> {
        let (left, right): (Vec<_>, Vec<_>) = self.recorded_results.iter().map(|f| (f.left, f.right)).unzip();
        self.recorded_results.clear();
        self.is_recording = false;

        let recorded = SignModel::new(&left, &right)?;
        let ranking = library::rank(&recorded, &self.library);

        info!(
            "recording finished: left={} right={}, ranked {} references",
            recorded.has_left_hand(),
            recorded.has_right_hand(),
            ranking.entries().len()
        );
        for e in ranking.entries().iter().take(5).filter(|e| e.distance.is_finite()) {
            debug!("  {:<16} {:<24} {:.3}", e.name, e.video_name, e.distance);
        }

        self.ranking = Some(ranking);
        Ok(())
    }
}

/// Label that dominates the `batch_size` best finite matches.
///
/// Counts are divided by `batch_size` even when fewer matches are available.
/// On a tie for the highest count the label seen first in the ranking wins.
pub fn majority_vote(ranking: &Ranking, batch_size: usize, threshold: f64) -> String {
    let top = ranking
        .entries()
        .iter()
        .take(batch_size)
        .filter(|e| e.distance.is_finite());

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for e in top {
        let n = counts.entry(e.name.as_str()).or_insert(0);
        if *n == 0 {
            order.push(e.name.as_str());
        }
        *n += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for name in order {
        let n = counts[name];
        if best.is_none_or(|(_, m)| n > m) {
            best = Some((name, n));
        }
    }

    match best {
        Some((name, n)) if batch_size > 0 && n as f64 / batch_size as f64 >= threshold => title_case(name),
        _ => NOT_RECOGNISED.to_string(),
    }
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_alpha = false;
    for c in s.chars() {
        if prev_is_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_is_alpha = c.is_alphabetic();
    }
    out
}
