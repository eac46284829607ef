//! Reference library of recorded signs, and ranking against it.

use log::info;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

use crate::distance::sign_distance;
use crate::error::SignError;
use crate::sign::SignModel;

/// On-disk entry: label, source video and the raw per-frame landmarks.
#[derive(Debug, Deserialize)]
struct StoredSign {
    name: String,
    video_name: String,
    #[serde(default)]
    left_hand: Vec<Vec<f64>>,
    #[serde(default)]
    right_hand: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct StoredLibrary {
    signs: Vec<StoredSign>,
}

#[derive(Debug, Clone)]
pub struct ReferenceSign {
    pub name: String,
    pub video_name: String,
    pub sign: SignModel,
}

/// Read-only after load; ranking never mutates it.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    signs: Vec<ReferenceSign>,
}

impl ReferenceLibrary {
    #[cfg(test)]
    pub(crate) fn new(signs: Vec<ReferenceSign>) -> Self {
        Self { signs }
    }

    pub fn load(path: &Path) -> Result<Self, SignError> {
        let txt = fs::read_to_string(path).map_err(|source| SignError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let lib = Self::from_json_str(&txt).map_err(|e| match e {
            SignError::Parse { source, .. } => SignError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!("loaded {} reference signs from {}", lib.len(), path.display());
        for (name, count) in lib.sign_counts() {
            info!("  {name}: {count}");
        }
        Ok(lib)
    }

    pub fn from_json_str(txt: &str) -> Result<Self, SignError> {
        let stored: StoredLibrary = serde_json::from_str(txt).map_err(|source| SignError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        Self::from_stored(stored)
    }

    fn from_stored(stored: StoredLibrary) -> Result<Self, SignError> {
        let mut signs = Vec::with_capacity(stored.signs.len());
        for s in stored.signs {
            let sign = SignModel::new(&s.left_hand, &s.right_hand).map_err(|e| match e {
                SignError::MalformedInput(msg) => {
                    SignError::MalformedInput(format!("reference '{}': {msg}", s.video_name))
                }
                other => other,
            })?;
            signs.push(ReferenceSign {
                name: s.name,
                video_name: s.video_name,
                sign,
            });
        }
        Ok(Self { signs })
    }

    #[cfg(test)]
    pub(crate) fn signs(&self) -> &[ReferenceSign] {
        &self.signs
    }

    pub fn len(&self) -> usize {
        self.signs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signs.is_empty()
    }

    /// Number of reference recordings per label, ordered by label.
    pub fn sign_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.signs {
            *counts.entry(s.name.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSign {
    pub name: String,
    pub video_name: String,
    pub distance: f64,
}

/// Library entries ordered by ascending distance to one recorded sign.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    entries: Vec<RankedSign>,
}

impl Ranking {
    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<RankedSign>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RankedSign] {
        &self.entries
    }

    /// True when nothing has a non-zero distance (including an empty ranking).
    pub fn all_zero(&self) -> bool {
        self.entries.iter().all(|e| e.distance == 0.0)
    }
}

/// Distance from `recorded` to every library entry, stable-sorted ascending.
/// Incompatible entries (+∞) land at the end; ties keep library order.
pub fn rank(recorded: &SignModel, library: &ReferenceLibrary) -> Ranking {
    let mut entries: Vec<RankedSign> = library
        .signs
        .iter()
        .map(|r| RankedSign {
            name: r.name.clone(),
            video_name: r.video_name.clone(),
            distance: sign_distance(recorded, &r.sign),
        })
        .collect();
    entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ranking { entries }
}
