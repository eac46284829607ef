//! Per-frame detection results as delivered by the external landmark detector.

use serde::Deserialize;

use crate::error::SignError;
use crate::hand::{ABSENT_HAND, COORDS_PER_LANDMARK, LANDMARK_COUNT, RawHand};

/// One frame of detector output. A missing or `null` hand means "not detected".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub left_hand: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub right_hand: Option<Vec<Vec<f64>>>,
}

/// Both hands of one frame, flattened and validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLandmarks {
    pub left: RawHand,
    pub right: RawHand,
}

/// Flatten both hands into 63-value arrays. Absent hands become the all-zero
/// sentinel and non-finite coordinates become 0.
pub fn extract_landmarks(det: &Detection) -> Result<FrameLandmarks, SignError> {
    Ok(FrameLandmarks {
        left: flatten_hand("left", det.left_hand.as_deref())?,
        right: flatten_hand("right", det.right_hand.as_deref())?,
    })
}

fn flatten_hand(side: &str, points: Option<&[Vec<f64>]>) -> Result<RawHand, SignError> {
    let Some(points) = points else {
        return Ok(ABSENT_HAND);
    };
    if points.len() != LANDMARK_COUNT {
        return Err(SignError::MalformedInput(format!(
            "{side} hand has {} landmarks, expected {LANDMARK_COUNT}",
            points.len()
        )));
    }

    let mut out = ABSENT_HAND;
    for (i, p) in points.iter().enumerate() {
        if p.len() != COORDS_PER_LANDMARK {
            return Err(SignError::MalformedInput(format!(
                "{side} hand landmark {i} has {} coordinates, expected {COORDS_PER_LANDMARK}",
                p.len()
            )));
        }
        for (k, &v) in p.iter().enumerate() {
            out[i * COORDS_PER_LANDMARK + k] = if v.is_finite() { v } else { 0.0 };
        }
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) fn detection_from_raw(left: Option<&RawHand>, right: Option<&RawHand>) -> Detection {
    let points = |raw: &RawHand| raw.chunks_exact(3).map(|c| c.to_vec()).collect();
    Detection {
        left_hand: left.map(points),
        right_hand: right.map(points),
    }
}
