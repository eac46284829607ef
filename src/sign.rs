//! Sign representation: both hands of one gesture window turned into
//! per-frame feature sequences.

use crate::error::SignError;
use crate::hand::{self, HAND_CONNECTIONS, HandLandmarks};

/// One feature vector per frame in which the hand was seen.
pub type Embedding = Vec<Vec<f64>>;

#[derive(Debug, Clone)]
pub struct SignModel {
    has_left_hand: bool,
    has_right_hand: bool,
    lh_embedding: Embedding,
    rh_embedding: Embedding,
}

impl SignModel {
    /// Build from per-frame flattened landmarks of a window. Every frame must
    /// hold exactly 63 values; all-zero frames count as "hand absent".
    pub fn new<L, R>(left_hand_list: &[L], right_hand_list: &[R]) -> Result<Self, SignError>
    where
        L: AsRef<[f64]>,
        R: AsRef<[f64]>,
    {
        Ok(Self {
            has_left_hand: window_sum(left_hand_list) != 0.0,
            has_right_hand: window_sum(right_hand_list) != 0.0,
            lh_embedding: embed(left_hand_list)?,
            rh_embedding: embed(right_hand_list)?,
        })
    }

    /// Assemble a sign directly, bypassing the presence/embedding derivation.
    #[cfg(test)]
    pub(crate) fn from_parts(
        has_left_hand: bool,
        has_right_hand: bool,
        lh_embedding: Embedding,
        rh_embedding: Embedding,
    ) -> Self {
        Self {
            has_left_hand,
            has_right_hand,
            lh_embedding,
            rh_embedding,
        }
    }

    pub fn has_left_hand(&self) -> bool {
        self.has_left_hand
    }

    pub fn has_right_hand(&self) -> bool {
        self.has_right_hand
    }

    pub fn lh_embedding(&self) -> &Embedding {
        &self.lh_embedding
    }

    pub fn rh_embedding(&self) -> &Embedding {
        &self.rh_embedding
    }
}

fn window_sum<F: AsRef<[f64]>>(frames: &[F]) -> f64 {
    frames.iter().map(|f| f.as_ref().iter().sum::<f64>()).sum()
}

/// Absent frames are dropped, not zero-padded, so alignment never mistakes
/// "no hand" for "hand held still".
fn embed<F: AsRef<[f64]>>(frames: &[F]) -> Result<Embedding, SignError> {
    let mut embedding = Vec::new();
    for frame in frames {
        let values = frame.as_ref();
        let landmarks = HandLandmarks::from_flat(values)?;
        if values.iter().sum::<f64>() == 0.0 {
            continue;
        }
        embedding.push(hand::feature_vector(&landmarks, &HAND_CONNECTIONS));
    }
    Ok(embedding)
}
