//! Per-hand geometry: landmark sets, the skeleton topology, and the
//! angle-based feature vector.

use crate::error::SignError;

pub const LANDMARK_COUNT: usize = 21;
pub const COORDS_PER_LANDMARK: usize = 3;
/// Flattened length of one hand: 21 points × (x, y, z).
pub const RAW_HAND_LEN: usize = LANDMARK_COUNT * COORDS_PER_LANDMARK;

/// One hand in one frame, flattened. All zeros means "not detected".
pub type RawHand = [f64; RAW_HAND_LEN];

pub const ABSENT_HAND: RawHand = [0.0; RAW_HAND_LEN];

/// A bone of the hand skeleton, from `start` to `end` landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub start: usize,
    pub end: usize,
}

const fn conn(start: usize, end: usize) -> Connection {
    Connection { start, end }
}

/// MediaPipe hand topology. The order is fixed so feature vectors from
/// different frames line up component-wise.
pub const HAND_CONNECTIONS: [Connection; 21] = [
    // palm
    conn(0, 1),
    conn(0, 5),
    conn(9, 13),
    conn(13, 17),
    conn(5, 9),
    conn(0, 17),
    // thumb
    conn(1, 2),
    conn(2, 3),
    conn(3, 4),
    // index
    conn(5, 6),
    conn(6, 7),
    conn(7, 8),
    // middle
    conn(9, 10),
    conn(10, 11),
    conn(11, 12),
    // ring
    conn(13, 14),
    conn(14, 15),
    conn(15, 16),
    // pinky
    conn(17, 18),
    conn(18, 19),
    conn(19, 20),
];

#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [[f64; 3]; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Build from a flattened `[x0, y0, z0, x1, ...]` slice of exactly 63 values.
    pub fn from_flat(values: &[f64]) -> Result<Self, SignError> {
        if values.len() != RAW_HAND_LEN {
            return Err(SignError::MalformedInput(format!(
                "expected {RAW_HAND_LEN} hand coordinates, got {}",
                values.len()
            )));
        }
        let mut points = [[0.0; 3]; LANDMARK_COUNT];
        for (p, chunk) in points.iter_mut().zip(values.chunks_exact(COORDS_PER_LANDMARK)) {
            p.copy_from_slice(chunk);
        }
        Ok(Self { points })
    }

    #[cfg(test)]
    pub(crate) fn point(&self, idx: usize) -> [f64; 3] {
        self.points[idx]
    }

    /// Displacement vector `end - start` of one connection.
    pub fn bone(&self, c: Connection) -> [f64; 3] {
        let a = self.points[c.start];
        let b = self.points[c.end];
        [b[0] - a[0], b[1] - a[1], b[2] - a[2]]
    }
}

/// Angles between every ordered pair of bones, row-major over
/// `connections × connections`. Always `connections.len()²` long.
pub fn feature_vector(hand: &HandLandmarks, connections: &[Connection]) -> Vec<f64> {
    let bones: Vec<[f64; 3]> = connections.iter().map(|&c| hand.bone(c)).collect();

    let mut out = Vec::with_capacity(bones.len() * bones.len());
    for u in &bones {
        for v in &bones {
            let angle = angle_between(u, v);
            out.push(if angle.is_nan() { 0.0 } else { angle });
        }
    }
    out
}

/// Angle in radians; NaN when either vector has zero length.
pub fn angle_between(u: &[f64; 3], v: &[f64; 3]) -> f64 {
    if u == v {
        return 0.0;
    }
    let dot = u[0] * v[0] + u[1] * v[1] + u[2] * v[2];
    let norm = norm(u) * norm(v);
    // clamp keeps rounding noise from turning antiparallel bones into NaN;
    // NaN itself passes through clamp untouched
    (dot / norm).clamp(-1.0, 1.0).acos()
}

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[cfg(test)]
pub(crate) fn sample_hand(spread: f64) -> RawHand {
    // A loose fan: every landmark on its own ray from the wrist, bent a bit in z.
    let mut raw = ABSENT_HAND;
    for i in 0..LANDMARK_COUNT {
        let finger = (i.max(1) - 1) / 4;
        let joint = ((i.max(1) - 1) % 4 + 1) as f64;
        let theta = 0.3 + finger as f64 * spread;
        raw[i * 3] = 0.5 + if i == 0 { 0.0 } else { 0.05 * joint * theta.cos() };
        raw[i * 3 + 1] = 0.5 + if i == 0 { 0.0 } else { 0.05 * joint * theta.sin() };
        raw[i * 3 + 2] = 0.01 * (i as f64).sin();
    }
    raw
}
