//! Dynamic time warping over sequences of fixed-dimension vectors.

/// Straight-line distance between two equally sized vectors.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Minimal cumulative cost of aligning `a` with `b`, where each step may
/// advance either sequence or both. Returns 0 when either side is empty.
pub fn dtw<T, F>(a: &[T], b: &[T], metric: F) -> f64
where
    T: AsRef<[f64]>,
    F: Fn(&[f64], &[f64]) -> f64,
{
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // two rolling rows of the (n+1) × (m+1) cost table
    let m = b.len();
    let mut prev = vec![f64::INFINITY; m + 1];
    let mut cur = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for ai in a {
        cur[0] = f64::INFINITY;
        for (j, bj) in b.iter().enumerate() {
            let cost = metric(ai.as_ref(), bj.as_ref());
            let best = prev[j].min(prev[j + 1]).min(cur[j]);
            cur[j + 1] = cost + best;
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[m]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(xs: &[f64]) -> Vec<Vec<f64>> {
        xs.iter().map(|&x| vec![x]).collect()
    }

    #[test]
    fn euclidean_matches_pythagoras() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn identical_sequences_cost_nothing() {
        let a = seq(&[1.0, 2.0, 3.0, 2.0]);
        assert_eq!(dtw(&a, &a, euclidean), 0.0);
    }

    #[test]
    fn stretched_sequence_aligns_for_free() {
        let a = seq(&[0.0, 1.0, 2.0]);
        let b = seq(&[0.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        assert_eq!(dtw(&a, &b, euclidean), 0.0);
    }

    #[test]
    fn known_small_table() {
        // a = [0, 2], b = [1]: both points must map to 1 -> |0-1| + |2-1|
        assert_eq!(dtw(&seq(&[0.0, 2.0]), &seq(&[1.0]), euclidean), 2.0);
        // a = [1, 2, 3], b = [2, 2, 2, 3]: 1 + 0 + 0 + 0 + 0
        assert_eq!(dtw(&seq(&[1.0, 2.0, 3.0]), &seq(&[2.0, 2.0, 2.0, 3.0]), euclidean), 1.0);
    }

    #[test]
    fn symmetric() {
        let a = seq(&[0.3, 1.7, 0.2, 5.0, 4.1]);
        let b = seq(&[1.1, 0.0, 2.2]);
        assert_eq!(dtw(&a, &b, euclidean), dtw(&b, &a, euclidean));
    }

    #[test]
    fn empty_side_costs_zero() {
        let a = seq(&[1.0, 2.0]);
        let e: Vec<Vec<f64>> = vec![];
        assert_eq!(dtw(&a, &e, euclidean), 0.0);
        assert_eq!(dtw(&e, &a, euclidean), 0.0);
        assert_eq!(dtw(&e, &e, euclidean), 0.0);
    }

    #[test]
    fn metric_is_pluggable() {
        let manhattan = |x: &[f64], y: &[f64]| -> f64 { x.iter().zip(y).map(|(p, q)| (p - q).abs()).sum() };
        let a = vec![vec![0.0, 0.0]];
        let b = vec![vec![3.0, 4.0]];
        assert_eq!(dtw(&a, &b, manhattan), 7.0);
        assert_eq!(dtw(&a, &b, euclidean), 5.0);
    }

    #[test]
    fn longer_match_costs_more() {
        // same offset repeated over more frames sums up, no length normalisation
        let short = dtw(&seq(&[0.0, 0.0]), &seq(&[1.0, 1.0]), euclidean);
        let long = dtw(&seq(&[0.0; 6]), &seq(&[1.0; 6]), euclidean);
        assert_eq!(short, 2.0);
        assert_eq!(long, 6.0);
    }
}
