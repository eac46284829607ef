use crate::dtw::{self, euclidean};
use crate::sign::{Embedding, SignModel};

/// Dissimilarity between a recorded sign and a reference sign.
///
/// Signs that disagree on which hands are present never match (+∞).
/// Otherwise the per-hand DTW costs are summed as-is, without length
/// normalisation, so a long window accumulates more cost than a short one.
pub fn sign_distance(recorded: &SignModel, reference: &SignModel) -> f64 {
    if recorded.has_left_hand() != reference.has_left_hand()
        || recorded.has_right_hand() != reference.has_right_hand()
    {
        return f64::INFINITY;
    }

    let mut distance = 0.0;
    if recorded.has_left_hand() {
        distance += hand_distance(recorded.lh_embedding(), reference.lh_embedding());
    }
    if recorded.has_right_hand() {
        distance += hand_distance(recorded.rh_embedding(), reference.rh_embedding());
    }
    distance
}

fn hand_distance(a: &Embedding, b: &Embedding) -> f64 {
    // both sides claim the hand; one of them has no usable frame
    if a.is_empty() != b.is_empty() {
        return f64::INFINITY;
    }
    dtw::dtw(a, b, euclidean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{ABSENT_HAND, RawHand, sample_hand};

    fn two_hands(left: &[RawHand], right: &[RawHand]) -> SignModel {
        SignModel::new(left, right).unwrap()
    }

    fn right_only(frames: &[RawHand]) -> SignModel {
        two_hands(&vec![ABSENT_HAND; frames.len()], frames)
    }

    #[test]
    fn presence_mismatch_is_infinite() {
        let hand = sample_hand(0.2);
        let right = right_only(&[hand, hand]);
        let left = two_hands(&[hand, hand], &[ABSENT_HAND, ABSENT_HAND]);
        let both = two_hands(&[hand], &[hand]);
        let none = two_hands(&[ABSENT_HAND], &[ABSENT_HAND]);

        for (a, b) in [(&right, &left), (&right, &both), (&left, &both), (&none, &right)] {
            assert_eq!(sign_distance(a, b), f64::INFINITY);
            assert_eq!(sign_distance(b, a), f64::INFINITY);
        }
    }

    #[test]
    fn same_sign_is_zero() {
        let frames = [sample_hand(0.2), sample_hand(0.25), sample_hand(0.3)];
        let a = two_hands(&frames, &frames);
        assert_eq!(sign_distance(&a, &a), 0.0);
    }

    #[test]
    fn no_hands_on_either_side_is_zero() {
        let a = two_hands(&[ABSENT_HAND; 4], &[ABSENT_HAND; 4]);
        let b = two_hands(&[ABSENT_HAND; 9], &[ABSENT_HAND; 9]);
        assert_eq!(sign_distance(&a, &b), 0.0);
    }

    #[test]
    fn symmetric_for_compatible_signs() {
        let a = right_only(&[sample_hand(0.1), sample_hand(0.2), sample_hand(0.5)]);
        let b = right_only(&[sample_hand(0.4), sample_hand(0.3)]);
        assert!(sign_distance(&a, &b) > 0.0);
        assert_eq!(sign_distance(&a, &b), sign_distance(&b, &a));

        let c = two_hands(&[sample_hand(0.15)], &[sample_hand(0.45)]);
        let d = two_hands(&[sample_hand(0.35), sample_hand(0.2)], &[sample_hand(0.05)]);
        assert_eq!(sign_distance(&c, &d), sign_distance(&d, &c));
    }

    #[test]
    fn hands_are_summed() {
        let l1 = [sample_hand(0.1), sample_hand(0.2)];
        let l2 = [sample_hand(0.3)];
        let r1 = [sample_hand(0.5)];
        let r2 = [sample_hand(0.6), sample_hand(0.4)];

        let left_cost = dtw::dtw(
            two_hands(&l1, &[]).lh_embedding(),
            two_hands(&l2, &[]).lh_embedding(),
            euclidean,
        );
        let right_cost = dtw::dtw(right_only(&r1).rh_embedding(), right_only(&r2).rh_embedding(), euclidean);

        let d = sign_distance(&two_hands(&l1, &r1), &two_hands(&l2, &r2));
        assert_eq!(d, left_cost + right_cost);
    }

    #[test]
    fn claimed_hand_without_frames_never_matches() {
        let fv = vec![0.5; 4];
        let empty = SignModel::from_parts(false, true, vec![], vec![]);
        let seen = SignModel::from_parts(false, true, vec![], vec![fv.clone(), fv]);
        assert_eq!(sign_distance(&empty, &seen), f64::INFINITY);
        assert_eq!(sign_distance(&seen, &empty), f64::INFINITY);
        // both empty still aligns at zero cost
        assert_eq!(sign_distance(&empty, &empty), 0.0);
    }

    #[test]
    fn longer_windows_accumulate_more_cost() {
        let a = sample_hand(0.2);
        let b = sample_hand(0.3);
        let short = sign_distance(&right_only(&[a, a]), &right_only(&[b, b]));
        let long = sign_distance(&right_only(&[a; 8]), &right_only(&[b; 8]));
        assert!(long > short);
    }
}
