//! Tracker contract: monotonic claims, partitioning splits, exhaustion, and errors.

use dynsplit::testing::{assert_contiguous, assert_monotonic, assert_partition, claim_all};
use dynsplit::{
    OffsetRange, OffsetRangeTracker, Progress, RestrictionTracker, SharedTracker, TrackerError,
};
use std::thread;


fn tracker(start: i64, end: i64) -> OffsetRangeTracker {
    OffsetRangeTracker::new(OffsetRange::new(start, end))
}

#[test]
fn test_accepted_claims_are_monotonic() {
    let mut t = tracker(0, 50);
    let mut accepted = Vec::new();
    for position in [0, 3, 4, 10, 9, 11] {
        if t.try_claim(position) {
            accepted.push(position);
        }
    }
    assert_eq!(accepted, vec![0, 3, 4, 10]);
    assert_monotonic(&accepted);
    // The rejected claim is not recorded as attempted.
    assert_eq!(t.last_attempted(), Some(10));
    assert_eq!(t.cursor(), 11);
    assert!(matches!(
        t.error(),
        Some(TrackerError::NonMonotonicClaim { .. })
    ));
}

#[test]
fn test_split_partitions_for_every_cursor_and_fraction() {
    let original = OffsetRange::new(0, 100);
    for claimed in [0_i64, 1, 37, 99] {
        for step in 0..=10 {
            let fraction = f64::from(step) / 10.0;
            let mut t = OffsetRangeTracker::new(original);
            for position in 0..claimed {
                assert!(t.try_claim(position));
            }
            let split = t
                .try_split(fraction)
                .unwrap_or_else(|e| panic!("claimed {claimed}, fraction {fraction}: {e}"));
            assert_partition(&original, claimed, &split);
            let expected_end = claimed + ((100 - claimed) as f64 * fraction).floor() as i64;
            assert_eq!(split.primary.end, expected_end);
            assert_eq!(
                t.current_restriction(),
                OffsetRange::new(0, split.primary.end)
            );
        }
    }
}

#[test]
fn test_split_of_the_widest_range() {
    let original = OffsetRange::new(i64::MIN, i64::MAX);
    let mut t = OffsetRangeTracker::new(original);
    let split = t.try_split(0.5).unwrap();
    assert_partition(&original, i64::MIN, &split);
    assert_eq!(split.primary, OffsetRange::new(i64::MIN, 0));
    assert_eq!(split.residual, OffsetRange::new(0, i64::MAX));

    let mut whole = OffsetRangeTracker::new(original);
    let split = whole.try_split(1.0).unwrap();
    assert_eq!(split.primary, original);
    assert!(split.residual.is_empty());
}

#[test]
fn test_split_of_a_wide_range_after_a_claim() {
    let original = OffsetRange::new(-10, i64::MAX);
    let shared = SharedTracker::new(OffsetRangeTracker::new(original));
    assert!(shared.try_claim(-10));
    let split = shared.try_split(0.5).unwrap();
    assert_partition(&original, -9, &split);
    assert!(split.primary.end > 0);
    assert_eq!(shared.current_restriction(), OffsetRange::new(-10, split.primary.end));
    assert!(shared.try_claim(-9));
    assert!(shared.error().is_none());

    let checkpoint = shared.checkpoint().unwrap();
    assert!(checkpoint.primary.is_empty());
    assert_eq!(checkpoint.residual.start, -8);
}

#[test]
fn test_claims_after_split_stop_at_the_primary() {
    let mut t = tracker(0, 20);
    let split = t.try_split(0.5).unwrap();
    let claimed = claim_all(&mut t);
    assert_contiguous(&claimed, 0, 10);

    let mut residual = OffsetRangeTracker::new(split.residual);
    assert_contiguous(&claim_all(&mut residual), 10, 20);
}

#[test]
fn test_repeated_splits_shrink_the_primary() {
    let mut t = tracker(0, 64);
    let first = t.try_split(0.5).unwrap();
    let second = t.try_split(0.5).unwrap();
    assert_eq!(first.residual, OffsetRange::new(32, 64));
    assert_eq!(second.primary, OffsetRange::new(0, 16));
    assert_eq!(second.residual, OffsetRange::new(16, 32));
    assert_contiguous(&claim_all(&mut t), 0, 16);
}

#[test]
fn test_exhaustion_is_idempotent() {
    let mut t = tracker(0, 3);
    assert_eq!(claim_all(&mut t), vec![0, 1, 2]);
    for position in [3, 4, 100] {
        assert!(!t.try_claim(position));
        assert!(t.is_done());
    }
    assert!(t.error().is_none());
    assert!(t.check_done().is_ok());
}

#[test]
fn test_invalid_split_requests_are_all_or_nothing() {
    let mut t = tracker(0, 10);
    assert!(t.try_claim(0));
    let before = (t.current_restriction(), t.progress());
    for fraction in [-0.5, 1.01, f64::INFINITY, f64::NAN] {
        let err = t.try_split(fraction).unwrap_err();
        assert!(err.is_split_rejection());
    }
    assert_eq!((t.current_restriction(), t.progress()), before);
    assert!(t.try_claim(1));
}

#[test]
fn test_empty_restriction_cannot_be_split() {
    let mut t = tracker(7, 7);
    assert!(t.is_done());
    assert!(matches!(
        t.try_split(0.5),
        Err(TrackerError::NothingToSplit { .. })
    ));
}

#[test]
fn test_recorded_error_refuses_later_claims() {
    let mut t = tracker(0, 10);
    assert!(t.try_claim(2));
    t.fail("corrupt record".to_string());
    let err = t.error().unwrap();
    assert!(err.is_processing());
    assert!(err.to_string().contains("position 2"));
    assert!(err.to_string().contains("corrupt record"));
    assert!(!t.try_claim(3));
    assert!(t.is_done());
    assert!(t.try_split(0.5).is_err());
    // The first error is kept.
    t.fail("second".to_string());
    assert!(t.error().unwrap().to_string().contains("corrupt record"));
}

#[test]
fn test_progress_reports_claimed_and_remaining() {
    let mut t = tracker(0, 8);
    assert_eq!(t.progress(), Progress::new(0.0, 8.0));
    assert!(t.try_claim(0));
    assert!(t.try_claim(1));
    let p = t.progress();
    assert_approx_eq!(p.done, 2.0);
    assert_approx_eq!(p.remaining, 6.0);
    assert_approx_eq!(p.fraction_completed(), 0.25);

    t.try_split(0.5).unwrap();
    let p = t.progress();
    assert_approx_eq!(p.done, 2.0);
    assert_approx_eq!(p.remaining, 3.0);
}

#[test]
fn test_shared_tracker_is_consistent_under_contention() {
    for _ in 0..50 {
        let shared = SharedTracker::new(tracker(0, 200));
        let claimer = shared.clone();
        let splitter = shared.clone();
        let (claimed, splits) = thread::scope(|s| {
            let c = s.spawn(move || {
                let mut out = Vec::new();
                let mut i = 0;
                while claimer.try_claim(i) {
                    out.push(i);
                    i += 1;
                }
                out
            });
            let sp = s.spawn(move || {
                (0..3)
                    .filter_map(|_| splitter.try_split(0.5).ok())
                    .collect::<Vec<_>>()
            });
            (c.join().unwrap(), sp.join().unwrap())
        });

        // The last successful split bounds what was claimed; every residual
        // continues where the next primary ends.
        let end = splits.last().map_or(200, |s| s.primary.end);
        assert_contiguous(&claimed, 0, end);
        for pair in splits.windows(2) {
            assert_eq!(pair[1].residual.end, pair[0].residual.start);
        }
        for split in &splits {
            assert!(split.is_contiguous());
        }
        assert!(shared.error().is_none());
        assert!(shared.is_done());
    }
}
