// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn succ_and_pred_are_inverse() {
    let l = Level::new(3);
    assert_eq!(l.succ().pred(), l);
}

#[test]
fn ascending_to_is_inclusive_both_ends() {
    let levels: Vec<i64> = Level::new(1).ascending_to(Level::new(3)).map(Level::value).collect();
    assert_eq!(levels, vec![1, 2, 3]);
}

#[test]
fn ascending_to_empty_when_backwards() {
    let levels: Vec<i64> = Level::new(3).ascending_to(Level::new(1)).map(Level::value).collect();
    assert!(levels.is_empty());
}

#[test]
fn descending_to_excludes_floor_includes_start() {
    let levels: Vec<i64> = Level::new(3).descending_to(Level::new(0)).map(Level::value).collect();
    assert_eq!(levels, vec![3, 2, 1]);
}

#[test]
fn descending_to_empty_when_already_at_floor() {
    let levels: Vec<i64> = Level::new(2).descending_to(Level::new(2)).map(Level::value).collect();
    assert!(levels.is_empty());
}

#[test]
fn ordering_matches_integer_ordering() {
    assert!(Level::new(-1) < Level::new(0));
    assert!(Level::new(5) > Level::new(4));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn succ_pred_are_inverse_for_any_level(value in any::<i64>().prop_filter("no overflow at the edges", |v| *v < i64::MAX && *v > i64::MIN)) {
            let l = Level::new(value);
            prop_assert_eq!(l.succ().pred(), l);
            prop_assert_eq!(l.pred().succ(), l);
        }

        #[test]
        fn ascending_to_is_monotonically_increasing(lo in -1_000i64..1_000, hi in -1_000i64..1_000) {
            let levels: Vec<i64> = Level::new(lo).ascending_to(Level::new(hi)).map(Level::value).collect();
            prop_assert!(levels.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn descending_to_is_monotonically_decreasing(hi in -1_000i64..1_000, floor in -1_000i64..1_000) {
            let levels: Vec<i64> = Level::new(hi).descending_to(Level::new(floor)).map(Level::value).collect();
            prop_assert!(levels.windows(2).all(|w| w[0] > w[1]));
        }
    }
}
