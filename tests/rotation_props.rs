//! Property tests for primary rotation

use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::HashSet;

use homily::scheduler::{push_recent, RotationMode, RotationSelector};

fn pool(size: usize) -> Vec<String> {
    (1..=size).map(|i| format!("text-{i:02}.txt")).collect()
}

fn numbered(n: usize) -> String {
    format!("text-{n:03}.txt")
}

proptest! {
    #[test]
    fn random_never_repeats_within_window(
        size in 6usize..30,
        window in 1usize..6,
        seed in any::<u64>(),
        rounds in 1usize..60,
    ) {
        let all = pool(size);
        let mut selector = RotationSelector::with_seed(RotationMode::Random, seed);
        let mut recent: Vec<String> = Vec::new();

        for _ in 0..rounds {
            let chosen = selector.select(&all, &recent, None).unwrap();
            prop_assert!(all.contains(&chosen));
            prop_assert!(!recent.contains(&chosen));
            push_recent(&mut recent, &chosen, window);
            prop_assert!(recent.len() <= window);
        }
    }

    #[test]
    fn random_with_small_pool_still_selects(
        size in 1usize..5,
        seed in any::<u64>(),
    ) {
        let all = pool(size);
        let mut selector = RotationSelector::with_seed(RotationMode::Random, seed);
        let recent = all.clone();

        let chosen = selector.select(&all, &recent, None).unwrap();
        prop_assert!(all.contains(&chosen));
    }

    #[test]
    fn sequential_visits_every_item_in_order(size in 1usize..25, laps in 1usize..3) {
        let mut all = pool(size);
        all.reverse();
        let mut selector = RotationSelector::new(RotationMode::Sequential);
        let mut last: Option<String> = None;
        let mut seen = Vec::new();

        for _ in 0..size * laps {
            let chosen = selector.select(&all, &[], last.as_deref()).unwrap();
            seen.push(chosen.clone());
            last = Some(chosen);
        }

        let mut expected = pool(size);
        expected = vec![expected; laps].concat();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn random_pool_at_least_window_never_repeats(
        (window, size) in (1usize..6).prop_flat_map(|w| (Just(w), w..30usize)),
        seed in any::<u64>(),
        rounds in 1usize..60,
    ) {
        let all = pool(size);
        let mut selector = RotationSelector::with_seed(RotationMode::Random, seed);
        let mut recent: Vec<String> = Vec::new();
        let mut picks: Vec<String> = Vec::new();

        for _ in 0..rounds {
            let chosen = selector.select(&all, &recent, None).unwrap();
            let lookback = picks.len().saturating_sub(window - 1);
            prop_assert!(!picks[lookback..].contains(&chosen));
            push_recent(&mut recent, &chosen, window);
            picks.push(chosen);
        }
    }

    #[test]
    fn sequential_is_stable_under_mid_lap_insertion(
        size in 2usize..20,
        progress in any::<Index>(),
        before in any::<Index>(),
        after in any::<Index>(),
    ) {
        // existing ids are even, inserted ids odd so they land between them
        let mut all: Vec<String> = (1..=size).map(|i| numbered(2 * i)).collect();
        let mut selector = RotationSelector::new(RotationMode::Sequential);

        let steps = 1 + progress.index(size - 1);
        let mut lap = Vec::new();
        let mut last: Option<String> = None;
        for _ in 0..steps {
            let chosen = selector.select(&all, &[], last.as_deref()).unwrap();
            lap.push(chosen.clone());
            last = Some(chosen);
        }

        // cursor sits on number 2 * steps
        let inserted_before = numbered(2 * before.index(steps) + 1);
        let inserted_after = numbered(2 * (steps + after.index(size - steps + 1)) + 1);
        all.push(inserted_after.clone());
        all.insert(0, inserted_before.clone());

        loop {
            let chosen = selector.select(&all, &[], last.as_deref()).unwrap();
            if last.as_deref().is_some_and(|prev| chosen.as_str() <= prev) {
                let mut sorted = all.clone();
                sorted.sort();
                prop_assert_eq!(&chosen, &sorted[0]);
                break;
            }
            lap.push(chosen.clone());
            last = Some(chosen);
        }

        let unique: HashSet<&String> = lap.iter().collect();
        prop_assert_eq!(unique.len(), lap.len());
        prop_assert!(lap.contains(&inserted_after));
        prop_assert!(!lap.contains(&inserted_before));
        prop_assert_eq!(lap.len(), size + 1);
    }
}

#[test]
fn sequential_restarts_when_last_selected_is_removed() {
    let mut all = pool(5);
    let mut selector = RotationSelector::new(RotationMode::Sequential);

    let mut last: Option<String> = None;
    for _ in 0..3 {
        last = Some(selector.select(&all, &[], last.as_deref()).unwrap());
    }
    assert_eq!(last.as_deref(), Some("text-03.txt"));

    all.retain(|id| Some(id) != last.as_ref());
    let chosen = selector.select(&all, &[], last.as_deref()).unwrap();
    assert_eq!(chosen, "text-01.txt");
}
