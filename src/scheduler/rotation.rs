//! Primary content rotation
//!
//! This module picks the next primary item. Two policies are supported:
//! - **random**: uniform choice among items not in the recent window, falling
//!   back to the whole pool when every item is recent
//! - **sequential**: wrap-around cursor over the sorted pool

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::error::{SchedulerError, SchedulerResult};
use crate::models::Category;

/// Default number of recently published primary ids kept
pub const DEFAULT_RECENT_WINDOW: usize = 5;

// ============================================================================
// Rotation Mode
// ============================================================================

/// How the next primary item is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    /// Uniform choice avoiding the recent window
    #[default]
    Random,
    /// Next id after the last published one
    Sequential,
}

impl RotationMode {
    /// Get mode ID as string
    pub fn id(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
        }
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for RotationMode {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" | "aleatorio" => Ok(Self::Random),
            "sequential" | "secuencial" => Ok(Self::Sequential),
            _ => Err(SchedulerError::invalid_rotation_mode(s)),
        }
    }
}

// ============================================================================
// Selection Algorithms
// ============================================================================

/// Pick uniformly among `all` minus `recent`
///
/// When every id is recent, falls back to the least recently used one (the
/// oldest window entry still in the pool), so a pool no larger than the
/// window still never repeats within the window. Returns `None` only when
/// `all` is empty.
pub fn select_random<R: Rng + ?Sized>(
    all: &[String],
    recent: &[String],
    rng: &mut R,
) -> Option<String> {
    let excluded: HashSet<&str> = recent.iter().map(String::as_str).collect();
    let available: Vec<&String> = all
        .iter()
        .filter(|id| !excluded.contains(id.as_str()))
        .collect();

    if available.is_empty() {
        debug!(pool = all.len(), "Every item is recent, taking the least recently used");
        return oldest_in_pool(all, recent);
    }

    available.choose(rng).map(|id| (*id).clone())
}

/// First window entry (oldest first) that is still in `all`
fn oldest_in_pool(all: &[String], recent: &[String]) -> Option<String> {
    recent
        .iter()
        .find(|id| all.contains(id))
        .or_else(|| all.first())
        .cloned()
}

/// Pick the id following `last` in `sorted`, wrapping around
///
/// No prior id, or a prior id no longer in the pool, restarts at the first.
pub fn select_sequential(sorted: &[String], last: Option<&str>) -> Option<String> {
    let first = sorted.first()?;

    let Some(last) = last else {
        return Some(first.clone());
    };

    match sorted.iter().position(|id| id == last) {
        Some(index) => Some(sorted[(index + 1) % sorted.len()].clone()),
        None => Some(first.clone()),
    }
}

/// Record a published id in the bounded recent window
///
/// The window is ordered oldest first. An id already present moves to the
/// newest position instead of appearing twice.
pub fn push_recent(window: &mut Vec<String>, id: &str, capacity: usize) {
    window.retain(|existing| existing != id);
    window.push(id.to_string());

    if window.len() > capacity {
        let excess = window.len() - capacity;
        window.drain(..excess);
    }
}

// ============================================================================
// Rotation Selector
// ============================================================================

/// Stateful selector owning the random generator
#[derive(Debug, Clone)]
pub struct RotationSelector {
    mode: RotationMode,
    rng: ChaCha8Rng,
}

impl RotationSelector {
    /// Create a selector seeded from OS entropy
    pub fn new(mode: RotationMode) -> Self {
        Self {
            mode,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Create a reproducible selector
    pub fn with_seed(mode: RotationMode, seed: u64) -> Self {
        Self {
            mode,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Active rotation mode
    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    /// Choose the next primary id
    ///
    /// # Arguments
    ///
    /// * `all` - Every primary id currently available, in any order
    /// * `recent` - Recent window, oldest first
    /// * `last` - Sequential cursor (last primary published)
    ///
    /// # Returns
    ///
    /// The chosen id, or `SelectionExhausted` when the pool is empty
    pub fn select(
        &mut self,
        all: &[String],
        recent: &[String],
        last: Option<&str>,
    ) -> SchedulerResult<String> {
        let chosen = match self.mode {
            RotationMode::Random => select_random(all, recent, &mut self.rng),
            RotationMode::Sequential => {
                let mut sorted = all.to_vec();
                sorted.sort();
                select_sequential(&sorted, last)
            }
        };

        chosen.ok_or_else(|| SchedulerError::exhausted(Category::Primary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rotation_mode_from_str() {
        assert_eq!("random".parse::<RotationMode>().unwrap(), RotationMode::Random);
        assert_eq!(
            "Sequential".parse::<RotationMode>().unwrap(),
            RotationMode::Sequential
        );
        assert!("shuffle".parse::<RotationMode>().is_err());
    }

    #[test]
    fn test_select_random_avoids_recent() {
        let all = ids(&["a.txt", "b.txt", "c.txt"]);
        let recent = ids(&["a.txt", "b.txt"]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..20 {
            assert_eq!(select_random(&all, &recent, &mut rng).unwrap(), "c.txt");
        }
    }

    #[test]
    fn test_select_random_falls_back_to_full_pool() {
        let all = ids(&["a.txt", "b.txt"]);
        let recent = ids(&["a.txt", "b.txt"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let chosen = select_random(&all, &recent, &mut rng).unwrap();
        assert_eq!(chosen, "a.txt");
    }

    #[test]
    fn test_fallback_skips_ids_gone_from_pool() {
        let all = ids(&["b.txt", "c.txt"]);
        let recent = ids(&["a.txt", "c.txt", "b.txt"]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        assert_eq!(select_random(&all, &recent, &mut rng).unwrap(), "c.txt");
    }

    #[test]
    fn test_pool_equal_to_window_never_repeats() {
        let all = ids(&["a.txt", "b.txt", "c.txt"]);
        let mut recent = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut picks: Vec<String> = Vec::new();

        for _ in 0..12 {
            let chosen = select_random(&all, &recent, &mut rng).unwrap();
            let tail = picks.len().saturating_sub(2);
            assert!(!picks[tail..].contains(&chosen));
            push_recent(&mut recent, &chosen, 3);
            picks.push(chosen);
        }
    }

    #[test]
    fn test_select_random_empty_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(select_random(&[], &[], &mut rng).is_none());
    }

    #[test]
    fn test_select_sequential() {
        let sorted = ids(&["a.txt", "b.txt", "c.txt"]);

        assert_eq!(select_sequential(&sorted, None).unwrap(), "a.txt");
        assert_eq!(select_sequential(&sorted, Some("a.txt")).unwrap(), "b.txt");
        assert_eq!(select_sequential(&sorted, Some("c.txt")).unwrap(), "a.txt");
        assert_eq!(select_sequential(&sorted, Some("gone.txt")).unwrap(), "a.txt");
        assert!(select_sequential(&[], Some("a.txt")).is_none());
    }

    #[test]
    fn test_push_recent_evicts_oldest() {
        let mut window = Vec::new();
        for id in ["a", "b", "c", "d"] {
            push_recent(&mut window, id, 3);
        }
        assert_eq!(window, ids(&["b", "c", "d"]));

        push_recent(&mut window, "c", 3);
        assert_eq!(window, ids(&["b", "d", "c"]));
    }

    #[test]
    fn test_selector_is_reproducible() {
        let all = ids(&["a", "b", "c", "d", "e", "f", "g"]);
        let mut first = RotationSelector::with_seed(RotationMode::Random, 42);
        let mut second = RotationSelector::with_seed(RotationMode::Random, 42);

        for _ in 0..10 {
            assert_eq!(
                first.select(&all, &[], None).unwrap(),
                second.select(&all, &[], None).unwrap()
            );
        }
    }

    #[test]
    fn test_selector_sequential_sorts_pool() {
        let all = ids(&["c.txt", "a.txt", "b.txt"]);
        let mut selector = RotationSelector::with_seed(RotationMode::Sequential, 0);

        assert_eq!(selector.select(&all, &[], Some("a.txt")).unwrap(), "b.txt");
    }

    #[test]
    fn test_selector_exhausted() {
        let mut selector = RotationSelector::with_seed(RotationMode::Random, 0);
        let err = selector.select(&[], &[], None).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::SelectionExhausted {
                category: Category::Primary
            }
        ));
    }
}
