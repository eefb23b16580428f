//! Hint resolution
//!
//! Two strategies behind one trait: a local spatial index queried by
//! direction-aligned range, and a remote lookup that returns
//! distance-annotated candidates and compensates for missed minus signs with
//! a bounded coordinate-sign-flip retry loop.
//!
//! Both build the same match table: the folded hint key resolved exactly
//! first, then through every contiguous word subsequence of each known name
//! (OCR drops leading or trailing words often enough to make this worth it),
//! then through a fuzzy edit-distance pass as a last resort.

use std::collections::HashMap;

use anyhow::Result;
use strsim::normalized_levenshtein;
use tracing::{debug, info, warn};

use super::normalize;
use super::{Direction, Hint, Position};
use crate::storage::index::HintIndex;

/// Resolves a hint to a target position, or `None` when nothing matches.
pub trait HintResolver {
    fn resolve(
        &self,
        current: Position,
        direction: Direction,
        hint: &Hint,
    ) -> Result<Option<Position>>;
}

/// Lookup table from normalized place names to a value (a position in
/// spatial-index mode, a reported distance in remote mode).
///
/// `partial` maps every contiguous word subsequence of a name back to the
/// full name key; when two names share a subsequence the first insertion
/// wins, which keeps the fallback deterministic.
pub struct MatchTable<V> {
    exact: HashMap<String, V>,
    partial: HashMap<String, String>,
}

impl<V> MatchTable<V> {
    pub fn new() -> Self {
        Self {
            exact: HashMap::new(),
            partial: HashMap::new(),
        }
    }

    /// Insert a candidate under its folded name key. When the key already
    /// holds a value, `better(new, old)` decides whether to replace it.
    pub fn insert_with(&mut self, name: &str, value: V, better: impl Fn(&V, &V) -> bool) {
        let key = normalize::normalize_key(name);
        if key.is_empty() {
            return;
        }

        match self.exact.get(&key) {
            Some(old) if !better(&value, old) => return,
            _ => {}
        }
        self.exact.insert(key.clone(), value);

        let words: Vec<&str> = key.split_whitespace().collect();
        for len in 1..=words.len() {
            for start in 0..=(words.len() - len) {
                let partial_key = words[start..start + len].join(" ");
                self.partial.entry(partial_key).or_insert_with(|| key.clone());
            }
        }
    }

    /// Exact match first, then the word-subsequence fallback.
    pub fn lookup(&self, hint_key: &str) -> Option<&V> {
        if let Some(value) = self.exact.get(hint_key) {
            return Some(value);
        }
        self.partial
            .get(hint_key)
            .and_then(|full_name| self.exact.get(full_name))
    }

    /// Last-resort fuzzy match over the full name keys. Returns the best
    /// candidate scoring at least `threshold` normalized similarity.
    pub fn lookup_fuzzy(&self, hint_key: &str, threshold: f64) -> Option<&V> {
        if hint_key.is_empty() {
            return None;
        }
        let (best_key, best_score) = self
            .exact
            .keys()
            .map(|key| (key, normalized_levenshtein(hint_key, key)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        if best_score >= threshold {
            debug!("fuzzy match {hint_key:?} -> {best_key:?} ({best_score:.2})");
            self.exact.get(best_key)
        } else {
            None
        }
    }

    /// Full resolution order: exact, subsequence, then fuzzy when enabled.
    pub fn resolve(&self, hint_key: &str, fuzzy_threshold: Option<f64>) -> Option<&V> {
        self.lookup(hint_key)
            .or_else(|| fuzzy_threshold.and_then(|t| self.lookup_fuzzy(hint_key, t)))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

impl<V> Default for MatchTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial-index mode: candidates come from a range query against the local
/// SQLite index, 10 map units ahead of the current position.
pub struct IndexResolver<'a> {
    index: &'a HintIndex,
    window_span: i32,
    fuzzy_threshold: Option<f64>,
}

impl<'a> IndexResolver<'a> {
    pub fn new(index: &'a HintIndex, window_span: i32, fuzzy_threshold: Option<f64>) -> Self {
        Self {
            index,
            window_span,
            fuzzy_threshold,
        }
    }
}

impl HintResolver for IndexResolver<'_> {
    fn resolve(
        &self,
        current: Position,
        direction: Direction,
        hint: &Hint,
    ) -> Result<Option<Position>> {
        let candidates = self
            .index
            .candidates_ahead(current, direction, self.window_span)?;
        debug!(
            "index returned {} candidates ahead of {current} going {direction}",
            candidates.len()
        );

        let mut table: MatchTable<Position> = MatchTable::new();
        for candidate in &candidates {
            // The current tile itself is never a valid target.
            if candidate.position == current {
                continue;
            }
            // Duplicate place names are common; only the closest instance is
            // navigable as the active hint's target.
            table.insert_with(&candidate.name, candidate.position, |new, old| {
                new.distance(&current) < old.distance(&current)
            });
        }

        match table.resolve(hint.key(), self.fuzzy_threshold) {
            Some(target) => {
                info!("hint '{hint}' resolved to {target}");
                Ok(Some(*target))
            }
            None => {
                warn!("no index match for hint '{hint}'");
                Ok(None)
            }
        }
    }
}

/// One distance-annotated grouping from the remote lookup: all points of
/// interest on a map that lies `distance` units ahead.
#[derive(Debug, Clone)]
pub struct PoiGroup {
    pub distance: i32,
    pub names: Vec<String>,
}

/// Fetches the candidate set for a probe position. Implemented by the HTTP
/// client; tests substitute a scripted fake.
pub trait DistanceFetcher {
    fn fetch(&self, probe: Position, direction: Direction) -> Result<Vec<PoiGroup>>;
}

/// Remote-lookup mode: candidates arrive already distance-annotated and the
/// set is rebuilt on every request.
///
/// OCR misses the minus sign on small coordinate glyphs often enough that a
/// miss triggers sign-guessing retries: flip x, then y, then x again, each a
/// full fetch+resolve round trip against the flipped probe.
pub struct RemoteResolver<F> {
    fetcher: F,
    max_sign_retries: u32,
    fuzzy_threshold: Option<f64>,
}

impl<F: DistanceFetcher> RemoteResolver<F> {
    pub fn new(fetcher: F, max_sign_retries: u32, fuzzy_threshold: Option<f64>) -> Self {
        Self {
            fetcher,
            max_sign_retries,
            fuzzy_threshold,
        }
    }

    fn try_probe(&self, probe: Position, direction: Direction, hint: &Hint) -> Option<i32> {
        let groups = match self.fetcher.fetch(probe, direction) {
            Ok(groups) => groups,
            Err(err) => {
                // Transport failures degrade to a miss for this attempt.
                warn!("remote lookup failed at {probe}: {err:#}");
                return None;
            }
        };

        let mut table: MatchTable<i32> = MatchTable::new();
        for group in &groups {
            for name in &group.names {
                // Same name on several maps: keep the smaller distance.
                table.insert_with(name, group.distance, |new, old| new < old);
            }
        }
        if table.is_empty() {
            debug!("lookup at {probe} returned no named candidates");
            return None;
        }

        table.resolve(hint.key(), self.fuzzy_threshold).copied()
    }
}

impl<F: DistanceFetcher> HintResolver for RemoteResolver<F> {
    fn resolve(
        &self,
        current: Position,
        direction: Direction,
        hint: &Hint,
    ) -> Result<Option<Position>> {
        let mut probe = current;

        for attempt in 0..=self.max_sign_retries {
            if attempt > 0 {
                // Sign order x, y, x: after three flips every sign
                // combination of the original capture has been probed.
                probe = if attempt % 2 == 1 {
                    probe.flip_x()
                } else {
                    probe.flip_y()
                };
                info!("retry {attempt}: probing {probe}");
            }

            if let Some(distance) = self.try_probe(probe, direction, hint) {
                // The reported distance offsets the probe that produced the
                // match, not the original capture.
                let target = probe.step(direction, distance);
                info!("hint '{hint}' resolved to {target} (distance {distance})");
                return Ok(Some(target));
            }
        }

        warn!(
            "no remote match for hint '{hint}' after {} sign retries",
            self.max_sign_retries
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::index::HintIndex;
    use std::cell::RefCell;

    fn hint(text: &str) -> Hint {
        Hint::from_ocr(text)
    }

    #[test]
    fn exact_match_wins_over_partial() {
        let mut table: MatchTable<i32> = MatchTable::new();
        table.insert_with("Grotte", 1, |_, _| false);
        table.insert_with("Grotte des Brigandins", 2, |_, _| false);
        assert_eq!(table.lookup("Grotte"), Some(&1));
    }

    #[test]
    fn partial_match_falls_back_to_full_name() {
        let mut table: MatchTable<i32> = MatchTable::new();
        table.insert_with("Taverne du Chêne Bourru", 7, |_, _| false);
        assert_eq!(table.lookup("Chene Bourru"), Some(&7));
        assert_eq!(table.lookup("Taverne"), Some(&7));
        assert_eq!(table.lookup("du Chene"), Some(&7));
        // Non-contiguous subsequences never match.
        assert_eq!(table.lookup("Taverne Bourru"), None);
    }

    #[test]
    fn accents_fold_on_both_sides() {
        let mut table: MatchTable<i32> = MatchTable::new();
        table.insert_with("Forêt d'Émeraude", 3, |_, _| false);
        assert_eq!(table.lookup(hint("Foret dEmeraude").key()), Some(&3));
    }

    #[test]
    fn fuzzy_lookup_tolerates_a_misread_glyph() {
        let mut table: MatchTable<i32> = MatchTable::new();
        table.insert_with("Moulin des Pissenlits", 4, |_, _| false);
        assert_eq!(table.lookup_fuzzy("Moulin des Pissenlit5", 0.84), Some(&4));
        assert_eq!(table.lookup_fuzzy("Village englouti", 0.84), None);
    }

    fn index_from(json: &str) -> HintIndex {
        let index = HintIndex::open_in_memory().unwrap();
        index.load_dataset_str(json).unwrap();
        index
    }

    // current=(2,3), DOWN, Grotte at (2,7) and (2,9): the closer wins.
    #[test]
    fn index_mode_prefers_the_closer_duplicate() {
        let index = index_from(
            r#"{
                "clues": [{"clue-id": 1, "name": "Grotte"}],
                "maps": {
                    "a": {"position": {"x": 2, "y": 7}, "clues": [1]},
                    "b": {"position": {"x": 2, "y": 9}, "clues": [1]}
                }
            }"#,
        );
        let resolver = IndexResolver::new(&index, 10, None);
        let target = resolver
            .resolve(Position::new(2, 3), Direction::Down, &hint("Grotte"))
            .unwrap();
        assert_eq!(target, Some(Position::new(2, 7)));
    }

    #[test]
    fn index_mode_never_returns_the_current_position() {
        let index = index_from(
            r#"{
                "clues": [{"clue-id": 1, "name": "Puits"}],
                "maps": {
                    "here": {"position": {"x": 4, "y": 4}, "clues": [1]},
                    "ahead": {"position": {"x": 4, "y": 8}, "clues": [1]}
                }
            }"#,
        );
        let resolver = IndexResolver::new(&index, 10, None);
        let target = resolver
            .resolve(Position::new(4, 4), Direction::Down, &hint("Puits"))
            .unwrap();
        assert_eq!(target, Some(Position::new(4, 8)));
    }

    #[test]
    fn index_mode_misses_cleanly() {
        let index = index_from(
            r#"{
                "clues": [{"clue-id": 1, "name": "Grotte"}],
                "maps": {"a": {"position": {"x": 2, "y": 7}, "clues": [1]}}
            }"#,
        );
        let resolver = IndexResolver::new(&index, 10, None);
        let target = resolver
            .resolve(Position::new(2, 3), Direction::Down, &hint("Statue"))
            .unwrap();
        assert_eq!(target, None);
    }

    /// Scripted fetcher: responds per probe position, records the probes.
    struct ScriptedFetcher {
        responses: HashMap<Position, Vec<PoiGroup>>,
        probes: RefCell<Vec<Position>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<(Position, Vec<PoiGroup>)>) -> Self {
            Self {
                responses: responses.into_iter().collect(),
                probes: RefCell::new(Vec::new()),
            }
        }
    }

    impl DistanceFetcher for ScriptedFetcher {
        fn fetch(&self, probe: Position, _direction: Direction) -> Result<Vec<PoiGroup>> {
            self.probes.borrow_mut().push(probe);
            Ok(self.responses.get(&probe).cloned().unwrap_or_default())
        }
    }

    fn group(distance: i32, names: &[&str]) -> PoiGroup {
        PoiGroup {
            distance,
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    // current=(5,5), RIGHT, Mine at distance 4: target (9,5).
    #[test]
    fn remote_mode_applies_distance_along_the_axis() {
        let fetcher = ScriptedFetcher::new(vec![(
            Position::new(5, 5),
            vec![group(4, &["Mine"])],
        )]);
        let resolver = RemoteResolver::new(fetcher, 3, None);
        let target = resolver
            .resolve(Position::new(5, 5), Direction::Right, &hint("Mine"))
            .unwrap();
        assert_eq!(target, Some(Position::new(9, 5)));
    }

    #[test]
    fn remote_mode_keeps_the_smaller_distance_on_collision() {
        let fetcher = ScriptedFetcher::new(vec![(
            Position::new(0, 0),
            vec![group(8, &["Statue"]), group(3, &["Statue"])],
        )]);
        let resolver = RemoteResolver::new(fetcher, 0, None);
        let target = resolver
            .resolve(Position::new(0, 0), Direction::Down, &hint("Statue"))
            .unwrap();
        assert_eq!(target, Some(Position::new(0, 3)));
    }

    // Miss at (4,4), match after the x flip at (-4,4): UP with distance 2
    // lands on (-4,2), computed from the retried coordinate.
    #[test]
    fn sign_flip_retry_offsets_the_flipped_probe() {
        let fetcher = ScriptedFetcher::new(vec![
            (Position::new(4, 4), vec![]),
            (Position::new(-4, 4), vec![group(2, &["Puits"])]),
        ]);
        let resolver = RemoteResolver::new(fetcher, 3, None);
        let target = resolver
            .resolve(Position::new(4, 4), Direction::Up, &hint("Puits"))
            .unwrap();
        assert_eq!(target, Some(Position::new(-4, 2)));
    }

    #[test]
    fn retries_walk_every_sign_combination_then_give_up() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let resolver = RemoteResolver::new(fetcher, 3, None);
        let target = resolver
            .resolve(Position::new(4, 4), Direction::Up, &hint("Puits"))
            .unwrap();
        assert_eq!(target, None);
        assert_eq!(
            *resolver.fetcher.probes.borrow(),
            vec![
                Position::new(4, 4),
                Position::new(-4, 4),
                Position::new(-4, -4),
                Position::new(4, -4),
            ]
        );
    }

    #[test]
    fn transport_failure_counts_as_a_miss_not_a_crash() {
        struct FailingFetcher;
        impl DistanceFetcher for FailingFetcher {
            fn fetch(&self, _: Position, _: Direction) -> Result<Vec<PoiGroup>> {
                anyhow::bail!("connection refused")
            }
        }
        let resolver = RemoteResolver::new(FailingFetcher, 1, None);
        let target = resolver
            .resolve(Position::new(1, 1), Direction::Left, &hint("Mine"))
            .unwrap();
        assert_eq!(target, None);
    }
}
