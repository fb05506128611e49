/// Turn-based spawning.
///
/// A spawn table is a list of categories; each category holds weighted
/// rules and a single "next eligible turn". When a category comes due,
/// one rule is drawn by weight, its entity is spawned, and the category's
/// next turn is sampled from that rule's `[min_turns, max_turns]`.
///
/// `FixedSpawner` is the simpler alternative: an enemy + pickup pair every
/// N player moves. Only one of the two drives a game (see `SpawnMode`).

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use super::cell::Pos;
use super::entity::EnemyKind;
use super::grid::Grid;
use crate::error::{Result, SetupError};

const EMBEDDED_TABLE: &str = include_str!("../../data/spawn.json");

/// Entity type tag as written in the spawn document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize)]
pub enum SpawnKind {
    #[serde(alias = "walker", alias = "enemy", alias = "Zombie")]
    Walker,
    #[serde(alias = "runner", alias = "fast_enemy", alias = "FastZombie")]
    Runner,
    #[serde(alias = "brute", alias = "strong_enemy", alias = "BigZombie")]
    Brute,
    #[serde(alias = "pickup", alias = "bullet", alias = "Bullet")]
    Pickup,
}

impl SpawnKind {
    pub fn enemy_kind(self) -> Option<EnemyKind> {
        match self {
            SpawnKind::Walker => Some(EnemyKind::Walker),
            SpawnKind::Runner => Some(EnemyKind::Runner),
            SpawnKind::Brute => Some(EnemyKind::Brute),
            SpawnKind::Pickup => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRule {
    #[serde(alias = "EntityType")]
    pub entity_type: SpawnKind,
    #[serde(alias = "MinTurns")]
    pub min_turns: u32,
    #[serde(alias = "MaxTurns")]
    pub max_turns: u32,
    #[serde(alias = "Weight")]
    pub weight: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpawnCategory {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Rules", default)]
    pub rules: Vec<SpawnRule>,
    #[serde(skip)]
    next_turn: u64,
}

impl SpawnCategory {
    #[cfg(test)]
    pub fn new(name: &str, rules: Vec<SpawnRule>) -> Self {
        SpawnCategory { name: name.to_string(), rules, next_turn: 0 }
    }

    pub fn next_turn(&self) -> u64 {
        self.next_turn
    }

    pub fn can_spawn(&self, turn: u64) -> bool {
        self.next_turn <= turn
    }

    pub fn total_weight(&self) -> f32 {
        self.rules.iter().map(|r| r.weight).sum()
    }

    /// Cumulative-weight scan: the first positive-weight rule whose running
    /// sum reaches `draw`. `draw` is expected in `[0, total_weight)`.
    pub fn select(&self, draw: f32) -> Option<SpawnRule> {
        let mut cumulative = 0.0;
        for rule in &self.rules {
            if rule.weight <= 0.0 {
                continue;
            }
            cumulative += rule.weight;
            if cumulative >= draw {
                return Some(*rule);
            }
        }
        None
    }

    /// Draw a rule by weight. `None` for an empty or all-zero category.
    pub fn pick_weighted<R: Rng>(&self, rng: &mut R) -> Option<SpawnRule> {
        let total = self.total_weight();
        if total <= 0.0 {
            return None;
        }
        self.select(rng.gen_range(0.0..total))
    }

    pub fn schedule_next<R: Rng>(&mut self, rule: &SpawnRule, turn: u64, rng: &mut R) {
        let interval = rng.gen_range(rule.min_turns..=rule.max_turns);
        self.next_turn = turn + u64::from(interval);
    }

    /// Reschedule as if the game just started, using the first rule.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        match self.rules.first().copied() {
            Some(rule) => self.schedule_next(&rule, 0, rng),
            None => self.next_turn = 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpawnTable {
    #[serde(alias = "Categories", default)]
    pub categories: Vec<SpawnCategory>,
}

impl SpawnTable {
    /// Parse and validate a JSON spawn document.
    pub fn parse(json: &str) -> Result<Self> {
        let table: SpawnTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| SetupError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    /// The table shipped with the binary.
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_TABLE)
    }

    fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(SetupError::NoSpawnCategories);
        }
        for cat in &self.categories {
            for rule in &cat.rules {
                let reason = if !rule.weight.is_finite() || rule.weight < 0.0 {
                    Some(format!("weight {} must be a finite number >= 0", rule.weight))
                } else if rule.min_turns > rule.max_turns {
                    Some(format!("minTurns {} exceeds maxTurns {}", rule.min_turns, rule.max_turns))
                } else {
                    None
                };
                if let Some(reason) = reason {
                    return Err(SetupError::InvalidRule {
                        category: cat.name.clone(),
                        entity: format!("{:?}", rule.entity_type),
                        reason,
                    });
                }
            }
            // the weighted draw needs a finite range
            if !cat.total_weight().is_finite() {
                return Err(SetupError::WeightOverflow(cat.name.clone()));
            }
        }
        Ok(())
    }

    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        for cat in &mut self.categories {
            cat.reset(rng);
            debug!(category = %cat.name, next_turn = cat.next_turn(), "spawn category rescheduled");
        }
    }

    /// Run one scheduling tick: every due category draws a rule and is
    /// rescheduled from it. Returns the kinds to spawn this turn, in
    /// category order.
    pub fn tick<R: Rng>(&mut self, turn: u64, rng: &mut R) -> Vec<SpawnKind> {
        let mut due = Vec::new();
        for cat in &mut self.categories {
            if !cat.can_spawn(turn) {
                continue;
            }
            let Some(rule) = cat.pick_weighted(rng) else { continue };
            cat.schedule_next(&rule, turn, rng);
            debug!(
                category = %cat.name, kind = ?rule.entity_type, turn,
                next_turn = cat.next_turn(), "spawn rule drawn"
            );
            due.push(rule.entity_type);
        }
        due
    }
}

/// Fixed-interval spawner: fires once every `delay` player moves.
#[derive(Clone, Debug)]
pub struct FixedSpawner {
    delay: u32,
    countdown: u32,
}

impl FixedSpawner {
    pub fn new(delay: u32) -> Self {
        let delay = delay.max(1);
        FixedSpawner { delay, countdown: delay }
    }

    pub fn reset(&mut self) {
        self.countdown = self.delay;
    }

    /// Count one player move. True when a pair should spawn.
    pub fn tick(&mut self) -> bool {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.delay;
            true
        } else {
            false
        }
    }
}

/// Pick a random free cell that is at least `min_distance` from `player`
/// on either axis. `None` when no cell qualifies.
pub fn find_spawn_cell<R: Rng>(grid: &Grid, player: Pos, min_distance: i32, rng: &mut R) -> Option<Pos> {
    let candidates: Vec<Pos> = grid
        .positions()
        .filter(|&p| grid.cell(p).is_free() && p.far_from(player, min_distance))
        .collect();
    candidates.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Cell;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rule(kind: SpawnKind, min: u32, max: u32, weight: f32) -> SpawnRule {
        SpawnRule { entity_type: kind, min_turns: min, max_turns: max, weight }
    }

    #[test]
    fn weighted_selection_converges_to_weights() {
        let cat = SpawnCategory::new("enemies", vec![
            rule(SpawnKind::Walker, 1, 1, 1.0),
            rule(SpawnKind::Runner, 1, 1, 1.0),
            rule(SpawnKind::Brute, 1, 1, 2.0),
        ]);
        let total = cat.total_weight();
        let n = 4000;
        let mut counts = [0usize; 3];
        for i in 0..n {
            let draw = total * i as f32 / n as f32;
            match cat.select(draw).map(|r| r.entity_type) {
                Some(SpawnKind::Walker) => counts[0] += 1,
                Some(SpawnKind::Runner) => counts[1] += 1,
                Some(SpawnKind::Brute) => counts[2] += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
        let share = |c: usize| c as f64 / n as f64;
        assert!((share(counts[0]) - 0.25).abs() < 0.01, "{counts:?}");
        assert!((share(counts[1]) - 0.25).abs() < 0.01, "{counts:?}");
        assert!((share(counts[2]) - 0.50).abs() < 0.01, "{counts:?}");
    }

    #[test]
    fn random_pick_respects_weights() {
        let cat = SpawnCategory::new("enemies", vec![
            rule(SpawnKind::Walker, 1, 1, 1.0),
            rule(SpawnKind::Runner, 1, 1, 1.0),
            rule(SpawnKind::Brute, 1, 1, 2.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 20_000;
        let brutes = (0..n)
            .filter(|_| cat.pick_weighted(&mut rng).unwrap().entity_type == SpawnKind::Brute)
            .count();
        assert!((brutes as f64 / n as f64 - 0.5).abs() < 0.02);
    }

    #[test]
    fn zero_weight_never_selected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let all_zero = SpawnCategory::new("none", vec![rule(SpawnKind::Walker, 1, 2, 0.0)]);
        assert_eq!(all_zero.pick_weighted(&mut rng), None);
        assert_eq!(SpawnCategory::new("empty", vec![]).pick_weighted(&mut rng), None);

        let mixed = SpawnCategory::new("mixed", vec![
            rule(SpawnKind::Walker, 1, 2, 0.0),
            rule(SpawnKind::Pickup, 1, 2, 3.0),
        ]);
        assert_eq!(mixed.select(0.0).map(|r| r.entity_type), Some(SpawnKind::Pickup));
        for _ in 0..200 {
            assert_eq!(mixed.pick_weighted(&mut rng).unwrap().entity_type, SpawnKind::Pickup);
        }
    }

    #[test]
    fn schedule_next_samples_inclusive_interval() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let r = rule(SpawnKind::Walker, 2, 4, 1.0);
        let mut cat = SpawnCategory::new("enemies", vec![r]);
        let mut seen = [false; 3];
        for _ in 0..300 {
            cat.schedule_next(&r, 10, &mut rng);
            let delay = cat.next_turn() - 10;
            assert!((2..=4).contains(&delay));
            seen[(delay - 2) as usize] = true;
        }
        assert_eq!(seen, [true, true, true]);
        assert!(!cat.can_spawn(11));
        assert!(cat.can_spawn(cat.next_turn()));
    }

    #[test]
    fn tick_spawns_due_categories_and_reschedules() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut table = SpawnTable {
            categories: vec![
                SpawnCategory::new("enemies", vec![rule(SpawnKind::Runner, 3, 3, 1.0)]),
                SpawnCategory::new("pickups", vec![rule(SpawnKind::Pickup, 5, 5, 1.0)]),
            ],
        };
        table.reset(&mut rng);
        assert_eq!(table.categories[0].next_turn(), 3);
        assert_eq!(table.categories[1].next_turn(), 5);

        assert!(table.tick(2, &mut rng).is_empty());
        assert_eq!(table.tick(3, &mut rng), vec![SpawnKind::Runner]);
        assert_eq!(table.categories[0].next_turn(), 6);
        assert_eq!(table.tick(5, &mut rng), vec![SpawnKind::Pickup]);
        assert_eq!(table.tick(6, &mut rng), vec![SpawnKind::Runner]);
    }

    #[test]
    fn parses_camel_and_pascal_case() {
        let camel = r#"{"categories":[{"name":"e","rules":[
            {"entityType":"FastZombie","minTurns":1,"maxTurns":2,"weight":0.5}]}]}"#;
        let pascal = r#"{"Categories":[{"Name":"e","Rules":[
            {"EntityType":"Runner","MinTurns":1,"MaxTurns":2,"Weight":0.5}]}]}"#;
        for doc in [camel, pascal] {
            let t = SpawnTable::parse(doc).unwrap();
            assert_eq!(t.categories[0].rules[0], rule(SpawnKind::Runner, 1, 2, 0.5));
        }
    }

    #[test]
    fn rejects_invalid_tables() {
        assert!(matches!(
            SpawnTable::parse(r#"{"categories":[]}"#),
            Err(SetupError::NoSpawnCategories)
        ));
        assert!(matches!(
            SpawnTable::parse(r#"{"categories":[{"name":"e","rules":[
                {"entityType":"Walker","minTurns":5,"maxTurns":2,"weight":1}]}]}"#),
            Err(SetupError::InvalidRule { .. })
        ));
        assert!(matches!(
            SpawnTable::parse(r#"{"categories":[{"name":"e","rules":[
                {"entityType":"Walker","minTurns":1,"maxTurns":2,"weight":-1}]}]}"#),
            Err(SetupError::InvalidRule { .. })
        ));
        assert!(matches!(
            SpawnTable::parse(r#"{"categories":[{"name":"e","rules":[
                {"entityType":"Dragon","minTurns":1,"maxTurns":2,"weight":1}]}]}"#),
            Err(SetupError::SpawnParse(_))
        ));
    }

    #[test]
    fn rejects_weights_that_sum_to_infinity() {
        // each weight is finite on its own
        let result = SpawnTable::parse(r#"{"categories":[{"name":"heavy","rules":[
            {"entityType":"Walker","minTurns":1,"maxTurns":2,"weight":3e38},
            {"entityType":"Runner","minTurns":1,"maxTurns":2,"weight":3e38}]}]}"#);
        assert!(matches!(result, Err(SetupError::WeightOverflow(ref name)) if name == "heavy"));
    }

    #[test]
    fn embedded_table_is_valid() {
        let t = SpawnTable::embedded().unwrap();
        assert!(!t.categories.is_empty());
    }

    #[test]
    fn placement_keeps_distance_and_avoids_occupants() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut g = Grid::new(10, 10);
        let player = Pos::new(5, 5);
        g.set_flag(player, Cell::PLAYER);
        g.set_flag(Pos::new(1, 1), Cell::ENEMY);
        for _ in 0..200 {
            let p = find_spawn_cell(&g, player, 3, &mut rng).unwrap();
            assert!(p.far_from(player, 3));
            assert!(g.cell(p).is_free());
        }
    }

    #[test]
    fn placement_fails_softly_when_nothing_qualifies() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // 5x5 interior is 3x3; nothing is 3 tiles from the center on any axis
        let g = Grid::new(5, 5);
        assert_eq!(find_spawn_cell(&g, Pos::new(2, 2), 3, &mut rng), None);
        assert!(find_spawn_cell(&g, Pos::new(2, 2), 1, &mut rng).is_some());
    }

    #[test]
    fn fixed_spawner_fires_every_delay() {
        let mut s = FixedSpawner::new(3);
        let fired: Vec<bool> = (0..6).map(|_| s.tick()).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true]);
        s.tick();
        s.reset();
        assert!(!s.tick());
    }
}
