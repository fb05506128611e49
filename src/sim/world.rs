/// World: the complete state of a running game.
///
/// ## Ownership
///
/// `grid` is the single authoritative occupancy map. Entities keep their
/// own positions and touch the grid only through `entity::move_to`,
/// `register` and `unregister`, so the grid never holds a back-pointer
/// and entities never hold the grid.
///
/// `level` is the geometry as loaded; never mutated. Restart rebuilds
/// `grid` from it.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::{GameConfig, RulesConfig, SpawnMode};
use crate::domain::cell::Pos;
use crate::domain::entity::{Enemy, EnemyKind, Occupant, Pickup, Player};
use crate::domain::grid::Grid;
use crate::domain::spawn::{self, FixedSpawner, SpawnTable};
use crate::error::{Result, SetupError};
use super::event::GameEvent;
use super::level::LevelDef;
use super::step;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Paused,
    GameOver,
}

/// The active spawning mechanism.
#[derive(Clone, Debug)]
pub enum Spawner {
    Weighted(SpawnTable),
    Fixed(FixedSpawner),
}

pub struct World {
    // ── Geometry ──
    pub level: LevelDef,
    pub grid: Grid,

    // ── Entities ──
    pub player: Player,
    /// Spawn order: index 0 is the longest-lived enemy.
    pub enemies: Vec<Enemy>,
    pub pickups: Vec<Pickup>,

    // ── Progress ──
    pub score: u32,
    pub turn: u64,
    pub phase: Phase,

    // ── Spawning ──
    pub spawner: Spawner,
    pub rules: RulesConfig,
    pub rng: ChaCha8Rng,
    next_id: u32,
}

// ── Construction ──

impl World {
    /// Build a world and run the initial reset.
    pub fn new(level: LevelDef, spawner: Spawner, rules: RulesConfig, rng: ChaCha8Rng) -> Result<Self> {
        level.validate()?;
        if let Spawner::Weighted(table) = &spawner {
            if table.categories.is_empty() {
                return Err(SetupError::NoSpawnCategories);
            }
        }

        let grid = level.build_grid();
        let player = Player::new(grid.center());
        let mut world = World {
            level,
            grid,
            player,
            enemies: vec![],
            pickups: vec![],
            score: 0,
            turn: 0,
            phase: Phase::Playing,
            spawner,
            rules,
            rng,
            next_id: 0,
        };
        step::restart(&mut world);
        Ok(world)
    }

    /// Load level + spawn table named by the config (or the built-ins).
    pub fn from_config(config: &GameConfig) -> Result<Self> {
        let level = match &config.level {
            Some(path) => LevelDef::load(path)?,
            None => LevelDef::embedded()?,
        };

        let spawner = match config.rules.spawn_mode {
            SpawnMode::Weighted => Spawner::Weighted(match &config.spawn_table {
                Some(path) => SpawnTable::load(path)?,
                None => SpawnTable::embedded()?,
            }),
            SpawnMode::Fixed => Spawner::Fixed(FixedSpawner::new(config.rules.fixed_spawn_delay)),
        };

        let seed = config.rules.seed.unwrap_or_else(rand::random);
        info!(level = %level.name, seed, mode = ?config.rules.spawn_mode, "world setup");

        World::new(level, spawner, config.rules.clone(), ChaCha8Rng::seed_from_u64(seed))
    }
}

// ── Entity bookkeeping ──

impl World {
    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(super) fn reset_ids(&mut self) {
        self.next_id = 0;
    }

    /// Register an enemy at a known position.
    pub fn add_enemy(&mut self, kind: EnemyKind, pos: Pos) -> u32 {
        let id = self.take_id();
        let enemy = Enemy::new(id, kind, pos);
        enemy.register(&mut self.grid);
        self.enemies.push(enemy);
        id
    }

    /// Register a pickup at a known position.
    pub fn add_pickup(&mut self, pos: Pos) -> u32 {
        let id = self.take_id();
        let pickup = Pickup { id, pos };
        pickup.register(&mut self.grid);
        self.pickups.push(pickup);
        id
    }

    /// Place an enemy on a random qualifying cell. `None` = no room.
    pub fn spawn_enemy(&mut self, kind: EnemyKind) -> Option<GameEvent> {
        let min = self.rules.enemy_min_distance;
        let pos = spawn::find_spawn_cell(&self.grid, self.player.pos, min, &mut self.rng);
        let Some(pos) = pos else {
            debug!(?kind, turn = self.turn, "no room to spawn enemy");
            return None;
        };
        let id = self.add_enemy(kind, pos);
        debug!(id, ?kind, ?pos, turn = self.turn, "enemy spawned");
        Some(GameEvent::EnemySpawned { id, kind, pos })
    }

    /// Place a pickup on a random qualifying cell. `None` = no room.
    pub fn spawn_pickup(&mut self) -> Option<GameEvent> {
        let min = self.rules.pickup_min_distance;
        let pos = spawn::find_spawn_cell(&self.grid, self.player.pos, min, &mut self.rng);
        let Some(pos) = pos else {
            debug!(turn = self.turn, "no room to spawn pickup");
            return None;
        };
        let id = self.add_pickup(pos);
        debug!(id, ?pos, turn = self.turn, "pickup spawned");
        Some(GameEvent::PickupSpawned { id, pos })
    }

    pub fn enemy_at(&self, pos: Pos) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.pos == pos)
    }
}
