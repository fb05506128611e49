/// The step function: advances the world by one player command.
///
/// Processing order for a move command:
///   1. Player move (walls and no-op moves are rejected; nothing else runs)
///   2. Turn counter (a fatal move still counts)
///   3. Player stepped onto an enemy → game over
///   4. Pickup consumption (removes the pickup and the nearest enemy)
///   5. Spawning (weighted table or fixed interval)
///   6. Enemy phase, in spawn order; after a catch the remaining
///      countdowns still tick but nobody moves
///
/// Confirm restarts from any phase. Pause toggles between Playing and
/// Paused. Cancel is handled by the front-end and is a no-op here.

use tracing::{debug, info, trace};

use crate::domain::cell::{Cell, Dir};
use crate::domain::entity::{move_to, EnemyKind, Occupant, Player};
use crate::domain::path::Pathfinder;
use crate::domain::spawn::SpawnKind;
use super::event::GameEvent;
use super::world::{Phase, Spawner, World};

/// One discrete player command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Confirm,
    Pause,
    Cancel,
}

impl Command {
    pub fn direction(self) -> Option<Dir> {
        match self {
            Command::MoveLeft => Some(Dir::Left),
            Command::MoveRight => Some(Dir::Right),
            Command::MoveUp => Some(Dir::Up),
            Command::MoveDown => Some(Dir::Down),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut World, cmd: Command) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();

    match cmd {
        Command::Confirm => return restart(world),
        Command::Pause => {
            toggle_pause(world, &mut events);
            return events;
        }
        Command::Cancel => return events,
        _ => {}
    }

    if world.phase != Phase::Playing { return events; }
    let Some(dir) = cmd.direction() else { return events };

    if !resolve_player_move(world, dir, &mut events) { return events; }
    world.turn += 1;
    if world.phase == Phase::GameOver { return events; }

    resolve_pickup(world, &mut events);
    resolve_spawns(world, &mut events);
    resolve_enemy_phase(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Pause
// ══════════════════════════════════════════════════════════════

fn toggle_pause(world: &mut World, events: &mut Vec<GameEvent>) {
    match world.phase {
        Phase::Playing => {
            world.phase = Phase::Paused;
            events.push(GameEvent::Paused);
        }
        Phase::Paused => {
            world.phase = Phase::Playing;
            events.push(GameEvent::Resumed);
        }
        Phase::GameOver => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

/// Returns false when the move was rejected and the turn must not advance.
fn resolve_player_move(world: &mut World, dir: Dir, events: &mut Vec<GameEvent>) -> bool {
    let from = world.player.pos;
    let to = from.offset(dir);
    if to == from || world.grid.cell(to).is_wall() { return false; }
    if !move_to(&mut world.player, &mut world.grid, to) { return false; }

    trace!(?from, ?to, turn = world.turn, "player moved");
    events.push(GameEvent::PlayerMoved { from, to });

    if let Some(by) = world.enemy_at(to).map(|e| e.id) {
        game_over(world, by, events);
    }
    true
}

/// Standing on a pickup spends it on the enemy closest to the player.
/// With no enemy around the pickup stays where it is.
fn resolve_pickup(world: &mut World, events: &mut Vec<GameEvent>) {
    let at = world.player.pos;
    if !world.grid.cell_has_any(at, Cell::PICKUP) { return; }

    let Some(pi) = world.pickups.iter().position(|p| p.pos == at) else { return };
    // (distance, index) keeps the earliest spawned enemy on ties
    let Some(ei) = world
        .enemies
        .iter()
        .enumerate()
        .min_by_key(|(i, e)| (e.pos.manhattan(at), *i))
        .map(|(i, _)| i)
    else {
        return;
    };

    let pickup = world.pickups.remove(pi);
    pickup.unregister(&mut world.grid);
    let enemy = world.enemies.remove(ei);
    enemy.unregister(&mut world.grid);
    world.score += world.rules.reward;

    info!(pickup = pickup.id, enemy = enemy.id, score = world.score, "pickup consumed");
    events.push(GameEvent::PickupConsumed { id: pickup.id, pos: pickup.pos });
    events.push(GameEvent::EnemyEliminated { id: enemy.id, pos: enemy.pos });
    events.push(GameEvent::ScoreChanged { score: world.score });
}

// ══════════════════════════════════════════════════════════════
// Spawning
// ══════════════════════════════════════════════════════════════

fn resolve_spawns(world: &mut World, events: &mut Vec<GameEvent>) {
    let due: Vec<SpawnKind> = match &mut world.spawner {
        Spawner::Weighted(table) => table.tick(world.turn, &mut world.rng),
        Spawner::Fixed(fixed) => {
            if fixed.tick() {
                vec![SpawnKind::Walker, SpawnKind::Pickup]
            } else {
                vec![]
            }
        }
    };

    for kind in due {
        let ev = match kind.enemy_kind() {
            Some(enemy) => world.spawn_enemy(enemy),
            None => world.spawn_pickup(),
        };
        events.extend(ev);
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemy_phase(world: &mut World, events: &mut Vec<GameEvent>) {
    for i in 0..world.enemies.len() {
        // tick first so every countdown advances, even after a catch
        if !world.enemies[i].tick_countdown() || world.phase != Phase::Playing { continue; }

        for _ in 0..world.enemies[i].move_span {
            let from = world.enemies[i].pos;
            let target = world.player.pos;
            let next = Pathfinder::new(&world.grid).next_step(from, target);
            if next == from { break; }
            if !move_to(&mut world.enemies[i], &mut world.grid, next) { break; }

            let id = world.enemies[i].id;
            trace!(id, ?from, to = ?next, "enemy moved");
            events.push(GameEvent::EnemyMoved { id, from, to: next });

            if next == target {
                game_over(world, id, events);
                break;
            }
        }
    }
}

fn game_over(world: &mut World, by: u32, events: &mut Vec<GameEvent>) {
    world.phase = Phase::GameOver;
    let pos = world.player.pos;
    info!(by, ?pos, turn = world.turn, score = world.score, "player caught");
    events.push(GameEvent::PlayerCaught { by, pos });
}

// ══════════════════════════════════════════════════════════════
// Restart
// ══════════════════════════════════════════════════════════════

/// Put the world back to its starting state: fresh grid, player at the
/// center, counters zeroed, spawners rescheduled, initial spawns placed.
pub fn restart(world: &mut World) -> Vec<GameEvent> {
    let mut events = vec![GameEvent::Restarted];

    world.grid = world.level.build_grid();
    world.enemies.clear();
    world.pickups.clear();
    world.reset_ids();

    world.player = Player::new(world.grid.center());
    world.player.register(&mut world.grid);

    world.score = 0;
    world.turn = 0;
    world.phase = Phase::Playing;

    match &mut world.spawner {
        Spawner::Weighted(table) => table.reset(&mut world.rng),
        Spawner::Fixed(fixed) => fixed.reset(),
    }

    for _ in 0..world.rules.initial_enemies {
        events.extend(world.spawn_enemy(EnemyKind::Walker));
    }
    for _ in 0..world.rules.initial_pickups {
        events.extend(world.spawn_pickup());
    }
    events.push(GameEvent::ScoreChanged { score: 0 });

    debug!(
        enemies = world.enemies.len(), pickups = world.pickups.len(),
        "world restarted"
    );
    events
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::config::{GameConfig, RulesConfig};
    use crate::domain::cell::Pos;
    use crate::domain::spawn::{FixedSpawner, SpawnCategory, SpawnRule, SpawnTable};
    use crate::sim::level::LevelDef;

    fn bare_rules() -> RulesConfig {
        let mut rules = GameConfig::default().rules;
        rules.initial_enemies = 0;
        rules.initial_pickups = 0;
        rules
    }

    /// Weighted table whose only category comes due long after any test ends.
    fn dormant_table() -> SpawnTable {
        let rule = SpawnRule { entity_type: SpawnKind::Walker, min_turns: 1000, max_turns: 1000, weight: 1.0 };
        SpawnTable { categories: vec![SpawnCategory::new("enemies", vec![rule])] }
    }

    /// Open `size`x`size` arena, no initial entities, no spawning.
    fn quiet_world(size: usize) -> World {
        World::new(
            LevelDef::open(size, size),
            Spawner::Weighted(dormant_table()),
            bare_rules(),
            ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap()
    }

    fn enemy_moves(events: &[GameEvent]) -> usize {
        events.iter().filter(|e| matches!(e, GameEvent::EnemyMoved { .. })).count()
    }

    #[test]
    fn stepping_on_pickup_eliminates_enemy_and_scores() {
        let mut w = quiet_world(10);
        assert_eq!(w.player.pos, Pos::new(5, 5));
        w.add_pickup(Pos::new(6, 5));
        w.add_enemy(EnemyKind::Walker, Pos::new(1, 1));

        let events = step(&mut w, Command::MoveRight);

        assert_eq!(w.player.pos, Pos::new(6, 5));
        assert_eq!(w.score, 100);
        assert_eq!(w.turn, 1);
        assert!(w.enemies.is_empty());
        assert!(w.pickups.is_empty());
        assert!(!w.grid.cell_has_any(Pos::new(6, 5), Cell::PICKUP));
        assert!(w.grid.cell_has_any(Pos::new(6, 5), Cell::PLAYER));
        assert!(!w.grid.cell_has_any(Pos::new(1, 1), Cell::ENEMY));
        assert!(events.contains(&GameEvent::ScoreChanged { score: 100 }));
        assert!(events.iter().any(|e| matches!(e, GameEvent::EnemyEliminated { .. })));
    }

    #[test]
    fn pickup_takes_the_nearest_enemy() {
        let mut w = quiet_world(12);
        let c = w.player.pos;
        w.add_pickup(c.offset(Dir::Left));
        let far = w.add_enemy(EnemyKind::Walker, Pos::new(1, 1));
        let near = w.add_enemy(EnemyKind::Walker, Pos::new(c.x - 4, c.y));

        step(&mut w, Command::MoveLeft);

        let left: Vec<u32> = w.enemies.iter().map(|e| e.id).collect();
        assert_eq!(left, vec![far]);
        assert!(!left.contains(&near));
    }

    #[test]
    fn pickup_without_enemies_stays_put() {
        let mut w = quiet_world(10);
        w.add_pickup(Pos::new(4, 5));

        step(&mut w, Command::MoveLeft);
        assert_eq!(w.score, 0);
        assert_eq!(w.pickups.len(), 1);

        step(&mut w, Command::MoveLeft);
        assert!(w.grid.cell_has_any(Pos::new(4, 5), Cell::PICKUP));
        assert!(!w.grid.cell_has_any(Pos::new(4, 5), Cell::PLAYER));
    }

    #[test]
    fn blocked_move_does_not_advance_the_turn() {
        // 3x3: the only floor cell is the center
        let mut w = quiet_world(3);
        for cmd in [Command::MoveLeft, Command::MoveRight, Command::MoveUp, Command::MoveDown] {
            assert!(step(&mut w, cmd).is_empty());
        }
        assert_eq!(w.turn, 0);
        assert_eq!(w.player.pos, Pos::new(1, 1));
    }

    #[test]
    fn walking_into_an_enemy_then_restart() {
        let mut w = quiet_world(10);
        w.add_pickup(Pos::new(4, 5));
        w.add_enemy(EnemyKind::Walker, Pos::new(2, 5));
        let runner = w.add_enemy(EnemyKind::Runner, Pos::new(8, 5));

        // walker (distance 2) is spent, runner closes in
        step(&mut w, Command::MoveLeft);
        assert_eq!(w.score, 100);
        assert_eq!(w.enemies.len(), 1);
        assert_eq!(w.enemies[0].pos, Pos::new(7, 5));

        step(&mut w, Command::MoveRight);
        assert_eq!(w.enemies[0].pos, Pos::new(6, 5));
        assert_eq!(w.phase, Phase::Playing);

        let events = step(&mut w, Command::MoveRight);
        assert_eq!(w.phase, Phase::GameOver);
        assert!(events.contains(&GameEvent::PlayerCaught { by: runner, pos: Pos::new(6, 5) }));
        assert_eq!(enemy_moves(&events), 0);
        // the fatal move still counts as a turn
        assert_eq!(w.turn, 3);

        // moves are ignored once caught
        let turn = w.turn;
        assert!(step(&mut w, Command::MoveLeft).is_empty());
        assert_eq!(w.turn, turn);

        let events = step(&mut w, Command::Confirm);
        assert_eq!(events.first(), Some(&GameEvent::Restarted));
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!((w.score, w.turn), (0, 0));
        assert_eq!(w.player.pos, Pos::new(5, 5));
        assert!(w.enemies.is_empty() && w.pickups.is_empty());
        let flagged = w.grid.positions().filter(|&p| w.grid.cell_has_any(p, Cell::OCCUPIED)).count();
        // only the player is on the board
        assert_eq!(flagged, 1);
    }

    #[test]
    fn brute_moves_two_tiles_every_third_turn() {
        let mut w = quiet_world(12);
        let c = w.player.pos;
        w.add_enemy(EnemyKind::Brute, Pos::new(c.x + 4, c.y));

        assert_eq!(enemy_moves(&step(&mut w, Command::MoveUp)), 0);
        assert_eq!(enemy_moves(&step(&mut w, Command::MoveDown)), 0);
        let events = step(&mut w, Command::MoveUp);
        assert_eq!(enemy_moves(&events), 2);
        assert_eq!(w.enemies[0].pos.manhattan(w.player.pos), 3);
    }

    #[test]
    fn catch_ends_the_enemy_phase_early() {
        let mut w = quiet_world(10);
        w.add_enemy(EnemyKind::Brute, Pos::new(7, 5));
        let runner = w.add_enemy(EnemyKind::Runner, Pos::new(1, 8));
        let walker = w.add_enemy(EnemyKind::Walker, Pos::new(1, 1));

        step(&mut w, Command::MoveRight); // (6,5), brute 1/3, walker 1/2
        step(&mut w, Command::MoveLeft); // (5,5), brute 2/3, walker moves
        let events = step(&mut w, Command::MoveRight); // brute steps onto (6,5)

        assert_eq!(w.phase, Phase::GameOver);
        assert_eq!(w.turn, 3);
        assert_eq!(enemy_moves(&events), 1);
        // later enemies do not move
        assert!(!events.iter().any(|e| matches!(e, GameEvent::EnemyMoved { id, .. } if *id == runner)));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::EnemyMoved { id, .. } if *id == walker)));
        // but their countdowns still advanced: walker went 2 -> 1 on the catch turn
        let walker = w.enemies.iter().find(|e| e.id == walker).unwrap();
        assert_eq!(walker.move_countdown, 1);
    }

    #[test]
    fn pause_blocks_moves_and_is_ignored_after_game_over() {
        let mut w = quiet_world(10);
        assert_eq!(step(&mut w, Command::Pause), vec![GameEvent::Paused]);
        assert_eq!(w.phase, Phase::Paused);
        assert!(step(&mut w, Command::MoveLeft).is_empty());
        assert_eq!(w.turn, 0);
        assert_eq!(step(&mut w, Command::Pause), vec![GameEvent::Resumed]);
        assert_eq!(w.phase, Phase::Playing);

        w.phase = Phase::GameOver;
        assert!(step(&mut w, Command::Pause).is_empty());
        assert_eq!(w.phase, Phase::GameOver);
        assert!(step(&mut w, Command::Cancel).is_empty());
    }

    #[test]
    fn fixed_spawner_places_a_pair_every_delay() {
        let mut rules = bare_rules();
        rules.fixed_spawn_delay = 2;
        let mut w = World::new(
            LevelDef::open(10, 10),
            Spawner::Fixed(FixedSpawner::new(2)),
            rules,
            ChaCha8Rng::seed_from_u64(4),
        )
        .unwrap();

        step(&mut w, Command::MoveUp);
        assert!(w.enemies.is_empty() && w.pickups.is_empty());
        let events = step(&mut w, Command::MoveDown);
        assert_eq!(w.enemies.len(), 1);
        assert_eq!(w.pickups.len(), 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::EnemySpawned { kind: EnemyKind::Walker, .. })));
    }

    #[test]
    fn weighted_spawns_respect_distance() {
        let busy = SpawnRule { entity_type: SpawnKind::Runner, min_turns: 1, max_turns: 1, weight: 1.0 };
        let table = SpawnTable { categories: vec![SpawnCategory::new("enemies", vec![busy])] };
        let mut w = World::new(
            LevelDef::open(16, 16),
            Spawner::Weighted(table),
            bare_rules(),
            ChaCha8Rng::seed_from_u64(8),
        )
        .unwrap();

        let events = step(&mut w, Command::MoveUp);
        let spawned: Vec<Pos> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::EnemySpawned { pos, .. } => Some(*pos),
                _ => None,
            })
            .collect();
        assert_eq!(spawned.len(), 1);
        // spawn happens after the move, so distance is measured from the new cell
        assert!(spawned[0].far_from(w.player.pos, 3));
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn enemies_never_share_a_cell() {
        let busy = SpawnRule { entity_type: SpawnKind::Runner, min_turns: 1, max_turns: 2, weight: 1.0 };
        let table = SpawnTable { categories: vec![SpawnCategory::new("enemies", vec![busy])] };
        let moves = [Command::MoveLeft, Command::MoveRight, Command::MoveUp, Command::MoveDown];

        for seed in 0..20 {
            let mut w = World::new(
                LevelDef::open(14, 14),
                Spawner::Weighted(table.clone()),
                bare_rules(),
                ChaCha8Rng::seed_from_u64(seed),
            )
            .unwrap();
            let mut pick = ChaCha8Rng::seed_from_u64(seed + 100);

            for _ in 0..60 {
                step(&mut w, moves[pick.gen_range(0..moves.len())]);

                let cells: HashSet<Pos> = w.enemies.iter().map(|e| e.pos).collect();
                assert_eq!(cells.len(), w.enemies.len(), "seed {seed}");
                let flagged = w.grid.positions().filter(|&p| w.grid.cell_has_any(p, Cell::ENEMY)).count();
                assert_eq!(flagged, w.enemies.len(), "seed {seed}");
                assert!(w.grid.cell_has_any(w.player.pos, Cell::PLAYER));

                if w.phase == Phase::GameOver { break; }
            }
        }
    }
}
