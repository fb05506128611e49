/// Events emitted during a turn.
/// The presentation layer consumes these; the core never reads them back.

use crate::domain::cell::Pos;
use crate::domain::entity::EnemyKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    PlayerMoved { from: Pos, to: Pos },
    EnemySpawned { id: u32, kind: EnemyKind, pos: Pos },
    PickupSpawned { id: u32, pos: Pos },
    EnemyMoved { id: u32, from: Pos, to: Pos },
    PickupConsumed { id: u32, pos: Pos },
    EnemyEliminated { id: u32, pos: Pos },
    ScoreChanged { score: u32 },
    PlayerCaught { by: u32, pos: Pos },
    Paused,
    Resumed,
    Restarted,
}
