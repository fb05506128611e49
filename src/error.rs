//! Setup failures. Gameplay itself never errors: blocked moves, missing
//! paths and failed placements resolve to no-ops.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::cell::Pos;

pub type Result<T> = std::result::Result<T, SetupError>;

#[derive(Debug, Error)]
pub enum SetupError {
    /// The spawn document lists no categories at all.
    #[error("spawn table has no categories")]
    NoSpawnCategories,

    #[error("spawn rule {entity} in category '{category}' is invalid: {reason}")]
    InvalidRule {
        category: String,
        entity: String,
        reason: String,
    },

    #[error("spawn weights in category '{0}' add up past the f32 range")]
    WeightOverflow(String),

    #[error("failed to parse spawn table: {0}")]
    SpawnParse(#[from] serde_json::Error),

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad level layout: {0}")]
    LevelShape(String),

    #[error("level has no walkable interior tiles")]
    NoWalkableTiles,

    #[error("player start {0:?} is a wall")]
    StartBlocked(Pos),
}
