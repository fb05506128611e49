/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub display: DisplayConfig,
    /// Level layout file; `None` = built-in arena.
    pub level: Option<PathBuf>,
    /// Spawn table JSON; `None` = built-in table.
    pub spawn_table: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

/// Which spawner drives the game. Exactly one is active.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnMode {
    /// Weighted categories from the spawn table.
    Weighted,
    /// One enemy + one pickup every `fixed_spawn_delay` moves.
    Fixed,
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub reward: u32,
    pub seed: Option<u64>,
    pub spawn_mode: SpawnMode,
    pub fixed_spawn_delay: u32,
    pub enemy_min_distance: i32,
    pub pickup_min_distance: i32,
    pub initial_enemies: u32,
    pub initial_pickups: u32,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    /// Frame pacing for the input/render loop.
    pub tick_rate_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_reward")]
    reward: u32,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default = "default_spawn_mode")]
    spawn_mode: SpawnMode,
    #[serde(default = "default_fixed_delay")]
    fixed_spawn_delay: u32,
    #[serde(default = "default_enemy_distance")]
    enemy_min_distance: i32,
    #[serde(default = "default_pickup_distance")]
    pickup_min_distance: i32,
    #[serde(default = "default_initial")]
    initial_enemies: u32,
    #[serde(default = "default_initial")]
    initial_pickups: u32,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    spawn_table: Option<String>,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_reward() -> u32 { 100 }
fn default_spawn_mode() -> SpawnMode { SpawnMode::Weighted }
fn default_fixed_delay() -> u32 { 5 }
fn default_enemy_distance() -> i32 { 3 }
fn default_pickup_distance() -> i32 { 1 }
fn default_initial() -> u32 { 1 }
fn default_tick_rate() -> u64 { 30 }
fn default_log_file() -> String { "deadgrid.log".into() }

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            reward: default_reward(),
            seed: None,
            spawn_mode: default_spawn_mode(),
            fixed_spawn_delay: default_fixed_delay(),
            enemy_min_distance: default_enemy_distance(),
            pickup_min_distance: default_pickup_distance(),
            initial_enemies: default_initial(),
            initial_pickups: default_initial(),
        }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay {
            tick_rate_ms: default_tick_rate(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            level: None,
            spawn_table: None,
            log_file: default_log_file(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document directly (no file search).
    #[cfg(test)]
    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        Ok(GameConfig::from_toml(toml::from_str(text)?, &[]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let log_file = if cfg.general.log_file.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&cfg.general.log_file))
        };
        GameConfig {
            rules: RulesConfig {
                reward: cfg.rules.reward,
                seed: cfg.rules.seed,
                spawn_mode: cfg.rules.spawn_mode,
                fixed_spawn_delay: cfg.rules.fixed_spawn_delay,
                enemy_min_distance: cfg.rules.enemy_min_distance,
                pickup_min_distance: cfg.rules.pickup_min_distance,
                initial_enemies: cfg.rules.initial_enemies,
                initial_pickups: cfg.rules.initial_pickups,
            },
            display: DisplayConfig {
                tick_rate_ms: cfg.display.tick_rate_ms,
            },
            level: cfg.general.level.as_deref().map(|p| resolve_path(p, search_dirs)),
            spawn_table: cfg.general.spawn_table.as_deref().map(|p| resolve_path(p, search_dirs)),
            log_file,
        }
    }
}

/// Absolute paths pass through; relative ones resolve against the first
/// candidate directory that contains them, else stay relative to CWD.
fn resolve_path(raw: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(&path))
        .find(|p| p.exists())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
