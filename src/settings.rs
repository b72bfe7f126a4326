//! Engine tunables and user preferences
//!
//! `EngineConfig` holds the physics, arena, launch and rest tuning.
//! `Settings` holds user-facing preferences and is persisted separately
//! in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Ray-march step budget per pixel
    pub fn march_steps(&self) -> u32 {
        match self {
            QualityPreset::Low => 48,
            QualityPreset::Medium => 96,
            QualityPreset::High => 160,
        }
    }

    /// Whether bodies cast soft shadows on the floor
    pub fn shadows_enabled(&self) -> bool {
        match self {
            QualityPreset::Low => false,
            QualityPreset::Medium => true,
            QualityPreset::High => true,
        }
    }
}

/// Friction/restitution pair for arena surfaces and bodies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub friction: f32,
    pub restitution: f32,
}

/// Static arena geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Half-width of the floor area on X and Z
    pub half_size: f32,
    pub wall_height: f32,
    pub wall_thickness: f32,
    pub floor: MaterialConfig,
    pub walls: MaterialConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_size: ARENA_HALF_SIZE,
            wall_height: WALL_HEIGHT,
            wall_thickness: WALL_THICKNESS,
            floor: MaterialConfig {
                friction: 0.4,
                restitution: 0.35,
            },
            walls: MaterialConfig {
                friction: 0.1,
                restitution: 0.6,
            },
        }
    }
}

/// Launch impulse ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Upward speed range (min, max)
    pub vertical_speed: (f32, f32),
    /// Maximum random horizontal speed
    pub horizontal_jitter: f32,
    /// Horizontal pull toward the arena centre, per unit of offset
    pub center_pull: f32,
    /// Angular speed range (min, max), rad/s
    pub angular_speed: (f32, f32),
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            vertical_speed: (11.0, 15.0),
            horizontal_jitter: 3.0,
            center_pull: 0.6,
            angular_speed: (12.0, 24.0),
        }
    }
}

/// Settle detection and glitch recovery tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    pub poll_ms: f64,
    pub linear_eps: f32,
    pub angular_eps: f32,
    pub height_margin: f32,
    /// Forced best-effort settle after this long in flight (ms)
    pub settle_timeout_ms: f64,
    pub cocked_dot: f32,
    pub max_nudges: u32,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            poll_ms: REST_POLL_MS,
            linear_eps: REST_LINEAR_EPS,
            angular_eps: REST_ANGULAR_EPS,
            height_margin: REST_HEIGHT_MARGIN,
            settle_timeout_ms: SETTLE_TIMEOUT_MS,
            cocked_dot: COCKED_DOT,
            max_nudges: MAX_NUDGES,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Gravity vector
    pub gravity: [f32; 3],
    /// Fixed physics timestep, independent of frame time
    pub timestep: f32,
    pub solver_iterations: u32,
    /// Per-second velocity damping
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Bodies below this height are teleported back
    pub sanity_floor: f32,
    pub respawn_point: [f32; 3],
    pub die: MaterialConfig,
    pub coin: MaterialConfig,
    pub arena: ArenaConfig,
    pub launch: LaunchConfig,
    pub rest: RestConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, GRAVITY_Y, 0.0],
            timestep: SIM_DT,
            solver_iterations: SOLVER_ITERATIONS,
            linear_damping: 0.05,
            angular_damping: 0.6,
            sanity_floor: SANITY_FLOOR,
            respawn_point: RESPAWN_POINT,
            die: MaterialConfig {
                friction: 0.5,
                restitution: 0.4,
            },
            coin: MaterialConfig {
                friction: 0.5,
                restitution: 0.3,
            },
            arena: ArenaConfig::default(),
            launch: LaunchConfig::default(),
            rest: RestConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Set the settle timeout
    pub fn with_settle_timeout(mut self, ms: f64) -> Self {
        self.rest.settle_timeout_ms = ms;
        self
    }

    /// Highest point a launched body can reach above its start
    pub fn max_apex(&self) -> f32 {
        let g = self.gravity[1].abs().max(f32::EPSILON);
        let v = self.launch.vertical_speed.1;
        v * v / (2.0 * g)
    }
}

/// User preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Camera shake on launch
    pub camera_shake: bool,
    /// Show a rolling preview value while in flight
    pub live_preview: bool,
    /// Entries kept in the history list
    pub history_size: usize,
    /// Reduced motion (disables shake)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            camera_shake: true,
            live_preview: true,
            history_size: HISTORY_CAPACITY,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective camera shake (respects reduced_motion)
    pub fn effective_camera_shake(&self) -> bool {
        self.camera_shake && !self.reduced_motion
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "fair_toss_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_cannot_clear_walls() {
        let config = EngineConfig::default();
        let apex = SPAWN_HEIGHT + config.max_apex();
        assert!(apex < config.arena.wall_height);
    }

    #[test]
    fn test_reduced_motion_disables_shake() {
        let mut settings = Settings::default();
        assert!(settings.effective_camera_shake());
        settings.reduced_motion = true;
        assert!(!settings.effective_camera_shake());
    }

    #[test]
    fn test_config_json_roundtrip_keeps_tuning() {
        let config = EngineConfig::default().with_settle_timeout(1234.0);
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rest.settle_timeout_ms, 1234.0);
        assert_eq!(back.gravity, config.gravity);
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!(QualityPreset::from_str("HIGH"), Some(QualityPreset::High));
        assert_eq!(QualityPreset::from_str("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::from_str("ultra"), None);
    }
}
