use crate::animation::EasingFunction;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum number of posts a single flip-in step ever shows.
pub const MAX_POSTS: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub surface: SurfaceConfig,
    pub flip_in: FlipInConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: f64,
    pub height: f64,
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !positive(self.width) || !positive(self.height) {
            return Err("surface width and height must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1280.0,
        }
    }
}

/// Anchor of the card list, expressed in a reference resolution so the
/// position scales with whatever size the surface actually has.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub x: f64,
    pub y: f64,
    pub reference_width: f64,
    pub reference_height: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            x: 1000.0,
            y: 200.0,
            reference_width: 1920.0,
            reference_height: 1280.0,
        }
    }
}

impl AnchorConfig {
    pub fn x_ratio(&self) -> f64 {
        self.x / self.reference_width
    }

    pub fn y_ratio(&self) -> f64 {
        self.y / self.reference_height
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlipInConfig {
    pub container_key: String,
    pub cap: usize,
    pub spacing: f64,
    pub max_width: f64,
    pub avatar_allowance: f64,
    pub gap: f64,
    pub name_height: f64,
    pub text_height: f64,
    pub anchor: AnchorConfig,
    pub step_duration_secs: u64,
    pub flip_duration_ms: u64,
    pub frame_rate: u32,
    pub easing: EasingFunction,
}

impl Default for FlipInConfig {
    fn default() -> Self {
        Self {
            container_key: "tweetList".to_string(),
            cap: MAX_POSTS,
            spacing: 20.0,
            max_width: 600.0,
            avatar_allowance: 64.0,
            gap: 10.0,
            name_height: 24.0,
            text_height: 70.0,
            anchor: AnchorConfig::default(),
            step_duration_secs: 15,
            flip_duration_ms: 1000,
            frame_rate: 60,
            easing: EasingFunction::EaseInOut,
        }
    }
}

impl FlipInConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.container_key.is_empty() {
            return Err("container_key must not be empty".to_string());
        }
        if self.cap == 0 {
            return Err("cap must be at least 1".to_string());
        }
        if !positive(self.max_width) || !positive(self.text_height) {
            return Err("max_width and text_height must be positive".to_string());
        }
        if ![self.spacing, self.avatar_allowance, self.gap, self.name_height]
            .into_iter()
            .all(non_negative)
        {
            return Err(
                "spacing, avatar_allowance, gap and name_height must not be negative".to_string(),
            );
        }
        if !self.anchor.x.is_finite() || !self.anchor.y.is_finite() {
            return Err("anchor position must be finite".to_string());
        }
        if !positive(self.anchor.reference_width) || !positive(self.anchor.reference_height) {
            return Err("anchor reference size must be positive".to_string());
        }
        if self.frame_rate == 0 {
            return Err("frame_rate must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn step_duration(&self) -> Duration {
        Duration::from_secs(self.step_duration_secs)
    }

    pub fn flip_duration(&self) -> Duration {
        Duration::from_millis(self.flip_duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate))
    }
}

/// Finite and greater than zero. NaN and infinities fail.
fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/tweetwall/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tweetwall").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Loads the explicit path if given, otherwise the default path when it
    /// exists, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.surface.validate()?;
        self.flip_in.validate()
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_layout() {
        let config = FlipInConfig::default();
        assert_eq!(config.cap, 7);
        assert_eq!(config.container_key, "tweetList");
        assert_eq!(config.step_duration(), Duration::from_secs(15));
        assert!((config.anchor.x_ratio() - 1000.0 / 1920.0).abs() < f64::EPSILON);
        assert!((config.anchor.y_ratio() - 200.0 / 1280.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [flip_in]
            max_width = 480.0

            [logging]
            filter = "tweetwall=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.flip_in.max_width, 480.0);
        assert_eq!(config.flip_in.cap, 7);
        assert_eq!(config.flip_in.easing, EasingFunction::EaseInOut);
        assert_eq!(config.surface, SurfaceConfig::default());
        assert_eq!(config.logging.filter, "tweetwall=debug");
    }

    #[test]
    fn test_easing_is_configurable() {
        let config: FlipInConfig = toml::from_str("easing = \"ease-out\"").unwrap();
        assert_eq!(config.easing, EasingFunction::EaseOut);
        assert!(toml::from_str::<FlipInConfig>("easing = \"bounce\"").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let config = FlipInConfig {
            cap: 0,
            ..FlipInConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_reference_size() {
        let mut config = FlipInConfig::default();
        config.anchor.reference_height = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_values() {
        let config: FlipInConfig =
            toml::from_str("max_width = nan\n[anchor]\nreference_width = nan").unwrap();
        assert!(config.validate().is_err());

        let config: FlipInConfig = toml::from_str("max_width = nan").unwrap();
        assert!(config.validate().is_err());

        let mut config = FlipInConfig::default();
        config.anchor.reference_width = f64::NAN;
        assert!(config.validate().is_err());

        let config: FlipInConfig = toml::from_str("spacing = inf").unwrap();
        assert!(config.validate().is_err());

        let mut config = FlipInConfig::default();
        config.anchor.x = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_non_finite_surface() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[surface]\nwidth = nan").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[surface]\nwidth = 960.0\nheight = 640.0").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.surface.width, 960.0);
        assert_eq!(config.surface.height, 640.0);
    }

    #[test]
    fn test_load_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[flip_in]\ncap = \"seven\"").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[flip_in]\nframe_rate = 0").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = Config::load_or_default(Some(Path::new("/nonexistent/tweetwall.toml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
