//! Simple configuration persistence for Mixdeck
//!
//! Stores engine tuning: tick rate, VU decay, drag sensitivity, the default
//! crossfader curve and how many demo tracks the host seeds.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lowest accepted tick rate
pub const MIN_TICK_RATE_HZ: u32 = 1;
/// Highest accepted tick rate
pub const MAX_TICK_RATE_HZ: u32 = 240;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Transport clock ticks per second
    pub tick_rate_hz: u32,
    /// VU meter decay per tick (0.0 - <1.0)
    pub vu_decay: f32,
    /// Pointer travel (pixels) for a full-range drag
    pub drag_pixels: f32,
    /// Crossfader curve name: smooth, sharp or cut
    pub crossfader_curve: String,
    /// Number of synthetic tracks the host puts in the catalog
    pub demo_tracks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30,
            vu_decay: 0.85,
            drag_pixels: 200.0,
            crossfader_curve: "smooth".to_string(),
            demo_tracks: 2,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::debug!(path = %path.display(), error = %e, "using default config");
            Self::default()
        })
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.serialize();
        fs::write(path, content)
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mixdeck")
            .join("config.txt")
    }

    /// Length of one transport clock tick
    pub fn tick_quantum(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(MIN_TICK_RATE_HZ) as f64)
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!(line, "ignoring malformed config line");
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "tick_rate_hz" => match value.parse::<u32>() {
                    Ok(v) => config.tick_rate_hz = v.clamp(MIN_TICK_RATE_HZ, MAX_TICK_RATE_HZ),
                    Err(_) => tracing::warn!(key, value, "invalid config value"),
                },
                "vu_decay" => match value.parse::<f32>() {
                    Ok(v) if v.is_finite() => config.vu_decay = v.clamp(0.0, 0.999),
                    _ => tracing::warn!(key, value, "invalid config value"),
                },
                "drag_pixels" => match value.parse::<f32>() {
                    Ok(v) if v.is_finite() && v > 0.0 => config.drag_pixels = v,
                    _ => tracing::warn!(key, value, "invalid config value"),
                },
                "crossfader_curve" => {
                    if !value.is_empty() {
                        config.crossfader_curve = value.to_lowercase();
                    }
                }
                "demo_tracks" => match value.parse::<usize>() {
                    Ok(v) => config.demo_tracks = v,
                    Err(_) => tracing::warn!(key, value, "invalid config value"),
                },
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let lines = [
            "# Mixdeck Configuration".to_string(),
            format!("tick_rate_hz={}", self.tick_rate_hz),
            format!("vu_decay={}", self.vu_decay),
            format!("drag_pixels={}", self.drag_pixels),
            format!("crossfader_curve={}", self.crossfader_curve),
            format!("demo_tracks={}", self.demo_tracks),
        ];
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_values() {
        let config = Config::parse("tick_rate_hz=60\nvu_decay=0.5\ncrossfader_curve=Cut");
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.vu_decay, 0.5);
        assert_eq!(config.crossfader_curve, "cut");
    }

    #[test]
    fn test_parse_with_comments() {
        let content = "# Comment\ndrag_pixels=150\n# Another comment";
        let config = Config::parse(content);
        assert_eq!(config.drag_pixels, 150.0);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let config = Config::parse("tick_rate_hz=0\nvu_decay=3.0");
        assert_eq!(config.tick_rate_hz, MIN_TICK_RATE_HZ);
        assert!(config.vu_decay < 1.0);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let config = Config::parse("tick_rate_hz=fast\ndrag_pixels=-4\nnonsense");
        assert_eq!(config.tick_rate_hz, 30);
        assert_eq!(config.drag_pixels, 200.0);
    }

    #[test]
    fn test_quantum() {
        let config = Config::default();
        assert!((config.tick_quantum().as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("mixdeck-config-{}", std::process::id()));
        let path = dir.join("nested").join("config.txt");
        let config = Config {
            crossfader_curve: "cut".to_string(),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);

        fs::remove_dir_all(&dir).unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config {
            tick_rate_hz: 50,
            vu_decay: 0.9,
            drag_pixels: 120.0,
            crossfader_curve: "sharp".to_string(),
            demo_tracks: 4,
        };

        let serialized = config.serialize();
        let parsed = Config::parse(&serialized);

        assert_eq!(parsed, config);
    }
}
