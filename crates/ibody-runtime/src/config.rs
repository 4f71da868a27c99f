//! Performance configuration
//!
//! Every field has a default, so an empty file (or no file) gives the stock
//! show: four 30 second actions, en-GB voice.

use std::fs;
use std::path::Path;
use std::time::Duration;

use ibody_core::{IbodyError, IbodyResult, SessionId, DEFAULT_SESSION_ID};
use ibody_time::ScheduleConfig;
use ibody_visual::{SkeletonConfig, SmoothingConfig};
use ibody_voice::VoiceConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub smoothing: SmoothingSection,
    #[serde(default)]
    pub skeleton: SkeletonSection,
    #[serde(default)]
    pub voice: VoiceSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleSection {
    /// Length of one action segment
    #[serde(default = "default_segment_duration_ms")]
    pub segment_duration_ms: u64,
    #[serde(default = "default_num_actions")]
    pub num_actions: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SmoothingSection {
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default = "default_blend")]
    pub blend: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkeletonSection {
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    #[serde(default = "default_head_radius")]
    pub head_radius: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceSection {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_unit")]
    pub rate: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
    /// When off, nothing is spoken and every utterance completes at once
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
    /// JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

fn default_segment_duration_ms() -> u64 {
    30_000
}

fn default_num_actions() -> u32 {
    4
}

fn default_score_threshold() -> f32 {
    0.2
}

fn default_blend() -> f32 {
    0.4
}

fn default_visibility_threshold() -> f32 {
    0.3
}

fn default_head_radius() -> f32 {
    18.0
}

fn default_lang() -> String {
    "en-GB".to_string()
}

fn default_unit() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
            schedule: ScheduleSection::default(),
            smoothing: SmoothingSection::default(),
            skeleton: SkeletonSection::default(),
            voice: VoiceSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            segment_duration_ms: default_segment_duration_ms(),
            num_actions: default_num_actions(),
        }
    }
}

impl Default for SmoothingSection {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            blend: default_blend(),
        }
    }
}

impl Default for SkeletonSection {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            head_radius: default_head_radius(),
        }
    }
}

impl Default for VoiceSection {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            rate: default_unit(),
            pitch: default_unit(),
            enabled: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl PerformanceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> IbodyResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> IbodyResult<Self> {
        let config: PerformanceConfig =
            toml::from_str(content).map_err(|e| IbodyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the show meaningless
    pub fn validate(&self) -> IbodyResult<()> {
        if self.session_id.trim().is_empty() {
            return Err(IbodyError::Config("session_id must not be empty".into()));
        }
        if self.schedule.segment_duration_ms == 0 {
            return Err(IbodyError::Config("segment_duration_ms must be positive".into()));
        }
        if self.schedule.num_actions == 0 {
            return Err(IbodyError::Config("num_actions must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.smoothing.blend) {
            return Err(IbodyError::Config(format!(
                "smoothing blend {} outside 0..=1",
                self.smoothing.blend
            )));
        }
        Ok(())
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.session_id.clone())
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            segment_duration: Duration::from_millis(self.schedule.segment_duration_ms),
            num_actions: self.schedule.num_actions,
        }
    }

    pub fn smoothing(&self) -> SmoothingConfig {
        SmoothingConfig {
            score_threshold: self.smoothing.score_threshold,
            blend: self.smoothing.blend,
        }
    }

    pub fn skeleton(&self) -> SkeletonConfig {
        SkeletonConfig {
            visibility_threshold: self.skeleton.visibility_threshold,
            head_radius: self.skeleton.head_radius,
            ..SkeletonConfig::default()
        }
    }

    pub fn voice(&self) -> VoiceConfig {
        VoiceConfig {
            lang: self.voice.lang.clone(),
            rate: self.voice.rate,
            pitch: self.voice.pitch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_typed_configs() {
        let config = PerformanceConfig::default();
        assert_eq!(config.session_id(), SessionId::default());
        assert_eq!(config.schedule(), ScheduleConfig::default());
        assert_eq!(config.smoothing(), SmoothingConfig::default());
        assert_eq!(config.skeleton(), SkeletonConfig::default());
        assert_eq!(config.voice(), VoiceConfig::default());
        assert!(config.voice.enabled);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PerformanceConfig::from_toml("").unwrap(), PerformanceConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = PerformanceConfig::from_toml(
            r#"
            session_id = "rehearsal"

            [schedule]
            segment_duration_ms = 5000

            [voice]
            enabled = false

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.session_id, "rehearsal");
        assert_eq!(config.schedule().segment_duration, Duration::from_secs(5));
        assert_eq!(config.schedule().num_actions, 4);
        assert!(!config.voice.enabled);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        for bad in [
            "session_id = \" \"",
            "[schedule]\nnum_actions = 0",
            "[schedule]\nsegment_duration_ms = 0",
            "[smoothing]\nblend = 1.5",
            "[schedule]\nnum_actions = \"four\"",
        ] {
            assert!(
                matches!(PerformanceConfig::from_toml(bad), Err(IbodyError::Config(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[smoothing]\nscore_threshold = 0.5").unwrap();

        let config = PerformanceConfig::load(file.path()).unwrap();
        assert_eq!(config.smoothing().score_threshold, 0.5);
        assert!(matches!(
            PerformanceConfig::load("/nonexistent/ibody.toml"),
            Err(IbodyError::Io(_))
        ));
    }
}
