//! Annotator Configuration
//!
//! Annotation, batching and logging settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Annotator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Span and bounding box construction
    pub annotation: AnnotationSettings,
    /// Worker pool and segment selection
    pub batch: BatchSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Settings applied while building spans for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSettings {
    /// Words must score strictly above this to become tokens
    pub acceptance_threshold: f32,
    /// Label attached to every bounding box
    pub bbox_label: String,
}

impl AnnotationSettings {
    pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.4;
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            acceptance_threshold: Self::DEFAULT_ACCEPTANCE_THRESHOLD,
            bbox_label: "text".to_string(),
        }
    }
}

/// Batch dispatch settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Worker threads (0 = available parallelism)
    pub workers: usize,
    /// Segment labels to process, exact match; empty means all
    pub tf_label: Vec<String>,
}

impl BatchSettings {
    /// Resolve the worker count against the host
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AnnotatorConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AnnotatorConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AnnotatorConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AnnotatorConfig::default();

        assert!((config.annotation.acceptance_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.annotation.bbox_label, "text");
        assert_eq!(config.batch.workers, 0);
        assert!(config.batch.tf_label.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AnnotatorConfig::default();
        config.batch.tf_label = vec!["speech".to_string()];
        config.batch.workers = 3;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AnnotatorConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.batch.tf_label, vec!["speech".to_string()]);
        assert_eq!(parsed.batch.workers, 3);
        assert_eq!(parsed.annotation.bbox_label, config.annotation.bbox_label);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AnnotatorConfig = toml::from_str("[batch]\nworkers = 2\n").unwrap();

        assert_eq!(parsed.batch.workers, 2);
        assert!(parsed.batch.tf_label.is_empty());
        assert!((parsed.annotation.acceptance_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_effective_workers() {
        let fixed = BatchSettings { workers: 5, tf_label: vec![] };
        assert_eq!(fixed.effective_workers(), 5);

        let auto = BatchSettings::default();
        assert!(auto.effective_workers() >= 1);
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AnnotatorConfig::default();
        config.annotation.acceptance_threshold = 0.6;

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert!((loaded.annotation.acceptance_threshold - 0.6).abs() < 0.001);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
