// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MpiwatchError, Result};
use crate::progress::{default_rules, Classifier};
use crate::supervisor::ArtifactSettings;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MpiwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_launch(&raw)?;
        let artifact = validate_artifact(&raw)?;

        let rules = if raw.rules.is_empty() {
            default_rules()
        } else {
            raw.rules
        };
        let classifier = Classifier::new(rules)?;

        Ok(ConfigFile::new_unchecked(raw.launch, artifact, classifier))
    }
}

fn validate_launch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.launch.workers == 0 {
        return Err(MpiwatchError::ConfigError(
            "[launch].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.launch.launcher.trim().is_empty() {
        return Err(MpiwatchError::ConfigError(
            "[launch].launcher must not be empty".to_string(),
        ));
    }
    if cfg.launch.executable.trim().is_empty() {
        return Err(MpiwatchError::ConfigError(
            "[launch].executable must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_artifact(cfg: &RawConfigFile) -> Result<ArtifactSettings> {
    let section = &cfg.artifact;

    if section.file.trim().is_empty() {
        return Err(MpiwatchError::ConfigError(
            "[artifact].file must not be empty".to_string(),
        ));
    }
    if section.poll_attempts == 0 {
        return Err(MpiwatchError::ConfigError(
            "[artifact].poll_attempts must be >= 1 (got 0)".to_string(),
        ));
    }

    let poll_interval = parse_duration(&section.poll_interval).map_err(|e| {
        MpiwatchError::ConfigError(format!("[artifact].poll_interval: {e}"))
    })?;

    Ok(ArtifactSettings {
        file: section.file.clone(),
        poll_attempts: section.poll_attempts,
        poll_interval,
    })
}

/// Parse a simple duration string like `"100ms"`, `"3s"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
