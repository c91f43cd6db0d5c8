//! Logging configuration: the `[logging]` settings table, then `MR_LOG` and
//! `MR_LOG_FORMAT` on top. `RUST_LOG` directives are honored later by the
//! subscriber's env filter.

use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line on stderr.
    Jsonl,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
        }
    }
}

impl LogConfig {
    /// Defaults plus the environment.
    pub fn from_env() -> Self {
        Self::default().with_env_vars(|key| std::env::var(key).ok())
    }

    /// Settings file values, then the environment.
    ///
    /// Unparseable settings values keep the default.
    pub fn from_settings(settings: &mr_config::LoggingSettings) -> Self {
        Self::from_settings_and(settings, |key| std::env::var(key).ok())
    }

    fn from_settings_and(
        settings: &mr_config::LoggingSettings,
        var: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = LogConfig::default();
        if let Ok(level) = settings.level.trim().parse() {
            config.level = level;
        }
        if let Ok(format) = settings.format.parse() {
            config.format = format;
        }
        config.with_env_vars(var)
    }

    fn with_env_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = var("MR_LOG").and_then(|v| v.trim().parse().ok()) {
            self.level = level;
        }
        if let Some(format) = var("MR_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.format = format;
        }
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("jsonl".parse::<LogFormat>(), Ok(LogFormat::Jsonl));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Jsonl));
        assert_eq!("human".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_settings_values_apply() {
        let settings = mr_config::LoggingSettings {
            level: "debug".to_string(),
            format: "jsonl".to_string(),
        };
        let config = LogConfig::from_settings_and(&settings, env(&[]));
        assert_eq!(config.level, LevelFilter::DEBUG);
        assert_eq!(config.format, LogFormat::Jsonl);

        let env_wins = LogConfig::from_settings_and(&settings, env(&[("MR_LOG", "error")]));
        assert_eq!(env_wins.level, LevelFilter::ERROR);
        assert_eq!(env_wins.format, LogFormat::Jsonl);
    }

    #[test]
    fn test_env_overrides_settings() {
        let config = LogConfig::default()
            .with_level(LevelFilter::DEBUG)
            .with_env_vars(env(&[("MR_LOG", "warn"), ("MR_LOG_FORMAT", "jsonl")]));
        assert_eq!(config.level, LevelFilter::WARN);
        assert_eq!(config.format, LogFormat::Jsonl);
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let config = LogConfig::default()
            .with_env_vars(env(&[("MR_LOG", "loud"), ("MR_LOG_FORMAT", "xml")]));
        assert_eq!(config, LogConfig::default());
    }
}
