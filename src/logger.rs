use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

static DECK_LOGGER: Lazy<DeckLogger> = Lazy::new(DeckLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::default())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let max_level = config.min_level;
    DECK_LOGGER.update_config(config);

    log::set_logger(&*DECK_LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    log::set_max_level(max_level);
    Ok(())
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Cyan,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

fn level_emoji(level: Level) -> &'static str {
    match level {
        Level::Trace => "🔍",
        Level::Debug => "🐛",
        Level::Info => "💡",
        Level::Warn => "⚠️",
        Level::Error => "❌",
    }
}

pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// One rendered line, also the JSON shape in structured mode.
#[derive(Debug, Serialize)]
pub struct LogLine<'a> {
    pub timestamp: DateTime<Utc>,
    pub level: &'a str,
    pub module: &'a str,
    pub message: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LevelFilter,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_file_location: bool,
    pub output_json: bool,
    pub timestamp_format: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: true,
            show_emojis: true,
            show_file_location: false,
            output_json: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            show_colors: false,
            show_emojis: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LevelFilter::Debug,
            show_file_location: true,
            ..Default::default()
        }
    }

    /// `DECKGEN_LOG_FORMAT=json` picks the production preset.
    pub fn from_env() -> Self {
        let base = match env::var("DECKGEN_LOG_FORMAT").ok().as_deref() {
            Some("json") => Self::production(),
            _ => Self::development(),
        };
        match env::var("DECKGEN_LOG_LEVEL").ok().and_then(|l| parse_level(&l)) {
            Some(level) => base.with_level(level),
            None => base,
        }
    }
}

pub struct DeckLogger {
    config: Mutex<LoggerConfig>,
}

impl DeckLogger {
    fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
        }
    }

    fn update_config(&self, new_config: LoggerConfig) {
        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
    }

    fn render(record: &Record, config: &LoggerConfig) -> String {
        let line = LogLine {
            timestamp: Utc::now(),
            level: record.level().as_str(),
            module: record.module_path().unwrap_or("unknown"),
            message: record.args().to_string(),
            location: match (config.show_file_location, record.file(), record.line()) {
                (true, Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
                _ => None,
            },
        };

        if config.output_json {
            return serde_json::to_string(&line).unwrap_or_default();
        }

        let timestamp = line.timestamp.format(&config.timestamp_format).to_string();
        let level = if config.show_emojis {
            format!("{} {}", level_emoji(record.level()), line.level)
        } else {
            line.level.to_string()
        };

        let mut output = if config.show_colors {
            format!(
                "{} [{}] {}:: {}",
                timestamp.bright_black(),
                level.color(level_color(record.level())).bold(),
                line.module.bright_blue(),
                line.message
            )
        } else {
            format!("{} [{}] {}:: {}", timestamp, level, line.module, line.message)
        };

        if let Some(location) = line.location {
            if config.show_colors {
                output.push_str(&format!(" ({})", location.bright_black()));
            } else {
                output.push_str(&format!(" ({})", location));
            }
        }
        output
    }
}

impl log::Log for DeckLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level,
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(config) = self.config.lock() {
            // stderr keeps stdout free for streamed events
            eprintln!("{}", Self::render(record, &config));
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Logs how long the enclosing operation took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        log::debug!("⏱️  Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "⏱️  '{}' completed in {}ms",
            self.name,
            self.elapsed().as_millis()
        );
    }
}

pub fn timer(name: impl Into<String>) -> Timer {
    Timer::new(name)
}

pub fn log_config_info(config: &crate::config::Config) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   LLM provider: {:?}", config.llm.provider);
    log::info!("   Model: {}", config.llm.model);
    log::info!(
        "   Web grounding: {}",
        if config.llm.web_grounding { "✅" } else { "❌" }
    );
    log::info!(
        "   Upstash retrieval: {}",
        if config.retrieval.upstash.is_some() { "✅" } else { "❌" }
    );
    log::info!("   Image provider: {:?}", config.image.provider);
    log::info!("   Slide concurrency: {}", config.slide_concurrency);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("warning"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_logger_presets() {
        let dev = LoggerConfig::development();
        assert_eq!(dev.min_level, LevelFilter::Debug);
        assert!(dev.show_colors);

        let prod = LoggerConfig::production();
        assert!(!prod.show_colors);
        assert!(prod.output_json);
    }

    #[test]
    fn test_json_rendering() {
        let config = LoggerConfig::production();
        let rendered = DeckLogger::render(
            &Record::builder()
                .args(format_args!("hello {}", "world"))
                .level(Level::Warn)
                .module_path(Some("deckgen::pipeline"))
                .build(),
            &config,
        );
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["message"], "hello world");
        assert_eq!(value["module"], "deckgen::pipeline");
    }
}
