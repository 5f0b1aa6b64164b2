//! Logging initialization.
//!
//! [`LoggerManager`] validates the `[logger]` configuration and installs the
//! global `tracing` subscriber: a console layer in one of three formats and,
//! when enabled, a systemd journald layer. It runs once at startup, before
//! any component logs; components hold no logger handles of their own and
//! use the `tracing` macros against the installed subscriber.

use std::io;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, LogFormat, LoggerConfig},
    print_warn,
};

/// Errors during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Validation errors from the logger configuration.
    #[error("Logger configuration validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// IO error, typically from the journald socket.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No output layers were successfully configured.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,
}

/// Builds and installs the global tracing subscriber.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Validates the configuration; initialization happens in
    /// [`init`](Self::init).
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;
        Ok(LoggerManager { config })
    }

    /// Installs the global subscriber. Must be called once, before any
    /// tracing macro fires.
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let mut layers = Vec::new();

        if let Some(console) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(self.console_layer(console));
        }

        // Journald is best-effort: a dev machine without the socket falls
        // back to console-only.
        if let Some(journald) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match tracing_journald::layer() {
                Ok(layer) => {
                    layers.push(layer.with_filter(self.env_filter()).boxed());
                }
                Err(e) => {
                    print_warn!(
                        "Failed to initialize journald logger '{}': {}",
                        journald.identifier,
                        e
                    );
                }
            }
        }

        if layers.is_empty() {
            return Err(LoggerError::NoLayersConfigured);
        }

        tracing_subscriber::registry().with(layers).init();
        Ok(())
    }

    /// `RUST_LOG` wins over the configured level.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    fn console_layer(
        &self,
        config: &ConsoleConfig,
    ) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
        let filter = self.env_filter();
        match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi_colors)
                .with_writer(io::stdout)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi_colors)
                .with_writer(io::stdout)
                .with_filter(filter)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi_colors)
                .with_writer(io::stdout)
                .with_filter(filter)
                .boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_fails_construction() {
        let config = LoggerConfig {
            level: "shouting".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::Validation(_))
        ));
    }

    #[test]
    fn valid_config_constructs() {
        assert!(LoggerManager::new(LoggerConfig::default()).is_ok());
    }
}
