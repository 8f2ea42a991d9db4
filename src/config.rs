//! Configuration of the trace runner.
//!
//! Values come from three layers: built-in defaults, an optional TOML file,
//! and command-line overrides. Later layers win.

pub mod settings;

pub use settings::{
    BlockingTargetSettings, NonBlockingTargetSettings, RequestStyleSetting, ResponseModeSetting,
    SimulationSettings, TraceSettings, TransactionSettings,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::harness::{
    BlockingTargetScenario, NonBlockingTargetScenario, PhaseTiming, ReadRequest,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render settings: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Values given on the command line; `None` keeps the lower layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub time_limit_ns: Option<u64>,
    pub response_delay_ns: Option<u64>,
    pub end_request_delay_ns: Option<u64>,
    pub begin_response_delay_ns: Option<u64>,
}

/// Load settings from `path`, or the defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> ConfigResult<TraceSettings> {
    let Some(path) = path else {
        log::debug!(target: "tlm_bridge::config", "no settings file, using defaults");
        return Ok(TraceSettings::default());
    };

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = toml::from_str::<TraceSettings>(&contents).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    log::info!(target: "tlm_bridge::config", "loaded settings from {}", path.display());
    Ok(settings)
}

/// Apply command-line overrides on top of `base`.
pub fn merge_settings(mut base: TraceSettings, overrides: &SettingsOverrides) -> TraceSettings {
    if let Some(limit) = overrides.time_limit_ns {
        base.simulation.time_limit_ns = Some(limit);
    }
    if let Some(delay) = overrides.response_delay_ns {
        base.blocking_target.response_delay_ns = delay;
    }
    if let Some(delay) = overrides.end_request_delay_ns {
        base.non_blocking_target.end_request_delay_ns = delay;
    }
    if let Some(delay) = overrides.begin_response_delay_ns {
        base.non_blocking_target.begin_response_delay_ns = delay;
    }
    base
}

impl TraceSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.transaction.length == 0 {
            return Err(ConfigError::Invalid {
                message: "transaction.length must be at least 1 byte".to_string(),
            });
        }
        if self.simulation.time_limit_ns == Some(0) {
            return Err(ConfigError::Invalid {
                message: "simulation.time_limit_ns must be positive when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn render(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.simulation.time_limit_ns.map(Duration::from_nanos)
    }

    fn request(&self) -> ReadRequest {
        ReadRequest {
            address: self.transaction.address,
            length: self.transaction.length,
        }
    }

    pub fn blocking_target_scenario(&self) -> BlockingTargetScenario {
        BlockingTargetScenario {
            response_delay: Duration::from_nanos(self.blocking_target.response_delay_ns),
            wait_in_handler: self.blocking_target.wait_in_handler,
            response_mode: self.blocking_target.response_mode.into(),
            request: self.request(),
        }
    }

    pub fn non_blocking_target_scenario(&self) -> NonBlockingTargetScenario {
        NonBlockingTargetScenario {
            timing: PhaseTiming {
                end_request: Duration::from_nanos(self.non_blocking_target.end_request_delay_ns),
                begin_response: Duration::from_nanos(
                    self.non_blocking_target.begin_response_delay_ns,
                ),
                style: self.non_blocking_target.style.into(),
            },
            request: self.request(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{RequestStyle, ResponseMode};
    use tempfile::TempDir;

    #[test]
    fn missing_path_yields_defaults() {
        let settings = load_settings(None).expect("defaults");
        assert_eq!(settings, TraceSettings::default());
        assert_eq!(settings.blocking_target.response_delay_ns, 100);
        assert_eq!(settings.transaction.length, 4);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("trace.toml");
        fs::write(
            &path,
            r#"
                [blocking_target]
                response_delay_ns = 40
                response_mode = "accept"

                [non_blocking_target]
                style = "return-end-request"
            "#,
        )
        .expect("failed to write settings");

        let settings = load_settings(Some(&path)).expect("settings load");
        assert_eq!(settings.blocking_target.response_delay_ns, 40);
        assert_eq!(
            settings.blocking_target.response_mode,
            ResponseModeSetting::Accept
        );
        assert_eq!(settings.non_blocking_target.end_request_delay_ns, 10);
        assert_eq!(
            settings.non_blocking_target_scenario().timing.style,
            RequestStyle::ReturnEndRequest
        );
        assert_eq!(
            settings.blocking_target_scenario().response_mode,
            ResponseMode::Accept
        );
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("trace.toml");
        fs::write(&path, "[simulation]\ntime_limit = 5\n").expect("failed to write settings");

        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let err = load_settings(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut base = TraceSettings::default();
        base.blocking_target.response_delay_ns = 40;
        base.non_blocking_target.end_request_delay_ns = 7;

        let merged = merge_settings(
            base,
            &SettingsOverrides {
                response_delay_ns: Some(70),
                time_limit_ns: Some(1_000),
                ..Default::default()
            },
        );

        assert_eq!(merged.blocking_target.response_delay_ns, 70);
        assert_eq!(merged.non_blocking_target.end_request_delay_ns, 7);
        assert_eq!(merged.time_limit(), Some(Duration::from_nanos(1_000)));
    }

    #[test]
    fn zero_length_transaction_is_rejected() {
        let mut settings = TraceSettings::default();
        settings.transaction.length = 0;
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rendered_settings_parse_back() {
        let mut settings = TraceSettings::default();
        settings.simulation.time_limit_ns = Some(500);
        settings.non_blocking_target.style = RequestStyleSetting::Complete;

        let rendered = settings.render().expect("render");
        let parsed: TraceSettings = toml::from_str(&rendered).expect("parse rendered settings");
        assert_eq!(parsed, settings);
    }
}
