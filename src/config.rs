//! Parses the `stats.ini`-style configuration file and dispatches handler
//! backend URLs to concrete [`Handler`] implementations.

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use ini::Ini;
use url::Url;

use crate::context::Context;
use crate::error::{ConfigError, HandlerError};
use crate::handler::{DatagramHandler, Handler, LogHandler, StreamHandler, TNetStringsHandler};

const DEFAULT_INTERVAL_SECS: u64 = 30;
const DEFAULT_HANDLER_SECTION_PREFIX: &str = "handler_";
const DEFAULT_CONFIG_NAMES: &[&str] = &["skystats.ini", "stats.ini"];

/// One `[handler_*]` section: the backend URL plus any extra parameters,
/// kept around for handlers that want more than host/port (none currently
/// do, but the shape is preserved for forward compatibility with new
/// backends).
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub name: String,
    pub backend: String,
    pub params: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub interval: Duration,
    pub handlers: Vec<HandlerConfig>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            handlers: vec![HandlerConfig {
                name: "log".to_string(),
                backend: "log".to_string(),
                params: IndexMap::new(),
            }],
        }
    }
}

/// Search `DEFAULT_CONFIG_NAMES` in the current directory and load the
/// first one found, falling back to `StatsConfig::default()` (interval 30,
/// a single log handler) if none exist.
pub fn load_stats_conf() -> Result<StatsConfig, ConfigError> {
    for candidate in DEFAULT_CONFIG_NAMES {
        if Path::new(candidate).exists() {
            return load_stats_conf_from(candidate);
        }
    }
    Ok(StatsConfig::default())
}

pub fn load_stats_conf_from(path: impl AsRef<Path>) -> Result<StatsConfig, ConfigError> {
    let path = path.as_ref();
    let ini = Ini::load_from_file(path)
        .map_err(|e| ConfigError::Ini(format!("{}: {e}", path.display())))?;
    parse_stats_conf(&ini)
}

pub fn parse_stats_conf(ini: &Ini) -> Result<StatsConfig, ConfigError> {
    let default_section = ini.section(Some("default"));

    let interval = default_section
        .and_then(|s| s.get("interval"))
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_INTERVAL_SECS));

    let handler_section_prefix = default_section
        .and_then(|s| s.get("handler_section_prefix"))
        .unwrap_or(DEFAULT_HANDLER_SECTION_PREFIX);

    let handler_names: Vec<String> = default_section
        .and_then(|s| s.get("handlers"))
        .map(|list| {
            list.split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut handlers = Vec::with_capacity(handler_names.len());
    for name in handler_names {
        let section_name = format!("{handler_section_prefix}{name}");
        let section = ini
            .section(Some(section_name.as_str()))
            .ok_or_else(|| ConfigError::MissingBackend(name.clone()))?;
        let backend = section
            .get("backend")
            .ok_or_else(|| ConfigError::MissingBackend(name.clone()))?
            .to_string();

        let params = section
            .iter()
            .filter(|(key, _)| *key != "backend" && *key != "name")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        handlers.push(HandlerConfig {
            name,
            backend,
            params,
        });
    }

    if handlers.is_empty() {
        handlers = StatsConfig::default().handlers;
    }

    Ok(StatsConfig { interval, handlers })
}

/// Build and register every configured handler against `context`,
/// overwriting any of the same name already registered.
pub fn configure_context(context: &Context, config: &StatsConfig) -> Result<(), ConfigError> {
    context.configure(config.interval);
    for handler_config in &config.handlers {
        let handler = configure_handler(&handler_config.backend)?;
        context.register_handler(handler_config.name.clone(), handler);
    }
    Ok(())
}

/// Parse a backend URL (`tcp://host:port`, `udp://host:port`,
/// `udp+tnetstrings://host:port`, `log://target`, or a bare scheme like
/// `log` with no `://`) and construct the matching handler. An unparseable
/// or unrecognized scheme falls back to a log handler with a warning,
/// rather than failing configuration outright.
pub fn configure_handler(backend: &str) -> Result<Box<dyn Handler>, ConfigError> {
    if !backend.contains("://") {
        return Ok(fallback_or(backend, None));
    }

    let url = match Url::parse(backend) {
        Ok(url) => url,
        Err(_) => {
            log::warn!("backend {backend:?} could not be parsed, falling back to log handler");
            return Ok(Box::new(LogHandler::new("stats".to_string())));
        }
    };

    let host = url.host_str().unwrap_or("127.0.0.1").to_string();
    let port = url.port();

    let handler: Box<dyn Handler> = match url.scheme() {
        "tcp" | "stream" => {
            let port = port.ok_or_else(|| HandlerError::BadUrl(backend.to_string()))?;
            Box::new(StreamHandler::new(host, port))
        }
        "udp" | "datagram" => {
            let port = port.ok_or_else(|| HandlerError::BadUrl(backend.to_string()))?;
            Box::new(DatagramHandler::new(host, port))
        }
        "udp+tnetstrings" | "tnetstrings" => {
            let port = port.ok_or_else(|| HandlerError::BadUrl(backend.to_string()))?;
            Box::new(TNetStringsHandler::new(host, port))
        }
        "log" => Box::new(LogHandler::new(host)),
        other => fallback_or(other, Some(backend)),
    };
    Ok(handler)
}

fn fallback_or(scheme: &str, full_backend: Option<&str>) -> Box<dyn Handler> {
    if scheme != "log" && !scheme.is_empty() {
        log::warn!(
            "unknown handler backend {:?}, falling back to log handler",
            full_backend.unwrap_or(scheme)
        );
    }
    Box::new(LogHandler::new("stats".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_a_single_log_handler_every_thirty_seconds() {
        let config = StatsConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.handlers.len(), 1);
        assert_eq!(config.handlers[0].backend, "log");
    }

    #[test]
    fn parses_interval_and_handler_list() {
        let raw = "\
[default]
interval = 15
handlers = primary, secondary

[handler_primary]
backend = tcp://stats.internal:14150

[handler_secondary]
backend = log
";
        let ini = Ini::load_from_str(raw).unwrap();
        let config = parse_stats_conf(&ini).unwrap();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.handlers.len(), 2);
        assert_eq!(config.handlers[0].name, "primary");
        assert_eq!(config.handlers[0].backend, "tcp://stats.internal:14150");
        assert_eq!(config.handlers[1].backend, "log");
    }

    #[test]
    fn missing_backend_key_is_an_error() {
        let raw = "\
[default]
handlers = broken

[handler_broken]
name = broken
";
        let ini = Ini::load_from_str(raw).unwrap();
        assert!(parse_stats_conf(&ini).is_err());
    }

    #[test]
    fn bare_scheme_without_scheme_separator_is_accepted() {
        let handler = configure_handler("log");
        assert!(handler.is_ok());
    }

    #[test]
    fn unknown_scheme_falls_back_to_log_handler_without_erroring() {
        let handler = configure_handler("carrier-pigeon://example.com");
        assert!(handler.is_ok());
    }

    #[test]
    fn tcp_backend_without_port_is_a_bad_url_error() {
        let handler = configure_handler("tcp://stats.internal");
        assert!(handler.is_err());
    }
}
