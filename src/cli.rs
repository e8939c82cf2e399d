//! Command-line interface parsing for flockcache
//!
//! Parses global store options and the subcommand with clap, then layers the
//! options over the environment configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::cache::PruneBy;
use crate::config::Config;
use crate::fetch::Headers;
use crate::lock::LockStrategy;

/// flockcache - persistent HTTP response cache shared across processes
#[derive(Parser, Debug)]
#[command(name = "flockcache")]
#[command(about = "Persistent, lock-guarded HTTP response cache")]
#[command(version)]
pub struct Cli {
    /// Store file (overrides CACHE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Default TTL in seconds, negative = never expire (overrides DEFAULT_TTL)
    #[arg(long, global = true, value_name = "SECONDS", allow_negative_numbers = true)]
    pub ttl: Option<i64>,

    /// Lock strategy: process or thread (overrides LOCK_STRATEGY)
    #[arg(long, global = true, value_name = "STRATEGY")]
    pub lock: Option<LockStrategy>,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations on the store
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch a URL through the cache and print its body
    Fetch {
        url: String,
        /// Extra request header, e.g. -H "Accept: text/html"
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = parse_header_arg)]
        headers: Vec<(String, String)>,
    },
    /// Show a stored item
    Get { key: String },
    /// Store a text body under a key, expiring after the store TTL
    Put {
        key: String,
        #[arg(long)]
        body: String,
    },
    /// Set the expiry of a stored item, now by default
    Expire {
        key: String,
        #[arg(long, value_name = "RFC3339", value_parser = parse_timestamp_arg)]
        at: Option<DateTime<Utc>>,
    },
    /// Remove a stored item
    Delete { key: String },
    /// Remove items whose timestamp is before a cutoff
    Prune {
        /// Cutoff, now by default
        #[arg(long, value_name = "RFC3339", value_parser = parse_timestamp_arg)]
        before: Option<DateTime<Utc>>,
        /// Timestamp to compare: expire or updated
        #[arg(long, default_value = "expire")]
        by: PruneBy,
    },
    /// Remove every item
    Clear,
    /// Count stored items by freshness
    Stats,
    /// Prune expired items periodically until interrupted
    Maintain {
        /// Seconds between sweeps (overrides PRUNE_INTERVAL)
        #[arg(long, value_name = "SECONDS")]
        interval: Option<u64>,
    },
}

impl Cli {
    /// Applies the global options on top of `config`.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        if let Some(ttl) = self.ttl {
            config.default_ttl = ttl;
        }
        if let Some(lock) = self.lock {
            config.lock_strategy = lock;
        }
        if let Command::Maintain {
            interval: Some(interval),
        } = self.command
        {
            config.prune_interval = interval;
        }
        config
    }
}

/// Parses a `Name: value` header argument.
///
/// # Returns
/// * `Ok((name, value))` with both sides trimmed
/// * `Err` if there is no colon or the name is empty
pub fn parse_header_arg(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{}': expected 'Name: value'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{}': empty name", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_timestamp_arg(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
}

/// Collects repeated `-H` arguments; repeated names are joined.
pub fn request_headers(pairs: &[(String, String)]) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in pairs {
        headers.append(name, value.as_str());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch_with_headers() {
        let cli = Cli::try_parse_from([
            "flockcache",
            "fetch",
            "https://example.com",
            "-H",
            "Accept: text/html",
            "--header",
            "X-Trace:1",
        ])
        .unwrap();

        match cli.command {
            Command::Fetch { url, headers } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(
                    headers,
                    vec![
                        ("Accept".to_string(), "text/html".to_string()),
                        ("X-Trace".to_string(), "1".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_apply_over_config() {
        let cli = Cli::try_parse_from([
            "flockcache",
            "stats",
            "--store",
            "/tmp/x.db",
            "--ttl",
            "-1",
            "--lock",
            "thread",
        ])
        .unwrap();

        let config = cli.apply(Config {
            default_ttl: 300,
            ..Config::default()
        });
        assert_eq!(config.store_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.default_ttl, -1);
        assert_eq!(config.lock_strategy, LockStrategy::Thread);
    }

    #[test]
    fn test_apply_keeps_config_without_options() {
        let cli = Cli::try_parse_from(["flockcache", "clear"]).unwrap();
        let config = cli.apply(Config {
            default_ttl: 300,
            ..Config::default()
        });
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.store_path, PathBuf::from("flockcache.db"));
    }

    #[test]
    fn test_maintain_interval_overrides_config() {
        let cli = Cli::try_parse_from(["flockcache", "maintain", "--interval", "5"]).unwrap();
        assert_eq!(cli.apply(Config::default()).prune_interval, 5);
    }

    #[test]
    fn test_parse_prune_options() {
        let cli = Cli::try_parse_from([
            "flockcache",
            "prune",
            "--before",
            "2024-01-01T00:00:00Z",
            "--by",
            "updated",
        ])
        .unwrap();

        match cli.command {
            Command::Prune { before, by } => {
                assert_eq!(before.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
                assert_eq!(by, PruneBy::UpdatedAt);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_prune_defaults_to_expire_at() {
        let cli = Cli::try_parse_from(["flockcache", "prune"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Prune {
                before: None,
                by: PruneBy::ExpireAt
            }
        );
    }

    #[test]
    fn test_put_ttl_sets_store_default() {
        let cli =
            Cli::try_parse_from(["flockcache", "put", "key", "--body", "x", "--ttl", "60"]).unwrap();
        assert_eq!(cli.apply(Config::default()).default_ttl, 60);
    }

    #[test]
    fn test_put_requires_body() {
        assert!(Cli::try_parse_from(["flockcache", "put", "key"]).is_err());
    }

    #[test]
    fn test_invalid_lock_strategy_rejected() {
        assert!(Cli::try_parse_from(["flockcache", "stats", "--lock", "spin"]).is_err());
    }

    #[test]
    fn test_parse_header_arg() {
        assert_eq!(
            parse_header_arg("Accept:  text/html ").unwrap(),
            ("Accept".to_string(), "text/html".to_string())
        );
        assert!(parse_header_arg("no-colon").is_err());
        assert!(parse_header_arg(": value").is_err());
    }

    #[test]
    fn test_parse_timestamp_arg_converts_offset() {
        let parsed = parse_timestamp_arg("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(parse_timestamp_arg("yesterday").is_err());
    }

    #[test]
    fn test_request_headers_joins_repeats() {
        let headers = request_headers(&[
            ("Accept".to_string(), "text/html".to_string()),
            ("accept".to_string(), "application/json".to_string()),
        ]);
        assert_eq!(headers.get("accept"), Some("text/html, application/json"));
    }
}
