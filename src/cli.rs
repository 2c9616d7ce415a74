//! Command-line argument parsing for the relay server
//!
//! Flags override the matching `config.yaml` fields.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::RelayConfig;
use crate::injector::PasteShortcut;

/// Type on your computer from your phone's browser
#[derive(Parser, Debug, Default)]
#[command(
    name = "keyrelay",
    version,
    about = "Type on your computer from your phone's browser"
)]
pub struct CliArgs {
    /// Port to listen on [default: 5000]
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Address to listen on [default: 0.0.0.0]
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Rules file (defaults to hot-rule.txt next to the executable)
    #[arg(short, long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log what would be typed instead of touching the keyboard
    #[arg(long)]
    pub dry_run: bool,

    /// Only log to the console
    #[arg(long)]
    pub no_log_file: bool,
}

/// Everything the server needs to start, after merging flags and config
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub addr: SocketAddr,
    /// `None` only when no config directory and no executable path exist
    pub rules_file: Option<PathBuf>,
    pub paste_shortcut: PasteShortcut,
    pub paste_settle: Duration,
    pub dry_run: bool,
}

impl CliArgs {
    /// Merge the parsed flags over `config`.
    ///
    /// An unparseable `paste_shortcut` is logged and replaced by the
    /// platform default, like any other bad config value.
    pub fn into_startup(self, config: RelayConfig) -> StartupConfig {
        let paste_shortcut = config
            .paste_shortcut
            .parse::<PasteShortcut>()
            .unwrap_or_else(|e| {
                let fallback = PasteShortcut::platform_default();
                tracing::warn!(
                    "Invalid paste_shortcut {:?}: {}. Using {}",
                    config.paste_shortcut,
                    e,
                    fallback
                );
                fallback
            });

        let addr = SocketAddr::new(
            self.bind.unwrap_or(config.bind),
            self.port.unwrap_or(config.port),
        );

        let rules_file = crate::config_paths::resolve_rules_file(
            self.rules.as_deref(),
            config.rules_file.as_deref(),
        );

        StartupConfig {
            addr,
            rules_file,
            paste_shortcut,
            paste_settle: Duration::from_millis(config.paste_settle_ms),
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_no_args_uses_config() {
        let config = RelayConfig {
            port: 6000,
            ..RelayConfig::default()
        };
        let startup = CliArgs::default().into_startup(config);
        assert_eq!(startup.addr, "0.0.0.0:6000".parse().unwrap());
        assert!(!startup.dry_run);
        assert_eq!(startup.paste_settle, Duration::from_millis(40));
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs {
            port: Some(7000),
            bind: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            rules: Some(PathBuf::from("/tmp/my-rules.txt")),
            dry_run: true,
            ..CliArgs::default()
        };
        let config = RelayConfig {
            rules_file: Some(PathBuf::from("/tmp/config-rules.txt")),
            ..RelayConfig::default()
        };
        let startup = args.into_startup(config);

        assert_eq!(startup.addr, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(startup.rules_file, Some(PathBuf::from("/tmp/my-rules.txt")));
        assert!(startup.dry_run);
    }

    #[test]
    fn test_configured_shortcut_is_parsed() {
        let config = RelayConfig {
            paste_shortcut: "ctrl+shift+v".to_string(),
            ..RelayConfig::default()
        };
        let startup = CliArgs::default().into_startup(config);
        assert_eq!(startup.paste_shortcut.to_string(), "ctrl+shift+v");
    }

    #[test]
    fn test_bad_shortcut_falls_back_to_platform_default() {
        let config = RelayConfig {
            paste_shortcut: "ctrl+".to_string(),
            port: 6001,
            ..RelayConfig::default()
        };
        let startup = CliArgs::default().into_startup(config);
        assert_eq!(startup.paste_shortcut, PasteShortcut::platform_default());
        assert_eq!(startup.addr.port(), 6001);
    }

    #[test]
    fn test_parse_from_argv() {
        let args =
            CliArgs::parse_from(["keyrelay", "--port", "5050", "--dry-run", "--no-log-file"]);
        assert_eq!(args.port, Some(5050));
        assert!(args.dry_run);
        assert!(args.no_log_file);
        assert_eq!(args.rules, None);
    }
}
