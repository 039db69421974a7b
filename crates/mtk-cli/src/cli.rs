use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mtk",
    version,
    about = "mtk - pluggable tool server speaking JSON-RPC over stdio"
)]
pub struct Cli {
    /// Configuration file (default: ~/.mtk/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory scanned for module units instead of the built-in catalog
    #[arg(long, global = true)]
    pub modules_dir: Option<PathBuf>,

    /// Directory the filesystem module may access, unless its tool_config sets allowed_dirs
    #[arg(
        long = "allowed-dir",
        global = true,
        env = "MTK_FILESYSTEM_DIRS",
        value_delimiter = ','
    )]
    pub allowed_dirs: Vec<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register modules and serve JSON-RPC on stdin/stdout (default)
    Serve,

    /// Register modules and print the registry status
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register modules and invoke one operation
    Call {
        /// Operation name, e.g. read_file
        operation: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the stock configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Filter directive for the tracing subscriber.
    ///
    /// `--verbose` wins, then the configured level, then `MTK_LOG_LEVEL`.
    pub fn log_filter(&self, configured: Option<&str>) -> String {
        resolve_log_filter(
            self.verbose,
            configured,
            std::env::var("MTK_LOG_LEVEL").ok().as_deref(),
        )
    }
}

fn resolve_log_filter(verbose: bool, configured: Option<&str>, env: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    let non_blank = |level: &&str| !level.trim().is_empty();
    configured
        .filter(non_blank)
        .or_else(|| env.filter(non_blank))
        .unwrap_or("info")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["mtk"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_allowed_dirs_split_on_commas() {
        let cli = Cli::try_parse_from(["mtk", "--allowed-dir", "/tmp,/var/tmp", "status"]).unwrap();
        assert_eq!(cli.allowed_dirs, vec!["/tmp", "/var/tmp"]);
        assert!(matches!(cli.command, Some(Commands::Status { json: false })));
    }

    #[test]
    fn test_call_args() {
        let cli = Cli::try_parse_from([
            "mtk",
            "call",
            "read_file",
            "--args",
            r#"{"path":"a.txt"}"#,
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Call { operation, args }) => {
                assert_eq!(operation, "read_file");
                assert_eq!(args, r#"{"path":"a.txt"}"#);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::try_parse_from(["mtk", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Init { force: true }
            })
        ));
    }

    #[test]
    fn test_blank_configured_level_falls_back_to_env() {
        assert_eq!(resolve_log_filter(false, Some(""), Some("trace")), "trace");
        assert_eq!(resolve_log_filter(false, Some("  "), None), "info");
        assert_eq!(resolve_log_filter(false, Some("warn"), Some("trace")), "warn");
        assert_eq!(resolve_log_filter(false, None, Some("")), "info");
        assert_eq!(resolve_log_filter(true, Some("warn"), Some("trace")), "debug");
    }

    #[test]
    fn test_verbose_overrides_configured_level() {
        let cli = Cli::try_parse_from(["mtk", "-v"]).unwrap();
        assert_eq!(cli.log_filter(Some("warn")), "debug");

        let cli = Cli::try_parse_from(["mtk"]).unwrap();
        assert_eq!(cli.log_filter(Some("mtk_registry=trace")), "mtk_registry=trace");
    }
}
