//! Command-line argument parsing for kmodctl
use crate::config::{ControllerConfig, MatchMode, DEFAULT_MODULES_ROOT, DEFAULT_TIMEOUT_SECS};
use crate::formats::traits::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kmodctl", version)]
#[command(about = "Inspect, load and unload Linux kernel modules", long_about = None)]
pub struct Cli {
    /// Command to run (default: list)
    #[command(subcommand)]
    pub command: Option<ModuleCommand>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormatArg,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<std::path::PathBuf>,

    /// Directory holding one module tree per kernel release
    #[arg(long, value_name = "DIR", default_value = DEFAULT_MODULES_ROOT, global = true)]
    pub modules_root: std::path::PathBuf,

    /// Use this kernel release instead of the running one
    #[arg(long, value_name = "RELEASE", global = true)]
    pub kernel_release: Option<String>,

    /// Timeout in seconds for each external command
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout: u64,

    /// Program used to run load/unload with privileges (e.g. sudo, pkexec)
    #[arg(long, value_name = "PROGRAM", global = true)]
    pub elevate: Option<String>,

    /// Do not pass the force flag when unloading
    #[arg(long, global = true)]
    pub no_force: bool,

    /// Match resident modules by raw substring instead of by name
    #[arg(long, global = true)]
    pub substring_match: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Enable verbose output (warnings, status messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            modules_root: self.modules_root.clone(),
            kernel_release: self.kernel_release.clone(),
            command_timeout: Duration::from_secs(self.timeout),
            elevate: self.elevate.clone(),
            force_remove: !self.no_force,
            match_mode: if self.substring_match {
                MatchMode::Substring
            } else {
                MatchMode::Exact
            },
            ..ControllerConfig::default()
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        match self.format {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Jsonl => OutputFormat::Jsonl,
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ModuleCommand {
    /// List installed modules with their state
    List {
        /// Filter by module name (regex)
        #[arg(long)]
        name: Option<String>,

        /// Only loaded modules
        #[arg(long, conflicts_with = "unloaded")]
        loaded: bool,

        /// Only modules that are not loaded
        #[arg(long)]
        unloaded: bool,
    },

    /// Show a single module
    Show {
        /// Module name
        name: String,
    },

    /// Load a module
    Load {
        /// Module name
        name: String,

        /// Attempt the load even if the module already shows as loaded
        #[arg(long)]
        anyway: bool,
    },

    /// Unload a module
    Unload {
        /// Module name
        name: String,

        /// Attempt the unload even if the module already shows as unloaded
        #[arg(long)]
        anyway: bool,
    },

    /// Refresh and re-render the inventory periodically
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = 2)]
        interval: u64,

        /// Stop after this many refreshes
        #[arg(long)]
        iterations: Option<u64>,
    },

    /// Interactive session reading commands from stdin
    Shell,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormatArg {
    Text,
    Csv,
    Json,
    Jsonl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["kmodctl"]).unwrap();
        assert!(cli.command.is_none());
        let config = cli.controller_config();
        assert_eq!(config.modules_root, std::path::PathBuf::from("/lib/modules"));
        assert!(config.force_remove);
        assert_eq!(config.match_mode, MatchMode::Exact);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kmodctl",
            "unload",
            "dummy",
            "--elevate",
            "sudo",
            "--no-force",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(ModuleCommand::Unload {
                name: "dummy".to_string(),
                anyway: false
            })
        );
        let config = cli.controller_config();
        assert_eq!(config.elevate.as_deref(), Some("sudo"));
        assert!(!config.force_remove);
        assert_eq!(cli.output_format(), OutputFormat::Json);
    }

    #[test]
    fn test_loaded_and_unloaded_conflict() {
        assert!(Cli::try_parse_from(["kmodctl", "list", "--loaded", "--unloaded"]).is_err());
    }
}
