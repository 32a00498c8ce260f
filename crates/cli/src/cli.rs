//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use contracts::SessionParameters;

/// Tutor Chain - staged LLM tutoring pipeline
#[derive(Parser, Debug)]
#[command(
    name = "tutor-chain",
    author,
    version,
    about = "Staged LLM tutoring pipeline",
    long_about = "Runs a fixed chain of tutoring prompts against a chat-completions backend.\n\n\
                  Each stage builds on the output of earlier stages: an introduction, \n\
                  key concepts, an application, a sample dataset, an analysis and \n\
                  visualization guidance."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TUTOR_CHAIN_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "TUTOR_CHAIN_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tutoring pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and stage table
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "TUTOR_CHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Override the default model
    #[arg(long, env = "TUTOR_CHAIN_MODEL")]
    pub model: Option<String>,

    /// Override the sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Per-stage timeout in seconds
    #[arg(long)]
    pub stage_timeout: Option<u64>,

    /// Use the offline echo backend (no credential needed)
    #[arg(long)]
    pub mock: bool,

    /// Validate configuration and exit without calling the backend
    #[arg(long)]
    pub dry_run: bool,

    /// Write a Markdown transcript to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TUTOR_CHAIN_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Session parameter overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Topic to explain
    #[arg(long)]
    pub topic: Option<String>,

    /// Learner's field of interest
    #[arg(long)]
    pub background: Option<String>,

    /// Learner's name
    #[arg(long)]
    pub name: Option<String>,

    /// Course the topic belongs to
    #[arg(long)]
    pub course: Option<String>,

    /// Preferred language of the explanation
    #[arg(long)]
    pub primary_language: Option<String>,

    /// Novice, Intermediate or Advanced
    #[arg(long)]
    pub course_expertise: Option<String>,
}

impl SessionArgs {
    /// Overlay the provided values onto `params`
    pub fn apply(&self, params: &mut SessionParameters) {
        let overrides = [
            (&self.topic, &mut params.topic),
            (&self.background, &mut params.background),
            (&self.name, &mut params.name),
            (&self.course, &mut params.course),
            (&self.primary_language, &mut params.primary_language),
            (&self.course_expertise, &mut params.course_expertise),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "tutor.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "tutor-chain",
            "-v",
            "run",
            "--mock",
            "--topic",
            "regression",
            "--course-expertise",
            "Advanced",
            "--stage-timeout",
            "30",
        ]);

        assert_eq!(cli.log_level(), "debug");
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.mock);
        assert_eq!(args.stage_timeout, Some(30));
        assert_eq!(args.metrics_port, 0);

        let mut params = SessionParameters::default();
        args.session.apply(&mut params);
        assert_eq!(params.topic, "regression");
        assert_eq!(params.course_expertise, "Advanced");
        assert_eq!(params.name, "Raj");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["tutor-chain", "-q", "-v", "info"]).is_err());
        let cli = Cli::parse_from(["tutor-chain", "-q", "info", "--json"]);
        assert_eq!(cli.log_level(), "warn");
    }
}
