//! Process configuration: a `clap`-derived CLI layered over environment
//! variables, grounded on `ai-coach-api/src/config/app.rs`'s
//! `AppConfig::from_env()` and `ai-coach-cli/src/main.rs`'s `Cli` struct.
//! The worker has no network surface and no secrets, so the two knobs it
//! needs (model root, log level) are expressed directly as `clap` fields
//! with `env` fallbacks rather than a separate `from_env()` constructor.

use std::path::PathBuf;

use clap::Parser;

const DEFAULT_MODEL_ROOT: &str = "./models";
const DEFAULT_LOG_LEVEL: &str = "info";

/// `exercise-analyzer` is a long-running stdio co-process; it takes no
/// subcommands, only the flags that shape its environment.
#[derive(Debug, Parser)]
#[command(name = "exercise-analyzer")]
#[command(about = "Stdio worker that classifies exercise form and counts reps from pose landmarks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory containing per-exercise `.model` classifier artifacts.
    #[arg(long, env = "EXERCISE_ANALYZER_MODEL_ROOT", default_value = DEFAULT_MODEL_ROOT)]
    pub model_root: PathBuf,

    /// Log filter directive passed to `tracing_subscriber::EnvFilter`.
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

impl Cli {
    /// Installs a `tracing_subscriber` writing to stderr (stdout is
    /// reserved for wire-protocol responses) filtered by `log_level`,
    /// falling back to `info` the same way the teacher's CLI does.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn defaults_apply_with_no_arguments() {
        let cli = Cli::parse_from(["exercise-analyzer"]);
        assert_eq!(cli.model_root, PathBuf::from(DEFAULT_MODEL_ROOT));
        assert_eq!(cli.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["exercise-analyzer", "--model-root", "/opt/models", "--log-level", "debug"]);
        assert_eq!(cli.model_root, PathBuf::from("/opt/models"));
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn command_definition_is_well_formed() {
        Cli::command().debug_assert();
    }
}
