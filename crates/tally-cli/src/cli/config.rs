use anyhow::bail;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tally::{RevertFloor, SequenceScope};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Runtime configuration for the `tally` binary.
///
/// Global settings may come from CLI flags or environment variables (a `.env`
/// file in the working directory is loaded first). The scope of an operation
/// is always given on the command line.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tally",
    version,
    about = "Allocate, revert and inspect scope-keyed sequence numbers"
)]
pub struct CliArgs {
    /// Path of the JSON counter table.
    ///
    /// Created on the first allocation if it does not exist.
    ///
    /// Environment variable: `TALLY_STORE_PATH`
    #[arg(long, env = "TALLY_STORE_PATH", default_value = "tally.json", global = true)]
    pub store_path: PathBuf,

    /// Lowest value a revert may leave a counter at.
    ///
    /// When unset, reverts are unbounded and may drive a counter to zero or
    /// below.
    ///
    /// Environment variable: `TALLY_REVERT_FLOOR`
    #[arg(long, env = "TALLY_REVERT_FLOOR", allow_hyphen_values = true, global = true)]
    pub revert_floor: Option<i64>,

    /// Locking strategy used around each read-modify-write cycle.
    ///
    /// Environment variable: `TALLY_ALLOCATOR`
    #[arg(long, env = "TALLY_ALLOCATOR", value_enum, default_value_t = AllocatorKind::Global, global = true)]
    pub allocator: AllocatorKind,

    /// Log filter directive, e.g. `info` or `tally=debug`. `RUST_LOG` takes
    /// precedence when set.
    ///
    /// Environment variable: `TALLY_LOG`
    #[arg(long, env = "TALLY_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    ///
    /// Environment variable: `TALLY_LOG_JSON`
    #[arg(long, env = "TALLY_LOG_JSON", default_value_t = false, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Allocate the next number for a scope and print it.
    Allocate(ScopeArgs),
    /// Undo the last allocation for a scope.
    Revert(ScopeArgs),
    /// Print the last allocated number for a scope, or `none`.
    Current(ScopeArgs),
    /// Print every counter in the table.
    List,
}

/// The composite key selecting one counter.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ScopeArgs {
    /// Facility identifier (UUID).
    #[arg(long)]
    pub facility: Uuid,

    /// Program identifier (UUID).
    #[arg(long)]
    pub program: Uuid,

    /// Numbering year.
    #[arg(long, allow_hyphen_values = true)]
    pub year: i32,

    /// Select the emergency sequence instead of the regular one.
    #[arg(long, default_value_t = false)]
    pub emergency: bool,
}

impl From<&ScopeArgs> for SequenceScope {
    fn from(args: &ScopeArgs) -> Self {
        SequenceScope::new(args.facility, args.program, args.year, args.emergency)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorKind {
    /// One lock for every scope.
    Global,
    /// One lock per scope.
    Keyed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub store_path: PathBuf,
    pub revert_floor: RevertFloor,
    pub allocator: AllocatorKind,
    pub log: LogConfig,
    pub command: Command,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.store_path.as_os_str().is_empty() {
            bail!("TALLY_STORE_PATH must not be empty");
        }

        if args.store_path.is_dir() {
            bail!(
                "TALLY_STORE_PATH ({}) is a directory, expected a file path",
                args.store_path.display()
            );
        }

        if let Err(e) = EnvFilter::try_new(&args.log_level) {
            bail!("TALLY_LOG ({}) is not a valid filter: {e}", args.log_level);
        }

        Ok(Self {
            store_path: args.store_path,
            revert_floor: RevertFloor::from_bound(args.revert_floor),
            allocator: args.allocator,
            log: LogConfig {
                filter: args.log_level,
                json: args.log_json,
            },
            command: args.command,
        })
    }
}
