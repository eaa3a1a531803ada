//! Clap derive structures for the `meetnet` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// meetnet -- query the Flemish Banks buoy network from the command line
#[derive(Debug, Parser)]
#[command(
    name = "meetnet",
    version,
    about = "Query Meetnet Vlaamse Banken buoy measurements from the command line",
    long_about = "A CLI for the Meetnet Vlaamse Banken monitoring network.\n\n\
        Lists the location catalog, projects selected locations into sensors,\n\
        and polls their current measurements once or continuously.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "MEETNET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "MEETNET_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Account username (overrides profile)
    #[arg(long, short = 'u', env = "MEETNET_USERNAME", global = true)]
    pub username: Option<String>,

    /// Response schema to parse against
    #[arg(long, env = "MEETNET_SCHEMA", global = true)]
    pub schema: Option<SchemaArg>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MEETNET_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MEETNET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemaArg {
    /// Detect from each response
    Auto,
    /// `Location` / `Parameter` references, WKT positions
    V2,
    /// `LocationID` / `ParameterID` references, lat/lon positions
    Legacy,
}

impl From<SchemaArg> for meetnet_api::SchemaVariant {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Auto => Self::Auto,
            SchemaArg::V2 => Self::V2,
            SchemaArg::Legacy => Self::Legacy,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify that the configured credentials are accepted
    Check,

    /// List monitoring locations from the catalog
    #[command(alias = "loc", alias = "l")]
    Locations(LocationsArgs),

    /// List measurable parameters from the catalog
    #[command(alias = "params")]
    Parameters,

    /// Show the sensors exposed for the selected locations
    #[command(alias = "s")]
    Sensors(SelectionArgs),

    /// Fetch current measurements once, or keep polling with --watch
    Poll(PollArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Selection Arguments ───────────────────────────────────────

/// Location selection shared by the data commands.
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Location id to include (repeatable; overrides the profile's selection)
    #[arg(long = "location", short = 'l', value_name = "ID")]
    pub locations: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOCATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LocationsArgs {
    /// Only show locations whose id or name contains this text
    #[arg(long, short = 'f')]
    pub filter: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  POLL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PollArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Keep polling until interrupted
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i', value_name = "SECS")]
    pub interval: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Config key (username, locations, schema, base_url, ...)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
