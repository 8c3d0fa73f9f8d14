//! CLI argument definitions
//!
//! All Clap derive structs for `formwarden` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Default location of the store file.
pub const DEFAULT_STORE: &str = "formwarden-store.json";

/// Default base URL of the wrapper page.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

// ============================================================================
// Root CLI
// ============================================================================

/// Monitored form sessions with violation tracking and lockout.
#[derive(Parser, Debug)]
#[command(name = "formwarden", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "FORMWARDEN_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "FORMWARDEN_LOG_FORMAT")]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create and manage share links.
    Link(LinkCommand),

    /// Run a monitored session.
    Session(SessionCommand),

    /// Inspect the session event log.
    Events(EventsCommand),

    /// Manage stored data.
    Data(DataCommand),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

/// Location of the store file, shared by every command that needs it.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the JSON store file.
    #[arg(long = "store", default_value = DEFAULT_STORE, env = "FORMWARDEN_STORE")]
    pub path: PathBuf,
}

// ============================================================================
// Link Command
// ============================================================================

/// Link management commands.
#[derive(Args, Debug)]
pub struct LinkCommand {
    /// Link subcommand.
    #[command(subcommand)]
    pub subcommand: LinkSubcommand,
}

/// Link subcommands.
#[derive(Subcommand, Debug)]
pub enum LinkSubcommand {
    /// Create a link for a form.
    Create(LinkCreateArgs),

    /// List stored links.
    List(LinkListArgs),

    /// Delete a stored link.
    Delete(LinkDeleteArgs),

    /// Show the configuration behind a share URL, bundle or link id.
    Decode(LinkDecodeArgs),
}

/// Arguments for `link create`.
#[derive(Args, Debug)]
pub struct LinkCreateArgs {
    /// URL of the form to embed.
    pub form_url: String,

    /// Violations that lock the session (1-10).
    #[arg(short = 'n', long, default_value_t = 3)]
    pub allowed_violations: u32,

    /// Time limit in minutes (5-300). Omit or pass 0 for no limit.
    #[arg(short, long)]
    pub duration: Option<u32>,

    /// Require students to give an email before starting.
    #[arg(long)]
    pub require_email: bool,

    /// Base URL hosting the wrapper page.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "FORMWARDEN_BASE_URL")]
    pub base_url: String,

    /// Treat warnings (e.g. an unrecognized form host) as errors.
    #[arg(long)]
    pub strict: bool,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `link list`.
#[derive(Args, Debug)]
pub struct LinkListArgs {
    /// Base URL hosting the wrapper page.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "FORMWARDEN_BASE_URL")]
    pub base_url: String,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `link delete`.
#[derive(Args, Debug)]
pub struct LinkDeleteArgs {
    /// Link id.
    pub id: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `link decode`.
#[derive(Args, Debug)]
pub struct LinkDecodeArgs {
    /// Share URL, encoded bundle, or stored link id.
    pub link: String,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,
}

// ============================================================================
// Session Command
// ============================================================================

/// Session commands.
#[derive(Args, Debug)]
pub struct SessionCommand {
    /// Session subcommand.
    #[command(subcommand)]
    pub subcommand: SessionSubcommand,
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionSubcommand {
    /// Run a session, reading violations from stdin one per line.
    ///
    /// Each line is a violation kind (e.g. `tab_switch`) or one of the
    /// control words `ack`, `status`, `email <address>` and `end`. Status and
    /// signals are printed to stdout as JSON lines. The session ends when
    /// stdin closes or on Ctrl+C.
    Run(SessionRunArgs),
}

/// Arguments for `session run`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("source").required(true).multiple(false))]
pub struct SessionRunArgs {
    /// Stored link id.
    #[arg(long, group = "source")]
    pub id: Option<String>,

    /// Encoded configuration bundle.
    #[arg(long, group = "source")]
    pub bundle: Option<String>,

    /// Share URL carrying a bundle or an id.
    #[arg(long, group = "source")]
    pub url: Option<String>,

    /// Student email.
    #[arg(long, env = "FORMWARDEN_EMAIL")]
    pub email: Option<String>,

    /// Print a line for every countdown tick.
    #[arg(long)]
    pub ticks: bool,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "FORMWARDEN_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(flatten)]
    pub store: StoreArgs,
}

// ============================================================================
// Events Command
// ============================================================================

/// Event log commands.
#[derive(Args, Debug)]
pub struct EventsCommand {
    /// Events subcommand.
    #[command(subcommand)]
    pub subcommand: EventsSubcommand,
}

/// Events subcommands.
#[derive(Subcommand, Debug)]
pub enum EventsSubcommand {
    /// List logged events, oldest first.
    List(EventsListArgs),

    /// Show totals, per-session summaries and recent violations.
    Stats(EventsStatsArgs),

    /// Export links, analytics and events as JSON.
    Export(EventsExportArgs),
}

/// Arguments for `events list`.
#[derive(Args, Debug)]
pub struct EventsListArgs {
    /// Only show events for this session.
    #[arg(long)]
    pub session: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `events stats`.
#[derive(Args, Debug)]
pub struct EventsStatsArgs {
    /// Maximum sessions to list.
    #[arg(long, default_value_t = crate::report::SESSION_LIMIT)]
    pub sessions: usize,

    /// Maximum violations to list.
    #[arg(long, default_value_t = crate::report::VIOLATION_LIMIT)]
    pub violations: usize,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `events export`.
#[derive(Args, Debug)]
pub struct EventsExportArgs {
    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,
}

// ============================================================================
// Data Command
// ============================================================================

/// Stored data commands.
#[derive(Args, Debug)]
pub struct DataCommand {
    /// Data subcommand.
    #[command(subcommand)]
    pub subcommand: DataSubcommand,
}

/// Data subcommands.
#[derive(Subcommand, Debug)]
pub enum DataSubcommand {
    /// Delete every link, event and analytics entry.
    Clear(DataClearArgs),
}

/// Arguments for `data clear`.
#[derive(Args, Debug)]
pub struct DataClearArgs {
    /// Confirm the deletion.
    #[arg(long)]
    pub yes: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}
