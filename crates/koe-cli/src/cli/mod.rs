use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `koe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "koe",
    version,
    about = "koe - cluster, name, and summarize free-text survey answers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only, no progress)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable network providers (local or lexical embeddings, placeholder names)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Write the result to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            offline: self.offline,
            output: self.output.clone(),
        }
    }
}
