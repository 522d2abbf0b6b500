use clap::{Args, Subcommand, ValueEnum};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Cluster free-text answers, name the topics, and build a discussion agenda.
    Analyze(AnalyzeArgs),
    /// Summarize comments left on a proposal.
    SummarizeComments(InputArgs),
    /// Summarize a discussion thread and propose next steps.
    SummarizeThread(InputArgs),
    /// Suggest surveys from casual-board posts.
    RecommendSurveys(RecommendArgs),
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Print the JSON schema of an input or output type.
    Schema(SchemaArgs),
}

/// Where to read items from.
///
/// Files ending in `.jsonl` or `.ndjson` are read as JSON Lines; anything
/// else is plain text with one item per non-blank line.
#[derive(Clone, Debug, Args)]
pub struct InputArgs {
    /// Input file; stdin when omitted or `-`
    pub input: Option<String>,

    /// Force JSON Lines parsing regardless of the file extension
    #[arg(long)]
    pub jsonl: bool,
}

#[derive(Clone, Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Survey theme or title, used to steer naming and the agenda
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Skip agenda synthesis and return records and labels only
    #[arg(long)]
    pub no_issues: bool,
}

#[derive(Clone, Debug, Args)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Organization name shown to the model
    #[arg(long, default_value = "")]
    pub org_name: String,
}

#[derive(Clone, Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML (API key masked).
    Show,
    /// Print the configuration file locations that are read.
    Path,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Type to describe
    #[arg(value_enum)]
    pub target: SchemaTarget,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SchemaTarget {
    Request,
    Report,
    ThreadComment,
    CommentSummary,
    ThreadSummary,
    SurveyRecommendations,
}
