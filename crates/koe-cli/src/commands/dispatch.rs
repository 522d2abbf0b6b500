use koe_config::KoeConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    config: KoeConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Analyze(args) => commands::analyze::handle(&args, config, flags).await,
        Commands::SummarizeComments(args) => {
            commands::summarize::handle_comments(&args, config, flags).await
        }
        Commands::SummarizeThread(args) => {
            commands::summarize::handle_thread(&args, config, flags).await
        }
        Commands::RecommendSurveys(args) => {
            commands::summarize::handle_surveys(&args, config, flags).await
        }
        Commands::Config { action } => commands::config::handle(&action, &config, flags),
        Commands::Schema(args) => commands::schema::handle(&args, flags),
    }
}
