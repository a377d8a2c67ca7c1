//! CLI entry point - the composition root.
//!
//! This is the only place where real infrastructure is chosen: the cpal
//! device registry and, inside the talk handler, the console session
//! collaborators. Command dispatch routes to handlers.

use clap::Parser;

use banter_audio::CpalDeviceRegistry;
use banter_cli::{Cli, Commands, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // No command provided - show help
        use clap::CommandFactory;
        banter_cli::Cli::command().print_help()?;
        return Ok(());
    };

    let registry = CpalDeviceRegistry::new();
    match command {
        Commands::Devices => {
            handlers::devices::execute(&registry).await?;
        }
        Commands::Talk {
            device,
            memory_file,
            save_transcript,
            grace_ms,
            history_window,
        } => {
            let args = handlers::talk::TalkArgs {
                device,
                memory_file,
                save_transcript,
                grace_ms,
                history_window,
            };
            handlers::talk::execute(&registry, args).await?;
        }
    }

    Ok(())
}
