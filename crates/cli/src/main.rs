use anyhow::Context;
use clap::{Parser, Subcommand};
use library_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "library-cli", version, about = "Book catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Apply pending schema migrations and exit
    Migrate,
    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load library settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            library_telemetry::init(&settings.telemetry)?;
            library_app::run(settings).await
        }
        Command::Migrate => {
            library_telemetry::init(&settings.telemetry)?;
            let applied = library_app::migrate(&settings).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {} migration(s)", applied);
            Ok(())
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
