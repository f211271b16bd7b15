pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "Tenant Admin CLI - development tokens, offline report rendering and migrations")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a signed session token for local development")]
    Token(commands::token::TokenArgs),

    #[command(about = "Render a report from JSON files without a database")]
    Render(commands::render::RenderArgs),

    #[command(about = "Apply pending database migrations")]
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Render(args) => commands::render::handle(args, output_format),
        Commands::Migrate => commands::migrate::handle(output_format).await,
    }
}
