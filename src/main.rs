use anyhow::Context;
use clap::{Parser, Subcommand};
use popchange_map::{build_map, render, server, AppConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the map and write the SVG figure and HTML page
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Build the map once and serve it
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Overrides `[server].port`
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let figure = build_map(&app_config.input, app_config.input.source_crs()?)
                .context("Failed to build map")?;

            render::write_outputs(&app_config, &figure)?;
        }
        Commands::Serve { config, port } => {
            let app_config = AppConfig::load_from_file(config)?;
            let figure = build_map(&app_config.input, app_config.input.source_crs()?)
                .context("Failed to build map")?;

            let svg = render::render_svg(&figure, &app_config.figure);
            let page = render::render_page(&svg);

            server::start_server(page, port.unwrap_or(app_config.server.port)).await?;
        }
    }

    Ok(())
}
