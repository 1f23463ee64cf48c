pub mod config;
pub mod geoloc;
pub mod locations;
pub mod render;
pub mod server;
pub mod state;
pub mod store;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the persisted markers to a PNG and exit
    Snapshot {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "FILE", default_value = "map.png")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
        Commands::Snapshot { config, output } => {
            let app_config = config::AppConfig::load_from_file(config)?;

            let jar = store::CookieFile::open(app_config.storage.cookie_file.clone())?;
            let markers = store::CookieMarkerStore::new(jar);
            let state = state::MapState::init(markers, app_config.storage.max_markers);

            let snapshot = state.snapshot();
            println!(
                "Rendering {} custom markers ({} pins total) to {:?}",
                snapshot.custom_count, snapshot.total_count, output
            );
            let img = render::render_map(&app_config.map, &snapshot);
            img.save(output)?;
            println!("Snapshot complete!");
        }
    }

    Ok(())
}
