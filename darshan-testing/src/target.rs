use clap::{Parser, Subcommand};
use darshan_logic::{Coordinate, DEFAULT_TARGET_ID, TargetLocation, TargetStore};
use darshan_sim_shared::prelude::*;
use darshan_store::{HttpTargetStore, SERVER_HTTP_URL};

#[derive(Parser)]
/// Read or move the target record on a running location server
struct Cli {
    /// Base URL of the location server
    #[arg(long, default_value = SERVER_HTTP_URL)]
    server: String,

    /// Id of the record to work with
    #[arg(long, default_value = DEFAULT_TARGET_ID)]
    id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current target
    Get,
    /// Move the target
    Set {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
        /// Human readable address to store with it
        #[arg(long)]
        address: Option<String>,
    },
    /// Reset the target to the built-in default
    Init,
}

fn print_record(record: &TargetLocation) -> Result {
    let encoded = serde_json::to_string_pretty(record).context("Failed to encode record")?;
    println!("{encoded}");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();
    let store = HttpTargetStore::with_base_url(cli.server)?;

    match cli.command {
        Commands::Get => {
            let record = store
                .fetch(&cli.id)
                .await
                .context("Failed to fetch target")?
                .ok_or_else(|| anyhow!("No target stored under {}", cli.id))?;
            print_record(&record)
        }
        Commands::Set {
            latitude,
            longitude,
            address,
        } => {
            let coordinate = Coordinate::new(latitude, longitude);
            if !coordinate.is_valid() {
                bail!("{coordinate} is not a valid coordinate");
            }
            let record = store
                .update(&cli.id, coordinate, address)
                .await
                .context("Failed to update target")?;
            print_record(&record)
        }
        Commands::Init => {
            let record = store
                .initialize_default()
                .await
                .context("Failed to initialize target")?;
            print_record(&record)
        }
    }
}
