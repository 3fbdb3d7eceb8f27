//! Arkiva CLI — operational commands for the attachment storage engine.
//!
//! Set ARKIVA_DATABASE_URL (or DATABASE_URL), ARKIVA_NAMESPACE and
//! ARKIVA_FILESTORE_PATH.

use std::sync::Arc;

use anyhow::Context;
use arkiva_cli::init_tracing;
use arkiva_core::constants::PARAM_STORAGE_LOCATION;
use arkiva_core::{AttachmentDirectory, Config, StorageLocation};
use arkiva_db::{connect_pool, run_migrations, PgAttachmentDirectory};
use arkiva_services::{BulkMigrator, GarbageCollector, InspectionService, MaintenanceService};
use arkiva_storage::{
    ContentAddresser, EnginePolicy, LocalFilestore, RemoteConnector, S3Connector, StorageEngine,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "arkiva", about = "Arkiva attachment storage maintenance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a maintenance cycle (garbage collection + one-time bulk migration)
    Maintenance {
        /// Keep running on the configured interval instead of exiting
        #[arg(long)]
        watch: bool,
    },
    /// Run one garbage-collection pass
    Gc,
    /// Run the one-shot bulk migration to the remote store
    Migrate,
    /// Check stored objects for a set of attachment ids
    Inspect {
        /// Attachment UUIDs
        ids: Vec<String>,
    },
    /// Validate a storage location descriptor and persist it
    SetLocation {
        /// Location descriptor, e.g. s3://profile:default@mybucket
        location: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = connect_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to the metadata database")?;
    run_migrations(&pool).await?;

    let directory = Arc::new(PgAttachmentDirectory::new(pool));
    let local = LocalFilestore::new(config.filestore_path.clone()).await?;
    let engine = Arc::new(StorageEngine::new(
        ContentAddresser::new(config.namespace.clone()),
        local,
        directory.clone(),
        Arc::new(S3Connector::from_config(&config)),
        EnginePolicy {
            gc_mark_local_after_remote_failure: config.gc_mark_local_after_remote_failure,
        },
    ));

    match cli.command {
        Commands::Maintenance { watch } => {
            let service = Arc::new(MaintenanceService::new(
                engine,
                directory,
                config.maintenance_interval_secs,
            ));
            if watch {
                service.start().await?;
            } else {
                let report = service.run_cycle().await;
                print_json(&report)?;
            }
        }
        Commands::Gc => {
            let collector = GarbageCollector::new(engine, directory);
            print_json(&collector.collect().await?)?;
        }
        Commands::Migrate => {
            let migrator = BulkMigrator::new(engine, directory);
            print_json(&migrator.run_once().await?)?;
        }
        Commands::Inspect { ids } => {
            let ids = ids
                .iter()
                .map(|raw| Uuid::parse_str(raw))
                .collect::<Result<Vec<_>, _>>()
                .context("Invalid attachment id")?;
            let service = InspectionService::new(engine, directory);
            print_json(&service.verify(&ids).await?)?;
        }
        Commands::SetLocation { location } => {
            match StorageLocation::parse(&location)? {
                StorageLocation::Remote(ref remote) => {
                    // Prove the descriptor works before persisting it.
                    let connector = S3Connector::from_config(&config);
                    connector.connect(remote).await.map_err(|e| {
                        anyhow::anyhow!("Cannot access bucket {:?}: {}", remote.bucket, e)
                    })?;
                }
                StorageLocation::Local => {}
            }
            directory
                .set_param(PARAM_STORAGE_LOCATION, &location)
                .await?;
            println!("Storage location set to {location}");
        }
    }

    Ok(())
}
