//! Maintenance entry point for the course file store.
use std::env;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use config::Config;
use dotenvy::dotenv;
use validator::Validate;

use course_files::{
    EntityId, ExternalUri, FileCategory, FileService, ServiceError, Upload,
    models::config::StorageConfig,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Parser)]
#[command(name = "course-files")]
#[command(about = "Store and locate uploaded course files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a local file and print its external URI
    Save {
        /// File category, e.g. lecture-attachment
        category: FileCategory,
        /// File to store
        file: PathBuf,
        /// Entity ids in layout order
        #[arg(long = "id")]
        ids: Vec<EntityId>,
        /// Keep the original file name after the timestamp
        #[arg(long)]
        keep_original: bool,
    },
    /// Print the storage path for an external URI
    Resolve {
        category: FileCategory,
        uri: String,
    },
    /// Print the external URI for a stored file
    Uri {
        category: FileCategory,
        path: PathBuf,
    },
    /// List every category with its layout
    Categories,
}

fn main() {
    // Load environment variables from `.env` in local development.
    dotenv().ok();
    // Initialize logger with default level INFO if not provided.
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    // Select config profile (defaults to `local`).
    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "local".into());

    let settings = Config::builder()
        // Add `./config/default.yaml`
        .add_source(config::File::with_name("config/default").required(false))
        // Add environment-specific overrides
        .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
        // Add settings from the environment (with a prefix of APP)
        .add_source(config::Environment::with_prefix("APP"))
        .build();

    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("Error loading settings: {}", err);
            std::process::exit(1);
        }
    };

    let storage_config = match settings.try_deserialize::<StorageConfig>() {
        Ok(storage_config) => storage_config,
        Err(err) => {
            log::error!("Error loading storage config: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = storage_config.validate() {
        log::error!("Invalid storage config: {}", err);
        std::process::exit(1);
    }

    let service = match FileService::from_config(&storage_config) {
        Ok(service) => service,
        Err(err) => {
            log::error!("Error preparing upload root: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&service, cli.command) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

/// Open a local file for upload together with its length.
fn open_input(path: &Path) -> Result<(File, u64), CliError> {
    let read_failed = |source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    };
    let handle = File::open(path).map_err(read_failed)?;
    let size = handle.metadata().map_err(read_failed)?.len();
    Ok((handle, size))
}

fn run(service: &FileService, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Save {
            category,
            file,
            ids,
            keep_original,
        } => {
            let (handle, size) = open_input(&file)?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            let ids: Vec<Option<EntityId>> = ids.into_iter().map(Some).collect();

            let uri = service.save_upload(
                category,
                &ids,
                keep_original,
                Upload::new(file_name, size, handle),
            )?;
            println!("{uri}");
        }
        Commands::Resolve { category, uri } => {
            let path = service.resolve(&ExternalUri::new(uri), category)?;
            println!("{}", path.as_path().display());
        }
        Commands::Uri { category, path } => {
            let uri = service.external_uri_for(&path, category)?;
            println!("{uri}");
        }
        Commands::Categories => {
            for category in FileCategory::ALL {
                println!(
                    "{:<26} {:<24} {}",
                    category.name(),
                    category.filename_prefix(),
                    category.describe_layout()
                );
            }
        }
    }
    Ok(())
}
