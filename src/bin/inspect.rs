//! CairnDB Inspector
//!
//! Offline inspection of database files: tables, schemas, rows and the
//! block-type map.

use std::process::ExitCode;

use cairndb::storage::{Block, Storage, Visit, DEFAULT_CACHE_CAPACITY};
use cairndb::{Config, DatabaseManager, SelectQuery};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// CairnDB Inspector
#[derive(Parser, Debug)]
#[command(name = "cairn-inspect")]
#[command(about = "Inspect CairnDB database files")]
#[command(version)]
struct Args {
    /// Storage directory holding the database files
    #[arg(short, long, default_value = "./cairn_data")]
    storage_dir: String,

    /// Block cache capacity
    #[arg(short, long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    cache_blocks: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List databases in the storage directory
    List,

    /// List the tables of a database
    Tables {
        /// Database name
        database: String,
    },

    /// Show the attributes of a table
    Describe {
        database: String,
        table: String,
    },

    /// Print every row of a table
    Dump {
        database: String,
        table: String,
    },

    /// Print the type tag of every block in the file
    Blocks {
        database: String,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .storage_dir(&args.storage_dir)
        .cache_capacity(args.cache_blocks)
        .build();

    match run(config, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config, command: Commands) -> cairndb::Result<()> {
    let mut manager = DatabaseManager::new(config)?;

    match command {
        Commands::List => {
            for name in manager.list_database_names()? {
                println!("{}", name);
            }
        }
        Commands::Tables { database } => {
            manager.use_database(&database)?;
            let db = manager.active()?;
            for (name, block) in db.toc().entries() {
                println!("{:<24} block {}", name, block);
            }
        }
        Commands::Describe { database, table } => {
            manager.use_database(&database)?;
            let db = manager.active()?;
            for attribute in db.describe_table(&table)? {
                let mut flags = Vec::new();
                if attribute.is_primary() {
                    flags.push("primary key");
                }
                if attribute.is_auto_increment() {
                    flags.push("auto_increment");
                }
                if !attribute.is_nullable() {
                    flags.push("not null");
                }
                println!(
                    "{:<20} {:<8} default {:<10} {}",
                    attribute.name(),
                    attribute.data_type(),
                    attribute.default(),
                    flags.join(", ")
                );
            }
        }
        Commands::Dump { database, table } => {
            manager.use_database(&database)?;
            let db = manager.active()?;
            let result = db.select_from_table(&table, &SelectQuery::all())?;
            println!("{}", result.fields.join("\t"));
            for values in result.projected() {
                let line: Vec<String> = values.iter().map(ToString::to_string).collect();
                println!("{}", line.join("\t"));
            }
        }
        Commands::Blocks { database } => {
            let path = manager.database_path(&database)?;
            if !manager.database_exists(&database) {
                return Err(cairndb::CairnError::UnknownDatabase(database));
            }
            let (mut storage, _toc) = Storage::open(&path, manager.config())?;
            storage.each_block(|n, block| {
                println!("{:>6}  {}", n, block_label(block));
                Ok(Visit::Continue)
            })?;
        }
    }

    manager.close_active()
}

/// Block type name, or the raw tag byte when it is not a known type
fn block_label(block: &Block) -> String {
    match block.block_type() {
        Ok(block_type) => format!("{:?}", block_type),
        Err(_) => format!("?? 0x{:02x}", block.tag()),
    }
}
