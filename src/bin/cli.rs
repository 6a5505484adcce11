//! AtlasBlob CLI
//!
//! Command-line interface over a data directory's small-file container.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use atlasblob::{BlobError, Config, Engine, Payload, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasBlob CLI
#[derive(Parser, Debug)]
#[command(name = "atlasblob-cli")]
#[command(about = "Store many small files inside segmented blob storage")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./atlasblob_data")]
    data_dir: PathBuf,

    /// Segment size in KB
    #[arg(short, long, default_value = "1024")]
    block_kb: usize,

    /// Number of objects held by the write-back cache
    #[arg(short, long, default_value = "32")]
    cache_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a file (from a local path, or literal text with --text)
    Put {
        /// Logical file name
        name: String,

        /// Local file to read the contents from
        #[arg(conflicts_with = "text")]
        source: Option<PathBuf>,

        /// Store this text instead of a local file
        #[arg(short, long)]
        text: Option<String>,

        /// Replace the file if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Append text to a file, creating it if needed
    Append {
        name: String,
        text: String,
    },

    /// Write a file's contents to stdout
    Cat {
        name: String,
    },

    /// Delete files
    Rm {
        names: Vec<String>,

        /// Fail without deleting anything if a name is missing
        #[arg(long)]
        must_exist: bool,
    },

    /// List file names
    Ls,

    /// Write everything through to disk
    Flush,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,atlasblob=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .block_size(args.block_kb * 1024)
        .cache_capacity(args.cache_capacity)
        .build();

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> Result<()> {
    let engine = Engine::open(config)?;
    let files = engine.files();

    match command {
        Commands::Put {
            name,
            source,
            text,
            force,
        } => {
            let payload = match (source, text) {
                (Some(path), _) => Payload::from(fs::read(path)?),
                (None, Some(text)) => Payload::from(text),
                (None, None) => Payload::from(read_stdin()?),
            };
            files.create_new_file(&name, payload, force)?;
        }
        Commands::Append { name, text } => {
            files.append_data(&name, text)?;
        }
        Commands::Cat { name } => match files.read_file(&name)? {
            Some(bytes) => io::stdout().lock().write_all(&bytes)?,
            None => return Err(BlobError::FileNotFound(name)),
        },
        Commands::Rm { names, must_exist } => {
            if !files.delete_files(&names, must_exist)? {
                return Err(BlobError::FileNotFound(names.join(" ")));
            }
        }
        Commands::Ls => {
            let mut out = io::stdout().lock();
            for name in files.get_file_names() {
                writeln!(out, "{}", name)?;
            }
        }
        Commands::Flush => {}
    }

    engine.close()
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut data = Vec::new();
    io::stdin().lock().read_to_end(&mut data)?;
    Ok(data)
}
