//! arcwrap - list and extract archives through 7z / unrar

use anyhow::{bail, Context, Result};
use arcwrap::archive::{Archive, Backend, Toolchain};
use arcwrap::config::ToolConfig;
use arcwrap::volume;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arcwrap")]
#[command(version)]
#[command(about = "List and extract archive members through the 7z and unrar executables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the 7z binary (default: search PATH)
    #[arg(long = "7z-path", env = "ARCWRAP_7Z", global = true)]
    seven_zip_path: Option<PathBuf>,

    /// Path to the unrar binary (default: search PATH)
    #[arg(long, env = "ARCWRAP_UNRAR", global = true)]
    unrar_path: Option<PathBuf>,

    /// Threads for unrar (defaults to CPU thread count)
    #[arg(long, env = "ARCWRAP_THREADS", global = true)]
    threads: Option<usize>,
}

/// Options shared by every command that opens an archive
#[derive(Args)]
struct OpenArgs {
    /// Path to the archive (any volume of a multi-part rar)
    archive: PathBuf,

    /// Read with unrar instead of 7z
    #[arg(long)]
    unrar: bool,

    /// Archive password
    #[arg(short, long, env = "ARCWRAP_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the members of an archive
    List {
        #[command(flatten)]
        open: OpenArgs,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a single member to a file
    Extract {
        #[command(flatten)]
        open: OpenArgs,

        /// Path of the member inside the archive
        file_path: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Match the member path ignoring case and separators
        #[arg(short = 'i', long)]
        ignore_case: bool,
    },

    /// Extract every member into a directory
    ExtractAll {
        #[command(flatten)]
        open: OpenArgs,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the volumes of a (possibly multi-part) rar archive
    Volumes {
        /// Path to any volume
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(if cli.verbose { "arcwrap=debug".parse()? } else { "arcwrap=warn".parse()? }),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let config = ToolConfig {
        seven_zip_path: cli.seven_zip_path,
        unrar_path: cli.unrar_path,
        threads: cli.threads,
    };
    config.validate()?;
    let tools = config.toolchain();

    match cli.command {
        Commands::List { open, json } => {
            let archive = open_archive(&tools, &open)?;

            if json {
                println!("{}", serde_json::to_string_pretty(archive.entries())?);
            } else {
                for entry in archive.entries() {
                    let kind = if entry.is_dir() { "dir" } else { "" };
                    println!("{:>12} {:>4} {}", entry.size, kind, entry.path);
                }
                eprintln!("\nTotal: {} entries", archive.entries().len());
            }
        }

        Commands::Extract {
            open,
            file_path,
            output,
            ignore_case,
        } => {
            let archive = open_archive(&tools, &open)?;

            let name = if ignore_case {
                match archive.find_entry_case_insensitive(&file_path) {
                    Some(entry) => entry.path.clone(),
                    None => bail!(
                        "File '{}' not found in archive '{}'",
                        file_path,
                        archive.path().display()
                    ),
                }
            } else {
                file_path
            };

            let bytes = archive
                .extract_to_file(&output, &name)
                .with_context(|| format!("Failed to extract '{}'", name))?;
            println!("Extracted {} bytes to {}", bytes, output.display());
        }

        Commands::ExtractAll { open, output } => {
            let archive = open_archive(&tools, &open)?;
            let count = archive
                .extract_all(&output)
                .with_context(|| format!("Failed to extract {}", archive.path().display()))?;
            println!("Extracted {} files to {}", count, output.display());
        }

        Commands::Volumes { path } => {
            let set = volume::resolve(&path)?;
            println!("Multi-volume: {}", if set.is_multi_volume { "yes" } else { "no" });
            println!("First volume: {}", set.first_volume.display());
            for vol in &set.volumes {
                println!("  {}", vol.display());
            }
        }
    }

    Ok(())
}

/// Resolve the volume set and open the archive from its first volume.
fn open_archive(tools: &Toolchain, open: &OpenArgs) -> Result<Archive> {
    let target = first_volume(&open.archive)?;
    let backend = if open.unrar { Backend::Unrar } else { Backend::SevenZip };

    Archive::open(tools, backend, &target, open.password.as_deref())
        .with_context(|| format!("Failed to list {} with {}", target.display(), backend))
}

fn first_volume(path: &Path) -> Result<PathBuf> {
    let set = volume::resolve(path)
        .with_context(|| format!("Failed to resolve volumes of {}", path.display()))?;

    if set.is_multi_volume {
        info!(
            "{} is part of a {}-volume set, opening {}",
            path.display(),
            set.volume_count(),
            set.first_volume.display()
        );
        Ok(set.first_volume)
    } else {
        Ok(path.to_path_buf())
    }
}
