//! silo CLI - operate the snapshot store from a shell

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use silo::branches::branch_tip;
use silo::ops::{commit_package, history, iter_blobs};
use silo::{Channel, Error, Hash, PackageKind, Store, StoreConfig};

#[derive(Parser)]
#[command(name = "silo")]
#[command(about = "versioned snapshot store for package archives")]
#[command(version)]
struct Cli {
    /// storage root holding one repository per (entity, package kind)
    #[arg(short, long, env = "SILO_ROOT", default_value = ".")]
    root: PathBuf,

    /// entity the repository belongs to
    #[arg(short, long)]
    entity: u64,

    /// package kind: package or source
    #[arg(short, long, default_value = "package")]
    kind: PackageKind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// extract an uploaded archive and commit it onto a channel branch
    Commit {
        /// archive to commit
        archive: PathBuf,

        /// release channel: listed or unlisted
        #[arg(short, long, default_value = "listed")]
        channel: Channel,
    },

    /// show commit history for a channel
    Log {
        /// release channel: listed or unlisted
        #[arg(short, long, default_value = "listed")]
        channel: Channel,

        /// maximum number of commits to show
        #[arg(short = 'n', long)]
        max_count: Option<usize>,
    },

    /// list files stored at a commit (channel tip by default)
    Ls {
        /// release channel: listed or unlisted
        #[arg(short, long, default_value = "listed")]
        channel: Channel,

        /// commit hash instead of the channel tip
        #[arg(long)]
        commit: Option<String>,
    },

    /// print one stored file to stdout
    Cat {
        /// path within the commit's tree
        path: String,

        /// release channel: listed or unlisted
        #[arg(short, long, default_value = "listed")]
        channel: Channel,

        /// commit hash instead of the channel tip
        #[arg(long)]
        commit: Option<String>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> silo::Result<()> {
    let cli = Cli::parse();
    let store = Store::new(&cli.root, StoreConfig::default());

    match cli.command {
        Commands::Commit { archive, channel } => {
            let tip = commit_package(&store, &archive, cli.entity, cli.kind, channel)?;
            println!("{}", tip);
        }

        Commands::Log { channel, max_count } => {
            let repo = store.open_or_create(cli.entity, cli.kind)?;
            for entry in history(&repo, channel, max_count)? {
                println!("{}", entry);
            }
        }

        Commands::Ls { channel, commit } => {
            let repo = store.open_or_create(cli.entity, cli.kind)?;
            let commit = resolve_commit(&repo, channel, commit.as_deref())?;

            let mut blobs = iter_blobs(&repo, &commit)?;
            for blob in blobs.by_ref() {
                println!("{:>10}  {:<8}  {}", blob.size, blob.language, blob.path);
            }
            for skipped in blobs.skipped() {
                eprintln!("warning: skipped {}: {}", skipped.path, skipped.reason);
            }
        }

        Commands::Cat {
            path,
            channel,
            commit,
        } => {
            let repo = store.open_or_create(cli.entity, cli.kind)?;
            let commit = resolve_commit(&repo, channel, commit.as_deref())?;

            let blob = iter_blobs(&repo, &commit)?
                .find(|blob| blob.path == path)
                .ok_or(Error::PathNotFound(path))?;
            io::stdout()
                .write_all(&blob.content)
                .map_err(|source| Error::Io {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
    }

    Ok(())
}

/// an explicit commit hash, or the channel's current tip
fn resolve_commit(
    repo: &silo::Repository,
    channel: Channel,
    commit: Option<&str>,
) -> silo::Result<Hash> {
    match commit {
        Some(hex) => Hash::from_hex(hex),
        None => branch_tip(repo, channel),
    }
}
