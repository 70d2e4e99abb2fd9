//! Builds a Dash docset from the igraph C reference manual.
//!
//! Pipeline:
//!   1. fetch the newest stable release tarball and keep its `doc/html`
//!   2. copy the HTML into `igraph.docset`, inject Dash anchors, write the index
//!   3. package a Dash-User-Contributions submission

mod config;
mod db;
mod docset;
mod error;
mod parser;
mod release;
mod submission;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use config::Settings;

#[derive(Parser)]
#[command(name = "igraph_docset", about = "Dash docset generator for the igraph C library")]
struct Cli {
    /// Working directory for downloads and output (overrides IGRAPH_DOCSET_WORK_DIR)
    #[arg(short = 'C', long, global = true)]
    work_dir: Option<PathBuf>,
    /// Directory holding Info.plist, icon.png, docset.json and README.md
    #[arg(long, global = true)]
    assets: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest release, build the docset and prepare a submission
    Run {
        /// Docset revision for this version
        #[arg(short, long, default_value = "0")]
        revision: u32,
        /// Keep the downloaded HTML directory
        #[arg(long)]
        keep_html: bool,
    },
    /// Download the latest stable release and extract its HTML manual
    Fetch,
    /// Build the docset from an HTML directory already on disk
    Docset {
        /// HTML directory (default: <work-dir>/html)
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Package an existing docset for Dash-User-Contributions
    Submission {
        #[arg(long)]
        version: String,
        #[arg(short, long, default_value = "0")]
        revision: u32,
    },
    /// Show row counts per kind in a docset index
    Stats {
        /// Index file (default: the docSet.dsidx of the configured docset)
        #[arg(long = "db")]
        index: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(dir) = cli.work_dir {
        settings.work_dir = dir;
    }
    if let Some(dir) = cli.assets {
        settings.assets_dir = dir;
    }

    match cli.command {
        Commands::Run { revision, keep_html } => {
            let version = release::download(&settings).context("Download phase failed")?;
            let html = settings.html_dir();
            let counts = docset::create(&settings, &html).context("Docset phase failed")?;
            print_counts(&counts);
            if !keep_html {
                std::fs::remove_dir_all(&html)
                    .with_context(|| format!("Failed to remove {:?}", html))?;
            }
            submission::create(&settings, &version, revision)
                .context("Submission phase failed")?;
            info!("Done! igraph {} packaged.", version);
        }
        Commands::Fetch => {
            let version = release::download(&settings).context("Download phase failed")?;
            println!("Downloaded igraph {} into {:?}", version, settings.html_dir());
        }
        Commands::Docset { html } => {
            let html = html.unwrap_or_else(|| settings.html_dir());
            let counts = docset::create(&settings, &html).context("Docset phase failed")?;
            print_counts(&counts);
        }
        Commands::Submission { version, revision } => {
            let dir = submission::create(&settings, &version, revision)
                .context("Submission phase failed")?;
            println!("Submission ready in {:?}", dir);
        }
        Commands::Stats { index } => {
            let path = index.unwrap_or_else(|| docset::Layout::new(settings.docset_dir()).index());
            if !path.is_file() {
                bail!("No index at {:?}. Run 'docset' first.", path);
            }
            let conn = db::connect(&path)?;
            println!("Index:     {:?}", path);
            println!("Total:     {}", db::count_rows(&conn)?);
            for (kind, n) in db::kind_counts(&conn)? {
                println!("{:<10} {}", format!("{}:", kind), n);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn print_counts(counts: &parser::IndexCounts) {
    println!(
        "Indexed {} symbols from {} pages ({} anchors, {} kinds refined, {} rows).",
        counts.symbols, counts.pages, counts.anchors, counts.refined, counts.rows,
    );
}
