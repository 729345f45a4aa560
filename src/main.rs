//! # gvend CLI Entry Point
//!
//! Parses arguments with clap and routes each subcommand to the library.
//!
//! - `fetch` - vendor a package (and, by default, everything it imports)
//! - `restore` - rebuild `vendor/` from `vendor/manifest`
//! - `list` - show pinned dependencies
//! - `delete` - remove a vendored dependency
//! - `completion` - print a shell completion script

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use tracing_subscriber::EnvFilter;

use gvend::config::Settings;
use gvend::deps::{self, FetchOutcome, FetchRequest, Fetcher, FsCopier};
use gvend::graph::GoSourceLoader;
use gvend::repo::{RemoteResolver, Selector};

#[derive(Parser)]
#[command(name = "gvend")]
#[command(about = "Vendor remote Go packages into your project", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Print debug diagnostics (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a remote package into the vendor tree
    Fetch {
        /// Import path or URL of the package
        importpath: String,
        /// Branch of the repository to use
        #[arg(long, conflicts_with = "tag")]
        branch: Option<String>,
        /// Tag of the repository to use
        #[arg(long, conflicts_with = "revision")]
        tag: Option<String>,
        /// Exact revision of the repository to use
        #[arg(long)]
        revision: Option<String>,
        /// Do not fetch the package's missing dependencies
        #[arg(long)]
        no_recurse: bool,
        /// Allow insecure protocols (http, git)
        #[arg(long)]
        precaire: bool,
        /// Install into $GOPATH/src instead of ./vendor
        #[arg(short, long)]
        global: bool,
    },
    /// Restore every dependency recorded in the manifest
    Restore {
        /// Allow insecure protocols (http, git)
        #[arg(long)]
        precaire: bool,
        /// Restore into $GOPATH/src instead of ./vendor
        #[arg(short, long)]
        global: bool,
    },
    /// List vendored dependencies
    List,
    /// Delete a vendored dependency
    Delete {
        /// Import path of the dependency
        importpath: String,
        /// Delete from $GOPATH/src instead of ./vendor
        #[arg(short, long)]
        global: bool,
    },
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "gvend=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Fetch {
            importpath,
            branch,
            tag,
            revision,
            no_recurse,
            precaire,
            global,
        } => {
            let selector = Selector {
                branch: branch.clone(),
                tag: tag.clone(),
                revision: revision.clone(),
            };
            fetch(importpath, selector, !*no_recurse, *precaire, *global)
        }

        Commands::Restore { precaire, global } => {
            let settings = settings()?;
            let resolver = RemoteResolver::new();
            let restored = deps::restore_dependencies(
                &settings.layout,
                &resolver,
                &FsCopier,
                *precaire || settings.allow_insecure,
                *global,
            )
            .context("restore failed")?;
            println!("{} Restored {} dependencies", "✓".green(), restored);
            Ok(())
        }

        Commands::List => {
            let settings = settings()?;
            deps::list_dependencies(&settings.layout)?;
            Ok(())
        }

        Commands::Delete { importpath, global } => {
            let settings = settings()?;
            deps::delete_dependency(&settings.layout, importpath, *global)
                .with_context(|| format!("could not delete {}", importpath))?;
            Ok(())
        }

        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn settings() -> Result<Settings> {
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    Settings::discover(&cwd)
}

fn fetch(
    importpath: &str,
    selector: Selector,
    recursive: bool,
    precaire: bool,
    global: bool,
) -> Result<()> {
    let settings = settings()?;
    let resolver = RemoteResolver::new();
    let fetcher = Fetcher::new(&settings.layout, &resolver, &FsCopier, &GoSourceLoader::HOST);

    let report = fetcher
        .run(&FetchRequest {
            import_path: importpath.to_string(),
            selector,
            recursive,
            global,
            allow_insecure: precaire || settings.allow_insecure,
        })
        .with_context(|| format!("fetch of {} failed", importpath))?;

    if let FetchOutcome::Vendored(dep) = &report.outcome {
        println!(
            "{} {} vendored with {} additional dependencies",
            "✓".green(),
            dep.importpath.bold(),
            report.transitive.len()
        );
    }
    Ok(())
}
