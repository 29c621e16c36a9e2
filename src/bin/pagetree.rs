//! pagetree CLI tool
//!
//! Loads a TOML page fixture into memory, rebuilds every lookup, and answers questions about the
//! resulting tree.
//!
//! ## Commands
//!
//! - `resolve <path>`: Resolve a request path the way a live request would (`--exact` disables
//!   trimming)
//! - `lookups`: Print every page with its rebuilt lookup
//! - `descendants <id>`: Print the subtree below a page in pre-order

use clap::{Parser, Subcommand};
use pagetree::{
    config::PageFixture,
    properties::PageId,
    store::{MemoryStore, PageStore},
    tree::PageTree,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagetree")]
#[command(author, version, about = "Resolve request paths against a page tree", long_about = None)]
struct Cli {
    /// TOML fixture describing the pages (and optionally the tree config)
    #[arg(short, long, default_value = "pages.toml")]
    fixture: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a request path to the page serving it
    Resolve {
        /// Request path, e.g. `blog/2024/some-post`. An empty path resolves to the home page.
        #[arg(default_value = "")]
        path: String,

        /// Match the path exactly instead of trimming it like a live request
        #[arg(long)]
        exact: bool,
    },

    /// Rebuild the whole tree and print every page's lookup
    Lookups,

    /// Print the ids of a page and everything below it
    Descendants {
        /// Page id
        id: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let fixture = PageFixture::load(&cli.fixture)?;
    let store = MemoryStore::from_pages(fixture.pages)?;
    let tree = PageTree::new(store, fixture.config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let summary = tree.rebuild_all().await?;
        tracing::info!("Loaded {} pages from {:?}", summary.ids.len(), cli.fixture);

        match cli.command {
            Commands::Resolve { path, exact } => match tree.resolve(path.as_str(), !exact).await? {
                Some(resolved) => {
                    let trimmed = if resolved.is_trimmed_match(&path) {
                        " (trimmed)"
                    } else {
                        ""
                    };
                    println!(
                        "{}\t/{}\t{}{}",
                        resolved.page.id, resolved.base_uri, resolved.page.title, trimmed
                    );
                }
                None => {
                    eprintln!("No page serves '{path}'");
                    std::process::exit(1);
                }
            },
            Commands::Lookups => {
                for page in tree.store().pages() {
                    let home = if page.is_home { "\thome" } else { "" };
                    println!("{}\t/{}\t{}{}", page.id, page.lookup, page.status, home);
                }
            }
            Commands::Descendants { id } => {
                for id in tree.collect_descendant_ids(PageId(id)).await? {
                    let lookup = tree
                        .store()
                        .get_by_id(id)
                        .await?
                        .map(|page| page.lookup)
                        .unwrap_or_default();
                    println!("{id}\t/{lookup}");
                }
            }
        }
        Ok::<(), pagetree::PageError>(())
    })?;

    Ok(())
}
