//! Command line arguments and the headless subcommands.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use crate::api::GitHubApi;
use crate::config::Config;
use crate::error::{OctoseekError, Result};
use crate::paginator::{PageSource, Paginator};
use crate::sources::{UserRepos, UserSearch};

/// Search GitHub users and browse their repositories
#[derive(Parser, Debug)]
#[command(name = "octoseek")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (TOML). Defaults to <config dir>/octoseek/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Open the TUI with this search already submitted
    pub query: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print matching users as JSON lines
    Search {
        query: String,

        /// Stop after this many pages (default: all)
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Print a user's profile followed by their repositories as JSON lines
    User {
        login: String,

        /// Stop after this many pages of repositories (default: all)
        #[arg(long)]
        pages: Option<u32>,
    },
}

pub async fn run(
    command: Command,
    api: Arc<dyn GitHubApi>,
    config: &Config,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Search { query, pages } => {
            let search = Paginator::new(UserSearch::new(api, config.search.page_size))
                .with_load_more_delay(config.search.load_more_delay());
            let users = collect(&search, &query, pages).await?;
            write_lines(out, &users)
        }
        Command::User { login, pages } => {
            let profile = api.get_user(&login).await?;
            write_lines(out, std::slice::from_ref(&profile))?;

            let repos = Paginator::new(UserRepos::new(api, config.repos.page_size))
                .with_load_more_delay(config.repos.load_more_delay());
            let items = collect(&repos, &login, pages).await?;
            write_lines(out, &items)
        }
    }
}

/// Run a reset fetch, then keep loading until the end or the page limit.
async fn collect<S: PageSource>(
    paginator: &Paginator<S>,
    query: &str,
    pages: Option<u32>,
) -> Result<Vec<S::Item>> {
    paginator.set_query(query);
    if paginator.state().query.is_empty() {
        return Err(OctoseekError::Config("query must not be empty".to_string()));
    }

    paginator.search(true).await;
    let mut fetched = 1;
    loop {
        {
            let state = paginator.state();
            if let Some(err) = &state.error {
                return Err(OctoseekError::Api(err.clone()));
            }
            if !state.can_load_more() || pages.is_some_and(|max| fetched >= max) {
                break;
            }
        }
        paginator.load_more().await;
        fetched += 1;
    }

    let items = paginator.snapshot().items;
    debug!(query, pages = fetched, items = items.len(), "collected");
    Ok(items)
}

fn write_lines<T: Serialize>(out: &mut impl Write, items: &[T]) -> Result<()> {
    for item in items {
        serde_json::to_writer(&mut *out, item).map_err(io::Error::from)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
