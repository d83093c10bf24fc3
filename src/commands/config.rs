//! `config` subcommands: manage the stored API credentials.

use std::io::BufRead;

use anyhow::{bail, Context, Result};

use super::export_client;
use super::table::detail_table;
use crate::auth::{truncate_secret, CachedToken, TokenCache};
use crate::config::{ApiOptions, ConfigCommand, RESEARCH_EXPORTS_APP};

pub async fn run(api: &ApiOptions, command: ConfigCommand) -> Result<()> {
    let cache = TokenCache::for_app(RESEARCH_EXPORTS_APP);
    match command {
        ConfigCommand::Authorize { token } => {
            let token = match token {
                Some(token) => token,
                None => read_token()?,
            };
            if token.trim().is_empty() {
                bail!("No access token given");
            }
            let stored = cache.store(&token)?;
            log::info!(
                "Stored access token {} in {}",
                truncate_secret(&stored.access_token),
                cache.path().display()
            );
        }
        ConfigCommand::CheckAuth => {
            let client = export_client(api)?;
            let jobs = client
                .list_mine()
                .await
                .context("Credentials were not accepted by the export API")?;
            println!(
                "Credentials for {} are valid ({} export jobs visible).",
                RESEARCH_EXPORTS_APP,
                jobs.len()
            );
        }
        ConfigCommand::DisplayAuthCache { no_truncate } => match cache.load()? {
            Some(cached) => print!("{}", cache_table(&cache, &cached, no_truncate)),
            None => println!("No cached credentials at {}", cache.path().display()),
        },
    }
    Ok(())
}

fn read_token() -> Result<String> {
    eprintln!("Paste the access token from the authorization page and press enter:");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read access token from stdin")?;
    Ok(line.trim().to_string())
}

fn cache_table(cache: &TokenCache, cached: &CachedToken, no_truncate: bool) -> super::table::Table {
    let token = if no_truncate {
        cached.access_token.clone()
    } else {
        truncate_secret(&cached.access_token)
    };
    detail_table([
        ("Application", RESEARCH_EXPORTS_APP.to_string()),
        ("Cache File", cache.path().display().to_string()),
        ("Access Token", token),
        ("Stored", cached.stored_at.to_rfc3339()),
    ])
}
