//! frc_query - team and event lookups from the command line.
//!
//! Replies print to stdout, or go to the announce channel with `--post`.

mod commands;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use commands::{Query, YearFilter};
use dotenv::dotenv;
use frc_watch_core::clients::{discord, http_client, tba, ChannelDispatcher, DiscordClient, TbaClient};
use log::{debug, info};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "frc_query")]
#[command(about = "Look up FRC teams, events, matches and robots")]
#[command(version, disable_help_subcommand = true)]
struct Args {
    /// Results source API key
    #[arg(long, env = "TBA_API_KEY", hide_env_values = true)]
    tba_api_key: Option<String>,

    #[arg(long, env = "TBA_BASE_URL", default_value = tba::DEFAULT_BASE_URL)]
    tba_base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Send the reply to the announce channel instead of printing it
    #[arg(long)]
    post: bool,

    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    discord_bot_token: Option<String>,

    #[arg(long, env = "ANNOUNCE_CHANNEL_ID")]
    channel_id: Option<String>,

    #[arg(long, env = "DISCORD_API_BASE_URL", default_value = discord::DEFAULT_BASE_URL)]
    discord_base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Info about an FRC team
    Team { team: String },
    /// A team's events, for one season or all of them
    Events { team: String, year: Option<String> },
    /// Info about an FRC event
    Event { event_key: String },
    /// A team's matches at an event
    Matches { team: String, event_key: String },
    /// A team's robot names
    Robots { team: String },
    /// Usage for all commands or one
    Help { command: Option<String> },
}

impl Command {
    fn into_query(self) -> Result<Query> {
        Ok(match self {
            Command::Team { team } => Query::Team { team },
            Command::Events { team, year } => Query::Events {
                team,
                year: YearFilter::parse(year.as_deref())?,
            },
            Command::Event { event_key } => Query::Event { event_key },
            Command::Matches { team, event_key } => Query::Matches { team, event_key },
            Command::Robots { team } => Query::Robots { team },
            Command::Help { command } => Query::Help { command },
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let query = args.command.into_query()?;
    debug!("Running {:?}", query);

    let http = http_client(Duration::from_secs(args.timeout_secs))
        .context("Failed to build HTTP client")?;

    let tba_key = match (&args.tba_api_key, query.needs_results_source()) {
        (Some(key), _) => key.clone(),
        (None, false) => String::new(),
        (None, true) => return Err(anyhow!("TBA_API_KEY must be set")),
    };
    let tba = TbaClient::with_base_url(http.clone(), tba_key, &args.tba_base_url);

    let reply = commands::execute(&query, &tba).await?;

    if !args.post {
        println!("{}", reply.to_plain_text());
        return Ok(());
    }

    let token = args
        .discord_bot_token
        .ok_or_else(|| anyhow!("DISCORD_BOT_TOKEN must be set to use --post"))?;
    let channel_id = args
        .channel_id
        .ok_or_else(|| anyhow!("ANNOUNCE_CHANNEL_ID must be set to use --post"))?;

    let discord = DiscordClient::with_base_url(http, token, &args.discord_base_url);
    discord
        .send(&channel_id, &reply)
        .await
        .with_context(|| format!("Failed to post reply to channel {}", channel_id))?;
    info!("Posted '{}' to channel {}", reply.title, channel_id);
    Ok(())
}
