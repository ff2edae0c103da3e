use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serenity::model::id::ChannelId;

/// Channel the rounds are posted to unless `FLAG_CHANNEL_ID` says otherwise.
const DEFAULT_CHANNEL: u64 = 1272172313919488055;

pub struct Config {
    pub token: String,
    pub catalog_path: PathBuf,
    pub channel: ChannelId,
    /// Time between two rounds.
    pub round_interval: Duration,
    /// How long a posted flag stays open for guesses.
    pub answer_window: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|key| env::var_os(key))
    }

    /// Builds the config from whatever `lookup` returns for each variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Config> {
        let token = lookup("DISCORD_TOKEN")
            .context("DISCORD_TOKEN environmental variable not set")?
            .into_string()
            .map_err(|_| anyhow!("DISCORD_TOKEN is not valid unicode"))?;

        let catalog_path = match lookup("FLAGS_CSV") {
            Some(path) => PathBuf::from(path),
            None => default_catalog_path()?,
        };

        let channel = match lookup("FLAG_CHANNEL_ID") {
            Some(id) => {
                parse_channel(id.to_str().context("FLAG_CHANNEL_ID is not valid unicode")?)?
            }
            None => ChannelId::new(DEFAULT_CHANNEL),
        };

        Ok(Config {
            token,
            catalog_path,
            channel,
            round_interval: Duration::from_secs(20),
            answer_window: Duration::from_secs(10),
        })
    }
}

fn default_catalog_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("no config directory found")?;
    path.push("flagbot");
    path.push("countries.csv");

    Ok(path)
}

fn parse_channel(id: &str) -> Result<ChannelId> {
    let id = id
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid FLAG_CHANNEL_ID: {:?}", id))?;

    // snowflakes are never zero; ChannelId::new panics on it
    anyhow::ensure!(id != 0, "invalid FLAG_CHANNEL_ID: 0");

    Ok(ChannelId::new(id))
}
