use std::env;

use tracing_subscriber::EnvFilter;

mod bots;
mod catalog;
mod commands;
mod config;
mod discord;
mod download;
mod game;
mod image;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(bot) = env::args().nth(1) {
        match bot.as_str() {
            "flags" => bots::flags::main().await?,
            _ => println!("unknown bot: {}", bot),
        }

        return Ok(());
    }

    println!("usage: flagbot {{bot name}}");

    Ok(())
}
