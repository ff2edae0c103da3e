use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::discord;
use crate::download::HttpFlags;
use crate::game::Game;

pub async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let catalog = Catalog::load(&config.catalog_path)?;
    info!("loaded {} flags from {}", catalog.len(), config.catalog_path.display());

    if catalog.is_empty() {
        warn!("no usable rows in {}; rounds will be skipped", config.catalog_path.display());
    }

    let game = Arc::new(Game::new(catalog, HttpFlags::new(), config.channel, config.answer_window));

    let mut client = discord::create_client(&config.token, Handler { game: game.clone() }).await?;
    let shard_manager = client.shard_manager.clone();

    let mut scheduler = schedule_rounds(game, client.http.clone(), config.round_interval).await?;

    let gateway = async { client.start().await.map_err(anyhow::Error::from) };
    let stop = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
        shard_manager.shutdown_all().await;
    };

    serve(&mut scheduler, gateway, stop).await
}

/// Runs the gateway until it ends or `stop` resolves. The scheduler is shut
/// down either way.
async fn serve(
    scheduler: &mut JobScheduler,
    gateway: impl Future<Output = anyhow::Result<()>>,
    stop: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let outcome = tokio::select! {
        result = gateway => result,
        _ = stop => Ok(()),
    };

    if let Err(e) = &outcome {
        warn!("gateway stopped: {:#}", e);
    }

    scheduler.shutdown().await?;

    outcome
}

async fn schedule_rounds(
    game: Arc<Game<HttpFlags>>,
    http: Arc<Http>,
    every: Duration,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_repeated_async(every, move |_, _| {
        let game = game.clone();
        let http = http.clone();

        Box::pin(async move {
            if let Err(e) = game.play_round(&*http).await {
                warn!("round abandoned: {:#}", e);
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("posting a flag every {}s", every.as_secs());

    Ok(scheduler)
}

struct Handler {
    game: Arc<Game<HttpFlags>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        info!("logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, message: Message) {
        let Some(message) = discord::get_text_message(&ctx, &message) else {
            return;
        };

        if let Err(e) = self.game.on_message(&*ctx.http, &message).await {
            warn!("could not handle message: {:#}", e);
        }
    }
}
