use anyhow::{bail, Result};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serenity::async_trait;
use tokio::task;
use tracing::{debug, warn};

use crate::game::FlagSource;

/// Downloads SVG flags and renders them to PNG.
#[derive(Default)]
pub struct HttpFlags {
    http: reqwest::Client,
}

impl HttpFlags {
    pub fn new() -> HttpFlags {
        HttpFlags::default()
    }
}

#[async_trait]
impl FlagSource for HttpFlags {
    async fn fetch_png(&self, url: &str) -> Result<Bytes> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            bail!("failed to fetch image from {}: status {}", url, response.status());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());

        if !is_svg(content_type) {
            warn!(url, content_type, "flag is not served as SVG");
        }

        let svg = response.bytes().await?;

        debug!(url, "fetched {} bytes", svg.len());

        task::spawn_blocking(move || crate::image::convert_svg_to_png(&svg)).await?
    }
}

/// A missing content type gets the benefit of the doubt.
fn is_svg(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => value
            .parse::<mime::Mime>()
            .map_or(false, |m| m.essence_str() == mime::IMAGE_SVG.essence_str()),
    }
}
