use std::io::Cursor;
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use resvg::usvg::fontdb;
use resvg::{tiny_skia, usvg};
use tracing::debug;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 800;

/// Loaded on first use; flags with `<text>` need real fonts to render it.
static FONTS: LazyLock<Arc<fontdb::Database>> = LazyLock::new(|| {
    let mut fonts = fontdb::Database::new();
    fonts.load_system_fonts();
    debug!("loaded {} font faces", fonts.len());

    Arc::new(fonts)
});

/// Renders an SVG document as PNG, scaled down to fit 1280x800 if it is larger.
pub fn convert_svg_to_png(svg: &[u8]) -> Result<Bytes> {
    debug!("rendering SVG");

    let tree = usvg::Tree::from_data(svg, &options()).context("could not parse SVG")?;

    // the pixmap is allocated at the scaled size, never the declared one
    let size = tree.size();
    let scale = fit_scale(size.width(), size.height());
    let width = (size.width() * scale).round().max(1.0) as u32;
    let height = (size.height() * scale).round().max(1.0) as u32;

    if scale < 1.0 {
        debug!("resizing {}x{} to {}x{}", size.width(), size.height(), width, height);
    }

    let mut pixmap = tiny_skia::Pixmap::new(width, height).context("SVG has no drawable area")?;

    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // tiny-skia keeps premultiplied alpha
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }

    encode_png(rgba, width, height)
}

fn options() -> usvg::Options<'static> {
    let mut options = usvg::Options::default();
    options.fontdb = FONTS.clone();
    options
}

fn fit_scale(width: f32, height: f32) -> f32 {
    (WIDTH as f32 / width).min(HEIGHT as f32 / height).min(1.0)
}

pub fn encode_png(rgba: Vec<u8>, width: u32, height: u32) -> Result<Bytes> {
    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, rgba)
        .context("pixel buffer does not match image size")?;

    let mut png = Cursor::new(vec![]);
    DynamicImage::from(buffer).write_to(&mut png, ImageFormat::Png)?;

    Ok(Bytes::from(png.into_inner()))
}
