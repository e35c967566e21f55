//! # Image Strategy
//!
//! Catena di fallback a due anelli per le immagini.
//!
//! ## Anello 1 - ottimizzatore esterno (`optimize-images`):
//! - Lavora in-place sulla copia di staging, mai sull'originale
//! - Argomenti: `<file> -mw 1920 -q 80 --no-interactive`
//! - Tool assente (`NotFound`): segnato come non disponibile per il resto del run
//! - Qualsiasi fallimento: si passa all'anello 2
//!
//! ## Anello 2 - ricompressione in-process (crate `image`):
//! 1. Decodifica l'originale (mai modificato)
//! 2. JPEG: modalità con alpha / palette / 16 bit convertite in RGB8
//! 3. Ridimensionamento Lanczos3 solo se più larga di 1920px (aspect ratio preservato)
//! 4. Encoding per formato:
//!    - PNG: palette a 256 colori (NeuQuant) + tRNS, compressione massima
//!    - JPEG: qualità 80, senza chroma subsampling
//!    - Altri (WebP): ri-salvataggio con l'encoder del formato
//!
//! Entrambi gli anelli riportano solo successo/fallimento.

use ::image::codecs::jpeg::JpegEncoder;
use ::image::imageops::FilterType;
use ::image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use tracing::{debug, warn};

use super::CompressionStrategy;
use crate::config::{IMAGE_QUALITY, MAX_WIDTH};
use crate::error::CompressError;
use crate::utils::{file_label, to_os_args};

/// First link: external optimizer run in place on the staging copy
pub struct ExternalOptimizer {
    command: String,
    unavailable: AtomicBool,
}

impl ExternalOptimizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Set once the tool was not found, so later files skip straight to the fallback
    pub fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::Relaxed)
    }

    pub fn optimizer_args(target: &Path) -> Vec<OsString> {
        let max_width = MAX_WIDTH.to_string();
        let quality = IMAGE_QUALITY.to_string();
        to_os_args([
            target.as_os_str(),
            OsStr::new("-mw"),
            OsStr::new(&max_width),
            OsStr::new("-q"),
            OsStr::new(&quality),
            OsStr::new("--no-interactive"),
        ])
    }

    async fn optimize_in_place(&self, target: &Path) -> bool {
        if self.is_unavailable() {
            return false;
        }

        let status = Command::new(&self.command)
            .args(Self::optimizer_args(target))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => {
                if !status.success() {
                    debug!("{} exited with {} for {}", self.command, status, file_label(target));
                }
                status.success()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !self.unavailable.swap(true, Ordering::Relaxed) {
                    debug!("{} not installed, using built-in recompression", self.command);
                }
                false
            }
            Err(e) => {
                debug!("Failed to execute {}: {}", self.command, e);
                false
            }
        }
    }
}

impl CompressionStrategy for ExternalOptimizer {
    fn name(&self) -> &'static str {
        "external-optimizer"
    }

    fn attempt<'a>(&'a self, _source: &'a Path, destination: &'a Path) -> BoxFuture<'a, bool> {
        self.optimize_in_place(destination).boxed()
    }
}

/// Second link: decode, flatten, downscale and re-encode with the `image` crate
#[derive(Debug, Clone, Copy)]
pub struct InProcessRecompressor {
    max_width: u32,
    quality: u8,
}

impl Default for InProcessRecompressor {
    fn default() -> Self {
        Self {
            max_width: MAX_WIDTH,
            quality: IMAGE_QUALITY,
        }
    }
}

impl InProcessRecompressor {
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self { max_width, quality }
    }

    /// Decode `source` and write the recompressed result to `destination`.
    ///
    /// The output format follows the extension of `destination`.
    pub fn recompress(&self, source: &Path, destination: &Path) -> Result<(), CompressError> {
        let format = ImageFormat::from_path(destination)?;
        let img = ::image::open(source)?;

        let img = flatten_for(format, img);
        let img = downscale(img, self.max_width);

        let file = File::create(destination)?;
        let mut writer = BufWriter::new(file);

        match format {
            ImageFormat::Png => write_indexed_png(&img, &mut writer)?,
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut writer, self.quality);
                img.write_with_encoder(encoder)?;
            }
            other => write_generic(&img, &mut writer, other)?,
        }

        writer.flush()?;
        Ok(())
    }
}

impl CompressionStrategy for InProcessRecompressor {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn attempt<'a>(&'a self, source: &'a Path, destination: &'a Path) -> BoxFuture<'a, bool> {
        let recompressor = *self;
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();

        async move {
            let label = file_label(&source);
            match tokio::task::spawn_blocking(move || recompressor.recompress(&source, &destination)).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    debug!("Built-in recompression failed for {}: {}", label, e);
                    false
                }
                Err(e) => {
                    warn!("Built-in recompression task failed for {}: {}", label, e);
                    false
                }
            }
        }
        .boxed()
    }
}

/// Two-link chain: external optimizer first, built-in recompression on any failure
pub struct ImageStrategy {
    external: ExternalOptimizer,
    fallback: InProcessRecompressor,
}

impl ImageStrategy {
    pub fn new(external: ExternalOptimizer, fallback: InProcessRecompressor) -> Self {
        Self { external, fallback }
    }

    async fn run_chain(&self, source: &Path, destination: &Path) -> bool {
        if self.external.attempt(source, destination).await {
            debug!("{} optimized with {}", file_label(source), self.external.command);
            return true;
        }
        self.fallback.attempt(source, destination).await
    }
}

impl CompressionStrategy for ImageStrategy {
    fn name(&self) -> &'static str {
        "image-chain"
    }

    fn attempt<'a>(&'a self, source: &'a Path, destination: &'a Path) -> BoxFuture<'a, bool> {
        self.run_chain(source, destination).boxed()
    }
}

/// JPEG has no alpha or palette: anything but 8-bit gray/RGB goes to RGB8.
fn flatten_for(format: ImageFormat, img: DynamicImage) -> DynamicImage {
    match (format, img.color()) {
        (ImageFormat::Jpeg, ColorType::L8 | ColorType::Rgb8) => img,
        (ImageFormat::Jpeg, _) => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    }
}

fn downscale(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width {
        return img;
    }

    let ratio = max_width as f64 / width as f64;
    let new_height = ((height as f64 * ratio) as u32).max(1);
    debug!("Downscaling {}x{} -> {}x{}", width, height, max_width, new_height);
    img.resize_exact(max_width, new_height, FilterType::Lanczos3)
}

/// Quantize to a 256-color palette and write an indexed PNG
fn write_indexed_png<W: Write>(img: &DynamicImage, writer: W) -> Result<(), CompressError> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let quantizer = color_quant::NeuQuant::new(10, 256, rgba.as_raw());
    let indices: Vec<u8> = rgba
        .pixels()
        .map(|pixel| quantizer.index_of(&pixel.0) as u8)
        .collect();

    let color_map = quantizer.color_map_rgba();
    let mut palette = Vec::with_capacity(color_map.len() / 4 * 3);
    let mut alpha = Vec::with_capacity(color_map.len() / 4);
    for entry in color_map.chunks_exact(4) {
        palette.extend_from_slice(&entry[..3]);
        alpha.push(entry[3]);
    }

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Best);
    encoder.set_palette(palette);
    if alpha.iter().any(|&a| a != u8::MAX) {
        encoder.set_trns(alpha);
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&indices)?;
    png_writer.finish()?;
    Ok(())
}

fn write_generic<W: Write + Seek>(
    img: &DynamicImage,
    writer: &mut W,
    format: ImageFormat,
) -> Result<(), CompressError> {
    let img = match img.color() {
        ColorType::Rgb8 | ColorType::Rgba8 => img.clone(),
        color if color.has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };
    img.write_to(writer, format)?;
    Ok(())
}
