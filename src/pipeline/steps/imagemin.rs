// src/pipeline/steps/imagemin.rs

//! Lossless-by-default image recompression.
//!
//! PNGs are re-encoded with the strongest deflate setting. JPEGs are only
//! touched when a quality is configured. GIF, SVG, ICO and anything else
//! pass through. A re-encode that comes out larger is discarded.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use tracing::{debug, info};

use crate::errors::StepError;
use crate::pipeline::transform::{blocking, Asset, StepContext, StepFuture, Transform};

#[derive(Debug)]
pub struct ImageminStep {
    verbose: bool,
    jpeg_quality: Option<u8>,
}

impl ImageminStep {
    pub fn new(verbose: bool, jpeg_quality: Option<u8>) -> Self {
        Self {
            verbose,
            jpeg_quality,
        }
    }
}

fn encode_png(img: &DynamicImage) -> image::ImageResult<Option<Vec<u8>>> {
    match img.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => {}
        _ => return Ok(None),
    }
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive).write_image(
        img.as_bytes(),
        img.width(),
        img.height(),
        img.color().into(),
    )?;
    Ok(Some(out))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Smallest encoding of one file; `None` keeps the original.
fn optimize(asset: &Asset, jpeg_quality: Option<u8>) -> Result<Option<Vec<u8>>, StepError> {
    let Ok(format) = ImageFormat::from_path(&asset.path) else {
        return Ok(None);
    };
    let fail = |e: image::ImageError| {
        StepError::new("imagemin", format!("{}: {e}", asset.display_path().display()))
    };

    let encoded = match (format, jpeg_quality) {
        (ImageFormat::Png, _) => {
            let img = image::load_from_memory_with_format(&asset.contents, format).map_err(fail)?;
            encode_png(&img).map_err(fail)?
        }
        (ImageFormat::Jpeg, Some(quality)) => {
            let img = image::load_from_memory_with_format(&asset.contents, format).map_err(fail)?;
            Some(encode_jpeg(&img, quality).map_err(fail)?)
        }
        _ => None,
    };

    Ok(encoded.filter(|bytes| bytes.len() < asset.contents.len()))
}

impl Transform for ImageminStep {
    fn name(&self) -> &'static str {
        "imagemin"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        let verbose = self.verbose;
        let jpeg_quality = self.jpeg_quality;
        Box::pin(async move {
            blocking("imagemin", move || {
                let mut total_saved = 0usize;
                let mut out = Vec::with_capacity(assets.len());
                for mut asset in assets {
                    let before = asset.contents.len();
                    match optimize(&asset, jpeg_quality)? {
                        Some(smaller) => {
                            let saved = before - smaller.len();
                            total_saved += saved;
                            asset.contents = smaller;
                            if verbose {
                                info!(file = %asset.path.display(), before, saved, "optimized image");
                            }
                        }
                        None if verbose => {
                            info!(file = %asset.path.display(), "already optimized");
                        }
                        None => {}
                    }
                    out.push(asset);
                }
                debug!(files = out.len(), saved_bytes = total_saved, "imagemin done");
                Ok(out)
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use image::{ImageBuffer, Rgb};

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn ctx() -> StepContext {
        StepContext::new(PathBuf::from("/project"), Arc::new(MockFileSystem::new()), None)
    }

    fn flat_png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(64, 64, Rgb([200, 30, 30]));
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter)
            .write_image(img.as_raw(), 64, 64, image::ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn png_never_grows_and_stays_decodable() {
        let original = flat_png();
        let step = ImageminStep::new(true, None);
        let out = step
            .apply(vec![Asset::new("logo.png", original.clone())], &ctx())
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert!(out[0].contents.len() <= original.len());
        let decoded = image::load_from_memory(&out[0].contents).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[tokio::test]
    async fn other_formats_pass_through() {
        let step = ImageminStep::new(false, Some(80));
        let svg = Asset::new("icon.svg", "<svg/>");
        let out = step.apply(vec![svg.clone()], &ctx()).await.unwrap();
        assert_eq!(out, vec![svg]);
    }

    #[tokio::test]
    async fn corrupt_png_fails_the_step() {
        let step = ImageminStep::new(false, None);
        let err = step
            .apply(vec![Asset::new("broken.png", "not a png")], &ctx())
            .await
            .unwrap_err();
        assert_eq!(err.step, "imagemin");
    }
}
