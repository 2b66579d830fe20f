//! Built-in packing engine backed by the `image` crate.

use std::collections::BTreeMap;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use tracing::debug;

use crate::config::OutputFormat;
use crate::error::{Result, SpriteError};

use super::layout::layout;
use super::{Coordinate, PackOutput, PackRequest, PackingEngine};

/// Decodes source images, lays them out and encodes the composited sheet.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageEngine;

impl ImageEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PackingEngine for ImageEngine {
    fn pack(&self, request: &PackRequest) -> Result<PackOutput> {
        let fail = |message: String| SpriteError::Packing {
            sheet: request.sheet.clone(),
            message,
        };

        if request.images.is_empty() {
            return Err(fail("no source images".to_string()));
        }

        let sources = request
            .images
            .iter()
            .map(|path| {
                image::open(path)
                    .map(|img| img.to_rgba8())
                    .map_err(|e| fail(format!("cannot read {}: {}", path.display(), e)))
            })
            .collect::<Result<Vec<RgbaImage>>>()?;

        let sizes: Vec<(u32, u32)> = sources.iter().map(|img| img.dimensions()).collect();
        let options = &request.options;
        let placed = layout(options.algorithm, &sizes, options.padding);

        if placed.width == 0 || placed.height == 0 {
            return Err(fail("source images have no pixels".to_string()));
        }

        let mut canvas = RgbaImage::new(placed.width, placed.height);
        let mut coordinates = BTreeMap::new();
        for ((path, source), &(x, y)) in request.images.iter().zip(&sources).zip(&placed.positions) {
            imageops::replace(&mut canvas, source, i64::from(x), i64::from(y));
            coordinates.insert(
                path.clone(),
                Coordinate {
                    x,
                    y,
                    width: source.width(),
                    height: source.height(),
                },
            );
        }

        let image = encode(canvas, options.format, options.quality)
            .map_err(|e| fail(format!("cannot encode {}: {}", options.format, e)))?;

        debug!(
            sheet = %request.sheet,
            algorithm = %options.algorithm,
            width = placed.width,
            height = placed.height,
            bytes = image.len(),
            "packed sheet"
        );

        Ok(PackOutput {
            image,
            width: placed.width,
            height: placed.height,
            coordinates,
        })
    }
}

fn encode(canvas: RgbaImage, format: OutputFormat, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => {
            DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        }
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;
        }
    }
    Ok(bytes)
}
