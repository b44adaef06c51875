//! Image normalization
//!
//! Turns whatever a fetch produced (PNG, JPEG, GIF, WebP, ICO, BMP or SVG)
//! into a square PNG of the requested edge length. Content is downscaled to
//! fit, never upscaled, and centered on a transparent canvas.

use bytes::Bytes;
use image::{
    DynamicImage, ImageFormat, ImageReader, Limits, Rgba, RgbaImage, imageops::FilterType,
};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use tracing::debug;

use crate::errors::{IconError, IconResult};
use crate::fetcher::FetchResult;

const PNG_MIME_TYPE: &str = "image/png";

/// Largest accepted width or height of a raster input
pub const MAX_IMAGE_EDGE: u32 = 8192;
/// Largest accepted pixel count of a raster input
pub const MAX_IMAGE_PIXELS: u64 = 4096 * 4096;
/// Allocation ceiling for a single decode
const MAX_DECODE_ALLOC: u64 = 128 * 1024 * 1024;

/// Normalize fetched content into a `size` x `size` PNG
pub fn normalize(content: &FetchResult, size: u32) -> IconResult<Bytes> {
    let png = match content {
        FetchResult::Raster(bytes) => normalize_raster(bytes, size)?,
        FetchResult::Vector(svg) => {
            let rasterized = rasterize_svg(svg, size)?;
            normalize_raster(&rasterized, size)?
        }
    };
    verify_png(&png)?;
    Ok(Bytes::from(png))
}

/// Run [`normalize`] on the blocking thread pool
pub async fn normalize_blocking(content: FetchResult, size: u32) -> IconResult<Bytes> {
    tokio::task::spawn_blocking(move || normalize(&content, size))
        .await
        .map_err(|e| IconError::decode(format!("Normalization task failed: {e}")))?
}

/// Pixel dimensions of an encoded raster image, read from its header
pub fn raster_dimensions(bytes: &[u8]) -> IconResult<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| IconError::decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| IconError::decode(e.to_string()))
}

/// Reject dimensions that would decode into an unreasonable amount of memory
///
/// Small compressed files can declare huge canvases, so the byte cap on the
/// fetch alone does not bound decode cost.
pub fn check_pixel_bounds(width: u32, height: u32) -> IconResult<()> {
    if width > MAX_IMAGE_EDGE
        || height > MAX_IMAGE_EDGE
        || u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS
    {
        return Err(IconError::decode(format!(
            "Image of {width}x{height} exceeds the {MAX_IMAGE_EDGE}px / {MAX_IMAGE_PIXELS} pixel limit"
        )));
    }
    Ok(())
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_EDGE);
    limits.max_image_height = Some(MAX_IMAGE_EDGE);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decode a raster buffer under the dimension and allocation limits
fn decode_bounded(bytes: &[u8]) -> IconResult<DynamicImage> {
    let (width, height) = raster_dimensions(bytes)?;
    check_pixel_bounds(width, height)?;

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| IconError::decode(e.to_string()))?;
    reader.limits(decode_limits());
    reader
        .decode()
        .map_err(|e| IconError::decode(format!("Unsupported or corrupt image: {e}")))
}

/// Check the magic number of an encoded buffer
pub fn verify_png(bytes: &[u8]) -> IconResult<()> {
    match infer::get(bytes) {
        Some(kind) if kind.mime_type() == PNG_MIME_TYPE => Ok(()),
        Some(kind) => Err(IconError::FormatMismatch {
            expected: PNG_MIME_TYPE.to_string(),
            actual: kind.mime_type().to_string(),
        }),
        None => Err(IconError::FormatMismatch {
            expected: PNG_MIME_TYPE.to_string(),
            actual: "unknown".to_string(),
        }),
    }
}

/// Encode a single-colour square tile as PNG
pub fn solid_tile(size: u32, colour: [u8; 4]) -> IconResult<Bytes> {
    let tile = RgbaImage::from_pixel(size, size, Rgba(colour));
    encode_png(&DynamicImage::ImageRgba8(tile)).map(Bytes::from)
}

/// Rasterize SVG markup into a `size` x `size` PNG, aspect ratio preserved
pub fn rasterize_svg(svg: &str, size: u32) -> IconResult<Vec<u8>> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())
        .map_err(|e| IconError::decode(format!("Invalid SVG: {e}")))?;

    let source = tree.size();
    let (width, height) = (source.width(), source.height());
    if width <= 0.0 || height <= 0.0 {
        return Err(IconError::decode("SVG has an empty viewport"));
    }

    let edge = size as f32;
    let scale = (edge / width).min(edge / height);
    let offset_x = (edge - width * scale) / 2.0;
    let offset_y = (edge - height * scale) / 2.0;

    let mut pixmap = tiny_skia::Pixmap::new(size, size)
        .ok_or_else(|| IconError::decode(format!("Cannot allocate {size}x{size} canvas")))?;
    let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, offset_x, offset_y);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| IconError::decode(format!("Failed to encode rasterized SVG: {e}")))
}

fn normalize_raster(bytes: &[u8], size: u32) -> IconResult<Vec<u8>> {
    let mut img = decode_bounded(bytes)?;

    // Downscale in the source pixel format, before any RGBA copy
    let (width, height) = (img.width(), img.height());
    if width > size || height > size {
        img = img.resize(size, size, FilterType::CatmullRom);
        debug!(
            "Downscaled {}x{} to {}x{}",
            width,
            height,
            img.width(),
            img.height()
        );
    }

    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other => DynamicImage::ImageRgba8(other.to_rgba8()),
    };

    if img.width() != size || img.height() != size {
        return encode_png(&pad_to_square(&img, size));
    }
    encode_png(&img)
}

fn pad_to_square(img: &DynamicImage, size: u32) -> DynamicImage {
    let mut canvas = RgbaImage::new(size, size);
    let x = (size.saturating_sub(img.width()) / 2) as i64;
    let y = (size.saturating_sub(img.height()) / 2) as i64;
    image::imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}

fn encode_png(img: &DynamicImage) -> IconResult<Vec<u8>> {
    let mut png_data = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)
        .map_err(|e| IconError::decode(format!("PNG encoding failed: {e}")))?;
    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn encode(img: DynamicImage, format: ImageFormat) -> Bytes {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        Bytes::from(buf)
    }

    fn solid(width: u32, height: u32, colour: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(colour)))
    }

    fn decode(bytes: &[u8]) -> DynamicImage {
        image::load_from_memory_with_format(bytes, ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_square_downscale() {
        let input = encode(solid(256, 256, [0, 255, 0, 255]), ImageFormat::Png);
        let out = normalize(&FetchResult::Raster(input), 64).unwrap();
        let img = decode(&out);
        assert_eq!(img.dimensions(), (64, 64));
        assert!(img.get_pixel(0, 0)[3] > 250);
    }

    #[test]
    fn test_non_square_is_centered_on_transparent_canvas() {
        let input = encode(solid(100, 50, [255, 0, 0, 255]), ImageFormat::Png);
        let out = normalize(&FetchResult::Raster(input), 64).unwrap();
        let img = decode(&out);
        assert_eq!(img.dimensions(), (64, 64));

        // Content is 64x32, placed at y = 16
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(63, 63)[3], 0);
        assert_eq!(img.get_pixel(32, 10)[3], 0);
        assert!(img.get_pixel(32, 17)[3] > 250);
        assert!(img.get_pixel(32, 46)[3] > 250);
        assert_eq!(img.get_pixel(32, 50)[3], 0);
        let centre = img.get_pixel(32, 32);
        assert!(centre[0] > 250 && centre[1] < 5 && centre[3] > 250);
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let input = encode(solid(16, 16, [0, 0, 255, 255]), ImageFormat::Png);
        let out = normalize(&FetchResult::Raster(input), 64).unwrap();
        let img = decode(&out);
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(23, 32)[3], 0);
        assert_eq!(img.get_pixel(24, 24)[3], 255);
        assert_eq!(img.get_pixel(39, 39)[3], 255);
        assert_eq!(img.get_pixel(40, 40)[3], 0);
    }

    #[test]
    fn test_jpeg_input() {
        let rgb = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            40,
            40,
            image::Rgb([10, 20, 30]),
        ));
        let input = encode(rgb, ImageFormat::Jpeg);
        let out = normalize(&FetchResult::Raster(input), 32).unwrap();
        assert_eq!(decode(&out).dimensions(), (32, 32));
    }

    #[test]
    fn test_svg_input() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="20"><rect width="10" height="20" fill="#0000ff"/></svg>"##;
        let out = normalize(&FetchResult::Vector(svg.to_string()), 64).unwrap();
        let img = decode(&out);
        assert_eq!(img.dimensions(), (64, 64));
        // Scaled to 32x64, centered horizontally
        assert_eq!(img.get_pixel(2, 32)[3], 0);
        let centre = img.get_pixel(32, 32);
        assert!(centre[2] > 250 && centre[3] > 250);
    }

    #[test]
    fn test_undecodable_input() {
        let err = normalize(&FetchResult::Raster(Bytes::from_static(b"not an image")), 32)
            .unwrap_err();
        assert!(matches!(err, IconError::Decode { .. }));

        let err = normalize(&FetchResult::Vector("<svg".to_string()), 32).unwrap_err();
        assert!(matches!(err, IconError::Decode { .. }));
    }

    #[test]
    fn test_verify_png() {
        let png = solid_tile(8, [1, 2, 3, 255]).unwrap();
        assert!(verify_png(&png).is_ok());

        let jpeg = encode(
            DynamicImage::ImageRgb8(image::RgbImage::new(8, 8)),
            ImageFormat::Jpeg,
        );
        assert!(matches!(
            verify_png(&jpeg),
            Err(IconError::FormatMismatch { .. })
        ));
        assert!(verify_png(b"????").is_err());
    }

    #[test]
    fn test_pixel_bounds() {
        assert!(check_pixel_bounds(512, 512).is_ok());
        assert!(check_pixel_bounds(MAX_IMAGE_EDGE, 16).is_ok());
        assert!(check_pixel_bounds(4096, 4096).is_ok());
        assert!(matches!(
            check_pixel_bounds(MAX_IMAGE_EDGE + 1, 1),
            Err(IconError::Decode { .. })
        ));
        assert!(check_pixel_bounds(1, MAX_IMAGE_EDGE + 1).is_err());
        assert!(check_pixel_bounds(4097, 4096).is_err());
    }

    #[test]
    fn test_oversized_canvas_rejected_before_decode() {
        // A few kilobytes on disk, far too wide once decoded
        let wide = encode(
            DynamicImage::ImageLuma8(image::GrayImage::new(MAX_IMAGE_EDGE + 100, 4)),
            ImageFormat::Png,
        );
        assert!(wide.len() < 64 * 1024);
        let err = normalize(&FetchResult::Raster(wide), 64).unwrap_err();
        assert!(matches!(err, IconError::Decode { .. }));

        let dense = encode(
            DynamicImage::ImageLuma8(image::GrayImage::new(4200, 4200)),
            ImageFormat::Png,
        );
        let err = normalize(&FetchResult::Raster(dense), 64).unwrap_err();
        assert!(matches!(err, IconError::Decode { .. }));
    }

    #[test]
    fn test_grayscale_input_is_downscaled_then_converted() {
        let input = encode(
            DynamicImage::ImageLuma8(image::GrayImage::from_pixel(200, 100, image::Luma([200]))),
            ImageFormat::Png,
        );
        let img = decode(&normalize(&FetchResult::Raster(input), 50).unwrap());
        assert_eq!(img.dimensions(), (50, 50));
        assert_eq!(img.get_pixel(25, 2)[3], 0);
        let centre = img.get_pixel(25, 25);
        assert!(centre[3] > 250 && centre[0] > 190 && centre[0] < 210);
    }

    #[test]
    fn test_raster_dimensions() {
        let input = encode(solid(48, 24, [0, 0, 0, 255]), ImageFormat::Png);
        assert_eq!(raster_dimensions(&input).unwrap(), (48, 24));
        assert!(raster_dimensions(b"garbage").is_err());
    }

    #[tokio::test]
    async fn test_normalize_blocking() {
        let input = encode(solid(20, 10, [9, 9, 9, 255]), ImageFormat::Png);
        let out = normalize_blocking(FetchResult::Raster(input), 16)
            .await
            .unwrap();
        assert_eq!(decode(&out).dimensions(), (16, 16));
    }
}
