pub mod cache;
mod gemini;

pub use cache::VisionCache;
pub use gemini::GeminiClient;

use crate::error::{FloraTrackError, Result};
use base64::Engine;
use flora_track_common::{AnalysisMode, VisionDetection};
use image::imageops::FilterType;
use std::io::Cursor;
use std::path::Path;

/// Longest side and JPEG quality for live scanning
const FAST_MAX_SIDE: u32 = 1280;
const FAST_JPEG_QUALITY: u8 = 80;
const THOROUGH_JPEG_QUALITY: u8 = 90;

/// Image ready to be sent: base64 JPEG plus the hash of the source bytes
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub mime_type: String,
    pub data: String,
    pub hash: String,
}

/// (longest side, JPEG quality) for a mode
pub fn encoding_params(mode: AnalysisMode, max_image_size: u32) -> (u32, u8) {
    match mode {
        AnalysisMode::Fast => (FAST_MAX_SIDE.min(max_image_size.max(1)), FAST_JPEG_QUALITY),
        AnalysisMode::Thorough => (max_image_size.max(1), THOROUGH_JPEG_QUALITY),
    }
}

/// Decode, downscale to the mode's size and re-encode as JPEG.
pub fn prepare_image(bytes: &[u8], mode: AnalysisMode, max_image_size: u32) -> Result<PreparedImage> {
    let img = image::load_from_memory(bytes).map_err(|e| FloraTrackError::ImageLoad(e.to_string()))?;

    let (max_side, quality) = encoding_params(mode, max_image_size);
    let img = if img.width() > max_side || img.height() > max_side {
        img.resize(max_side, max_side, FilterType::Triangle)
    } else {
        img
    };

    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
        img.to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| FloraTrackError::ImageLoad(e.to_string()))?;
    }

    Ok(PreparedImage {
        mime_type: "image/jpeg".to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(&buffer),
        hash: cache::compute_hash(bytes),
    })
}

/// Analyze one image file, going through the cache.
///
/// `Ok(None)` means the service answered but nothing usable was found.
pub async fn analyze_file(
    client: &GeminiClient,
    cache: &mut VisionCache,
    path: &Path,
    mode: AnalysisMode,
    max_image_size: u32,
) -> Result<Option<VisionDetection>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FloraTrackError::FileNotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let hash = cache::compute_hash(&bytes);
    let raw = match cache.get(&hash) {
        Some(raw) => {
            tracing::debug!(file = %path.display(), "vision cache hit");
            raw.clone()
        }
        None => {
            let image = prepare_image(&bytes, mode, max_image_size)?;
            let raw = client.analyze(&image).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            cache.insert(hash, file_name, bytes.len() as u64, raw.clone());
            raw
        }
    };

    Ok(raw.normalize(mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_encoding_params() {
        assert_eq!(encoding_params(AnalysisMode::Fast, 1600), (1280, 80));
        assert_eq!(encoding_params(AnalysisMode::Thorough, 1600), (1600, 90));
        assert_eq!(encoding_params(AnalysisMode::Fast, 800), (800, 80));
    }

    #[test]
    fn test_prepare_image_downscales() {
        let bytes = png_bytes(2000, 1000);
        let prepared = prepare_image(&bytes, AnalysisMode::Fast, 1600).unwrap();
        assert_eq!(prepared.mime_type, "image/jpeg");
        assert_eq!(prepared.hash, cache::compute_hash(&bytes));

        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(&prepared.data)
            .unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 1280);
        assert_eq!(decoded.height(), 640);
    }

    #[test]
    fn test_prepare_image_rejects_garbage() {
        let result = prepare_image(b"not an image", AnalysisMode::Thorough, 1600);
        assert!(matches!(result, Err(FloraTrackError::ImageLoad(_))));
    }
}
