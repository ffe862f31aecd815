use crate::error::{FloraTrackError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

fn image_info(path: &Path) -> ImageInfo {
    ImageInfo {
        path: path.to_path_buf(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    }
}

/// Price-tag photos to analyze: `target` itself when it is a file, or the
/// images directly inside it (no recursion), sorted by file name.
pub fn scan_images(target: &Path) -> Result<Vec<ImageInfo>> {
    if !target.exists() {
        return Err(FloraTrackError::FileNotFound(target.display().to_string()));
    }
    if target.is_file() {
        return Ok(vec![image_info(target)]);
    }

    let mut images: Vec<ImageInfo> = WalkDir::new(target)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| is_image_extension(&ext.to_string_lossy()))
        })
        .map(|e| image_info(e.path()))
        .collect();

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(images)
}
