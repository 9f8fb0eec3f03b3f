//! Capture saving.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use collage_engine::canvas::CanvasListener;
use collage_engine::scene::PixelBuffer;

/// Writes `image` as PNG to `path`.
///
/// The data goes to a sibling temp file first and is renamed into place; on
/// any failure the partial file is removed and `path` is left untouched.
pub fn save_png(path: &Path, image: &PixelBuffer) -> Result<()> {
    let tmp = temp_sibling(path);

    let written = image
        .save_with_format(&tmp, image::ImageFormat::Png)
        .with_context(|| format!("failed to encode {}", tmp.display()))
        .and_then(|()| {
            fs::rename(&tmp, path).with_context(|| format!("failed to move capture to {}", path.display()))
        });

    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Output path of the `n`th capture: `base` itself, then `stem-1.ext`, ...
pub fn numbered(base: &Path, n: usize) -> PathBuf {
    if n == 0 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("collage");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("png");
    base.with_file_name(format!("{stem}-{n}.{ext}"))
}

/// Listener that saves every capture off the render thread.
pub struct SaveListener {
    base: PathBuf,
    count: usize,
}

impl SaveListener {
    pub fn new(base: PathBuf) -> Self {
        Self { base, count: 0 }
    }
}

impl CanvasListener for SaveListener {
    fn on_captured(&mut self, image: PixelBuffer) {
        let path = numbered(&self.base, self.count);
        self.count += 1;
        rayon::spawn(move || match save_png(&path, &image) {
            Ok(()) => log::info!("capture saved to {}", path.display()),
            Err(e) => log::error!("capture not saved: {e:#}"),
        });
    }

    fn on_loading_progress(&mut self, remaining: usize, total: usize) {
        log::info!("loading: {}/{total}", total - remaining.min(total));
    }

    fn on_ready(&mut self) {
        log::info!("collage ready; drag tiles, +/- to zoom, C to capture, R to reload");
    }
}
