//! File-backed image loader service.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use collage_engine::canvas::{DisplayTarget, ImageLoader, LoadCallback, LoadEvent};

/// Decodes local files on a rayon pool.
///
/// Accepts plain paths and `file://` URLs. Other schemes fail; fetching over
/// the network is left to a different service.
pub struct FsImageLoader {
    pool: rayon::ThreadPool,
    cancelled: Arc<Mutex<HashSet<DisplayTarget>>>,
    next_target: AtomicU64,
}

impl FsImageLoader {
    /// `threads == 0` lets rayon pick.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("image-loader-{i}"))
            .build()
            .context("failed to build image loader pool")?;

        Ok(Self {
            pool,
            cancelled: Arc::new(Mutex::new(HashSet::new())),
            next_target: AtomicU64::new(1),
        })
    }

    /// Loads `url` on behalf of `target`. Cancelling `target` before the
    /// decode finishes reports [`LoadEvent::Cancelled`] instead.
    pub fn load_image_for(&self, target: DisplayTarget, url: &str, on_done: LoadCallback) {
        let url = url.to_string();
        let cancelled = Arc::clone(&self.cancelled);

        self.pool.spawn(move || {
            let take_cancel = || cancelled.lock().map(|mut set| set.remove(&target)).unwrap_or(false);

            if take_cancel() {
                on_done(LoadEvent::Cancelled);
                return;
            }

            let event = match resolve(&url).and_then(|path| {
                image::open(&path).map_err(|e| format!("{}: {e}", path.display()))
            }) {
                Ok(decoded) => LoadEvent::Loaded(decoded.into_rgba8()),
                Err(reason) => LoadEvent::Failed(reason),
            };

            if take_cancel() {
                on_done(LoadEvent::Cancelled);
            } else {
                on_done(event);
            }
        });
    }
}

impl ImageLoader for FsImageLoader {
    fn load_image(&self, url: &str, on_done: LoadCallback) {
        let target = DisplayTarget(self.next_target.fetch_add(1, Ordering::Relaxed));
        self.load_image_for(target, url, on_done);
    }

    fn cancel_display_task(&self, target: DisplayTarget) {
        if let Ok(mut set) = self.cancelled.lock() {
            set.insert(target);
        }
    }
}

/// Maps a URL or plain path to a local file path.
fn resolve(url: &str) -> Result<PathBuf, String> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    match url.split_once("://") {
        Some((scheme, _)) => Err(format!("unsupported scheme {scheme:?} in {url}")),
        None => Ok(PathBuf::from(url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    fn load(loader: &FsImageLoader, target: DisplayTarget, url: &str) -> LoadEvent {
        let (tx, rx) = bounded(1);
        loader.load_image_for(target, url, Box::new(move |ev| tx.send(ev).unwrap()));
        rx.recv_timeout(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn resolve_accepts_paths_and_file_urls() {
        assert_eq!(resolve("a/b.png").unwrap(), PathBuf::from("a/b.png"));
        assert_eq!(resolve("file:///tmp/x.jpg").unwrap(), PathBuf::from("/tmp/x.jpg"));
        assert!(resolve("https://example.com/x.png").is_err());
    }

    #[test]
    fn decodes_png_from_disk() {
        let path = std::env::temp_dir().join(format!("collage-loader-{}.png", std::process::id()));
        image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let loader = FsImageLoader::new(1).unwrap();
        let ev = load(&loader, DisplayTarget(1), path.to_str().unwrap());
        std::fs::remove_file(&path).ok();

        match ev {
            LoadEvent::Loaded(img) => assert_eq!(img.dimensions(), (3, 2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_file_fails() {
        let loader = FsImageLoader::new(1).unwrap();
        let ev = load(&loader, DisplayTarget(1), "/definitely/not/here.png");
        assert!(matches!(ev, LoadEvent::Failed(_)));
    }

    #[test]
    fn cancelled_target_reports_cancelled() {
        let loader = FsImageLoader::new(1).unwrap();
        loader.cancel_display_task(DisplayTarget(7));
        let ev = load(&loader, DisplayTarget(7), "/definitely/not/here.png");
        assert!(matches!(ev, LoadEvent::Cancelled));
    }
}
