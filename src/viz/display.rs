use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use image::ImageFormat;
use tempfile::NamedTempFile;
use tracing::info;

use super::surface::RenderSurface;
use crate::error::{VizError, VizResult};

/// Presents each rendered canvas to whoever is watching the run.
pub trait Viewer {
    fn present(&mut self, surface: &RenderSurface, pause: Duration, block: bool) -> VizResult<()>;

    fn close(&mut self) {}
}

/// Headless runs.
#[derive(Debug, Default)]
pub struct NoViewer;

impl Viewer for NoViewer {
    fn present(&mut self, _surface: &RenderSurface, _pause: Duration, _block: bool) -> VizResult<()> {
        Ok(())
    }
}

/// Keeps `{dir}/{prefix}live.png` up to date for an external image viewer.
/// Writes go through a temp file and a rename so readers never see a torn PNG.
#[derive(Debug)]
pub struct LiveImageViewer {
    path: PathBuf,
    presented: usize,
}

impl LiveImageViewer {
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self {
            path: dir.join(format!("{prefix}live.png")),
            presented: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn presented(&self) -> usize {
        self.presented
    }
}

impl Viewer for LiveImageViewer {
    fn present(&mut self, surface: &RenderSurface, pause: Duration, block: bool) -> VizResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let staged = NamedTempFile::new_in(dir)?;
        surface
            .to_rgb_image()?
            .save_with_format(staged.path(), ImageFormat::Png)?;
        staged
            .persist(&self.path)
            .map_err(|err| VizError::Io(err.error))?;
        if self.presented == 0 {
            info!("viz: live view at {}", self.path.display());
        }
        self.presented += 1;

        if block {
            info!("viz: paused on {}; press Enter to continue", self.path.display());
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
        } else if !pause.is_zero() {
            thread::sleep(pause);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_view_replaces_previous_frame() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut viewer = LiveImageViewer::new(dir.path(), "run_");
        let surface = RenderSurface::new(160, 140);
        viewer
            .present(&surface, Duration::ZERO, false)
            .expect("present");
        viewer
            .present(&surface, Duration::ZERO, false)
            .expect("present");
        assert_eq!(viewer.presented(), 2);
        assert_eq!(viewer.path(), dir.path().join("run_live.png"));
        let decoded = image::open(viewer.path()).expect("decode").to_rgb8();
        assert_eq!(decoded.dimensions(), (160, 140));
        let leftovers = std::fs::read_dir(dir.path()).expect("read_dir").count();
        assert_eq!(leftovers, 1);
    }
}
