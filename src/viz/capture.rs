use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array3, s};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::export::{AnimationRequest, encode_with_ffmpeg};
use super::surface::RenderSurface;
use crate::error::{VizError, VizResult};

/// `{dir}/{prefix}{epoch:05}.png`
pub fn still_path(dir: &Path, prefix: &str, epoch: usize) -> PathBuf {
    dir.join(format!("{prefix}{epoch:05}.png"))
}

pub fn save_still(surface: &RenderSurface, path: &Path) -> VizResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    surface
        .to_rgb_image()?
        .save(path)
        .map_err(|err| VizError::Export(format!("failed to write {}: {err}", path.display())))
}

fn sanitize_dimension(dim: u32) -> usize {
    // yuv420p needs even sides.
    let sanitized = dim.max(2);
    (sanitized - sanitized % 2) as usize
}

/// Rendered frames retained for the end-of-training animation, spooled as raw
/// rgb24 so memory stays flat over long runs.
pub struct FrameSequence {
    writer: BufWriter<NamedTempFile>,
    width: usize,
    height: usize,
    frames: usize,
}

impl FrameSequence {
    pub fn new(width: u32, height: u32) -> VizResult<Self> {
        let spool = NamedTempFile::new()?;
        let frame_w = sanitize_dimension(width);
        let frame_h = sanitize_dimension(height);
        if frame_w as u32 != width || frame_h as u32 != height {
            info!(
                "viz: cropping animation frames from {width}x{height} to {frame_w}x{frame_h} for encoder compatibility"
            );
        }
        Ok(Self {
            writer: BufWriter::new(spool),
            width: frame_w,
            height: frame_h,
            frames: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn frame_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn push(&mut self, image: &Array3<u8>) -> VizResult<()> {
        let shape = image.shape();
        if shape[0] < self.height || shape[1] < self.width || shape[2] != 3 {
            return Err(VizError::Export(format!(
                "frame {}x{} is smaller than the animation size {}x{}",
                shape[1], shape[0], self.width, self.height
            )));
        }
        for y in 0..self.height {
            let row = image.slice(s![y, 0..self.width, ..]);
            let bytes = row
                .as_slice()
                .ok_or_else(|| VizError::Export("frame row is not contiguous".into()))?;
            self.writer.write_all(bytes)?;
        }
        self.frames += 1;
        Ok(())
    }

    /// Encode the retained frames. Zero frames is a no-op and yields `None`.
    pub fn finish(self, request: &AnimationRequest) -> VizResult<Option<PathBuf>> {
        let Self {
            writer,
            width,
            height,
            frames,
        } = self;
        if frames == 0 {
            info!("viz: no frames collected; skipping animation encoding");
            return Ok(None);
        }
        let spool = writer
            .into_inner()
            .map_err(|err| VizError::Io(err.into_error()))?;
        let raw_path = spool.into_temp_path();
        let encoded = encode_with_ffmpeg(raw_path.as_ref(), frames, width, height, request)
            .map_err(|err| VizError::Export(format!("{err:#}")))?;
        if let Err(err) = raw_path.close() {
            warn!("viz: failed to remove frame spool: {err}");
        }
        Ok(Some(encoded))
    }
}
