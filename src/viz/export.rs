use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use tracing::{info, warn};

use crate::config::ExportConfig;
use crate::error::{VizError, VizResult};

/// `{dir}/{prefix}animation.{extension}`
pub fn animation_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}animation.{extension}"))
}

#[derive(Debug, Clone)]
pub struct AnimationRequest {
    pub output: PathBuf,
    pub fps: u32,
    pub ffmpeg: PathBuf,
    pub crf: Option<u8>,
}

impl AnimationRequest {
    pub fn from_export(export: &ExportConfig) -> Self {
        Self {
            output: animation_path(&export.save_dir, &export.prefix, "mp4"),
            fps: export.fps,
            ffmpeg: export.ffmpeg_binary(),
            crf: export.crf,
        }
    }
}

struct EncoderPlan {
    description: &'static str,
    args: Vec<String>,
    extension: Option<&'static str>,
    requires_faststart: bool,
}

fn encoder_plans(request: &AnimationRequest) -> Vec<EncoderPlan> {
    let crf = request.crf.unwrap_or(18).clamp(0, 51).to_string();
    vec![
        EncoderPlan {
            description: "H.264 (libx264)",
            args: vec![
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                "medium".into(),
                "-crf".into(),
                crf,
                "-pix_fmt".into(),
                "yuv420p".into(),
            ],
            extension: None,
            requires_faststart: true,
        },
        EncoderPlan {
            description: "MPEG-4 Part 2 (mpeg4)",
            args: vec![
                "-c:v".into(),
                "mpeg4".into(),
                "-q:v".into(),
                "3".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
            ],
            extension: None,
            requires_faststart: true,
        },
        EncoderPlan {
            description: "FFV1 lossless",
            args: vec![
                "-c:v".into(),
                "ffv1".into(),
                "-level".into(),
                "3".into(),
                "-pix_fmt".into(),
                "rgb24".into(),
            ],
            extension: Some("mkv"),
            requires_faststart: false,
        },
    ]
}

/// Encode a raw rgb24 spool with the first ffmpeg encoder that succeeds.
pub fn encode_with_ffmpeg(
    raw_path: &Path,
    frame_count: usize,
    width: usize,
    height: usize,
    request: &AnimationRequest,
) -> Result<PathBuf> {
    if frame_count == 0 {
        return Err(anyhow!("no frames available for encoding"));
    }
    if let Some(parent) = request.output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let dims = format!("{width}x{height}");
    let fps_str = request.fps.max(1).to_string();
    let frame_str = frame_count.to_string();
    let mut failures: Vec<(String, String)> = Vec::new();

    for plan in encoder_plans(request) {
        let mut output_path = request.output.clone();
        if let Some(ext) = plan.extension {
            output_path.set_extension(ext);
        }

        let mut cmd = Command::new(&request.ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-s")
            .arg(&dims)
            .arg("-r")
            .arg(&fps_str)
            .arg("-i")
            .arg(raw_path.as_os_str())
            .arg("-frames:v")
            .arg(&frame_str);
        for arg in &plan.args {
            cmd.arg(arg);
        }
        if plan.requires_faststart {
            cmd.arg("-movflags").arg("+faststart");
        }
        cmd.arg(output_path.as_os_str());

        info!("viz: encoding {frame_count} frames with {}", plan.description);
        match cmd.output() {
            Ok(output) if output.status.success() => {
                info!("viz: saving mp4 under {}", output_path.display());
                if output_path != request.output {
                    warn!(
                        "viz: requested {} but wrote {}; install an ffmpeg build with libx264 for mp4 output",
                        request.output.display(),
                        output_path.display()
                    );
                }
                return Ok(output_path);
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
                failures.push((plan.description.to_string(), stderr));
            }
            Err(err) => {
                failures.push((plan.description.to_string(), err.to_string()));
                // A missing binary fails every plan the same way.
                if err.kind() == std::io::ErrorKind::NotFound {
                    break;
                }
            }
        }
    }

    let mut report = String::new();
    for (desc, err) in failures {
        report.push_str(&format!("- {desc}: {err}\n"));
    }
    Err(anyhow!(
        "failed to encode animation with {}:\n{}",
        request.ffmpeg.display(),
        report.trim_end()
    ))
}

/// True for `{prefix}{digits}.png`, the still naming scheme.
fn is_still(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".png"))
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

/// Assemble the numbered stills in `dir` into `{prefix}animation.gif`.
/// Returns `None` when there are no stills.
pub fn gif_from_dir(dir: &Path, prefix: &str, fps: u32) -> VizResult<Option<PathBuf>> {
    let mut stills: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| is_still(name, prefix));
        if matches {
            stills.push(path);
        }
    }
    if stills.is_empty() {
        info!("viz: no stills under {}; skipping gif", dir.display());
        return Ok(None);
    }
    stills.sort();

    let delay = Delay::from_saturating_duration(Duration::from_secs_f64(1.0 / fps.max(1) as f64));
    let output = animation_path(dir, prefix, "gif");
    let file = File::create(&output)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;
    for still in &stills {
        let frame = image::open(still)
            .map_err(|err| VizError::Export(format!("failed to read {}: {err}", still.display())))?
            .to_rgba8();
        encoder.encode_frame(Frame::from_parts(frame, 0, 0, delay))?;
    }
    info!(
        "viz: saving gif of {} stills under {}",
        stills.len(),
        output.display()
    );
    Ok(Some(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_names_are_matched_strictly() {
        assert!(is_still("run_00003.png", "run_"));
        assert!(is_still("00012.png", ""));
        assert!(!is_still("run_live.png", "run_"));
        assert!(!is_still("run_animation.gif", "run_"));
        assert!(!is_still("other_00003.png", "run_"));
        assert!(!is_still("run_.png", "run_"));
    }

    #[test]
    fn gif_skips_empty_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(gif_from_dir(dir.path(), "", 5).expect("gif").is_none());
        assert!(!animation_path(dir.path(), "", "gif").exists());
    }

    #[test]
    fn missing_ffmpeg_reports_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = dir.path().join("frames.raw");
        fs::write(&raw, vec![0u8; 4 * 4 * 3]).expect("raw");
        let request = AnimationRequest {
            output: dir.path().join("animation.mp4"),
            fps: 5,
            ffmpeg: dir.path().join("no-such-ffmpeg"),
            crf: None,
        };
        let err = encode_with_ffmpeg(&raw, 1, 4, 4, &request).unwrap_err();
        assert!(format!("{err:#}").contains("H.264"));
    }
}
