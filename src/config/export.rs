use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{VizError, VizResult};

pub const FFMPEG_ENV: &str = "PROTO_VIZ_FFMPEG";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExportConfig {
    /// Write one still per rendered epoch.
    #[serde(default)]
    pub save: bool,
    /// Retain every rendered frame for the end-of-training mp4.
    #[serde(default = "default_capture_frames")]
    pub capture_frames: bool,
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub make_gif: bool,
    #[serde(default)]
    pub make_mp4: bool,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    /// ffmpeg binary; falls back to `$PROTO_VIZ_FFMPEG`, then `ffmpeg` on `PATH`.
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,
    #[serde(default = "default_crf")]
    pub crf: Option<u8>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            save: false,
            capture_frames: default_capture_frames(),
            save_dir: default_save_dir(),
            prefix: String::new(),
            make_gif: false,
            make_mp4: false,
            fps: default_fps(),
            verbose: default_verbose(),
            ffmpeg: None,
            crf: default_crf(),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> VizResult<()> {
        if self.fps == 0 {
            return Err(VizError::InvalidConfig("export.fps must be positive".into()));
        }
        if self
            .prefix
            .chars()
            .any(|ch| ch == '/' || ch == '\\' || ch.is_control())
        {
            return Err(VizError::InvalidConfig(format!(
                "export.prefix {:?} must not contain path separators",
                self.prefix
            )));
        }
        Ok(())
    }

    /// Frames are only spooled when an mp4 will be assembled from them.
    pub fn captures_frames(&self) -> bool {
        self.capture_frames && self.make_mp4
    }

    /// Any output that lands in `save_dir`.
    pub fn writes_files(&self) -> bool {
        self.save || self.make_gif || self.make_mp4
    }

    pub fn ffmpeg_binary(&self) -> PathBuf {
        self.ffmpeg
            .clone()
            .or_else(|| env::var_os(FFMPEG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("./img")
}

fn default_capture_frames() -> bool {
    true
}

fn default_fps() -> u32 {
    5
}

fn default_verbose() -> bool {
    true
}

fn default_crf() -> Option<u8> {
    Some(18)
}
