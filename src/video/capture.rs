use crate::core::AppConfig;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use thiserror::Error;

pub const FALLBACK_FPS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Failed to probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("Failed to start decoder for {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read frame: {0}")]
    Read(#[from] std::io::Error),
}

/// One decoded frame, tightly packed, blue-green-red byte order.
#[derive(Debug, Clone)]
pub struct BgrFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// An open handle over a video that yields frames sequentially.
/// Dropping the handle releases it.
pub trait FrameSource {
    fn frame_rate(&self) -> f64;

    /// `Ok(None)` at end of stream.
    fn read_frame(&mut self) -> Result<Option<BgrFrame>, PlaybackError>;

    /// Seek back to the first frame.
    fn rewind(&mut self) -> Result<(), PlaybackError>;
}

/// Opens decode handles.
pub trait VideoDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, PlaybackError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl FfmpegDecoder {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_program(),
            ffprobe: config.ffprobe_program(),
        }
    }

    pub fn probe(&self, path: &Path) -> Result<StreamInfo, PlaybackError> {
        let probe_error = |reason: String| PlaybackError::Probe {
            path: path.to_path_buf(),
            reason,
        };

        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| probe_error(e.to_string()))?;

        if !output.status.success() {
            return Err(probe_error(format!("ffprobe exited with {}", output.status)));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| probe_error(e.to_string()))?;
        parse_stream_info(&json).ok_or_else(|| probe_error("no video stream found".to_string()))
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, PlaybackError> {
        let info = self.probe(path)?;
        log::info!("Opening {} ({}x{} @ {:.2} fps)", path.display(), info.width, info.height, info.fps);
        let capture = FfmpegCapture::open(self.ffmpeg.clone(), path.to_path_buf(), info)?;
        Ok(Box::new(capture))
    }
}

/// Reads the first video stream out of `ffprobe -show_streams` JSON.
pub fn parse_stream_info(json: &serde_json::Value) -> Option<StreamInfo> {
    let streams = json["streams"].as_array()?;
    let video = streams.iter().find(|s| s["codec_type"] == "video")?;

    let width = u32::try_from(video["width"].as_u64()?).ok()?;
    let height = u32::try_from(video["height"].as_u64()?).ok()?;
    if width == 0 || height == 0 {
        return None;
    }

    // avg_frame_rate is "0/0" for some containers, r_frame_rate is the fallback
    let fps = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| video[*key].as_str().and_then(parse_frame_rate))
        .next()
        .unwrap_or(FALLBACK_FPS);

    Some(StreamInfo { fps, width, height })
}

/// Parses "30000/1001" or "25" style rates. Zero and non-finite rates are rejected.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let fps = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// `ffmpeg` child streaming raw bgr24 frames at native size over stdout.
pub struct FfmpegCapture {
    ffmpeg: PathBuf,
    path: PathBuf,
    info: StreamInfo,
    process: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegCapture {
    pub fn open(ffmpeg: PathBuf, path: PathBuf, info: StreamInfo) -> Result<Self, PlaybackError> {
        let mut capture = Self {
            ffmpeg,
            path,
            info,
            process: None,
            stdout: None,
        };
        capture.spawn()?;
        Ok(capture)
    }

    /// Frames come out at the coded size ffprobe reported, so rotation metadata is ignored.
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-noautorotate")
            .arg("-i")
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "bgr24", "-an", "-v", "quiet", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd
    }

    fn spawn(&mut self) -> Result<(), PlaybackError> {
        let mut child = self.command()
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        self.stdout = child.stdout.take();
        self.process = Some(child);
        Ok(())
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }

    fn frame_size(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 3
    }
}

impl FrameSource for FfmpegCapture {
    fn frame_rate(&self) -> f64 {
        self.info.fps
    }

    fn read_frame(&mut self) -> Result<Option<BgrFrame>, PlaybackError> {
        let size = self.frame_size();
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; size];
        match stdout.read_exact(&mut data) {
            Ok(()) => Ok(Some(BgrFrame {
                width: self.info.width,
                height: self.info.height,
                data,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(PlaybackError::Read(e)),
        }
    }

    fn rewind(&mut self) -> Result<(), PlaybackError> {
        self.release();
        self.spawn()
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_rejects_degenerate_values() {
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0"), None);
        assert_eq!(parse_frame_rate("-24"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_stream_info_picks_video_stream() {
        let json = serde_json::json!({
            "streams": [
                { "codec_type": "audio", "r_frame_rate": "0/0" },
                {
                    "codec_type": "video",
                    "width": 1280,
                    "height": 720,
                    "avg_frame_rate": "0/0",
                    "r_frame_rate": "60/1"
                }
            ]
        });

        let info = parse_stream_info(&json).unwrap();
        assert_eq!(info, StreamInfo { fps: 60.0, width: 1280, height: 720 });
    }

    #[test]
    fn test_parse_stream_info_without_rate_uses_fallback() {
        let json = serde_json::json!({
            "streams": [{ "codec_type": "video", "width": 640, "height": 480 }]
        });
        assert_eq!(parse_stream_info(&json).unwrap().fps, FALLBACK_FPS);
    }

    #[test]
    fn test_parse_stream_info_without_video() {
        let json = serde_json::json!({ "streams": [{ "codec_type": "audio" }] });
        assert!(parse_stream_info(&json).is_none());
        assert!(parse_stream_info(&serde_json::json!({})).is_none());
    }

    #[test]
    fn test_parse_stream_info_rejects_oversized_dimensions() {
        let json = serde_json::json!({
            "streams": [{ "codec_type": "video", "width": 1u64 << 33, "height": 720 }]
        });
        assert!(parse_stream_info(&json).is_none());
    }

    #[test]
    fn test_decoder_command_keeps_coded_orientation() {
        let info = StreamInfo { fps: 30.0, width: 2, height: 1 };
        let capture = FfmpegCapture {
            ffmpeg: PathBuf::from("ffmpeg"),
            path: PathBuf::from("/videos/output1.mp4"),
            info,
            process: None,
            stdout: None,
        };

        let cmd = capture.command();
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "-noautorotate");
        assert_eq!(args[1], "-i");
        assert_eq!(args[2], "/videos/output1.mp4");
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "bgr24"]));
    }

    #[cfg(unix)]
    mod stub_decoder {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::time::{Duration, Instant};

        const ETXTBSY: i32 = 26;

        /// Executable stand-in for ffmpeg that ignores its arguments.
        fn write_stub(dir: &Path, body: &str) -> PathBuf {
            let script = dir.join("ffmpeg");
            std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        // A freshly written script can be briefly busy while another test thread forks
        fn open_stub(script: &Path) -> FfmpegCapture {
            let info = StreamInfo { fps: 25.0, width: 2, height: 1 };
            for _ in 0..20 {
                match FfmpegCapture::open(script.to_path_buf(), PathBuf::from("input.mp4"), info) {
                    Ok(capture) => return capture,
                    Err(PlaybackError::Spawn { source, .. }) if source.raw_os_error() == Some(ETXTBSY) => {
                        std::thread::sleep(Duration::from_millis(50));
                    }
                    Err(e) => panic!("Failed to open stub decoder: {}", e),
                }
            }
            panic!("Stub decoder stayed busy");
        }

        #[test]
        fn test_reads_frames_until_end_then_rewinds() {
            let dir = tempfile::tempdir().unwrap();
            // Two 2x1 bgr24 frames
            let script = write_stub(dir.path(), r"printf '\001\002\003\004\005\006\007\010\011\012\013\014'");
            let mut capture = open_stub(&script);

            let first = capture.read_frame().unwrap().expect("first frame");
            assert_eq!((first.width, first.height), (2, 1));
            assert_eq!(first.data, vec![1, 2, 3, 4, 5, 6]);
            let second = capture.read_frame().unwrap().expect("second frame");
            assert_eq!(second.data, vec![7, 8, 9, 10, 11, 12]);
            assert!(capture.read_frame().unwrap().is_none());

            capture.rewind().unwrap();
            let again = capture.read_frame().unwrap().expect("frame after rewind");
            assert_eq!(again.data, vec![1, 2, 3, 4, 5, 6]);
        }

        #[test]
        fn test_partial_frame_is_end_of_stream() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_stub(dir.path(), r"printf '\001\002\003\004'");
            let mut capture = open_stub(&script);

            assert!(capture.read_frame().unwrap().is_none());
        }

        #[test]
        fn test_drop_kills_running_decoder() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_stub(dir.path(), "printf 'abcdef'\nexec sleep 30");
            let mut capture = open_stub(&script);
            assert!(capture.read_frame().unwrap().is_some());

            let started = Instant::now();
            drop(capture);
            assert!(started.elapsed() < Duration::from_secs(10));
        }
    }
}
