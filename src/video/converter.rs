use crate::core::{AppConfig, ConversionMode, FrameExponent};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Stderr lines kept in a failure message
const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to create output folder {path}: {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Interpolation tool exited with {status}: {stderr}")]
    ToolFailed { status: ExitStatus, stderr: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub exponent: FrameExponent,
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: ConversionMode,
}

impl ConversionRequest {
    /// Flags passed to the inference script, in order.
    pub fn script_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--exp={}", self.exponent.value()),
            format!("--video={}", self.input.display()),
            format!("--output={}", self.output.display()),
        ];
        if self.mode == ConversionMode::Montage {
            args.push("--montage".to_string());
        }
        args
    }
}

/// Runs one conversion to completion.
pub trait ToolRunner {
    fn run(&self, request: &ConversionRequest) -> Result<(), ConversionError>;
}

/// The RIFE `inference_video.py` script, run through a Python interpreter.
#[derive(Debug, Clone)]
pub struct InferenceTool {
    pub interpreter: String,
    pub script: PathBuf,
    pub working_directory: PathBuf,
}

impl InferenceTool {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            script: config.inference_script_path(),
            working_directory: config.rife_directory.clone(),
        }
    }

    pub fn command(&self, request: &ConversionRequest) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.script)
            .args(request.script_args())
            .current_dir(&self.working_directory);
        cmd
    }
}

impl ToolRunner for InferenceTool {
    fn run(&self, request: &ConversionRequest) -> Result<(), ConversionError> {
        log::info!("Running {} {} {:?}", self.interpreter, self.script.display(), request.script_args());

        let output = self.command(request)
            .output()
            .map_err(|source| ConversionError::Launch {
                program: self.interpreter.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            log::debug!("Tool stdout:\n{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            log::debug!("Tool stderr:\n{}", stderr.trim_end());
        }

        if !output.status.success() {
            return Err(ConversionError::ToolFailed {
                status: output.status,
                stderr: stderr_tail(&stderr),
            });
        }

        Ok(())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "no error output".to_string()
    } else {
        tail
    }
}
