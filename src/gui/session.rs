use crate::core::{allocate_output_path, output_folder_for, ConversionMode, FrameExponent};
use crate::video::{ConversionError, ConversionRequest, PlaybackError, Player, ToolRunner, VideoDecoder};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Errors shown to the user as a dialog.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Select an input file first.")]
    MissingInput,

    #[error("Output video does not exist: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Could not open output video: {0}")]
    Playback(#[from] PlaybackError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    Waiting,
    InProgress,
    Done,
    Failed,
}

impl ConversionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConversionStatus::Waiting => "Status: waiting",
            ConversionStatus::InProgress => "Status: converting...",
            ConversionStatus::Done => "Status: done!",
            ConversionStatus::Failed => "Status: failed",
        }
    }
}

pub struct Session {
    pub input_file: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub exponent: FrameExponent,
    pub status: ConversionStatus,
    pub player: Player,
}

impl Session {
    pub fn new(display_size: (u32, u32)) -> Self {
        Self {
            input_file: None,
            output_folder: None,
            output_file: None,
            exponent: FrameExponent::default(),
            status: ConversionStatus::Waiting,
            player: Player::new(display_size),
        }
    }

    pub fn can_convert(&self) -> bool {
        self.input_file.is_some()
    }

    /// Records the chosen input. Returns true when this enabled the convert actions.
    pub fn select_input(&mut self, path: PathBuf) -> bool {
        let newly_enabled = !self.can_convert();
        log::info!("Selected input file {}", path.display());
        self.input_file = Some(path);
        newly_enabled
    }

    pub fn input_label(&self) -> String {
        let name = self.input_file
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "none".to_string());
        format!("Input file: {}", name)
    }

    pub fn frames_label(&self) -> String {
        format!("Frames: x{}", self.exponent.multiplier())
    }

    pub fn cycle_exponent(&mut self) {
        self.exponent.advance();
        log::debug!("Frame exponent set to {}", self.exponent.value());
    }

    /// Runs the external tool to completion, then plays its output.
    /// Blocks until the tool exits.
    pub fn convert(
        &mut self,
        mode: ConversionMode,
        runner: &dyn ToolRunner,
        decoder: &dyn VideoDecoder,
        now: Instant,
    ) -> Result<PathBuf, SessionError> {
        let input = self.input_file.clone().ok_or(SessionError::MissingInput)?;

        let folder = output_folder_for(&input);
        let output = match allocate_output_path(&input, mode) {
            Ok(output) => output,
            Err(source) => {
                self.status = ConversionStatus::Failed;
                return Err(ConversionError::OutputFolder { path: folder, source }.into());
            }
        };
        self.output_folder = Some(folder);
        self.output_file = Some(output.clone());

        let request = ConversionRequest {
            exponent: self.exponent,
            input,
            output: output.clone(),
            mode,
        };

        self.status = ConversionStatus::InProgress;
        if let Err(e) = runner.run(&request) {
            log::error!("Conversion of {} failed: {}", request.input.display(), e);
            self.status = ConversionStatus::Failed;
            return Err(e.into());
        }
        self.status = ConversionStatus::Done;
        log::info!("Conversion finished: {}", output.display());

        self.player.stop();
        self.start_playback(decoder, now)?;
        Ok(output)
    }

    /// Opens the current output file. A missing file leaves playback untouched.
    pub fn start_playback(&mut self, decoder: &dyn VideoDecoder, now: Instant) -> Result<(), SessionError> {
        let path = self.output_file.clone().ok_or_else(|| SessionError::MissingOutput(PathBuf::new()))?;
        if !path.exists() {
            return Err(SessionError::MissingOutput(path));
        }

        let source = decoder.open(&path)?;
        self.player.start(source, now);
        log::info!("Playing {}", path.display());
        Ok(())
    }
}
