use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_INTERPRETER: &str = "python";
const DEFAULT_RIFE_FOLDER: &str = "ECCV2022-RIFE";
const DEFAULT_INFERENCE_SCRIPT: &str = "inference_video.py";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Interpreter used to launch the inference script
    pub interpreter: String,
    /// Folder of the RIFE checkout; the script runs with this as its working directory
    pub rife_directory: PathBuf,
    pub inference_script: String,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub preview_width: u32,
    pub preview_height: u32,
    /// Where the file picker opens next time
    pub last_input_directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            rife_directory: Self::default_rife_directory(),
            inference_script: DEFAULT_INFERENCE_SCRIPT.to_string(),
            ffmpeg_path: None,
            ffprobe_path: None,
            preview_width: 400,
            preview_height: 300,
            last_input_directory: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Reads the config at `path`. A missing or unparsable file is replaced with defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::info!("No config file at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", path.display(), e))?;

        match serde_json::from_str::<Self>(&content) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                log::warn!("Config at {} is invalid ({}), replacing it with defaults", path.display(), e);
                let config = Self::default();
                config.save_to(path)
                    .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                log::info!("Recreated config file at {}", path.display());
                Ok(config)
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("video-enhancer")
            .join("config.json")
    }

    /// The RIFE checkout is expected next to the executable.
    fn default_rife_directory() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_RIFE_FOLDER)
    }

    pub fn inference_script_path(&self) -> PathBuf {
        self.rife_directory.join(&self.inference_script)
    }

    pub fn ffmpeg_program(&self) -> PathBuf {
        self.ffmpeg_path.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    pub fn ffprobe_program(&self) -> PathBuf {
        self.ffprobe_path.clone().unwrap_or_else(|| PathBuf::from("ffprobe"))
    }

    /// Falls back to the default size when either dimension is zero.
    pub fn preview_size(&self) -> (u32, u32) {
        if self.preview_width == 0 || self.preview_height == 0 {
            (400, 300)
        } else {
            (self.preview_width, self.preview_height)
        }
    }
}
