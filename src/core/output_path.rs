use std::path::{Path, PathBuf};

pub const OUTPUT_FOLDER_NAME: &str = "output";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    /// Plain interpolated video
    Normal,
    /// Side-by-side comparison of source and interpolated video
    Montage,
}

impl ConversionMode {
    pub fn file_suffix(self) -> &'static str {
        match self {
            ConversionMode::Normal => "",
            ConversionMode::Montage => "_montage",
        }
    }

    pub fn output_file_name(self, n: u32) -> String {
        format!("output{}{}.mp4", n, self.file_suffix())
    }
}

/// `output` folder next to the input file. A bare file name resolves to the
/// current directory.
pub fn output_folder_for(input_file: &Path) -> PathBuf {
    let parent = match input_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    parent.join(OUTPUT_FOLDER_NAME)
}

/// Creates the output folder if needed and returns the first
/// `output<N>[suffix].mp4` in it that does not exist yet, counting from 1.
pub fn allocate_output_path(input_file: &Path, mode: ConversionMode) -> std::io::Result<PathBuf> {
    let folder = output_folder_for(input_file);
    std::fs::create_dir_all(&folder)?;

    let mut n = 1u32;
    loop {
        let candidate = folder.join(mode.output_file_name(n));
        if !candidate.exists() {
            log::debug!("Allocated output path {}", candidate.display());
            return Ok(candidate);
        }
        n += 1;
    }
}
