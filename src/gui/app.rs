use eframe::egui;
use crate::core::{AppConfig, ConversionMode};
use crate::gui::session::{ConversionStatus, Session, SessionError};
use crate::video::{FfmpegDecoder, InferenceTool};
use std::path::Path;
use std::time::Instant;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov"];

/// A conversion waiting for the "in progress" label to reach the screen.
#[derive(Debug, Clone, Copy)]
pub struct QueuedConversion {
    pub mode: ConversionMode,
    pub queued_at_frame: u64,
}

pub struct VideoEnhancerApp {
    pub config: AppConfig,
    pub session: Session,
    pub tool: InferenceTool,
    pub decoder: FfmpegDecoder,
    pub preview_texture: Option<egui::TextureHandle>,
    pub queued_conversion: Option<QueuedConversion>,
}

impl VideoEnhancerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> anyhow::Result<Self> {
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        let config = AppConfig::load()?;
        log::info!("Using interpolation script {}", config.inference_script_path().display());
        if !config.rife_directory.exists() {
            log::warn!("RIFE directory {} does not exist, conversions will fail", config.rife_directory.display());
        }

        Ok(Self::with_config(config))
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            session: Session::new(config.preview_size()),
            tool: InferenceTool::from_config(&config),
            decoder: FfmpegDecoder::from_config(&config),
            config,
            preview_texture: None,
            queued_conversion: None,
        }
    }

    fn select_input_file(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Select input video")
            .add_filter("Video Files", VIDEO_EXTENSIONS);
        if let Some(ref dir) = self.config.last_input_directory {
            if dir.is_dir() {
                dialog = dialog.set_directory(dir);
            }
        }

        if let Some(path) = dialog.pick_file() {
            self.remember_input_directory(&path);
            if self.session.select_input(path) {
                log::debug!("Convert actions enabled");
            }
        }
    }

    fn remember_input_directory(&mut self, path: &Path) {
        let Some(parent) = path.parent() else { return };
        if self.config.last_input_directory.as_deref() == Some(parent) {
            return;
        }
        self.config.last_input_directory = Some(parent.to_path_buf());
        if let Err(e) = self.config.save() {
            log::warn!("Failed to save config: {}", e);
        }
    }

    /// Shows "in progress" first; the blocking run happens once that frame is painted.
    pub fn request_conversion(&mut self, mode: ConversionMode, frame_nr: u64) {
        if !self.session.can_convert() {
            show_error(&SessionError::MissingInput);
            return;
        }
        self.session.status = ConversionStatus::InProgress;
        self.queued_conversion = Some(QueuedConversion { mode, queued_at_frame: frame_nr });
    }

    fn run_queued_conversion(&mut self, ctx: &egui::Context) {
        let Some(queued) = self.queued_conversion else { return };
        if ctx.frame_nr() < queued.queued_at_frame + 2 {
            ctx.request_repaint();
            return;
        }
        self.queued_conversion = None;

        self.preview_texture = None;
        let result = self.session.convert(queued.mode, &self.tool, &self.decoder, Instant::now());
        if let Err(e) = result {
            show_error(&e);
        }
    }

    fn advance_playback(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        match self.session.player.tick(now) {
            Ok(Some(frame)) => {
                let size = [frame.width() as usize, frame.height() as usize];
                let image = egui::ColorImage::from_rgb(size, frame.as_raw());
                match self.preview_texture {
                    Some(ref mut texture) => texture.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.preview_texture = Some(ctx.load_texture("preview_frame", image, egui::TextureOptions::LINEAR));
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("Preview stopped: {}", e);
            }
        }

        if let Some(wait) = self.session.player.time_until_next_frame(Instant::now()) {
            ctx.request_repaint_after(wait);
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        let frame_nr = ui.ctx().frame_nr();
        let busy = self.queued_conversion.is_some();

        ui.horizontal(|ui| {
            ui.label(self.session.input_label());
            if ui.add_enabled(!busy, egui::Button::new("Select input file")).clicked() {
                self.select_input_file();
            }
        });

        ui.horizontal(|ui| {
            ui.label(self.session.frames_label());
            if ui.add_enabled(!busy, egui::Button::new("Change frame multiplier")).clicked() {
                self.session.cycle_exponent();
            }
        });

        ui.horizontal(|ui| {
            let enabled = self.session.can_convert() && !busy;
            if ui.add_enabled(enabled, egui::Button::new("Convert")).clicked() {
                self.request_conversion(ConversionMode::Normal, frame_nr);
            }
            if ui.add_enabled(enabled, egui::Button::new("Compare")).clicked() {
                self.request_conversion(ConversionMode::Montage, frame_nr);
            }
        });

        let status = self.session.status;
        ui.label(egui::RichText::new(status.label()).color(status_color(status)));
    }

    fn show_preview(&self, ui: &mut egui::Ui) {
        let (width, height) = self.session.player.display_size();
        let size = egui::vec2(width as f32, height as f32);
        match self.preview_texture {
            Some(ref texture) => {
                ui.image((texture.id(), size));
            }
            None => {
                ui.allocate_space(size);
            }
        }
    }
}

fn status_color(status: ConversionStatus) -> egui::Color32 {
    match status {
        ConversionStatus::Waiting => egui::Color32::BLUE,
        ConversionStatus::InProgress | ConversionStatus::Failed => egui::Color32::RED,
        ConversionStatus::Done => egui::Color32::DARK_GREEN,
    }
}

fn show_error(error: &SessionError) {
    log::error!("{}", error);
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Error")
        .set_description(error.to_string())
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

impl eframe::App for VideoEnhancerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.run_queued_conversion(ctx);
        self.advance_playback(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(5.0);
                self.show_controls(ui);
                ui.add_space(10.0);
                self.show_preview(ui);
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.player.stop();
    }
}
