mod core;
mod gui;
mod video;

use eframe::egui;
use gui::VideoEnhancerApp;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([600.0, 500.0])
            .with_title("Video Enhancer - Convert and Play"),
        ..Default::default()
    };

    eframe::run_native(
        "Video Enhancer",
        options,
        Box::new(|cc| {
            match VideoEnhancerApp::new(cc) {
                Ok(app) => Ok(Box::new(app)),
                Err(e) => {
                    eprintln!("Failed to initialize app: {}", e);
                    std::process::exit(1);
                }
            }
        }),
    ).map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))?;

    Ok(())
}
