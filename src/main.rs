//! Desktop window for the video download backend

// Thumbnail fetching module
mod thumbnail;

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

// clap for command-line configuration
use clap::Parser;
// eframe/egui for GUI application framework
use eframe::{egui, App, Frame};
use egui::{Color32, ColorImage, TextureOptions, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for choosing where the finished file goes
use rfd::FileDialog;
use tokio::runtime::Runtime;
use tracing::info;

use vidgrab::render::{DownloadView, InfoView, OptionView};
use vidgrab::{ClientController, Config, FormatKind, HttpBackend};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: initializes logging and runtime, then launches GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::parse();

    // Create a new Tokio runtime and store it globally
    let rt = Arc::new(Runtime::new()?);
    let handle = rt.handle().clone();
    RUNTIME
        .set(rt)
        .map_err(|_| "tokio runtime initialised twice")?;

    let backend = Arc::new(HttpBackend::from_config(&config)?);
    info!(backend = %backend.base_url(), "starting client");
    let controller = ClientController::new(backend, handle, config.poll_interval());
    controller.check_dependencies();

    eframe::run_native(
        "Video Downloader",
        eframe::NativeOptions::default(),
        Box::new(move |cc| {
            // Use dark theme visuals
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(MyApp::new(controller, config.download_dir))
        }),
    )?;
    Ok(())
}

/// Clicks gathered while painting, applied once the frame is laid out
enum UiAction {
    Fetch,
    Tab(FormatKind),
    Select(FormatKind, String),
    Save(String),
}

/// Application state for the GUI
struct MyApp {
    /// Page state and backend calls
    controller: ClientController,
    /// Folder the save dialog opens in
    download_dir: PathBuf,
    /// Cached textures for video thumbnails, keyed by URL
    thumbnails: HashMap<String, egui::TextureHandle>,
    /// Thumbnail URLs already requested
    requested: HashSet<String>,
    /// Incoming thumbnail fetch results (url, image)
    thumbnail_results: Arc<Mutex<Vec<(String, ColorImage)>>>,
}

impl MyApp {
    fn new(controller: ClientController, download_dir: PathBuf) -> Self {
        Self {
            controller,
            download_dir,
            thumbnails: HashMap::new(),
            requested: HashSet::new(),
            thumbnail_results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn thumbnail fetch in a blocking task
    fn request_thumbnail(&mut self, ctx: &egui::Context, url: &str) {
        if !self.requested.insert(url.to_string()) {
            return;
        }
        let Some(rt) = RUNTIME.get() else { return };
        let url = url.to_string();
        let results = Arc::clone(&self.thumbnail_results);
        let ctx = ctx.clone();
        rt.spawn_blocking(move || {
            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                if let Ok(mut pending) = results.lock() {
                    pending.push((url, img));
                }
                ctx.request_repaint();
            }
        });
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::Fetch => {
                self.controller.submit();
            }
            UiAction::Tab(kind) => self.controller.set_active_tab(kind),
            UiAction::Select(kind, format_id) => self.controller.select_format(kind, &format_id),
            UiAction::Save(job_id) => {
                let suggested = self
                    .controller
                    .state()
                    .job()
                    .and_then(|job| job.filename.clone())
                    .unwrap_or_else(|| "download".to_string());
                if let Some(path) = FileDialog::new()
                    .set_directory(&self.download_dir)
                    .set_file_name(&suggested)
                    .save_file()
                {
                    self.controller.save_file(&job_id, path);
                }
            }
        }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1️⃣ Apply finished backend calls
        self.controller.pump();

        // 2️⃣ Handle completed thumbnail fetches
        if let Ok(mut pending) = self.thumbnail_results.lock() {
            for (url, img) in pending.drain(..) {
                let tex = ctx.load_texture(&url, img, TextureOptions::default());
                self.thumbnails.insert(url, tex);
            }
        }

        let view = self.controller.view();
        if let Some(url) = view.info.as_ref().and_then(|i| i.thumbnail.clone()) {
            self.request_thumbnail(ctx, &url);
        }

        let mut actions = Vec::new();

        // 3️⃣ Top bar: dependency badges
        egui::TopBottomPanel::top("badges").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for badge in &view.badges {
                    let color = if badge.ok { Color32::LIGHT_GREEN } else { Color32::LIGHT_RED };
                    ui.colored_label(color, &badge.label);
                }
            });
        });

        // 4️⃣ Main panel: URL input, video info, formats, download progress
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Video Downloader");

            ui.label("Paste a video URL:");
            ui.horizontal(|ui| {
                let input = ui.add(
                    egui::TextEdit::singleline(&mut self.controller.state_mut().url_input)
                        .hint_text("https://"),
                );
                let entered = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Fetch").clicked() || entered {
                    actions.push(UiAction::Fetch);
                }
                if view.fetching {
                    ui.spinner();
                }
            });

            if let Some(err) = &view.error {
                ui.colored_label(Color32::LIGHT_RED, err);
            }

            if let Some(info) = &view.info {
                ui.separator();
                let tex = info.thumbnail.as_ref().and_then(|url| self.thumbnails.get(url));
                show_info(ui, info, tex, &mut actions);
            }

            if let Some(download) = &view.download {
                ui.separator();
                show_download(ui, download, &mut actions);
            }
        });

        for action in actions {
            self.apply(action);
        }

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn show_info(
    ui: &mut egui::Ui,
    info: &InfoView,
    thumbnail: Option<&egui::TextureHandle>,
    actions: &mut Vec<UiAction>,
) {
    ui.horizontal(|ui| {
        if let Some(tex) = thumbnail {
            ui.add(egui::Image::new(tex).max_width(200.0));
        }
        ui.vertical(|ui| {
            ui.strong(&info.title);
            ui.label(&info.uploader);
            ui.label(format!("{} · {}", info.platform, info.duration));
        });
    });

    ui.horizontal(|ui| {
        for (kind, label) in [(FormatKind::Audio, "Audio"), (FormatKind::Video, "Video")] {
            if ui.selectable_label(info.active_tab == kind, label).clicked() {
                actions.push(UiAction::Tab(kind));
            }
        }
    });

    let options = match info.active_tab {
        FormatKind::Audio => &info.audio,
        FormatKind::Video => &info.video,
    };
    egui::ScrollArea::vertical()
        .max_height(220.0)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for opt in options {
                show_option(ui, opt, actions);
            }
        });
}

fn show_option(ui: &mut egui::Ui, opt: &OptionView, actions: &mut Vec<UiAction>) {
    let text = format!("{}    {}", opt.quality, opt.size);
    if ui.selectable_label(opt.selected, text).clicked() {
        actions.push(UiAction::Select(opt.kind, opt.format_id.clone()));
    }
}

fn show_download(ui: &mut egui::Ui, download: &DownloadView, actions: &mut Vec<UiAction>) {
    ui.horizontal(|ui| {
        ui.label(&download.status);
        ui.label(&download.percent);
    });
    let mut bar = egui::ProgressBar::new(download.fill);
    if download.failed {
        bar = bar.fill(Color32::RED);
    }
    ui.add(bar);

    if let Some(file) = &download.file {
        ui.label(file);
    }
    if let Some(job_id) = &download.ready_job {
        if ui.button("Save file").clicked() {
            actions.push(UiAction::Save(job_id.clone()));
        }
    }
    if let Some(note) = &download.save_note {
        ui.label(note);
    }
}
