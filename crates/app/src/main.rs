use eframe::egui;
use parking_lot::Mutex;
use shared::ConfigStore;
use std::sync::Arc;
use std::time::Duration;

mod panels;
mod state;
mod style;

use state::AppState;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store = match ConfigStore::default_location() {
        Ok(store) => {
            tracing::info!(path = %store.path().display(), "using config");
            Some(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "no config location, settings will not persist");
            None
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("AI Writer")
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "AI Writer",
        options,
        Box::new(|_cc| {
            Box::new(WriterApp {
                state: Arc::new(Mutex::new(AppState::new(store))),
            })
        }),
    )
}

struct WriterApp {
    state: Arc<Mutex<AppState>>,
}

impl eframe::App for WriterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut s = self.state.lock();

        // Results from chat sends and script runs (non-blocking)
        if s.poll_background() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        let (theme, font) = {
            let config = s.session.config();
            (config.theme.clone(), config.editor_font.clone())
        };
        s.style.apply_theme(ctx, &theme);
        s.style.apply_font(&font);

        handle_shortcuts(&mut s, ctx);

        egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::same(6.0)),
            )
            .show(ctx, |ui| panels::render_toolbar(&mut s, ui));

        if s.show_file_panel {
            egui::SidePanel::left("files")
                .default_width(250.0)
                .min_width(160.0)
                .resizable(true)
                .show(ctx, |ui| panels::render_file_panel(&mut s, ui));
        }

        if s.show_ai_panel {
            egui::SidePanel::right("chat")
                .default_width(400.0)
                .min_width(260.0)
                .resizable(true)
                .show(ctx, |ui| panels::render_chat_panel(&mut s, ui));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).fill(ctx.style().visuals.extreme_bg_color))
            .show(ctx, |ui| panels::render_editor(&mut s, ui));

        panels::render_scripts_window(&mut s, ctx);
        panels::render_script_output(&mut s, ctx);
        panels::render_settings_window(&mut s, ctx);
    }
}

fn handle_shortcuts(s: &mut AppState, ctx: &egui::Context) {
    use egui::{Key, Modifiers};
    let (save, new, open, close) = ctx.input_mut(|i| {
        (
            i.consume_key(Modifiers::COMMAND, Key::S),
            i.consume_key(Modifiers::COMMAND, Key::N),
            i.consume_key(Modifiers::COMMAND, Key::O),
            i.consume_key(Modifiers::COMMAND, Key::W),
        )
    });
    if save {
        s.save_current();
    }
    if new {
        s.session.new_tab();
    }
    if open {
        s.open_folder_dialog();
    }
    if close {
        s.session.close_current_tab();
    }
}
