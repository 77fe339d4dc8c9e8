//! Panel rendering: toolbar, file tree, editor tabs, chat, and dialogs.

use crate::state::AppState;
use agent_host::{ChatEntry, EntryRole};
use eframe::egui;
use services::project_tree::NodeId;
use services::ProjectTree;
use shared::project::file_name;
use shared::theme::Theme;
use std::path::PathBuf;

/// Deferred actions collected while the UI is borrowed.
#[derive(Default)]
struct TreeActions {
    open: Option<PathBuf>,
    toggle: Vec<PathBuf>,
}

pub fn render_toolbar(s: &mut AppState, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        if ui.button("Open Folder").clicked() {
            s.open_folder_dialog();
        }
        if ui.button("New File").clicked() {
            s.session.new_tab();
        }
        if ui.button("Save").on_hover_text("Ctrl+S").clicked() {
            s.save_current();
        }
        if ui.button("Close Tab").clicked() {
            s.session.close_current_tab();
        }
        ui.separator();
        ui.toggle_value(&mut s.show_file_panel, "Files");
        ui.toggle_value(&mut s.show_ai_panel, "AI");
        ui.separator();

        let scripts_label = if s.scripts_running > 0 {
            "Scripts (running)"
        } else {
            "Scripts"
        };
        if ui.button(scripts_label).clicked() {
            s.show_scripts = !s.show_scripts;
        }
        let pinned = s.session.context_files();
        let hover = if pinned.is_empty() {
            "No files pinned".to_string()
        } else {
            pinned.join("\n")
        };
        ui.label(s.session.context_label()).on_hover_text(hover);
        if ui.button("Clear Context").clicked() {
            s.session.clear_context();
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Settings").clicked() {
                s.open_settings();
            }
        });
    });
}

// ── File tree ────────────────────────────────────────────────────────

pub fn render_file_panel(s: &mut AppState, ui: &mut egui::Ui) {
    let Some(tree) = s.session.tree() else {
        ui.label(egui::RichText::new("No folder open").weak());
        return;
    };
    ui.label(egui::RichText::new(file_name(tree.root())).strong());
    ui.separator();

    let mut actions = TreeActions::default();
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for &id in tree.top_level() {
                tree_row(ui, tree, id, s.session.context(), &mut actions);
            }
        });

    for path in actions.toggle {
        s.session.toggle_context(&path);
    }
    if let Some(path) = actions.open {
        s.open_file(&path);
    }
}

fn tree_row(
    ui: &mut egui::Ui,
    tree: &ProjectTree,
    id: NodeId,
    context: &agent_host::ContextSet,
    actions: &mut TreeActions,
) {
    let node = tree.node(id);
    let file = &node.file;
    if file.is_dir {
        egui::CollapsingHeader::new(format!("\u{1F4C1} {}", file.name))
            .id_source(&file.path)
            .default_open(false)
            .show(ui, |ui| {
                for &child in &node.children {
                    tree_row(ui, tree, child, context, actions);
                }
            });
        return;
    }

    ui.horizontal(|ui| {
        let mut pinned = context.contains(&file.path);
        if ui
            .checkbox(&mut pinned, "")
            .on_hover_text("Include in AI context")
            .changed()
        {
            actions.toggle.push(file.path.clone());
        }
        let row = ui.selectable_label(false, &file.name);
        if row.double_clicked() || row.clicked() {
            actions.open = Some(file.path.clone());
        }
    });
}

// ── Editor ───────────────────────────────────────────────────────────

pub fn render_editor(s: &mut AppState, ui: &mut egui::Ui) {
    ui.horizontal_wrapped(|ui| {
        let current = s.session.current_tab_index();
        let mut switch_to = None;
        for (i, tab) in s.session.tabs().iter().enumerate() {
            if ui.selectable_label(i == current, tab.display_name()).clicked() {
                switch_to = Some(i);
            }
        }
        if let Some(i) = switch_to {
            s.session.switch_to_tab(i);
        }
    });
    ui.separator();

    let font = s.style.editor_font();
    let wrap = s.session.config().wrap_text;
    let line_numbers = s.session.config().show_line_numbers;
    let text_color = ui.visuals().text_color();

    let mut layouter = |ui: &egui::Ui, text: &str, wrap_width: f32| {
        let width = if wrap { wrap_width } else { f32::INFINITY };
        let job =
            egui::text::LayoutJob::simple(text.to_owned(), font.clone(), text_color, width);
        ui.fonts(|f| f.layout_job(job))
    };

    let scroll = if wrap {
        egui::ScrollArea::vertical()
    } else {
        egui::ScrollArea::both()
    };
    let mut changed = false;
    scroll
        .id_source(("editor", s.session.current_tab_index()))
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.horizontal_top(|ui| {
                if line_numbers {
                    let count = s.session.current_tab().buffer.lines().count().max(1);
                    let numbers: String = (1..=count)
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>()
                        .join("\n");
                    ui.label(
                        egui::RichText::new(numbers)
                            .font(font.clone())
                            .color(ui.visuals().weak_text_color()),
                    );
                }
                let response = ui.add(
                    egui::TextEdit::multiline(s.session.current_buffer_mut())
                        .desired_width(f32::INFINITY)
                        .desired_rows(30)
                        .lock_focus(true)
                        .frame(false)
                        .layouter(&mut layouter),
                );
                changed = response.changed();
            });
        });
    if changed {
        s.session.mark_current_modified();
    }
}

// ── Chat ─────────────────────────────────────────────────────────────

fn entry_color(role: EntryRole, visuals: &egui::Visuals) -> egui::Color32 {
    match role {
        EntryRole::You => visuals.hyperlink_color,
        EntryRole::Ai => visuals.text_color(),
        EntryRole::Error => visuals.error_fg_color,
        EntryRole::System => visuals.weak_text_color(),
    }
}

fn render_entry(ui: &mut egui::Ui, entry: &ChatEntry) {
    let color = entry_color(entry.role, ui.visuals());
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(entry.role.label()).strong().color(color));
        ui.label(egui::RichText::new(&entry.timestamp).small().weak());
    });
    ui.add(egui::Label::new(egui::RichText::new(&entry.content).color(color)).selectable(true));
    ui.add_space(6.0);
}

pub fn render_chat_panel(s: &mut AppState, ui: &mut egui::Ui) {
    ui.heading("AI Assistant");
    ui.separator();

    let input_height = 90.0;
    let log_height = (ui.available_height() - input_height).max(80.0);
    egui::ScrollArea::vertical()
        .max_height(log_height)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in s.session.history() {
                render_entry(ui, entry);
            }
            if s.session.in_flight() > 0 {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(egui::RichText::new("Thinking...").weak());
                });
            }
        });

    ui.separator();
    let input = ui.add(
        egui::TextEdit::singleline(&mut s.chat_input)
            .hint_text("Ask about your files. Use @name to include one.")
            .desired_width(f32::INFINITY),
    );
    let enter = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
    if ui.button("Send").clicked() || enter {
        s.send_chat();
        input.request_focus();
    }
}

// ── Dialogs ──────────────────────────────────────────────────────────

pub fn render_scripts_window(s: &mut AppState, ctx: &egui::Context) {
    if !s.show_scripts {
        return;
    }
    let mut open = true;
    let mut run = None;
    egui::Window::new("Scripts")
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .show(ctx, |ui| {
            if s.session.root().is_none() {
                ui.label("No folder open");
                return;
            }
            let scripts = s.scripts();
            if scripts.is_empty() {
                ui.label("No scripts found. Add .py files to a 'scripts' folder in your project.");
            }
            for script in scripts {
                if ui.button(file_name(&script)).clicked() {
                    run = Some(script);
                }
            }
        });
    if !open {
        s.show_scripts = false;
    }
    if let Some(script) = run {
        s.run_script(&script);
    }
}

pub fn render_script_output(s: &mut AppState, ctx: &egui::Context) {
    let Some(report) = &s.script_report else {
        return;
    };
    let mut open = true;
    let mut close = false;
    let mut text = report.output.render();
    egui::Window::new(report.title())
        .id(egui::Id::new("script_output"))
        .default_size([560.0, 360.0])
        .open(&mut open)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .max_height(320.0)
                .show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut text)
                            .font(egui::TextStyle::Monospace)
                            .desired_width(f32::INFINITY)
                            .interactive(false),
                    );
                });
            if ui.button("Close").clicked() {
                close = true;
            }
        });
    if !open || close {
        s.script_report = None;
    }
}

pub fn render_settings_window(s: &mut AppState, ctx: &egui::Context) {
    let Some(draft) = s.settings_draft.as_mut() else {
        return;
    };
    let mut open = true;
    let mut save = false;
    let mut cancel = false;
    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(true)
        .default_width(480.0)
        .open(&mut open)
        .show(ctx, |ui| {
            egui::Grid::new("settings_grid")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label("llama.cpp URL:");
                    ui.text_edit_singleline(&mut draft.llama_cpp_url);
                    ui.end_row();

                    ui.label("Temperature:");
                    ui.add(egui::Slider::new(&mut draft.temperature, 0.0..=2.0).step_by(0.1));
                    ui.end_row();

                    ui.label("Max tokens:");
                    ui.add(egui::DragValue::new(&mut draft.max_tokens).clamp_range(-1..=32768));
                    ui.end_row();

                    ui.label("Context budget:");
                    ui.add(
                        egui::DragValue::new(&mut draft.context_max_tokens)
                            .clamp_range(0..=1_000_000)
                            .suffix(" tokens"),
                    );
                    ui.end_row();

                    ui.label("Editor font:");
                    ui.add(egui::TextEdit::singleline(&mut draft.editor_font).hint_text("e.g. Monospace 11"));
                    ui.end_row();

                    ui.label("Theme:");
                    let selected = Theme::from_key_or_default(&draft.theme);
                    egui::ComboBox::from_id_source("theme_combo")
                        .selected_text(selected.label())
                        .show_ui(ui, |ui| {
                            for theme in Theme::ALL {
                                if ui.selectable_label(theme == selected, theme.label()).clicked() {
                                    draft.theme = theme.key().to_string();
                                }
                            }
                        });
                    ui.end_row();

                    ui.label("Script interpreter:");
                    ui.text_edit_singleline(&mut draft.script_interpreter);
                    ui.end_row();
                });

            ui.checkbox(&mut draft.show_line_numbers, "Show Line Numbers");
            ui.checkbox(&mut draft.wrap_text, "Wrap Text");

            ui.add_space(8.0);
            ui.label("System Prompt:");
            egui::ScrollArea::vertical().max_height(150.0).show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut draft.system_prompt)
                        .desired_width(f32::INFINITY)
                        .desired_rows(6),
                );
            });

            ui.add_space(8.0);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Save").clicked() {
                    save = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

    if save {
        s.commit_settings();
    } else if cancel || !open {
        s.settings_draft = None;
    }
}
