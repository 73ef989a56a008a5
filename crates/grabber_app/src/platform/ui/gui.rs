//! Windowed front-end built on eframe/egui.

use eframe::egui;
use grabber_core::{AppViewModel, Msg, Phase, SelectionView, FORMAT_GROUPS, QUALITY_LABELS};
use grabber_logging::grab_info;

use super::constants::{
    REPAINT_INTERVAL, SCAN_LIMIT_MAX, SELECTION_WINDOW_SIZE, WINDOW_SIZE, WINDOW_TITLE,
};
use super::log_pane::LogPane;
use crate::platform::app::AppController;

pub fn run(controller: AppController) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(WINDOW_SIZE),
        ..Default::default()
    };
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(|_cc| Box::new(GrabberApp::new(controller))),
    )
}

struct GrabberApp {
    controller: AppController,
    log: LogPane,
    /// Rename text boxes, indexed like the selection rows.
    rename_buffers: Vec<String>,
}

impl GrabberApp {
    fn new(controller: AppController) -> Self {
        Self {
            controller,
            log: LogPane::new(),
            rename_buffers: Vec::new(),
        }
    }

    fn sync_log(&mut self) {
        let delta = self.controller.log_since(self.log.last_serial());
        self.log.sync(delta);
    }

    fn form_panel(&self, ui: &mut egui::Ui, view: &AppViewModel) -> Vec<Msg> {
        let mut msgs = Vec::new();
        let editable = view.can_start;

        ui.add_enabled_ui(editable, |ui| {
            egui::Grid::new("job_form")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label("URL");
                    let mut url = view.url.clone();
                    if ui
                        .add(egui::TextEdit::singleline(&mut url).desired_width(f32::INFINITY))
                        .changed()
                    {
                        msgs.push(Msg::UrlChanged(url));
                    }
                    ui.end_row();

                    ui.label("Save to");
                    ui.horizontal(|ui| {
                        let mut dir = view.output_dir.clone();
                        if ui.text_edit_singleline(&mut dir).changed() {
                            msgs.push(Msg::OutputDirChanged(dir));
                        }
                        if ui.button("Browse…").clicked() {
                            if let Some(folder) = rfd::FileDialog::new()
                                .set_title("Select Output Folder")
                                .set_directory(&view.output_dir)
                                .pick_folder()
                            {
                                msgs.push(Msg::OutputDirChanged(folder.display().to_string()));
                            }
                        }
                    });
                    ui.end_row();

                    ui.label("Format");
                    ui.horizontal(|ui| {
                        let mut format = view.format.clone();
                        egui::ComboBox::from_id_source("format")
                            .selected_text(&format)
                            .show_ui(ui, |ui| {
                                for group in FORMAT_GROUPS {
                                    ui.label(egui::RichText::new(group.label()).weak());
                                    for choice in group.formats() {
                                        ui.selectable_value(
                                            &mut format,
                                            (*choice).to_string(),
                                            *choice,
                                        );
                                    }
                                }
                            });
                        if format != view.format {
                            msgs.push(Msg::FormatChanged(format));
                        }

                        ui.add_enabled_ui(view.quality_enabled, |ui| {
                            ui.label("Quality");
                            let mut quality = view.quality.clone();
                            egui::ComboBox::from_id_source("quality")
                                .selected_text(&quality)
                                .show_ui(ui, |ui| {
                                    for (label, _) in QUALITY_LABELS {
                                        ui.selectable_value(&mut quality, (*label).to_string(), *label);
                                    }
                                });
                            if quality != view.quality {
                                msgs.push(Msg::QualityChanged(quality));
                            }
                        });
                    });
                    ui.end_row();

                    ui.label("Playlist");
                    ui.horizontal(|ui| {
                        let mut playlist = view.playlist_mode;
                        if ui.checkbox(&mut playlist, "Download playlist").changed() {
                            msgs.push(Msg::PlaylistToggled(playlist));
                        }
                        ui.add_enabled_ui(view.playlist_mode, |ui| {
                            ui.label("Scan limit");
                            let mut limit = view.scan_limit;
                            if ui
                                .add(egui::DragValue::new(&mut limit).clamp_range(0..=SCAN_LIMIT_MAX))
                                .changed()
                            {
                                msgs.push(Msg::ScanLimitChanged(limit));
                            }
                            if view.scan_limit == 0 {
                                ui.weak("(all)");
                            }
                        });
                    });
                    ui.end_row();
                });
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(view.can_start, egui::Button::new("Download"))
                .clicked()
            {
                msgs.push(Msg::StartClicked);
            }
            if ui
                .add_enabled(view.can_stop, egui::Button::new("Stop"))
                .clicked()
            {
                msgs.push(Msg::StopClicked);
            }
            if ui.button("Clear log").clicked() {
                msgs.push(Msg::ClearLogClicked);
            }
            if ui.button("Quit").clicked() {
                msgs.push(Msg::QuitClicked);
            }
        });
        msgs
    }

    fn progress_panel(&self, ui: &mut egui::Ui, view: &AppViewModel) {
        let fraction = f32::from(view.percent) / 100.0;
        ui.add(egui::ProgressBar::new(fraction).show_percentage());
        if let Some(line) = &view.progress_line {
            ui.monospace(line.as_str());
        }
        if let Some(path) = &view.last_saved {
            ui.weak(format!("Saved: {path}"));
        }
        ui.label(&view.status);
    }

    fn log_panel(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in self.log.lines() {
                    ui.monospace(line);
                }
            });
    }

    fn selection_window(&mut self, ctx: &egui::Context, selection: &SelectionView) -> Vec<Msg> {
        let mut msgs = Vec::new();
        if self.rename_buffers.len() != selection.rows.len() {
            self.rename_buffers = selection.rows.iter().map(|row| row.title.clone()).collect();
        }

        egui::Window::new("Select tracks")
            .collapsible(false)
            .default_size(SELECTION_WINDOW_SIZE)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Select all").clicked() {
                        msgs.push(Msg::SelectAllClicked);
                    }
                    if ui.button("Deselect all").clicked() {
                        msgs.push(Msg::DeselectAllClicked);
                    }
                    ui.label(format!(
                        "{} of {} selected",
                        selection.included,
                        selection.rows.len()
                    ));
                });
                ui.separator();

                egui::ScrollArea::vertical()
                    .max_height(SELECTION_WINDOW_SIZE[1] - 80.0)
                    .show(ui, |ui| {
                        for (row, buffer) in selection.rows.iter().zip(self.rename_buffers.iter_mut()) {
                            ui.horizontal(|ui| {
                                let mut included = row.included;
                                if ui.checkbox(&mut included, format!("{:>3}.", row.index)).changed() {
                                    msgs.push(Msg::TrackToggled { index: row.index });
                                }
                                let response = ui.add(
                                    egui::TextEdit::singleline(buffer).desired_width(f32::INFINITY),
                                );
                                if response.lost_focus() && *buffer != row.title {
                                    msgs.push(Msg::TrackRenamed {
                                        index: row.index,
                                        title: buffer.clone(),
                                    });
                                }
                            });
                        }
                    });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Download selected").clicked() {
                        msgs.extend(pending_renames(selection, &self.rename_buffers));
                        msgs.push(Msg::SelectionConfirmed);
                    }
                    if ui.button("Cancel").clicked() {
                        msgs.push(Msg::SelectionCancelled);
                    }
                });
            });
        msgs
    }
}

/// Renames typed into a box that still has focus when confirming.
fn pending_renames(selection: &SelectionView, buffers: &[String]) -> Vec<Msg> {
    selection
        .rows
        .iter()
        .zip(buffers)
        .filter(|(row, buffer)| **buffer != row.title)
        .map(|(row, buffer)| Msg::TrackRenamed {
            index: row.index,
            title: buffer.clone(),
        })
        .collect()
}

impl eframe::App for GrabberApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.pump();
        self.sync_log();

        let view = self.controller.view();
        let mut msgs = Vec::new();

        egui::TopBottomPanel::top("form").show(ctx, |ui| {
            ui.add_space(6.0);
            msgs.extend(self.form_panel(ui, &view));
            ui.add_space(6.0);
        });
        egui::TopBottomPanel::bottom("progress").show(ctx, |ui| {
            ui.add_space(4.0);
            self.progress_panel(ui, &view);
            ui.add_space(4.0);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.log_panel(ui);
        });

        match (&view.selection, view.phase) {
            (Some(selection), Phase::Selecting) => {
                msgs.extend(self.selection_window(ctx, selection));
            }
            _ => self.rename_buffers.clear(),
        }

        for msg in msgs {
            self.controller.dispatch(msg);
        }

        let close_requested = ctx.input(|i| i.viewport().close_requested());
        if close_requested || self.controller.quit_requested() {
            grab_info!("closing window");
            self.controller.shutdown();
            if !close_requested {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }

        if self.controller.consume_dirty() {
            ctx.request_repaint();
        }
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
