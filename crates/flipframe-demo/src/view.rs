use flipframe_engine::core::{AppControl, FrameCtx};
use flipframe_ui::View;
use flipframe_ui::egui;

/// The demo's windows and their state.
pub struct DemoView {
    show_demo_window: bool,
    show_another_window: bool,
    value: f32,
    clear_color: [f32; 4],
    counter: u32,
    /// Whether the window still has its input context associated.
    ime_associated: bool,
}

impl DemoView {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self {
            show_demo_window: true,
            show_another_window: false,
            value: 0.0,
            clear_color,
            counter: 0,
            ime_associated: true,
        }
    }

    fn main_window(&mut self, egui: &egui::Context, frame: &mut FrameCtx<'_>) {
        egui::Window::new("Hello, world!").show(egui, |ui| {
            ui.label("This is some useful text.");
            ui.checkbox(&mut self.show_demo_window, "Demo Window");
            ui.checkbox(&mut self.show_another_window, "Another Window");

            if ui.button("Close Application").clicked() {
                frame.runtime.exit();
            }

            ui.add(egui::Slider::new(&mut self.value, 0.0..=1.0).text("float"));
            ui.horizontal(|ui| {
                ui.label("clear color");
                if ui.color_edit_button_rgba_unmultiplied(&mut self.clear_color).changed() {
                    frame.runtime.set_clear_color(self.clear_color);
                }
            });

            ui.horizontal(|ui| {
                if ui.button("Button").clicked() {
                    self.counter += 1;
                }
                ui.label(format!("counter = {}", self.counter));
            });

            ui.separator();
            self.ime_controls(ui, frame);
            ui.separator();

            ui.label(format!(
                "Application average {:.3} ms/frame ({:.1} FPS)",
                frame.time.average_dt * 1000.0,
                frame.time.fps()
            ));
        });
    }

    fn ime_controls(&mut self, ui: &mut egui::Ui, frame: &FrameCtx<'_>) {
        let ime = frame.ime();
        if !ime.available() {
            ui.label("IME: not available");
            return;
        }

        ui.label(if ime.is_enabled() { "IME: enabled" } else { "IME: disabled" });
        ui.horizontal(|ui| {
            if ui.button("Disable IME").clicked() && !ime.set_enabled(false) {
                log::warn!("failed to disable IME");
            }
            if ui.button("Enable IME").clicked() && !ime.set_enabled(true) {
                log::warn!("failed to enable IME");
            }
            if ui.button("Set IME EN").clicked() && !ime.force_non_converting() {
                log::warn!("failed to switch IME to non-converting mode");
            }
        });

        let label = if self.ime_associated { "Associate NULL" } else { "Associate Back" };
        if ui.button(label).clicked() {
            if ime.toggle_association() {
                self.ime_associated = !self.ime_associated;
            } else {
                log::warn!("IME association toggle failed");
            }
        }
    }

    fn another_window(&mut self, egui: &egui::Context) {
        let mut open = self.show_another_window;
        let mut close = false;
        egui::Window::new("Another Window").open(&mut open).show(egui, |ui| {
            ui.label("Hello from another window!");
            if ui.button("Close Me").clicked() {
                close = true;
            }
        });
        self.show_another_window = open && !close;
    }

    fn demo_window(&mut self, egui: &egui::Context) {
        egui::Window::new("Demo Window")
            .open(&mut self.show_demo_window)
            .vscroll(true)
            .show(egui, |ui| {
                ui.collapsing("Settings", |ui| egui.settings_ui(ui));
                ui.collapsing("Inspection", |ui| egui.inspection_ui(ui));
            });
    }
}

impl View for DemoView {
    fn ui(&mut self, egui: &egui::Context, frame: &mut FrameCtx<'_>) -> AppControl {
        self.main_window(egui, frame);
        if self.show_another_window {
            self.another_window(egui);
        }
        if self.show_demo_window {
            self.demo_window(egui);
        }
        AppControl::Continue
    }
}
