//! Learner Desktop — egui app state and UI.
//!
//! All chat state lives in a [`LearnerSession`]; each frame renders its view snapshot. The
//! completion call runs on a worker thread and the reply is polled here, so the chat stays
//! drawable (with a spinner) but only one turn can be in flight.

use eframe::egui;
use learner_lib::config::{self, Config};
use learner_lib::conversation::Role;
use learner_lib::document::{self, Attachment};
use learner_lib::llm::OpenRouterClient;
use learner_lib::session::{LearnerSession, PendingTurn, SessionView};
use learner_lib::shortcuts;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};

const CHAT_INPUT_HEIGHT: f32 = 100.0;
const LOG_BUFFER_MAX_LINES: usize = 2000;

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );
        push_log_line(line);
    }

    fn flush(&self) {}
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Logs,
}

pub struct LearnerApp {
    /// Conversation, pending input, attachment and API key for this window.
    session: LearnerSession,
    /// Completion endpoint built from config.
    client: OpenRouterClient,
    /// When Some, a turn is in flight; the worker sends the reply text here.
    reply_receiver: Option<mpsc::Receiver<String>>,
    /// Path typed into the attach field.
    attach_path: String,
    /// Last attach failure (bad extension, unreadable file).
    attach_error: Option<String>,
    /// Masked API key field.
    key_input: String,
    /// Shown after the key field changes.
    key_notice: Option<String>,
    /// Config load failure; defaults are in use when set.
    config_error: Option<String>,
    current_screen: Screen,
}

impl LearnerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        log::info!("desktop started");

        let (config, config_error) = match config::load_config(None) {
            Ok((config, _)) => (config, None),
            Err(e) => {
                log::error!("failed to load config: {:#}", e);
                (Config::default(), Some(format!("failed to load config: {:#}", e)))
            }
        };
        let session = LearnerSession::from_config(&config);
        let key_input = session.credential().expose().to_string();
        Self {
            session,
            client: OpenRouterClient::from_config(&config.gateway),
            reply_receiver: None,
            attach_path: String::new(),
            attach_error: None,
            key_input,
            key_notice: None,
            config_error,
            current_screen: Screen::default(),
        }
    }

    /// Record the user turn and start the completion call on a worker thread.
    fn start_chat_turn(&mut self, ctx: &egui::Context) {
        if self.reply_receiver.is_some() {
            return;
        }
        let Some(turn) = self.session.begin_submit() else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let reply = run_turn(&client, turn);
            let _ = tx.send(reply);
            ctx.request_repaint();
        });
        self.reply_receiver = Some(rx);
    }

    /// Poll for the reply of the in-flight turn. Call each frame.
    fn poll_chat_turn(&mut self) {
        let result = match &self.reply_receiver {
            Some(rx) => rx.try_recv(),
            None => return,
        };
        match result {
            Ok(reply) => {
                self.session.finish_submit(reply);
                self.reply_receiver = None;
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.session
                    .finish_submit("Error: the request worker stopped before replying.");
                self.reply_receiver = None;
            }
        }
    }

    fn attach_from_path(&mut self, path: &Path) {
        match Attachment::from_path(path) {
            Ok(a) => {
                self.session.attach(a);
                self.attach_error = None;
            }
            Err(e) => self.attach_error = Some(format!("cannot attach {}: {}", path.display(), e)),
        }
    }

    /// Files dropped onto the window are attached like the attach field.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if self.session.is_busy() {
            self.attach_error = Some(format!("cannot attach {} while waiting for a reply", file.name));
            return;
        }
        if let Some(path) = file.path {
            self.attach_from_path(&path);
        } else if let Some(bytes) = file.bytes {
            match document::media_type_for_path(Path::new(&file.name)) {
                Some(media_type) => {
                    self.session
                        .attach(Attachment::new(file.name, media_type, bytes.to_vec()));
                    self.attach_error = None;
                }
                None => {
                    self.attach_error =
                        Some(format!("cannot attach {}: only .txt, .pdf and .docx", file.name))
                }
            }
        }
    }

    fn ui_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("🎓 Learning Tools");
        ui.add_space(8.0);
        let busy = self.session.is_busy();
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.add_enabled_ui(!busy, |ui| {
                for group in &shortcuts::GROUPS {
                    egui::CollapsingHeader::new(group.title)
                        .default_open(true)
                        .show(ui, |ui| {
                            for s in group.shortcuts {
                                let button = ui
                                    .add_sized(
                                        [ui.available_width(), ui.spacing().interact_size.y],
                                        egui::Button::new(s.label),
                                    )
                                    .on_hover_text(format!("{}: {}", group.title, s.label));
                                if button.clicked() {
                                    self.session.press_shortcut(s);
                                }
                            }
                        });
                }
            });
            ui.separator();
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.current_screen, Screen::Chat, "Chat");
                ui.selectable_value(&mut self.current_screen, Screen::Logs, "Logs");
            });
            if ui.add_enabled(!busy, egui::Button::new("New chat")).clicked() {
                self.session.clear_conversation();
            }
        });
    }

    /// Renders one turn: role-based fill, content, and the time it was recorded.
    fn render_turn(ui: &mut egui::Ui, role: Role, content: &str, timestamp: &str) {
        let is_user = role == Role::User;
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            ui.set_width(ui.available_width());
            if is_user {
                ui.label(egui::RichText::new(content).strong());
            } else {
                ui.label(content);
            }
            ui.label(egui::RichText::new(format!("🕒 {}", timestamp)).small().weak());
        });
    }

    fn ui_chat(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, view: &SessionView) {
        ui.vertical_centered(|ui| ui.heading("Welcome to Learner"));
        ui.add_space(12.0);

        let reserved = CHAT_INPUT_HEIGHT + 220.0;
        let messages_height = (ui.available_height() - reserved).max(80.0);
        egui::ScrollArea::vertical()
            .max_height(messages_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for t in &view.turns {
                    Self::render_turn(ui, t.role(), t.content(), t.timestamp());
                    ui.add_space(8.0);
                }
            });

        ui.add_space(8.0);
        ui.add_enabled_ui(!view.busy, |ui| {
            ui.add_sized(
                [ui.available_width(), CHAT_INPUT_HEIGHT],
                egui::TextEdit::multiline(self.session.input_mut())
                    .hint_text("What would you like to learn about today?"),
            );
        });
        ui.horizontal(|ui| {
            if ui.add_enabled(!view.busy, egui::Button::new("Send")).clicked() {
                self.start_chat_turn(ctx);
            }
            if ui.add_enabled(!view.busy, egui::Button::new("Clear")).clicked() {
                self.session.clear_input();
            }
            if view.busy {
                ui.spinner();
                ui.label("🤔 Analyzing...");
            }
        });

        ui.add_space(8.0);
        egui::CollapsingHeader::new("📎 Attach Syllabus")
            .default_open(false)
            .show(ui, |ui| {
                ui.add_enabled_ui(!view.busy, |ui| self.ui_attachment(ui, view));
            });

        ui.separator();
        egui::CollapsingHeader::new("Configuration")
            .default_open(false)
            .show(ui, |ui| self.ui_configuration(ui));
    }

    fn ui_attachment(&mut self, ui: &mut egui::Ui, view: &SessionView) {
        ui.horizontal(|ui| {
            ui.label("File (.txt, .pdf, .docx):");
            ui.text_edit_singleline(&mut self.attach_path);
            if ui.button("Attach").clicked() {
                let path = self.attach_path.trim().to_string();
                self.attach_from_path(Path::new(&path));
            }
        });
        ui.label(egui::RichText::new("Or drop a file onto the window.").weak());
        if let Some(ref err) = self.attach_error {
            ui.colored_label(ui.visuals().error_fg_color, err);
        }
        if let Some(ref a) = view.attachment {
            ui.add_space(4.0);
            ui.label(egui::RichText::new(format!("✅ File uploaded: {}", a.name)).strong());
            ui.label(format!("• Size: {} bytes", a.size));
            ui.label(format!("• Type: {}", a.media_type));
            if ui.button("Detach").clicked() {
                self.session.detach();
            }
        }
    }

    fn ui_configuration(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("OpenRouter API Key");
            let response = ui.add(egui::TextEdit::singleline(&mut self.key_input).password(true));
            if response.changed() {
                self.session.set_credential(self.key_input.clone());
                self.key_notice = Some("API key updated successfully!".to_string());
            }
        });
        if let Some(ref notice) = self.key_notice {
            ui.label(notice);
        }
        ui.label(
            egui::RichText::new(format!("Model: {}", self.client.model()))
                .small()
                .weak(),
        );
        if let Some(ref err) = self.config_error {
            ui.colored_label(ui.visuals().error_fg_color, err);
        }
    }

    fn ui_logs(&self, ui: &mut egui::Ui) {
        ui.heading("Logs");
        ui.add_space(8.0);
        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(egui::RichText::new(line).monospace());
                }
            });
    }
}

/// Run one completion on a private runtime. Blocks the calling (worker) thread.
fn run_turn(client: &OpenRouterClient, turn: PendingTurn) -> String {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt.block_on(turn.run(client)),
        Err(e) => {
            log::error!("failed to start runtime: {}", e);
            format!("Error: {}", e)
        }
    }
}

impl eframe::App for LearnerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_chat_turn();
        self.handle_dropped_files(ctx);

        egui::SidePanel::left("learning_tools")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| self.ui_sidebar(ui));

        let view = self.session.view();
        egui::CentralPanel::default().show(ctx, |ui| match self.current_screen {
            Screen::Chat => self.ui_chat(ui, ctx, &view),
            Screen::Logs => self.ui_logs(ui),
        });

        if view.busy {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
