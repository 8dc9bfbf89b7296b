use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::domain::catalog::{self, COMMANDS};
use crate::domain::models::{
    AppEvent, BluetoothCommand, ConnectionState, EventRecord, MessageSeverity, StatusMessage,
};
use crate::domain::profile::{GattId, Platform, PlatformProfile};
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::btle::BtleStack;
use crate::infrastructure::bluetooth::{BoosterService, StepTimeouts};

pub struct BoosterApp {
    // Bluetooth worker bridge
    bluetooth_tx: mpsc::UnboundedSender<BluetoothCommand>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // State mirrored from the worker
    connection_state: ConnectionState,
    status_message: Option<StatusMessage>,
    events: Vec<EventRecord>,

    platform: Platform,

    // Logging guard
    _logging_guard: Option<crate::infrastructure::logging::LoggingGuard>,
}

impl BoosterApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        crate::presentation::theme::apply(&cc.egui_ctx);

        let settings_service = SettingsService::new().expect("Failed to load settings");

        let logging_guard =
            crate::infrastructure::logging::init_logger(&settings_service.get().log_settings)
                .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
                .ok();

        tracing::info!("Starting BoosterGen Controller");

        let (platform, profile, timeouts, log_capacity) = {
            let s = settings_service.get();

            let platform = match s.platform.as_str() {
                "auto" => Platform::detect(),
                other => other.parse().unwrap_or_else(|e| {
                    warn!("{e}, falling back to detection");
                    Platform::detect()
                }),
            };

            let mut profile = PlatformProfile::select(platform);
            if let Some(prefix) = &s.name_prefix {
                profile.name_prefix = prefix.clone();
            }
            if let Some(id) = &s.service_id {
                profile.service = GattId::Hex(id.clone());
            }
            if let Some(id) = &s.characteristic_id {
                profile.characteristic = GattId::Hex(id.clone());
            }

            let timeouts = StepTimeouts::from_millis(
                s.discovery_timeout_ms,
                s.connect_timeout_ms,
                s.resolve_timeout_ms,
            );

            (platform, profile, timeouts, s.event_log_capacity)
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (bt_cmd_tx, mut bt_cmd_rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for Bluetooth");

            rt.block_on(async move {
                let stack = match BtleStack::new().await {
                    Ok(stack) => Arc::new(stack),
                    Err(e) => {
                        error!("Bluetooth unavailable: {e}");
                        let _ = event_tx.send(AppEvent::LogMessage(StatusMessage {
                            message: format!("Bluetooth unavailable: {e}"),
                            severity: MessageSeverity::Error,
                        }));
                        return;
                    }
                };

                let mut drops = match stack.disconnect_events().await {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!("Failed to subscribe to adapter events: {e}");
                        return;
                    }
                };

                let mut service = BoosterService::new(
                    stack.clone(),
                    profile,
                    timeouts,
                    log_capacity,
                    event_tx.clone(),
                );

                loop {
                    tokio::select! {
                        cmd = bt_cmd_rx.recv() => {
                            let Some(cmd) = cmd else { break };
                            match cmd {
                                BluetoothCommand::Connect => {
                                    if let Err(e) = service.connect().await {
                                        error!("Connection failed: {e}");
                                    }
                                }
                                BluetoothCommand::Disconnect => service.disconnect().await,
                                BluetoothCommand::Send(index) => {
                                    if let Err(e) = service.send_command(index).await {
                                        warn!("Send failed: {e}");
                                        let _ = event_tx.send(AppEvent::LogMessage(StatusMessage {
                                            message: format!("Send failed: {e}"),
                                            severity: MessageSeverity::Error,
                                        }));
                                    }
                                }
                            }
                        }
                        dropped = drops.next() => {
                            match dropped {
                                Some(id) => service.device_lost(&id),
                                None => break,
                            }
                        }
                    }
                }
            });
        });

        Self {
            bluetooth_tx: bt_cmd_tx,
            event_rx,
            connection_state: ConnectionState::Disconnected,
            status_message: None,
            events: Vec::new(),
            platform,
            _logging_guard: logging_guard,
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                AppEvent::ConnectionState(state) => {
                    if state == ConnectionState::Connected {
                        self.status_message = Some(StatusMessage {
                            message: "Kit connected".to_string(),
                            severity: MessageSeverity::Success,
                        });
                    }
                    self.connection_state = state;
                }
                AppEvent::CommandSent(record) => self.events.insert(0, record),
                AppEvent::LogMessage(msg) => self.status_message = Some(msg),
            }
        }
    }

    fn connection_panel(&mut self, ui: &mut egui::Ui) {
        let (status_text, bg_color, text_color) = match &self.connection_state {
            ConnectionState::Connected => (
                "KIT CONNECTED",
                egui::Color32::from_rgb(0, 180, 80),
                egui::Color32::WHITE,
            ),
            ConnectionState::Disconnected => (
                "KIT DISCONNECTED",
                egui::Color32::from_gray(110),
                egui::Color32::WHITE,
            ),
            ConnectionState::Failed(_) => (
                "CONNECTION FAILED",
                egui::Color32::from_rgb(220, 60, 60),
                egui::Color32::WHITE,
            ),
            _ => (
                "CONNECTING...",
                egui::Color32::from_rgb(255, 200, 0),
                egui::Color32::BLACK,
            ),
        };

        ui.add_sized(
            [ui.available_width(), 34.0],
            egui::Label::new(
                egui::RichText::new(status_text)
                    .color(text_color)
                    .background_color(bg_color)
                    .size(16.0)
                    .strong(),
            )
            .wrap_mode(egui::TextWrapMode::Extend),
        );

        ui.add_space(8.0);

        if self.connection_state.is_connected() {
            if ui.button("Disconnect").clicked() {
                let _ = self.bluetooth_tx.send(BluetoothCommand::Disconnect);
            }
        } else {
            let in_flight = self.connection_state.is_attempt_in_flight();
            if ui
                .add_enabled(!in_flight, egui::Button::new("Connect"))
                .clicked()
            {
                let _ = self.bluetooth_tx.send(BluetoothCommand::Connect);
            }
            if in_flight {
                ui.spinner();
            }
        }

        if let Some(msg) = &self.status_message {
            let color = match msg.severity {
                MessageSeverity::Info => egui::Color32::from_rgb(60, 60, 200),
                MessageSeverity::Success => egui::Color32::from_rgb(0, 150, 0),
                MessageSeverity::Warning => egui::Color32::from_rgb(200, 150, 0),
                MessageSeverity::Error => egui::Color32::RED,
            };
            ui.label(egui::RichText::new(&msg.message).color(color).strong());
        }
    }

    fn command_panel(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Programs").strong().size(18.0));
        for command in &COMMANDS {
            let fill = egui::Color32::from_rgb(command.color.0, command.color.1, command.color.2);
            let button = egui::Button::new(
                egui::RichText::new(command.label)
                    .color(egui::Color32::WHITE)
                    .strong(),
            )
            .fill(fill);
            if ui.add_sized([260.0, 36.0], button).clicked() {
                let _ = self
                    .bluetooth_tx
                    .send(BluetoothCommand::Send(command.index));
            }
        }
    }

    fn event_panel(&mut self, ui: &mut egui::Ui) {
        if self.events.is_empty() {
            return;
        }
        ui.label(egui::RichText::new("Events").strong().size(18.0));
        egui::ScrollArea::vertical()
            .id_salt("event_log")
            .max_height(180.0)
            .show(ui, |ui| {
                for record in &self.events {
                    let label = catalog::by_index(record.index)
                        .map(|c| c.label)
                        .unwrap_or("?");
                    ui.label(format!("#{} {}", record.seq + 1, label));
                }
            });
    }
}

impl eframe::App for BoosterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        ctx.request_repaint_after(Duration::from_millis(100));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(480.0);
                    ui.add_space(16.0);

                    ui.heading("Beyoung BoosterGen");
                    ui.label(format!("Device profile: {}", self.platform));
                    ui.add_space(8.0);

                    self.connection_panel(ui);
                    ui.add_space(12.0);

                    if self.connection_state.is_connected() {
                        self.command_panel(ui);
                        ui.add_space(12.0);
                        self.event_panel(ui);
                    }

                    ui.add_space(30.0);
                });
            });
        });
    }
}
