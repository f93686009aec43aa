//! Serial connection manager window: a port list and a connect toggle.
//!
//! The toggle never opens the device itself. It starts a
//! [`WorkerHandle`](crate::serial::WorkerHandle) and waits for the status the
//! worker reports back through a subscription.

use crate::config::LinkSettings;
use crate::serial::{
    self, PortOpener, PortStatus, SystemPorts, WorkerEvent, WorkerHandle, WorkerUpdate,
};
use iced::widget::{button, column, pick_list, row, text, text_input};
use iced::{event, window, Element, Event, Length, Size, Subscription, Task};
use std::sync::Arc;

pub const MIN_SIZE: Size = Size::new(400.0, 320.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    PortChanged(String),
    Toggled(bool),
    RefreshPorts,
    CharChanged(String),
    SendChar,
    Worker(WorkerUpdate),
    CloseRequested(window::Id),
}

pub struct SerialApp {
    settings: LinkSettings,
    opener: Arc<dyn PortOpener>,
    ports: Vec<String>,
    port_text: String,
    checked: bool,
    state: LinkState,
    worker: Option<WorkerHandle>,
    char_input: String,
    status: String,
}

impl SerialApp {
    /// Window backed by the operating system's serial ports.
    pub fn new(settings: LinkSettings) -> Self {
        let ports = match serial::list_ports() {
            Ok(ports) => ports,
            Err(err) => {
                tracing::warn!("{}", err);
                Vec::new()
            }
        };
        Self::with_ports(settings, Arc::new(SystemPorts), ports)
    }

    pub fn with_ports(
        settings: LinkSettings,
        opener: Arc<dyn PortOpener>,
        ports: Vec<String>,
    ) -> Self {
        let port_text = ports.first().cloned().unwrap_or_default();
        tracing::info!("Found {} serial port(s).", ports.len());
        Self {
            settings,
            opener,
            ports,
            port_text,
            checked: false,
            state: LinkState::Disconnected,
            worker: None,
            char_input: String::new(),
            status: String::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn selected_port(&self) -> &str {
        &self.port_text
    }

    /// The port list is locked from the moment a connection is requested.
    pub fn port_list_enabled(&self) -> bool {
        self.state == LinkState::Disconnected
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn worker(&self) -> Option<&WorkerHandle> {
        self.worker.as_ref()
    }

    pub fn button_label(&self) -> String {
        match self.state {
            LinkState::Connected => format!("Disconnect from port {}", self.port_text),
            LinkState::Disconnected | LinkState::Connecting => {
                format!("Connect to port {}", self.port_text)
            }
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PortChanged(port) => {
                if self.port_list_enabled() {
                    self.port_text = port;
                }
            }
            Message::Toggled(true) => self.connect(),
            Message::Toggled(false) => self.disconnect(),
            Message::RefreshPorts => {
                if self.state == LinkState::Disconnected {
                    match serial::list_ports() {
                        Ok(ports) => self.set_ports(ports),
                        Err(err) => self.status = err.to_string(),
                    }
                }
            }
            Message::CharChanged(input) => {
                // One character at a time; keep the last one typed.
                self.char_input = input.chars().last().map(String::from).unwrap_or_default();
            }
            Message::SendChar => self.send_char(),
            Message::Worker(update) => self.on_worker(update),
            Message::CloseRequested(id) => {
                self.exit_handler();
                return window::close(id);
            }
        }
        Task::none()
    }

    /// Replaces the port list, keeping the selection when it is still present.
    pub fn set_ports(&mut self, ports: Vec<String>) {
        if !ports.contains(&self.port_text) {
            self.port_text = ports.first().cloned().unwrap_or_default();
        }
        tracing::info!("Found {} serial port(s).", ports.len());
        self.ports = ports;
    }

    fn connect(&mut self) {
        if self.port_text.is_empty() {
            self.status = "No serial port selected.".into();
            self.checked = false;
            return;
        }

        let spawned = WorkerHandle::spawn(
            self.port_text.clone(),
            self.settings.clone(),
            self.opener.clone(),
        );
        match spawned {
            Ok(worker) => {
                // Replacing the handle kills any previous worker.
                self.worker = Some(worker);
                self.checked = true;
                self.state = LinkState::Connecting;
                self.status = format!("Connecting to {}...", self.port_text);
            }
            Err(err) => {
                tracing::error!("{}", err);
                self.status = err.to_string();
                self.checked = false;
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(worker) = &self.worker {
            worker.kill();
        }
        self.checked = false;
        self.state = LinkState::Disconnected;
        self.char_input.clear();
    }

    fn send_char(&mut self) {
        let Some(ch) = self.char_input.chars().next() else {
            return;
        };
        if self.state != LinkState::Connected {
            return;
        }
        if let Some(worker) = &self.worker {
            if let Err(err) = worker.send(ch) {
                tracing::warn!("{}", err);
                self.status = err.to_string();
            }
        }
        self.char_input.clear();
    }

    fn on_worker(&mut self, update: WorkerUpdate) {
        let current = self.worker.as_ref().map(WorkerHandle::id);
        if current != Some(update.id) {
            tracing::debug!(id = update.id, "Ignoring event from a stale worker.");
            return;
        }

        match update.event {
            WorkerEvent::Status { port, status } => self.check_serialport_status(port, status),
            WorkerEvent::Written { port, ch } => {
                self.status = format!("Written {ch} on port {port}.");
            }
            WorkerEvent::WriteFailed { port, ch } => {
                self.status = format!("Could not write {ch} on port {port}.");
            }
            WorkerEvent::Closed { port } => {
                self.connected_device(&port);
                self.worker = None;
            }
        }
    }

    fn check_serialport_status(&mut self, port: String, status: PortStatus) {
        tracing::debug!(code = status.code(), "Status from {}.", port);
        match status {
            PortStatus::Failed => {
                self.checked = false;
                self.state = LinkState::Disconnected;
                self.worker = None;
                self.status = format!("Error with port {port}.");
            }
            PortStatus::Opened => {
                // The user may have toggled off while the open was in flight.
                if !self.checked {
                    return;
                }
                self.state = LinkState::Connected;
                self.status = format!("Connected to {port}.");
                self.port_text = port;
            }
        }
    }

    fn connected_device(&mut self, port: &str) {
        tracing::info!("Port {} closed.", port);
        self.status = format!("Port {port} closed.");
    }

    /// Kills the running worker before the window goes away.
    pub fn exit_handler(&mut self) {
        if let Some(worker) = &self.worker {
            worker.kill();
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let port_list: Element<'_, Message> = if self.port_list_enabled() {
            pick_list(
                &self.ports[..],
                Some(&self.port_text).filter(|p| !p.is_empty()),
                Message::PortChanged,
            )
            .placeholder("No ports")
            .width(Length::Fill)
            .into()
        } else {
            text(&self.port_text).width(Length::Fill).into()
        };

        let toggle = button(text(self.button_label())).on_press(Message::Toggled(!self.checked));

        let refresh = if self.state == LinkState::Disconnected {
            button("Refresh").on_press(Message::RefreshPorts)
        } else {
            button("Refresh")
        };

        let mut send_input = text_input("char", &self.char_input).width(Length::Fixed(60.0));
        let mut send = button("Send");
        if self.state == LinkState::Connected {
            send_input = send_input
                .on_input(Message::CharChanged)
                .on_submit(Message::SendChar);
            send = send.on_press(Message::SendChar);
        }

        column![
            row![port_list, toggle, refresh].spacing(10),
            row![send_input, send].spacing(10),
            text(&self.status).size(14),
        ]
        .spacing(20)
        .padding(20)
        .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let close_requests = event::listen_with(|event, _status, id| match event {
            Event::Window(window::Event::CloseRequested) => Some(Message::CloseRequested(id)),
            _ => None,
        });
        match &self.worker {
            Some(worker) => Subscription::batch([
                close_requests,
                worker.subscription().map(Message::Worker),
            ]),
            None => close_requests,
        }
    }
}

impl Drop for SerialApp {
    fn drop(&mut self) {
        self.exit_handler();
    }
}
