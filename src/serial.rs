//! Background worker owning a serial device.
//!
//! The blocking open runs on a dedicated thread. The worker reports a
//! [`PortStatus`] once, then serves [`WorkerCommand`]s until it is asked to
//! stop. Stopping is cooperative: [`WorkerHandle::kill`] raises a shared flag
//! and queues a `Close`; the worker checks the flag before closing the port.

use crate::config::LinkSettings;
use crate::error::{HandsOnError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use iced::advanced::subscription::{self, EventStream, Hasher, Recipe};
use iced::futures::stream::{self, BoxStream};
use iced::futures::StreamExt;
use iced::Subscription;
use std::hash::Hash;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// An open device. Dropping it closes the port.
pub type PortHandle = Box<dyn Write + Send>;

/// Opens serial devices by name.
pub trait PortOpener: Send + Sync + 'static {
    fn open(&self, port_name: &str, settings: &LinkSettings) -> Result<PortHandle>;
}

/// Devices exposed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    fn open(&self, port_name: &str, settings: &LinkSettings) -> Result<PortHandle> {
        let port = serialport::new(port_name, settings.baud_rate)
            .timeout(settings.timeout())
            .open()?;
        Ok(Box::new(port))
    }
}

/// Names of the serial ports currently present.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| HandsOnError::port_scan(e.to_string()))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Outcome of the open call, with the numeric codes surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    /// Error during opening.
    Failed = 0,
    Opened = 1,
}

impl PortStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Status { port: String, status: PortStatus },
    Written { port: String, ch: char },
    WriteFailed { port: String, ch: char },
    Closed { port: String },
}

/// Event tagged with the worker that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerUpdate {
    pub id: u64,
    pub event: WorkerEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    Send(char),
    Close,
}

struct SerialWorker {
    port_name: String,
    settings: LinkSettings,
    killed: Arc<AtomicBool>,
    commands: Receiver<WorkerCommand>,
    events: Sender<WorkerEvent>,
}

impl SerialWorker {
    fn run(self, opener: Arc<dyn PortOpener>) {
        let port = match opener.open(&self.port_name, &self.settings) {
            Ok(port) => port,
            Err(err) => {
                tracing::info!("Error with port {}: {}", self.port_name, err);
                self.emit(WorkerEvent::Status {
                    port: self.port_name.clone(),
                    status: PortStatus::Failed,
                });
                thread::sleep(self.settings.settle());
                return;
            }
        };

        tracing::info!(
            baud_rate = self.settings.baud_rate,
            "Port {} opened.",
            self.port_name
        );
        self.emit(WorkerEvent::Status {
            port: self.port_name.clone(),
            status: PortStatus::Opened,
        });
        thread::sleep(self.settings.settle());

        self.serve(port);
    }

    fn serve(&self, mut port: PortHandle) {
        // Ends on `Close` or when every handle is gone.
        for command in self.commands.iter() {
            match command {
                WorkerCommand::Send(ch) => self.send(&mut port, ch),
                WorkerCommand::Close => break,
            }
        }
        self.close(port);
    }

    fn send(&self, port: &mut PortHandle, ch: char) {
        let mut buf = [0u8; 4];
        let bytes = ch.encode_utf8(&mut buf).as_bytes();
        let written = port.write_all(bytes).and_then(|_| port.flush());
        let port_name = self.port_name.clone();
        match written {
            Ok(()) => {
                tracing::info!("Written {} on port {}.", ch, port_name);
                self.emit(WorkerEvent::Written { port: port_name, ch });
            }
            Err(err) => {
                tracing::info!("Could not write {} on port {}: {}", ch, port_name, err);
                self.emit(WorkerEvent::WriteFailed { port: port_name, ch });
            }
        }
    }

    fn close(&self, port: PortHandle) {
        if self.killed.load(Ordering::Acquire) {
            drop(port);
            thread::sleep(self.settings.settle());
            self.emit(WorkerEvent::Closed {
                port: self.port_name.clone(),
            });
        }
        tracing::info!("Killing the process");
    }

    fn emit(&self, event: WorkerEvent) {
        // The UI may already be gone on shutdown.
        if self.events.send(event).is_err() {
            tracing::debug!("No listener for worker events on {}.", self.port_name);
        }
    }
}

/// UI side of a running worker. Dropping it kills the worker.
#[derive(Debug)]
pub struct WorkerHandle {
    id: u64,
    port_name: String,
    killed: Arc<AtomicBool>,
    commands: Sender<WorkerCommand>,
    events: Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Starts a worker that opens `port_name` in the background.
    pub fn spawn(
        port_name: impl Into<String>,
        settings: LinkSettings,
        opener: Arc<dyn PortOpener>,
    ) -> Result<Self> {
        let port_name = port_name.into();
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let killed = Arc::new(AtomicBool::new(false));
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let worker = SerialWorker {
            port_name: port_name.clone(),
            settings,
            killed: killed.clone(),
            commands: command_rx,
            events: event_tx,
        };
        thread::Builder::new()
            .name(format!("serial-worker-{id}"))
            .spawn(move || worker.run(opener))
            .map_err(|e| HandsOnError::worker(e.to_string()))?;
        tracing::debug!(id, "Worker for {} started.", port_name);

        Ok(Self {
            id,
            port_name,
            killed,
            commands: command_tx,
            events: event_rx,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Queues a single character for the port. Refused once the worker has
    /// been killed.
    pub fn send(&self, ch: char) -> Result<()> {
        if self.is_killed() {
            return Err(HandsOnError::worker(format!(
                "worker for {} was killed",
                self.port_name
            )));
        }
        self.commands
            .send(WorkerCommand::Send(ch))
            .map_err(|_| {
                HandsOnError::worker(format!("worker for {} has stopped", self.port_name))
            })
    }

    /// Asks the worker to close the port. Safe to call more than once.
    pub fn kill(&self) {
        if self.killed.swap(true, Ordering::AcqRel) {
            return;
        }
        // An exited worker has nothing left to close.
        let _ = self.commands.send(WorkerCommand::Close);
    }

    /// Receiver of the raw worker events.
    pub fn events(&self) -> Receiver<WorkerEvent> {
        self.events.clone()
    }

    /// Worker events for the iced runtime, keyed by worker id.
    pub fn subscription(&self) -> Subscription<WorkerUpdate> {
        subscription::from_recipe(WorkerEvents {
            id: self.id,
            rx: self.events.clone(),
        })
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.kill();
    }
}

struct WorkerEvents {
    id: u64,
    rx: Receiver<WorkerEvent>,
}

impl Recipe for WorkerEvents {
    type Output = WorkerUpdate;

    fn hash(&self, state: &mut Hasher) {
        "serial_worker".hash(state);
        self.id.hash(state);
    }

    fn stream(self: Box<Self>, _input: EventStream) -> BoxStream<'static, Self::Output> {
        let id = self.id;
        stream::unfold(self.rx, move |rx| async move {
            // `recv` blocks, so it waits on the blocking pool.
            let (next, rx) = tokio::task::spawn_blocking(move || {
                let next = rx.recv();
                (next, rx)
            })
            .await
            .ok()?;
            next.ok().map(|event| (WorkerUpdate { id, event }, rx))
        })
        .boxed()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    /// Opener handing out in-memory ports that record what was written.
    #[derive(Default)]
    pub struct MemoryPorts {
        pub written: Arc<Mutex<Vec<u8>>>,
        pub fail_writes: bool,
    }

    struct MemoryPort {
        written: Arc<Mutex<Vec<u8>>>,
        fail_writes: bool,
    }

    impl Write for MemoryPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"));
            }
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl PortOpener for MemoryPorts {
        fn open(&self, _port_name: &str, _settings: &LinkSettings) -> Result<PortHandle> {
            Ok(Box::new(MemoryPort {
                written: self.written.clone(),
                fail_writes: self.fail_writes,
            }))
        }
    }

    /// Opener for which every device is missing.
    pub struct MissingPorts;

    impl PortOpener for MissingPorts {
        fn open(&self, port_name: &str, _settings: &LinkSettings) -> Result<PortHandle> {
            Err(HandsOnError::port_open(format!("{port_name}: no such device")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MemoryPorts, MissingPorts};
    use super::*;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    fn settings() -> LinkSettings {
        LinkSettings {
            settle_ms: 0,
            ..LinkSettings::default()
        }
    }

    fn next(events: &Receiver<WorkerEvent>) -> WorkerEvent {
        events.recv_timeout(WAIT).expect("worker event")
    }

    #[test]
    fn status_codes_match_the_ui_contract() {
        assert_eq!(PortStatus::Failed.code(), 0);
        assert_eq!(PortStatus::Opened.code(), 1);
    }

    #[test]
    fn failed_open_reports_status_zero() {
        let handle =
            WorkerHandle::spawn("/dev/ttyNONE", settings(), Arc::new(MissingPorts)).unwrap();
        let events = handle.events();
        assert_eq!(
            next(&events),
            WorkerEvent::Status {
                port: "/dev/ttyNONE".into(),
                status: PortStatus::Failed,
            }
        );
        // The worker exits, which disconnects the event channel.
        assert!(events.recv_timeout(WAIT).is_err());
        assert!(handle.send('a').is_err());
    }

    #[test]
    fn open_send_and_kill() {
        let opener = MemoryPorts::default();
        let written = opener.written.clone();
        let handle = WorkerHandle::spawn("/dev/ttyFAKE", settings(), Arc::new(opener)).unwrap();
        let events = handle.events();

        assert_eq!(
            next(&events),
            WorkerEvent::Status {
                port: "/dev/ttyFAKE".into(),
                status: PortStatus::Opened,
            }
        );

        handle.send('x').unwrap();
        handle.send('é').unwrap();
        assert_eq!(
            next(&events),
            WorkerEvent::Written {
                port: "/dev/ttyFAKE".into(),
                ch: 'x',
            }
        );
        assert_eq!(
            next(&events),
            WorkerEvent::Written {
                port: "/dev/ttyFAKE".into(),
                ch: 'é',
            }
        );
        assert_eq!(written.lock().unwrap().as_slice(), "xé".as_bytes());

        handle.kill();
        assert!(handle.is_killed());
        assert_eq!(
            next(&events),
            WorkerEvent::Closed {
                port: "/dev/ttyFAKE".into(),
            }
        );
        assert!(events.recv_timeout(WAIT).is_err());

        // Killing twice is harmless.
        handle.kill();
    }

    #[test]
    fn send_after_kill_is_refused() {
        let opener = MemoryPorts::default();
        let written = opener.written.clone();
        let handle = WorkerHandle::spawn("/dev/ttyFAKE", settings(), Arc::new(opener)).unwrap();
        let events = handle.events();
        next(&events);

        handle.kill();
        let err = handle.send('z').unwrap_err();
        assert_eq!(err.code(), "E005");

        assert!(matches!(next(&events), WorkerEvent::Closed { .. }));
        assert!(events.recv_timeout(WAIT).is_err());
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn write_failures_are_reported_not_fatal() {
        let opener = MemoryPorts {
            fail_writes: true,
            ..MemoryPorts::default()
        };
        let handle = WorkerHandle::spawn("/dev/ttyFAKE", settings(), Arc::new(opener)).unwrap();
        let events = handle.events();
        next(&events);

        handle.send('q').unwrap();
        assert_eq!(
            next(&events),
            WorkerEvent::WriteFailed {
                port: "/dev/ttyFAKE".into(),
                ch: 'q',
            }
        );

        handle.kill();
        assert!(matches!(next(&events), WorkerEvent::Closed { .. }));
    }

    #[test]
    fn dropping_the_handle_closes_the_port() {
        let opener = Arc::new(MemoryPorts::default());
        let handle = WorkerHandle::spawn("/dev/ttyFAKE", settings(), opener).unwrap();
        let events = handle.events();
        next(&events);

        drop(handle);
        assert!(matches!(next(&events), WorkerEvent::Closed { .. }));
    }

    #[test]
    fn workers_get_distinct_ids() {
        let opener: Arc<dyn PortOpener> = Arc::new(MemoryPorts::default());
        let a = WorkerHandle::spawn("/dev/ttyA", settings(), opener.clone()).unwrap();
        let b = WorkerHandle::spawn("/dev/ttyB", settings(), opener).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.port_name(), "/dev/ttyA");
    }
}
