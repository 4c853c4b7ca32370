//! Carrier monitor worker thread
//!
//! The worker owns the framework host and the driver session. It binds the
//! session, optionally selects the tethering alternate setting, and then
//! polls the carrier on a fixed cadence until the runtime asks it to stop.
//! USB calls block, so the loop runs on a dedicated thread and talks to the
//! Tokio runtime over the monitor bridge.

use crate::config::MonitorSettings;
use ipheth_common::{LinkEvent, MonitorCommand, MonitorWorker};
use ipheth_driver::{DriverError, IphoneSession, UsbNetDriver, UsbNetHost};
use ipheth_protocol::CarrierState;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound on how long a command waits for the loop to notice it
const COMMAND_POLL: Duration = Duration::from_millis(20);

/// Outcome of the last carrier check, for change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckOutcome {
    Carrier(CarrierState),
    Failed,
}

/// Monitor worker thread state
pub struct MonitorWorkerThread<H> {
    host: H,
    session: IphoneSession,
    worker: MonitorWorker,
    interval: Duration,
    notify_only_changes: bool,
    reset_on_bind: bool,
    last_outcome: Option<CheckOutcome>,
    last_carrier: Option<CarrierState>,
}

impl<H: UsbNetHost> MonitorWorkerThread<H> {
    pub fn new(
        host: H,
        worker: MonitorWorker,
        settings: &MonitorSettings,
        reset_on_bind: bool,
    ) -> Self {
        Self {
            host,
            session: IphoneSession::new(),
            worker,
            interval: settings.interval(),
            notify_only_changes: settings.notify_only_changes,
            reset_on_bind,
            last_outcome: None,
            last_carrier: None,
        }
    }

    /// Run the monitor loop
    ///
    /// Returns the host once the session has been unbound, or the bind
    /// error if the device could not be bound.
    pub fn run(mut self) -> ipheth_common::Result<H> {
        info!("Monitor worker started");

        if let Err(e) = self.bind() {
            warn!("Bind failed: {}", e);
            self.emit(LinkEvent::BindFailed {
                error: e.to_string(),
            });
            return Err(e.into());
        }

        let mut next_check = Instant::now();

        loop {
            match self.worker.try_recv_command() {
                Some(MonitorCommand::Shutdown) => {
                    info!("Monitor worker shutting down");
                    break;
                }
                Some(MonitorCommand::CheckNow { response }) => {
                    let outcome = self.poll().map_err(|e| e.to_string());
                    let _ = response.send(outcome);
                    next_check = Instant::now() + self.interval;
                }
                None => {}
            }

            if self.worker.is_orphaned() {
                debug!("Runtime side of the monitor bridge is gone");
                break;
            }

            let now = Instant::now();
            if now >= next_check {
                let _ = self.poll();
                next_check = Instant::now() + self.interval;
            } else {
                std::thread::sleep((next_check - now).min(COMMAND_POLL));
            }
        }

        self.session.unbind(&mut self.host);
        self.emit(LinkEvent::Unbound);
        info!("Monitor worker stopped");
        Ok(self.host)
    }

    fn bind(&mut self) -> Result<(), DriverError> {
        self.session.bind(&mut self.host)?;

        if self.reset_on_bind
            && let Err(e) = self.session.reset(&mut self.host)
        {
            self.session.unbind(&mut self.host);
            return Err(e);
        }

        if let (Some(mac), Some(pipes)) = (self.session.mac_address(), self.session.pipes()) {
            self.emit(LinkEvent::Bound { mac, pipes });
        }
        Ok(())
    }

    /// Run one carrier check and report it
    fn poll(&mut self) -> Result<CarrierState, DriverError> {
        let result = self.session.check_connect(&mut self.host);

        let outcome = match &result {
            Ok(state) => CheckOutcome::Carrier(*state),
            Err(_) => CheckOutcome::Failed,
        };
        let repeated = self.last_outcome == Some(outcome);
        self.last_outcome = Some(outcome);

        if self.notify_only_changes && repeated {
            return result;
        }

        match &result {
            Ok(state) => {
                let changed = self.last_carrier != Some(*state);
                self.last_carrier = Some(*state);
                self.emit(LinkEvent::Carrier {
                    state: *state,
                    changed,
                });
            }
            Err(e) => {
                debug!("Carrier check failed: {}", e);
                self.emit(LinkEvent::CheckFailed {
                    error: e.to_string(),
                    transient: e.is_transient(),
                });
            }
        }

        result
    }

    fn emit(&self, event: LinkEvent) {
        // Only fails once the runtime side is gone; the loop notices that
        // through is_orphaned
        let _ = self.worker.send_event(event);
    }
}

/// Spawn the monitor worker on its own thread
pub fn spawn_monitor_worker<H>(
    host: H,
    worker: MonitorWorker,
    settings: &MonitorSettings,
    reset_on_bind: bool,
) -> std::io::Result<JoinHandle<ipheth_common::Result<H>>>
where
    H: UsbNetHost + Send + 'static,
{
    let worker_thread = MonitorWorkerThread::new(host, worker, settings, reset_on_bind);

    std::thread::Builder::new()
        .name("usb-monitor".to_string())
        .spawn(move || worker_thread.run())
}
