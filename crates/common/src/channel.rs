//! Async channel bridge between Tokio runtime and the USB worker thread
//!
//! The worker owns the device and the driver session; the runtime only
//! ever sees [`LinkEvent`]s and sends [`MonitorCommand`]s.

use async_channel::{Receiver, Sender, bounded};
use ipheth_protocol::{CarrierState, MacAddress, Pipes};
use tracing::debug;

/// Commands from Tokio runtime to the USB worker
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a carrier check now instead of waiting for the next tick
    CheckNow {
        /// Channel to send the outcome back
        response: tokio::sync::oneshot::Sender<Result<CarrierState, String>>,
    },

    /// Unbind the device and stop the worker
    Shutdown,
}

/// Link events from the USB worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The device was bound and its pipes resolved
    Bound {
        mac: MacAddress,
        pipes: Pipes,
    },

    /// Bind failed; the worker stops after sending this
    BindFailed {
        error: String,
    },

    /// A carrier check succeeded
    Carrier {
        state: CarrierState,
        /// Whether the state differs from the previous successful check
        changed: bool,
    },

    /// A carrier check failed; the link state is unknown
    CheckFailed {
        error: String,
        transient: bool,
    },

    /// The session was unbound
    Unbound,
}

/// Handle for Tokio runtime (async)
#[derive(Clone)]
pub struct MonitorBridge {
    cmd_tx: Sender<MonitorCommand>,
    event_rx: Receiver<LinkEvent>,
}

impl MonitorBridge {
    /// Send a command to the USB worker
    pub async fn send_command(&self, cmd: MonitorCommand) -> crate::Result<()> {
        self.cmd_tx.send(cmd).await.map_err(|e| {
            debug!("USB worker is gone, dropped {:?}", e.0);
            crate::Error::Channel(e.to_string())
        })
    }

    /// Receive an event from the USB worker
    pub async fn recv_event(&self) -> crate::Result<LinkEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Request an immediate carrier check and wait for its outcome
    pub async fn check_now(&self) -> crate::Result<Result<CarrierState, String>> {
        let (response, rx) = tokio::sync::oneshot::channel();
        self.send_command(MonitorCommand::CheckNow { response })
            .await?;
        rx.await.map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for the USB worker (blocking)
pub struct MonitorWorker {
    cmd_rx: Receiver<MonitorCommand>,
    event_tx: Sender<LinkEvent>,
}

impl MonitorWorker {
    /// Receive a command from Tokio runtime (blocking)
    pub fn recv_command(&self) -> crate::Result<MonitorCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<MonitorCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Whether every runtime-side handle has been dropped
    pub fn is_orphaned(&self) -> bool {
        self.cmd_rx.is_closed()
    }

    /// Send an event to Tokio runtime (blocking)
    pub fn send_event(&self, event: LinkEvent) -> crate::Result<()> {
        self.event_tx.send_blocking(event).map_err(|e| {
            debug!("Runtime is gone, dropped {:?}", e.0);
            crate::Error::Channel(e.to_string())
        })
    }
}

/// Create the channel bridge between Tokio and the USB worker
///
/// Returns (MonitorBridge for Tokio, MonitorWorker for the USB thread)
pub fn create_monitor_bridge() -> (MonitorBridge, MonitorWorker) {
    let (cmd_tx, cmd_rx) = bounded(16);
    let (event_tx, event_rx) = bounded(256);

    (
        MonitorBridge { cmd_tx, event_rx },
        MonitorWorker { cmd_rx, event_tx },
    )
}
