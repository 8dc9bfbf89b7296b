//! Coordinates the connection manager, transport writer and event log
//! behind the operations the presentation layer drives.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::domain::models::{
    AppEvent, ConnectError, ConnectionState, EventRecord, MessageSeverity, StatusMessage,
};
use crate::domain::profile::PlatformProfile;
use crate::infrastructure::bluetooth::events::EventLog;
use crate::infrastructure::bluetooth::manager::{ConnectionManager, StepTimeouts};
use crate::infrastructure::bluetooth::protocol::{self, ProtocolError};
use crate::infrastructure::bluetooth::stack::BleStack;
use crate::infrastructure::bluetooth::writer::{TransportWriter, WriteError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

pub struct BoosterService<S: BleStack> {
    manager: ConnectionManager<S>,
    writer: TransportWriter<S>,
    log: EventLog,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl<S: BleStack> BoosterService<S> {
    pub fn new(
        stack: Arc<S>,
        profile: PlatformProfile,
        timeouts: StepTimeouts,
        log_capacity: usize,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            manager: ConnectionManager::new(
                stack.clone(),
                profile,
                timeouts,
                event_tx.clone(),
            ),
            writer: TransportWriter::new(stack),
            log: EventLog::new(log_capacity),
            event_tx,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        self.manager.state()
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        let result = self.manager.connect().await;
        if let Err(err) = &result {
            let _ = self.event_tx.send(AppEvent::LogMessage(StatusMessage {
                message: err.to_string(),
                severity: MessageSeverity::Error,
            }));
        }
        result
    }

    pub async fn disconnect(&mut self) {
        self.manager.disconnect().await;
    }

    pub fn device_lost(&mut self, id: &str) {
        self.manager.device_lost(id);
    }

    /// Encodes and dispatches one command. The event log records the
    /// command only after the write went out; a failed send leaves the log
    /// untouched and never alters connection state.
    pub async fn send_command(&mut self, index: u8) -> Result<EventRecord, SendError> {
        let frame = protocol::encode(index)?;
        let handle = self
            .manager
            .current_characteristic()
            .ok_or(WriteError::NotConnected)?;
        self.writer.send(&handle, frame).await?;

        let record = self.log.record(index);
        info!(index, seq = record.seq, "command dispatched");
        let _ = self.event_tx.send(AppEvent::CommandSent(record));
        Ok(record)
    }
}
