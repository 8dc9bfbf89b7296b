//! Fire-and-forget transport writes.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::infrastructure::bluetooth::manager::CharacteristicHandle;
use crate::infrastructure::bluetooth::protocol::WireFrame;
use crate::infrastructure::bluetooth::stack::{BleStack, StackError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("no active connection")]
    NotConnected,
    #[error("characteristic handle is stale")]
    StaleHandle,
    #[error("write failed: {0}")]
    WriteFailed(StackError),
}

pub struct TransportWriter<S: BleStack> {
    stack: Arc<S>,
}

impl<S: BleStack> TransportWriter<S> {
    pub fn new(stack: Arc<S>) -> Self {
        Self { stack }
    }

    /// Writes one frame without response. A handle invalidated by a
    /// concurrent disconnect fails as stale before any radio I/O. Write
    /// failures never touch connection state; peripheral loss is reported
    /// through the disconnect notification path instead.
    pub async fn send(
        &self,
        handle: &CharacteristicHandle<S>,
        frame: WireFrame,
    ) -> Result<(), WriteError> {
        if !handle.is_live() {
            return Err(WriteError::StaleHandle);
        }
        self.stack
            .write_without_response(handle.characteristic(), frame.as_ref())
            .await
            .map_err(WriteError::WriteFailed)?;
        debug!(frame = ?frame.as_bytes(), "frame written");
        Ok(())
    }
}
