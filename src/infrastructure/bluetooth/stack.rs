//! Abstraction over the host GATT stack.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("operation timed out")]
    Timeout,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Backend(String),
}

/// The four handshake primitives plus the write path, in the order the
/// connection manager drives them. Handles are opaque to the caller and
/// only valid for the episode they were obtained in.
#[async_trait]
pub trait BleStack: Send + Sync + 'static {
    type Device: Clone + Send + Sync;
    type Server: Send + Sync;
    type Service: Send + Sync;
    type Characteristic: Clone + Send + Sync;

    /// Stable identifier for a device, used to match disconnect notifications.
    fn device_id(&self, device: &Self::Device) -> String;

    /// Finds the first peripheral whose advertised name starts with `name_prefix`.
    async fn discover(
        &self,
        name_prefix: &str,
        timeout: Duration,
    ) -> Result<Self::Device, StackError>;

    async fn connect(
        &self,
        device: &Self::Device,
        timeout: Duration,
    ) -> Result<Self::Server, StackError>;

    async fn resolve_service(
        &self,
        server: &Self::Server,
        service: Uuid,
        timeout: Duration,
    ) -> Result<Self::Service, StackError>;

    async fn resolve_characteristic(
        &self,
        server: &Self::Server,
        service: &Self::Service,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, StackError>;

    /// Unacknowledged write; no confirmation frame is read back.
    async fn write_without_response(
        &self,
        characteristic: &Self::Characteristic,
        payload: &[u8],
    ) -> Result<(), StackError>;

    async fn teardown(&self, server: &Self::Server);
}
