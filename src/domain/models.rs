use thiserror::Error;

/// Lifecycle of the single BLE connection episode.
///
/// There is exactly one instance, owned and mutated by the connection
/// manager; everyone else observes it through `AppEvent::ConnectionState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Discovering,
    Connecting,
    ResolvingService,
    ResolvingCharacteristic,
    Connected,
    Failed(ConnectError),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True while a connect attempt is between its first and last step.
    pub fn is_attempt_in_flight(&self) -> bool {
        matches!(
            self,
            ConnectionState::Discovering
                | ConnectionState::Connecting
                | ConnectionState::ResolvingService
                | ConnectionState::ResolvingCharacteristic
        )
    }
}

/// Why a connect attempt ended. Terminal for the attempt, never for the
/// process; the user can always connect again from the beginning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("no device advertising name prefix {0:?} was found")]
    DeviceNotFound(String),
    #[error("GATT connect failed: {0}")]
    GattConnectFailed(String),
    #[error("service {0} is not present on the device")]
    ServiceUnavailable(String),
    #[error("characteristic {0} is not present on the service")]
    CharacteristicUnavailable(String),
    #[error("already connected")]
    AlreadyConnected,
    #[error("a connection attempt is already in progress")]
    AttemptInProgress,
    #[error("invalid platform profile: {0}")]
    Profile(String),
}

/// One successfully dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub index: u8,
    pub seq: u64,
}

/// Events flowing from the Bluetooth worker to the UI thread.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ConnectionState(ConnectionState),
    CommandSent(EventRecord),
    LogMessage(StatusMessage),
}

/// Requests flowing from the UI thread to the Bluetooth worker.
#[derive(Debug, Clone, Copy)]
pub enum BluetoothCommand {
    Connect,
    Disconnect,
    Send(u8),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
