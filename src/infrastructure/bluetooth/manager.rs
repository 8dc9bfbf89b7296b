//! Connection lifecycle state machine.
//!
//! The manager owns the device/server/characteristic handles for the
//! current connection episode and is the only writer of `ConnectionState`.
//! Readers see a `CharacteristicHandle` published while Connected; the
//! handle is invalidated the moment the episode ends, so a racing write
//! fails as stale instead of touching a dead link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::models::{AppEvent, ConnectError, ConnectionState};
use crate::domain::profile::PlatformProfile;
use crate::infrastructure::bluetooth::stack::BleStack;

/// Per-step timeouts for the connection handshake. Every step gets a bound;
/// blocking forever on an absent device is a defect, not patience.
#[derive(Debug, Clone, Copy)]
pub struct StepTimeouts {
    pub discovery: Duration,
    pub connect: Duration,
    pub resolve: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            discovery: Duration::from_secs(10),
            connect: Duration::from_secs(10),
            resolve: Duration::from_secs(5),
        }
    }
}

impl StepTimeouts {
    pub fn from_millis(discovery: u64, connect: u64, resolve: u64) -> Self {
        Self {
            discovery: Duration::from_millis(discovery),
            connect: Duration::from_millis(connect),
            resolve: Duration::from_millis(resolve),
        }
    }
}

/// Writable characteristic published while the connection is up.
///
/// The liveness flag is shared with the manager; any disconnect (local or
/// device-initiated) clears it for every outstanding clone of the handle.
pub struct CharacteristicHandle<S: BleStack> {
    inner: S::Characteristic,
    live: Arc<AtomicBool>,
}

impl<S: BleStack> Clone for CharacteristicHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            live: self.live.clone(),
        }
    }
}

impl<S: BleStack> CharacteristicHandle<S> {
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub(crate) fn characteristic(&self) -> &S::Characteristic {
        &self.inner
    }
}

pub struct ConnectionManager<S: BleStack> {
    stack: Arc<S>,
    profile: PlatformProfile,
    timeouts: StepTimeouts,
    state: ConnectionState,
    device: Option<S::Device>,
    server: Option<S::Server>,
    characteristic: Option<CharacteristicHandle<S>>,
    live: Option<Arc<AtomicBool>>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl<S: BleStack> ConnectionManager<S> {
    pub fn new(
        stack: Arc<S>,
        profile: PlatformProfile,
        timeouts: StepTimeouts,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            stack,
            profile,
            timeouts,
            state: ConnectionState::Disconnected,
            device: None,
            server: None,
            characteristic: None,
            live: None,
            event_tx,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Returns the writable characteristic only while Connected.
    pub fn current_characteristic(&self) -> Option<CharacteristicHandle<S>> {
        if self.state == ConnectionState::Connected {
            self.characteristic.clone()
        } else {
            None
        }
    }

    /// Runs the full handshake: discovery, GATT connect, service lookup,
    /// characteristic lookup. Any failure is terminal for this attempt;
    /// partial handles are discarded and a later `connect` restarts from
    /// discovery.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        match &self.state {
            ConnectionState::Connected => return Err(ConnectError::AlreadyConnected),
            state if state.is_attempt_in_flight() => {
                return Err(ConnectError::AttemptInProgress)
            }
            _ => {}
        }

        // Identifier resolution happens before any radio traffic.
        let service_uuid = match self.profile.service.resolve() {
            Ok(uuid) => uuid,
            Err(e) => return Err(self.fail(ConnectError::Profile(e.to_string()))),
        };
        let characteristic_uuid = match self.profile.characteristic.resolve() {
            Ok(uuid) => uuid,
            Err(e) => return Err(self.fail(ConnectError::Profile(e.to_string()))),
        };

        self.clear_handles();
        info!(prefix = %self.profile.name_prefix, "starting connection attempt");

        self.transition(ConnectionState::Discovering);
        let device = match self
            .stack
            .discover(&self.profile.name_prefix, self.timeouts.discovery)
            .await
        {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "discovery failed");
                return Err(self.fail(ConnectError::DeviceNotFound(
                    self.profile.name_prefix.clone(),
                )));
            }
        };

        self.transition(ConnectionState::Connecting);
        let server = match self.stack.connect(&device, self.timeouts.connect).await {
            Ok(server) => server,
            Err(e) => return Err(self.fail(ConnectError::GattConnectFailed(e.to_string()))),
        };

        self.transition(ConnectionState::ResolvingService);
        let service = match self
            .stack
            .resolve_service(&server, service_uuid, self.timeouts.resolve)
            .await
        {
            Ok(service) => service,
            Err(e) => {
                warn!(error = %e, "service resolution failed");
                self.stack.teardown(&server).await;
                return Err(self.fail(ConnectError::ServiceUnavailable(
                    self.profile.service.to_string(),
                )));
            }
        };

        self.transition(ConnectionState::ResolvingCharacteristic);
        let characteristic = match self
            .stack
            .resolve_characteristic(&server, &service, characteristic_uuid)
            .await
        {
            Ok(characteristic) => characteristic,
            Err(e) => {
                warn!(error = %e, "characteristic resolution failed");
                self.stack.teardown(&server).await;
                return Err(self.fail(ConnectError::CharacteristicUnavailable(
                    self.profile.characteristic.to_string(),
                )));
            }
        };

        let live = Arc::new(AtomicBool::new(true));
        self.characteristic = Some(CharacteristicHandle {
            inner: characteristic,
            live: live.clone(),
        });
        self.live = Some(live);
        self.device = Some(device);
        self.server = Some(server);
        self.transition(ConnectionState::Connected);
        info!("connected");
        Ok(())
    }

    /// Tears down the current connection. A no-op in any state other than
    /// Connected.
    pub async fn disconnect(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }
        if let Some(server) = self.server.take() {
            self.stack.teardown(&server).await;
        }
        self.clear_handles();
        self.transition(ConnectionState::Disconnected);
        info!("disconnected");
    }

    /// Handles a device-initiated disconnect notification.
    ///
    /// Authoritative and idempotent: when the id matches the current device,
    /// state and handles are cleared regardless of anything in flight.
    pub fn device_lost(&mut self, id: &str) {
        let Some(device) = &self.device else { return };
        if self.stack.device_id(device) != id {
            return;
        }
        warn!(%id, "device-initiated disconnect");
        self.clear_handles();
        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        self.state = next.clone();
        let _ = self.event_tx.send(AppEvent::ConnectionState(next));
    }

    fn fail(&mut self, err: ConnectError) -> ConnectError {
        warn!("connection attempt failed: {err}");
        self.clear_handles();
        self.transition(ConnectionState::Failed(err.clone()));
        err
    }

    fn clear_handles(&mut self) {
        if let Some(live) = self.live.take() {
            live.store(false, Ordering::Release);
        }
        self.characteristic = None;
        self.server = None;
        self.device = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::Platform;
    use crate::infrastructure::bluetooth::testing::{FailAt, MockStack};

    fn manager_with(
        stack: MockStack,
    ) -> (
        ConnectionManager<MockStack>,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let profile = PlatformProfile::select(Platform::Secondary);
        (
            ConnectionManager::new(Arc::new(stack), profile, StepTimeouts::default(), tx),
            rx,
        )
    }

    fn states(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<ConnectionState> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::ConnectionState(state) = event {
                seen.push(state);
            }
        }
        seen
    }

    #[tokio::test]
    async fn connect_walks_the_handshake_states() {
        let (mut manager, mut rx) = manager_with(MockStack::ok());

        manager.connect().await.unwrap();

        assert_eq!(*manager.state(), ConnectionState::Connected);
        assert!(manager.current_characteristic().is_some());
        assert_eq!(
            states(&mut rx),
            vec![
                ConnectionState::Discovering,
                ConnectionState::Connecting,
                ConnectionState::ResolvingService,
                ConnectionState::ResolvingCharacteristic,
                ConnectionState::Connected,
            ]
        );
    }

    #[tokio::test]
    async fn second_connect_while_connected_is_rejected() {
        let (mut manager, mut rx) = manager_with(MockStack::ok());
        manager.connect().await.unwrap();
        let _ = states(&mut rx);

        let err = manager.connect().await.unwrap_err();

        assert_eq!(err, ConnectError::AlreadyConnected);
        assert_eq!(*manager.state(), ConnectionState::Connected);
        assert!(manager.current_characteristic().is_some());
        // No transitions were published for the rejected attempt.
        assert!(states(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn each_step_failure_is_terminal_and_clears_handles() {
        for step in [
            FailAt::Discover,
            FailAt::Connect,
            FailAt::Service,
            FailAt::Characteristic,
        ] {
            let (mut manager, _rx) = manager_with(MockStack::failing_at(step));

            let err = manager.connect().await.unwrap_err();

            assert_eq!(*manager.state(), ConnectionState::Failed(err));
            assert!(manager.current_characteristic().is_none());
        }
    }

    #[tokio::test]
    async fn failure_variants_match_the_failing_step() {
        let (mut manager, _rx) = manager_with(MockStack::failing_at(FailAt::Discover));
        assert!(matches!(
            manager.connect().await.unwrap_err(),
            ConnectError::DeviceNotFound(_)
        ));

        let (mut manager, _rx) = manager_with(MockStack::failing_at(FailAt::Connect));
        assert!(matches!(
            manager.connect().await.unwrap_err(),
            ConnectError::GattConnectFailed(_)
        ));

        let (mut manager, _rx) = manager_with(MockStack::failing_at(FailAt::Service));
        assert!(matches!(
            manager.connect().await.unwrap_err(),
            ConnectError::ServiceUnavailable(_)
        ));

        let (mut manager, _rx) = manager_with(MockStack::failing_at(FailAt::Characteristic));
        assert!(matches!(
            manager.connect().await.unwrap_err(),
            ConnectError::CharacteristicUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn retry_after_failure_restarts_from_discovery() {
        let stack = MockStack::failing_at(FailAt::Service);
        let shared = stack.handle();
        let (mut manager, mut rx) = manager_with(stack);

        manager.connect().await.unwrap_err();
        let _ = states(&mut rx);

        shared.lock().unwrap().fail_at = FailAt::Nothing;
        manager.connect().await.unwrap();

        assert_eq!(*manager.state(), ConnectionState::Connected);
        let seen = states(&mut rx);
        assert_eq!(seen.first(), Some(&ConnectionState::Discovering));
        assert_eq!(seen.last(), Some(&ConnectionState::Connected));
    }

    #[tokio::test]
    async fn failed_resolution_tears_down_the_half_open_link() {
        let stack = MockStack::failing_at(FailAt::Characteristic);
        let shared = stack.handle();
        let (mut manager, _rx) = manager_with(stack);

        manager.connect().await.unwrap_err();

        assert_eq!(shared.lock().unwrap().teardowns, 1);
    }

    #[tokio::test]
    async fn disconnect_is_a_noop_when_not_connected() {
        let stack = MockStack::ok();
        let shared = stack.handle();
        let (mut manager, mut rx) = manager_with(stack);

        manager.disconnect().await;

        assert_eq!(*manager.state(), ConnectionState::Disconnected);
        assert!(states(&mut rx).is_empty());
        assert_eq!(shared.lock().unwrap().teardowns, 0);
    }

    #[tokio::test]
    async fn disconnect_tears_down_and_clears_the_characteristic() {
        let stack = MockStack::ok();
        let shared = stack.handle();
        let (mut manager, _rx) = manager_with(stack);
        manager.connect().await.unwrap();

        manager.disconnect().await;

        assert_eq!(*manager.state(), ConnectionState::Disconnected);
        assert!(manager.current_characteristic().is_none());
        assert_eq!(shared.lock().unwrap().teardowns, 1);
    }

    #[tokio::test]
    async fn device_lost_clears_state_and_stales_the_handle() {
        let (mut manager, _rx) = manager_with(MockStack::ok());
        manager.connect().await.unwrap();
        let handle = manager.current_characteristic().unwrap();
        assert!(handle.is_live());

        manager.device_lost("BeyoungBGen-0001");

        assert_eq!(*manager.state(), ConnectionState::Disconnected);
        assert!(manager.current_characteristic().is_none());
        assert!(!handle.is_live());

        // Idempotent: a second notification changes nothing.
        manager.device_lost("BeyoungBGen-0001");
        assert_eq!(*manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn device_lost_for_another_peripheral_is_ignored() {
        let (mut manager, _rx) = manager_with(MockStack::ok());
        manager.connect().await.unwrap();

        manager.device_lost("SomeOtherDevice");

        assert_eq!(*manager.state(), ConnectionState::Connected);
        assert!(manager.current_characteristic().is_some());
    }
}
