//! Scripted in-memory GATT stack for state machine tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::infrastructure::bluetooth::stack::{BleStack, StackError};

/// Which handshake step the scripted stack should fail at, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Nothing,
    Discover,
    Connect,
    Service,
    Characteristic,
    Write,
}

pub struct MockState {
    pub fail_at: FailAt,
    pub writes: Vec<Vec<u8>>,
    pub teardowns: usize,
}

pub struct MockStack {
    state: Arc<Mutex<MockState>>,
}

impl MockStack {
    pub fn ok() -> Self {
        Self::failing_at(FailAt::Nothing)
    }

    pub fn failing_at(step: FailAt) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                fail_at: step,
                writes: Vec::new(),
                teardowns: 0,
            })),
        }
    }

    /// Shared view of the scripted state, kept by tests for assertions.
    pub fn handle(&self) -> Arc<Mutex<MockState>> {
        self.state.clone()
    }

    fn should_fail(&self, step: FailAt) -> bool {
        self.state.lock().unwrap().fail_at == step
    }
}

#[async_trait]
impl BleStack for MockStack {
    type Device = String;
    type Server = ();
    type Service = ();
    type Characteristic = ();

    fn device_id(&self, device: &String) -> String {
        device.clone()
    }

    async fn discover(
        &self,
        name_prefix: &str,
        _timeout: Duration,
    ) -> Result<String, StackError> {
        if self.should_fail(FailAt::Discover) {
            return Err(StackError::NotFound);
        }
        Ok(format!("{name_prefix}-0001"))
    }

    async fn connect(&self, _device: &String, _timeout: Duration) -> Result<(), StackError> {
        if self.should_fail(FailAt::Connect) {
            return Err(StackError::Backend("link setup rejected".to_string()));
        }
        Ok(())
    }

    async fn resolve_service(
        &self,
        _server: &(),
        _service: Uuid,
        _timeout: Duration,
    ) -> Result<(), StackError> {
        if self.should_fail(FailAt::Service) {
            return Err(StackError::NotFound);
        }
        Ok(())
    }

    async fn resolve_characteristic(
        &self,
        _server: &(),
        _service: &(),
        _characteristic: Uuid,
    ) -> Result<(), StackError> {
        if self.should_fail(FailAt::Characteristic) {
            return Err(StackError::NotFound);
        }
        Ok(())
    }

    async fn write_without_response(
        &self,
        _characteristic: &(),
        payload: &[u8],
    ) -> Result<(), StackError> {
        if self.should_fail(FailAt::Write) {
            return Err(StackError::Backend("write rejected".to_string()));
        }
        self.state.lock().unwrap().writes.push(payload.to_vec());
        Ok(())
    }

    async fn teardown(&self, _server: &()) {
        self.state.lock().unwrap().teardowns += 1;
    }
}
