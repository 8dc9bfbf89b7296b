//! BLE control plane for the BoosterGen kit.
//!
//! The connection manager owns the handshake state machine, the transport
//! writer performs the fire-and-forget frame writes, and `BoosterService`
//! ties both to the event log behind the operations the UI drives. The
//! GATT stack itself sits behind the `BleStack` trait so the state machine
//! runs against a scripted stack in tests and btleplug in production.

pub mod btle;
pub mod events;
pub mod manager;
pub mod protocol;
pub mod service;
pub mod stack;
#[cfg(test)]
pub mod testing;
pub mod writer;

pub use manager::{CharacteristicHandle, ConnectionManager, StepTimeouts};
pub use service::BoosterService;
