//! Abstract transport boundary (spec §4.6/§6): the orchestrator drives any
//! implementation of this trait without knowing how registers actually
//! reach the wire.
//!
//! Grounded on `register_cache.rs`'s small async-method-on-a-struct style;
//! `async-trait` is the teacher's own dependency for exactly this shape.

use async_trait::async_trait;

use crate::error::DriverError;

/// Reads holding registers from a Modbus-speaking device. Implementations
/// own framing, retries and timeouts; this crate only calls `(start,
/// count) -> [u16]` once per batched range.
#[async_trait]
pub trait RegisterReader: Send + Sync {
    /// Read `count` holding registers starting at `start`. `count` is
    /// always `<= 125` (spec §4.3/§6); implementations may assume it.
    async fn read_holding_registers(&self, start: u16, count: u16) -> Result<Vec<u16>, DriverError>;
}
