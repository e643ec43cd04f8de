/*
 * This module provides device connectivity for the toolkit.
 * It doesn't care what runs over a connection, just how one is opened,
 * used and released. This allows for adding support for new transports
 * (SSH today, Telnet or a lab mock tomorrow) without touching the
 * session logic.
 */

mod mock;
mod ssh;

pub use mock::MockConnector;
pub use ssh::SshConnector;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DeviceTarget;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("TCP error: {0}")]
    Tcp(String),
    #[error("SSH error: {0}")]
    Ssh(String),
    #[error("SSH authentication error: {0}")]
    Auth(String),
    #[error("Command execution error: {0}")]
    Command(String),
    #[error("Async error: {0}")]
    Async(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// One open channel to a device. Commands are strictly sequential; a single
/// CLI session cannot multiplex request/response pairs out of order.
#[async_trait]
pub trait DeviceConnection: Send {
    /// Sends one command verbatim and returns the raw text the device printed.
    async fn send_command(&mut self, command: &str) -> TransportResult<String>;
    /// Releases the underlying channel. The connection is unusable afterwards.
    async fn close(&mut self) -> TransportResult<()>;
}

/// Opens connections to devices. Implementations hide transport details so the
/// session layer can be exercised against a mock instead of live hardware.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, target: &DeviceTarget) -> TransportResult<Box<dyn DeviceConnection>>;
}
