//! Mock transport for exercising session logic without a real device.
//!
//! Returns canned command output and can simulate per-command failures or a
//! device that refuses connections entirely.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::config::DeviceTarget;
use crate::transport::{Connector, DeviceConnection, TransportError, TransportResult};

/// Scripted connector. Commands without a canned entry still succeed with a
/// synthesized placeholder so ordering tests don't need a full script.
#[derive(Default)]
pub struct MockConnector {
    outputs: HashMap<String, String>,
    failing: HashSet<String>,
    refuse_open: bool,
    opened: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned output for one command.
    pub fn with_output(mut self, command: &str, output: &str) -> Self {
        self.outputs.insert(command.to_string(), output.to_string());
        self
    }

    /// Make one command fail with a transport error when sent.
    pub fn with_failing(mut self, command: &str) -> Self {
        self.failing.insert(command.to_string());
        self
    }

    /// Refuse to open connections, as an unreachable device would.
    pub fn refusing() -> Self {
        Self {
            refuse_open: true,
            ..Self::default()
        }
    }

    /// How many times `open` has been called on this connector.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, target: &DeviceTarget) -> TransportResult<Box<dyn DeviceConnection>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.refuse_open {
            return Err(TransportError::Tcp(format!(
                "connection refused: {}:{}",
                target.host, target.port
            )));
        }
        Ok(Box::new(MockConnection {
            outputs: self.outputs.clone(),
            failing: self.failing.clone(),
            closed: false,
        }))
    }
}

pub struct MockConnection {
    outputs: HashMap<String, String>,
    failing: HashSet<String>,
    closed: bool,
}

#[async_trait]
impl DeviceConnection for MockConnection {
    async fn send_command(&mut self, command: &str) -> TransportResult<String> {
        if self.closed {
            return Err(TransportError::Ssh("channel closed".to_string()));
        }
        if self.failing.contains(command) {
            return Err(TransportError::Command(format!(
                "timed out waiting for output of '{}'",
                command
            )));
        }
        match self.outputs.get(command) {
            Some(output) => Ok(output.clone()),
            None => Ok(format!("<mock output for '{}'>\n", command)),
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.closed = true;
        Ok(())
    }
}
