use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;

use async_trait::async_trait;
use ssh2::Session;
use tokio::sync::Mutex;

use crate::config::DeviceTarget;
use crate::transport::{Connector, DeviceConnection, TransportError, TransportResult};

/// Production connector backed by libssh2. All ssh2 calls are blocking, so
/// they run on the blocking thread pool and the session is shared behind a
/// mutex between those tasks.
pub struct SshConnector;

impl SshConnector {
    fn open_sync_inner(
        host: String,
        port: u16,
        username: String,
        password: String,
        timeout_secs: u64,
    ) -> Result<Session, TransportError> {
        let tcp = TcpStream::connect(format!("{}:{}", host, port))
            .map_err(|e| TransportError::Tcp(e.to_string()))?;
        let mut session = Session::new().map_err(|e| TransportError::Ssh(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| TransportError::Ssh(e.to_string()))?;
        session
            .userauth_password(&username, &password)
            .map_err(|e| TransportError::Auth(e.to_string()))?;
        if !session.authenticated() {
            return Err(TransportError::Auth("Authentication failed".to_string()));
        }
        // libssh2 takes milliseconds; 0 means block forever.
        session.set_timeout((timeout_secs * 1000).min(u32::MAX as u64) as u32);
        Ok(session)
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(&self, target: &DeviceTarget) -> TransportResult<Box<dyn DeviceConnection>> {
        let host = target.host.clone();
        let port = target.port;
        let username = target.username.clone();
        let password = target.password.clone();
        let timeout_secs = target.timeout_secs;
        let session = tokio::task::spawn_blocking(move || {
            Self::open_sync_inner(host, port, username, password, timeout_secs)
        })
        .await
        .map_err(|e| TransportError::Async(e.to_string()))??;
        Ok(Box::new(SshConnection {
            session: Arc::new(Mutex::new(session)),
        }))
    }
}

pub struct SshConnection {
    session: Arc<Mutex<Session>>,
}

impl SshConnection {
    fn exec_sync(session: &mut Session, command: &str) -> TransportResult<String> {
        let mut channel = session
            .channel_session()
            .map_err(|e| TransportError::Ssh(e.to_string()))?;
        channel
            .exec(command)
            .map_err(|e| TransportError::Command(e.to_string()))?;
        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .map_err(|e| TransportError::Command(e.to_string()))?;
        channel
            .wait_close()
            .map_err(|e| TransportError::Ssh(e.to_string()))?;
        Ok(output)
    }
}

#[async_trait]
impl DeviceConnection for SshConnection {
    async fn send_command(&mut self, command: &str) -> TransportResult<String> {
        let command = command.to_string();
        let session_mutex = self.session.clone();
        tokio::task::spawn_blocking(move || {
            let mut session = session_mutex.blocking_lock();
            Self::exec_sync(&mut session, &command)
        })
        .await
        .map_err(|e| TransportError::Async(e.to_string()))?
    }

    async fn close(&mut self) -> TransportResult<()> {
        let session_mutex = self.session.clone();
        tokio::task::spawn_blocking(move || {
            let session = session_mutex.blocking_lock();
            session
                .disconnect(Some(ssh2::DisconnectCode::ByApplication), "", None)
                .map_err(|e| TransportError::Ssh(e.to_string()))
        })
        .await
        .map_err(|e| TransportError::Async(e.to_string()))?
    }
}
