/*!
The troubleshooter session: one connection lifecycle to a single device plus
the commands run over it.

A session moves through exactly three states:

```text
Unconnected --connect()--> Connected --close()--> Closed
```

Any run method outside `Connected` fails with a state error, and nothing
leaves `Closed`. Sessions share no state with each other; multi-device scans
are plain caller-driven iteration, one independent session per device.
*/

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{CommandSet, ConfigError, DeviceTarget};
use crate::health::{self, HealthRule, HealthSummary};
use crate::report::{DiagnosticReport, ReportError};
use crate::transport::{Connector, DeviceConnection, TransportError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("session is already connected")]
    AlreadyConnected,
    #[error("session is not connected")]
    NotConnected,
    #[error("session is closed")]
    Closed,
    #[error("no diagnostics have been collected yet")]
    NoDiagnostics,
    #[error("connection error: {0}")]
    Connection(#[from] TransportError),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unconnected,
    Connected,
    Closed,
}

/// Owns one device target, an optional open connection and the results of the
/// most recent diagnostic run.
pub struct Session {
    target: DeviceTarget,
    commands: CommandSet,
    state: SessionState,
    connection: Option<Box<dyn DeviceConnection>>,
    hostname: String,
    last_report: Option<DiagnosticReport>,
}

impl Session {
    /// Validates the target and builds an unconnected session. Never touches
    /// the network; no connection attempt precedes an explicit `connect`.
    pub fn new(target: DeviceTarget, commands: Option<CommandSet>) -> Result<Self, ConfigError> {
        target.validate()?;
        let hostname = target.host.clone();
        Ok(Self {
            target,
            commands: commands.unwrap_or_default(),
            state: SessionState::Unconnected,
            connection: None,
            hostname,
            last_report: None,
        })
    }

    /// The device hostname once connected, the configured host before that.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn target(&self) -> &DeviceTarget {
        &self.target
    }

    /// Results of the most recent run, if any.
    pub fn last_report(&self) -> Option<&DiagnosticReport> {
        self.last_report.as_ref()
    }

    /// Opens the transport via the given connector. The device hostname is
    /// probed opportunistically; a failed probe falls back to the target host.
    pub async fn connect(&mut self, connector: &dyn Connector) -> Result<(), SessionError> {
        match self.state {
            SessionState::Connected => return Err(SessionError::AlreadyConnected),
            SessionState::Closed => return Err(SessionError::Closed),
            SessionState::Unconnected => {}
        }

        info!(host = %self.target.host, port = self.target.port, "connecting");
        let mut connection = connector.open(&self.target).await?;

        match connection
            .send_command("show running-config | include hostname")
            .await
        {
            Ok(output) => {
                if let Some(name) = parse_hostname(&output) {
                    self.hostname = name;
                }
            }
            Err(e) => debug!(error = %e, "hostname probe failed, keeping target host"),
        }

        self.connection = Some(connection);
        self.state = SessionState::Connected;
        info!(host = %self.target.host, hostname = %self.hostname, "connected");
        Ok(())
    }

    fn connection_mut(&mut self) -> Result<&mut Box<dyn DeviceConnection>, SessionError> {
        match self.state {
            SessionState::Unconnected => Err(SessionError::NotConnected),
            SessionState::Closed => Err(SessionError::Closed),
            SessionState::Connected => Ok(self
                .connection
                .as_mut()
                .expect("connected session must hold a connection")),
        }
    }

    /// Sends every configured command in order and returns the collected
    /// results. A failed command is recorded as an error marker and the run
    /// continues; one bad command never aborts the pass.
    pub async fn run_diagnostics(&mut self) -> Result<DiagnosticReport, SessionError> {
        self.connection_mut()?;

        let mut report = DiagnosticReport::new(&self.target.host, &self.hostname);
        let commands: Vec<String> = self.commands.iter().map(str::to_string).collect();
        info!(hostname = %self.hostname, count = commands.len(), "running diagnostics");

        for command in &commands {
            debug!(%command, "executing");
            let connection = self.connection_mut()?;
            match connection.send_command(command).await {
                Ok(output) => report.record(command, output),
                Err(e) => {
                    warn!(%command, error = %e, "command failed, recording marker");
                    report.record_failure(command, &e.to_string());
                }
            }
        }

        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Derives a health summary. Rule commands already covered by the last run
    /// are reused; missing ones are fetched as a reduced diagnostic pass.
    /// Malformed or error-marked output degrades the summary to `unknown`
    /// instead of failing.
    pub async fn check_health(
        &mut self,
        rules: &[HealthRule],
    ) -> Result<HealthSummary, SessionError> {
        self.connection_mut()?;

        let mut report = self
            .last_report
            .clone()
            .unwrap_or_else(|| DiagnosticReport::new(&self.target.host, &self.hostname));

        for rule in rules {
            let command = rule.command();
            if report.get(command).is_some() {
                continue;
            }
            debug!(%command, "fetching output for health rule");
            let connection = self.connection_mut()?;
            match connection.send_command(command).await {
                Ok(output) => report.record(command, output),
                Err(e) => {
                    warn!(%command, error = %e, "health probe failed, recording marker");
                    report.record_failure(command, &e.to_string());
                }
            }
        }

        self.last_report = Some(report.clone());
        Ok(health::evaluate_report(&report, rules))
    }

    /// Writes the most recent run to a plain-text report file.
    pub fn save_results(&self, path: &Path) -> Result<(), SessionError> {
        let report = self.last_report.as_ref().ok_or(SessionError::NoDiagnostics)?;
        report.write_text(path)?;
        Ok(())
    }

    /// Releases the connection. The session is unusable afterwards; closing
    /// twice is a state error.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Unconnected => return Err(SessionError::NotConnected),
            SessionState::Closed => return Err(SessionError::Closed),
            SessionState::Connected => {}
        }
        // The state flips before the transport teardown so the connection is
        // considered released on every exit path.
        self.state = SessionState::Closed;
        let mut connection = self
            .connection
            .take()
            .expect("connected session must hold a connection");
        let result = connection.close().await;
        info!(hostname = %self.hostname, "disconnected");
        result.map_err(SessionError::Connection)
    }

    /// Scoped convenience: connect, run the full pass and close on every exit
    /// path, returning the collected results.
    pub async fn run_once(
        target: DeviceTarget,
        commands: Option<CommandSet>,
        connector: &dyn Connector,
    ) -> Result<DiagnosticReport, SessionError> {
        let mut session = Session::new(target, commands)?;
        session.connect(connector).await?;
        let run_result = session.run_diagnostics().await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "close after run failed");
        }
        run_result
    }
}

/// Pulls the configured name out of a `hostname <name>` line.
fn parse_hostname(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some("hostname"), Some(name)) => Some(name.to_string()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceTarget;
    use crate::health::{HealthStatus, default_rules};
    use crate::transport::MockConnector;

    fn target() -> DeviceTarget {
        DeviceTarget::new("10.0.0.1", "admin", "secret")
    }

    fn named_connector() -> MockConnector {
        MockConnector::new()
            .with_output("show running-config | include hostname", "hostname core-sw1\n")
    }

    #[tokio::test]
    async fn test_construction_never_opens_a_connection() {
        let connector = MockConnector::new();
        let session = Session::new(target(), None).unwrap();
        assert_eq!(connector.open_count(), 0);
        assert_eq!(session.hostname(), "10.0.0.1");
    }

    #[tokio::test]
    async fn test_construction_rejects_bad_target() {
        assert!(Session::new(DeviceTarget::new("", "admin", "secret"), None).is_err());
    }

    #[tokio::test]
    async fn test_run_before_connect_is_a_state_error() {
        let mut session = Session::new(target(), None).unwrap();
        assert!(matches!(
            session.run_diagnostics().await,
            Err(SessionError::NotConnected)
        ));
        assert!(matches!(
            session.check_health(default_rules()).await,
            Err(SessionError::NotConnected)
        ));
        assert!(matches!(session.close().await, Err(SessionError::NotConnected)));
    }

    #[tokio::test]
    async fn test_run_after_close_is_a_state_error() {
        let connector = named_connector();
        let mut session = Session::new(target(), None).unwrap();
        session.connect(&connector).await.unwrap();
        session.close().await.unwrap();

        assert!(matches!(
            session.run_diagnostics().await,
            Err(SessionError::Closed)
        ));
        assert!(matches!(session.close().await, Err(SessionError::Closed)));
        assert!(matches!(
            session.connect(&connector).await,
            Err(SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_double_connect_is_rejected() {
        let connector = named_connector();
        let mut session = Session::new(target(), None).unwrap();
        session.connect(&connector).await.unwrap();
        assert!(matches!(
            session.connect(&connector).await,
            Err(SessionError::AlreadyConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_propagates() {
        let connector = MockConnector::refusing();
        let mut session = Session::new(target(), None).unwrap();
        assert!(matches!(
            session.connect(&connector).await,
            Err(SessionError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_hostname_probe() {
        let connector = named_connector();
        let mut session = Session::new(target(), None).unwrap();
        session.connect(&connector).await.unwrap();
        assert_eq!(session.hostname(), "core-sw1");
    }

    #[tokio::test]
    async fn test_diagnostics_cover_every_command_in_order() {
        let connector = named_connector();
        let mut session = Session::new(target(), None).unwrap();
        session.connect(&connector).await.unwrap();

        let report = session.run_diagnostics().await.unwrap();
        let commands: Vec<_> = report.entries().map(|e| e.command.as_str()).collect();
        let expected: Vec<_> = CommandSet::default().iter().map(str::to_string).collect();
        assert_eq!(commands, expected);
    }

    #[tokio::test]
    async fn test_single_command_failure_does_not_abort_the_run() {
        let connector = named_connector().with_failing("show logging");
        let mut session = Session::new(target(), None).unwrap();
        session.connect(&connector).await.unwrap();

        let report = session.run_diagnostics().await.unwrap();
        assert_eq!(report.len(), CommandSet::default().len());
        assert!(report.is_error("show logging"));
        assert!(!report.is_error("show version"));

        // The partial run degrades health to a label, never an error.
        let summary = session.check_health(default_rules()).await.unwrap();
        assert!(matches!(
            summary.status,
            HealthStatus::Unknown | HealthStatus::IssuesFound
        ));
    }

    #[tokio::test]
    async fn test_check_health_runs_reduced_pass_without_full_run() {
        let connector = named_connector()
            .with_output(
                "show processes cpu",
                "CPU utilization for five seconds: 5%/0%; one minute: 3%; five minutes: 2%\n",
            )
            .with_output(
                "show memory statistics",
                "Processor   84C8D480   467709824    39096516   428613308   426539600   312588776\n",
            )
            .with_output(
                "show ip interface brief",
                "Interface  IP-Address  OK? Method Status  Protocol\n\
                 GigabitEthernet0/0  10.0.0.1  YES NVRAM up up\n",
            )
            .with_output("show logging", "Log Buffer (8192 bytes):\n");

        let mut session = Session::new(target(), None).unwrap();
        session.connect(&connector).await.unwrap();

        let summary = session.check_health(default_rules()).await.unwrap();
        assert_eq!(summary.status, HealthStatus::Healthy);

        // The reduced pass populated only what the rules needed.
        let report = session.last_report().unwrap();
        assert_eq!(report.len(), default_rules().len());
    }

    #[tokio::test]
    async fn test_custom_command_set() {
        let connector = named_connector();
        let commands = CommandSet::new(["show version", "show cdp neighbors", "show version"]);
        let mut session = Session::new(target(), Some(commands)).unwrap();
        session.connect(&connector).await.unwrap();

        let report = session.run_diagnostics().await.unwrap();
        // Duplicates collapse to the first position, last write wins.
        let commands: Vec<_> = report.entries().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["show version", "show cdp neighbors"]);
    }

    #[tokio::test]
    async fn test_save_results_requires_a_run() {
        let session = Session::new(target(), None).unwrap();
        assert!(matches!(
            session.save_results(Path::new("/tmp/never-written.txt")),
            Err(SessionError::NoDiagnostics)
        ));
    }

    #[tokio::test]
    async fn test_save_results_round_trip() {
        let connector = named_connector();
        let mut session = Session::new(target(), None).unwrap();
        session.connect(&connector).await.unwrap();
        session.run_diagnostics().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        session.save_results(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        for command in CommandSet::default().iter() {
            assert!(text.contains(&format!("# Command: {}", command)));
        }
    }

    #[tokio::test]
    async fn test_run_once_closes_on_success() {
        let connector = named_connector();
        let report = Session::run_once(target(), None, &connector).await.unwrap();
        assert_eq!(report.len(), CommandSet::default().len());
        assert_eq!(report.hostname, "core-sw1");
    }

    #[tokio::test]
    async fn test_run_once_propagates_connect_failure() {
        let connector = MockConnector::refusing();
        assert!(matches!(
            Session::run_once(target(), None, &connector).await,
            Err(SessionError::Connection(_))
        ));
    }
}
