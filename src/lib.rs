/*!
Automated diagnostics and troubleshooting for Cisco devices over SSH.

The crate orchestrates one thing: open a device session, issue an ordered set
of show-commands, collect the raw text output and persist it as a report. The
transport itself lives behind a narrow trait so the session logic can run
against a mock instead of live hardware.

```no_run
use cisco_troubleshooter::{
    DeviceTarget, Session, SshConnector, default_rules,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = DeviceTarget::new("192.168.1.1", "admin", "secret");
    let mut session = Session::new(target, None)?;

    session.connect(&SshConnector).await?;
    session.run_diagnostics().await?;
    let health = session.check_health(default_rules()).await?;
    println!("status: {}", health.status);
    session.save_results("report.txt".as_ref())?;
    session.close().await?;
    Ok(())
}
```
*/

pub mod config;
pub mod health;
pub mod report;
pub mod session;
pub mod transport;

pub use config::{CommandSet, ConfigError, DeviceTarget, ScanConfig};
pub use health::{HealthRule, HealthStatus, HealthSummary, default_rules};
pub use report::{DiagnosticReport, ReportError, default_report_name};
pub use session::{Session, SessionError};
pub use transport::{Connector, DeviceConnection, MockConnector, SshConnector, TransportError};
