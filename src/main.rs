//! Multi-device scan runner: visits each configured device sequentially, one
//! independent session per device, and writes one report per device. A device
//! that fails to connect is skipped, never aborting the rest of the scan.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cisco_troubleshooter::{
    ScanConfig, Session, SshConnector, default_report_name, default_rules,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = env::args().nth(1).unwrap_or_else(|| "scan.json".to_string());
    let config = ScanConfig::load(Path::new(&config_path))
        .with_context(|| format!("loading scan config from {}", config_path))?;
    let report_dir = config.report_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let commands = config.command_set();

    let connector = SshConnector;
    let mut failures = 0usize;

    for target in &config.devices {
        let host = target.host.clone();
        info!(%host, "checking device");

        let mut session = Session::new(target.clone(), Some(commands.clone()))?;
        if let Err(e) = session.connect(&connector).await {
            error!(%host, error = %e, "skipping device, connection failed");
            failures += 1;
            continue;
        }

        match session.run_diagnostics().await {
            Ok(report) => {
                let path = report_dir.join(default_report_name(&report.hostname));
                report
                    .write_text(&path)
                    .with_context(|| format!("writing report for {}", host))?;
                info!(%host, report = %path.display(), "report saved");
            }
            Err(e) => {
                error!(%host, error = %e, "diagnostic run failed");
                failures += 1;
            }
        }

        match session.check_health(default_rules()).await {
            Ok(health) => {
                info!(%host, status = %health.status, "health check done");
                for issue in &health.issues {
                    info!(%host, %issue, "issue found");
                }
            }
            Err(e) => error!(%host, error = %e, "health check failed"),
        }

        if let Err(e) = session.close().await {
            error!(%host, error = %e, "disconnect failed");
        }
    }

    info!(
        devices = config.devices.len(),
        failures, "scan finished"
    );
    Ok(())
}
