//! Headless office service the operation scripts connect to over UNO.

use std::process::Stdio;
use std::time::Duration;

use slidepilot_config::BackendConfig;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const POLL_ATTEMPTS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum OfficeError {
    #[error("failed to start {binary}: {reason}")]
    Spawn { binary: String, reason: String },

    #[error("office service did not open {address} after {attempts} attempts")]
    NotReady { address: String, attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct OfficeService {
    binary: String,
    host: String,
    port: u16,
}

impl OfficeService {
    pub fn new(binary: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            binary: binary.into(),
            host: host.into(),
            port,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.office_binary, &config.office_host, config.office_port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether something accepts connections on the UNO socket.
    pub async fn is_running(&self) -> bool {
        matches!(
            tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(self.address())).await,
            Ok(Ok(_))
        )
    }

    fn accept_arg(&self) -> String {
        format!(
            "--accept=socket,host={},port={};urp;StarOffice.ServiceManager",
            self.host, self.port
        )
    }

    /// Start the headless service unless it is already listening.
    ///
    /// The spawned process is left running after this returns.
    pub async fn ensure_running(&self) -> Result<(), OfficeError> {
        let address = self.address();
        if self.is_running().await {
            debug!(%address, "Office service already running");
            return Ok(());
        }

        info!(binary = %self.binary, %address, "Starting headless office service");
        Command::new(&self.binary)
            .args([
                "--headless",
                "--invisible",
                "--nodefault",
                "--nolockcheck",
                "--nologo",
                "--norestore",
            ])
            .arg(self.accept_arg())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OfficeError::Spawn {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;

        for attempt in 1..=POLL_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;
            if self.is_running().await {
                info!(%address, attempt, "Office service ready");
                return Ok(());
            }
        }

        warn!(%address, "Office service did not come up");
        Err(OfficeError::NotReady {
            address,
            attempts: POLL_ATTEMPTS,
        })
    }
}
