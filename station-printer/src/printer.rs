//! Printer adapters for sending ESC/POS data
//!
//! Only raw TCP printing (port 9100) is supported.

use crate::error::{PrintError, PrintResult};
use std::future::Future;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

/// Raw printing port used by most thermal printers
pub const DEFAULT_PRINTER_PORT: u16 = 9100;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);
/// Upper bound for [`Printer::is_online`] probes, kept short so health checks
/// never hold the printer's single connection slot for long
const ONLINE_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

/// Trait for printer adapters
///
/// Futures are `Send` so print jobs can run on spawned tasks.
pub trait Printer: Send + Sync {
    /// Send raw ESC/POS data to the printer
    fn print(&self, data: &[u8]) -> impl Future<Output = PrintResult<()>> + Send;

    /// Open and close a connection without sending data
    fn test_connection(&self) -> impl Future<Output = PrintResult<()>> + Send;

    /// Check if the printer is online/reachable
    fn is_online(&self) -> impl Future<Output = bool> + Send;
}

/// Network printer (TCP port 9100)
///
/// One connection per job: connect, write everything, wait for the printer to
/// drain its input buffer, then close.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    timeout: Duration,
    settle_delay: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid printer host: '{}'",
                host
            )));
        }
        if port == 0 {
            return Err(PrintError::InvalidConfig("Printer port must not be 0".into()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            timeout: DEFAULT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        })
    }

    /// Set connect/write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the delay between the last write and closing the socket
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Get the printer address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> PrintResult<TcpStream> {
        self.connect_within(self.timeout).await
    }

    async fn connect_within(&self, timeout: Duration) -> PrintResult<TcpStream> {
        tokio::time::timeout(timeout, TcpStream::connect((self.host.as_str(), self.port)))
            .await
            .map_err(|_| self.timed_out("connect"))?
            .map_err(|e| PrintError::Connection {
                addr: self.addr(),
                reason: e.to_string(),
            })
    }

    fn timed_out(&self, stage: &'static str) -> PrintError {
        PrintError::Timeout {
            addr: self.addr(),
            stage,
        }
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        debug!("Connecting to printer");
        let mut stream = self.connect().await?;

        debug!("Connected, sending {} bytes", data.len());
        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| self.timed_out("write"))??;

        tokio::time::sleep(self.settle_delay).await;

        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "Socket shutdown after print failed");
        }

        info!("Print job sent successfully");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr()))]
    async fn test_connection(&self) -> PrintResult<()> {
        let mut stream = self.connect().await?;
        let _ = stream.shutdown().await;
        info!("Printer reachable");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        match self.connect_within(self.timeout.min(ONLINE_CHECK_TIMEOUT)).await {
            Ok(mut stream) => {
                let _ = stream.shutdown().await;
                true
            }
            Err(e) => {
                warn!(addr = %self.addr(), error = %e, "Printer offline");
                false
            }
        }
    }
}
