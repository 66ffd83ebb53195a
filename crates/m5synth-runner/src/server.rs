//! TCP server exposing simulated synth units.
//!
//! Each accepted connection gets its own [`FirmwareDevice`] backed by a
//! [`VirtualSynth`], so every client sees a freshly powered-on unit with its
//! own session state. Bytes are fed to the device as they arrive and its
//! responses are written straight back.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use m5synth_firmware::{Dispatcher, FirmwareDevice, VirtualSynth};
use m5synth_metrics::metric_defs;
use m5synth_protocol::Profile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: String,
    /// Port to listen on (0 for any).
    pub port: u16,
    /// Command table the simulated firmware speaks.
    pub profile: Profile,
    /// Device name prefix for logs and metrics.
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 9100,
            profile: Profile::Canonical,
            name: "synth".to_string(),
        }
    }
}

/// Bound device server.
#[derive(Debug)]
pub struct DeviceServer {
    listener: TcpListener,
    config: ServerConfig,
    connections: Arc<AtomicUsize>,
}

impl DeviceServer {
    /// Bind the listening socket.
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let addr = format!("{}:{}", config.bind, config.port);
        let listener = TcpListener::bind(&addr).await?;
        Ok(DeviceServer {
            listener,
            config,
            connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve connections until `shutdown` completes.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        info!(
            addr = %self.local_addr()?,
            profile = %self.config.profile,
            "device server listening"
        );
        tokio::pin!(shutdown);

        let mut next_index = 0usize;
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    let name = format!("{}-{}", self.config.name, next_index);
                    next_index += 1;
                    let profile = self.config.profile;
                    let connections = self.connections.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, peer, name, profile, connections).await;
                    });
                }
                _ = &mut shutdown => {
                    info!("device server shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Serve connections until Ctrl-C.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    name: String,
    profile: Profile,
    connections: Arc<AtomicUsize>,
) {
    let active = connections.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::gauge!(metric_defs::DEVICE_CONNECTIONS.name).set(active as f64);
    info!(device = %name, %peer, "host connected");

    let mut device = FirmwareDevice::new(Dispatcher::<VirtualSynth>::new(profile).named(name.clone()));
    if let Err(e) = handle_connection(stream, &mut device).await {
        warn!(device = %name, error = %e, "connection error");
    }

    let active = connections.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics::gauge!(metric_defs::DEVICE_CONNECTIONS.name).set(active as f64);

    let stats = device.dispatcher().stats();
    let sounding = device
        .dispatcher()
        .driver()
        .map(|synth| synth.sounding_notes())
        .unwrap_or(0);
    info!(
        device = %name,
        executed = stats.executed,
        failed = stats.failed(),
        bad_frames = device.bad_frames(),
        sounding,
        "host disconnected"
    );
    match state_json(&device) {
        Ok(Some(state)) => debug!(device = %name, %state, "final synth state"),
        Ok(None) => {}
        Err(e) => warn!(device = %name, error = %e, "failed to encode synth state"),
    }
}

/// JSON dump of the simulated chip, once `begin` has created it.
pub fn state_json(device: &FirmwareDevice<VirtualSynth>) -> serde_json::Result<Option<String>> {
    device
        .dispatcher()
        .driver()
        .map(|synth| serde_json::to_string(synth.state()))
        .transpose()
}

/// Pump one connection until the peer closes it.
async fn handle_connection(
    mut stream: TcpStream,
    device: &mut FirmwareDevice<VirtualSynth>,
) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let mut read_buf = [0u8; 1024];

    loop {
        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            return Ok(());
        }
        debug!(device = %device.dispatcher().name(), rx = %hex::encode(&read_buf[..n]), "uart rx");

        let out = device.feed(&read_buf[..n]);
        if !out.is_empty() {
            stream.write_all(&out).await?;
            stream.flush().await?;
        }
    }
}
