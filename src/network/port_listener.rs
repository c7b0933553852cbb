//! # Port Listener Module
//!
//! One [`PortListener`] owns one bound socket for one (port, protocol) pair. While its
//! session runs it waits for the next inbound unit of data, classifies it and appends the
//! resulting record to the session's shared [`CaptureLog`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ Inbound TCP  │───▶│ PortListener     │───▶│ CaptureLog   │
//! │ / UDP data   │    │                  │    │ (mutex)      │
//! └──────────────┘    │ - bounded waits  │    └──────────────┘
//!                     │ - classification │───▶ progress printer (mpsc)
//!                     └──────────────────┘
//! ```
//!
//! TCP: accept one connection, read one bounded buffer, classify, close, then accept the
//! next. UDP: one datagram per iteration. Every wait is wrapped in a timeout so the shared
//! stop flag is looked at again at least once per poll interval.
//!
//! Failure policy: a bind failure ends this listener only. Accept, read and receive errors
//! are logged and the loop keeps going; only the stop flag ends it.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpSocket, UdpSocket};
use tokio::time::{timeout, Instant};
use uuid::Uuid;

use crate::configuration::config::Config;
use crate::configuration::types::{ListenerConfig, Protocol};
use crate::data_capture::capture_log::CaptureLog;
use crate::data_capture::classifier::PacketClassifier;
use crate::data_capture::progress::ProgressSender;
use crate::data_capture::types::Endpoint;
use crate::error_handling::types::NetworkError;

const TCP_BACKLOG: u32 = 128;
/// Pause after a failed accept/receive so a persistent error does not spin the loop.
const ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Socket-level settings shared by every listener of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerSettings {
    pub bind_address: IpAddr,
    pub buffer_size: usize,
    pub poll_timeout: Duration,
    pub read_timeout: Duration,
}

impl From<&Config> for ListenerSettings {
    fn from(config: &Config) -> Self {
        Self {
            bind_address: config.bind_address,
            buffer_size: config.buffer_size,
            poll_timeout: config.poll_timeout(),
            read_timeout: config.read_timeout(),
        }
    }
}

/// Everything a running listener shares with its session.
#[derive(Clone)]
pub struct ListenerContext {
    pub session_id: Uuid,
    pub classifier: PacketClassifier,
    pub log: Arc<CaptureLog>,
    pub progress: Option<ProgressSender>,
    pub stop: Arc<AtomicBool>,
}

impl ListenerContext {
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// How a listener ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// Bound, served until the stop flag was raised.
    Stopped {
        captured: usize,
        transient_errors: usize,
    },
    /// Never started; the message says why.
    BindFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerReport {
    pub listener: ListenerConfig,
    pub outcome: ListenerOutcome,
}

enum BoundSocket {
    Tcp(TcpListener),
    Udp(UdpSocket),
}

pub struct PortListener {
    config: ListenerConfig,
    /// Port actually bound; differs from the configured one when that is 0.
    port: u16,
    settings: ListenerSettings,
    socket: BoundSocket,
}

impl PortListener {
    /// Binds the socket for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailure`] when the port is taken or the process lacks the
    /// privilege to bind it.
    pub async fn bind(
        config: &ListenerConfig,
        settings: &ListenerSettings,
    ) -> Result<Self, NetworkError> {
        let addr = SocketAddr::new(settings.bind_address, config.port);
        let bind_failure = |source: std::io::Error| NetworkError::BindFailure {
            port: config.port,
            protocol: config.protocol,
            source,
        };

        let socket = match config.protocol {
            Protocol::TCP => {
                let socket = match addr {
                    SocketAddr::V4(_) => TcpSocket::new_v4(),
                    SocketAddr::V6(_) => TcpSocket::new_v6(),
                }
                .map_err(bind_failure)?;
                socket.set_reuseaddr(true).map_err(bind_failure)?;
                socket.bind(addr).map_err(bind_failure)?;
                BoundSocket::Tcp(socket.listen(TCP_BACKLOG).map_err(bind_failure)?)
            }
            Protocol::UDP => BoundSocket::Udp(UdpSocket::bind(addr).await.map_err(bind_failure)?),
        };
        let port = match &socket {
            BoundSocket::Tcp(l) => l.local_addr(),
            BoundSocket::Udp(s) => s.local_addr(),
        }
        .map_err(bind_failure)?
        .port();

        Ok(Self {
            config: config.clone(),
            port,
            settings: settings.clone(),
            socket,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        match &self.socket {
            BoundSocket::Tcp(l) => l.local_addr(),
            BoundSocket::Udp(s) => s.local_addr(),
        }
    }

    /// Serves until the stop flag is raised, then reports what it did.
    pub async fn run(self, ctx: ListenerContext) -> ListenerReport {
        info!(
            "[{}] Monitoring {} port {}",
            ctx.session_id, self.config.protocol, self.port
        );

        let outcome = match &self.socket {
            BoundSocket::Tcp(listener) => self.serve_tcp(listener, &ctx).await,
            BoundSocket::Udp(socket) => self.serve_udp(socket, &ctx).await,
        };

        debug!(
            "[{}] {} listener exited: {:?}",
            ctx.session_id, self.config, outcome
        );

        ListenerReport {
            listener: self.config,
            outcome,
        }
    }

    async fn serve_tcp(&self, listener: &TcpListener, ctx: &ListenerContext) -> ListenerOutcome {
        let mut captured = 0;
        let mut transient_errors = 0;

        while !ctx.should_stop() {
            let (mut stream, peer) = match timeout(self.settings.poll_timeout, listener.accept()).await {
                Err(_) => continue,
                Ok(Err(e)) => {
                    self.transient(ctx, NetworkError::TransientIo(e));
                    transient_errors += 1;
                    tokio::time::sleep(ERROR_BACKOFF).await;
                    continue;
                }
                Ok(Ok(accepted)) => accepted,
            };

            debug!(
                "[{}] TCP {}: connection from {}",
                ctx.session_id, self.port, peer
            );

            let read = read_payload(
                &mut stream,
                self.settings.buffer_size,
                self.settings.read_timeout,
                self.settings.poll_timeout,
                &ctx.stop,
            )
            .await;
            match read {
                Ok(Some(data)) => {
                    self.capture(&data, peer, ctx);
                    captured += 1;
                }
                Ok(None) => debug!(
                    "[{}] TCP {}: {} sent nothing",
                    ctx.session_id, self.port, peer
                ),
                Err(e) => {
                    self.transient(ctx, e);
                    transient_errors += 1;
                }
            }
            // the connection closes here, before the next accept
        }

        ListenerOutcome::Stopped {
            captured,
            transient_errors,
        }
    }

    async fn serve_udp(&self, socket: &UdpSocket, ctx: &ListenerContext) -> ListenerOutcome {
        let mut captured = 0;
        let mut transient_errors = 0;
        let mut buf = vec![0u8; self.settings.buffer_size];

        while !ctx.should_stop() {
            match timeout(self.settings.poll_timeout, socket.recv_from(&mut buf)).await {
                Err(_) => continue,
                Ok(Ok((n, peer))) => {
                    debug!(
                        "[{}] UDP {}: datagram from {}",
                        ctx.session_id, self.port, peer
                    );
                    self.capture(&buf[..n], peer, ctx);
                    captured += 1;
                }
                Ok(Err(e)) => {
                    self.transient(ctx, NetworkError::TransientIo(e));
                    transient_errors += 1;
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }

        ListenerOutcome::Stopped {
            captured,
            transient_errors,
        }
    }

    fn capture(&self, data: &[u8], peer: SocketAddr, ctx: &ListenerContext) {
        let record = ctx.classifier.classify(
            data,
            Endpoint::from(peer),
            Endpoint::local(self.port),
        );
        ctx.log.append(record.clone());
        if let Some(progress) = &ctx.progress {
            // printer gone means nobody is watching; the log still has the record
            let _ = progress.send(record);
        }
    }

    fn transient(&self, ctx: &ListenerContext, err: NetworkError) {
        if !ctx.should_stop() {
            warn!(
                "[{}] {} {} error: {}",
                ctx.session_id, self.config.protocol, self.port, err
            );
        }
    }
}

/// Binds and serves one listener. A bind failure is logged and reported, never propagated.
pub async fn run_listener(
    config: ListenerConfig,
    settings: ListenerSettings,
    ctx: ListenerContext,
) -> ListenerReport {
    match PortListener::bind(&config, &settings).await {
        Ok(listener) => listener.run(ctx).await,
        Err(e) => {
            error!("[{}] {}, listener skipped", ctx.session_id, e);
            ListenerReport {
                listener: config,
                outcome: ListenerOutcome::BindFailed(e.to_string()),
            }
        }
    }
}

/// Reads one buffer of at most `buffer_size` bytes.
///
/// The wait is cut into `poll_timeout` slices and `stop` is checked between them, so a
/// silent peer holds the listener for at most one slice after a stop request.
///
/// Returns `Ok(None)` when the peer closes without sending, stays silent for
/// `read_timeout`, or `stop` is raised first.
pub async fn read_payload<S>(
    stream: &mut S,
    buffer_size: usize,
    read_timeout: Duration,
    poll_timeout: Duration,
    stop: &AtomicBool,
) -> Result<Option<Vec<u8>>, NetworkError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    let deadline = Instant::now() + read_timeout;

    loop {
        if stop.load(Ordering::Acquire) {
            return Ok(None);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }

        match timeout(remaining.min(poll_timeout), stream.read(&mut buf)).await {
            Err(_) => continue,
            Ok(Ok(0)) => return Ok(None),
            Ok(Ok(n)) => {
                buf.truncate(n);
                return Ok(Some(buf));
            }
            Ok(Err(e)) => return Err(NetworkError::TransientIo(e)),
        }
    }
}
