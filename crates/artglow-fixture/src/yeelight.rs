use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::error::{FixtureError, Result};
use crate::traits::{Fixture, Rgb};

/// Yeelight LAN control port.
pub const DEFAULT_PORT: u16 = 55443;

const MAX_RESPONSE_LINE: usize = 16 * 1024;

/// Connection settings for a [`YeelightBulb`].
#[derive(Debug, Clone)]
pub struct YeelightConfig {
    /// Bound on connecting, on each request/reply exchange, and on the bulb
    /// calling back when music mode starts.
    pub timeout: Duration,
    /// Local address the bulb should call back for music mode. Defaults to
    /// the local side of the control connection.
    pub music_host: Option<IpAddr>,
}

impl Default for YeelightConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            music_host: None,
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Deserialize)]
struct Response {
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ResponseError>,
}

#[derive(Deserialize)]
struct ResponseError {
    code: i64,
    message: String,
}

struct ControlConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    local_ip: IpAddr,
}

/// A Yeelight bulb controlled over its LAN protocol.
///
/// Commands are newline-terminated JSON objects. On the control connection
/// every command is answered with a reply carrying the same id; in music mode
/// the bulb holds a second connection it opened back to us and commands go
/// out without replies, which lifts the bulb's per-minute command quota.
pub struct YeelightBulb {
    address: String,
    config: YeelightConfig,
    control: Mutex<Option<ControlConnection>>,
    music: Mutex<Option<TcpStream>>,
    next_id: AtomicU64,
    /// Set by the first successful `connect`; lost connections are reopened
    /// on demand afterwards.
    established: AtomicBool,
    /// Music mode was requested and not stopped since.
    streaming: AtomicBool,
}

impl YeelightBulb {
    /// Create a handle for `address` (`host` or `host:port`). No I/O happens
    /// until [`Fixture::connect`].
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(address, YeelightConfig::default())
    }

    pub fn with_config(address: impl Into<String>, config: YeelightConfig) -> Self {
        Self {
            address: with_default_port(address.into()),
            config,
            control: Mutex::new(None),
            music: Mutex::new(None),
            next_id: AtomicU64::new(1),
            established: AtomicBool::new(false),
            streaming: AtomicBool::new(false),
        }
    }

    /// `host:port` this bulb is reached at.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn request_line(&self, method: &str, params: Vec<Value>) -> (u64, Vec<u8>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request { id, method, params };
        // Serializing a struct of integers, strings and JSON values cannot fail.
        let mut line = serde_json::to_vec(&request).unwrap_or_default();
        line.extend_from_slice(b"\r\n");
        (id, line)
    }

    fn connectivity(&self, source: std::io::Error) -> FixtureError {
        FixtureError::Connectivity {
            fixture: self.address.clone(),
            source,
        }
    }

    fn timeout(&self) -> FixtureError {
        FixtureError::Timeout {
            fixture: self.address.clone(),
            timeout: self.config.timeout,
        }
    }

    /// Send a command, over the music connection when streaming.
    ///
    /// A music connection that was lost is reopened before sending. The
    /// stream is out of its slot while being written, so a failed or
    /// cancelled write drops it instead of leaving a partial line behind.
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<()> {
        if !self.streaming.load(Ordering::Acquire) {
            return self.request(method, params).await.map(|_| ());
        }

        let mut music = self.music.lock().await;
        let mut stream = match music.take() {
            Some(stream) => stream,
            None => {
                let stream = self.open_music().await?;
                info!(fixture = %self.address, "music mode resumed");
                stream
            }
        };

        let (_, line) = self.request_line(method, params);
        stream
            .write_all(&line)
            .await
            .map_err(|err| self.connectivity(err))?;
        *music = Some(stream);

        trace!(fixture = %self.address, method, "music command sent");
        Ok(())
    }

    /// Send a command on the control connection and wait for its reply.
    ///
    /// The connection is only put back after a complete exchange.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let mut control = self.control.lock().await;
        let mut conn = self.checkout(&mut control).await?;

        let (id, line) = self.request_line(method, params);
        let exchange = async {
            conn.writer.write_all(&line).await?;
            read_reply(&mut conn.reader, id).await
        };

        let response = match tokio::time::timeout(self.config.timeout, exchange).await {
            Err(_) => return Err(self.timeout()),
            Ok(Err(err)) => return Err(self.connectivity(err)),
            Ok(Ok(response)) => response,
        };
        *control = Some(conn);

        if let Some(error) = response.error {
            return Err(FixtureError::Reported {
                fixture: self.address.clone(),
                message: format!("{} (code {})", error.message, error.code),
            });
        }
        trace!(fixture = %self.address, method, "command acknowledged");
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Take the control connection out of `slot`, reopening it if it was
    /// lost after a successful `connect`.
    async fn checkout(&self, slot: &mut Option<ControlConnection>) -> Result<ControlConnection> {
        if let Some(conn) = slot.take() {
            return Ok(conn);
        }
        if !self.established.load(Ordering::Acquire) {
            return Err(FixtureError::NotConnected(self.address.clone()));
        }
        let conn = self.open_control().await?;
        info!(fixture = %self.address, "reconnected");
        Ok(conn)
    }

    async fn open_control(&self) -> Result<ControlConnection> {
        let stream = tokio::time::timeout(self.config.timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| self.timeout())?
            .map_err(|err| self.connectivity(err))?;
        stream.set_nodelay(true).map_err(|err| self.connectivity(err))?;
        let local_ip = stream
            .local_addr()
            .map_err(|err| self.connectivity(err))?
            .ip();

        let (read_half, write_half) = stream.into_split();
        Ok(ControlConnection {
            reader: BufReader::new(read_half),
            writer: write_half,
            local_ip,
        })
    }

    /// Address the bulb should call back for music mode.
    async fn callback_ip(&self) -> Result<IpAddr> {
        if let Some(host) = self.config.music_host {
            return Ok(host);
        }
        let mut control = self.control.lock().await;
        let conn = self.checkout(&mut control).await?;
        let local_ip = conn.local_ip;
        *control = Some(conn);
        Ok(local_ip)
    }

    /// Ask the bulb to open a music connection back to us and accept it.
    async fn open_music(&self) -> Result<TcpStream> {
        let local_ip = self.callback_ip().await?;
        let listener = TcpListener::bind(SocketAddr::new(local_ip, 0))
            .await
            .map_err(|err| self.connectivity(err))?;
        let port = listener
            .local_addr()
            .map_err(|err| self.connectivity(err))?
            .port();

        self.request(
            "set_music",
            vec![json!(1), json!(local_ip.to_string()), json!(port)],
        )
        .await?;

        let (stream, peer) = tokio::time::timeout(self.config.timeout, listener.accept())
            .await
            .map_err(|_| self.timeout())?
            .map_err(|err| self.connectivity(err))?;
        stream.set_nodelay(true).map_err(|err| self.connectivity(err))?;

        debug!(fixture = %self.address, %peer, "music connection accepted");
        Ok(stream)
    }
}

impl Fixture for YeelightBulb {
    async fn connect(&self) -> Result<()> {
        let conn = self.open_control().await?;
        *self.control.lock().await = Some(conn);
        self.established.store(true, Ordering::Release);

        info!(fixture = %self.address, "connected");
        Ok(())
    }

    async fn turn_on(&self) -> Result<()> {
        self.send("set_power", vec![json!("on"), json!("sudden"), json!(0)])
            .await
    }

    async fn turn_off(&self) -> Result<()> {
        self.send("set_power", vec![json!("off"), json!("sudden"), json!(0)])
            .await
    }

    async fn start_streaming(&self) -> Result<()> {
        let stream = self.open_music().await?;
        *self.music.lock().await = Some(stream);
        self.streaming.store(true, Ordering::Release);

        debug!(fixture = %self.address, "music mode started");
        Ok(())
    }

    async fn stop_streaming(&self) -> Result<()> {
        self.streaming.store(false, Ordering::Release);
        if let Some(mut stream) = self.music.lock().await.take() {
            let _ = stream.shutdown().await;
        }
        self.request("set_music", vec![json!(0)]).await?;
        debug!(fixture = %self.address, "music mode stopped");
        Ok(())
    }

    async fn set_color(&self, color: Rgb, transition: Duration) -> Result<()> {
        let (effect, duration) = effect_params(transition);
        self.send(
            "set_rgb",
            vec![json!(color.to_u32()), json!(effect), json!(duration)],
        )
        .await
    }

    async fn set_brightness(&self, percent: u8, transition: Duration) -> Result<()> {
        // The bulb accepts 1-100.
        let level = percent.clamp(1, 100);
        let (effect, duration) = effect_params(transition);
        self.send(
            "set_bright",
            vec![json!(level), json!(effect), json!(duration)],
        )
        .await
    }
}

/// Yeelight's `effect`/`duration` pair; smooth fades need at least 30 ms.
fn effect_params(transition: Duration) -> (&'static str, u64) {
    let millis = u64::try_from(transition.as_millis()).unwrap_or(u64::MAX);
    if millis < 30 {
        ("sudden", 0)
    } else {
        ("smooth", millis)
    }
}

/// Canonical `host:port` form of a bulb address, adding the default port when
/// none is given.
pub fn normalize_address(address: &str) -> String {
    with_default_port(address.trim().to_string())
}

fn with_default_port(address: String) -> String {
    if address.parse::<SocketAddr>().is_ok() {
        return address;
    }
    if let Ok(ip) = address.parse::<IpAddr>() {
        return SocketAddr::new(ip, DEFAULT_PORT).to_string();
    }
    let has_port = address
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    if has_port {
        address
    } else {
        format!("{address}:{DEFAULT_PORT}")
    }
}

/// Read lines until the reply for `id`; property notifications are skipped.
async fn read_reply(reader: &mut BufReader<OwnedReadHalf>, id: u64) -> std::io::Result<Response> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by bulb",
            ));
        }
        if line.len() > MAX_RESPONSE_LINE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "oversized reply line",
            ));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response: Response = serde_json::from_str(trimmed)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        match response.id {
            Some(reply_id) if reply_id == id => return Ok(response),
            Some(reply_id) => trace!(reply_id, expected = id, "ignoring stale reply"),
            None => trace!(notification = trimmed, "ignoring notification"),
        }
    }
}
