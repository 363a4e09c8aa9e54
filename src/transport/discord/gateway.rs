use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, interval};
use tokio_tungstenite::tungstenite::Message;

use super::http_client::DiscordHttpClient;
use super::types::{DEFAULT_HEARTBEAT_INTERVAL_MS, GatewayOpcode};

type WsError = tokio_tungstenite::tungstenite::Error;

/// Session data kept across reconnects so the gateway can resume.
#[derive(Debug)]
pub struct GatewaySession {
    pub session_id: Mutex<Option<String>>,
    pub sequence: AtomicI64,
    pub resume_gateway_url: Mutex<Option<String>>,
}

impl Default for GatewaySession {
    fn default() -> Self {
        Self {
            session_id: Mutex::new(None),
            sequence: AtomicI64::new(-1),
            resume_gateway_url: Mutex::new(None),
        }
    }
}

/// An `INTERACTION_CREATE` payload reduced to what the bot routes on.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundInteraction {
    pub id: String,
    pub token: String,
    pub kind: u64,
    pub guild_id: Option<String>,
    pub user_id: String,
    pub locale: Option<String>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Ready {
        session_id: String,
        resume_gateway_url: String,
        application_id: Option<String>,
    },
    Interaction(InboundInteraction),
}

/// Heartbeat bookkeeping for one websocket connection.
struct Heartbeat {
    interval_ms: u64,
    acked: bool,
    deadline: Option<Instant>,
}

impl Heartbeat {
    fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            acked: true,
            deadline: None,
        }
    }

    fn sent(&mut self) {
        self.acked = false;
        self.deadline = Some(Instant::now() + Duration::from_millis(self.interval_ms));
    }

    fn ack(&mut self) {
        self.acked = true;
        self.deadline = None;
    }
}

/// Outcome of handling one websocket frame.
enum Flow {
    Continue,
    Reconnect,
}

pub struct DiscordGateway {
    bot_token: String,
    intents: u64,
    session: Arc<GatewaySession>,
}

impl DiscordGateway {
    pub fn new(bot_token: String, intents: u64, session: Arc<GatewaySession>) -> Self {
        Self {
            bot_token,
            intents,
            session,
        }
    }

    /// Run one websocket connection until the server asks for a reconnect or
    /// the socket drops. Returns `Ok(())` when reconnecting is appropriate.
    pub async fn run(&self, http: &DiscordHttpClient, tx: &mpsc::Sender<GatewayEvent>) -> Result<()> {
        let base_url = self.gateway_url(http).await?;
        let ws_url = format!("{}/?v=10&encoding=json", base_url.trim_end_matches('/'));

        let (stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .with_context(|| format!("connect Discord gateway websocket: {ws_url}"))?;
        let (mut write, mut read) = stream.split();

        let mut heartbeat = Heartbeat::new(read_hello(&mut read).await?);
        self.identify_or_resume(&mut write).await?;
        let mut ticker = interval(Duration::from_millis(heartbeat.interval_ms));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !heartbeat.acked {
                        tracing::warn!("Discord gateway heartbeat ACK missing; reconnecting");
                        return Ok(());
                    }
                    self.send_heartbeat(&mut write, &mut heartbeat).await?;
                }
                () = wait_until(heartbeat.deadline) => {
                    if !heartbeat.acked {
                        tracing::warn!("Discord gateway heartbeat ACK timeout; reconnecting");
                        return Ok(());
                    }
                    heartbeat.deadline = None;
                }
                frame = read.next() => {
                    let Some(frame) = frame else {
                        tracing::warn!("Discord gateway socket closed; reconnecting");
                        return Ok(());
                    };
                    let frame = frame.context("read Discord gateway message")?;
                    if let Flow::Reconnect = self.handle_frame(frame, tx, &mut write, &mut heartbeat).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn gateway_url(&self, http: &DiscordHttpClient) -> Result<String> {
        if let Some(url) = self.session.resume_gateway_url.lock().await.clone()
            && !url.is_empty()
        {
            return Ok(url);
        }

        let response = http
            .get_gateway_bot()
            .await
            .context("fetch Discord gateway/bot URL")?;
        Ok(response
            .get("url")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("wss://gateway.discord.gg")
            .to_string())
    }

    async fn identify_or_resume<W>(&self, write: &mut W) -> Result<()>
    where
        W: Sink<Message, Error = WsError> + Unpin,
    {
        let payload = if let Some(session_id) = self.session.session_id.lock().await.clone() {
            json!({
                "op": GatewayOpcode::Resume as u8,
                "d": {
                    "token": self.bot_token,
                    "session_id": session_id,
                    "seq": self.session.sequence.load(Ordering::SeqCst),
                }
            })
        } else {
            json!({
                "op": GatewayOpcode::Identify as u8,
                "d": {
                    "token": self.bot_token,
                    "intents": self.intents,
                    "properties": {
                        "os": std::env::consts::OS,
                        "browser": "gradient-roles",
                        "device": "gradient-roles"
                    }
                }
            })
        };

        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway identify/resume")
    }

    async fn send_heartbeat<W>(&self, write: &mut W, heartbeat: &mut Heartbeat) -> Result<()>
    where
        W: Sink<Message, Error = WsError> + Unpin,
    {
        let sequence = self.session.sequence.load(Ordering::SeqCst);
        let payload = json!({
            "op": GatewayOpcode::Heartbeat as u8,
            "d": if sequence < 0 { serde_json::Value::Null } else { json!(sequence) },
        });
        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway heartbeat")?;
        heartbeat.sent();
        Ok(())
    }

    async fn handle_frame<W>(
        &self,
        frame: Message,
        tx: &mpsc::Sender<GatewayEvent>,
        write: &mut W,
        heartbeat: &mut Heartbeat,
    ) -> Result<Flow>
    where
        W: Sink<Message, Error = WsError> + Unpin,
    {
        let Some(raw) = frame_text(frame) else {
            return Ok(Flow::Continue);
        };
        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway payload")?;

        if let Some(sequence) = payload.get("s").and_then(serde_json::Value::as_i64) {
            self.session.sequence.store(sequence, Ordering::SeqCst);
        }

        let opcode = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        match opcode {
            Some(GatewayOpcode::Heartbeat) => {
                self.send_heartbeat(write, heartbeat).await?;
            }
            Some(GatewayOpcode::HeartbeatAck) => heartbeat.ack(),
            Some(GatewayOpcode::Reconnect) => {
                tracing::info!("Discord gateway requested reconnect");
                return Ok(Flow::Reconnect);
            }
            Some(GatewayOpcode::InvalidSession) => {
                let resumable = payload
                    .get("d")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                self.invalidate(resumable).await;
                return Ok(Flow::Reconnect);
            }
            Some(GatewayOpcode::Dispatch) => {
                let event_type = payload
                    .get("t")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default();
                if let Some(data) = payload.get("d")
                    && let Some(event) = parse_dispatch(event_type, data)
                {
                    if let GatewayEvent::Ready {
                        session_id,
                        resume_gateway_url,
                        ..
                    } = &event
                    {
                        *self.session.session_id.lock().await = Some(session_id.clone());
                        *self.session.resume_gateway_url.lock().await =
                            Some(resume_gateway_url.clone());
                    }
                    tx.send(event)
                        .await
                        .context("forward Discord gateway event")?;
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    async fn invalidate(&self, resumable: bool) {
        self.session.sequence.store(-1, Ordering::SeqCst);
        *self.session.session_id.lock().await = None;
        if resumable {
            let wait = Duration::from_secs(rand::random_range(1..=5));
            tracing::warn!(wait_secs = wait.as_secs(), "Discord session invalidated; waiting before reconnect");
            tokio::time::sleep(wait).await;
        } else {
            tracing::warn!("Discord session invalidated without resume; starting fresh");
            *self.session.resume_gateway_url.lock().await = None;
        }
    }
}

pub fn parse_dispatch(event_type: &str, data: &serde_json::Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => Some(GatewayEvent::Ready {
            session_id: data.get("session_id")?.as_str()?.to_string(),
            resume_gateway_url: data.get("resume_gateway_url")?.as_str()?.to_string(),
            application_id: data
                .get("application")
                .and_then(|application| application.get("id"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
        }),
        "INTERACTION_CREATE" => parse_interaction(data).map(GatewayEvent::Interaction),
        "RESUMED" => {
            tracing::info!("Discord gateway session resumed");
            None
        }
        _ => None,
    }
}

fn parse_interaction(data: &serde_json::Value) -> Option<InboundInteraction> {
    let user_id = data
        .get("member")
        .and_then(|member| member.get("user"))
        .or_else(|| data.get("user"))
        .and_then(|user| user.get("id"))
        .and_then(serde_json::Value::as_str)?
        .to_string();

    Some(InboundInteraction {
        id: data.get("id")?.as_str()?.to_string(),
        token: data.get("token")?.as_str()?.to_string(),
        kind: data.get("type")?.as_u64()?,
        guild_id: data
            .get("guild_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        user_id,
        locale: data
            .get("locale")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        data: data.get("data").cloned().unwrap_or(serde_json::Value::Null),
    })
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures_util::future::pending::<()>().await,
    }
}

async fn read_hello<R>(read: &mut R) -> Result<u64>
where
    R: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = read.next().await {
        let frame = frame.context("read Discord gateway hello")?;
        let Some(raw) = frame_text(frame) else {
            continue;
        };
        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway hello")?;
        let opcode = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);
        if opcode == Some(GatewayOpcode::Hello) {
            return Ok(payload
                .get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS));
        }
    }
    anyhow::bail!("Discord gateway closed before Hello")
}

fn frame_text(frame: Message) -> Option<String> {
    match frame {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}
