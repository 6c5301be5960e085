//! IRC Session
//!
//! Connects to the configured server (optionally over TLS), registers,
//! joins the channels and answers `?` commands posted in them. Channel
//! messages are only acted on once the server has acknowledged the
//! `identify-msg` capability, so every line carries the sender's NickServ
//! status flag.

use super::message::{self, Message};
use super::outgoing::FloodControl;
use crate::commands::CommandDispatcher;
use crate::config::IrcConfig;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

const IDENTIFY_MSG: &str = "identify-msg";
const NICKSERV: &str = "NickServ";

#[derive(Error, Debug)]
pub enum IrcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Invalid server name for TLS: {0}")]
    InvalidServerName(String),
}

/// The bot's IRC side
pub struct IrcBot {
    config: IrcConfig,
    flood: FloodControl,
    dispatcher: CommandDispatcher,
}

impl IrcBot {
    pub fn new(config: IrcConfig, flood: FloodControl, dispatcher: CommandDispatcher) -> Self {
        Self {
            config,
            flood,
            dispatcher,
        }
    }

    /// Stay connected, reconnecting after every disconnect. Never returns;
    /// the caller races it against a shutdown signal.
    pub async fn run(&self) {
        let delay = self.config.reconnect_delay();
        loop {
            match self.connect_and_serve().await {
                Ok(()) => warn!("Connection to {} closed by server", self.config.server),
                Err(e) => error!("Connection to {} failed: {}", self.config.server, e),
            }
            info!("Reconnecting in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }

    async fn connect_and_serve(&self) -> Result<(), IrcError> {
        let address = (self.config.server.as_str(), self.config.port);
        info!(
            "Connecting to {}:{} (TLS: {})",
            self.config.server,
            self.config.port,
            self.config.use_tls()
        );
        let tcp = TcpStream::connect(address).await?;

        if self.config.use_tls() {
            let stream = connect_tls(&self.config.server, tcp).await?;
            self.serve(stream).await
        } else {
            self.serve(tcp).await
        }
    }

    /// Run one session over an established stream until EOF
    pub async fn serve<S>(&self, stream: S) -> Result<(), IrcError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut session = Session {
            bot: self,
            stream: BufReader::new(stream),
            nick: self.config.nick.clone(),
            identify_msg: false,
        };
        session.register().await?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if session.stream.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);
            if let Some(msg) = Message::parse(&line) {
                session.on_message(msg).await?;
            }
        }
    }
}

/// Per-connection protocol state
struct Session<'b, S> {
    bot: &'b IrcBot,
    stream: BufReader<S>,
    /// Nick currently requested from the server
    nick: String,
    identify_msg: bool,
}

impl<S> Session<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn send(&mut self, line: &str) -> Result<(), IrcError> {
        let mut raw = String::with_capacity(line.len() + 2);
        raw.push_str(line);
        raw.push_str("\r\n");
        self.stream.write_all(raw.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn register(&mut self) -> Result<(), IrcError> {
        let nick = self.nick.clone();
        self.send(&message::nick(&nick)).await?;
        self.send(&message::user(&nick, &nick)).await
    }

    async fn on_message(&mut self, msg: Message) -> Result<(), IrcError> {
        match msg.command.as_str() {
            "PING" => {
                let token = msg.param(0).unwrap_or_default();
                self.send(&message::pong(token)).await
            }
            "001" => self.on_welcome().await,
            "433" => self.on_nickname_in_use().await,
            "CAP" => {
                self.on_cap(&msg);
                Ok(())
            }
            "PRIVMSG" => self.on_privmsg(&msg).await,
            _ => Ok(()),
        }
    }

    async fn on_welcome(&mut self) -> Result<(), IrcError> {
        let bot = self.bot;
        let config = &bot.config;
        self.identify_msg = false;

        debug!("Requesting {} capability", IDENTIFY_MSG);
        self.send(&message::cap_req(IDENTIFY_MSG)).await?;
        self.send(&message::cap_end()).await?;

        if !config.password.is_empty() {
            debug!("Identifying to NickServ");
            let identify = format!("identify {}", config.password);
            self.send(&message::privmsg(NICKSERV, &identify)).await?;
        }
        for channel in &config.channels {
            info!("Joining {}", channel);
            self.send(&message::join(channel)).await?;
        }
        FloodControl::pause(self.bot.flood.anti_flood).await;
        Ok(())
    }

    async fn on_nickname_in_use(&mut self) -> Result<(), IrcError> {
        let bot = self.bot;
        let config = &bot.config;
        self.nick.push('_');
        debug!("Nickname in use, switching to {}", self.nick);
        let fallback = self.nick.clone();
        self.send(&message::nick(&fallback)).await?;

        // Without a password the configured nick cannot be reclaimed
        if config.password.is_empty() {
            return Ok(());
        }
        for request in [
            format!("identify {}", config.password),
            format!("ghost {} {}", config.nick, config.password),
            format!("release {} {}", config.nick, config.password),
        ] {
            self.send(&message::privmsg(NICKSERV, &request)).await?;
        }
        FloodControl::pause(self.bot.flood.anti_flood).await;

        self.nick = config.nick.clone();
        self.send(&message::nick(&config.nick)).await
    }

    fn on_cap(&mut self, msg: &Message) {
        debug!("Received cap response {:?}", msg.params);
        let acked = msg.param(1) == Some("ACK")
            && msg.param(2).is_some_and(|caps| caps.contains(IDENTIFY_MSG));
        if acked {
            debug!("{} cap acked", IDENTIFY_MSG);
            self.identify_msg = true;
        }
    }

    async fn on_privmsg(&mut self, msg: &Message) -> Result<(), IrcError> {
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            return Ok(());
        };
        if !target.starts_with(['#', '&']) {
            return Ok(());
        }
        if !self.identify_msg {
            debug!("Ignoring message because {} cap not enabled", IDENTIFY_MSG);
            return Ok(());
        }

        let text = text.strip_prefix(['+', '-']).unwrap_or(text);
        if text.starts_with('?') {
            debug!("{} in {}: {}", msg.nick().unwrap_or("unknown"), target, text);
        }
        let replies = self.bot.dispatcher.handle_line(target, text).await;
        for reply in replies {
            self.say(target, &reply).await?;
        }
        Ok(())
    }

    /// Send one reply, wrapped and paced
    async fn say(&mut self, target: &str, text: &str) -> Result<(), IrcError> {
        let bot = self.bot;
        let flood = &bot.flood;
        let chunks = match flood.chunks(text) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Not sending reply to {}: {}", target, e);
                return Ok(());
            }
        };
        for (count, chunk) in chunks.iter().enumerate() {
            if count > 0 {
                FloodControl::pause(flood.continuation).await;
            }
            self.send(&message::privmsg(target, chunk)).await?;
        }
        FloodControl::pause(flood.anti_flood).await;
        Ok(())
    }
}

/// Wrap a TCP stream in TLS, trusting the platform's root certificates
async fn connect_tls(
    server: &str,
    tcp: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, IrcError> {
    let certs = rustls_native_certs::load_native_certs();
    for e in &certs.errors {
        warn!("Skipping unreadable native certificate: {}", e);
    }
    let mut root_store = rustls::RootCertStore::empty();
    for cert in certs.certs {
        root_store.add(cert).ok();
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let server_name = rustls::pki_types::ServerName::try_from(server.to_string())
        .map_err(|_| IrcError::InvalidServerName(server.to_string()))?;
    let connector = tokio_rustls::TlsConnector::from(Arc::new(tls_config));
    Ok(connector.connect(server_name, tcp).await?)
}
