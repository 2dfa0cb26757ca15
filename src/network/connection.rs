use std::collections::HashMap;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::core::trace::{self, Direction, SharedTrace};
use crate::core::{CubeConfig, Error, Result};
use crate::protocol::{Command, CubeState, LineCodec, Message, MessageType};

const RECV_BUFFER_SIZE: usize = 4096;

/// Outcome of one read-drain
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Messages decoded and merged into the state store, in wire order
    pub messages: Vec<Message>,
    /// Lines that were dropped; each failure affected only its own message
    pub errors: Vec<Error>,
    /// The hub closed the stream during this drain
    pub closed: bool,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.errors.is_empty()
    }
}

/// Control channel to one hub
///
/// The connection is either disconnected or owns exactly one stream. Every
/// command is followed by a read-drain that collects whatever the hub sends
/// until a single receive call exceeds the read timeout or the stream ends.
pub struct Connection<S = TcpStream> {
    stream: Option<S>,
    codec: LineCodec,
    buffer: BytesMut,
    read_timeout: Duration,
    state: CubeState,
    last_responses: HashMap<MessageType, Message>,
    trace: SharedTrace,
}

impl<S> Connection<S> {
    /// Creates a disconnected connection with a no-op trace hook
    pub fn new(read_timeout: Duration) -> Self {
        Self::with_trace(read_timeout, trace::noop())
    }

    pub fn with_trace(read_timeout: Duration, trace: SharedTrace) -> Self {
        Connection {
            stream: None,
            codec: LineCodec::with_trace(trace.clone()),
            buffer: BytesMut::with_capacity(RECV_BUFFER_SIZE),
            read_timeout,
            state: CubeState::new(),
            last_responses: HashMap::new(),
            trace,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn set_read_timeout(&mut self, read_timeout: Duration) {
        self.read_timeout = read_timeout;
    }

    /// Rooms, devices and hub details decoded so far
    pub fn state(&self) -> &CubeState {
        &self.state
    }

    /// The most recent message of the given type
    pub fn last_response(&self, message_type: MessageType) -> Option<&Message> {
        self.last_responses.get(&message_type)
    }

    /// Forgets the last message of the given type
    pub fn clear_last_response(&mut self, message_type: MessageType) -> Option<Message> {
        self.last_responses.remove(&message_type)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::connection_state("not connected to a hub"));
        }
        Ok(())
    }
}

impl Connection<TcpStream> {
    /// Opens the control channel and consumes the hub's greeting
    pub async fn connect(&mut self, config: &CubeConfig) -> Result<DrainReport> {
        if self.is_connected() {
            return Err(Error::connection_state("already connected to a hub"));
        }
        config.validate()?;

        debug!("connecting to {}:{}", config.host, config.port);
        let stream = timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| {
            Error::timeout(format!(
                "connecting to {}:{} took longer than {:?}",
                config.host, config.port, config.connect_timeout
            ))
        })??;
        stream.set_nodelay(true)?;

        self.read_timeout = config.read_timeout;
        self.attach(stream).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Takes ownership of an already open stream and drains the greeting
    ///
    /// State from any previous session is discarded first.
    pub async fn attach(&mut self, stream: S) -> Result<DrainReport> {
        if self.is_connected() {
            return Err(Error::connection_state("already connected to a hub"));
        }
        self.state.clear();
        self.last_responses.clear();
        self.buffer.clear();
        self.stream = Some(stream);

        let report = self.read().await?;
        if self.state.hub().is_none() {
            warn!("hub did not send a greeting");
        }
        Ok(report)
    }

    /// Sends the quit command and closes the stream; a no-op when disconnected
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        self.buffer.clear();
        self.last_responses.clear();

        let result = Self::write_command(&mut self.codec, &mut stream, &Command::Quit).await;
        if let Err(e) = stream.shutdown().await {
            debug!("error while closing the hub connection: {}", e);
        }
        debug!("disconnected from hub");
        result
    }

    /// Writes one command, then drains the hub's reply
    pub async fn send(&mut self, command: &Command) -> Result<DrainReport> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::connection_state("cannot send a command while disconnected"))?;

        if let Err(e) = Self::write_command(&mut self.codec, stream, command).await {
            if matches!(e, Error::Io(_)) {
                self.stream = None;
            }
            return Err(e);
        }
        self.read().await
    }

    async fn write_command(codec: &mut LineCodec, stream: &mut S, command: &Command) -> Result<()> {
        let mut out = BytesMut::new();
        codec.encode(command, &mut out)?;
        stream.write_all(&out).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Collects everything the hub sends until it goes quiet
    ///
    /// Decoded messages are merged into the state store and remembered as the
    /// last response of their type. A read error drops the stream.
    pub async fn read(&mut self) -> Result<DrainReport> {
        self.ensure_connected()?;
        let mut closed = false;

        if let Some(stream) = self.stream.as_mut() {
            loop {
                let start = self.buffer.len();
                self.buffer.reserve(RECV_BUFFER_SIZE);
                match timeout(self.read_timeout, stream.read_buf(&mut self.buffer)).await {
                    Err(_) => break,
                    Ok(Ok(0)) => {
                        closed = true;
                        break;
                    }
                    Ok(Ok(n)) => {
                        trace!("received {} bytes", n);
                        self.trace
                            .on_bytes(Direction::Inbound, "recv", &self.buffer[start..]);
                    }
                    Ok(Err(e)) => {
                        self.stream = None;
                        self.buffer.clear();
                        return Err(e.into());
                    }
                }
            }
        }

        if closed {
            debug!("hub closed the connection");
            self.stream = None;
        }

        let mut report = self.process_buffer()?;
        report.closed = closed;
        Ok(report)
    }

    fn process_buffer(&mut self) -> Result<DrainReport> {
        let mut lines = Vec::new();
        while let Some(line) = self.codec.decode_eof(&mut self.buffer)? {
            lines.push(line);
        }

        let mut report = DrainReport::default();
        for frame in self.codec.assemble(lines) {
            match frame.and_then(|frame| frame.decode()) {
                Ok(message) => {
                    self.state.apply(&message);
                    self.last_responses
                        .insert(message.message_type(), message.clone());
                    report.messages.push(message);
                }
                Err(e) => {
                    warn!("dropping message: {}", e);
                    report.errors.push(e);
                }
            }
        }
        Ok(report)
    }
}
