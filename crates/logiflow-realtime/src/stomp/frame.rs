//! STOMP frame encoding and decoding.

use std::fmt;

use crate::error::ChannelError;

/// STOMP frame commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Broker handshake reply.
    Connected,
    /// Publish to a destination.
    Send,
    /// Start receiving from a destination.
    Subscribe,
    /// Stop receiving.
    Unsubscribe,
    /// Graceful client shutdown.
    Disconnect,
    /// Broker-delivered message.
    Message,
    /// Broker acknowledgement of a `receipt` header.
    Receipt,
    /// Broker-side failure; the broker closes the connection after it.
    Error,
}

impl Command {
    /// Wire name of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Result<Self, ChannelError> {
        match s {
            "CONNECT" | "STOMP" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SEND" => Ok(Self::Send),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "DISCONNECT" => Ok(Self::Disconnect),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(ChannelError::ProtocolError(format!(
                "Unknown STOMP command '{other}'"
            ))),
        }
    }

    /// CONNECT and CONNECTED headers are sent verbatim.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order. Repeated names keep their first value.
    pub headers: Vec<(String, String)>,
    /// Frame body (text only).
    pub body: String,
}

impl Frame {
    /// A frame with no headers and an empty body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to wire text, NUL-terminated.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(32 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Decode every frame in a WebSocket text message.
///
/// Heart-beat EOLs between or around frames are skipped, so a message that
/// is only a heart-beat yields an empty list.
pub fn decode_frames(text: &str) -> Result<Vec<Frame>, ChannelError> {
    let mut frames = Vec::new();
    let mut rest = text;
    loop {
        rest = rest.trim_start_matches(['\n', '\r']);
        if rest.is_empty() {
            return Ok(frames);
        }
        let (frame, tail) = decode_one(rest)?;
        frames.push(frame);
        rest = tail;
    }
}

fn decode_one(input: &str) -> Result<(Frame, &str), ChannelError> {
    let (command_line, mut rest) = next_line(input)?;
    let command = Command::parse(command_line)?;
    let unescape = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, tail) = next_line(rest)?;
        rest = tail;
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').ok_or_else(|| {
            ChannelError::ProtocolError(format!("Malformed STOMP header '{line}'"))
        })?;
        if unescape {
            headers.push((unescape_header(name), unescape_header(value)));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let declared_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.trim().parse::<usize>().ok());

    let (body, tail) = match declared_length.and_then(|n| Some((rest.get(..n)?, rest.get(n..)?))) {
        Some((body, tail)) => (body, tail.strip_prefix('\0').unwrap_or(tail)),
        None => match rest.split_once('\0') {
            Some((body, tail)) => (body, tail),
            None => (rest, ""),
        },
    };

    Ok((
        Frame {
            command,
            headers,
            body: body.to_string(),
        },
        tail,
    ))
}

fn next_line(input: &str) -> Result<(&str, &str), ChannelError> {
    let (line, rest) = input
        .split_once('\n')
        .ok_or_else(|| ChannelError::ProtocolError("Truncated STOMP frame".into()))?;
    Ok((line.strip_suffix('\r').unwrap_or(line), rest))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
