//! Wake message exchanged over the session socket.
//!
//! One JSON object per connection, terminated by a newline:
//!
//! ```json
//! {"command":"end","sender_pid":4242,"reason":"external"}
//! ```

use std::io::{self, BufRead, BufReader, Read, Write};

use serde::{Deserialize, Serialize};

/// Upper bound on what the waiter reads from a single connection.
const MAX_MESSAGE_LEN: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    End,
}

/// Why a session was woken. Logged only; every reason ends the wait the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeReason {
    /// `end` issued by another process.
    External,
    /// The session's own deadline elapsed.
    Deadline,
    /// The owning process received a termination signal.
    Interrupt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeMessage {
    pub command: Command,
    pub sender_pid: u32,
    pub reason: WakeReason,
}

impl WakeMessage {
    pub fn end(reason: WakeReason) -> Self {
        Self {
            command: Command::End,
            sender_pid: std::process::id(),
            reason,
        }
    }

    pub fn write_to(&self, mut writer: impl Write) -> io::Result<()> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        writer.write_all(&line)?;
        writer.flush()
    }

    /// Read one message. `Ok(None)` when the peer sent nothing usable.
    pub fn read_from(reader: impl Read) -> io::Result<Option<Self>> {
        let mut line = String::new();
        BufReader::new(reader.take(MAX_MESSAGE_LEN)).read_line(&mut line)?;
        Ok(serde_json::from_str(line.trim_end()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_is_one_json_line() {
        let message = WakeMessage {
            command: Command::End,
            sender_pid: 42,
            reason: WakeReason::Deadline,
        };
        let mut buf = Vec::new();
        message.write_to(&mut buf).expect("write");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "{\"command\":\"end\",\"sender_pid\":42,\"reason\":\"deadline\"}\n"
        );
    }

    #[test]
    fn garbage_is_not_a_message() {
        let parsed = WakeMessage::read_from(&b"hello\n"[..]).expect("read");
        assert!(parsed.is_none());
        let parsed = WakeMessage::read_from(&b""[..]).expect("read");
        assert!(parsed.is_none());
    }

    #[test]
    fn reads_message_without_trailing_newline() {
        let raw = br#"{"command":"end","sender_pid":7,"reason":"external"}"#;
        let parsed = WakeMessage::read_from(&raw[..]).expect("read");
        assert_eq!(parsed.map(|m| m.reason), Some(WakeReason::External));
    }
}
