pub mod del;
pub mod get;
pub mod ping;
pub mod set;

use std::{str, vec};

use bytes::Bytes;
use thiserror::Error as ThisError;

use crate::frame::Frame;
use crate::store::Cache;
use crate::Error;

use del::Del;
use get::Get;
use ping::Ping;
use set::Set;

/// A command issued to the cache server, parsed from an Array frame whose
/// first element is a bulk string naming it (matched case-insensitively).
#[derive(Debug, PartialEq)]
pub enum Command {
    Ping(Ping),
    Get(Get),
    Set(Set),
    Del(Del),
}

impl Command {
    /// Applies the command against the cache and returns the single reply
    /// frame to write back to the client.
    pub async fn exec(self, cache: Cache) -> Result<Frame, Error> {
        match self {
            Command::Ping(cmd) => cmd.exec(cache).await,
            Command::Get(cmd) => cmd.exec(cache).await,
            Command::Set(cmd) => cmd.exec(cache).await,
            Command::Del(cmd) => cmd.exec(cache).await,
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands as arrays of bulk strings.
        let frames = match frame {
            Frame::Array(array) => array,
            _ => return Err(CommandError::NotACommand),
        };

        let parser = &mut CommandParser {
            parts: frames.into_iter(),
        };

        let command_name = parser.command_name()?;

        match &command_name[..] {
            "ping" => Ping::try_from(parser).map(Command::Ping),
            "get" => Get::try_from(parser).map(Command::Get),
            "set" => Set::try_from(parser).map(Command::Set),
            "del" => Del::try_from(parser).map(Command::Del),
            _ => Err(CommandError::Unknown),
        }
    }
}

pub(crate) struct CommandParser {
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    /// Extracts the command name from the first element, lowercased for
    /// dispatch. Anything but a bulk string there means the frame is not a
    /// command at all.
    fn command_name(&mut self) -> Result<String, CommandError> {
        match self.parts.next() {
            Some(Frame::Bulk(bytes)) => str::from_utf8(&bytes)
                .map(|name| name.to_lowercase())
                .map_err(CommandError::InvalidUtf8),
            _ => Err(CommandError::NotACommand),
        }
    }

    /// Arguments not yet consumed.
    fn remaining(&self) -> usize {
        self.parts.len()
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        match self.parts.next() {
            Some(Frame::Bulk(bytes)) => Ok(bytes),
            _ => Err(CommandError::InvalidArgs),
        }
    }

    fn next_string(&mut self) -> Result<String, CommandError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes)
            .map(|s| s.to_string())
            .map_err(CommandError::InvalidUtf8)
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("command should be an array of bulk strings")]
    NotACommand,
    #[error("command not found")]
    Unknown,
    #[error("wrong number of arguments or invalid argument type")]
    InvalidArgs,
    #[error("ping command is malformed")]
    InvalidPing,
    #[error("invalid UTF-8 in command argument")]
    InvalidUtf8(#[from] str::Utf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Array;

    fn command_frame(parts: &[&str]) -> Frame {
        Frame::Array(Array::from(
            parts
                .iter()
                .map(|part| Frame::Bulk(Bytes::copy_from_slice(part.as_bytes())))
                .collect::<Vec<_>>(),
        ))
    }

    #[test]
    fn parse_get_command() {
        let cmd = Command::try_from(command_frame(&["GET", "foo"])).unwrap();
        assert_eq!(
            cmd,
            Command::Get(Get {
                key: "foo".to_string()
            })
        );
    }

    #[test]
    fn parse_set_command() {
        let cmd = Command::try_from(command_frame(&["SET", "foo", "bar"])).unwrap();
        assert_eq!(
            cmd,
            Command::Set(Set {
                key: "foo".to_string(),
                value: Bytes::from("bar")
            })
        );
    }

    #[test]
    fn command_name_is_case_insensitive() {
        let cmd = Command::try_from(command_frame(&["PiNg"])).unwrap();
        assert_eq!(cmd, Command::Ping(Ping { payload: None }));
    }

    #[test]
    fn unknown_command_name() {
        let err = Command::try_from(command_frame(&["NOPE"])).unwrap_err();
        assert_eq!(err, CommandError::Unknown);
        assert_eq!(err.to_string(), "command not found");
    }

    #[test]
    fn top_level_frame_must_be_an_array() {
        let err = Command::try_from(Frame::Simple("GET".to_string())).unwrap_err();
        assert_eq!(err, CommandError::NotACommand);
    }

    #[test]
    fn empty_array_is_not_a_command() {
        let err = Command::try_from(Frame::Array(Array::with_capacity(0))).unwrap_err();
        assert_eq!(err, CommandError::NotACommand);
    }

    #[test]
    fn command_name_must_be_a_bulk_string() {
        let frame = Frame::Array(Array::from(vec![
            Frame::Simple("GET".to_string()),
            Frame::Bulk(Bytes::from("foo")),
        ]));
        let err = Command::try_from(frame).unwrap_err();
        assert_eq!(err, CommandError::NotACommand);
    }

    #[test]
    fn arguments_must_be_bulk_strings() {
        let frame = Frame::Array(Array::from(vec![
            Frame::Bulk(Bytes::from("GET")),
            Frame::Integer(42),
        ]));
        let err = Command::try_from(frame).unwrap_err();
        assert_eq!(err, CommandError::InvalidArgs);
    }

    #[test]
    fn get_requires_exactly_one_key() {
        let err = Command::try_from(command_frame(&["GET"])).unwrap_err();
        assert_eq!(err, CommandError::InvalidArgs);

        let err = Command::try_from(command_frame(&["GET", "a", "b"])).unwrap_err();
        assert_eq!(err, CommandError::InvalidArgs);
    }

    #[test]
    fn set_requires_key_and_value() {
        let err = Command::try_from(command_frame(&["SET", "a"])).unwrap_err();
        assert_eq!(err, CommandError::InvalidArgs);

        let err = Command::try_from(command_frame(&["SET", "a", "b", "c"])).unwrap_err();
        assert_eq!(err, CommandError::InvalidArgs);
    }

    #[test]
    fn ping_with_two_arguments_is_malformed() {
        let err = Command::try_from(command_frame(&["PING", "a", "b"])).unwrap_err();
        assert_eq!(err, CommandError::InvalidPing);
    }
}
