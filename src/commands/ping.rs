use bytes::Bytes;

use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Cache;
use crate::Error;

/// Replies PONG when called without an argument, otherwise echoes the
/// argument back as a bulk string.
#[derive(Debug, PartialEq)]
pub struct Ping {
    pub payload: Option<Bytes>,
}

impl Ping {
    pub async fn exec(self, _cache: Cache) -> Result<Frame, Error> {
        let res = match self.payload {
            Some(payload) => Frame::Bulk(payload),
            None => Frame::simple("PONG")?,
        };
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Ping {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let payload = match parser.remaining() {
            0 => None,
            1 => Some(parser.next_bytes()?),
            _ => return Err(CommandError::InvalidPing),
        };

        Ok(Self { payload })
    }
}
