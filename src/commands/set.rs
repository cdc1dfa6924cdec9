use bytes::Bytes;

use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Cache;
use crate::Error;

#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
}

impl Set {
    pub async fn exec(self, cache: Cache) -> Result<Frame, Error> {
        cache.set(self.key, self.value).await?;
        Ok(Frame::simple("OK")?)
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        if parser.remaining() != 2 {
            return Err(CommandError::InvalidArgs);
        }
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}
