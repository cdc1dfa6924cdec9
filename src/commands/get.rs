use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Cache;
use crate::Error;

#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Get {
    pub async fn exec(self, cache: Cache) -> Result<Frame, Error> {
        let value = cache.get(&self.key).await?;

        match value {
            Some(value) => Ok(Frame::Bulk(value)),
            None => Ok(Frame::Null),
        }
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        if parser.remaining() != 1 {
            return Err(CommandError::InvalidArgs);
        }
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}
