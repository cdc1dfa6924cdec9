use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Cache;
use crate::Error;

/// Removes one or more keys and replies with the count actually removed.
/// Absent keys are skipped and do not contribute to the count.
#[derive(Debug, PartialEq)]
pub struct Del {
    pub keys: Vec<String>,
}

impl Del {
    pub async fn exec(self, cache: Cache) -> Result<Frame, Error> {
        let removed = cache.delete(self.keys).await?;
        Ok(Frame::Integer(removed))
    }
}

impl TryFrom<&mut CommandParser> for Del {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        if parser.remaining() == 0 {
            return Err(CommandError::InvalidArgs);
        }

        let mut keys = Vec::with_capacity(parser.remaining());
        while parser.remaining() > 0 {
            keys.push(parser.next_string()?);
        }

        Ok(Self { keys })
    }
}
