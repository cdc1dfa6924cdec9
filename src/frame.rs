// Wire format modeled on RESP: https://redis.io/docs/reference/protocol-spec

use bytes::Bytes;
use thiserror::Error as ThisError;

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("input contains invalid characters (CR or LF)")]
    InvalidSimpleString,
    #[error("not enough data to decode a valid frame")]
    NotEnoughData,
    #[error("unable to decode a valid frame from data")]
    Malformed,
    #[error("unknown frame type: {0}")]
    UnknownFrameType(u8),
    #[error("array reached its maximum capacity")]
    ArrayFull,
    /// End of stream. Normal termination of a connection, never reported to
    /// the client.
    #[error("end of stream")]
    Eof,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A typed, self-delimited unit of the wire protocol.
///
/// Frames are built either by the codec (from bytes) or by a command handler
/// (to build a reply), and are consumed on the hot path: an incoming frame is
/// eaten by the command parser, a reply frame is serialized then dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Boolean(bool),
    Null,
    Array(Array),
}

impl Frame {
    /// Builds a SimpleString frame, rejecting payloads that embed CR or LF.
    pub fn simple(s: impl Into<String>) -> Result<Frame, Error> {
        let s = s.into();
        if s.contains(['\r', '\n']) {
            return Err(Error::InvalidSimpleString);
        }
        Ok(Frame::Simple(s))
    }

    /// Builds an Error frame. The payload constraint is the same as for
    /// SimpleString.
    pub fn error(s: impl Into<String>) -> Result<Frame, Error> {
        let s = s.into();
        if s.contains(['\r', '\n']) {
            return Err(Error::InvalidSimpleString);
        }
        Ok(Frame::Error(s))
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleString));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleError));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let digits = i.to_string();
                let mut bytes = Vec::with_capacity(1 + digits.len() + CRLF.len());
                bytes.push(u8::from(DataType::Integer));
                bytes.extend_from_slice(digits.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(data) => {
                let length = data.len().to_string();
                let mut bytes =
                    Vec::with_capacity(1 + length.len() + CRLF.len() + data.len() + CRLF.len());
                bytes.push(u8::from(DataType::BulkString));
                bytes.extend_from_slice(length.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(data);
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Boolean(b) => {
                let letter = if *b { b't' } else { b'f' };
                let mut bytes = Vec::with_capacity(3 + CRLF.len());
                bytes.push(u8::from(DataType::Boolean));
                bytes.push(letter);
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Null => {
                let mut bytes = Vec::with_capacity(1 + CRLF.len());
                bytes.push(u8::from(DataType::Null));
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Array(array) => {
                let length = array.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length.len() + CRLF.len());
                bytes.push(u8::from(DataType::Array));
                bytes.extend_from_slice(length.as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in array.items() {
                    bytes.extend(frame.serialize());
                }
                bytes
            }
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

/// An ordered sequence of frames with a declared capacity. The capacity is
/// fixed at construction because the codec learns the element count from the
/// length prefix before any element is decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    size: usize,
    items: Vec<Frame>,
}

impl Array {
    pub fn with_capacity(size: usize) -> Array {
        Array {
            size,
            items: Vec::with_capacity(size),
        }
    }

    /// Appends a frame. Fails once the declared capacity is reached; the
    /// array never grows past it.
    pub fn push(&mut self, frame: Frame) -> Result<(), Error> {
        if self.items.len() >= self.size {
            return Err(Error::ArrayFull);
        }
        self.items.push(frame);
        Ok(())
    }

    /// Serialization emits the current element count, not the declared
    /// capacity.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize) -> Option<&Frame> {
        self.items.get(i)
    }

    pub fn items(&self) -> &[Frame] {
        &self.items
    }
}

impl From<Vec<Frame>> for Array {
    fn from(items: Vec<Frame>) -> Array {
        Array {
            size: items.len(),
            items,
        }
    }
}

impl IntoIterator for Array {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[derive(Debug)]
pub(crate) enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Boolean,      // '#'
    Null,         // '_'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'#' => Ok(Self::Boolean),
            b'_' => Ok(Self::Null),
            b'*' => Ok(Self::Array),
            _ => Err(Error::UnknownFrameType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Boolean => b'#',
            DataType::Null => b'_',
            DataType::Array => b'*',
        }
    }
}
