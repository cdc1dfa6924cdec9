use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::frame::{Array, DataType, Error, Frame, CRLF};

/// Decodes one frame from a buffered byte stream.
///
/// The first byte identifies the frame type; the rest of the bytes constitute
/// the type's contents. On any decode failure, the bytes consumed so far are
/// lost: the reader is left positioned after them, and the caller is expected
/// to report the error and try to decode the next frame from whatever
/// remains. This trades in-stream resynchronization for simplicity.
pub async fn decode<R>(reader: &mut R) -> Result<Frame, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    let tag = read_byte(reader).await?;
    match DataType::try_from(tag)? {
        DataType::SimpleString => {
            let line = read_simple_line(reader).await?;
            Frame::simple(line)
        }
        DataType::SimpleError => {
            let line = read_simple_line(reader).await?;
            Frame::error(line)
        }
        DataType::Integer => {
            let line = read_simple_line(reader).await?;
            let integer = line.parse::<i64>().map_err(|_| Error::Malformed)?;
            Ok(Frame::Integer(integer))
        }
        DataType::BulkString => decode_bulk_string(reader).await,
        DataType::Boolean => {
            let line = read_simple_line(reader).await?;
            match line.as_str() {
                "t" => Ok(Frame::Boolean(true)),
                "f" => Ok(Frame::Boolean(false)),
                _ => Err(Error::Malformed),
            }
        }
        DataType::Null => {
            let line = read_simple_line(reader).await?;
            if !line.is_empty() {
                return Err(Error::Malformed);
            }
            Ok(Frame::Null)
        }
        DataType::Array => decode_array(reader).await,
    }
}

async fn read_byte<R>(reader: &mut R) -> Result<u8, Error>
where
    R: AsyncBufRead + Unpin,
{
    match reader.read_u8().await {
        Ok(byte) => Ok(byte),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::Eof),
        Err(e) => Err(e.into()),
    }
}

/// Reads bytes up to and including the next LF and strips the trailing CRLF.
/// A stream that ends before the LF is reported as end of stream.
async fn read_crlf_line<R>(reader: &mut R) -> Result<Vec<u8>, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line).await?;
    if read == 0 || line.last() != Some(&b'\n') {
        return Err(Error::Eof);
    }
    if line.len() < 2 {
        return Err(Error::NotEnoughData);
    }
    if line[line.len() - 2] != b'\r' {
        return Err(Error::InvalidSimpleString);
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

/// Reads a CRLF line that must not embed a CR. An embedded LF is impossible
/// after a successful CRLF line read. Used for SimpleString and Error bodies,
/// length prefixes, the Boolean letter and the empty Null body.
async fn read_simple_line<R>(reader: &mut R) -> Result<String, Error>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_crlf_line(reader).await?;
    if line.contains(&b'\r') {
        return Err(Error::InvalidSimpleString);
    }
    String::from_utf8(line).map_err(|_| Error::Malformed)
}

/// A bulk string is length-prefixed and is the only frame whose payload may
/// contain CR or LF, so it is accumulated in LF-terminated chunks until the
/// declared length plus the trailing CRLF is reached.
async fn decode_bulk_string<R>(reader: &mut R) -> Result<Frame, Error>
where
    R: AsyncBufRead + Unpin,
{
    let prefix = read_simple_line(reader).await?;
    let length = prefix.parse::<usize>().map_err(|_| Error::Malformed)?;

    let mut data = Vec::with_capacity(length + CRLF.len());
    while data.len() < length + CRLF.len() {
        let read = reader.read_until(b'\n', &mut data).await?;
        if read == 0 || data.last() != Some(&b'\n') {
            return Err(Error::Eof);
        }
    }
    if data.len() > length + CRLF.len() || !data.ends_with(CRLF) {
        return Err(Error::Malformed);
    }
    data.truncate(length);

    Ok(Frame::Bulk(Bytes::from(data)))
}

async fn decode_array<R>(reader: &mut R) -> Result<Frame, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    let prefix = read_simple_line(reader).await?;
    let length = prefix.parse::<usize>().map_err(|_| Error::Malformed)?;

    let mut array = Array::with_capacity(length);
    for _ in 0..length {
        // A failed child abandons the whole array.
        let child = Box::pin(decode(reader)).await?;
        array.push(child)?;
    }

    Ok(Frame::Array(array))
}
