use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec;
use crate::frame::{self, Frame};

/// One client connection: buffered halves of the socket plus the peer
/// address for logging. Lives from accept until EOF, shutdown or an
/// unrecoverable socket error.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    pub addr: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Connection {
        let (read_half, write_half) = stream.into_split();
        Connection {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            addr,
        }
    }

    /// Reads the next frame off the socket. Failed decodes lose the bytes
    /// consumed so far; the next call picks up after them.
    pub async fn read_frame(&mut self) -> Result<Frame, frame::Error> {
        codec::decode(&mut self.reader).await
    }

    /// Writes one frame and flushes it out.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.writer.write_all(&frame.serialize()).await?;
        self.writer.flush().await
    }

    /// Reports a failure to the client as an Error frame. The connection
    /// stays usable afterwards.
    pub async fn send_error(&mut self, message: &str) -> io::Result<()> {
        let frame = match Frame::error(message) {
            Ok(frame) => frame,
            // Error text with embedded CR/LF cannot go on the wire as-is.
            Err(_) => Frame::Error("protocol error".to_string()),
        };
        self.write_frame(&frame).await
    }

    /// Flushes anything still buffered and shuts the write half down.
    pub async fn close(&mut self) -> io::Result<()> {
        debug!("closing connection to {}", self.addr);
        self.writer.flush().await?;
        self.writer.shutdown().await
    }
}
