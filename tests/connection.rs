use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};

use memkv::connection::Connection;
use memkv::frame::{self, Array, Frame};

/// Sets up a loopback socket pair: bytes sent on the returned channel appear
/// on the returned stream.
async fn create_tcp_connection() -> Result<(UnboundedSender<Vec<u8>>, TcpStream), std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            while let Some(data) = rx.recv().await {
                if socket.write_all(&data).await.is_err() {
                    break;
                }
            }
        }
    });

    let stream = TcpStream::connect(local_addr).await?;

    Ok((tx, stream))
}

async fn connect() -> (UnboundedSender<Vec<u8>>, Connection) {
    let (tx, stream) = create_tcp_connection().await.unwrap();
    let addr = stream.peer_addr().unwrap();
    (tx, Connection::new(stream, addr))
}

#[tokio::test]
async fn read_simple_string_frame() {
    let (tx, mut connection) = connect().await;

    tx.send(b"+OK\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Frame::Simple("OK".to_string()));
}

#[tokio::test]
async fn read_error_frame() {
    let (tx, mut connection) = connect().await;

    tx.send(b"-Error message\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Frame::Error("Error message".to_string()));
}

#[tokio::test]
async fn read_integer_frame() {
    let (tx, mut connection) = connect().await;

    tx.send(b":1000\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Frame::Integer(1000));
}

#[tokio::test]
async fn read_bulk_string_frame() {
    let (tx, mut connection) = connect().await;

    tx.send(b"$5\r\nhello\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Frame::Bulk(Bytes::from("hello")));
}

#[tokio::test]
async fn read_boolean_frame() {
    let (tx, mut connection) = connect().await;

    tx.send(b"#t\r\n".to_vec()).unwrap();
    tx.send(b"#f\r\n".to_vec()).unwrap();

    assert_eq!(
        connection.read_frame().await.unwrap(),
        Frame::Boolean(true)
    );
    assert_eq!(
        connection.read_frame().await.unwrap(),
        Frame::Boolean(false)
    );
}

#[tokio::test]
async fn read_null_frame() {
    let (tx, mut connection) = connect().await;

    tx.send(b"_\r\n".to_vec()).unwrap();

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Frame::Null);
}

#[tokio::test]
async fn read_array_frame() {
    let (tx, mut connection) = connect().await;

    tx.send(b"*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n".to_vec())
        .unwrap();

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(
        actual,
        Frame::Array(Array::from(vec![
            Frame::Bulk(Bytes::from("SET")),
            Frame::Bulk(Bytes::from("mykey")),
            Frame::Bulk(Bytes::from("myvalue")),
        ]))
    );
}

#[tokio::test]
async fn read_multiple_frames_sequentially() {
    let (tx, mut connection) = connect().await;

    tx.send(b"+OK\r\n".to_vec()).unwrap();
    tx.send(b"$5\r\nhello\r\n".to_vec()).unwrap();
    tx.send(b"*2\r\n$4\r\nPING\r\n$5\r\nhello\r\n".to_vec())
        .unwrap();
    tx.send(b":1000\r\n".to_vec()).unwrap();

    assert_eq!(
        connection.read_frame().await.unwrap(),
        Frame::Simple("OK".to_string())
    );
    assert_eq!(
        connection.read_frame().await.unwrap(),
        Frame::Bulk(Bytes::from("hello"))
    );
    assert_eq!(
        connection.read_frame().await.unwrap(),
        Frame::Array(Array::from(vec![
            Frame::Bulk(Bytes::from("PING")),
            Frame::Bulk(Bytes::from("hello")),
        ]))
    );
    assert_eq!(connection.read_frame().await.unwrap(), Frame::Integer(1000));
}

#[tokio::test]
async fn read_frame_arriving_in_parts() {
    let (tx, mut connection) = connect().await;

    // One command split into three writes to simulate partial arrival.
    // "*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n"
    let part1 = b"*3\r\n$3\r\nSE";
    let part2 = b"T\r\n$5\r\nmyke";
    let part3 = b"y\r\n$7\r\nmyvalue\r\n";

    tokio::spawn(async move {
        for part in [part1.to_vec(), part2.to_vec(), part3.to_vec()] {
            tx.send(part).unwrap();
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
    });

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(
        actual,
        Frame::Array(Array::from(vec![
            Frame::Bulk(Bytes::from("SET")),
            Frame::Bulk(Bytes::from("mykey")),
            Frame::Bulk(Bytes::from("myvalue")),
        ]))
    );
}

#[tokio::test]
async fn read_after_failed_decode_resumes_from_the_stream() {
    let (tx, mut connection) = connect().await;

    // The bad frame's bytes are lost; the following frame still decodes.
    tx.send(b"+he\rllo\r\n+OK\r\n".to_vec()).unwrap();

    let err = connection.read_frame().await.unwrap_err();
    assert!(matches!(err, frame::Error::InvalidSimpleString));

    let actual = connection.read_frame().await.unwrap();
    assert_eq!(actual, Frame::Simple("OK".to_string()));
}

#[tokio::test]
async fn read_frame_at_end_of_stream() {
    let (tx, mut connection) = connect().await;

    drop(tx);

    let err = connection.read_frame().await.unwrap_err();
    assert!(matches!(err, frame::Error::Eof));
}
