//! Framer behavior over real TCP sockets

use std::io::Write;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;

use lan_av_streamer::constants::DEFAULT_MAX_FRAME_SIZE;
use lan_av_streamer::error::StreamError;
use lan_av_streamer::protocol::{read_frame, write_frame, FramedReader, FramedWriter};

fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

#[test]
fn test_mixed_sizes_including_empty_arrive_in_order() {
    let (client, server) = socket_pair();
    let payloads: Vec<Vec<u8>> = vec![
        (0..10).collect(),
        Vec::new(),
        (0..65536u32).map(|i| (i * 7 % 256) as u8).collect(),
    ];

    let sent = payloads.clone();
    let writer = thread::spawn(move || {
        let mut framed = FramedWriter::new(client, DEFAULT_MAX_FRAME_SIZE);
        for payload in &sent {
            framed.send(payload).unwrap();
        }
        framed.get_ref().shutdown(Shutdown::Write).unwrap();
    });

    let mut reader = FramedReader::new(server, DEFAULT_MAX_FRAME_SIZE);
    for expected in &payloads {
        assert_eq!(&reader.recv().unwrap()[..], &expected[..]);
    }
    assert!(matches!(reader.recv(), Err(StreamError::ConnectionClosed)));
    assert_eq!(reader.frames_read(), 3);
    writer.join().unwrap();
}

#[test]
fn test_close_after_half_header() {
    let (mut client, mut server) = socket_pair();
    client.write_all(&[0, 0]).unwrap();
    drop(client);

    let err = read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).unwrap_err();
    assert!(matches!(err, StreamError::ConnectionClosed));
}

#[test]
fn test_close_inside_payload() {
    let (mut client, mut server) = socket_pair();
    client.write_all(&100u32.to_be_bytes()).unwrap();
    client.write_all(&[1u8; 40]).unwrap();
    drop(client);

    match read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE) {
        Err(StreamError::TruncatedFrame { expected, received }) => {
            assert_eq!(expected, 100);
            assert_eq!(received, 40);
        }
        other => panic!("expected truncation, got {:?}", other.map(|b| b.len())),
    }
}

#[test]
fn test_oversized_header_rejected_without_reading_payload() {
    let (mut client, mut server) = socket_pair();
    client.write_all(&u32::MAX.to_be_bytes()).unwrap();

    let err = read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).unwrap_err();
    assert!(matches!(
        err,
        StreamError::FrameTooLarge { len, max } if len == u32::MAX as usize && max == DEFAULT_MAX_FRAME_SIZE
    ));

    // The writer side still works: the socket was not torn down by the check
    write_frame(&mut client, b"ok").unwrap();
}
