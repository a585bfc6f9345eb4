use shoal_wire::{
    framing::{write_frame, FrameReader, FRAME_POSTFIX, MAX_FRAME_SIZE},
    WireError,
};
use tokio::io::{duplex, sink, AsyncWriteExt};

#[tokio::test]
async fn frame_roundtrip() {
    let (mut tx, rx) = duplex(128);
    let payload = b"{\"hello\":1}".to_vec();

    let write_task = tokio::spawn(async move { write_frame(&mut tx, &payload).await });
    let mut reader = FrameReader::new(rx);
    let read_payload = reader.read_frame().await.expect("read should succeed");

    write_task
        .await
        .expect("join should succeed")
        .expect("write should succeed");
    assert_eq!(read_payload, b"{\"hello\":1}");
}

#[tokio::test]
async fn bytes_past_the_sentinel_belong_to_the_next_frame() {
    let (mut tx, rx) = duplex(256);

    // Two frames delivered in a single write.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"first");
    bytes.extend_from_slice(FRAME_POSTFIX);
    bytes.extend_from_slice(b"second");
    bytes.extend_from_slice(FRAME_POSTFIX);
    tx.write_all(&bytes).await.expect("write should succeed");

    let mut reader = FrameReader::new(rx);
    assert_eq!(reader.read_frame().await.expect("first frame"), b"first");
    assert_eq!(reader.read_frame().await.expect("second frame"), b"second");
}

#[tokio::test]
async fn reject_oversized_frame() {
    let mut writer = sink();
    let payload = vec![0_u8; MAX_FRAME_SIZE + 1];

    let err = write_frame(&mut writer, &payload)
        .await
        .expect_err("oversized frame must fail");

    match err {
        WireError::FrameTooLarge { .. } => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn closed_stream_without_sentinel_is_a_disconnect() {
    let (mut tx, rx) = duplex(128);

    tx.write_all(b"truncated payload")
        .await
        .expect("partial write should succeed");
    drop(tx);

    let mut reader = FrameReader::new(rx);
    let err = reader
        .read_frame()
        .await
        .expect_err("truncated frame should fail");

    match err {
        WireError::Disconnected => {}
        other => panic!("unexpected error: {other}"),
    }
}
