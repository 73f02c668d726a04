use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;

use super::*;
use crate::proto::InstanceId;
use crate::proto::Request;
use crate::proto::RequestEnvelope;
use crate::proto::Value;
use crate::proto::MAX_VALUE_DEPTH;
use crate::test_utils::nested_args_payload;
use crate::NetworkError;

#[test]
fn frame_survives_length_prefixing() {
    let envelope = RequestEnvelope {
        request_id: 9,
        request: Request::ExecuteAction {
            instance_id: InstanceId::from("vm-1-abc"),
            action_name: "add".into(),
            args: vec![Value::Int(2), Value::from("x")],
        },
    };

    let mut codec = frame_codec(1024);
    let mut buf = BytesMut::new();
    codec.encode(encode_frame(&envelope).unwrap(), &mut buf).unwrap();
    assert_eq!(&buf[..4], &((buf.len() - 4) as u32).to_be_bytes());

    let frame = codec.decode(&mut buf).unwrap().expect("one full frame");
    assert_eq!(decode_frame::<RequestEnvelope>(&frame).unwrap(), envelope);
}

#[test]
fn partial_frame_waits_for_more_bytes() {
    let mut codec = frame_codec(1024);
    let mut buf = BytesMut::new();
    codec
        .encode(encode_frame(&RequestEnvelope {
            request_id: 1,
            request: Request::CreateInstance {
                type_name: "counter".into(),
            },
        })
        .unwrap(), &mut buf)
        .unwrap();

    let mut head = buf.split_to(buf.len() - 1);
    assert!(codec.decode(&mut head).unwrap().is_none());
}

#[test]
fn oversized_frame_is_rejected() {
    let mut codec = frame_codec(16);
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&64u32.to_be_bytes());
    buf.extend_from_slice(&[0u8; 64]);

    assert!(codec.decode(&mut buf).is_err());
}

#[test]
fn garbage_payload_is_a_codec_error() {
    let result = decode_frame::<RequestEnvelope>(&[0xff, 0xff, 0xff]);

    assert!(matches!(result, Err(NetworkError::Codec(_))));
}

fn args_of(envelope: RequestEnvelope) -> Vec<Value> {
    match envelope.request {
        Request::ExecuteAction { args, .. } => args,
        other => panic!("unexpected request {other:?}"),
    }
}

#[test]
fn nesting_up_to_the_limit_decodes() {
    let payload = nested_args_payload(3, MAX_VALUE_DEPTH);

    let args = args_of(decode_frame::<RequestEnvelope>(&payload).unwrap());

    let mut depth = 0;
    let mut current = &args[0];
    while let Value::Array(items) = current {
        depth += 1;
        current = &items[0];
    }
    assert_eq!(depth, MAX_VALUE_DEPTH);
    assert!(current.is_null());
}

#[test]
fn nesting_past_the_limit_is_a_codec_error() {
    let payload = nested_args_payload(4, MAX_VALUE_DEPTH + 1);

    let result = decode_frame::<RequestEnvelope>(&payload);

    assert!(matches!(result, Err(NetworkError::Codec(_))));
}

#[test]
fn hostile_nesting_fails_without_exhausting_the_stack() {
    // 2.4 MB, within the default frame limit
    let payload = nested_args_payload(5, 200_000);

    // Half of a tokio worker thread's default stack
    let result = std::thread::Builder::new()
        .stack_size(1024 * 1024)
        .spawn(move || decode_frame::<RequestEnvelope>(&payload).map(|_| ()))
        .unwrap()
        .join()
        .unwrap();

    assert!(matches!(result, Err(NetworkError::Codec(_))));
}
