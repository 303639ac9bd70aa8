//! Benchmarks for tinyrpc wire encoding

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tinyrpc::demo::GetByIdReq;
use tinyrpc::protocol::{decode_request, encode_request, read_frame, Request};
use tinyrpc::{Codec, Serializer};

fn sample_request() -> Request {
    let data = Codec::JSON.encode(&GetByIdReq { id: 123 }).unwrap_or_default();
    let mut req = Request::new("user-service", "GetById", Codec::JSON.code(), data);
    req.message_id = 7;
    req.meta.insert("trace-id".to_string(), "123".to_string());
    req.meta.insert("shadow".to_string(), "true".to_string());
    req.set_lengths();
    req
}

fn codec_benchmarks(c: &mut Criterion) {
    let req = sample_request();
    let encoded = encode_request(&req).unwrap_or_default();

    c.bench_function("encode_request", |b| {
        b.iter(|| encode_request(black_box(&req)))
    });

    c.bench_function("decode_request", |b| {
        b.iter(|| decode_request(black_box(&encoded)))
    });

    c.bench_function("read_frame", |b| {
        b.iter(|| read_frame(&mut Cursor::new(black_box(&encoded[..]))))
    });

    c.bench_function("bincode_payload", |b| {
        b.iter(|| Codec::BINCODE.encode(black_box(&GetByIdReq { id: 123 })))
    });
}

criterion_group!(benches, codec_benchmarks);
criterion_main!(benches);
