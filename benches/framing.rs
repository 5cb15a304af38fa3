use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;

use lan_av_streamer::codec::{FrameCodec, JpegCodec};
use lan_av_streamer::constants::{DEFAULT_MAX_FRAME_SIZE, FRAME_HEIGHT, FRAME_WIDTH};
use lan_av_streamer::device::VideoSource;
use lan_av_streamer::protocol::{read_frame, write_frame};
use lan_av_streamer::video::TestPatternSource;

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");

    for size in [1024usize, 64 * 1024, 512 * 1024] {
        let payload = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("write", size), &payload, |b, payload| {
            let mut wire = Vec::with_capacity(size + 4);
            b.iter(|| {
                wire.clear();
                write_frame(&mut wire, black_box(payload)).unwrap();
            });
        });

        let mut wire = Vec::new();
        write_frame(&mut wire, &payload).unwrap();
        group.bench_with_input(BenchmarkId::new("read", size), &wire, |b, wire| {
            b.iter(|| {
                let mut cursor = Cursor::new(black_box(wire.as_slice()));
                read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_jpeg(c: &mut Criterion) {
    let mut source = TestPatternSource::open(FRAME_WIDTH, FRAME_HEIGHT).unwrap();
    let frame = source.capture().unwrap();
    let mut codec = JpegCodec::default();
    let payload = codec.encode(frame.clone()).unwrap();

    c.bench_function("jpeg_encode_640x480", |b| {
        b.iter(|| codec.encode(black_box(frame.clone())).unwrap())
    });

    let mut decoder = JpegCodec::default();
    c.bench_function("jpeg_decode_640x480", |b| {
        b.iter(|| decoder.decode(black_box(&payload)).unwrap())
    });
}

criterion_group!(benches, bench_framing, bench_jpeg);
criterion_main!(benches);
