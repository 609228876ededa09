use std::hint::black_box;

use bencher::TestFile;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use micro_net::protocol::{Cookie, Header, HttpResponse};

static FULL_COOKIE: TestFile = TestFile::new("full.txt", include_bytes!("../resources/cookie/full.txt"));
static CHUNKED: TestFile = TestFile::new("chunked.txt", include_bytes!("../resources/response/chunked.txt"));

fn benchmark_cookie(criterion: &mut Criterion) {
    let raw = std::str::from_utf8(FULL_COOKIE.content()).expect("cookie fixture is utf-8");
    let mut group = criterion.benchmark_group("cookie");
    group.throughput(Throughput::Bytes(raw.len() as u64));

    group.bench_function("parse", |b| b.iter(|| Cookie::parse(black_box(raw)).expect("fixture should be a valid cookie")));

    let cookie = Cookie::parse(raw).expect("fixture should be a valid cookie");
    group.bench_function("serialize", |b| b.iter(|| black_box(&cookie).to_string()));

    group.finish();
}

fn benchmark_header(criterion: &mut Criterion) {
    let lines: Vec<&[u8]> = CHUNKED
        .content()
        .split(|&b| b == b'\n')
        .skip(1)
        .take_while(|line| *line != b"\r")
        .collect();

    let mut group = criterion.benchmark_group("header");
    group.bench_function("parse_lines", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(Header::parse(line).expect("fixture should hold valid headers"));
            }
        });
    });

    let response = HttpResponse::parse(CHUNKED.content()).expect("fixture should be a valid response");
    group.bench_function("serialize_response", |b| b.iter(|| black_box(&response).to_bytes()));

    group.finish();
}

criterion_group!(protocol, benchmark_cookie, benchmark_header);
criterion_main!(protocol);
