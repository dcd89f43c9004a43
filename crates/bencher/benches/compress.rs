use bencher::{PayloadKind, TestCase};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use http::header::{ACCEPT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use micro_compress::{
    AlgorithmConfig, CodecPools, CompressOptions, Compression, DEFAULT_LEVEL, Encoding, MemoryResponse, ResponseWriter,
    negotiate, parse_accept_encoding,
};
use std::hint::black_box;
use std::sync::Arc;

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("small_html", PayloadKind::Html),
        TestCase::normal("normal_json", PayloadKind::Json),
        TestCase::large("large_html", PayloadKind::Html),
    ]
}

static ACCEPT_ENCODINGS: [(&str, &str); 4] = [
    ("browser", "gzip, deflate, br, zstd"),
    ("weighted", "br;q=1.0, gzip;q=0.8, deflate;q=0.6, zstd;q=0.4, identity;q=0.1"),
    ("wildcard", "*"),
    ("noisy", " , GZIP ; Q=0.5 ;level=1,, x-custom;q=abc, deflate;q=0.25, *;q=0"),
];

fn benchmark_negotiate(criterion: &mut Criterion) {
    let priority = Encoding::ALL;
    let mut group = criterion.benchmark_group("negotiate");

    for (name, header) in ACCEPT_ENCODINGS {
        group.bench_with_input(BenchmarkId::from_parameter(name), header, |b, header| {
            b.iter(|| {
                let prefs = parse_accept_encoding(black_box(header));
                black_box(negotiate(&prefs, |_| true, &priority))
            });
        });
    }

    group.finish();
}

fn benchmark_codec_stream(criterion: &mut Criterion) {
    let test_cases = create_test_cases();
    let pools = CodecPools::new();
    let mut group = criterion.benchmark_group("codec_stream");

    for case in &test_cases {
        group.throughput(Throughput::Bytes(case.payload().body().len() as u64));
        for encoding in Encoding::ALL {
            for pooled in [true, false] {
                let id = format!("{}/{encoding}/{}", case.name(), if pooled { "pooled" } else { "fresh" });
                group.bench_with_input(BenchmarkId::from_parameter(id), case, |b, case| {
                    b.iter_batched_ref(
                        || Vec::with_capacity(case.payload().body().len()),
                        |sink| {
                            let mut stream = pools.acquire(encoding, DEFAULT_LEVEL, pooled).expect("default level is valid");
                            stream.write(case.payload().body(), sink).expect("vec sink never fails");
                            stream.close(sink).expect("vec sink never fails");
                            pools.release(stream, pooled);
                            black_box(sink.len());
                        },
                        BatchSize::SmallInput,
                    );
                });
            }
        }
    }

    group.finish();
}

fn benchmark_middleware(criterion: &mut Criterion) {
    let test_cases = create_test_cases();
    let options = CompressOptions::builder()
        .algorithm(Encoding::Zstd, AlgorithmConfig::with_level(3))
        .algorithm(Encoding::Gzip, AlgorithmConfig::default())
        .algorithm(Encoding::Deflate, AlgorithmConfig::default())
        .build();
    let compression = Compression::with_pools(options, Arc::new(CodecPools::new()));
    let mut group = criterion.benchmark_group("middleware");

    for case in &test_cases {
        group.throughput(Throughput::Bytes(case.payload().body().len() as u64));
        for accept in ["zstd", "gzip", "deflate", "identity"] {
            let mut request_headers = HeaderMap::new();
            request_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(accept));
            let content_type = HeaderValue::from_static(case.payload().content_type());

            let id = format!("{}/{accept}", case.name());
            group.bench_with_input(BenchmarkId::from_parameter(id), case, |b, case| {
                b.iter_batched_ref(
                    MemoryResponse::new,
                    |response| {
                        compression.handle(&request_headers, response, |response| {
                            response.headers_mut().insert(CONTENT_TYPE, content_type.clone());
                            response.write(case.payload().body()).expect("memory response never fails");
                        });
                        black_box(response.body().len());
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

criterion_group!(compress, benchmark_negotiate, benchmark_codec_stream, benchmark_middleware);
criterion_main!(compress);
