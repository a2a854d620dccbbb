use std::hint::black_box;
use bencher::{BROWSER_ACCEPT, CURL_ACCEPT, TestCase, WEIGHTED_ACCEPT};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use micro_rest::mimetype::{best_match, parse_accept_header};

const OFFERED: [&str; 3] = ["application/json", "text/plain", "text/csv"];

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("curl_accept", CURL_ACCEPT),
        TestCase::normal("browser_accept", BROWSER_ACCEPT),
        TestCase::large("weighted_accept", WEIGHTED_ACCEPT),
    ]
}

fn benchmark_parse_accept(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("parse_accept_header");

    for case in create_test_cases() {
        group.throughput(Throughput::Bytes(case.input().content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter(|| black_box(parse_accept_header(black_box(case.input().content()))));
        });
    }

    group.finish();
}

fn benchmark_best_match(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("best_match");

    for case in create_test_cases() {
        let accept = parse_accept_header(case.input().content());
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &accept, |b, accept| {
            b.iter(|| black_box(best_match(black_box(accept), &OFFERED, Some("application/json"))));
        });
    }

    group.finish();
}

criterion_group!(negotiation, benchmark_parse_accept, benchmark_best_match);
criterion_main!(negotiation);
