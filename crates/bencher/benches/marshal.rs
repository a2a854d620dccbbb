use std::hint::black_box;
use bencher::{FLAT_MASK, NESTED_MASK, TestCase, TestInput, todos};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use micro_rest::{Field, Mask, Model, marshal};
use serde_json::Value;

fn todo_model() -> Model {
    let address = Model::builder("Address").field("city", Field::string()).field("country", Field::string()).build();
    let owner = Model::builder("Owner").field("name", Field::string()).field("address", Field::nested(&address)).build();
    Model::builder("Todo")
        .field("id", Field::integer().readonly())
        .field("task", Field::string().required())
        .field("done", Field::boolean())
        .field("owner", Field::nested(&owner))
        .field("tags", Field::list(Field::string()))
        .build()
}

fn benchmark_mask_parse(criterion: &mut Criterion) {
    let cases = vec![TestCase::small("flat_mask", FLAT_MASK), TestCase::normal("nested_mask", NESTED_MASK)];
    let mut group = criterion.benchmark_group("mask_parse");

    for case in cases {
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter(|| black_box(Mask::parse(black_box(case.input().content())).expect("mask should be valid")));
        });
    }

    group.finish();
}

fn benchmark_marshal(criterion: &mut Criterion) {
    let model = todo_model();
    let small = todos(10);
    let large = todos(1000);
    let cases = vec![
        TestCase::small("todos_10", TestInput::new("todos_10", &*small.leak())),
        TestCase::large("todos_1000", TestInput::new("todos_1000", &*large.leak())),
    ];
    let mask = Mask::parse(NESTED_MASK.content()).expect("mask should be valid");
    let mut group = criterion.benchmark_group("marshal");

    for case in cases {
        let data = serde_json::from_str::<Value>(case.input().content()).expect("todos should be valid json");
        group.throughput(Throughput::Bytes(case.input().content().len() as u64));
        group.bench_with_input(BenchmarkId::new("full", case.name()), &data, |b, data| {
            b.iter(|| black_box(marshal(data, &model, None, false).expect("todos should marshal")));
        });
        group.bench_with_input(BenchmarkId::new("masked", case.name()), &data, |b, data| {
            b.iter(|| black_box(marshal(data, &model, Some(&mask), true).expect("todos should marshal")));
        });
    }

    group.finish();
}

criterion_group!(marshalling, benchmark_mask_parse, benchmark_marshal);
criterion_main!(marshalling);
