use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reg_access::kind::{Binary, Dword, MultiString, String as Sz};
use reg_access::{Key, MemoryBackend, Registry, Value};

fn populate(registry: &Registry, values: u32) -> Key {
    let key = registry.current_user().create("bench").unwrap();
    for i in 0..values / 4 {
        key.create(&format!("sub{:04}", i)).unwrap();
    }
    for i in 0..values {
        let name = format!("value{:04}", i);
        match i % 3 {
            0 => key.set_value(&Value::<Dword>::new(name, i).unwrap()),
            1 => key.set_value(&Value::<Sz>::new(name, format!("string value {}", i)).unwrap()),
            _ => key.set_value(
                &Value::<MultiString>::new(name, vec!["multi".into(), "string".into()]).unwrap(),
            ),
        }
        .unwrap();
    }
    key
}

fn bench_enumerate(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate");
    for size in [16u32, 256, 1024] {
        let registry = Registry::new(MemoryBackend::new());
        let key = populate(&registry, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &key, |b, key| {
            b.iter(|| {
                let count = key
                    .iter()
                    .unwrap()
                    .filter(|entry| entry.is_ok())
                    .count();
                black_box(count)
            })
        });
    }
    group.finish();
}

fn bench_read_value(c: &mut Criterion) {
    let registry = Registry::new(MemoryBackend::new());
    let key = registry.current_user().create("bench").unwrap();
    key.set_value(&Value::<Binary>::new("binaryValue", vec![0xAB; 4096]).unwrap())
        .unwrap();

    c.bench_function("decode_binary_4k", |b| {
        b.iter(|| {
            let value = key.value_of("binaryValue").decode_as::<Binary>().unwrap();
            black_box(value.byte_len())
        })
    });
}

criterion_group!(benches, bench_enumerate, bench_read_value);
criterion_main!(benches);
