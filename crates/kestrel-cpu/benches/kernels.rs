use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kestrel_core::Tensor;
use kestrel_cpu::{matvec, rmsnorm, rope, softmax};

fn bench_softmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("softmax");
    for size in [256, 2048, 32000] {
        let logits = vec![0.5f32; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bencher, _| {
            bencher.iter(|| {
                let mut x = logits.clone();
                softmax(black_box(&mut x));
            });
        });
    }
    group.finish();
}

fn bench_rmsnorm(c: &mut Criterion) {
    let size = 2048;
    let input = vec![0.25f32; size];
    let weight = vec![1.0f32; size];
    let mut output = vec![0.0f32; size];

    c.bench_function("rmsnorm_2048", |bencher| {
        bencher.iter(|| {
            rmsnorm(black_box(&input), black_box(&weight), black_box(&mut output));
        });
    });
}

fn bench_rope(c: &mut Criterion) {
    let mut group = c.benchmark_group("rope");
    for head_dim in [64, 128] {
        let head = vec![0.7f32; head_dim];
        group.bench_with_input(BenchmarkId::from_parameter(head_dim), &head_dim, |bencher, &dim| {
            bencher.iter(|| {
                let mut x = head.clone();
                rope(black_box(&mut x), 100, dim);
            });
        });
    }
    group.finish();
}

fn bench_matvec(c: &mut Criterion) {
    let mut group = c.benchmark_group("matvec");
    for size in [256usize, 2048] {
        let matrix = Tensor::from_vec(vec![1.0f32; size * size], [size, size]);
        let x = Tensor::from_vec(vec![1.0f32; size], [size]);
        group.bench_with_input(
            BenchmarkId::new("square", size),
            &size,
            |bencher, _| {
                bencher.iter(|| matvec(black_box(matrix.view()), black_box(x.view())));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_softmax, bench_rmsnorm, bench_rope, bench_matvec);
criterion_main!(benches);
