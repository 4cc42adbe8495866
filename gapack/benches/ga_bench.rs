use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use log::LevelFilter;
use rand::prelude::SmallRng;
use rand::{Rng, SeedableRng};

use boxpack::device::{GpuConfig, HostPlatform};
use boxpack::entities::{BinTemplate, Item};
use boxpack::geometry::{Axis, Vec3};
use boxpack::solvers::{BestFit3D, FirstFit2D, FirstFit3D, GpuBestFit, Solver};
use gapack::config::GAConfig;
use gapack::ga_optimizer::GAOptimizer;
use gapack::io;

criterion_main!(benches);
criterion_group!(benches, solver_bench, ga_generation_bench);

const N_ITEMS: [usize; 3] = [100, 500, 2000];

fn create_items(n: usize) -> Vec<Item> {
    let mut rng = SmallRng::seed_from_u64(0);
    (0..n)
        .map(|id| {
            let size = Vec3::new(
                rng.random_range(2..15) as f32,
                rng.random_range(2..15) as f32,
                rng.random_range(2..15) as f32,
            );
            Item::new(id, size)
        })
        .collect()
}

fn solvers() -> Vec<Box<dyn Solver>> {
    let platform = HostPlatform::new();
    let mut solvers: Vec<Box<dyn Solver>> = vec![
        Box::new(FirstFit3D),
        Box::new(BestFit3D),
        Box::new(FirstFit2D),
    ];
    match GpuBestFit::new(&platform, &GpuConfig::default()) {
        Ok(gpu) => solvers.push(Box::new(gpu)),
        Err(e) => log::warn!("skipping device solver: {e:#}"),
    }
    solvers
}

fn solver_bench(c: &mut Criterion) {
    let _ = io::init_logger(LevelFilter::Warn);
    let template = BinTemplate::new(Vec3::new(40.0, 40.0, 40.0)).unwrap();
    let growing = BinTemplate::growing(Vec3::new(40.0, 40.0, 40.0), Axis::Y).unwrap();

    let mut group = c.benchmark_group("solve");
    for solver in solvers() {
        for n in N_ITEMS {
            let items = create_items(n);
            group.throughput(Throughput::Elements(n as u64));
            group.bench_with_input(BenchmarkId::new(solver.name(), n), &items, |b, items| {
                b.iter(|| solver.solve(black_box(items), &template).unwrap())
            });
            group.bench_with_input(
                BenchmarkId::new(format!("{}_growing", solver.name()), n),
                &items,
                |b, items| b.iter(|| solver.solve(black_box(items), &growing).unwrap()),
            );
        }
        solver.release().unwrap();
    }
    group.finish();
}

fn ga_generation_bench(c: &mut Criterion) {
    let template = BinTemplate::new(Vec3::new(40.0, 40.0, 40.0)).unwrap();
    let items = create_items(500);

    let mut group = c.benchmark_group("ga_generation");
    group.sample_size(10);
    for threaded in [false, true] {
        let config = GAConfig {
            population_size: 20,
            elite_count: 4,
            threaded,
            ..GAConfig::default()
        };
        let mut optimizer =
            GAOptimizer::new(Arc::new(BestFit3D), items.clone(), template, config).unwrap();
        let label = if threaded { "threaded" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| optimizer.execute_next_generation().unwrap())
        });
        optimizer.release().unwrap();
    }
    group.finish();
}
