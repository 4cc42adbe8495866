#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::{Result, bail};
    use float_cmp::approx_eq;
    use itertools::Itertools;
    use ordered_float::OrderedFloat;
    use rand::prelude::SmallRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    use boxpack::device::{GpuConfig, HostPlatform};
    use boxpack::entities::{BinTemplate, Item, PackedBin, Packing};
    use boxpack::geometry::{Axis, Vec3};
    use boxpack::solvers::{BestFit3D, FirstFit3D, GpuBestFit, Solver};
    use gapack::breeding::{Breeder, OrderCrossoverSwap, order_crossover};
    use gapack::config::GAConfig;
    use gapack::eval_pool::EvalPool;
    use gapack::fitness::{self, Direction};
    use gapack::ga_optimizer::GAOptimizer;
    use gapack::io;

    fn init_logger() {
        let _ = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .is_test(true)
            .try_init();
    }

    fn random_items(n: usize, seed: u64) -> Vec<Item> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..n)
            .map(|id| {
                let size = Vec3::new(
                    rng.random_range(4..12) as f32,
                    rng.random_range(4..12) as f32,
                    rng.random_range(4..12) as f32,
                );
                Item::new(id, size)
            })
            .collect()
    }

    fn cube(side: f32) -> Vec3 {
        Vec3::new(side, side, side)
    }

    fn is_permutation(p: &[usize], n: usize) -> bool {
        p.len() == n && p.iter().copied().collect::<HashSet<_>>() == (0..n).collect()
    }

    fn config(population_size: usize, elite_count: usize, threaded: bool) -> GAConfig {
        GAConfig {
            population_size,
            elite_count,
            threaded,
            n_workers: Some(4),
            ..GAConfig::default()
        }
    }

    #[test_case(1; "single")]
    #[test_case(2; "pair")]
    #[test_case(10; "small")]
    #[test_case(100; "large")]
    fn order_crossover_yields_permutations(n: usize) {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut p1 = (0..n).collect_vec();
        let mut p2 = (0..n).collect_vec();
        for _ in 0..200 {
            p1.shuffle(&mut rng);
            p2.shuffle(&mut rng);
            let child = OrderCrossoverSwap.crossover(&p1, &p2, &mut rng);
            assert!(is_permutation(&child, n), "{child:?}");
        }
    }

    #[test]
    fn order_crossover_keeps_slice_and_wraps() {
        let p1 = (0..8).collect_vec();
        let p2 = (0..8).rev().collect_vec();

        let child = order_crossover(&p1, &p2, 2, 4);

        assert_eq!(child, vec![1, 2, 5, 4, 3, 6, 7, 0]);
    }

    #[test]
    fn order_crossover_over_full_range_copies_second_parent() {
        let p1 = vec![3, 1, 0, 2];
        let p2 = vec![2, 0, 3, 1];
        assert_eq!(order_crossover(&p1, &p2, 0, 3), p2);
    }

    #[test_case(0; "empty")]
    #[test_case(1; "single")]
    #[test_case(2; "pair")]
    #[test_case(50; "large")]
    fn swap_mutation(n: usize) {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut parent = (0..n).collect_vec();
        parent.shuffle(&mut rng);

        for _ in 0..100 {
            let child = OrderCrossoverSwap.mutate(&parent, &mut rng);
            assert!(is_permutation(&child, n));
            let n_changed = parent.iter().zip(&child).filter(|(a, b)| a != b).count();
            match n {
                0 | 1 => assert_eq!(n_changed, 0),
                _ => assert_eq!(n_changed, 2),
            }
        }
    }

    fn packed_bin(index: usize, volumes: &[f32]) -> PackedBin {
        PackedBin {
            index,
            dims: cube(10.0),
            items: volumes
                .iter()
                .enumerate()
                .map(|(i, v)| Item::new(index * 100 + i, Vec3::new(*v, 1.0, 1.0)))
                .collect(),
        }
    }

    #[test]
    fn rate_with_at_most_one_bin_is_one() {
        let template = BinTemplate::new(cube(10.0)).unwrap();
        assert_eq!(fitness::rate(&Packing::default(), &template), 1.0);

        let single = Packing {
            bins: vec![packed_bin(0, &[10.0])],
            unplaced: vec![],
        };
        assert_eq!(fitness::rate(&single, &template), 1.0);
    }

    #[test]
    fn rate_leaves_out_the_last_bin() {
        let template = BinTemplate::new(cube(10.0)).unwrap();
        let packing = Packing {
            bins: vec![
                packed_bin(0, &[250.0, 250.0]),
                packed_bin(1, &[800.0]),
                packed_bin(2, &[100.0]),
            ],
            unplaced: vec![],
        };
        let rate = fitness::rate(&packing, &template);
        assert!(approx_eq!(f64, rate, 1300.0 / 2000.0, epsilon = 1e-9));
    }

    #[test]
    fn rate_of_growing_bin_is_its_extent() {
        let template = BinTemplate::growing(cube(10.0), Axis::Y).unwrap();
        let mut bin = packed_bin(0, &[10.0]);
        bin.dims = Vec3::new(10.0, 42.0, 10.0);
        let packing = Packing {
            bins: vec![bin],
            unplaced: vec![],
        };
        assert_eq!(fitness::rate(&packing, &template), 42.0);
        assert_eq!(Direction::of(&template), Direction::Minimize);
        assert!(Direction::Minimize.is_better(41.0, 42.0));
        assert!(Direction::Maximize.is_better(0.9, 0.8));
    }

    #[test]
    fn threaded_and_sequential_generations_agree() {
        init_logger();
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let items = random_items(60, 2);

        let mut sequential = GAOptimizer::new(
            Arc::new(FirstFit3D),
            items.clone(),
            template,
            config(10, 3, false),
        )
        .unwrap();
        let mut threaded =
            GAOptimizer::new(Arc::new(FirstFit3D), items, template, config(10, 3, true)).unwrap();

        for _ in 0..3 {
            let s = sequential.execute_next_generation().unwrap();
            let t = threaded.execute_next_generation().unwrap();
            assert_eq!(s.best_fitness, t.best_fitness);
            assert_eq!(s.best, t.best);
            assert_eq!(s.n_scored, t.n_scored);
            assert_eq!(sequential.population(), threaded.population());
        }
    }

    #[test_case(true; "threaded")]
    #[test_case(false; "sequential")]
    fn elites_survive_a_generation(threaded: bool) {
        init_logger();
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let items = random_items(80, 3);
        let solver = Arc::new(BestFit3D);
        let mut opt =
            GAOptimizer::new(solver.clone(), items.clone(), template, config(20, 4, threaded))
                .unwrap();

        let before = opt.population().to_vec();
        let generation = opt.execute_next_generation().unwrap();

        // rank the previous population independently
        let ranked = before
            .iter()
            .map(|order| {
                let ordered = order.iter().map(|&i| items[i]).collect_vec();
                let packing = solver.solve(&ordered, &template).unwrap();
                fitness::rate(&packing, &template)
            })
            .zip(before.iter())
            .sorted_by_key(|(f, _)| std::cmp::Reverse(OrderedFloat(*f)))
            .collect_vec();

        assert_eq!(opt.population().len(), 20);
        assert_eq!(generation.n_scored, 20);
        assert!(!generation.degraded);
        assert_eq!(generation.best_fitness, ranked[0].0);
        for (elite, (_, expected)) in opt.population()[..4].iter().zip(&ranked[..4]) {
            assert_eq!(elite, *expected);
        }
        assert!(opt.population().iter().all(|p| is_permutation(p, 80)));
    }

    #[test_case(Some(Axis::Y); "growing")]
    #[test_case(None; "fixed")]
    fn best_fitness_never_regresses(grow_axis: Option<Axis>) {
        init_logger();
        let template = match grow_axis {
            Some(axis) => BinTemplate::growing(cube(30.0), axis).unwrap(),
            None => BinTemplate::new(cube(30.0)).unwrap(),
        };
        let mut opt = GAOptimizer::new(
            Arc::new(FirstFit3D),
            random_items(100, 4),
            template,
            config(12, 3, true),
        )
        .unwrap();
        let direction = opt.direction();

        let mut previous: Option<f64> = None;
        for _ in 0..5 {
            let generation = opt.execute_next_generation().unwrap();
            if let Some(p) = previous {
                assert!(!direction.is_better(p, generation.best_fitness));
            }
            if grow_axis.is_some() {
                assert_eq!(generation.best.n_bins(), 1);
            }
            previous = Some(generation.best_fitness);
        }
        assert_eq!(opt.generation(), 5);
        assert_eq!(opt.best_so_far(), previous);
    }

    #[test_case(10, 10; "elite equals population")]
    #[test_case(10, 12; "elite exceeds population")]
    #[test_case(10, 0; "no elite")]
    fn invalid_population_is_rejected(population_size: usize, elite_count: usize) {
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let result = GAOptimizer::new(
            Arc::new(FirstFit3D),
            random_items(10, 5),
            template,
            config(population_size, elite_count, false),
        );
        assert!(result.is_err());
    }

    /// Fails (or panics) on every other call
    struct FlakySolver {
        calls: AtomicUsize,
        panics: bool,
        releases: AtomicUsize,
    }

    impl FlakySolver {
        fn new(panics: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                panics,
                releases: AtomicUsize::new(0),
            }
        }
    }

    impl Solver for FlakySolver {
        fn name(&self) -> &str {
            "flaky"
        }

        fn solve(&self, items: &[Item], template: &BinTemplate) -> Result<Packing> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                match self.panics {
                    true => panic!("flaky solver panicked"),
                    false => bail!("flaky solver failed"),
                }
            }
            FirstFit3D.solve(items, template)
        }

        fn release(&self) -> Result<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test_case(false, true; "errors threaded")]
    #[test_case(false, false; "errors sequential")]
    #[test_case(true, true; "panics threaded")]
    #[test_case(true, false; "panics sequential")]
    fn failed_evaluations_degrade_the_generation(panics: bool, threaded: bool) {
        init_logger();
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let mut opt = GAOptimizer::new(
            Arc::new(FlakySolver::new(panics)),
            random_items(20, 6),
            template,
            config(10, 3, threaded),
        )
        .unwrap();

        let generation = opt.execute_next_generation().unwrap();

        assert!(generation.degraded);
        assert_eq!(generation.n_failed, 5);
        assert_eq!(generation.n_scored, 5);
        assert_eq!(opt.population().len(), 10);
    }

    #[test]
    fn generation_without_any_score_fails() {
        struct BrokenSolver;
        impl Solver for BrokenSolver {
            fn name(&self) -> &str {
                "broken"
            }
            fn solve(&self, _: &[Item], _: &BinTemplate) -> Result<Packing> {
                bail!("broken")
            }
        }

        let template = BinTemplate::new(cube(30.0)).unwrap();
        let mut opt = GAOptimizer::new(
            Arc::new(BrokenSolver),
            random_items(5, 7),
            template,
            config(6, 2, true),
        )
        .unwrap();
        let before = opt.population().to_vec();

        assert!(opt.execute_next_generation().is_err());
        assert_eq!(opt.population(), before.as_slice());
    }

    #[test]
    fn release_is_forwarded_to_the_solver() {
        let solver = Arc::new(FlakySolver::new(false));
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let opt = GAOptimizer::new(
            solver.clone(),
            random_items(5, 8),
            template,
            config(4, 1, false),
        )
        .unwrap();

        opt.release().unwrap();
        assert_eq!(solver.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn optimizer_drives_the_device_solver() {
        init_logger();
        let platform = HostPlatform::new();
        let usage = platform.usage();
        let gpu = GpuBestFit::new(&platform, &GpuConfig::default()).unwrap();
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let items = random_items(40, 9);

        let mut opt = GAOptimizer::new(Arc::new(gpu), items, template, config(8, 2, true)).unwrap();
        let generation = opt.execute_next_generation().unwrap();
        assert!(!generation.degraded);
        assert!(generation.best.unplaced.is_empty());

        opt.release().unwrap();
        assert_eq!(usage.live_buffers(), 0);
        assert_eq!(usage.live_kernels(), 0);
    }

    /// Takes `delay` on every other call
    struct SlowSolver {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Solver for SlowSolver {
        fn name(&self) -> &str {
            "slow"
        }

        fn solve(&self, items: &[Item], template: &BinTemplate) -> Result<Packing> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                std::thread::sleep(self.delay);
            }
            FirstFit3D.solve(items, template)
        }
    }

    #[test]
    fn generation_past_its_deadline_is_degraded_but_breeds_on() {
        init_logger();
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let solver = SlowSolver {
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(3),
        };
        let config = GAConfig {
            population_size: 6,
            elite_count: 2,
            threaded: true,
            n_workers: Some(8),
            eval_timeout_secs: 1,
            ..GAConfig::default()
        };
        let mut opt =
            GAOptimizer::new(Arc::new(solver), random_items(10, 10), template, config).unwrap();

        let generation = opt.execute_next_generation().unwrap();
        assert!(generation.degraded);
        assert_eq!(generation.n_scored, 3);
        assert_eq!(generation.n_failed, 0);
        assert_eq!(opt.population().len(), 6);
        assert!(opt.population().iter().all(|p| is_permutation(p, 10)));

        let next = opt.execute_next_generation().unwrap();
        assert_eq!(next.index, 1);
        assert!(next.n_scored >= 1);
        assert_eq!(opt.population().len(), 6);
    }

    #[test]
    fn unbounded_timeout_waits_for_every_evaluation() {
        let template = BinTemplate::new(cube(30.0)).unwrap();
        let config = GAConfig {
            population_size: 6,
            elite_count: 2,
            threaded: true,
            n_workers: Some(2),
            eval_timeout_secs: u64::MAX,
            ..GAConfig::default()
        };
        let mut opt =
            GAOptimizer::new(Arc::new(FirstFit3D), random_items(20, 11), template, config).unwrap();

        let generation = opt.execute_next_generation().unwrap();
        assert!(!generation.degraded);
        assert_eq!(generation.n_scored, 6);

        let pool = EvalPool::new(Some(2), Duration::MAX).unwrap();
        let outcome = pool.evaluate(10, |i| Ok(i + 1));
        assert!(!outcome.timed_out);
        assert_eq!(outcome.results.len(), 10);
    }

    #[test]
    fn eval_pool_gives_up_at_the_deadline() {
        let pool = EvalPool::new(Some(2), Duration::from_millis(50)).unwrap();
        let outcome = pool.evaluate(4, |i| {
            std::thread::sleep(Duration::from_millis(500));
            Ok(i)
        });
        assert!(outcome.timed_out);
        assert!(outcome.results.len() < 4);
    }

    #[test]
    fn eval_pool_collects_every_result() {
        let pool = EvalPool::new(Some(3), Duration::from_secs(60)).unwrap();
        let outcome = pool.evaluate(50, |i| match i % 10 {
            0 => bail!("task {i} refused"),
            _ => Ok(i * 2),
        });
        assert!(!outcome.timed_out);
        assert_eq!(outcome.n_failed, 5);
        let values = outcome.results.iter().map(|(i, v)| (*i, *v)).sorted().collect_vec();
        assert_eq!(values.len(), 45);
        assert!(values.iter().all(|(i, v)| *v == i * 2));
    }

    #[test]
    fn config_is_read_from_json() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gapack_config_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"population_size": 30, "elite_count": 6, "threaded": false, "prng_seed": null}"#,
        )
        .unwrap();

        let config = io::read_config(&path).unwrap();
        assert_eq!(config.population_size, 30);
        assert_eq!(config.elite_count, 6);
        assert!(!config.threaded);
        assert_eq!(config.prng_seed, None);
        assert_eq!(config.eval_timeout_secs, GAConfig::default().eval_timeout_secs);

        std::fs::write(&path, r#"{"population_size": 5, "elite_count": 5}"#).unwrap();
        assert!(io::read_config(&path).is_err());

        std::fs::write(&path, "not json").unwrap();
        assert!(io::read_config(&path).is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
