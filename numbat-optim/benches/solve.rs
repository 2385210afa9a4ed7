use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{DVector, Vector3};
use numbat::Scalar;
use numbat_optim::{
    levenberg_marquardt, AutoDiff, LevenbergMarquardtConfig, NumDiff, ResidualFunction,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Noisy samples of `y = a·exp(-b·t) + c`.
struct Decay {
    samples: Vec<(f64, f64)>,
}

impl Decay {
    fn new(n: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 * 5.0 / n as f64;
                (t, 3.0 * (-0.5 * t).exp() + 0.2 + rng.gen_range(-1e-3..1e-3))
            })
            .collect();
        Decay { samples }
    }
}

impl ResidualFunction<Vector3<f64>> for Decay {
    fn residuals<T: Scalar<Float = f64>>(&self, p: &Vector3<T>) -> Vec<T> {
        self.samples
            .iter()
            .map(|&(t, y)| p[0] * (-p[1] * T::from_f(t)).exp() + p[2] - T::from_f(y))
            .collect()
    }
}

/// Chain of `n` points pulled toward neighbours and anchored at both ends.
struct Chain;

impl ResidualFunction<DVector<f64>> for Chain {
    fn residuals<T: Scalar<Float = f64>>(&self, x: &DVector<T>) -> Vec<T> {
        let n = x.len();
        let mut r = Vec::with_capacity(n + 1);
        r.push(x[0]);
        for i in 1..n {
            r.push((x[i] - x[i - 1]) * (x[i] - x[i - 1]) - T::lit(1.0));
        }
        r.push(x[n - 1] - T::from_f((n - 1) as f64));
        r
    }
}

fn config() -> LevenbergMarquardtConfig<f64> {
    let mut config = LevenbergMarquardtConfig::default();
    config.optimizer.convergence.max_consec_failures = 10;
    config
}

fn bench_curve_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("curve_fit");
    let config = config();
    for n in [20, 200, 2000] {
        let decay = Decay::new(n, 7);

        group.bench_with_input(BenchmarkId::new("autodiff", n), &decay, |b, decay| {
            b.iter(|| {
                let mut x = Vector3::new(1.0f64, 1.0, 0.0);
                let mut acc = AutoDiff::new(decay);
                black_box(levenberg_marquardt(&mut x, &mut acc, &config))
            })
        });

        group.bench_with_input(BenchmarkId::new("numdiff", n), &decay, |b, decay| {
            b.iter(|| {
                let mut x = Vector3::new(1.0f64, 1.0, 0.0);
                let mut acc = NumDiff::new(|p: &Vector3<f64>| decay.residuals::<f64>(p));
                black_box(levenberg_marquardt(&mut x, &mut acc, &config))
            })
        });
    }
    group.finish();
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    let config = config();
    for n in [8, 32, 128] {
        let start = DVector::from_fn(n, |i, _| i as f64 * 0.9);

        group.bench_with_input(BenchmarkId::new("autodiff", n), &start, |b, start| {
            b.iter(|| {
                let mut x = start.clone();
                black_box(levenberg_marquardt(&mut x, &mut AutoDiff::new(Chain), &config))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_curve_fit, bench_chain);
criterion_main!(benches);
