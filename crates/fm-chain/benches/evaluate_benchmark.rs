use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fm_chain::LikelihoodChain;
use fm_chain::modules::{
    GaussianPsLikelihood, InstrumentCore, PoissonCountsLikelihood, PowerSpectrumCore,
};
use fm_core::{Param, Params};
use std::hint::black_box;

fn make_chain(n_bins: usize) -> LikelihoodChain {
    // Deterministic pseudo-data with the right shape; the values only have to
    // be finite and positive for the likelihoods to accept them.
    let observed = (0..n_bins).map(|i| 0.5 + (i % 5) as f64 * 0.1).collect::<Vec<_>>();
    let sigma = vec![0.5; n_bins];
    let counts = (0..n_bins).map(|i| (i % 7 + 1) as u64).collect::<Vec<_>>();

    let schema = Params::new(vec![
        Param::new("amp", 1.0, (0.0, 10.0)).unwrap(),
        Param::new("index", -1.0, (-3.0, 1.0)).unwrap(),
    ])
    .unwrap();

    let mut chain = LikelihoodChain::new(Some(schema));
    chain
        .add_core_module(PowerSpectrumCore::new(0.1, 10.0, n_bins, 0.5, 1.0, -1.0).unwrap())
        .unwrap();
    chain.add_core_module(InstrumentCore::new(0.5, 0.0).unwrap()).unwrap();
    chain
        .add_likelihood_module(GaussianPsLikelihood::new(observed, sigma).unwrap())
        .unwrap();
    chain
        .add_likelihood_module(PoissonCountsLikelihood::new(counts, 10.0).unwrap())
        .unwrap();
    chain.setup().unwrap();
    chain
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_evaluate");

    for n in [8usize, 64, 256, 1024] {
        let mut chain = make_chain(n);
        group.bench_with_input(BenchmarkId::new("gaussian_poisson", n), &n, |b, _| {
            b.iter(|| {
                let evaluation = chain.evaluate(&[1.2, -0.9]).unwrap();
                black_box(evaluation.log_likelihood)
            })
        });
    }

    group.finish();
}

fn bench_simulate_mock(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_simulate_mock");

    for n in [8usize, 256] {
        let mut chain = make_chain(n);
        group.bench_with_input(BenchmarkId::new("seeded", n), &n, |b, _| {
            b.iter(|| {
                let outcome = chain.simulate_mock(Some(&[1.2, -0.9]), 42).unwrap();
                black_box(outcome.is_rejected())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_simulate_mock);
criterion_main!(benches);
