// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Property-Based Tests (proptest) for shnn-data
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for shnn-data using proptest.
//!
//! Covers: dataset split sizes, determinism, energy of noiseless pairs.

use proptest::prelude::*;
use shnn_data::loader::DataLoader;
use shnn_types::config::Problem;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Train and test sets always partition the samples, neither empty.
    #[test]
    fn split_partitions_samples(samples in 2usize..60, split in 0.01f64..0.99, seed in any::<u64>()) {
        let loader = DataLoader::new(Problem::Spring, 0.1, 0.0).unwrap();
        let ds = loader.get_dataset(seed, samples, split).unwrap();
        let (n_train, n_test) = (ds.coords.shape()[0], ds.test_coords.shape()[0]);
        prop_assert_eq!(n_train + n_test, samples);
        prop_assert!(n_train >= 1 && n_test >= 1);
        prop_assert_eq!(ds.t.shape()[0], n_train);
        prop_assert_eq!(ds.test_t.shape()[0], n_test);
    }

    /// Without noise, both states of a pair lie on the same energy level.
    #[test]
    fn noiseless_pairs_conserve_energy(seed in any::<u64>(), h in 0.05f64..0.8) {
        for problem in [Problem::Spring, Problem::Pendulum] {
            let loader = DataLoader::new(problem, h, 0.0).unwrap();
            let pairs = loader.get_dataset(seed, 6, 0.3).unwrap().train_pairs();
            let sys = loader.system();
            for i in 0..pairs.len() {
                let e0 = sys.hamiltonian(pairs.x0.row(i)).unwrap();
                let e1 = sys.hamiltonian(pairs.x1.row(i)).unwrap();
                prop_assert!((e0 - e1).abs() < 1e-8, "{}: {} vs {}", problem, e0, e1);
            }
        }
    }

    /// The same seed reproduces the same noisy dataset.
    #[test]
    fn seeded_sampling_is_deterministic(seed in any::<u64>(), noise in 0.0f64..0.2) {
        let loader = DataLoader::new(Problem::Pendulum, 0.1, noise).unwrap();
        let a = loader.get_dataset(seed, 10, 0.2).unwrap();
        let b = loader.get_dataset(seed, 10, 0.2).unwrap();
        prop_assert_eq!(a, b);
    }
}
