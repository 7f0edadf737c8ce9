mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use neurolock_core::matcher::{cosine_similarity, MatchError, SimilarityMatcher};
    use neurolock_core::signal::{FeatureExtractor, FeatureMethod, MentalTask, PreprocessStage, RawSignal};
    use neurolock_core::types::ExitStatus;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // ## 1. Basic decisions

    #[test]
    fn identical_vectors_accept_with_unit_score() {
        let m = SimilarityMatcher::default();
        let v = [1.0f32, 2.0, 3.0, 4.0];
        let r = m.compare(&v, &v).unwrap();
        assert!(r.accepted);
        assert!((r.score - 1.0).abs() < 1e-6);
        assert_eq!(r.attempts, 1);
        assert_eq!(r.status(), ExitStatus::Success);
    }

    #[test]
    fn dissimilar_vectors_reject() {
        let m = SimilarityMatcher::default();
        let r = m.compare(&[1.0, 0.0, 0.0], &[0.0, 1.0, 1.0]).unwrap();
        assert!(!r.accepted);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.status(), ExitStatus::Rejected);
    }

    #[test]
    fn degenerate_and_mismatched_inputs_fail() {
        assert!(matches!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]),
            Err(MatchError::DegenerateVector { .. })
        ));
        assert!(matches!(
            cosine_similarity(&[1e-9, 0.0], &[1.0, 1.0]),
            Err(MatchError::DegenerateVector { .. })
        ));
        assert!(matches!(
            cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(MatchError::LengthMismatch { left: 2, right: 3 })
        ));
    }

    // ## 2. Noise monotonicity

    const NOISE_SEEDS: u64 = 32;

    #[test]
    fn mean_score_falls_as_noise_grows() {
        let ex = FeatureExtractor::new(CHANNELS, 256, vec![PreprocessStage::Normalize], FeatureMethod::BandPower)
            .unwrap();
        let clean_channels: Vec<Vec<f32>> =
            (0..CHANNELS).map(|c| tone(6.0 + 3.0 * c as f32, 1.0, SAMPLES, FS)).collect();
        let stored = ex.extract(&RawSignal::new(clean_channels.clone(), FS, MentalTask::EyesClosedRest)).unwrap();

        let mean_score = |sigma: f32| -> f32 {
            let mut total = 0.0f64;
            for seed in 0..NOISE_SEEDS {
                let mut rng = StdRng::seed_from_u64(seed);
                let noisy: Vec<Vec<f32>> = clean_channels
                    .iter()
                    .map(|c| {
                        let n = unit_noise(&mut rng, SAMPLES);
                        c.iter().zip(&n).map(|(a, b)| a + sigma * b).collect()
                    })
                    .collect();
                let fresh = ex.extract(&RawSignal::new(noisy, FS, MentalTask::EyesClosedRest)).unwrap();
                total += f64::from(cosine_similarity(fresh.as_slice(), stored.as_slice()).unwrap());
            }
            (total / NOISE_SEEDS as f64) as f32
        };

        let mut last = mean_score(0.0);
        assert!(last > 0.999, "clean trials scored {}", last);
        for sigma in [0.3f32, 1.0, 3.0, 10.0] {
            let score = mean_score(sigma);
            assert!(score <= last + 1e-3, "sigma {} averaged {} after {}", sigma, score, last);
            last = score;
        }
        assert!(last < 0.5);
    }

    // ## 3. Properties

    fn positive_vec() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(0.01f32..1.0e4, 1..64)
    }

    proptest! {
        #[test]
        fn prop_reflexive(v in positive_vec()) {
            let s = cosine_similarity(&v, &v).unwrap();
            prop_assert!(s >= 0.9999 && s <= 1.0);
        }

        #[test]
        fn prop_symmetric((a, b) in (1usize..64).prop_flat_map(|n| (
            prop::collection::vec(0.01f32..1.0e4, n),
            prop::collection::vec(0.01f32..1.0e4, n),
        ))) {
            let ab = cosine_similarity(&a, &b).unwrap();
            let ba = cosine_similarity(&b, &a).unwrap();
            prop_assert_eq!(ab, ba);
            prop_assert!((0.0..=1.0).contains(&ab));
        }

        #[test]
        fn prop_scale_invariant(v in positive_vec(), k in 0.1f32..100.0) {
            let scaled: Vec<f32> = v.iter().map(|x| x * k).collect();
            let s = cosine_similarity(&v, &scaled).unwrap();
            prop_assert!(s >= 0.9999);
        }
    }
}
