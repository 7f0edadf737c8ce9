#[cfg(test)]
mod tests {
    use neurolock_core::aggregate::{aggregate, blend};
    use neurolock_core::signal::{FeatureVector, MentalTask};
    use neurolock_core::types::NeuroError;
    use proptest::prelude::*;

    fn fv(values: Vec<f32>, ts: i64) -> FeatureVector {
        FeatureVector::new(values, MentalTask::MotorImagery, ts)
    }

    // ## 1. Mean

    #[test]
    fn elementwise_mean() {
        let out = aggregate(&[fv(vec![1.0, 10.0, 0.0], 1), fv(vec![3.0, 20.0, 0.0], 2), fv(vec![5.0, 30.0, 3.0], 3)])
            .unwrap();
        assert_eq!(out.values, vec![3.0, 20.0, 1.0]);
        assert_eq!(out.task, MentalTask::MotorImagery);
        assert_eq!(out.timestamp_ms, 3);
    }

    #[test]
    fn single_vector_is_identity() {
        let v = fv(vec![0.25, 7.5, 1e6], 42);
        let out = aggregate(std::slice::from_ref(&v)).unwrap();
        assert_eq!(out, v);
    }

    #[test]
    fn identical_copies_give_the_copy() {
        let v = fv(vec![1.1, 2.2, 3.3, 4.4], 5);
        let copies = vec![v.clone(), v.clone(), v.clone(), v.clone(), v.clone()];
        assert_eq!(aggregate(&copies).unwrap().values, v.values);
    }

    // ## 2. Errors

    #[test]
    fn empty_and_mismatched_inputs_fail() {
        assert!(matches!(aggregate(&[]), Err(NeuroError::Validation(_))));
        let err = aggregate(&[fv(vec![1.0, 2.0], 0), fv(vec![1.0], 0)]).unwrap_err();
        assert!(matches!(err, NeuroError::Validation(ref m) if m.contains("length 1")));
    }

    // ## 3. Blend

    #[test]
    fn blend_moves_toward_trial() {
        let stored = fv(vec![10.0, 0.0], 1);
        let trial = FeatureVector::new(vec![0.0, 10.0], MentalTask::MentalArithmetic, 9);
        let out = blend(&stored, &trial, 0.1).unwrap();
        assert!((out.values[0] - 9.0).abs() < 1e-5);
        assert!((out.values[1] - 1.0).abs() < 1e-5);
        assert_eq!(out.task, MentalTask::MotorImagery);
        assert_eq!(out.timestamp_ms, 9);
    }

    // ## 4. Properties

    proptest! {
        #[test]
        fn prop_mean_within_bounds(rows in (1usize..16, 1usize..8).prop_flat_map(|(len, n)| {
            prop::collection::vec(prop::collection::vec(0.0f32..1.0e5, len), n)
        })) {
            let vectors: Vec<FeatureVector> = rows.iter().cloned().map(|r| fv(r, 0)).collect();
            let out = aggregate(&vectors).unwrap();
            prop_assert_eq!(out.len(), rows[0].len());
            for (i, &m) in out.as_slice().iter().enumerate() {
                let lo = rows.iter().map(|r| r[i]).fold(f32::INFINITY, f32::min);
                let hi = rows.iter().map(|r| r[i]).fold(f32::NEG_INFINITY, f32::max);
                prop_assert!(m >= lo && m <= hi, "slot {}: {} not in [{}, {}]", i, m, lo, hi);
            }
        }
    }
}
