//! aggregate.rs
//! Template aggregation: enrollment mean and adaptive blending.

use tracing::debug;
use zeroize::Zeroizing;

use crate::signal::FeatureVector;
use crate::types::NeuroError;

/// Elementwise arithmetic mean of `N >= 1` equal-length vectors.
///
/// Accumulates in f64. The result carries the first vector's task and the
/// latest timestamp among the inputs.
pub fn aggregate(vectors: &[FeatureVector]) -> Result<FeatureVector, NeuroError> {
    let first = vectors
        .first()
        .ok_or_else(|| NeuroError::validation("cannot aggregate zero feature vectors"))?;
    let len = first.len();
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != len) {
        return Err(NeuroError::validation(format!(
            "feature vector {} has length {}, expected {}",
            i,
            v.len(),
            len
        )));
    }

    let mut acc = Zeroizing::new(vec![0f64; len]);
    for v in vectors {
        for (a, &x) in acc.iter_mut().zip(v.as_slice()) {
            *a += f64::from(x);
        }
    }
    let n = vectors.len() as f64;
    let values: Vec<f32> = acc.iter().map(|&a| (a / n) as f32).collect();
    let timestamp_ms = vectors.iter().map(|v| v.timestamp_ms).max().unwrap_or(first.timestamp_ms);

    debug!(trials = vectors.len(), features = len, "feature vectors aggregated");
    Ok(FeatureVector::new(values, first.task, timestamp_ms))
}

/// `(1 - rate) * stored + rate * trial`, `0 < rate <= 1`.
///
/// Keeps the stored task; takes the trial's timestamp.
pub fn blend(stored: &FeatureVector, trial: &FeatureVector, rate: f32) -> Result<FeatureVector, NeuroError> {
    if !(rate > 0.0 && rate <= 1.0) {
        return Err(NeuroError::validation(format!("adaptive rate {} outside (0, 1]", rate)));
    }
    if stored.len() != trial.len() {
        return Err(NeuroError::validation(format!(
            "cannot blend vectors of length {} and {}",
            stored.len(),
            trial.len()
        )));
    }
    let r = f64::from(rate);
    let values = stored
        .as_slice()
        .iter()
        .zip(trial.as_slice())
        .map(|(&s, &t)| ((1.0 - r) * f64::from(s) + r * f64::from(t)) as f32)
        .collect();
    Ok(FeatureVector::new(values, stored.task, trial.timestamp_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::MentalTask;

    fn fv(values: Vec<f32>, ts: i64) -> FeatureVector {
        FeatureVector::new(values, MentalTask::EyesClosedRest, ts)
    }

    #[test]
    fn blend_endpoints() {
        let s = fv(vec![1.0, 2.0], 1);
        let t = fv(vec![3.0, 6.0], 2);
        assert_eq!(blend(&s, &t, 1.0).unwrap().values, vec![3.0, 6.0]);
        assert_eq!(blend(&s, &t, 0.5).unwrap().values, vec![2.0, 4.0]);
        assert!(blend(&s, &t, 0.0).is_err());
        assert!(blend(&s, &t, 1.5).is_err());
        assert!(blend(&s, &fv(vec![1.0], 3), 0.5).is_err());
    }

    #[test]
    fn aggregate_keeps_latest_timestamp() {
        let out = aggregate(&[fv(vec![1.0], 5), fv(vec![3.0], 9), fv(vec![5.0], 7)]).unwrap();
        assert_eq!(out.values, vec![3.0]);
        assert_eq!(out.timestamp_ms, 9);
    }
}
