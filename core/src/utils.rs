//! utils.rs
//! Pure numeric primitives, timestamp source and formatting helpers.
//! Nothing here has side effects visible to the pipeline beyond its return value.

/// Arithmetic mean. Empty input yields 0.
#[inline]
pub fn mean(data: &[f32]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().map(|&x| f64::from(x)).sum::<f64>() / data.len() as f64
}

/// Population variance around `mean`.
#[inline]
pub fn variance(data: &[f32], mean: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter()
        .map(|&x| {
            let d = f64::from(x) - mean;
            d * d
        })
        .sum::<f64>()
        / data.len() as f64
}

/// Population standard deviation.
#[inline]
pub fn std_dev(data: &[f32]) -> f64 {
    variance(data, mean(data)).sqrt()
}

/// Dot product over the common prefix of `a` and `b`.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// L2 norm.
#[inline]
pub fn magnitude(v: &[f32]) -> f64 {
    dot(v, v).sqrt()
}

/// Wall-clock time in epoch milliseconds.
#[inline]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Wall-clock time in epoch seconds.
#[inline]
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Short hex preview for logs (never the whole secret).
pub fn hex_preview(b: &[u8], max: usize) -> String {
    if b.len() <= max {
        hex::encode(b)
    } else {
        format!("{}..", hex::encode(&b[..max]))
    }
}
