//! Numeric helpers for turning classifier logits into a decision.

/// Normalized exponential over a logits vector.
///
/// Subtracts the maximum before exponentiating for numerical stability.
/// Returns an empty vector for empty input.
///
/// # Arguments
/// * `logits` - Raw scores from the classifier head
///
/// # Returns
/// Probabilities in the same order, summing to 1.0
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value.
///
/// Ties resolve to the first occurrence. NaN entries are never selected.
/// Returns `None` for empty input or when every entry is NaN.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
