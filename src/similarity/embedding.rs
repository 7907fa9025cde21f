use super::SimilarityError;

/// Cosine similarity of two embeddings, clamped to `[0.0, 1.0]`.
///
/// Opposed vectors are as unrelated as orthogonal ones for matching purposes.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (va, vb) in a.iter().zip(b.iter()) {
        let (va, vb) = (f64::from(*va), f64::from(*vb));
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }

    if !(dot.is_finite() && norm_a.is_finite() && norm_b.is_finite()) {
        return Err(SimilarityError::NonFiniteEmbedding);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0))
}

/// Component-wise mean of equally sized vectors. Empty input yields an empty vector.
pub fn mean<'a>(vectors: impl IntoIterator<Item = &'a [f32]>) -> Vec<f32> {
    let mut sum: Vec<f64> = Vec::new();
    let mut n = 0usize;
    for v in vectors {
        if v.is_empty() {
            continue;
        }
        if sum.is_empty() {
            sum = vec![0.0; v.len()];
        }
        if v.len() != sum.len() {
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += f64::from(*x);
        }
        n += 1;
    }
    if n == 0 {
        return Vec::new();
    }
    sum.into_iter().map(|s| (s / n as f64) as f32).collect()
}
