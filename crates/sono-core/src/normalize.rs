/// Epsilon évitant la division par zéro lors de la standardisation.
pub const NORM_EPSILON: f32 = 1e-7;

/// Standardise un buffer : `(x − mean) / (sqrt(variance) + ε)`.
///
/// Moyenne et variance sont calculées sur l'ensemble des éléments.
/// Fonction pure, l'entrée n'est pas modifiée. Une entrée constante
/// produit un buffer de zéros.
///
/// # Example
/// ```
/// use sono_core::normalize::normalize;
/// let out = normalize(&[2.0, 2.0, 2.0]);
/// assert_eq!(out, vec![0.0, 0.0, 0.0]);
/// ```
#[must_use]
pub fn normalize(data: &[f32]) -> Vec<f32> {
    if data.is_empty() {
        return Vec::new();
    }
    let n = data.len() as f32;
    let mean = data.iter().sum::<f32>() / n;
    let variance = data
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f32>()
        / n;
    let denom = variance.sqrt() + NORM_EPSILON;
    data.iter().map(|x| (x - mean) / denom).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_of(data: &[f32]) -> f32 {
        data.iter().sum::<f32>() / data.len() as f32
    }

    fn variance_of(data: &[f32]) -> f32 {
        let m = mean_of(data);
        data.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / data.len() as f32
    }

    #[test]
    fn output_has_zero_mean_unit_variance() {
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin() * 5.0 + 2.0).collect();
        let out = normalize(&input);
        assert!(mean_of(&out).abs() < 1e-4);
        assert!((variance_of(&out) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn constant_input_yields_zeros_not_a_blowup() {
        let out = normalize(&[7.5; 16]);
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn input_is_not_mutated() {
        let input = vec![1.0, 2.0, 3.0];
        let _ = normalize(&input);
        assert_eq!(input, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(normalize(&[]).is_empty());
    }
}
