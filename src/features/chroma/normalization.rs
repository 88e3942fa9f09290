//! Chroma normalization

const EPSILON: f32 = 1e-10;

/// Scale a chroma vector so its largest element is 1
///
/// Vectors with no energy are left untouched.
pub fn normalize_max(chroma: &mut [f32]) {
    let max = chroma.iter().copied().fold(0.0f32, f32::max);
    if max > EPSILON {
        for v in chroma.iter_mut() {
            *v /= max;
        }
    }
}

/// L2 norm of a feature vector
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_max() {
        let mut v = vec![0.5, 2.0, 1.0];
        normalize_max(&mut v);
        assert_eq!(v, vec![0.25, 1.0, 0.5]);
    }

    #[test]
    fn test_normalize_silent_frame() {
        let mut v = vec![0.0; 12];
        normalize_max(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_l2_norm() {
        assert!((l2_norm(&[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }
}
