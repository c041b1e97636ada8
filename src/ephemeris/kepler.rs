/// Convergence criterion on the eccentric anomaly (rad)
const KEPLER_TOLERANCE_RAD: f64 = 1.0E-12;

/// Maximal number of fixed point iterations
const KEPLER_MAX_ITER: usize = 100;

/// Solves Kepler's equation `E = M + e.sin(E)` by fixed point iteration.
/// Returns None when the iteration did not converge.
pub fn eccentric_anomaly(m_rad: f64, e: f64) -> Option<f64> {
    let mut e_k = m_rad;
    for _ in 0..KEPLER_MAX_ITER {
        let next = m_rad + e * e_k.sin();
        if (next - e_k).abs() < KEPLER_TOLERANCE_RAD {
            return Some(next);
        }
        e_k = next;
    }
    None
}

#[cfg(test)]
mod test {
    use super::eccentric_anomaly;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::f64::consts::TAU;

    #[test]
    fn circular_orbit() {
        assert_eq!(eccentric_anomaly(1.234, 0.0), Some(1.234));
    }

    #[test]
    fn gps_eccentricities_converge() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let e = rng.random_range(0.0..=0.02);
            let m = rng.random_range(0.0..TAU);
            let e_k = eccentric_anomaly(m, e).unwrap();
            assert!((e_k - e * e_k.sin() - m).abs() < 1.0E-11);
        }
    }

    #[test]
    fn pathological_eccentricity() {
        // contraction factor of e ~ 1 cannot converge in time
        assert!(eccentric_anomaly(0.001, 0.9999999).is_none());
    }
}
