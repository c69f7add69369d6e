//! Brute-force nearest-neighbor search. Point clouds are capped by the
//! sampling step so O(N*M) is acceptable.

/// Returns, for each point in `query`, the index into `reference` of its
/// nearest neighbor and the squared distance to it.
#[must_use]
pub fn nearest_neighbors(query: &[(f64, f64)], reference: &[(f64, f64)]) -> Vec<(usize, f64)> {
    query
        .iter()
        .map(|q| {
            let mut best_idx = 0usize;
            let mut best_d2 = f64::INFINITY;
            for (i, r) in reference.iter().enumerate() {
                let dx = q.0 - r.0;
                let dy = q.1 - r.1;
                let d2 = dx * dx + dy * dy;
                if d2 < best_d2 {
                    best_d2 = d2;
                    best_idx = i;
                }
            }
            (best_idx, best_d2)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_closest_point() {
        let reference = [(0.0, 0.0), (10.0, 10.0), (5.0, 5.0)];
        let query = [(4.5, 4.9), (10.1, 9.9)];
        let result = nearest_neighbors(&query, &reference);
        assert_eq!(result[0].0, 2);
        assert_eq!(result[1].0, 1);
    }
}
