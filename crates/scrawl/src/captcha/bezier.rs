//! Bezier curve interpolation.
//!
//! Curves are sampled at 21 evenly spaced parameters (`t = 0, 0.05, ..., 1`).
//! The Bernstein coefficients for a given control point count only depend
//! on that count, so they are computed once and shared.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use scrawl_common::constants::BEZIER_SAMPLES;
use scrawl_common::{Result, ScrawlError};

/// One coefficient row per sample parameter, `point_count` entries per row
pub type CoefficientTable = Vec<Vec<f64>>;

static SHARED: LazyLock<Arc<BezierCache>> = LazyLock::new(|| Arc::new(BezierCache::new()));

/// Append-only memo of coefficient tables keyed by control point count
#[derive(Debug, Default)]
pub struct BezierCache {
    tables: RwLock<HashMap<usize, Arc<CoefficientTable>>>,
}

impl BezierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache instance
    pub fn shared() -> Arc<Self> {
        SHARED.clone()
    }

    /// Coefficient table for `point_count` control points.
    ///
    /// Entries are written at most once per key and never modified, so a
    /// poisoned lock still guards consistent data.
    pub fn coefficients(&self, point_count: usize) -> Result<Arc<CoefficientTable>> {
        if point_count < 2 {
            return Err(ScrawlError::InvalidInput(format!(
                "a Bezier curve needs at least 2 control points, got {point_count}"
            )));
        }

        if let Some(table) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&point_count)
        {
            return Ok(table.clone());
        }

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .entry(point_count)
            .or_insert_with(|| Arc::new(compute_table(point_count)));

        Ok(table.clone())
    }

    /// Sample the curve through `control_points` at every table parameter
    pub fn evaluate(&self, control_points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
        let table = self.coefficients(control_points.len())?;

        Ok(table
            .iter()
            .map(|row| {
                row.iter()
                    .zip(control_points)
                    .fold((0.0, 0.0), |(x, y), (c, p)| (x + c * p.0, y + c * p.1))
            })
            .collect())
    }

    /// Number of point counts cached so far
    pub fn len(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row `n` of Pascal's triangle (`n + 1` binomial coefficients)
pub fn pascal_row(n: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(n + 1);
    let mut value = 1.0_f64;
    row.push(value);
    for k in 1..=n {
        value = value * (n + 1 - k) as f64 / k as f64;
        row.push(value.round());
    }
    row
}

fn compute_table(point_count: usize) -> CoefficientTable {
    let degree = point_count - 1;
    let binomials = pascal_row(degree);
    let last = (BEZIER_SAMPLES - 1) as f64;

    (0..BEZIER_SAMPLES)
        .map(|step| {
            let t = step as f64 / last;
            binomials
                .iter()
                .enumerate()
                .map(|(i, c)| c * t.powi(i as i32) * (1.0 - t).powi((degree - i) as i32))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_rows() {
        assert_eq!(pascal_row(0), vec![1.0]);
        assert_eq!(pascal_row(1), vec![1.0, 1.0]);
        assert_eq!(pascal_row(4), vec![1.0, 4.0, 6.0, 4.0, 1.0]);
        assert_eq!(pascal_row(5), vec![1.0, 5.0, 10.0, 10.0, 5.0, 1.0]);
    }

    #[test]
    fn test_rows_partition_unity() {
        let cache = BezierCache::new();

        for n in 2..=9 {
            let table = cache.coefficients(n).unwrap();
            assert_eq!(table.len(), BEZIER_SAMPLES);
            for row in table.iter() {
                assert_eq!(row.len(), n);
                let sum: f64 = row.iter().sum();
                assert!((sum - 1.0).abs() < 1e-9, "row sums to {sum}");
            }
        }
    }

    #[test]
    fn test_table_endpoints() {
        let cache = BezierCache::new();
        let table = cache.coefficients(4).unwrap();

        assert_eq!(table[0], vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(table[BEZIER_SAMPLES - 1], vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_coefficients_memoized() {
        let cache = BezierCache::new();

        let first = cache.coefficients(5).unwrap();
        let snapshot = (*first).clone();
        let again = cache.coefficients(5).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        // A new key leaves earlier entries alone
        cache.coefficients(7).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(*cache.coefficients(5).unwrap(), snapshot);
    }

    #[test]
    fn test_too_few_points_rejected() {
        let cache = BezierCache::new();

        assert!(matches!(cache.coefficients(1), Err(ScrawlError::InvalidInput(_))));
        assert!(matches!(cache.evaluate(&[]), Err(ScrawlError::InvalidInput(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_linear_curve() {
        let cache = BezierCache::new();
        let points = cache.evaluate(&[(0.0, 0.0), (20.0, 0.0)]).unwrap();

        assert_eq!(points.len(), BEZIER_SAMPLES);
        assert_eq!(points[0], (0.0, 0.0));
        assert!((points[BEZIER_SAMPLES - 1].0 - 20.0).abs() < 1e-9);
        assert!(points.iter().all(|p| p.1 == 0.0));
        assert!(points.windows(2).all(|w| w[1].0 > w[0].0));
    }

    #[test]
    fn test_shared_cache_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| BezierCache::shared().coefficients(6).unwrap()))
            .collect();

        let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(tables.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
