use faer::{Mat, MatRef};

use crate::error::CpdError;
use crate::pointcloud::PointCloud;

/// Weighted correspondence statistics produced by the expectation step.
///
/// `P` is the M×N soft assignment matrix between the M source points and the
/// N target points. The remaining fields are its aggregates, recomputed every
/// iteration together with `P`.
#[derive(Debug, Clone)]
pub struct CorrespondenceStats {
    /// Soft assignment matrix (M×N), entries in `[0, 1]`.
    pub p: Mat<f64>,
    /// Row sums of `P` (length M).
    pub p1: Vec<f64>,
    /// Column sums of `P` (length N).
    pub pt1: Vec<f64>,
    /// Weighted aggregate of target positions. Its column sums equal `Σ_n Pt1_n · x_n`.
    pub px: Mat<f64>,
    /// Total assignment mass, the sum of all entries of `P`.
    pub np: f64,
}

impl CorrespondenceStats {
    /// Derive the aggregates from a soft assignment matrix.
    ///
    /// # Arguments
    ///
    /// * `p` - Soft assignment matrix (M×N).
    /// * `target` - Target point cloud with N points.
    /// * `source` - Source point cloud with M points.
    ///
    /// # Returns
    ///
    /// The statistics with `P1`, `Pt1`, `Np` and `PX = P · X`.
    pub fn from_probabilities(
        p: Mat<f64>,
        target: &PointCloud,
        source: &PointCloud,
    ) -> Result<Self, CpdError> {
        let (m, n) = (source.num_points(), target.num_points());
        check_shape("P", p.as_ref(), m, n)?;

        let p1 = (0..m)
            .map(|i| (0..n).map(|k| p.read(i, k)).sum())
            .collect::<Vec<f64>>();
        let pt1 = (0..n)
            .map(|k| (0..m).map(|i| p.read(i, k)).sum())
            .collect::<Vec<f64>>();
        let np = p1.iter().sum::<f64>();
        let px = p.as_ref() * target.as_ref();

        let stats = Self {
            p,
            p1,
            pt1,
            px,
            np,
        };
        stats.validate(n, m, target.dim())?;
        Ok(stats)
    }

    /// Check the statistics against a problem with N target points, M source points in D dimensions.
    pub fn validate(&self, n: usize, m: usize, d: usize) -> Result<(), CpdError> {
        check_shape("P", self.p.as_ref(), m, n)?;
        if self.p1.len() != m {
            return Err(CpdError::MismatchedShape {
                name: "P1",
                expected_rows: m,
                expected_cols: 1,
                rows: self.p1.len(),
                cols: 1,
            });
        }
        if self.pt1.len() != n {
            return Err(CpdError::MismatchedShape {
                name: "Pt1",
                expected_rows: n,
                expected_cols: 1,
                rows: self.pt1.len(),
                cols: 1,
            });
        }
        if self.px.ncols() != d {
            return Err(CpdError::MismatchedShape {
                name: "PX",
                expected_rows: self.px.nrows(),
                expected_cols: d,
                rows: self.px.nrows(),
                cols: self.px.ncols(),
            });
        }
        if !self.np.is_finite() || self.np <= 0.0 {
            return Err(CpdError::InvalidCorrespondence(format!(
                "total assignment mass must be positive, got {}",
                self.np
            )));
        }
        Ok(())
    }
}

fn check_shape(
    name: &'static str,
    mat: MatRef<'_, f64>,
    rows: usize,
    cols: usize,
) -> Result<(), CpdError> {
    if mat.nrows() != rows || mat.ncols() != cols {
        return Err(CpdError::MismatchedShape {
            name,
            expected_rows: rows,
            expected_cols: cols,
            rows: mat.nrows(),
            cols: mat.ncols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_probabilities() -> Result<(), Box<dyn std::error::Error>> {
        let target = PointCloud::from_vec(vec![[0.0, 0.0], [2.0, 0.0]])?;
        let source = PointCloud::from_vec(vec![[0.0, 1.0], [1.0, 1.0], [2.0, 1.0]])?;
        let p = faer::mat![[1.0, 0.0], [0.5, 0.5], [0.0, 0.25]];

        let stats = CorrespondenceStats::from_probabilities(p, &target, &source)?;

        assert_eq!(stats.p1, vec![1.0, 1.0, 0.25]);
        assert_eq!(stats.pt1, vec![1.5, 0.75]);
        assert_relative_eq!(stats.np, 2.25);
        assert_eq!(stats.px.nrows(), 3);
        assert_eq!(stats.px.ncols(), 2);

        // column sums of PX equal Σ_n Pt1_n · x_n
        let sum_x = (0..3).map(|i| stats.px.read(i, 0)).sum::<f64>();
        assert_relative_eq!(sum_x, 1.5);
        Ok(())
    }

    #[test]
    fn test_from_probabilities_bad_shape() -> Result<(), Box<dyn std::error::Error>> {
        let target = PointCloud::from_vec(vec![[0.0, 0.0], [2.0, 0.0]])?;
        let source = PointCloud::from_vec(vec![[0.0, 1.0]])?;
        let p = Mat::<f64>::zeros(2, 2);

        let res = CorrespondenceStats::from_probabilities(p, &target, &source);
        assert!(matches!(
            res,
            Err(CpdError::MismatchedShape { name: "P", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_validate_rejects_empty_mass() -> Result<(), Box<dyn std::error::Error>> {
        let target = PointCloud::from_vec(vec![[0.0, 0.0], [2.0, 0.0]])?;
        let source = PointCloud::from_vec(vec![[0.0, 1.0]])?;
        let p = Mat::<f64>::zeros(1, 2);

        let res = CorrespondenceStats::from_probabilities(p, &target, &source);
        assert!(matches!(res, Err(CpdError::InvalidCorrespondence(_))));
        Ok(())
    }

    #[test]
    fn test_validate_dimension() -> Result<(), Box<dyn std::error::Error>> {
        let stats = CorrespondenceStats {
            p: Mat::identity(2, 2),
            p1: vec![1.0, 1.0],
            pt1: vec![1.0, 1.0],
            px: Mat::zeros(2, 3),
            np: 2.0,
        };
        assert!(stats.validate(2, 2, 3).is_ok());
        assert!(matches!(
            stats.validate(2, 2, 2),
            Err(CpdError::MismatchedShape { name: "PX", .. })
        ));
        assert!(matches!(
            stats.validate(3, 2, 3),
            Err(CpdError::MismatchedShape { name: "P", .. })
        ));
        Ok(())
    }
}
