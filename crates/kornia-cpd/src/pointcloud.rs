use faer::{Mat, MatRef};

use crate::error::CpdError;

/// A dense point cloud stored as an N×D matrix, one point per row.
#[derive(Debug, Clone)]
pub struct PointCloud(Mat<f64>);

impl PointCloud {
    /// Create a point cloud from a list of fixed size points.
    ///
    /// Example:
    ///
    /// ```
    /// use kornia_cpd::PointCloud;
    ///
    /// let pc = PointCloud::from_vec(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
    /// assert_eq!(pc.num_points(), 3);
    /// assert_eq!(pc.dim(), 2);
    /// ```
    pub fn from_vec<const D: usize>(points: Vec<[f64; D]>) -> Result<Self, CpdError> {
        if points.is_empty() || D == 0 {
            return Err(CpdError::EmptyPointCloud);
        }
        Ok(Self(Mat::from_fn(points.len(), D, |i, j| points[i][j])))
    }

    /// Wrap an existing N×D matrix.
    pub fn from_mat(points: Mat<f64>) -> Result<Self, CpdError> {
        if points.nrows() == 0 || points.ncols() == 0 {
            return Err(CpdError::EmptyPointCloud);
        }
        Ok(Self(points))
    }

    /// Number of points N.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.0.nrows()
    }

    /// Dimension D of each point.
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.ncols()
    }

    /// Borrow the points as an N×D matrix view.
    #[allow(clippy::should_implement_trait)]
    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, f64> {
        self.0.as_ref()
    }

    /// Copy the point at `index` out of the cloud.
    pub fn point(&self, index: usize) -> Vec<f64> {
        (0..self.dim()).map(|j| self.0.read(index, j)).collect()
    }

    /// Consume the cloud and return the underlying matrix.
    pub fn into_inner(self) -> Mat<f64> {
        self.0
    }
}

impl std::ops::Deref for PointCloud {
    type Target = Mat<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud_smoke() -> Result<(), CpdError> {
        let data = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let pc = PointCloud::from_vec(data)?;
        assert_eq!(pc.num_points(), 3);
        assert_eq!(pc.dim(), 3);
        assert_eq!(pc.point(1), vec![4.0, 5.0, 6.0]);
        assert_eq!(pc.read(2, 0), 7.0);

        let mat = pc.into_inner();
        assert_eq!(mat.nrows(), 3);
        assert_eq!(mat.read(0, 2), 3.0);
        Ok(())
    }

    #[test]
    fn test_pointcloud_empty() {
        let data: Vec<[f64; 2]> = vec![];
        let pc = PointCloud::from_vec(data);
        assert!(matches!(pc, Err(CpdError::EmptyPointCloud)));

        let pc = PointCloud::from_mat(Mat::zeros(0, 3));
        assert!(matches!(pc, Err(CpdError::EmptyPointCloud)));
    }
}
