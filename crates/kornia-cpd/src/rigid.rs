use faer::{Mat, MatRef};

use crate::correspondence::CorrespondenceStats;
use crate::error::CpdError;
use crate::estimator::{TransformEstimator, VarianceState};
use crate::ops;
use crate::pointcloud::PointCloud;

/// Eigenvalues of the seed rotation's symmetric part above this bound count as non-negative.
const PSD_EPSILON: f64 = 1e-12;

/// Selects which rigid parameters are re-estimated at every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateFlags {
    /// Update the uniform scale.
    pub scale: bool,
    /// Update the rotation.
    pub rotation: bool,
    /// Update the translation.
    pub translation: bool,
}

impl Default for UpdateFlags {
    fn default() -> Self {
        Self {
            scale: true,
            rotation: true,
            translation: true,
        }
    }
}

impl UpdateFlags {
    fn any(&self) -> bool {
        self.scale || self.rotation || self.translation
    }
}

/// Configuration of a rigid registration run.
#[derive(Debug, Clone)]
pub struct RigidConfig {
    /// Seed rotation (D×D). Identity when absent.
    pub rotation: Option<Mat<f64>>,
    /// Seed translation (1×D). Zero when absent.
    pub translation: Option<Mat<f64>>,
    /// Seed scale. One when absent.
    pub scale: Option<f64>,
    /// Parameters updated at every iteration.
    pub flags: UpdateFlags,
    /// Convergence tolerance on the objective change, also used to floor the variance.
    pub tolerance: f64,
    /// Initial variance. Estimated from the point clouds when absent.
    pub sigma2: Option<f64>,
}

impl Default for RigidConfig {
    fn default() -> Self {
        Self {
            rotation: None,
            translation: None,
            scale: None,
            flags: UpdateFlags::default(),
            tolerance: 1e-3,
            sigma2: None,
        }
    }
}

/// Rigid transform mapping a row point `y` to `scale * y * rotation + translation`.
#[derive(Debug, Clone)]
pub struct RigidParams {
    /// Uniform scale factor.
    pub scale: f64,
    /// Rotation matrix (D×D).
    pub rotation: Mat<f64>,
    /// Translation row vector (1×D).
    pub translation: Mat<f64>,
}

/// Quantities of the last transform update reused by the variance update.
#[derive(Debug, Clone)]
struct MStepCache {
    target_centered: Mat<f64>,
    cross_covariance: Mat<f64>,
    ypy: f64,
}

/// Rigid coherent point drift: the closed form maximization step for scale, rotation and translation.
///
/// Example:
///
/// ```
/// use kornia_cpd::{CorrespondenceStats, PointCloud, RigidConfig, RigidRegistration, TransformEstimator};
///
/// let target = PointCloud::from_vec(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
/// let source = target.clone();
/// let mut reg = RigidRegistration::new(target.clone(), source.clone(), RigidConfig::default()).unwrap();
///
/// let stats = CorrespondenceStats::from_probabilities(faer::Mat::identity(3, 3), &target, &source).unwrap();
/// reg.set_correspondence(stats).unwrap();
/// reg.update_transform().unwrap();
/// reg.apply_in_place();
/// reg.update_variance().unwrap();
///
/// assert!((reg.parameters().scale - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct RigidRegistration {
    target: PointCloud,
    source: PointCloud,
    transformed: Mat<f64>,
    params: RigidParams,
    flags: UpdateFlags,
    tolerance: f64,
    variance: VarianceState,
    stats: Option<CorrespondenceStats>,
    cache: Option<MStepCache>,
}

impl RigidRegistration {
    /// Create a rigid registration between a target and a source point cloud.
    ///
    /// # Arguments
    ///
    /// * `target` - Fixed point cloud (N×D).
    /// * `source` - Moving point cloud (M×D).
    /// * `config` - Seeds, update flags, tolerance and initial variance.
    ///
    /// # Returns
    ///
    /// A registration in its initial state or the first validation error found.
    pub fn new(
        target: PointCloud,
        source: PointCloud,
        config: RigidConfig,
    ) -> Result<Self, CpdError> {
        let d = target.dim();
        if source.dim() != d {
            return Err(CpdError::DimensionMismatch {
                target_dim: d,
                source_dim: source.dim(),
            });
        }
        if d != 2 && d != 3 {
            return Err(CpdError::UnsupportedDimension(d));
        }

        let rotation = match config.rotation {
            Some(r) => {
                if r.nrows() != d || r.ncols() != d {
                    return Err(CpdError::MismatchedShape {
                        name: "rotation",
                        expected_rows: d,
                        expected_cols: d,
                        rows: r.nrows(),
                        cols: r.ncols(),
                    });
                }
                let min_eig = ops::min_symmetric_eigenvalue(r.as_ref());
                if min_eig.is_nan() || min_eig < -PSD_EPSILON {
                    return Err(CpdError::RotationNotPositiveSemiDefinite(min_eig));
                }
                r
            }
            None => Mat::identity(d, d),
        };

        let translation = match config.translation {
            Some(t) => {
                if t.nrows() != 1 || t.ncols() != d {
                    return Err(CpdError::MismatchedShape {
                        name: "translation",
                        expected_rows: 1,
                        expected_cols: d,
                        rows: t.nrows(),
                        cols: t.ncols(),
                    });
                }
                t
            }
            None => Mat::zeros(1, d),
        };

        let scale = match config.scale {
            Some(s) if !(s.is_finite() && s > 0.0) => return Err(CpdError::InvalidScale(s)),
            Some(s) => s,
            None => 1.0,
        };

        if !config.flags.any() {
            return Err(CpdError::NoTransformEnabled);
        }

        if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
            return Err(CpdError::InvalidTolerance(config.tolerance));
        }

        let sigma2 = match config.sigma2 {
            Some(v) if !(v.is_finite() && v > 0.0) => return Err(CpdError::InvalidVariance(v)),
            Some(v) => v,
            None => {
                let v = ops::initial_sigma2(target.as_ref(), source.as_ref());
                if v > 0.0 {
                    v
                } else {
                    config.tolerance / 10.0
                }
            }
        };

        let transformed = ops::apply_rigid(
            source.as_ref(),
            scale,
            rotation.as_ref(),
            translation.as_ref(),
        );

        log::debug!(
            "Rigid registration: N = {}, M = {}, D = {}, sigma2 = {}",
            target.num_points(),
            source.num_points(),
            d,
            sigma2
        );

        Ok(Self {
            target,
            source,
            transformed,
            params: RigidParams {
                scale,
                rotation,
                translation,
            },
            flags: config.flags,
            tolerance: config.tolerance,
            variance: VarianceState {
                sigma2,
                q: f64::INFINITY,
                diff: f64::INFINITY,
            },
            stats: None,
            cache: None,
        })
    }

    /// Dimension D of the registered point clouds.
    #[inline]
    pub fn dim(&self) -> usize {
        self.target.dim()
    }

    /// The moving point cloud as given at construction.
    pub fn source(&self) -> MatRef<'_, f64> {
        self.source.as_ref()
    }

    /// Parameters updated at every iteration.
    pub fn flags(&self) -> UpdateFlags {
        self.flags
    }

    /// The statistics of the current iteration, if any.
    pub fn correspondence(&self) -> Option<&CorrespondenceStats> {
        self.stats.as_ref()
    }
}

impl TransformEstimator for RigidRegistration {
    type Params = RigidParams;

    fn set_correspondence(&mut self, stats: CorrespondenceStats) -> Result<(), CpdError> {
        stats.validate(
            self.target.num_points(),
            self.source.num_points(),
            self.dim(),
        )?;
        self.stats = Some(stats);
        self.cache = None;
        Ok(())
    }

    fn update_transform(&mut self) -> Result<(), CpdError> {
        let stats = self.stats.as_ref().ok_or(CpdError::MissingCorrespondence)?;

        // weighted means of both clouds
        let mu_x = ops::aggregate_centroid(stats.px.as_ref(), stats.np);
        let mu_y = ops::weighted_centroid(self.source.as_ref(), &stats.p1, stats.np);

        let x_hat = ops::center(self.target.as_ref(), &mu_x);
        let y_hat = ops::center(self.source.as_ref(), &mu_y);
        let ypy = ops::weighted_squared_norms(y_hat.as_ref(), &stats.p1);

        let a = ops::cross_covariance(x_hat.as_ref(), stats.p.as_ref(), y_hat.as_ref());
        let finite = (0..a.nrows()).all(|i| (0..a.ncols()).all(|j| a.read(i, j).is_finite()));
        if !finite {
            return Err(CpdError::NonFiniteCovariance);
        }
        if self.flags.scale && !(ypy.is_finite() && ypy > 0.0) {
            return Err(CpdError::DegenerateSource(ypy));
        }

        if self.flags.rotation {
            self.params.rotation = ops::procrustes_rotation(a.as_ref());
        }

        if self.flags.scale {
            let atrt = a.transpose() * self.params.rotation.transpose();
            self.params.scale = ops::trace(atrt.as_ref()) / ypy;
        }

        if self.flags.translation {
            // t = mu_x - s * mu_y * R
            let (d, s, r) = (self.dim(), self.params.scale, &self.params.rotation);
            self.params.translation = Mat::from_fn(1, d, |_, j| {
                let rotated = (0..d).map(|k| mu_y[k] * r.read(k, j)).sum::<f64>();
                mu_x[j] - s * rotated
            });
        }

        log::debug!(
            "Np: {}, YPY: {}, scale: {}",
            stats.np,
            ypy,
            self.params.scale
        );

        self.cache = Some(MStepCache {
            target_centered: x_hat,
            cross_covariance: a,
            ypy,
        });

        Ok(())
    }

    fn apply_in_place(&mut self) {
        self.transformed = ops::apply_rigid(
            self.source.as_ref(),
            self.params.scale,
            self.params.rotation.as_ref(),
            self.params.translation.as_ref(),
        );
    }

    fn apply(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CpdError> {
        if points.ncols() != self.dim() {
            return Err(CpdError::MismatchedShape {
                name: "points",
                expected_rows: points.nrows(),
                expected_cols: self.dim(),
                rows: points.nrows(),
                cols: points.ncols(),
            });
        }
        Ok(ops::apply_rigid(
            points,
            self.params.scale,
            self.params.rotation.as_ref(),
            self.params.translation.as_ref(),
        ))
    }

    fn update_variance(&mut self) -> Result<(), CpdError> {
        let cache = self.cache.as_ref().ok_or(CpdError::TransformNotUpdated)?;
        let stats = self.stats.as_ref().ok_or(CpdError::MissingCorrespondence)?;

        let q_prev = self.variance.q;
        let sigma2 = self.variance.sigma2;
        let s = self.params.scale;
        let d = self.dim() as f64;

        let ar = cache.cross_covariance.as_ref() * self.params.rotation.as_ref();
        let tr_ar = ops::trace(ar.as_ref());
        let xpx = ops::weighted_squared_norms(cache.target_centered.as_ref(), &stats.pt1);

        let q = (xpx - 2.0 * s * tr_ar + s * s * cache.ypy) / (2.0 * sigma2)
            + d * stats.np / 2.0 * sigma2.ln();
        let diff = (q - q_prev).abs();

        let mut sigma2 = (xpx - s * tr_ar) / (stats.np * d);
        if sigma2.is_nan() || sigma2 <= 0.0 {
            log::warn!(
                "Non-positive variance {}, clamping to {}",
                sigma2,
                self.tolerance / 10.0
            );
            sigma2 = self.tolerance / 10.0;
        }

        log::debug!("sigma2: {}, q: {}, diff: {}", sigma2, q, diff);

        self.variance = VarianceState { sigma2, q, diff };
        Ok(())
    }

    fn parameters(&self) -> RigidParams {
        self.params.clone()
    }

    fn variance(&self) -> VarianceState {
        self.variance
    }

    fn transformed_source(&self) -> MatRef<'_, f64> {
        self.transformed.as_ref()
    }

    fn target(&self) -> MatRef<'_, f64> {
        self.target.as_ref()
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
