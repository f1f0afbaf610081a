use faer::{Mat, MatRef};

use crate::correspondence::CorrespondenceStats;
use crate::error::CpdError;

/// Variance and objective of the Gaussian mixture after the last maximization step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceState {
    /// Isotropic variance of the mixture components. Always strictly positive.
    pub sigma2: f64,
    /// Objective correlated with the negative log-likelihood, only meaningful as a difference.
    pub q: f64,
    /// Absolute change of `q` in the last variance update.
    pub diff: f64,
}

/// Maximization step of an EM point set registration.
///
/// An external driver alternates the expectation step with the calls below, in this order:
///
/// 1. [`TransformEstimator::set_correspondence`] with the statistics of the current iteration.
/// 2. [`TransformEstimator::update_transform`].
/// 3. [`TransformEstimator::apply_in_place`].
/// 4. [`TransformEstimator::update_variance`].
///
/// and stops once [`VarianceState::diff`] falls below [`TransformEstimator::tolerance`]
/// or its own iteration budget runs out.
pub trait TransformEstimator {
    /// Snapshot of the transform parameters.
    type Params;

    /// Hand the statistics of the current expectation step to the estimator.
    fn set_correspondence(&mut self, stats: CorrespondenceStats) -> Result<(), CpdError>;

    /// Re-estimate the transform parameters from the current correspondence.
    fn update_transform(&mut self) -> Result<(), CpdError>;

    /// Recompute the cached transformed source cloud with the current parameters.
    fn apply_in_place(&mut self);

    /// Apply the current transform to an arbitrary point set without touching any state.
    fn apply(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CpdError>;

    /// Update the mixture variance and the convergence objective.
    fn update_variance(&mut self) -> Result<(), CpdError>;

    /// Current transform parameters.
    fn parameters(&self) -> Self::Params;

    /// Current variance, objective and objective change.
    fn variance(&self) -> VarianceState;

    /// The source cloud mapped through the current transform.
    fn transformed_source(&self) -> MatRef<'_, f64>;

    /// The fixed target cloud.
    fn target(&self) -> MatRef<'_, f64>;

    /// Convergence tolerance of the run.
    fn tolerance(&self) -> f64;
}
