use thiserror::Error;

/// Error types for the coherent point drift estimators.
#[derive(Debug, Error)]
pub enum CpdError {
    /// Rigid registration is only defined for planar and spatial point clouds.
    #[error("Rigid registration only supports 2D or 3D point clouds, got D = {0}")]
    UnsupportedDimension(usize),

    /// A point cloud without points was provided.
    #[error("Point cloud data is empty")]
    EmptyPointCloud,

    /// Target and source clouds live in different spaces.
    #[error("Target has dimension {target_dim} but source has dimension {source_dim}")]
    DimensionMismatch {
        /// Dimension of the target cloud.
        target_dim: usize,
        /// Dimension of the source cloud.
        source_dim: usize,
    },

    /// A matrix or vector input does not have the expected shape.
    #[error("Mismatched shape for {name}: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    MismatchedShape {
        /// Label of the offending input.
        name: &'static str,
        /// Expected number of rows.
        expected_rows: usize,
        /// Expected number of columns.
        expected_cols: usize,
        /// Actual number of rows.
        rows: usize,
        /// Actual number of columns.
        cols: usize,
    },

    /// The seed rotation fails the positive semi-definiteness check.
    #[error("The seed rotation must be positive semi-definite, smallest eigenvalue of its symmetric part is {0}")]
    RotationNotPositiveSemiDefinite(f64),

    /// The seed scale is not a positive number.
    #[error("The scale factor must be a positive number, got {0}")]
    InvalidScale(f64),

    /// The convergence tolerance is not a positive number.
    #[error("The tolerance must be a positive number, got {0}")]
    InvalidTolerance(f64),

    /// The initial variance is not a positive number.
    #[error("The initial variance must be a positive number, got {0}")]
    InvalidVariance(f64),

    /// Scale, rotation and translation updates are all disabled.
    #[error("One of scale, rotation or translation updates needs to be enabled")]
    NoTransformEnabled,

    /// The correspondence statistics are inconsistent.
    #[error("Invalid correspondence statistics: {0}")]
    InvalidCorrespondence(String),

    /// The transform was requested before any correspondence was provided.
    #[error("No correspondence statistics available, call set_correspondence first")]
    MissingCorrespondence,

    /// The variance was requested before the transform of the current iteration.
    #[error("The transform has not been updated for the current correspondence")]
    TransformNotUpdated,

    /// The cross-covariance matrix contains non-finite entries.
    #[error("Cross-covariance matrix contains non-finite values")]
    NonFiniteCovariance,

    /// The weighted spread of the source cloud vanishes, the scale is undefined.
    #[error("Weighted source spread is {0}, cannot estimate the scale")]
    DegenerateSource(f64),
}
