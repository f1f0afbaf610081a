#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod correspondence;
pub use correspondence::CorrespondenceStats;

mod error;
pub use error::CpdError;

mod estimator;
pub use estimator::{TransformEstimator, VarianceState};

mod ops;

mod pointcloud;
pub use pointcloud::PointCloud;

mod rigid;
pub use rigid::{RigidConfig, RigidParams, RigidRegistration, UpdateFlags};
