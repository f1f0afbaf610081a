use faer::{Mat, MatRef, Side};

/// Weighted centroid recovered from an aggregate whose column sums already carry the weights.
///
/// Used for the target mean, where `Σ_rows PX = Σ_n Pt1_n · x_n`.
pub(crate) fn aggregate_centroid(aggregate: MatRef<'_, f64>, total_mass: f64) -> Vec<f64> {
    (0..aggregate.ncols())
        .map(|j| (0..aggregate.nrows()).map(|i| aggregate.read(i, j)).sum::<f64>() / total_mass)
        .collect()
}

/// Weighted centroid `Σ_i w_i · p_i / total_mass` of the rows of `points`.
///
/// With `weights = P1` this equals the column sums of `Pᵗ · Y` divided by `Np`.
pub(crate) fn weighted_centroid(
    points: MatRef<'_, f64>,
    weights: &[f64],
    total_mass: f64,
) -> Vec<f64> {
    debug_assert_eq!(points.nrows(), weights.len());
    (0..points.ncols())
        .map(|j| {
            weights
                .iter()
                .enumerate()
                .map(|(i, w)| w * points.read(i, j))
                .sum::<f64>()
                / total_mass
        })
        .collect()
}

/// Subtract `centroid` from every row of `points`.
pub(crate) fn center(points: MatRef<'_, f64>, centroid: &[f64]) -> Mat<f64> {
    Mat::from_fn(points.nrows(), points.ncols(), |i, j| {
        points.read(i, j) - centroid[j]
    })
}

/// Weighted sum of squared row norms, `Σ_i w_i · ‖p_i‖²`.
pub(crate) fn weighted_squared_norms(points: MatRef<'_, f64>, weights: &[f64]) -> f64 {
    debug_assert_eq!(points.nrows(), weights.len());
    weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let norm2 = (0..points.ncols())
                .map(|j| points.read(i, j).powi(2))
                .sum::<f64>();
            w * norm2
        })
        .sum()
}

/// Cross-covariance `A = X_hatᵗ · Pᵗ · Y_hat` (D×D).
///
/// `x_hat` is N×D, `p` is M×N and `y_hat` is M×D.
pub(crate) fn cross_covariance(
    x_hat: MatRef<'_, f64>,
    p: MatRef<'_, f64>,
    y_hat: MatRef<'_, f64>,
) -> Mat<f64> {
    // Pᵗ · Y_hat first keeps the intermediate at N×D
    let pt_y = p.transpose() * y_hat;
    x_hat.transpose() * pt_y.as_ref()
}

/// Sum of the diagonal entries.
pub(crate) fn trace(m: MatRef<'_, f64>) -> f64 {
    (0..m.nrows().min(m.ncols())).map(|i| m.read(i, i)).sum()
}

/// Smallest eigenvalue of the symmetric part `(M + Mᵗ) / 2`.
///
/// The quadratic form `xᵗ·M·x` only sees the symmetric part, so a square matrix is
/// positive semi-definite exactly when this value is non-negative.
pub(crate) fn min_symmetric_eigenvalue(m: MatRef<'_, f64>) -> f64 {
    let sym = Mat::from_fn(m.nrows(), m.ncols(), |i, j| {
        0.5 * (m.read(i, j) + m.read(j, i))
    });
    sym.as_ref()
        .selfadjoint_eigenvalues(Side::Lower)
        .into_iter()
        .fold(f64::INFINITY, f64::min)
}

/// Solve the weighted orthogonal Procrustes problem for the cross-covariance `a`.
///
/// With `A = U·Σ·Vᵗ` the rotation is `R = (U·diag(C)·Vᵗ)ᵗ` where `C = (1, .., 1, sign(det(U·Vᵗ)))`,
/// which forces `det(R) = +1` instead of returning a reflection.
pub(crate) fn procrustes_rotation(a: MatRef<'_, f64>) -> Mat<f64> {
    let d = a.nrows();
    let svd = a.svd();
    let u = svd.u();
    let v = svd.v();

    let uvt = u * v.transpose();
    let reflection = uvt.as_ref().determinant().signum();

    let mut c = Mat::<f64>::identity(d, d);
    c.write(d - 1, d - 1, reflection);

    // (U·C·Vᵗ)ᵗ = V·C·Uᵗ
    let vc = v * c.as_ref();
    vc.as_ref() * u.transpose()
}

/// Apply the row-vector rigid transform `s · Y · R + t` to every point of `points`.
pub(crate) fn apply_rigid(
    points: MatRef<'_, f64>,
    scale: f64,
    rotation: MatRef<'_, f64>,
    translation: MatRef<'_, f64>,
) -> Mat<f64> {
    let rotated = points * rotation;
    Mat::from_fn(points.nrows(), points.ncols(), |i, j| {
        scale * rotated.read(i, j) + translation.read(0, j)
    })
}

/// Initial isotropic variance `Σ_{m,n} ‖x_n − y_m‖² / (D·M·N)` between two clouds.
pub(crate) fn initial_sigma2(target: MatRef<'_, f64>, source: MatRef<'_, f64>) -> f64 {
    let (n, m, d) = (target.nrows(), source.nrows(), target.ncols());
    let mut acc = 0.0;
    for i in 0..m {
        for k in 0..n {
            acc += (0..d)
                .map(|j| (target.read(k, j) - source.read(i, j)).powi(2))
                .sum::<f64>();
        }
    }
    acc / (d * m * n) as f64
}
