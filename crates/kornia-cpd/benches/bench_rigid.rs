use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use faer::Mat;
use kornia_cpd::{CorrespondenceStats, PointCloud, RigidConfig, RigidRegistration, TransformEstimator};

fn bench_rigid_mstep(c: &mut Criterion) {
    let mut group = c.benchmark_group("rigid_mstep");

    for num_points in [100, 500, 1000].iter() {
        let points = (0..*num_points)
            .map(|_| {
                [
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                ]
            })
            .collect::<Vec<_>>();
        let target = PointCloud::from_vec(points.clone()).unwrap();
        let source = PointCloud::from_vec(points).unwrap();

        // dense uniform assignment, the worst case for the cross-covariance product
        let p = Mat::from_fn(*num_points, *num_points, |_, _| 1.0 / *num_points as f64);
        let stats = CorrespondenceStats::from_probabilities(p, &target, &source).unwrap();

        let mut reg = RigidRegistration::new(target, source, RigidConfig::default()).unwrap();
        reg.set_correspondence(stats).unwrap();

        group.bench_with_input(
            BenchmarkId::new("update_transform", num_points),
            num_points,
            |b, _| {
                b.iter(|| {
                    reg.update_transform().unwrap();
                    black_box(reg.parameters());
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("mstep", num_points),
            num_points,
            |b, _| {
                b.iter(|| {
                    reg.update_transform().unwrap();
                    reg.apply_in_place();
                    reg.update_variance().unwrap();
                    black_box(reg.variance());
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_rigid_mstep);
criterion_main!(benches);
