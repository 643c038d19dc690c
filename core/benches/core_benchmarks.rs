use criterion::{Criterion, black_box, criterion_group, criterion_main};

use prism_core::math::Vec3;
use prism_core::{Camera, WorkerPool};

// ---------------------------------------------------------------------------
// Frustum culling
// ---------------------------------------------------------------------------

fn sphere_grid(count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let x = (i % 100) as f32 - 50.0;
            let z = -((i / 100) as f32) - 1.0;
            Vec3::new(x, 0.0, z)
        })
        .collect()
}

fn bench_frustum_extraction(c: &mut Criterion) {
    let camera = Camera::default();
    c.bench_function("frustum_from_camera", |b| {
        b.iter(|| black_box(camera.frustum(black_box(16.0 / 9.0))));
    });
}

fn bench_sphere_culling_10k(c: &mut Criterion) {
    let frustum = Camera::default().frustum(16.0 / 9.0);
    let centers = sphere_grid(10_000);
    c.bench_function("cull_10k_spheres", |b| {
        b.iter(|| {
            centers
                .iter()
                .filter(|center| frustum.is_sphere_visible(center, 0.5))
                .count()
        });
    });
}

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

fn bench_worker_pool_round_trip(c: &mut Criterion) {
    let pool = WorkerPool::new(4);
    c.bench_function("worker_pool_64_jobs", |b| {
        b.iter(|| {
            for i in 0..64u64 {
                pool.push(move || {
                    black_box(i * i);
                });
            }
            pool.join();
        });
    });
}

criterion_group!(
    benches,
    bench_frustum_extraction,
    bench_sphere_culling_10k,
    bench_worker_pool_round_trip
);
criterion_main!(benches);
