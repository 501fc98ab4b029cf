use continuous_traffic_sim_core::shortest_path::{route, RouteEndpoint};
use continuous_traffic_sim_core::utils::test_worlds::grid_world;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

pub fn benchmark_route(c: &mut Criterion) {
    // 20x20 grid, corner to corner
    let world = grid_world(20);
    let start = *world.segments.first().unwrap();
    let dest = *world.segments.last().unwrap();

    c.bench_function("route_grid_20x20", |b| {
        b.iter(|| {
            match route(
                black_box(&world.session.network),
                black_box(RouteEndpoint::new(start)),
                black_box(RouteEndpoint::new(dest)),
            ) {
                Ok(path) => {
                    let _ = path;
                }
                Err(e) => panic!("Error during route calculation: {:?}", e),
            }
        })
    });
}

criterion_group!(benches, benchmark_route);
criterion_main!(benches);
