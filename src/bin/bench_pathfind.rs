use continuous_traffic_sim_core::shortest_path::{route, RouteEndpoint};
use continuous_traffic_sim_core::utils::test_worlds::grid_world;

// cargo build --release --bin bench_pathfind
// hyperfine -i --shell=none --output=pipe --runs 30 --warmup 2 -n "route" "./target/release/bench_pathfind"
pub fn main() {
    let world = grid_world(20);
    let start = *world.segments.first().unwrap();
    let dest = *world.segments.last().unwrap();

    for _ in 0..100 {
        match route(
            &world.session.network,
            RouteEndpoint::new(start),
            RouteEndpoint::new(dest),
        ) {
            Ok(path) => {
                let _ = path;
            }
            Err(e) => panic!("Error during route calculation: {:?}", e),
        }
    }
}
