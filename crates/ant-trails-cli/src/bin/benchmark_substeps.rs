use ant_trails_core::{SimConfig, StepTimings, World};
use std::time::Instant;

fn run(world: &mut World, frames: usize, frame_dt: f64) -> StepTimings {
    let mut total = StepTimings {
        substeps: 0,
        grid_update_us: 0,
        ant_update_us: 0,
        housekeeping_us: 0,
        total_us: 0,
    };
    for _ in 0..frames {
        let t = world.step(frame_dt);
        total.substeps += t.substeps;
        total.grid_update_us += t.grid_update_us;
        total.ant_update_us += t.ant_update_us;
        total.housekeeping_us += t.housekeeping_us;
        total.total_us += t.total_us;
    }
    total
}

fn main() {
    let ants = 5_000;
    let frames = 300;
    println!(
        "Benchmarking {} frames with {} ants on a 1600x1200 world",
        frames, ants
    );

    let config = SimConfig {
        width: 1600.0,
        height: 1200.0,
        initial_ants: ants,
        max_ants: ants,
        seed: 42,
        ..SimConfig::default()
    };

    for frame_dt in [1.0 / 60.0, 1.0 / 30.0, 0.12] {
        let mut world = World::new(config.clone());
        let start = Instant::now();
        let t = run(&mut world, frames, frame_dt);
        let elapsed = start.elapsed();
        println!(
            "frame_dt {:.4}: {} substeps in {:?} (avg {:?}/frame)",
            frame_dt,
            t.substeps,
            elapsed,
            elapsed / frames as u32
        );
        println!(
            "  grid {} us, ants {} us, housekeeping {} us, deliveries {}",
            t.grid_update_us,
            t.ant_update_us,
            t.housekeeping_us,
            world.total_deliveries()
        );
    }
}
