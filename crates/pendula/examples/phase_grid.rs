//! Phase-grid demo.
//!
//! Runs a small ensemble for a few hundred frames and prints how the
//! energy spread and trail coverage evolve. Pass a JSON parameter file to
//! override the defaults; set `RUST_LOG=debug` for lifecycle logs.
//!
//! ```text
//! cargo run -p pendula --example phase_grid -- params.json
//! ```

use pendula::{SimParams, Simulation};

fn main() -> pendula::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let params = match std::env::args().nth(1) {
        Some(path) => SimParams::from_json_file(path)?,
        None => SimParams {
            grid_width: 64,
            grid_height: 64,
            sub_grid_width: 8,
            sub_grid_height: 8,
            ..SimParams::default()
        },
    };

    let mut sim = match Simulation::new(params.clone()) {
        Ok(sim) => sim,
        Err(e) if params.use_gpu => {
            println!("GPU unavailable ({e}), falling back to CPU");
            Simulation::new(SimParams {
                use_gpu: false,
                ..params
            })?
        }
        Err(e) => return Err(e),
    };

    let p = sim.params().clone();
    println!("Double-pendulum phase grid");
    println!("==========================\n");
    println!("  Backend: {}", sim.backend().name());
    println!("  Grid: {}x{}", p.grid_width, p.grid_height);
    println!("  dt: {} s, {} steps/frame", p.dt, p.steps_per_frame);
    println!("  Crop: {}x{} at {:?}\n", p.sub_grid_width, p.sub_grid_height, p.crop_origin);

    println!("Frame   Time (s)   E min      E max      Trail px");
    println!("--------------------------------------------------");
    for frame in 0..=300 {
        sim.frame()?;
        if frame % 50 == 0 {
            let energies = sim.energy_map()?;
            let (lo, hi) = energies
                .iter()
                .filter(|e| e.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
                    (lo.min(e), hi.max(e))
                });
            println!(
                "{:5}   {:8.3}   {:8.3}   {:8.3}   {:8}",
                frame,
                sim.steps_taken() as f64 * p.dt,
                lo,
                hi,
                sim.trail().lit_pixels()
            );
        }
    }

    sim.select_crop_origin(0.25, 0.75)?;
    println!("\nMoved crop origin to {:?}; trail cleared: {}", sim.crop_origin(), sim.trail().is_blank());
    Ok(())
}
