//! Air Table demo runner
//!
//! Lays out a seeded rack of pucks, runs the table for a while and logs
//! what happened. Usage: `air-table [config.json] [ticks] [seed]`.
//! Set `RUST_LOG=debug` to see per-tick contacts.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Air Table (native) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = demo::run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the product on wasm; there is no demo loop
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::time::Duration;

    use air_table::sim::{ForceChannel, Wall};
    use air_table::{EngineKind, PuckDesc, Result, SpringDesc, SpringEnd, Table, TableConfig};
    use glam::DVec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const DEFAULT_TICKS: u64 = 600;
    const DEFAULT_SEED: u64 = 0x5eed;

    pub fn run(args: &[String]) -> Result<()> {
        let config = match args.first() {
            Some(path) => TableConfig::load(path)?,
            None => TableConfig::default(),
        };
        let ticks = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_TICKS);
        let seed = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_SEED);

        let mut table = Table::new(config)?;
        let mut rng = Pcg32::seed_from_u64(seed);
        lay_out(&mut table, &mut rng)?;
        log::info!("Seed {}: {} pucks, {} springs", seed, table.pucks().len(), table.springs().count());

        let start_energy = kinetic_energy(&table);
        let mut hits = 0;
        for _ in 0..ticks {
            let report = table.advance_tick();
            hits += report.hits.len();

            for id in table.collect_expired_bullets() {
                table.delete_puck(id)?;
            }
        }

        log::info!(
            "After {} ticks (t={:.2}s): {} collisions, {} hits, kinetic energy {:.3} -> {:.3}",
            table.tick(),
            table.time(),
            table.collision_count(),
            hits,
            start_energy,
            kinetic_energy(&table)
        );
        if table.any_tangled() {
            log::info!("Tangled pucks: {:?}", table.tangled_pucks());
        }

        if table.engine_kind() == EngineKind::Exact {
            replay_backward(&mut table, ticks)?;
        }
        Ok(())
    }

    /// A loose rack of pucks, one spring pair, an anchored tether and a bullet
    fn lay_out(table: &mut Table, rng: &mut Pcg32) -> Result<()> {
        let bounds = *table.bounds();
        let center = bounds.center();

        for row in 0..3 {
            for col in 0..4 {
                let jitter = DVec2::new(rng.random_range(-0.05..0.05), rng.random_range(-0.05..0.05));
                let position = DVec2::new(bounds.left + 2.0 + col as f64 * 1.3, bounds.bottom + 1.5 + row as f64 * 1.3);
                let velocity = DVec2::new(rng.random_range(-1.5..1.5), rng.random_range(-1.5..1.5));
                let radius = rng.random_range(0.3..0.5);
                table.create_puck(PuckDesc::new(position + jitter, radius, 1.0).with_velocity(velocity))?;
            }
        }

        let a = table.create_puck(PuckDesc::new(center + DVec2::new(1.5, 1.5), 0.35, 2.0))?;
        let b = table.create_puck(PuckDesc::new(center + DVec2::new(3.0, 1.5), 0.35, 2.0))?;
        table.create_spring(SpringDesc::new(a, SpringEnd::Puck(b), 1.2, 40.0).with_damping(0.5))?;
        table.create_spring(SpringDesc::new(
            a,
            SpringEnd::Fixed(center + DVec2::new(1.5, 3.0)),
            1.0,
            20.0,
        ))?;
        table.apply_force(b, DVec2::new(0.0, -30.0), ForceChannel::Propulsion)?;

        let bullet = table.create_puck(
            PuckDesc::new(DVec2::new(bounds.right - 0.5, center.y), 0.1, 5.0)
                .with_bullet(3.0)
                .with_owner(1)
                .with_group(-1),
        )?;
        let muzzle = DVec2::new(bounds.right - 0.5, center.y);
        table.throw_later(bullet, Duration::from_millis(50), muzzle, DVec2::new(-8.0, 0.3))?;

        // Obstacle walls only matter in the delegate engine
        table.create_wall(Wall::new(center + DVec2::new(0.0, -2.5), 1.0, 0.1).with_rotation(0.3));
        Ok(())
    }

    fn kinetic_energy(table: &Table) -> f64 {
        table.pucks().iter().map(|p| 0.5 * p.mass() * p.velocity.length_squared()).sum()
    }

    /// Run the same number of ticks backward and report the drift
    fn replay_backward(table: &mut Table, ticks: u64) -> Result<()> {
        let forward_count = table.collision_count();
        table.reverse_time()?;
        for _ in 0..ticks {
            table.advance_tick();
        }
        log::info!(
            "Reversed {} ticks: t={:.6}, collision count {} -> {}",
            ticks,
            table.time(),
            forward_count,
            table.collision_count()
        );
        Ok(())
    }
}
