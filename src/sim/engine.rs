//! Collision engines: the per-tick "advance" strategy
//!
//! The table picks one engine at construction (or on request) and hands it
//! a `StepContext` every tick after springs have accumulated their forces.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::{
    Contact, FenceParams, HitEvent, hit_between, mark_tangled, resolve_exact_step, resolve_pair_approximate, scan_pairs,
};
use super::fence::resolve_wall_collisions;
use super::integrate::integrate;
use super::puck::{Puck, index_of};
use super::wall::{Bounds, Wall, WallId};

/// Which engine advances the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineKind {
    /// Self-contained integrator with the penetration-time back-solve
    #[default]
    Approximate,
    /// Self-contained integrator with exact, reversible contact reconstruction
    Exact,
    /// External rigid-body solver
    Delegate,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Approximate => "approximate",
            EngineKind::Exact => "exact",
            EngineKind::Delegate => "delegate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approximate" | "approx" => Some(EngineKind::Approximate),
            "exact" | "kiss" | "perfect-kiss" => Some(EngineKind::Exact),
            "delegate" | "rapier" => Some(EngineKind::Delegate),
            _ => None,
        }
    }
}

/// Everything an engine may read or mutate during one tick
pub struct StepContext<'a> {
    /// Sorted by id
    pub pucks: &'a mut [Puck],
    pub walls: &'a [(WallId, Wall)],
    pub bounds: Bounds,
    pub gravity: DVec2,
    /// Signed timestep (negative when time runs backward)
    pub dt: f64,
    /// Simulation time at the start of the tick
    pub time: f64,
    pub table_restitution: f64,
    pub wall_correction: bool,
    pub puck_correction: bool,
    pub tangle_factor: f64,
    /// +1 forward, -1 backward
    pub count_direction: i64,
}

/// What happened during one engine step
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub contacts: Vec<Contact>,
    pub hits: Vec<HitEvent>,
    /// Signed change to the table's collision counter
    pub collision_delta: i64,
}

/// A uniform "advance one tick" contract
pub trait CollisionEngine {
    fn kind(&self) -> EngineKind;

    /// Integrate every puck and resolve the resulting collisions
    fn step(&mut self, ctx: StepContext<'_>) -> StepOutcome;

    /// Whether a negated timestep reproduces earlier states
    fn supports_time_reversal(&self) -> bool {
        false
    }
}

/// Turn contacts into hit notifications
fn collect_hits(pucks: &[Puck], contacts: &[Contact], time: f64) -> Vec<HitEvent> {
    contacts
        .iter()
        .filter_map(|c| {
            let a = &pucks[index_of(pucks, c.a)?];
            let b = &pucks[index_of(pucks, c.b)?];
            hit_between(a, b, time)
        })
        .collect()
}

/// Integration plus the penetration-time back-solve
#[derive(Debug, Default)]
pub struct ApproximateEngine;

impl CollisionEngine for ApproximateEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Approximate
    }

    fn step(&mut self, ctx: StepContext<'_>) -> StepOutcome {
        for puck in ctx.pucks.iter_mut() {
            integrate(puck, ctx.gravity, ctx.dt);
        }
        if ctx.dt == 0.0 {
            return StepOutcome::default();
        }

        for puck in ctx.pucks.iter_mut() {
            resolve_wall_collisions(puck, &ctx.bounds, ctx.table_restitution, ctx.wall_correction);
        }

        let correct = ctx.puck_correction;
        let contacts = scan_pairs(ctx.pucks, |a, b| resolve_pair_approximate(a, b, correct));
        mark_tangled(ctx.pucks, ctx.tangle_factor);

        StepOutcome {
            hits: collect_hits(ctx.pucks, &contacts, ctx.time + ctx.dt),
            collision_delta: contacts.len() as i64,
            contacts,
        }
    }
}

/// Integration plus exact "perfect kiss" reconstruction; runs backward
/// when handed a negative timestep.
///
/// Pair and fence contacts are resolved together in the order they
/// happened within the tick. Reversal retraces collisions exactly, but the
/// integrator itself is not time-symmetric: springs, drag and other forces
/// leave a small drift when a run is replayed backward.
#[derive(Debug, Default)]
pub struct ExactEngine;

impl CollisionEngine for ExactEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Exact
    }

    fn supports_time_reversal(&self) -> bool {
        true
    }

    fn step(&mut self, ctx: StepContext<'_>) -> StepOutcome {
        let dt = ctx.dt;
        for puck in ctx.pucks.iter_mut() {
            integrate(puck, ctx.gravity, dt);
        }

        if dt == 0.0 {
            return StepOutcome::default();
        }

        let fence = FenceParams {
            bounds: ctx.bounds,
            restitution: ctx.table_restitution,
            correct: ctx.wall_correction,
        };
        let resolved = resolve_exact_step(ctx.pucks, &fence, dt, ctx.puck_correction);
        let contacts = resolved.contacts;
        let bounces = resolved.bounces as i64;
        mark_tangled(ctx.pucks, ctx.tangle_factor);

        StepOutcome {
            hits: collect_hits(ctx.pucks, &contacts, ctx.time + dt),
            collision_delta: (contacts.len() as i64 + bounces) * ctx.count_direction,
            contacts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::puck::{PuckDesc, PuckId};

    fn pucks() -> Vec<Puck> {
        let a = PuckDesc::new(DVec2::new(2.0, 5.0), 1.0, 1.0).with_velocity(DVec2::new(3.0, 0.0));
        let b = PuckDesc::new(DVec2::new(4.5, 5.0), 1.0, 1.0).with_velocity(DVec2::new(-3.0, 0.0));
        vec![
            Puck::new(PuckId(1), &a, 0.0, 1.0, 0.0).unwrap(),
            Puck::new(PuckId(2), &b, 0.0, 1.0, 0.0).unwrap(),
        ]
    }

    fn ctx<'a>(pucks: &'a mut [Puck], dt: f64, direction: i64) -> StepContext<'a> {
        StepContext {
            pucks,
            walls: &[],
            bounds: Bounds::from_size(10.0, 10.0),
            gravity: DVec2::ZERO,
            dt,
            time: 0.0,
            table_restitution: 1.0,
            wall_correction: true,
            puck_correction: true,
            tangle_factor: 1.1,
            count_direction: direction,
        }
    }

    #[test]
    fn test_engine_kind_strings() {
        for kind in [EngineKind::Approximate, EngineKind::Exact, EngineKind::Delegate] {
            assert_eq!(EngineKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EngineKind::from_str("KISS"), Some(EngineKind::Exact));
        assert_eq!(EngineKind::from_str("box2d"), None);
    }

    #[test]
    fn test_approximate_counts_pair_collisions() {
        let mut ps = pucks();
        let out = ApproximateEngine.step(ctx(&mut ps, 0.1, 1));
        assert_eq!(out.contacts.len(), 1);
        assert_eq!(out.collision_delta, 1);
        assert!(ps[0].velocity.x < 0.0);
        assert!(ps[1].velocity.x > 0.0);
    }

    #[test]
    fn test_exact_forward_then_backward() {
        let mut ps = pucks();
        let start: Vec<_> = ps.iter().map(|p| (p.position, p.velocity)).collect();

        let fwd = ExactEngine.step(ctx(&mut ps, 0.1, 1));
        assert_eq!(fwd.collision_delta, 1);

        let back = ExactEngine.step(ctx(&mut ps, -0.1, -1));
        assert_eq!(back.collision_delta, -1);

        for (p, (pos, vel)) in ps.iter().zip(start) {
            assert!((p.position - pos).length() < 1e-9);
            assert!((p.velocity - vel).length() < 1e-9);
        }
    }

    #[test]
    fn test_paused_step_resolves_nothing() {
        // Overlapping and closing, but no time passes
        let a = PuckDesc::new(DVec2::new(2.0, 5.0), 1.0, 1.0).with_velocity(DVec2::new(3.0, 0.0));
        let b = PuckDesc::new(DVec2::new(3.5, 5.0), 1.0, 1.0).with_velocity(DVec2::new(-3.0, 0.0));
        for exact in [false, true] {
            let mut ps = vec![
                Puck::new(PuckId(1), &a, 0.0, 1.0, 0.0).unwrap(),
                Puck::new(PuckId(2), &b, 0.0, 1.0, 0.0).unwrap(),
            ];
            let out = if exact {
                ExactEngine.step(ctx(&mut ps, 0.0, 1))
            } else {
                ApproximateEngine.step(ctx(&mut ps, 0.0, 1))
            };
            assert_eq!(out.collision_delta, 0);
            assert_eq!(ps[0].velocity.x, 3.0);
            assert_eq!(ps[1].position.x, 3.5);
        }
    }

    #[test]
    fn test_exact_crowd_retraces_with_fence() {
        // Four pucks in a row bouncing between themselves and the side walls
        let xs = [1.5, 3.7, 5.2, 8.1];
        let vxs = [4.0, -2.5, 1.5, -5.0];
        let mut ps: Vec<Puck> = xs
            .iter()
            .zip(vxs)
            .enumerate()
            .map(|(i, (&x, vx))| {
                let desc = PuckDesc::new(DVec2::new(x, 5.0), 0.5, 1.0 + i as f64 * 0.5)
                    .with_velocity(DVec2::new(vx, 0.0));
                Puck::new(PuckId(i as u32 + 1), &desc, 0.0, 1.0, 0.0).unwrap()
            })
            .collect();
        let start: Vec<_> = ps.iter().map(|p| (p.position, p.velocity)).collect();

        let mut count = 0;
        for _ in 0..240 {
            count += ExactEngine.step(ctx(&mut ps, 1.0 / 60.0, 1)).collision_delta;
        }
        assert!(count > 10, "only {} contacts", count);
        for _ in 0..240 {
            count += ExactEngine.step(ctx(&mut ps, -1.0 / 60.0, -1)).collision_delta;
        }

        assert_eq!(count, 0);
        for (p, (pos, vel)) in ps.iter().zip(start) {
            assert!((p.position - pos).length() < 1e-6, "puck {} drifted to {:?}", p.id, p.position);
            assert!((p.velocity - vel).length() < 1e-6);
        }
    }

    #[test]
    fn test_exact_counts_wall_bounces() {
        let desc = PuckDesc::new(DVec2::new(1.1, 5.0), 1.0, 1.0).with_velocity(DVec2::new(-2.0, 0.0));
        let mut ps = vec![Puck::new(PuckId(1), &desc, 0.0, 1.0, 0.0).unwrap()];
        let out = ExactEngine.step(ctx(&mut ps, 0.1, 1));
        assert_eq!(out.collision_delta, 1);
        assert!(ps[0].velocity.x > 0.0);

        let mut ps2 = vec![Puck::new(PuckId(1), &desc, 0.0, 1.0, 0.0).unwrap()];
        let out = ApproximateEngine.step(ctx(&mut ps2, 0.1, 1));
        assert_eq!(out.collision_delta, 0);
    }
}
