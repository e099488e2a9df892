//! Delegate engine: integration and narrow-phase handed to Rapier
//!
//! The table still owns puck/spring lifecycle and force accumulation.
//! Each tick the accumulated (non-gravity) forces are pushed onto Rapier
//! bodies, Rapier steps once, and the resulting pose and velocities are
//! copied back into the pucks. Contact-begin events are mapped back to
//! pucks through a body→puck lookup for collision counting and hits.

use std::collections::HashMap;

use glam::DVec2;
use parking_lot::Mutex;
use rapier2d_f64::prelude::*;

use super::collision::{Contact, HitEvent, hit_between, mark_tangled};
use super::engine::{CollisionEngine, EngineKind, StepContext, StepOutcome};
use super::integrate::fold_drag;
use super::puck::{Puck, PuckId, index_of};
use super::wall::{Bounds, Wall, WallId};

// ---------------------------------------------------------------------------
// Conversion helpers (glam ↔ nalgebra)
// ---------------------------------------------------------------------------

fn to_na(v: DVec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn from_na(v: &Vector<Real>) -> DVec2 {
    DVec2::new(v.x, v.y)
}

fn encode_group(group_index: i32) -> u128 {
    group_index as u32 as u128
}

fn decode_group(user_data: u128) -> i32 {
    user_data as u32 as i32
}

// ---------------------------------------------------------------------------
// Hooks and events
// ---------------------------------------------------------------------------

/// Negative-group immunity expressed as a contact filter
struct GroupFilter;

impl PhysicsHooks for GroupFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let group = |h: ColliderHandle| context.colliders.get(h).map(|c| decode_group(c.user_data)).unwrap_or(0);
        let g1 = group(context.collider1);
        let g2 = group(context.collider2);
        if g1 < 0 && g1 == g2 {
            None
        } else {
            Some(SolverFlags::COMPUTE_IMPULSES)
        }
    }
}

#[derive(Default)]
struct ContactCollector {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl ContactCollector {
    fn drain(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        std::mem::take(&mut *self.started.lock())
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(h1, h2, _) = event {
            self.started.lock().push((h1, h2));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

// ---------------------------------------------------------------------------
// RapierEngine
// ---------------------------------------------------------------------------

/// Fence thickness as a fraction of the larger table dimension
const FENCE_THICKNESS: f64 = 0.1;

pub struct RapierEngine {
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    hooks: GroupFilter,
    events: ContactCollector,
    puck_bodies: HashMap<PuckId, RigidBodyHandle>,
    body_pucks: HashMap<RigidBodyHandle, PuckId>,
    wall_bodies: HashMap<WallId, RigidBodyHandle>,
    fence: Option<(Bounds, Vec<RigidBodyHandle>)>,
}

impl Default for RapierEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierEngine {
    pub fn new() -> Self {
        Self {
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            hooks: GroupFilter,
            events: ContactCollector::default(),
            puck_bodies: HashMap::new(),
            body_pucks: HashMap::new(),
            wall_bodies: HashMap::new(),
            fence: None,
        }
    }

    /// Number of Rapier bodies (pucks, walls and fence)
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn insert_wall(&mut self, wall: &Wall) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(to_na(wall.center))
            .rotation(wall.rotation)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(wall.half_width, wall.half_height)
            .restitution(wall.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Min)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    fn insert_puck(&mut self, puck: &Puck) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_na(puck.position))
            .rotation(puck.angle)
            .linvel(to_na(puck.velocity))
            .angvel(puck.angular_velocity)
            .ccd_enabled(puck.is_bullet)
            .build();
        let handle = self.bodies.insert(body);

        // Collider density reproduces density·π·r²
        let collider = ColliderBuilder::ball(puck.radius())
            .density(puck.density())
            .restitution(puck.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Min)
            .friction(puck.friction)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .user_data(encode_group(puck.group_index))
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        self.puck_bodies.insert(puck.id, handle);
        self.body_pucks.insert(handle, puck.id);
        handle
    }

    /// Rebuild the fence when the bounds change
    fn sync_fence(&mut self, bounds: &Bounds, restitution: f64) {
        if matches!(&self.fence, Some((b, _)) if b == bounds) {
            return;
        }
        if let Some((_, handles)) = self.fence.take() {
            for h in handles {
                self.remove_body(h);
            }
        }
        let thickness = FENCE_THICKNESS * bounds.width().max(bounds.height());
        let handles = Wall::fence(bounds, thickness)
            .into_iter()
            .map(|w| self.insert_wall(&w.with_restitution(restitution)))
            .collect();
        self.fence = Some((*bounds, handles));
    }

    fn sync_walls(&mut self, walls: &[(WallId, Wall)]) {
        let stale: Vec<_> = self
            .wall_bodies
            .keys()
            .filter(|id| !walls.iter().any(|(w, _)| w == *id))
            .copied()
            .collect();
        for id in stale {
            if let Some(h) = self.wall_bodies.remove(&id) {
                self.remove_body(h);
            }
        }
        for (id, wall) in walls {
            if !self.wall_bodies.contains_key(id) {
                let h = self.insert_wall(wall);
                self.wall_bodies.insert(*id, h);
            }
        }
    }

    /// Create bodies for new pucks, drop bodies of deleted ones, and push
    /// the canonical puck state and this tick's forces
    fn sync_pucks(&mut self, pucks: &mut [Puck]) {
        let stale: Vec<_> = self
            .puck_bodies
            .keys()
            .filter(|id| index_of(pucks, **id).is_none())
            .copied()
            .collect();
        for id in stale {
            if let Some(h) = self.puck_bodies.remove(&id) {
                self.body_pucks.remove(&h);
                self.remove_body(h);
            }
        }

        for puck in pucks.iter_mut() {
            let handle = match self.puck_bodies.get(&puck.id) {
                Some(h) => *h,
                None => self.insert_puck(puck),
            };
            fold_drag(puck);

            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };

            // Collaborators may have moved the puck since the last read-back
            if from_na(body.translation()) != puck.position || body.rotation().angle() != puck.angle {
                body.set_position(Isometry::new(to_na(puck.position), puck.angle), true);
            }
            if from_na(body.linvel()) != puck.velocity {
                body.set_linvel(to_na(puck.velocity), true);
            }
            if body.angvel() != puck.angular_velocity {
                body.set_angvel(puck.angular_velocity, true);
            }

            body.reset_forces(true);
            body.reset_torques(true);
            let f = &puck.forces;
            body.add_force(to_na(f.channel_sum()), true);
            for pf in &f.point_forces {
                body.add_force_at_point(to_na(pf.force), point![pf.point.x, pf.point.y], true);
            }
            if f.torque != 0.0 {
                body.add_torque(f.torque, true);
            }
            if f.impulse != DVec2::ZERO {
                body.apply_impulse(to_na(f.impulse), true);
            }

            for &ch in body.colliders() {
                if let Some(collider) = self.colliders.get_mut(ch) {
                    collider.set_restitution(puck.restitution);
                    collider.set_friction(puck.friction);
                }
            }

            puck.forces.clear();
        }
    }

    fn read_back(&self, pucks: &mut [Puck]) {
        for puck in pucks.iter_mut() {
            let Some(body) = self.puck_bodies.get(&puck.id).and_then(|h| self.bodies.get(*h)) else {
                continue;
            };
            puck.position = from_na(body.translation());
            puck.velocity = from_na(body.linvel());
            puck.angle = body.rotation().angle();
            puck.angular_velocity = body.angvel();
        }
    }

    fn collider_to_puck(&self, handle: ColliderHandle) -> Option<PuckId> {
        let body = self.colliders.get(handle)?.parent()?;
        self.body_pucks.get(&body).copied()
    }
}

impl CollisionEngine for RapierEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Delegate
    }

    fn step(&mut self, ctx: StepContext<'_>) -> StepOutcome {
        if ctx.dt <= 0.0 {
            // Paused: this tick's forces must not pile up in the pucks
            for puck in ctx.pucks.iter_mut() {
                puck.forces.clear_per_tick();
            }
            return StepOutcome::default();
        }

        self.sync_fence(&ctx.bounds, ctx.table_restitution);
        self.sync_walls(ctx.walls);
        self.sync_pucks(ctx.pucks);

        self.integration_parameters.dt = ctx.dt;
        let gravity = to_na(ctx.gravity);
        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &self.hooks,
            &self.events,
        );

        self.read_back(ctx.pucks);

        let contacts: Vec<Contact> = self
            .events
            .drain()
            .into_iter()
            .filter_map(|(h1, h2)| {
                let a = self.collider_to_puck(h1)?;
                let b = self.collider_to_puck(h2)?;
                Some(if a < b { Contact { a, b } } else { Contact { a: b, b: a } })
            })
            .collect();

        let time = ctx.time + ctx.dt;
        let hits: Vec<HitEvent> = contacts
            .iter()
            .filter_map(|c| {
                let a = &ctx.pucks[index_of(ctx.pucks, c.a)?];
                let b = &ctx.pucks[index_of(ctx.pucks, c.b)?];
                hit_between(a, b, time)
            })
            .collect();

        mark_tangled(ctx.pucks, ctx.tangle_factor);

        StepOutcome {
            collision_delta: contacts.len() as i64,
            contacts,
            hits,
        }
    }
}
