//! The table: entity registry, toggles, clock and tick pipeline
//!
//! Pucks are kept in a `Vec` sorted by id so every engine sees them in a
//! stable order. Ids come from one counter shared by pucks, springs and
//! walls and are never reused.

use std::collections::BTreeMap;
use std::time::Duration;

use glam::DVec2;
use serde::Serialize;

use super::collision::HitEvent;
use super::engine::{ApproximateEngine, CollisionEngine, EngineKind, ExactEngine, StepContext, StepOutcome};
use super::puck::{ForceChannel, PointForce, Puck, PuckDesc, PuckId, index_of};
use super::spring::{Endpoint, Spring, SpringDesc, SpringEnd, SpringId};
use super::throw::{ThrowQueue, ThrowWrite};
use super::wall::{Bounds, Wall, WallId};
use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::gravity_vector;

/// What one call to `advance_tick` did
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// Simulation time after the tick
    pub time: f64,
    /// Puck-puck contacts resolved this tick
    pub collisions: usize,
    pub hits: Vec<HitEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PuckSnapshot {
    pub id: PuckId,
    pub position: DVec2,
    pub velocity: DVec2,
    pub angle: f64,
    pub radius: f64,
    pub mass: f64,
    pub group_index: i32,
    pub is_bullet: bool,
    pub selected: bool,
    pub tangled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpringSnapshot {
    pub id: SpringId,
    pub a: DVec2,
    pub b: DVec2,
    pub rest_length: f64,
    pub length: f64,
}

/// Read-only view for rendering and network serialization
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub tick: u64,
    pub time: f64,
    pub engine: EngineKind,
    pub gravity_on: bool,
    pub collision_count: i64,
    pub bounds: Bounds,
    pub pucks: Vec<PuckSnapshot>,
    pub springs: Vec<SpringSnapshot>,
    pub walls: Vec<(WallId, Wall)>,
}

fn build_engine(kind: EngineKind) -> Result<Box<dyn CollisionEngine>> {
    match kind {
        EngineKind::Approximate => Ok(Box::new(ApproximateEngine)),
        EngineKind::Exact => Ok(Box::new(ExactEngine)),
        #[cfg(feature = "rapier")]
        EngineKind::Delegate => Ok(Box::new(super::delegate::RapierEngine::new())),
        #[cfg(not(feature = "rapier"))]
        EngineKind::Delegate => Err(TableError::EngineUnavailable(kind)),
    }
}

pub struct Table {
    config: TableConfig,

    // === Entities ===
    /// Sorted by id
    pucks: Vec<Puck>,
    springs: BTreeMap<SpringId, Spring>,
    /// Sorted by id
    walls: Vec<(WallId, Wall)>,
    selected: Option<PuckId>,
    next_id: u32,

    // === Engine and toggles ===
    engine: Box<dyn CollisionEngine>,
    gravity_on: bool,
    wall_correction: bool,
    puck_correction: bool,
    fixed_timestep: bool,

    // === Clock ===
    dt: f64,
    time: f64,
    tick: u64,
    /// +1 forward, -1 backward
    time_direction: f64,
    collision_count: i64,

    // === Collaborator plumbing ===
    hits: Vec<HitEvent>,
    throws: ThrowQueue,
}

impl Table {
    pub fn new(config: TableConfig) -> Result<Self> {
        config.validate()?;
        let engine = build_engine(config.engine)?;
        log::info!(
            "Table created: {:.2}x{:.2}, engine={}, gravity={}",
            config.bounds.width(),
            config.bounds.height(),
            config.engine.as_str(),
            config.gravity_on
        );
        Ok(Self {
            pucks: Vec::new(),
            springs: BTreeMap::new(),
            walls: Vec::new(),
            selected: None,
            next_id: 1,

            engine,
            gravity_on: config.gravity_on,
            wall_correction: config.wall_correction,
            puck_correction: config.puck_correction,
            fixed_timestep: config.fixed_timestep,

            dt: config.dt,
            time: 0.0,
            tick: 0,
            time_direction: 1.0,
            collision_count: 0,

            hits: Vec::new(),
            throws: ThrowQueue::new(),
            config,
        })
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn puck_mut(&mut self, id: PuckId) -> Result<&mut Puck> {
        match index_of(&self.pucks, id) {
            Some(i) => Ok(&mut self.pucks[i]),
            None => {
                log::warn!("unknown puck {}", id);
                Err(TableError::UnknownPuck(id))
            }
        }
    }

    fn require_puck(&self, id: PuckId) -> Result<()> {
        if index_of(&self.pucks, id).is_some() {
            Ok(())
        } else {
            log::warn!("unknown puck {}", id);
            Err(TableError::UnknownPuck(id))
        }
    }

    // ------------------------------------------------------------------
    // Creation and deletion
    // ------------------------------------------------------------------

    pub fn create_puck(&mut self, desc: PuckDesc) -> Result<PuckId> {
        let (restitution, friction) = self.config.material_defaults(self.gravity_on);
        // Validate before consuming an id
        let mut puck = Puck::new(PuckId(0), &desc, self.time, restitution, friction)?;
        let id = PuckId(self.next_entity_id());
        puck.id = id;
        // Ids only grow, so pushing keeps the order
        self.pucks.push(puck);
        log::debug!("puck {} created at ({:.3}, {:.3})", id, desc.position.x, desc.position.y);
        Ok(id)
    }

    pub fn create_spring(&mut self, desc: SpringDesc) -> Result<SpringId> {
        desc.validate()?;
        self.require_puck(desc.a)?;
        if let Some(b) = desc.b.puck() {
            self.require_puck(b)?;
        }
        let id = SpringId(self.next_entity_id());
        let spring = Spring::new(id, &desc)?;
        self.springs.insert(id, spring);
        log::debug!("spring {} created for puck {}", id, desc.a);
        Ok(id)
    }

    pub fn create_wall(&mut self, wall: Wall) -> WallId {
        let id = WallId(self.next_entity_id());
        self.walls.push((id, wall));
        log::debug!("wall {} created", id);
        id
    }

    /// Remove a puck along with every spring attached to it
    pub fn delete_puck(&mut self, id: PuckId) -> Result<Puck> {
        let Some(i) = index_of(&self.pucks, id) else {
            log::warn!("delete of unknown puck {}", id);
            return Err(TableError::UnknownPuck(id));
        };
        let puck = self.pucks.remove(i);

        let before = self.springs.len();
        self.springs.retain(|_, s| !s.references(id));
        let dropped = before - self.springs.len();

        if self.selected == Some(id) {
            self.selected = None;
        }
        self.throws.cancel(id);

        log::debug!("puck {} deleted ({} springs removed)", id, dropped);
        Ok(puck)
    }

    pub fn delete_spring(&mut self, id: SpringId) -> Result<Spring> {
        self.springs.remove(&id).ok_or_else(|| {
            log::warn!("delete of unknown spring {}", id);
            TableError::UnknownSpring(id)
        })
    }

    pub fn delete_wall(&mut self, id: WallId) -> Result<Wall> {
        match self.walls.binary_search_by_key(&id, |(w, _)| *w) {
            Ok(i) => Ok(self.walls.remove(i).1),
            Err(_) => {
                log::warn!("delete of unknown wall {}", id);
                Err(TableError::UnknownWall(id))
            }
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select_puck(&mut self, id: Option<PuckId>) -> Result<()> {
        if let Some(id) = id {
            self.require_puck(id)?;
        }
        if let Some(prev) = self.selected.and_then(|p| index_of(&self.pucks, p)) {
            self.pucks[prev].selected = false;
        }
        self.selected = id;
        if let Some(i) = id.and_then(|p| index_of(&self.pucks, p)) {
            self.pucks[i].selected = true;
        }
        Ok(())
    }

    pub fn selected_puck(&self) -> Option<PuckId> {
        self.selected
    }

    // ------------------------------------------------------------------
    // Forces (additive within a tick, cleared by the step)
    // ------------------------------------------------------------------

    pub fn apply_force(&mut self, id: PuckId, force: DVec2, channel: ForceChannel) -> Result<()> {
        self.puck_mut(id)?.forces.add(channel, force);
        Ok(())
    }

    /// Force applied at a world point; off-center only under the delegate
    pub fn apply_force_at_point(&mut self, id: PuckId, force: DVec2, point: DVec2) -> Result<()> {
        self.puck_mut(id)?.forces.point_forces.push(PointForce { force, point });
        Ok(())
    }

    pub fn apply_impulse(&mut self, id: PuckId, impulse: DVec2) -> Result<()> {
        self.puck_mut(id)?.forces.impulse += impulse;
        Ok(())
    }

    /// Torque is only integrated by the delegate engine
    pub fn apply_torque(&mut self, id: PuckId, torque: f64) -> Result<()> {
        self.puck_mut(id)?.forces.torque += torque;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Toggles
    // ------------------------------------------------------------------

    /// Toggle gravity and re-derive every non-fixed puck's material values
    pub fn set_gravity(&mut self, on: bool) {
        self.gravity_on = on;
        let (restitution, friction) = self.config.material_defaults(on);
        for puck in &mut self.pucks {
            puck.apply_material_defaults(restitution, friction);
        }
        log::info!("Gravity {}", if on { "on" } else { "off" });
    }

    pub fn gravity_on(&self) -> bool {
        self.gravity_on
    }

    pub fn gravity(&self) -> DVec2 {
        gravity_vector(self.gravity_on, self.config.gravity)
    }

    pub fn set_penetration_correction(&mut self, wall: bool, puck: bool) {
        self.wall_correction = wall;
        self.puck_correction = puck;
        log::info!("Penetration correction: wall={}, puck={}", wall, puck);
    }

    pub fn penetration_correction(&self) -> (bool, bool) {
        (self.wall_correction, self.puck_correction)
    }

    /// Swap the collision engine; time runs forward again afterwards
    pub fn set_engine(&mut self, kind: EngineKind) -> Result<()> {
        if kind == self.engine.kind() {
            return Ok(());
        }
        self.engine = build_engine(kind)?;
        self.time_direction = 1.0;
        log::info!("Engine switched to {}", kind.as_str());
        Ok(())
    }

    pub fn engine_kind(&self) -> EngineKind {
        self.engine.kind()
    }

    /// Flip the time direction (exact engine only).
    ///
    /// Collisions retrace exactly. The integrator is not time-symmetric, so
    /// a run driven by springs, drag or other forces comes back close to
    /// where it started rather than bit for bit.
    pub fn reverse_time(&mut self) -> Result<()> {
        if !self.engine.supports_time_reversal() {
            log::warn!("engine {} cannot run backward", self.engine.kind().as_str());
            return Err(TableError::TimeReversalUnsupported(self.engine.kind()));
        }
        self.time_direction = -self.time_direction;
        log::info!("Time direction now {}", if self.time_direction > 0.0 { "forward" } else { "backward" });
        Ok(())
    }

    pub fn time_direction(&self) -> f64 {
        self.time_direction
    }

    // ------------------------------------------------------------------
    // Timestep and clock
    // ------------------------------------------------------------------

    /// Set the (unsigned) timestep used by the next tick
    pub fn set_timestep(&mut self, dt: f64) -> Result<()> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(TableError::InvalidTimestep(dt));
        }
        self.dt = dt;
        Ok(())
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn set_fixed_timestep(&mut self, fixed: bool) {
        self.fixed_timestep = fixed;
        if fixed {
            self.dt = self.config.dt;
        }
    }

    pub fn fixed_timestep(&self) -> bool {
        self.fixed_timestep
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn collision_count(&self) -> i64 {
        self.collision_count
    }

    pub fn bounds(&self) -> &Bounds {
        &self.config.bounds
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Advance by one frame of real time.
    ///
    /// With a fixed timestep the elapsed time is ignored; otherwise it
    /// becomes this tick's dt, capped at `max_dt`.
    pub fn advance_frame(&mut self, elapsed: f64) -> Result<TickReport> {
        if !self.fixed_timestep {
            if !(elapsed.is_finite() && elapsed >= 0.0) {
                return Err(TableError::InvalidTimestep(elapsed));
            }
            self.dt = elapsed.min(self.config.max_dt);
        }
        Ok(self.advance_tick())
    }

    /// Run one tick: throws, springs, engine step, clock.
    ///
    /// A zero timestep pauses the table: the tick still counts, springs are
    /// not solved and forces applied meanwhile are dropped, while a pending
    /// impulse waits for the next real step.
    pub fn advance_tick(&mut self) -> TickReport {
        self.apply_throws();

        let dt = self.dt * self.time_direction;
        if dt != 0.0 {
            for spring in self.springs.values() {
                spring.apply(&mut self.pucks);
            }
        }

        let gravity = self.gravity();
        let outcome: StepOutcome = self.engine.step(StepContext {
            pucks: &mut self.pucks,
            walls: &self.walls,
            bounds: self.config.bounds,
            gravity,
            dt,
            time: self.time,
            table_restitution: self.config.table_restitution,
            wall_correction: self.wall_correction,
            puck_correction: self.puck_correction,
            tangle_factor: self.config.tangle_factor,
            count_direction: self.time_direction as i64,
        });

        for hit in &outcome.hits {
            if let Some(i) = index_of(&self.pucks, hit.target) {
                self.pucks[i].hits_taken += 1;
            }
        }
        self.hits.extend_from_slice(&outcome.hits);

        self.time += dt;
        self.tick += 1;
        self.collision_count += outcome.collision_delta;

        if outcome.contacts.is_empty() {
            log::trace!("tick {} t={:.4}", self.tick, self.time);
        } else {
            log::debug!(
                "tick {} t={:.4}: {} contacts, {} hits, count={}",
                self.tick,
                self.time,
                outcome.contacts.len(),
                outcome.hits.len(),
                self.collision_count
            );
        }

        TickReport {
            tick: self.tick,
            time: self.time,
            collisions: outcome.contacts.len(),
            hits: outcome.hits,
        }
    }

    // ------------------------------------------------------------------
    // Delayed throws
    // ------------------------------------------------------------------

    /// Set a puck's position and velocity once, `delay` from now.
    ///
    /// The write lands at the start of the first tick after it is delivered
    /// and is dropped if the puck is gone by then.
    pub fn throw_later(&mut self, id: PuckId, delay: Duration, position: DVec2, velocity: DVec2) -> Result<()> {
        self.require_puck(id)?;
        self.throws.schedule(id, delay, position, velocity);
        Ok(())
    }

    pub fn pending_throws(&self) -> usize {
        self.throws.pending()
    }

    /// Block until pending throws arrive (or `timeout`), applying them now
    pub fn wait_for_throws(&mut self, timeout: Duration) -> usize {
        let writes = self.throws.wait(timeout);
        self.apply_writes(writes)
    }

    fn apply_throws(&mut self) {
        let writes = self.throws.drain();
        self.apply_writes(writes);
    }

    fn apply_writes(&mut self, writes: Vec<ThrowWrite>) -> usize {
        let mut applied = 0;
        for w in writes {
            match index_of(&self.pucks, w.puck) {
                Some(i) => {
                    self.pucks[i].position = w.position;
                    self.pucks[i].velocity = w.velocity;
                    applied += 1;
                }
                None => log::debug!("throw for deleted puck {} dropped", w.puck),
            }
        }
        applied
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Hits recorded since the last call
    pub fn take_hits(&mut self) -> Vec<HitEvent> {
        std::mem::take(&mut self.hits)
    }

    /// Bullets past their age limit; deleting them is up to the caller
    pub fn collect_expired_bullets(&self) -> Vec<PuckId> {
        self.pucks.iter().filter(|p| p.is_expired(self.time)).map(|p| p.id).collect()
    }

    pub fn tangled_pucks(&self) -> Vec<PuckId> {
        self.pucks.iter().filter(|p| p.tangled).map(|p| p.id).collect()
    }

    pub fn any_tangled(&self) -> bool {
        self.pucks.iter().any(|p| p.tangled)
    }

    pub fn pucks(&self) -> &[Puck] {
        &self.pucks
    }

    pub fn puck(&self, id: PuckId) -> Option<&Puck> {
        index_of(&self.pucks, id).map(|i| &self.pucks[i])
    }

    pub fn springs(&self) -> impl Iterator<Item = &Spring> {
        self.springs.values()
    }

    pub fn spring(&self, id: SpringId) -> Option<&Spring> {
        self.springs.get(&id)
    }

    pub fn walls(&self) -> &[(WallId, Wall)] {
        &self.walls
    }

    fn endpoint(&self, end: SpringEnd) -> Option<Endpoint> {
        match end {
            SpringEnd::Fixed(point) => Some(Endpoint::fixed(point)),
            SpringEnd::Puck(id) => self.puck(id).map(Endpoint::of),
        }
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let pucks = self
            .pucks
            .iter()
            .map(|p| PuckSnapshot {
                id: p.id,
                position: p.position,
                velocity: p.velocity,
                angle: p.angle,
                radius: p.radius(),
                mass: p.mass(),
                group_index: p.group_index,
                is_bullet: p.is_bullet,
                selected: p.selected,
                tangled: p.tangled,
            })
            .collect();

        let springs = self
            .springs
            .values()
            .filter_map(|s| {
                let a = self.endpoint(SpringEnd::Puck(s.a))?.position;
                let b = self.endpoint(s.b)?.position;
                Some(SpringSnapshot {
                    id: s.id,
                    a,
                    b,
                    rest_length: s.rest_length,
                    length: a.distance(b),
                })
            })
            .collect();

        TableSnapshot {
            tick: self.tick,
            time: self.time,
            engine: self.engine.kind(),
            gravity_on: self.gravity_on,
            collision_count: self.collision_count,
            bounds: self.config.bounds,
            pucks,
            springs,
            walls: self.walls.clone(),
        }
    }
}
