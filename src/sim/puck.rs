//! Pucks: the dynamic circular bodies on the table

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::disc_mass;
use crate::error::{Result, TableError};

/// Stable puck identity, never reused within a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PuckId(pub u32);

impl fmt::Display for PuckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Named per-tick force channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForceChannel {
    /// Spring and damper links
    Spring,
    /// Jets and thrusters
    Propulsion,
    /// Cursor tether spring
    CursorSpring,
    /// Cursor tether drag
    CursorDrag,
    /// Generic drag (the puck's own drag is added here during integration)
    Drag,
}

impl ForceChannel {
    pub const ALL: [ForceChannel; 5] = [
        ForceChannel::Spring,
        ForceChannel::Propulsion,
        ForceChannel::CursorSpring,
        ForceChannel::CursorDrag,
        ForceChannel::Drag,
    ];

    const fn index(self) -> usize {
        match self {
            ForceChannel::Spring => 0,
            ForceChannel::Propulsion => 1,
            ForceChannel::CursorSpring => 2,
            ForceChannel::CursorDrag => 3,
            ForceChannel::Drag => 4,
        }
    }
}

/// A force applied away from the center of mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointForce {
    pub force: DVec2,
    /// World-space application point
    pub point: DVec2,
}

/// Everything collaborators pushed onto a puck during the current tick.
///
/// Additive within a tick; cleared once after integration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Forces {
    channels: [DVec2; 5],
    /// One-shot impulse, consumed by the next integration
    pub impulse: DVec2,
    /// Torque (delegate engine only)
    pub torque: f64,
    /// Off-center forces (the delegate applies them at their point)
    pub point_forces: Vec<PointForce>,
}

impl Forces {
    pub fn add(&mut self, channel: ForceChannel, force: DVec2) {
        self.channels[channel.index()] += force;
    }

    pub fn get(&self, channel: ForceChannel) -> DVec2 {
        self.channels[channel.index()]
    }

    /// Sum of the named channels
    pub fn channel_sum(&self) -> DVec2 {
        self.channels.iter().copied().sum()
    }

    /// Sum of the off-center forces, as if applied at the center
    pub fn point_force_sum(&self) -> DVec2 {
        self.point_forces.iter().map(|p| p.force).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|c| *c == DVec2::ZERO)
            && self.impulse == DVec2::ZERO
            && self.torque == 0.0
            && self.point_forces.is_empty()
    }

    pub fn clear(&mut self) {
        self.clear_per_tick();
        self.impulse = DVec2::ZERO;
    }

    /// Drop everything but the one-shot impulse
    pub fn clear_per_tick(&mut self) {
        self.channels = [DVec2::ZERO; 5];
        self.torque = 0.0;
        self.point_forces.clear();
    }
}

/// Creation parameters for a puck
#[derive(Debug, Clone)]
pub struct PuckDesc {
    pub position: DVec2,
    pub velocity: DVec2,
    pub radius: f64,
    pub density: f64,
    /// `None` derives restitution from the gravity toggle
    pub restitution: Option<f64>,
    pub restitution_fixed: bool,
    /// `None` derives friction from the gravity toggle
    pub friction: Option<f64>,
    pub friction_fixed: bool,
    pub drag_coefficient: f64,
    pub group_index: i32,
    pub is_bullet: bool,
    pub age_limit: Option<f64>,
    pub owner: Option<u32>,
    pub angular_velocity: f64,
}

impl PuckDesc {
    pub fn new(position: DVec2, radius: f64, density: f64) -> Self {
        Self {
            position,
            velocity: DVec2::ZERO,
            radius,
            density,
            restitution: None,
            restitution_fixed: false,
            friction: None,
            friction_fixed: false,
            drag_coefficient: 0.0,
            group_index: 0,
            is_bullet: false,
            age_limit: None,
            owner: None,
            angular_velocity: 0.0,
        }
    }

    pub fn with_velocity(mut self, velocity: DVec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = Some(restitution);
        self
    }

    /// Restitution that the gravity toggle never overrides
    pub fn with_restitution_fixed(mut self, restitution: f64) -> Self {
        self.restitution = Some(restitution);
        self.restitution_fixed = true;
        self
    }

    pub fn with_friction(mut self, friction: f64, fixed: bool) -> Self {
        self.friction = Some(friction);
        self.friction_fixed = fixed;
        self
    }

    pub fn with_drag(mut self, drag_coefficient: f64) -> Self {
        self.drag_coefficient = drag_coefficient;
        self
    }

    /// Negative groups are mutually immune
    pub fn with_group(mut self, group_index: i32) -> Self {
        self.group_index = group_index;
        self
    }

    pub fn with_bullet(mut self, age_limit: f64) -> Self {
        self.is_bullet = true;
        self.age_limit = Some(age_limit);
        self
    }

    pub fn with_owner(mut self, owner: u32) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }
}

/// Position of `id` in an id-sorted puck list
pub fn index_of(pucks: &[Puck], id: PuckId) -> Option<usize> {
    pucks.binary_search_by_key(&id, |p| p.id).ok()
}

/// Two distinct pucks of a slice, mutably (`i != j`)
pub fn pair_mut(pucks: &mut [Puck], i: usize, j: usize) -> (&mut Puck, &mut Puck) {
    debug_assert!(i != j);
    if i < j {
        let (lo, hi) = pucks.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = pucks.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

fn check_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(TableError::InvalidRadius(radius))
    }
}

fn check_density(density: f64) -> Result<()> {
    if density.is_finite() && density > 0.0 {
        Ok(())
    } else {
        Err(TableError::InvalidDensity(density))
    }
}

/// Mass of an already-checked shape; tiny or huge inputs can still
/// underflow to zero or overflow to infinity
fn checked_mass(density: f64, radius: f64) -> Result<f64> {
    let mass = disc_mass(density, radius);
    if mass.is_finite() && mass > 0.0 {
        Ok(mass)
    } else {
        Err(TableError::InvalidMass(mass))
    }
}

/// A dynamic circular body
#[derive(Debug, Clone, Serialize)]
pub struct Puck {
    pub id: PuckId,
    pub position: DVec2,
    pub velocity: DVec2,
    /// Orientation (radians); driven by the delegate engine
    pub angle: f64,
    pub angular_velocity: f64,
    radius: f64,
    density: f64,
    mass: f64,
    pub restitution: f64,
    pub restitution_fixed: bool,
    pub friction: f64,
    pub friction_fixed: bool,
    pub drag_coefficient: f64,
    pub group_index: i32,
    pub is_bullet: bool,
    pub owner: Option<u32>,
    pub birth_time: f64,
    pub age_limit: Option<f64>,
    pub forces: Forces,
    /// Cosmetic only
    pub selected: bool,
    /// Advisory near-overlap flag, recomputed every tick
    pub tangled: bool,
    /// Bullet hits received
    pub hits_taken: u32,
}

impl Puck {
    /// Build a puck; restitution/friction left unset in `desc` take the given defaults.
    pub fn new(
        id: PuckId,
        desc: &PuckDesc,
        birth_time: f64,
        default_restitution: f64,
        default_friction: f64,
    ) -> Result<Self> {
        check_radius(desc.radius)?;
        check_density(desc.density)?;
        let mass = checked_mass(desc.density, desc.radius)?;

        Ok(Self {
            id,
            position: desc.position,
            velocity: desc.velocity,
            angle: 0.0,
            angular_velocity: desc.angular_velocity,
            radius: desc.radius,
            density: desc.density,
            mass,
            restitution: desc.restitution.unwrap_or(default_restitution),
            restitution_fixed: desc.restitution_fixed,
            friction: desc.friction.unwrap_or(default_friction),
            friction_fixed: desc.friction_fixed,
            drag_coefficient: desc.drag_coefficient,
            group_index: desc.group_index,
            is_bullet: desc.is_bullet,
            owner: desc.owner,
            birth_time,
            age_limit: desc.age_limit,
            forces: Forces::default(),
            selected: false,
            tangled: false,
            hits_taken: 0,
        })
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Always density·π·radius²
    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Resize the puck, re-deriving its mass
    pub fn set_radius(&mut self, radius: f64) -> Result<()> {
        check_radius(radius)?;
        self.mass = checked_mass(self.density, radius)?;
        self.radius = radius;
        Ok(())
    }

    /// Change the material density, re-deriving mass
    pub fn set_density(&mut self, density: f64) -> Result<()> {
        check_density(density)?;
        self.mass = checked_mass(density, self.radius)?;
        self.density = density;
        Ok(())
    }

    /// Two pucks sharing the same negative group never collide
    #[inline]
    pub fn immune_to(&self, other: &Puck) -> bool {
        self.group_index < 0 && self.group_index == other.group_index
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.birth_time
    }

    /// Bullet older than its age limit
    pub fn is_expired(&self, now: f64) -> bool {
        match self.age_limit {
            Some(limit) if self.is_bullet => self.age(now) > limit,
            _ => false,
        }
    }

    /// Overwrite the material values that are not pinned by the creator
    pub fn apply_material_defaults(&mut self, restitution: f64, friction: f64) {
        if !self.restitution_fixed {
            self.restitution = restitution;
        }
        if !self.friction_fixed {
            self.friction = friction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn puck(radius: f64, density: f64) -> Result<Puck> {
        Puck::new(PuckId(1), &PuckDesc::new(DVec2::ZERO, radius, density), 0.0, 1.0, 0.0)
    }

    #[test]
    fn test_mass_derived() {
        let mut p = puck(2.0, 3.0).unwrap();
        assert!((p.mass() - 3.0 * PI * 4.0).abs() < 1e-12);

        p.set_radius(1.0).unwrap();
        assert!((p.mass() - 3.0 * PI).abs() < 1e-12);

        p.set_density(0.5).unwrap();
        assert!((p.mass() - 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_shape() {
        assert!(matches!(puck(0.0, 1.0), Err(TableError::InvalidRadius(_))));
        assert!(matches!(puck(-1.0, 1.0), Err(TableError::InvalidRadius(_))));
        assert!(matches!(puck(1.0, 0.0), Err(TableError::InvalidDensity(_))));
        assert!(matches!(puck(f64::NAN, 1.0), Err(TableError::InvalidRadius(_))));

        let mut p = puck(1.0, 1.0).unwrap();
        assert!(p.set_radius(-2.0).is_err());
        assert_eq!(p.radius(), 1.0);
    }

    #[test]
    fn test_rejects_vanishing_or_infinite_mass() {
        // Each input is positive and finite on its own
        assert!(matches!(puck(1e-170, 1e-10), Err(TableError::InvalidMass(_))));
        assert!(matches!(puck(1e200, 1e200), Err(TableError::InvalidMass(_))));

        let mut p = puck(1.0, 1.0).unwrap();
        assert!(matches!(p.set_radius(1e-170), Err(TableError::InvalidMass(_))));
        assert_eq!(p.radius(), 1.0);
        assert!((p.mass() - PI).abs() < 1e-12);

        let mut small = puck(1e-160, 1.0).unwrap();
        assert!(matches!(small.set_density(1e-10), Err(TableError::InvalidMass(_))));
        assert_eq!(small.density(), 1.0);
    }

    #[test]
    fn test_immunity() {
        let desc = PuckDesc::new(DVec2::ZERO, 1.0, 1.0).with_group(-3);
        let a = Puck::new(PuckId(1), &desc, 0.0, 1.0, 0.0).unwrap();
        let b = Puck::new(PuckId(2), &desc, 0.0, 1.0, 0.0).unwrap();
        assert!(a.immune_to(&b));

        let c = Puck::new(PuckId(3), &desc.clone().with_group(-4), 0.0, 1.0, 0.0).unwrap();
        assert!(!a.immune_to(&c));

        // Positive groups do not grant immunity
        let pos = PuckDesc::new(DVec2::ZERO, 1.0, 1.0).with_group(2);
        let d = Puck::new(PuckId(4), &pos, 0.0, 1.0, 0.0).unwrap();
        let e = Puck::new(PuckId(5), &pos, 0.0, 1.0, 0.0).unwrap();
        assert!(!d.immune_to(&e));
    }

    #[test]
    fn test_bullet_expiry() {
        let desc = PuckDesc::new(DVec2::ZERO, 0.1, 1.0).with_bullet(2.0);
        let b = Puck::new(PuckId(1), &desc, 1.0, 1.0, 0.0).unwrap();
        assert!(!b.is_expired(2.5));
        assert!(b.is_expired(3.5));

        let p = puck(1.0, 1.0).unwrap();
        assert!(!p.is_expired(1e9));
    }

    #[test]
    fn test_gravity_policy() {
        let mut p = puck(1.0, 1.0).unwrap();
        p.apply_material_defaults(0.7, 0.2);
        assert_eq!(p.restitution, 0.7);
        assert_eq!(p.friction, 0.2);
        p.apply_material_defaults(1.0, 0.0);
        assert_eq!(p.restitution, 1.0);
        assert_eq!(p.friction, 0.0);

        let desc = PuckDesc::new(DVec2::ZERO, 1.0, 1.0).with_restitution_fixed(0.4);
        let mut fixed = Puck::new(PuckId(2), &desc, 0.0, 1.0, 0.0).unwrap();
        fixed.apply_material_defaults(0.7, 0.2);
        assert_eq!(fixed.restitution, 0.4);
    }

    #[test]
    fn test_forces_accumulate_and_clear() {
        let mut f = Forces::default();
        f.add(ForceChannel::Spring, DVec2::new(1.0, 0.0));
        f.add(ForceChannel::Spring, DVec2::new(2.0, 0.0));
        f.add(ForceChannel::Propulsion, DVec2::new(0.0, 1.0));
        assert_eq!(f.get(ForceChannel::Spring), DVec2::new(3.0, 0.0));
        assert_eq!(f.channel_sum(), DVec2::new(3.0, 1.0));

        f.impulse = DVec2::new(0.0, 4.0);
        f.torque = 2.0;
        f.clear_per_tick();
        assert_eq!(f.channel_sum(), DVec2::ZERO);
        assert_eq!(f.torque, 0.0);
        assert_eq!(f.impulse, DVec2::new(0.0, 4.0));

        f.clear();
        assert!(f.is_empty());
    }
}
