//! Force aggregation and semi-implicit Euler integration
//!
//! Each tick: net force → clamped acceleration → end-of-step velocity →
//! position from the new velocity. Backward (semi-implicit) Euler keeps
//! stiff spring systems stable where forward Euler blows up.

use glam::DVec2;

use super::puck::{ForceChannel, Puck};
use crate::clamp_axes;
use crate::consts::ACCEL_LIMIT;

/// Net force on a puck for this tick.
///
/// gravity·mass + every named channel + off-center forces + the puck's
/// own drag + impulse/dt. `dt` must be non-zero.
pub fn net_force(puck: &Puck, gravity: DVec2, dt: f64) -> DVec2 {
    let drag = -puck.velocity * puck.drag_coefficient;
    gravity * puck.mass()
        + puck.forces.channel_sum()
        + puck.forces.point_force_sum()
        + drag
        + puck.forces.impulse / dt
}

/// Advance one puck by `dt` (which may be negative when time runs backward).
///
/// A zero `dt` (a paused table) leaves position and velocity untouched and
/// drops the per-tick forces; a pending impulse is held for the next real
/// step.
pub fn integrate(puck: &mut Puck, gravity: DVec2, dt: f64) {
    if dt == 0.0 {
        puck.forces.clear_per_tick();
        return;
    }
    debug_assert!(puck.mass() > 0.0, "puck {} has non-positive mass", puck.id);

    let accel = clamp_axes(net_force(puck, gravity, dt) / puck.mass(), ACCEL_LIMIT);

    puck.velocity += accel * dt;
    puck.position += puck.velocity * dt;
    puck.angle += puck.angular_velocity * dt;

    puck.forces.clear();
}

/// Add the puck's own drag to its drag channel (used by engines that
/// hand forces to an external solver instead of integrating).
pub fn fold_drag(puck: &mut Puck) {
    let drag = -puck.velocity * puck.drag_coefficient;
    puck.forces.add(ForceChannel::Drag, drag);
}
