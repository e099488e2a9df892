//! Fence (table boundary) collisions
//!
//! A puck crossing an edge is mirrored back across it by twice its
//! penetration depth, which preserves the approach geometry instead of
//! clamping to the edge. The reversible engine bounces one edge at a time
//! through `bounce_off_edge`, interleaved with its pair contacts.

use glam::DVec2;

use super::puck::Puck;
use super::wall::Bounds;

/// One side of the fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    /// Unit normal pointing off the table
    pub fn outward(self) -> DVec2 {
        match self {
            Edge::Left => DVec2::NEG_X,
            Edge::Right => DVec2::X,
            Edge::Bottom => DVec2::NEG_Y,
            Edge::Top => DVec2::Y,
        }
    }

    /// How far the puck reaches past this edge; positive when crossing
    pub fn depth(self, puck: &Puck, bounds: &Bounds) -> f64 {
        let r = puck.radius();
        match self {
            Edge::Left => bounds.left - (puck.position.x - r),
            Edge::Right => (puck.position.x + r) - bounds.right,
            Edge::Bottom => bounds.bottom - (puck.position.y - r),
            Edge::Top => (puck.position.y + r) - bounds.top,
        }
    }
}

/// Time since the puck crossed `edge`, signed like `dt`.
///
/// `None` unless the puck is past the edge and the step just integrated
/// carried it outward. Never more than one step.
pub fn time_since_edge(puck: &Puck, bounds: &Bounds, edge: Edge, dt: f64) -> Option<f64> {
    let depth = edge.depth(puck, bounds);
    let outward = puck.velocity.dot(edge.outward()) * dt;
    if depth <= 0.0 || outward <= 0.0 {
        return None;
    }
    Some((depth / outward).min(1.0) * dt)
}

/// Bounce off a single edge crossed `tau` ago: rewind, reflect the normal
/// velocity, then re-advance by `tau`.
///
/// With `tau` from `time_since_edge` and a restitution of 1 this lands the
/// puck exactly where the depth mirror does. With `correct` off only the
/// velocity changes.
pub fn bounce_off_edge(puck: &mut Puck, edge: Edge, tau: f64, table_restitution: f64, correct: bool) {
    let cr = table_restitution.min(puck.restitution);
    if correct {
        puck.position -= puck.velocity * tau;
    }
    let n = edge.outward();
    let v_n = puck.velocity.dot(n);
    puck.velocity -= n * (v_n * (1.0 + cr));
    if correct {
        puck.position += puck.velocity * tau;
    }
    log::trace!("puck {} bounced off the {:?} edge", puck.id, edge);
}

/// Bounce a puck off the fence. Returns the number of edges hit (0..=2).
///
/// The x and y axes are checked independently, so a corner hit bounces
/// off both edges in the same call. With `correct` off only the velocity
/// changes and the puck stays where it is.
pub fn resolve_wall_collisions(puck: &mut Puck, bounds: &Bounds, table_restitution: f64, correct: bool) -> u32 {
    let r = puck.radius();
    let cr = table_restitution.min(puck.restitution);
    let mut hits = 0;

    // x axis
    let left_depth = bounds.left - (puck.position.x - r);
    let right_depth = (puck.position.x + r) - bounds.right;
    if left_depth > 0.0 {
        if correct {
            puck.position.x += 2.0 * left_depth;
        }
        puck.velocity.x = -puck.velocity.x * cr;
        hits += 1;
    } else if right_depth > 0.0 {
        if correct {
            puck.position.x -= 2.0 * right_depth;
        }
        puck.velocity.x = -puck.velocity.x * cr;
        hits += 1;
    }

    // y axis
    let bottom_depth = bounds.bottom - (puck.position.y - r);
    let top_depth = (puck.position.y + r) - bounds.top;
    if bottom_depth > 0.0 {
        if correct {
            puck.position.y += 2.0 * bottom_depth;
        }
        puck.velocity.y = -puck.velocity.y * cr;
        hits += 1;
    } else if top_depth > 0.0 {
        if correct {
            puck.position.y -= 2.0 * top_depth;
        }
        puck.velocity.y = -puck.velocity.y * cr;
        hits += 1;
    }

    if hits > 0 {
        log::trace!("puck {} bounced off {} fence edge(s)", puck.id, hits);
    }
    hits
}
