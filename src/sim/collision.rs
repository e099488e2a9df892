//! Circle-circle collision detection and response
//!
//! Two resolvers share one elastic-exchange formula:
//! - `resolve_pair_approximate`: estimates the penetration time from the
//!   overlap depth and closing speed, rewinds, and replays with the
//!   exchanged velocities.
//! - `resolve_pair_exact`: reconstructs the exact moment the two circles
//!   first touched ("perfect kiss") from their straight-line paths over the
//!   tick. This one is time-reversible.
//!
//! `resolve_exact_step` drives the exact resolver for a whole table,
//! taking pair and fence contacts in the order they happened.
//!
//! The overlap test always compares squared distances; the square root is
//! only taken once a collision is confirmed. Only pairs that are closing
//! are resolved; an overlapping pair that already separates is left to
//! drift apart.

use glam::DVec2;
use serde::Serialize;

use super::fence::{Edge, bounce_off_edge, time_since_edge};
use super::puck::{Puck, PuckId, pair_mut};
use super::vector::VecExt;
use super::wall::Bounds;

/// Two pucks that collided this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub a: PuckId,
    pub b: PuckId,
}

/// A bullet from one owner striking a non-bullet puck of another
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitEvent {
    pub bullet: PuckId,
    pub target: PuckId,
    /// Simulation time of the hit
    pub time: f64,
}

/// Post-collision normal velocity of A (1-D exchange with restitution).
///
/// `v_A' = [(v_B − v_A)·CR·m_B + v_A·m_A + v_B·m_B] / (m_A + m_B)`.
/// B's result is this same function with the arguments swapped.
#[inline]
pub fn normal_after(v_a: DVec2, v_b: DVec2, m_a: f64, m_b: f64, cr: f64) -> DVec2 {
    ((v_b - v_a) * cr * m_b + v_a * m_a + v_b * m_b) / (m_a + m_b)
}

/// Post-collision normal velocities of both pucks
#[inline]
pub fn a_and_b_normal_after(v_a: DVec2, v_b: DVec2, m_a: f64, m_b: f64, cr: f64) -> (DVec2, DVec2) {
    (
        normal_after(v_a, v_b, m_a, m_b, cr),
        normal_after(v_b, v_a, m_b, m_a, cr),
    )
}

/// Squared-distance overlap test
#[inline]
pub fn overlapping(a: &Puck, b: &Puck) -> bool {
    let touch = a.radius() + b.radius();
    a.position.distance_squared(b.position) < touch * touch
}

/// Unit normal from A toward B; coincident centers fall back to the
/// relative velocity, then to +x
fn contact_normal(a: &Puck, b: &Puck) -> DVec2 {
    let n = (b.position - a.position).normalized_or_zero();
    if n != DVec2::ZERO {
        return n;
    }
    let n = (a.velocity - b.velocity).normalized_or_zero();
    if n != DVec2::ZERO { n } else { DVec2::X }
}

/// Exchange the normal velocity components along `normal`, keeping tangents
fn exchange(a: &mut Puck, b: &mut Puck, normal: DVec2, cr: f64) {
    let a_n = a.velocity.projection_onto(normal);
    let b_n = b.velocity.projection_onto(normal);
    let a_t = a.velocity - a_n;
    let b_t = b.velocity - b_n;

    let (a_n, b_n) = a_and_b_normal_after(a_n, b_n, a.mass(), b.mass(), cr);
    a.velocity = a_n + a_t;
    b.velocity = b_n + b_t;
}

#[inline]
fn pair_restitution(a: &Puck, b: &Puck) -> f64 {
    a.restitution.min(b.restitution)
}

/// Resolve one pair with the penetration-time back-solve.
///
/// Returns true if the pair collided. Immune, non-overlapping and
/// separating pairs are left untouched.
pub fn resolve_pair_approximate(a: &mut Puck, b: &mut Puck, correct: bool) -> bool {
    if a.immune_to(b) || !overlapping(a, b) {
        return false;
    }

    let normal = contact_normal(a, b);
    let a_n = a.velocity.projection_onto(normal);
    let b_n = b.velocity.projection_onto(normal);
    // The normal points from A to B, so a positive value means approaching
    let closing = (a_n - b_n).dot(normal);
    if closing <= 0.0 {
        return false;
    }

    if correct {
        let depth = (a.radius() + b.radius()) - a.position.distance(b.position);
        let t_pen = depth / closing;
        // Back to (roughly) the moment of contact
        a.position -= a_n * t_pen;
        b.position -= b_n * t_pen;
        // Replay with elastic velocities so a low CR cannot leave them stuck
        let (a_tmp, b_tmp) = a_and_b_normal_after(a_n, b_n, a.mass(), b.mass(), 1.0);
        a.position += a_tmp * t_pen;
        b.position += b_tmp * t_pen;
    }

    exchange(a, b, normal, pair_restitution(a, b));
    true
}

/// Whether the step just integrated brought the pair closer together.
///
/// Coincident centers count as closing whenever there is relative motion.
fn closing_over(a: &Puck, b: &Puck, dt: f64) -> bool {
    let path = (a.velocity - b.velocity) * dt;
    let separation = a.position - b.position;
    if separation == DVec2::ZERO {
        return path != DVec2::ZERO;
    }
    path.dot(separation) < 0.0
}

/// Share of the step spent past the kiss point, before clamping.
///
/// Above 1 when the pair already overlapped as the step began.
fn kiss_fraction(a: &Puck, b: &Puck, dt: f64) -> Option<f64> {
    let prime_path = (a.velocity - b.velocity) * dt;
    let path_len_sq = prime_path.length_squared();
    if dt == 0.0 || path_len_sq == 0.0 {
        return None;
    }
    let path_len = path_len_sq.sqrt();
    let path_dir = prime_path / path_len;

    let separation = a.position - b.position;
    let along = separation.dot(path_dir);
    let perp_sq = (separation.length_squared() - along * along).max(0.0);
    let touch = a.radius() + b.radius();
    let contact_offset = (touch * touch - perp_sq).max(0.0).sqrt();

    Some((along + contact_offset) / path_len)
}

/// Time since first contact for an overlapping pair, signed like `dt`.
///
/// Works on the relative ("prime") path of A as seen from B over the tick:
/// with `s` the current separation, the separation's projection onto the
/// path and the right triangle `offset² = (r_A + r_B)² − perp²` give the
/// distance back along the path to the kiss point. `None` when there is no
/// relative motion to rewind along. Overlaps older than one tick (spawned
/// overlapping) are rewound at most one tick.
pub fn time_since_contact(a: &Puck, b: &Puck, dt: f64) -> Option<f64> {
    kiss_fraction(a, b, dt).map(|f| f.clamp(0.0, 1.0) * dt)
}

fn warn_if_stale(a: &Puck, b: &Puck, dt: f64) {
    if kiss_fraction(a, b, dt).is_some_and(|f| f > 1.0) {
        log::warn!("pucks {} and {} overlapped before the step began; rewinding one step only", a.id, b.id);
    }
}

/// Rewind both pucks by `tau`, exchange normal velocities at the contact
/// normal found there, and re-advance by `tau`. A zero `tau` exchanges in
/// place.
fn exchange_at(a: &mut Puck, b: &mut Puck, tau: f64) {
    let cr = pair_restitution(a, b);
    a.position -= a.velocity * tau;
    b.position -= b.velocity * tau;

    let normal = contact_normal(a, b);
    exchange(a, b, normal, cr);

    a.position += a.velocity * tau;
    b.position += b.velocity * tau;
}

/// Resolve one pair by reconstructing the exact moment of contact.
///
/// `dt` is the signed timestep just integrated. Rewinds both pucks to the
/// kiss point, exchanges normal velocities at the true contact normal and
/// re-advances by the same time. With `correct` off, or no relative
/// motion, velocities are exchanged in place.
pub fn resolve_pair_exact(a: &mut Puck, b: &mut Puck, dt: f64, correct: bool) -> bool {
    if a.immune_to(b) || !overlapping(a, b) || !closing_over(a, b, dt) {
        return false;
    }
    let tau = if correct { time_since_contact(a, b, dt) } else { None };
    if tau.is_some() {
        warn_if_stale(a, b, dt);
    }
    exchange_at(a, b, tau.unwrap_or(0.0));
    true
}

/// Pair and fence contacts resolved during one exact step
#[derive(Debug, Clone, Default)]
pub struct ExactStep {
    pub contacts: Vec<Contact>,
    pub bounces: u32,
}

/// How the fence takes part in an exact step
#[derive(Debug, Clone, Copy)]
pub struct FenceParams {
    pub bounds: Bounds,
    pub restitution: f64,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy)]
enum PendingContact {
    Pair(usize, usize),
    Fence(usize, Edge),
}

/// The contact that happened longest ago in the step's own direction.
///
/// `reach[i]` bounds how far puck `i` may be rewound: the time since its
/// latest contact already resolved in this step. Returned times are
/// unsigned.
fn earliest_contact(pucks: &[Puck], fence: &FenceParams, dt: f64, reach: &[f64]) -> Option<(PendingContact, f64)> {
    let mut best: Option<(PendingContact, f64)> = None;
    let mut offer = |contact: PendingContact, ago: f64| {
        if best.is_none_or(|(_, b)| ago > b) {
            best = Some((contact, ago));
        }
    };

    for (i, p) in pucks.iter().enumerate() {
        for edge in Edge::ALL {
            if let Some(t) = time_since_edge(p, &fence.bounds, edge, dt) {
                offer(PendingContact::Fence(i, edge), t.abs().min(reach[i]));
            }
        }
        for (j, q) in pucks.iter().enumerate().skip(i + 1) {
            if p.immune_to(q) || !overlapping(p, q) || !closing_over(p, q, dt) {
                continue;
            }
            if let Some(t) = time_since_contact(p, q, dt) {
                offer(PendingContact::Pair(i, j), t.abs().min(reach[i]).min(reach[j]));
            }
        }
    }
    best
}

/// Resolve every pair and fence contact of one integrated exact step in
/// the order they happened.
///
/// Each round takes the contact that happened longest ago, resolves it at
/// its kiss point and rescans, so a chain of contacts inside one tick
/// (a puck knocked into a third one) is handled within that tick. No puck
/// is rewound past a contact it already took part in. Run with the
/// opposite `dt`, the same contacts come up in the opposite order.
pub fn resolve_exact_step(pucks: &mut [Puck], fence: &FenceParams, dt: f64, correct: bool) -> ExactStep {
    let mut out = ExactStep::default();
    if dt == 0.0 {
        return out;
    }
    let n = pucks.len();
    let mut reach = vec![dt.abs(); n];
    let budget = 4 * (n + 2) * (n + 2);

    for _ in 0..budget {
        let Some((contact, ago)) = earliest_contact(pucks, fence, dt, &reach) else {
            return out;
        };
        let tau = ago.copysign(dt);
        match contact {
            PendingContact::Pair(i, j) => {
                let (a, b) = pair_mut(pucks, i, j);
                if correct {
                    warn_if_stale(a, b, dt);
                    exchange_at(a, b, tau);
                } else {
                    exchange_at(a, b, 0.0);
                }
                out.contacts.push(Contact { a: a.id, b: b.id });
                reach[i] = ago;
                reach[j] = ago;
            }
            PendingContact::Fence(i, edge) => {
                bounce_off_edge(&mut pucks[i], edge, tau, fence.restitution, fence.correct);
                out.bounces += 1;
                reach[i] = ago;
            }
        }
    }
    log::warn!("exact step stopped at its limit of {} contacts", budget);
    out
}

/// A bullet hitting a non-bullet of a different owner
pub fn hit_between(a: &Puck, b: &Puck, time: f64) -> Option<HitEvent> {
    if a.owner == b.owner || a.is_bullet == b.is_bullet {
        return None;
    }
    let (bullet, target) = if a.is_bullet { (a, b) } else { (b, a) };
    Some(HitEvent {
        bullet: bullet.id,
        target: target.id,
        time,
    })
}

/// Run `resolve` over every unordered pair; returns the pairs that collided.
///
/// Immune pairs are skipped individually; the scan always continues.
pub fn scan_pairs(
    pucks: &mut [Puck],
    mut resolve: impl FnMut(&mut Puck, &mut Puck) -> bool,
) -> Vec<Contact> {
    let mut contacts = Vec::new();
    let n = pucks.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = pair_mut(pucks, i, j);
            if a.immune_to(b) {
                continue;
            }
            if resolve(a, b) {
                contacts.push(Contact { a: a.id, b: b.id });
            }
        }
    }
    contacts
}

/// Recompute the advisory `tangled` flag on every puck
pub fn mark_tangled(pucks: &mut [Puck], factor: f64) {
    for p in pucks.iter_mut() {
        p.tangled = false;
    }
    let n = pucks.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = pair_mut(pucks, i, j);
            if a.immune_to(b) {
                continue;
            }
            let near = factor * (a.radius() + b.radius());
            if a.position.distance_squared(b.position) < near * near {
                a.tangled = true;
                b.tangled = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::puck::PuckDesc;
    use std::f64::consts::PI;

    /// Puck of the given mass (radius 1)
    fn puck(id: u32, x: f64, vx: f64, mass: f64) -> Puck {
        let desc = PuckDesc::new(DVec2::new(x, 0.0), 1.0, mass / PI).with_velocity(DVec2::new(vx, 0.0));
        Puck::new(PuckId(id), &desc, 0.0, 1.0, 0.0).unwrap()
    }

    #[test]
    fn test_elastic_formula_unequal_masses() {
        let (a, b) = a_and_b_normal_after(DVec2::new(4.0, 0.0), DVec2::ZERO, 1.0, 3.0, 1.0);
        assert!((a.x - (-2.0)).abs() < 1e-12);
        assert!((b.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_exchange_symmetry_exact() {
        let va = DVec2::new(1.3, -0.7);
        let vb = DVec2::new(-2.9, 0.4);
        let (a1, b1) = a_and_b_normal_after(va, vb, 2.5, 0.7, 0.6);
        let (b2, a2) = a_and_b_normal_after(vb, va, 0.7, 2.5, 0.6);
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_head_on_mass_1_and_3() {
        // Touching distance 2; overlapping by 0.1
        let mut a = puck(1, 0.0, 4.0, 1.0);
        let mut b = puck(2, 1.9, 0.0, 3.0);
        assert!(resolve_pair_approximate(&mut a, &mut b, true));
        assert!((a.velocity.x - (-2.0)).abs() < 1e-9);
        assert!((b.velocity.x - 2.0).abs() < 1e-9);
        assert!(a.velocity.y.abs() < 1e-12);
    }

    #[test]
    fn test_equal_masses_swap_speeds() {
        let mut a = puck(1, 0.0, 3.0, 2.0);
        let mut b = puck(2, 1.95, -1.0, 2.0);
        resolve_pair_approximate(&mut a, &mut b, true);
        assert!((a.velocity.x - (-1.0)).abs() < 1e-9);
        assert!((b.velocity.x - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_approximate_correction_separates() {
        let mut a = puck(1, 0.0, 4.0, 1.0);
        let mut b = puck(2, 1.8, -4.0, 1.0);
        resolve_pair_approximate(&mut a, &mut b, true);
        assert!(!overlapping(&a, &b));
    }

    #[test]
    fn test_momentum_conserved_inelastic() {
        let mut a = puck(1, 0.0, 2.0, 1.5);
        let mut b = puck(2, 1.9, -1.0, 0.5);
        a.restitution = 0.3;
        let before = a.velocity * a.mass() + b.velocity * b.mass();
        resolve_pair_approximate(&mut a, &mut b, true);
        let after = a.velocity * a.mass() + b.velocity * b.mass();
        assert!((before - after).length() < 1e-9);
    }

    #[test]
    fn test_oblique_keeps_tangent() {
        let desc_a = PuckDesc::new(DVec2::ZERO, 1.0, 1.0).with_velocity(DVec2::new(1.0, 1.0));
        let desc_b = PuckDesc::new(DVec2::new(1.9, 0.0), 1.0, 1.0);
        let mut a = Puck::new(PuckId(1), &desc_a, 0.0, 1.0, 0.0).unwrap();
        let mut b = Puck::new(PuckId(2), &desc_b, 0.0, 1.0, 0.0).unwrap();
        resolve_pair_approximate(&mut a, &mut b, false);
        // Normal is +x: A keeps its y, hands its x to B
        assert!(a.velocity.x.abs() < 1e-12);
        assert!((a.velocity.y - 1.0).abs() < 1e-12);
        assert!((b.velocity.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_immune_pair_untouched() {
        let mut a = puck(1, 0.0, 4.0, 1.0);
        let mut b = puck(2, 1.0, -4.0, 1.0);
        a.group_index = -2;
        b.group_index = -2;
        let before = (a.position, a.velocity, b.position, b.velocity);
        assert!(!resolve_pair_approximate(&mut a, &mut b, true));
        assert!(!resolve_pair_exact(&mut a, &mut b, 0.01, true));
        assert_eq!((a.position, a.velocity, b.position, b.velocity), before);
    }

    #[test]
    fn test_scan_continues_past_immune_pair() {
        let mut pucks = vec![
            puck(1, 0.0, 1.0, 1.0),
            puck(2, 0.5, 0.0, 1.0),
            puck(3, 5.0, 0.0, 1.0),
            puck(4, 6.5, -1.0, 1.0),
        ];
        pucks[0].group_index = -1;
        pucks[1].group_index = -1;
        let contacts = scan_pairs(&mut pucks, |a, b| resolve_pair_approximate(a, b, true));
        assert_eq!(contacts, vec![Contact { a: PuckId(3), b: PuckId(4) }]);
    }

    #[test]
    fn test_kiss_time_head_on() {
        // Closing at 2 m/s, overlapping by 0.2 -> contact 0.1s ago
        let a = puck(1, 0.0, 1.0, 1.0);
        let b = puck(2, 1.8, -1.0, 1.0);
        let tau = time_since_contact(&a, &b, 0.5).unwrap();
        assert!((tau - 0.1).abs() < 1e-12);

        // Time running backward: same geometry with negated velocities
        let a = puck(1, 0.0, -1.0, 1.0);
        let b = puck(2, 1.8, 1.0, 1.0);
        let tau = time_since_contact(&a, &b, -0.5).unwrap();
        assert!((tau + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_exact_resolves_at_kiss_point() {
        // Started touching-free at x=0 and 2.2, moved 0.2 each toward the other
        let mut a = puck(1, 0.2, 1.0, 1.0);
        let mut b = puck(2, 2.0, -1.0, 1.0);
        assert!(resolve_pair_exact(&mut a, &mut b, 0.2, true));
        // Contact at 0.1 and 2.1, then 0.1s apart at the swapped velocities
        assert!((a.position.x - 0.0).abs() < 1e-12);
        assert!((b.position.x - 2.2).abs() < 1e-12);
        assert!((a.velocity.x + 1.0).abs() < 1e-12);
        assert!((b.velocity.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_is_reversible_in_one_step() {
        let start_a = (DVec2::new(0.0, 0.3), DVec2::new(2.0, 0.0));
        let start_b = (DVec2::new(2.3, 0.0), DVec2::new(-1.0, 0.5));
        let dt = 0.25;

        let mk = |id, (p, v): (DVec2, DVec2)| {
            let desc = PuckDesc::new(p, 1.0, 1.0).with_velocity(v);
            Puck::new(PuckId(id), &desc, 0.0, 1.0, 0.0).unwrap()
        };
        let mut a = mk(1, start_a);
        let mut b = mk(2, start_b);

        // Forward: drift, then resolve
        a.position += a.velocity * dt;
        b.position += b.velocity * dt;
        assert!(resolve_pair_exact(&mut a, &mut b, dt, true));

        // Backward
        a.position -= a.velocity * dt;
        b.position -= b.velocity * dt;
        assert!(resolve_pair_exact(&mut a, &mut b, -dt, true));

        assert!((a.position - start_a.0).length() < 1e-9);
        assert!((a.velocity - start_a.1).length() < 1e-9);
        assert!((b.position - start_b.0).length() < 1e-9);
        assert!((b.velocity - start_b.1).length() < 1e-9);
    }

    #[test]
    fn test_separating_overlap_left_alone() {
        // Overlapping by 0.5 but already moving apart
        let mut a = puck(1, 0.0, -1.0, 1.0);
        let mut b = puck(2, 1.5, 1.0, 1.0);
        let before = (a.position, a.velocity, b.position, b.velocity);
        assert!(!resolve_pair_approximate(&mut a, &mut b, true));
        assert!(!resolve_pair_approximate(&mut a, &mut b, false));
        assert!(!resolve_pair_exact(&mut a, &mut b, 0.1, true));
        assert_eq!((a.position, a.velocity, b.position, b.velocity), before);

        // The same pair stepped backward is closing
        assert!(resolve_pair_exact(&mut a, &mut b, -0.1, true));
    }

    fn row(xs: [f64; 3], vxs: [f64; 3]) -> Vec<Puck> {
        (0..3)
            .map(|i| {
                let mut p = puck(i as u32 + 1, xs[i], vxs[i], 1.0);
                p.position.y = 50.0;
                p
            })
            .collect()
    }

    fn open_fence() -> FenceParams {
        FenceParams {
            bounds: Bounds::from_size(100.0, 100.0),
            restitution: 1.0,
            correct: true,
        }
    }

    #[test]
    fn test_chain_resolved_within_one_step() {
        let dt = 0.1;
        // 3 runs into 2, which is then knocked into 1 in the same step
        let mut ps = row([50.0, 52.01, 54.51], [0.0, 0.0, -6.0]);
        for p in ps.iter_mut() {
            p.position += p.velocity * dt;
        }

        let out = resolve_exact_step(&mut ps, &open_fence(), dt, true);

        assert_eq!(out.bounces, 0);
        assert_eq!(
            out.contacts,
            vec![Contact { a: PuckId(2), b: PuckId(3) }, Contact { a: PuckId(1), b: PuckId(2) }]
        );
        assert!((ps[0].velocity.x + 6.0).abs() < 1e-9);
        assert!(ps[1].velocity.x.abs() < 1e-9);
        assert!(ps[2].velocity.x.abs() < 1e-9);
        assert!((ps[0].position.x - 49.91).abs() < 1e-9);
        assert!((ps[1].position.x - 52.0).abs() < 1e-9);
        assert!((ps[2].position.x - 54.01).abs() < 1e-9);
        assert!(!overlapping(&ps[0], &ps[1]));
    }

    #[test]
    fn test_chain_unwinds_backward() {
        let dt = 0.1;
        let start = row([50.0, 52.01, 54.51], [0.0, 0.0, -6.0]);
        let mut ps = start.clone();
        for p in ps.iter_mut() {
            p.position += p.velocity * dt;
        }
        resolve_exact_step(&mut ps, &open_fence(), dt, true);

        for p in ps.iter_mut() {
            p.position -= p.velocity * dt;
        }
        let back = resolve_exact_step(&mut ps, &open_fence(), -dt, true);

        assert_eq!(back.contacts.len(), 2);
        for (p, s) in ps.iter().zip(&start) {
            assert!((p.position - s.position).length() < 1e-9, "puck {} at {:?}", p.id, p.position);
            assert!((p.velocity - s.velocity).length() < 1e-9);
        }
    }

    #[test]
    fn test_fence_and_pair_in_one_step() {
        let dt = 0.1;
        // 1 bounces off the left edge and then meets 2 on its way back
        let mut ps = row([1.2, 3.25, 60.0], [-4.0, -1.0, 0.0]);
        for p in ps.iter_mut() {
            p.position += p.velocity * dt;
        }

        let out = resolve_exact_step(&mut ps, &open_fence(), dt, true);

        assert_eq!(out.bounces, 1);
        assert_eq!(out.contacts, vec![Contact { a: PuckId(1), b: PuckId(2) }]);
        assert!(ps[0].velocity.x < 0.0);
        assert!(ps[1].velocity.x > 0.0);
        assert!(ps[0].position.x >= 1.0);
    }

    #[test]
    fn test_hit_rules() {
        let mut bullet = puck(1, 0.0, 0.0, 0.1);
        bullet.is_bullet = true;
        bullet.owner = Some(1);
        let mut target = puck(2, 1.0, 0.0, 1.0);
        target.owner = Some(2);

        let hit = hit_between(&target, &bullet, 3.0).unwrap();
        assert_eq!(hit.bullet, PuckId(1));
        assert_eq!(hit.target, PuckId(2));

        // Own puck
        target.owner = Some(1);
        assert!(hit_between(&bullet, &target, 3.0).is_none());

        // Bullet on bullet
        target.owner = Some(2);
        target.is_bullet = true;
        assert!(hit_between(&bullet, &target, 3.0).is_none());
    }

    #[test]
    fn test_tangled_flag() {
        let mut pucks = vec![puck(1, 0.0, 0.0, 1.0), puck(2, 2.1, 0.0, 1.0), puck(3, 10.0, 0.0, 1.0)];
        mark_tangled(&mut pucks, 1.1);
        assert!(pucks[0].tangled);
        assert!(pucks[1].tangled);
        assert!(!pucks[2].tangled);
    }
}
