//! Spring/damper links between pucks or between a puck and a fixed point

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::puck::{ForceChannel, Puck, PuckId, index_of};
use super::vector::VecExt;
use crate::error::{Result, TableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpringId(pub u32);

impl fmt::Display for SpringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Second end of a spring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpringEnd {
    Puck(PuckId),
    /// Immovable anchor: zero radius, infinite mass, never collides
    Fixed(DVec2),
}

impl SpringEnd {
    pub fn puck(&self) -> Option<PuckId> {
        match *self {
            SpringEnd::Puck(id) => Some(id),
            SpringEnd::Fixed(_) => None,
        }
    }
}

/// Creation parameters for a spring
#[derive(Debug, Clone, Copy)]
pub struct SpringDesc {
    pub a: PuckId,
    pub b: SpringEnd,
    pub rest_length: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub drag: f64,
}

impl SpringDesc {
    pub fn new(a: PuckId, b: SpringEnd, rest_length: f64, stiffness: f64) -> Self {
        Self {
            a,
            b,
            rest_length,
            stiffness,
            damping: 0.0,
            drag: 0.0,
        }
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_drag(mut self, drag: f64) -> Self {
        self.drag = drag;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(TableError::InvalidSpring(msg.to_string()));
        if !(self.rest_length.is_finite() && self.rest_length >= 0.0) {
            return bad("rest length must be >= 0");
        }
        if !(self.stiffness.is_finite() && self.stiffness > 0.0) {
            return bad("stiffness must be > 0");
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return bad("damping must be >= 0");
        }
        if !(self.drag.is_finite() && self.drag >= 0.0) {
            return bad("drag must be >= 0");
        }
        if self.b == SpringEnd::Puck(self.a) {
            return bad("a spring cannot join a puck to itself");
        }
        Ok(())
    }
}

/// An elastic link with damping and optional endpoint drag
#[derive(Debug, Clone, Serialize)]
pub struct Spring {
    pub id: SpringId,
    pub a: PuckId,
    pub b: SpringEnd,
    pub rest_length: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub drag: f64,
}

/// Kinematic state of one spring end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub position: DVec2,
    pub velocity: DVec2,
}

impl Endpoint {
    pub fn of(puck: &Puck) -> Self {
        Self {
            position: puck.position,
            velocity: puck.velocity,
        }
    }

    pub fn fixed(position: DVec2) -> Self {
        Self {
            position,
            velocity: DVec2::ZERO,
        }
    }
}

impl Spring {
    pub fn new(id: SpringId, desc: &SpringDesc) -> Result<Self> {
        desc.validate()?;
        Ok(Self {
            id,
            a: desc.a,
            b: desc.b,
            rest_length: desc.rest_length,
            stiffness: desc.stiffness,
            damping: desc.damping,
            drag: desc.drag,
        })
    }

    /// True if either end is attached to `id`
    pub fn references(&self, id: PuckId) -> bool {
        self.a == id || self.b == SpringEnd::Puck(id)
    }

    /// Elastic plus damping force on end `a`; end `b` receives the negation.
    ///
    /// Coincident endpoints have no defined direction and produce no elastic force.
    pub fn force_on_a(&self, a: Endpoint, b: Endpoint) -> DVec2 {
        let separation = a.position - b.position;
        let distance = separation.length();

        let spring_force = if distance == 0.0 {
            DVec2::ZERO
        } else {
            (separation / distance) * (self.rest_length - distance) * self.stiffness
        };

        let damping_force = (a.velocity - b.velocity).projection_onto(separation) * self.damping;

        spring_force - damping_force
    }

    /// Linear drag on one end, from its own velocity only
    pub fn drag_on(&self, end: Endpoint) -> DVec2 {
        -end.velocity * self.drag
    }

    /// Accumulate this spring's forces into the spring channel of its pucks.
    ///
    /// Missing pucks are skipped; deletion normally removes their springs first.
    pub fn apply(&self, pucks: &mut [Puck]) {
        let Some(ia) = index_of(pucks, self.a) else {
            log::warn!("spring {} references missing puck {}", self.id, self.a);
            return;
        };
        let (end_b, ib) = match self.b {
            SpringEnd::Fixed(point) => (Endpoint::fixed(point), None),
            SpringEnd::Puck(id) => match index_of(pucks, id) {
                Some(ib) => (Endpoint::of(&pucks[ib]), Some(ib)),
                None => {
                    log::warn!("spring {} references missing puck {}", self.id, id);
                    return;
                }
            },
        };
        let end_a = Endpoint::of(&pucks[ia]);

        let force = self.force_on_a(end_a, end_b);

        pucks[ia].forces.add(ForceChannel::Spring, force + self.drag_on(end_a));
        if let Some(ib) = ib {
            pucks[ib].forces.add(ForceChannel::Spring, -force + self.drag_on(end_b));
        }
    }
}
