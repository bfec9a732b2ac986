//! Pairwise gravity and the fixed-step integrator
//!
//! The separation metric is `|dx|^3 + |dy|^3`, not the Euclidean distance
//! cubed, and is floored at `min_dist`. Velocity is updated before position
//! (semi-implicit Euler).

use crate::engine::Body;
use glam::DVec2;

/// Physical constants for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Physics {
    pub g: f64,        // gravitational constant
    pub min_dist: f64, // floor on the cubed separation
    pub dt: f64,       // step duration
}

/// Net force on body `i` from every other body in `bodies`
///
/// The self term is skipped: with `min_dist = 0` it would be `0 / 0`.
/// Contributions are summed in index order, so the result does not depend
/// on which worker evaluates it.
pub fn net_force(bodies: &[Body], i: usize, physics: &Physics) -> DVec2 {
    let bi = &bodies[i];
    let mut fx = 0.0;
    let mut fy = 0.0;

    for (j, bj) in bodies.iter().enumerate() {
        if j == i {
            continue;
        }
        let dx = bi.pos.x - bj.pos.x;
        let dy = bi.pos.y - bj.pos.y;
        let coef = -physics.g * bi.mass * bj.mass;
        let den = (dx.abs().powi(3) + dy.abs().powi(3)).max(physics.min_dist);
        fx += (coef / den) * dx;
        fy += (coef / den) * dy;
    }

    DVec2::new(fx, fy)
}

/// Advance body `i` by one step, reading only from `bodies`
pub fn advance_body(bodies: &[Body], i: usize, physics: &Physics) -> Body {
    let force = net_force(bodies, i, physics);
    let mut b = bodies[i];

    b.acc = force / b.mass;
    b.vel += b.acc * physics.dt;
    b.pos += b.vel * physics.dt;
    b
}

/// Single-threaded reference step: `next[i] = advance_body(current, i)`
pub fn step(current: &[Body], next: &mut [Body], physics: &Physics) {
    for (i, slot) in next.iter_mut().enumerate() {
        *slot = advance_body(current, i, physics);
    }
}
