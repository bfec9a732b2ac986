//! Initial body populations
//!
//! Every generator is a pure function of its arguments; the random ones
//! draw from a `ChaChaRng` seeded with the caller's seed, so a given seed
//! always yields the same bodies.

use crate::config::{BodySpec, DiscParams, GridParams, SceneConfig};
use crate::engine::Body;
use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use std::f64::consts::TAU;

/// Sample `count` unit masses uniformly over a rotating disc
///
/// For each body two uniforms are drawn in order: `u1` for the radial
/// offset `sqrt(u1) * radius` and `u2` for the angle `u2 * 2π`. The body
/// gets tangential speed `angular_velocity * r` plus the translation.
#[allow(clippy::too_many_arguments)]
pub fn generate_rotating_disc(
    radius: f64,
    center_x: f64,
    center_y: f64,
    translate_vx: f64,
    translate_vy: f64,
    angular_velocity: f64,
    count: usize,
    seed: u64,
) -> Vec<Body> {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    let mut bodies = Vec::with_capacity(count);

    for _ in 0..count {
        let r = rng.random::<f64>().sqrt() * radius;
        let theta = rng.random::<f64>() * TAU;
        let (sin, cos) = theta.sin_cos();

        let speed = angular_velocity * r;
        let pos = DVec2::new(center_x + r * cos, center_y + r * sin);
        let vel = DVec2::new(translate_vx - speed * sin, translate_vy + speed * cos);
        bodies.push(Body::new(pos, vel, 1.0));
    }

    bodies
}

pub fn disc(params: &DiscParams, count: usize) -> Vec<Body> {
    generate_rotating_disc(
        params.radius,
        params.center[0],
        params.center[1],
        params.translation[0],
        params.translation[1],
        params.angular_velocity,
        count,
        params.seed,
    )
}

/// Unit masses laid out row by row, `columns` per row
pub fn grid(params: &GridParams, count: usize) -> Vec<Body> {
    let velocity = DVec2::from(params.velocity);
    let origin = DVec2::from(params.origin);
    let columns = params.columns.max(1);

    (0..count)
        .map(|i| {
            let cell = DVec2::new((i % columns) as f64, (i / columns) as f64);
            Body::new(origin + cell * params.spacing, velocity, 1.0)
        })
        .collect()
}

pub fn explicit(specs: &[BodySpec]) -> Vec<Body> {
    specs
        .iter()
        .map(|s| Body::new(DVec2::from(s.pos), DVec2::from(s.vel), s.mass))
        .collect()
}

/// Build the initial population described by `scene`
pub fn build_scene(scene: &SceneConfig, body_count: usize) -> Vec<Body> {
    match scene {
        SceneConfig::RotatingDisc(params) => disc(params, body_count),
        SceneConfig::DoubleDisc { first, second } => {
            let half = body_count / 2;
            let mut bodies = disc(first, half);
            bodies.extend(disc(second, body_count - half));
            bodies
        }
        SceneConfig::Grid(params) => grid(params, body_count),
        SceneConfig::Explicit { bodies } => explicit(bodies),
    }
}
