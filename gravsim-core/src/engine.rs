use crate::error::{ConfigError, Result};
use glam::DVec2;

/// A point mass in the simulation
///
/// A body's identity is its index in the store; `mass` is set at creation
/// and never changed by the kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub pos: DVec2,
    pub vel: DVec2,
    pub acc: DVec2, // last computed
    pub mass: f64,
}

impl Body {
    pub fn new(pos: DVec2, vel: DVec2, mass: f64) -> Self {
        Self {
            pos,
            vel,
            acc: DVec2::ZERO,
            mass,
        }
    }

    /// Unit-mass body at rest
    pub fn at(x: f64, y: f64) -> Self {
        Self::new(DVec2::new(x, y), DVec2::ZERO, 1.0)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

/// Double-buffered body state
///
/// `current` is read-only while a step runs and `next` receives exactly one
/// write per slot. After the step completes the two buffers trade places,
/// so the old `current` allocation becomes the next step's `next`.
#[derive(Debug)]
pub struct BodyStore {
    current: Vec<Body>,
    next: Vec<Body>,
    step: u64,
}

impl BodyStore {
    /// Build a store from an initial population
    ///
    /// Rejects empty populations, non-positive masses and non-finite
    /// kinematic state.
    pub fn new(bodies: Vec<Body>) -> Result<Self> {
        if bodies.is_empty() {
            return Err(ConfigError::NoBodies.into());
        }
        for (index, b) in bodies.iter().enumerate() {
            if !(b.mass.is_finite() && b.mass > 0.0) {
                return Err(ConfigError::BadMass {
                    index,
                    mass: b.mass,
                }
                .into());
            }
            if !(b.pos.is_finite() && b.vel.is_finite()) {
                return Err(ConfigError::NonFiniteBody { index }.into());
            }
        }

        let next = vec![Body::default(); bodies.len()];
        Ok(Self {
            current: bodies,
            next,
            step: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Index of the step `current` belongs to
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn current(&self) -> &[Body] {
        &self.current
    }

    /// Split borrow for one step: read-only `current`, writable `next`
    pub fn buffers(&mut self) -> (&[Body], &mut [Body]) {
        (&self.current, &mut self.next)
    }

    /// Promote `next` to `current` once every body has been advanced
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.step += 1;
    }
}
