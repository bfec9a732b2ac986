//! Whole-system measurements used for progress logs and sanity checks

use crate::engine::Body;
use glam::DVec2;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDiagnostics {
    pub step: u64,
    pub total_mass: f64,
    pub center_of_mass: DVec2,
    pub momentum: DVec2,
    pub kinetic_energy: f64,
    /// Largest distance of any body from the centre of mass
    pub max_radius: f64,
}

impl StepDiagnostics {
    pub fn measure(step: u64, bodies: &[Body]) -> Self {
        let mut total_mass = 0.0;
        let mut weighted = DVec2::ZERO;
        let mut momentum = DVec2::ZERO;
        let mut kinetic_energy = 0.0;

        for b in bodies {
            total_mass += b.mass;
            weighted += b.pos * b.mass;
            momentum += b.vel * b.mass;
            kinetic_energy += 0.5 * b.mass * b.vel.length_squared();
        }

        let center_of_mass = if total_mass > 0.0 {
            weighted / total_mass
        } else {
            DVec2::ZERO
        };
        let max_radius = bodies
            .iter()
            .map(|b| b.pos.distance(center_of_mass))
            .fold(0.0, f64::max);

        Self {
            step,
            total_mass,
            center_of_mass,
            momentum,
            kinetic_energy,
            max_radius,
        }
    }
}

impl fmt::Display for StepDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {}: com=({:.4}, {:.4}) p=({:.3e}, {:.3e}) ke={:.6e} r_max={:.4}",
            self.step,
            self.center_of_mass.x,
            self.center_of_mass.y,
            self.momentum.x,
            self.momentum.y,
            self.kinetic_energy,
            self.max_radius
        )
    }
}
