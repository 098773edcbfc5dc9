//! Step-size schedules for the relaxation.
//!
//! The radius is the length of every candidate move the engine tries. Large radii make
//! coarse, global corrections; as the schedule shrinks the radius the corrections become
//! fine and local. The schedule is the main convergence control of the fit.

use crate::dimred::mds::{History, MdsError};
use crate::distance::DistanceMatrix;
use log::debug;

/// Adapts the radius from the error trajectory.
///
/// `initial` is called once at the start of every run and must reset any schedule state,
/// so one strategy value can drive several runs reproducibly.
pub trait RadiusUpdate {
    /// Starting radius for a run over the given original distances. Must be `> 0`.
    fn initial(&mut self, original: &DistanceMatrix) -> f64;

    /// Radius for the next iteration. `history` holds the iterations completed before the
    /// current one, `error` is the error the current iteration just reached.
    fn adapt(&mut self, history: &History, error: f64) -> f64;
}

impl<U: RadiusUpdate + ?Sized> RadiusUpdate for Box<U> {
    fn initial(&mut self, original: &DistanceMatrix) -> f64 {
        (**self).initial(original)
    }

    fn adapt(&mut self, history: &History, error: f64) -> f64 {
        (**self).adapt(history, error)
    }
}

fn spread_radius(original: &DistanceMatrix, spread_fraction: f64) -> f64 {
    let spread = original.max();
    if spread > 0.0 {
        spread_fraction * spread
    } else {
        1.0
    }
}

fn check_spread_fraction(spread_fraction: f64) -> Result<(), MdsError> {
    if !spread_fraction.is_finite() || spread_fraction <= 0.0 {
        return Err(MdsError::InvalidParameter {
            name: "spread_fraction",
            expected: "finite and > 0",
            value: spread_fraction,
        });
    }
    Ok(())
}

/// Halves the radius whenever the error plateaus.
///
/// A plateau is declared when, `window` or more iterations after the last halving, the
/// current error is not lower than the error `window` iterations ago by more than a
/// relative `tolerance`. Otherwise the radius is left alone, so the radius is
/// non-increasing and never reaches zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaRadiusHalving {
    window: usize,
    tolerance: f64,
    spread_fraction: f64,
    initial_radius: Option<f64>,
    radius: f64,
    since_change: usize,
}

impl AdaRadiusHalving {
    pub fn new(window: usize, tolerance: f64) -> Result<Self, MdsError> {
        if window == 0 {
            return Err(MdsError::InvalidParameter {
                name: "window",
                expected: ">= 1",
                value: 0.0,
            });
        }
        if !tolerance.is_finite() || !(0.0..1.0).contains(&tolerance) {
            return Err(MdsError::InvalidParameter {
                name: "tolerance",
                expected: "in [0, 1)",
                value: tolerance,
            });
        }
        Ok(AdaRadiusHalving {
            window,
            tolerance,
            ..Self::default()
        })
    }

    /// Starts every run from `radius` instead of a fraction of the data spread.
    pub fn with_initial_radius(mut self, radius: f64) -> Result<Self, MdsError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(MdsError::InvalidRadius(radius));
        }
        self.initial_radius = Some(radius);
        Ok(self)
    }

    /// Starting radius as a fraction of the largest original distance.
    pub fn with_spread_fraction(mut self, spread_fraction: f64) -> Result<Self, MdsError> {
        check_spread_fraction(spread_fraction)?;
        self.spread_fraction = spread_fraction;
        Ok(self)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Radius most recently handed out.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn is_plateau(&self, history: &History, error: f64) -> bool {
        let completed = history.len();
        if self.since_change < self.window || completed < self.window {
            return false;
        }
        match history.error(completed - self.window) {
            Some(reference) => error > reference * (1.0 - self.tolerance),
            None => false,
        }
    }
}

impl Default for AdaRadiusHalving {
    fn default() -> Self {
        AdaRadiusHalving {
            window: 2,
            tolerance: 1e-3,
            spread_fraction: 0.5,
            initial_radius: None,
            radius: 1.0,
            since_change: 0,
        }
    }
}

impl RadiusUpdate for AdaRadiusHalving {
    fn initial(&mut self, original: &DistanceMatrix) -> f64 {
        self.radius = self
            .initial_radius
            .unwrap_or_else(|| spread_radius(original, self.spread_fraction));
        self.since_change = 0;
        self.radius
    }

    fn adapt(&mut self, history: &History, error: f64) -> f64 {
        self.since_change += 1;
        if self.is_plateau(history, error) {
            self.radius *= 0.5;
            self.since_change = 0;
            debug!(
                "error plateau at iteration {} ({:.6e}), radius halved to {:.6e}",
                history.len() + 1,
                error,
                self.radius
            );
        }
        self.radius
    }
}

/// Shrinks the radius by a constant factor every iteration, regardless of the error.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricDecay {
    factor: f64,
    spread_fraction: f64,
    radius: f64,
}

impl GeometricDecay {
    pub fn new(factor: f64) -> Result<Self, MdsError> {
        if !factor.is_finite() || factor <= 0.0 || factor >= 1.0 {
            return Err(MdsError::InvalidParameter {
                name: "factor",
                expected: "in (0, 1)",
                value: factor,
            });
        }
        Ok(GeometricDecay {
            factor,
            spread_fraction: 0.5,
            radius: 1.0,
        })
    }

    pub fn with_spread_fraction(mut self, spread_fraction: f64) -> Result<Self, MdsError> {
        check_spread_fraction(spread_fraction)?;
        self.spread_fraction = spread_fraction;
        Ok(self)
    }
}

impl RadiusUpdate for GeometricDecay {
    fn initial(&mut self, original: &DistanceMatrix) -> f64 {
        self.radius = spread_radius(original, self.spread_fraction);
        self.radius
    }

    fn adapt(&mut self, _history: &History, _error: f64) -> f64 {
        self.radius *= self.factor;
        self.radius
    }
}
