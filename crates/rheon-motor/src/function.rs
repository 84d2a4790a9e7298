//! Rheonomic driving functions: scalar signals of simulation time.
//!
//! A motor's target is a pure function of time with a value and a first
//! derivative. Functions should be at least C0 continuous; a discontinuity
//! is not rejected but produces spurious acceleration peaks.

use crate::config::FunctionConfig;

/// A time-parameterized scalar signal with value and first derivative.
///
/// Swappable per motor at runtime. Implementations that can be expressed as
/// plain config data override [`Rheonomic::as_config`].
pub trait Rheonomic: std::fmt::Debug {
    /// Signal value at time `t`.
    fn value(&self, t: f64) -> f64;

    /// First derivative at time `t`.
    fn derivative(&self, t: f64) -> f64;

    /// Plain-data representation, if this function has one.
    fn as_config(&self) -> Option<FunctionConfig> {
        None
    }

    fn boxed_clone(&self) -> Box<dyn Rheonomic>;
}

impl Clone for Box<dyn Rheonomic> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Constant signal.
#[derive(Debug, Clone, Copy)]
pub struct ConstFn {
    pub value: f64,
}

impl ConstFn {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Rheonomic for ConstFn {
    fn value(&self, _t: f64) -> f64 {
        self.value
    }

    fn derivative(&self, _t: f64) -> f64 {
        0.0
    }

    fn as_config(&self) -> Option<FunctionConfig> {
        Some(FunctionConfig::Constant { value: self.value })
    }

    fn boxed_clone(&self) -> Box<dyn Rheonomic> {
        Box::new(*self)
    }
}

/// Linear ramp: y(t) = y0 + slope * t.
#[derive(Debug, Clone, Copy)]
pub struct RampFn {
    pub y0: f64,
    pub slope: f64,
}

impl RampFn {
    pub fn new(y0: f64, slope: f64) -> Self {
        Self { y0, slope }
    }
}

impl Rheonomic for RampFn {
    fn value(&self, t: f64) -> f64 {
        self.y0 + self.slope * t
    }

    fn derivative(&self, _t: f64) -> f64 {
        self.slope
    }

    fn as_config(&self) -> Option<FunctionConfig> {
        Some(FunctionConfig::Ramp {
            y0: self.y0,
            slope: self.slope,
        })
    }

    fn boxed_clone(&self) -> Box<dyn Rheonomic> {
        Box::new(*self)
    }
}

/// Sinusoid: y(t) = amplitude * sin(omega * t + phase).
#[derive(Debug, Clone, Copy)]
pub struct SineFn {
    pub amplitude: f64,
    /// Angular frequency [rad/s].
    pub omega: f64,
    pub phase: f64,
}

impl SineFn {
    pub fn new(amplitude: f64, omega: f64, phase: f64) -> Self {
        Self {
            amplitude,
            omega,
            phase,
        }
    }
}

impl Rheonomic for SineFn {
    fn value(&self, t: f64) -> f64 {
        self.amplitude * (self.omega * t + self.phase).sin()
    }

    fn derivative(&self, t: f64) -> f64 {
        self.amplitude * self.omega * (self.omega * t + self.phase).cos()
    }

    fn as_config(&self) -> Option<FunctionConfig> {
        Some(FunctionConfig::Sine {
            amplitude: self.amplitude,
            omega: self.omega,
            phase: self.phase,
        })
    }

    fn boxed_clone(&self) -> Box<dyn Rheonomic> {
        Box::new(*self)
    }
}
