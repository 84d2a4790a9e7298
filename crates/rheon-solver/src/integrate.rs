//! Integrator hook: the state gather/scatter contract.
//!
//! Components that own generalized state beyond the bodies (a speed-mode
//! motor's auxiliary drift variable) implement [`StateSlots`] so the outer
//! time integrator can include their coordinates in the global state and
//! state-derivative vectors at stable offsets.

use rheon_math::DVec;

/// State gather/scatter contract for components owning generalized state.
pub trait StateSlots {
    /// Number of (position-like, speed-like) slots currently owned.
    fn state_dims(&self) -> (usize, usize);

    /// Write the owned coordinates into the global state vectors.
    fn gather_state(&self, off_x: usize, x: &mut DVec, off_v: usize, v: &mut DVec);

    /// Read the owned coordinates back from the global state vectors.
    fn scatter_state(&mut self, off_x: usize, x: &DVec, off_v: usize, v: &DVec);

    /// Write owned accelerations into the global derivative vector.
    fn gather_acceleration(&self, off_a: usize, a: &mut DVec);

    /// Read owned accelerations back from the global derivative vector.
    fn scatter_acceleration(&mut self, off_a: usize, a: &DVec);
}
