//! Solver-bridge contract for the rheon motor-constraint engine.
//!
//! A `SystemDescriptor` collects `VariableBlock`s (per-body and auxiliary
//! generalized speeds with their mass blocks) and `ConstraintRow`s (bilateral
//! constraint Jacobians with violation and rheonomic terms). Registration is
//! handle-based: items get an opaque handle on insertion and are referenced
//! through it afterwards, so no component ever holds a raw pointer into the
//! solver. A warm-started projected Gauss-Seidel solver resolves the coupled
//! mixed velocity/impulse problem; the production sparse solver is expected
//! to satisfy the same contract.

pub mod descriptor;
pub mod integrate;
pub mod sor;

pub use descriptor::{ConstraintRow, RowHandle, SystemDescriptor, VarHandle, VariableBlock};
pub use integrate::StateSlots;
pub use sor::{solve, SolveInfo, SolverSettings};
