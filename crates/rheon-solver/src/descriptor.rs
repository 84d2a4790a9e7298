//! Variable blocks, constraint rows and their handle-based registry.

use rheon_math::{DMat, DVec, Vec6};

/// Opaque handle to a registered [`VariableBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarHandle(pub(crate) usize);

/// Opaque handle to a registered [`ConstraintRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle(pub(crate) usize);

/// A block of generalized speeds with its own mass matrix.
///
/// Bodies register a 6-DOF block; a speed-mode motor's auxiliary drift
/// variable registers a 1-DOF block with unit mass. `fb` is the assembled
/// right-hand side (typically `M v_old + h F`), `qb` the solved speeds.
#[derive(Debug, Clone)]
pub struct VariableBlock {
    pub ndof: usize,
    pub mass: DMat,
    pub inv_mass: DMat,
    /// Assembled force/impulse right-hand side.
    pub fb: DVec,
    /// Solved generalized speeds.
    pub qb: DVec,
    /// Offset in the global speed vector, assigned by `count_offsets`.
    pub offset: usize,
    pub active: bool,
}

impl VariableBlock {
    /// A block with the given mass matrix. Singular masses (fixed bodies)
    /// should pass a zero `inv_mass` via [`VariableBlock::with_inv_mass`].
    pub fn new(mass: DMat) -> Self {
        let ndof = mass.nrows();
        let inv_mass = mass
            .clone()
            .try_inverse()
            .unwrap_or_else(|| DMat::zeros(ndof, ndof));
        Self::with_inv_mass(mass, inv_mass)
    }

    pub fn with_inv_mass(mass: DMat, inv_mass: DMat) -> Self {
        let ndof = mass.nrows();
        Self {
            ndof,
            mass,
            inv_mass,
            fb: DVec::zeros(ndof),
            qb: DVec::zeros(ndof),
            offset: 0,
            active: true,
        }
    }

    /// A 1-DOF block of unit mass (auxiliary motor variable).
    pub fn unit() -> Self {
        Self::new(DMat::identity(1, 1))
    }

    /// Zero-inverse-mass 6-DOF block (fixed body).
    pub fn fixed6() -> Self {
        Self::with_inv_mass(DMat::zeros(6, 6), DMat::zeros(6, 6))
    }
}

/// One bilateral constraint row between two variable blocks. The Jacobian
/// slots carry up to 6 entries; blocks with fewer DOF use the leading ones.
///
/// The row demands `cq_a · qb_a + cq_b · qb_b + b = 0` where `b` is
/// assembled from the rheonomic term `ct` and the position stabilization
/// `c / h`. `multiplier` is the resolved impulse, kept across steps as the
/// warm-starting initial guess.
#[derive(Debug, Clone)]
pub struct ConstraintRow {
    pub var_a: VarHandle,
    pub var_b: VarHandle,
    pub cq_a: Vec6,
    pub cq_b: Vec6,
    /// Constraint violation C at the current configuration.
    pub c: f64,
    /// Partial time derivative ∂C/∂t of the (rheonomic) constraint.
    pub ct: f64,
    /// Assembled right-hand side.
    pub b: f64,
    /// Resolved Lagrange multiplier (impulse). Warm start for the next solve.
    pub multiplier: f64,
    pub active: bool,
}

impl ConstraintRow {
    pub fn new(var_a: VarHandle, var_b: VarHandle) -> Self {
        Self {
            var_a,
            var_b,
            cq_a: Vec6::zeros(),
            cq_b: Vec6::zeros(),
            c: 0.0,
            ct: 0.0,
            b: 0.0,
            multiplier: 0.0,
            active: true,
        }
    }
}

/// Registry of variables and constraint rows solved together each step.
#[derive(Debug, Clone, Default)]
pub struct SystemDescriptor {
    variables: Vec<VariableBlock>,
    rows: Vec<ConstraintRow>,
}

impl SystemDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable block, returning its handle.
    pub fn insert_variables(&mut self, block: VariableBlock) -> VarHandle {
        self.variables.push(block);
        VarHandle(self.variables.len() - 1)
    }

    /// Register a constraint row, returning its handle.
    pub fn insert_constraint(&mut self, row: ConstraintRow) -> RowHandle {
        self.rows.push(row);
        RowHandle(self.rows.len() - 1)
    }

    /// Deactivate a variable block. Its handle stays valid but the block no
    /// longer participates in offsets or solves.
    pub fn remove_variables(&mut self, handle: VarHandle) {
        self.variables[handle.0].active = false;
    }

    /// Deactivate a constraint row.
    pub fn remove_constraint(&mut self, handle: RowHandle) {
        self.rows[handle.0].active = false;
    }

    pub fn variable(&self, handle: VarHandle) -> &VariableBlock {
        &self.variables[handle.0]
    }

    pub fn variable_mut(&mut self, handle: VarHandle) -> &mut VariableBlock {
        &mut self.variables[handle.0]
    }

    pub fn row(&self, handle: RowHandle) -> &ConstraintRow {
        &self.rows[handle.0]
    }

    pub fn row_mut(&mut self, handle: RowHandle) -> &mut ConstraintRow {
        &mut self.rows[handle.0]
    }

    /// Number of active constraint rows.
    pub fn n_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.active).count()
    }

    /// Number of active generalized-speed DOF across all variable blocks.
    pub fn n_dofs(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.active)
            .map(|v| v.ndof)
            .sum()
    }

    /// Assemble the right-hand side of every active row from its rheonomic
    /// term and Baumgarte-style position feedback: `b = ct + c / h`.
    pub fn assemble_rhs(&mut self, inv_h: f64) {
        for row in &mut self.rows {
            if row.active {
                row.b = row.ct + row.c * inv_h;
            }
        }
    }

    /// Assign contiguous offsets to active variable blocks; returns total DOF.
    pub fn count_offsets(&mut self) -> usize {
        let mut off = 0;
        for v in &mut self.variables {
            if v.active {
                v.offset = off;
                off += v.ndof;
            }
        }
        off
    }

    pub(crate) fn variables(&self) -> &[VariableBlock] {
        &self.variables
    }

    pub(crate) fn variables_mut(&mut self) -> &mut [VariableBlock] {
        &mut self.variables
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [ConstraintRow] {
        &mut self.rows
    }

    pub(crate) fn split_mut(&mut self) -> (&mut [VariableBlock], &mut [ConstraintRow]) {
        (&mut self.variables, &mut self.rows)
    }
}
