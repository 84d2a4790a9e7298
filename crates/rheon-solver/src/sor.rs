//! Warm-started successive-over-relaxation solver for the mixed
//! velocity/impulse problem
//!
//! ```text
//! M qb = fb + Cqᵀ λ          (per variable block)
//! Cq qb + b = 0              (per active row)
//! ```
//!
//! Each sweep projects one row at a time onto its feasible set; bilateral
//! rows need no clamping. Multipliers persist in the rows across calls,
//! which is what warm-starts the next step.

use crate::descriptor::SystemDescriptor;
use rheon_math::DVec;

/// Iteration controls for [`solve`].
#[derive(Debug, Clone)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Over-relaxation factor; 1.0 is plain Gauss-Seidel.
    pub omega: f64,
    /// Early-out threshold on the max row violation.
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            omega: 1.0,
            tolerance: 1e-12,
        }
    }
}

/// Convergence report of one solve.
#[derive(Debug, Clone, Copy)]
pub struct SolveInfo {
    /// Sweeps actually performed.
    pub iterations: usize,
    /// Max row violation |Cq qb + b| at the last sweep (0 when no rows).
    pub residual: f64,
}

/// Resolve all variable speeds and row multipliers in `desc`.
///
/// On entry every active variable block must carry its assembled `fb` and
/// mass; on exit `qb` holds the solved speeds and each active row its
/// resolved multiplier.
pub fn solve(desc: &mut SystemDescriptor, settings: &SolverSettings) -> SolveInfo {
    // Unconstrained speeds: qb = M⁻¹ fb.
    for v in desc.variables_mut() {
        if v.active {
            v.qb = &v.inv_mass * &v.fb;
        }
    }

    let (vars, rows) = desc.split_mut();

    // Per-row precomputation: M⁻¹ Cqᵀ and the diagonal of the Schur
    // complement. The row Jacobians carry 6 slots; blocks with fewer DOF
    // use only the leading ones.
    struct RowWork {
        idx: usize,
        cq_a: DVec,
        cq_b: DVec,
        m_inv_cq_a: DVec,
        m_inv_cq_b: DVec,
        g: f64,
    }

    let mut work: Vec<RowWork> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if !row.active {
            continue;
        }
        let va = &vars[row.var_a.0];
        let vb = &vars[row.var_b.0];
        let cq_a = DVec::from_column_slice(&row.cq_a.as_slice()[..va.ndof.min(6)]);
        let cq_b = DVec::from_column_slice(&row.cq_b.as_slice()[..vb.ndof.min(6)]);
        let m_inv_cq_a = &va.inv_mass * &cq_a;
        let m_inv_cq_b = &vb.inv_mass * &cq_b;
        let g = cq_a.dot(&m_inv_cq_a) + cq_b.dot(&m_inv_cq_b);
        if g < 1e-14 {
            // Row between two fixed blocks: nothing to resolve.
            continue;
        }
        work.push(RowWork {
            idx,
            cq_a,
            cq_b,
            m_inv_cq_a,
            m_inv_cq_b,
            g,
        });
    }

    // Warm start: apply the previous multipliers as initial impulses.
    for w in &work {
        let lambda = rows[w.idx].multiplier;
        if lambda != 0.0 {
            let (a, b) = (rows[w.idx].var_a.0, rows[w.idx].var_b.0);
            vars[a].qb += &w.m_inv_cq_a * lambda;
            vars[b].qb += &w.m_inv_cq_b * lambda;
        }
    }

    let mut info = SolveInfo {
        iterations: 0,
        residual: 0.0,
    };

    for iter in 0..settings.max_iterations {
        let mut max_violation: f64 = 0.0;
        for w in &work {
            let row = &rows[w.idx];
            let (a, b) = (row.var_a.0, row.var_b.0);
            let violation = w.cq_a.dot(&vars[a].qb) + w.cq_b.dot(&vars[b].qb) + row.b;
            max_violation = max_violation.max(violation.abs());

            let delta = -settings.omega * violation / w.g;
            rows[w.idx].multiplier += delta;
            vars[a].qb += &w.m_inv_cq_a * delta;
            vars[b].qb += &w.m_inv_cq_b * delta;
        }
        info.iterations = iter + 1;
        info.residual = max_violation;
        if max_violation < settings.tolerance {
            break;
        }
    }

    info
}
