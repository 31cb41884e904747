// ==============================================================================
// solve.rs — FORCE -> SLIP INVERSION (NEWTON + CHORD FALLBACK + LOOKUP TABLES)
// ==============================================================================
// Given a desired (Fx, Fy) at a vertical load Fz, find (kappa, alpha) such that
// the steady-state formula reproduces it.
//
// 1) Newton on the load-normalized force error:
//       e(x) = (F_target - F(x)) / max(1, Fz)
//       J dx = e,  J from forward differences (h = 1e-6)
//    with per-iteration step caps and a backtracking line search that only
//    accepts steps reducing |e|. Slip is clamped to kappa in [-1, 1],
//    alpha in [-0.5, 0.5] rad.
// 2) If Newton stalls or runs out of budget: chord iteration using the slip
//    stiffness at the origin (sign-aware for the negative lateral slope):
//       kappa += e_x / C_kappa,  alpha += e_y / C_alpha
// 3) Converged when both force components are within tolerance (1 N default).
//    Otherwise InversionError::NotConverged carries the best iterate seen.
//
// SlipTable precomputes the inversion over a (Fx, Fy) grid spanning +- the
// pure peak force at one load/temperature bucket and interpolates bilinearly
// (linear extrapolation off-grid). SlipTableCache keeps one table per
// (load bucket, temperature bucket).
// ==============================================================================

use std::collections::HashMap;

use nalgebra::{Matrix2, Vector2};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::tire::magic_formula::MagicFormula;
use crate::tire::params::{SlipTableConfig, SolverConfig};
use crate::tire::types::Real;

pub const KAPPA_LIMIT: Real = 1.0;
pub const ALPHA_LIMIT: Real = 0.5; // rad

const FD_STEP: Real = 1e-6;
const MAX_KAPPA_STEP: Real = 0.1;
const MAX_ALPHA_STEP: Real = 0.05;
const BACKTRACK_STEPS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlipSolution {
    pub kappa: Real,
    pub alpha: Real,    // rad
    pub fx_error: Real, // N, target - achieved
    pub fy_error: Real, // N
    pub iterations: usize,
}

impl SlipSolution {
    pub fn max_error(&self) -> Real {
        self.fx_error.abs().max(self.fy_error.abs())
    }
}

#[derive(Debug, Clone, Copy, Error)]
pub enum InversionError {
    #[error(
        "slip inversion did not converge (best kappa={:.4}, alpha={:.4}, error=({:.1}, {:.1}) N)",
        .best.kappa, .best.alpha, .best.fx_error, .best.fy_error
    )]
    NotConverged { best: SlipSolution },
}

// ====================================================================
// Direct inversion
// ====================================================================

struct Problem<'a> {
    model: &'a MagicFormula,
    fz: Real,
    temperature: Real,
    target: Vector2<Real>,
    scale: Real,
}

impl Problem<'_> {
    fn forces(&self, x: &Vector2<Real>) -> Vector2<Real> {
        let f = self.model.steady_state(self.fz, x.x, x.y, 0.0, self.temperature);
        Vector2::new(f.fx, f.fy)
    }

    /// Unscaled error in N.
    fn error(&self, x: &Vector2<Real>) -> Vector2<Real> {
        self.target - self.forces(x)
    }

    /// Jacobian of the normalized forces.
    fn jacobian(&self, x: &Vector2<Real>) -> Matrix2<Real> {
        let f0 = self.forces(x);
        let dk = (self.forces(&Vector2::new(x.x + FD_STEP, x.y)) - f0) / (FD_STEP * self.scale);
        let da = (self.forces(&Vector2::new(x.x, x.y + FD_STEP)) - f0) / (FD_STEP * self.scale);
        Matrix2::from_columns(&[dk, da])
    }

    fn solution(&self, x: &Vector2<Real>, err: &Vector2<Real>, iterations: usize) -> SlipSolution {
        SlipSolution {
            kappa: x.x,
            alpha: x.y,
            fx_error: err.x,
            fy_error: err.y,
            iterations,
        }
    }
}

#[inline]
fn clamp_slip(x: Vector2<Real>) -> Vector2<Real> {
    Vector2::new(
        x.x.clamp(-KAPPA_LIMIT, KAPPA_LIMIT),
        x.y.clamp(-ALPHA_LIMIT, ALPHA_LIMIT),
    )
}

#[inline]
fn converged(err: &Vector2<Real>, tolerance: Real) -> bool {
    err.x.abs() < tolerance && err.y.abs() < tolerance
}

pub fn invert_forces(
    model: &MagicFormula,
    config: &SolverConfig,
    fx: Real,
    fy: Real,
    fz: Real,
    temperature: Real,
) -> Result<SlipSolution, InversionError> {
    let p = Problem {
        model,
        fz,
        temperature,
        target: Vector2::new(fx, fy),
        scale: fz.max(1.0),
    };

    let mut x = Vector2::zeros();
    let mut err = p.error(&x);
    let mut best = p.solution(&x, &err, 0);
    let mut iterations = 0;

    // -------------------------
    // NEWTON
    // -------------------------
    while iterations < config.newton_iterations {
        if converged(&err, config.tolerance) {
            return Ok(p.solution(&x, &err, iterations));
        }
        iterations += 1;

        let Some(inverse) = p.jacobian(&x).try_inverse() else { break };
        let mut step = inverse * (err / p.scale);
        step.x = step.x.clamp(-MAX_KAPPA_STEP, MAX_KAPPA_STEP);
        step.y = step.y.clamp(-MAX_ALPHA_STEP, MAX_ALPHA_STEP);

        let current = err.norm();
        let mut lambda = 1.0;
        let mut accepted = None;
        for _ in 0..BACKTRACK_STEPS {
            let candidate = clamp_slip(x + step * lambda);
            let e = p.error(&candidate);
            if e.norm() < current {
                accepted = Some((candidate, e));
                break;
            }
            lambda *= 0.5;
        }

        let Some((next, e)) = accepted else { break };
        x = next;
        err = e;

        if err.amax() < best.max_error() {
            best = p.solution(&x, &err, iterations);
        }
    }

    if converged(&err, config.tolerance) {
        return Ok(p.solution(&x, &err, iterations));
    }

    // -------------------------
    // CHORD FALLBACK
    // -------------------------
    let origin = p.jacobian(&Vector2::zeros());
    let (c_kappa, c_alpha) = (origin[(0, 0)], origin[(1, 1)]);
    if c_kappa.abs() < 1e-9 || c_alpha.abs() < 1e-9 {
        return Err(InversionError::NotConverged { best });
    }

    x = Vector2::new(best.kappa, best.alpha);
    err = p.error(&x);
    for _ in 0..config.fallback_iterations {
        if converged(&err, config.tolerance) {
            return Ok(p.solution(&x, &err, iterations));
        }
        iterations += 1;

        let e = err / p.scale;
        x = clamp_slip(Vector2::new(x.x + e.x / c_kappa, x.y + e.y / c_alpha));
        err = p.error(&x);

        if err.amax() < best.max_error() {
            best = p.solution(&x, &err, iterations);
        }
    }

    if converged(&err, config.tolerance) {
        return Ok(p.solution(&x, &err, iterations));
    }

    Err(InversionError::NotConverged { best })
}

// ====================================================================
// Lookup table
// ====================================================================

#[derive(Debug, Clone)]
pub struct SlipTable {
    pub fz: Real,
    pub temperature: Real,
    fx_axis: Vec<Real>,
    fy_axis: Vec<Real>,
    // row-major: [i_fx * fy_axis.len() + i_fy]
    kappa: Vec<Real>,
    alpha: Vec<Real>,
    converged: Vec<bool>,
}

fn linspace(lo: Real, hi: Real, n: usize) -> Vec<Real> {
    (0..n)
        .map(|i| lo + (hi - lo) * i as Real / (n - 1) as Real)
        .collect()
}

/// Interval index and fractional position; t outside [0, 1] extrapolates.
fn locate(axis: &[Real], v: Real) -> (usize, Real) {
    let n = axis.len();
    let step = axis[1] - axis[0];
    let i = (((v - axis[0]) / step).floor().max(0.0) as usize).min(n - 2);
    (i, (v - axis[i]) / step)
}

impl SlipTable {
    pub fn generate(
        model: &MagicFormula,
        table: &SlipTableConfig,
        solver: &SolverConfig,
        fz: Real,
        temperature: Real,
    ) -> Self {
        let n = table.grid_points.max(2);
        let fx_peak = model.peak_longitudinal(fz, temperature).max(1.0);
        let fy_peak = model.peak_lateral(fz, temperature).max(1.0);

        let fx_axis = linspace(-fx_peak, fx_peak, n);
        let fy_axis = linspace(-fy_peak, fy_peak, n);

        let mut kappa = Vec::with_capacity(n * n);
        let mut alpha = Vec::with_capacity(n * n);
        let mut converged = Vec::with_capacity(n * n);

        for &fx in &fx_axis {
            for &fy in &fy_axis {
                let (sol, ok) = match invert_forces(model, solver, fx, fy, fz, temperature) {
                    Ok(sol) => (sol, true),
                    Err(InversionError::NotConverged { best }) => (best, false),
                };
                kappa.push(sol.kappa);
                alpha.push(sol.alpha);
                converged.push(ok);
            }
        }

        let out = Self { fz, temperature, fx_axis, fy_axis, kappa, alpha, converged };
        debug!(
            fz,
            temperature,
            cells = n * n,
            unconverged = out.unconverged_cells(),
            "slip table generated"
        );
        out
    }

    pub fn unconverged_cells(&self) -> usize {
        self.converged.iter().filter(|c| !**c).count()
    }

    pub fn fx_range(&self) -> (Real, Real) {
        (self.fx_axis[0], self.fx_axis[self.fx_axis.len() - 1])
    }

    pub fn fy_range(&self) -> (Real, Real) {
        (self.fy_axis[0], self.fy_axis[self.fy_axis.len() - 1])
    }

    /// Interpolated (kappa, alpha). None when an unconverged cell carries weight.
    pub fn lookup(&self, fx: Real, fy: Real) -> Option<(Real, Real)> {
        let n_fy = self.fy_axis.len();
        let (i, tx) = locate(&self.fx_axis, fx);
        let (j, ty) = locate(&self.fy_axis, fy);

        let corners = [
            (i, j, (1.0 - tx) * (1.0 - ty)),
            (i + 1, j, tx * (1.0 - ty)),
            (i, j + 1, (1.0 - tx) * ty),
            (i + 1, j + 1, tx * ty),
        ];

        let mut kappa = 0.0;
        let mut alpha = 0.0;
        for (ci, cj, w) in corners {
            if w.abs() <= 1e-12 {
                continue;
            }
            let k = ci * n_fy + cj;
            if !self.converged[k] {
                return None;
            }
            kappa += w * self.kappa[k];
            alpha += w * self.alpha[k];
        }

        Some((kappa, alpha))
    }
}

#[derive(Debug, Default, Clone)]
pub struct SlipTableCache {
    tables: HashMap<(i64, i64), SlipTable>,
}

fn bucket_key(config: &SlipTableConfig, fz: Real, temperature: Real) -> (i64, i64) {
    let load = (fz / config.load_bucket).round().max(1.0) as i64;
    let temp = (temperature / config.temperature_bucket).round() as i64;
    (load, temp)
}

impl SlipTableCache {
    pub fn table(
        &mut self,
        model: &MagicFormula,
        config: &SlipTableConfig,
        solver: &SolverConfig,
        fz: Real,
        temperature: Real,
    ) -> &SlipTable {
        let key = bucket_key(config, fz, temperature);
        self.tables.entry(key).or_insert_with(|| {
            let bucket_fz = key.0 as Real * config.load_bucket;
            let bucket_temp = key.1 as Real * config.temperature_bucket;
            SlipTable::generate(model, config, solver, bucket_fz, bucket_temp)
        })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
