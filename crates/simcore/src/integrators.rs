use std::cell::RefCell;

use log::{debug, trace};
use ode_solvers::dop_shared::OutputType;
use ode_solvers::{Dopri5, SVector, System};
use serde::{Deserialize, Serialize};

use crate::error::{require_finite, require_positive, SimError, SimResult};

/// A first-order ODE `dy/dt = f(t, y)` over a fixed-size state.
pub trait OdeSystem<const N: usize> {
    /// Evaluates the state derivative at `(t, y)`.
    fn derivative(&self, t: f64, y: &[f64; N]) -> SimResult<[f64; N]>;
}

/// Sampled solution of an initial value problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<const N: usize> {
    pub times: Vec<f64>,
    pub states: Vec<[f64; N]>,
}

impl<const N: usize> Trajectory<N> {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The `k`-th state component across all samples.
    pub fn component(&self, k: usize) -> Vec<f64> {
        self.states.iter().map(|y| y[k]).collect()
    }

    pub fn last(&self) -> Option<(f64, &[f64; N])> {
        self.times.last().copied().zip(self.states.last())
    }
}

/// An integration strategy that reports the state at requested sample times.
///
/// Implementations are free to choose their own internal steps; only the
/// requested output times are contractual.
pub trait OdeSolver {
    /// Integrates `system` from `(t0, y0)` and samples it at every time in `t_eval`.
    ///
    /// `t_eval` must be finite, non-decreasing and not earlier than `t0`.
    /// A sample at exactly `t0` returns `y0` unchanged.
    fn solve<const N: usize, S: OdeSystem<N>>(
        &self,
        system: &S,
        t0: f64,
        y0: [f64; N],
        t_eval: &[f64],
    ) -> SimResult<Trajectory<N>>;
}

fn check_request<const N: usize>(t0: f64, y0: &[f64; N], t_eval: &[f64]) -> SimResult<()> {
    require_finite("t0", t0)?;
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(SimError::invalid("y0", format!("initial state must be finite, got {y0:?}")));
    }
    let mut prev = t0;
    for &t in t_eval {
        require_finite("t_eval", t)?;
        if t < prev {
            return Err(SimError::invalid(
                "t_eval",
                format!("sample times must be non-decreasing and >= t0 ({t} < {prev})"),
            ));
        }
        prev = t;
    }
    Ok(())
}

/// Walks the sample grid, advancing the state across each gap with `advance`.
fn sample_at<const N: usize, F>(
    t0: f64,
    y0: [f64; N],
    t_eval: &[f64],
    mut advance: F,
) -> SimResult<Trajectory<N>>
where
    F: FnMut(f64, [f64; N], f64) -> SimResult<[f64; N]>,
{
    check_request(t0, &y0, t_eval)?;

    let mut t = t0;
    let mut y = y0;
    let mut states = Vec::with_capacity(t_eval.len());
    for &t_next in t_eval {
        if t_next > t {
            y = advance(t, y, t_next)?;
            if y.iter().any(|v| !v.is_finite()) {
                return Err(SimError::NonFinite {
                    stage: "state integration",
                    t: t_next,
                });
            }
            t = t_next;
        }
        states.push(y);
    }

    Ok(Trajectory {
        times: t_eval.to_vec(),
        states,
    })
}

// ============================================================================
// Adaptive Dormand-Prince 5(4)
// ============================================================================

// Step-size control, matching the `ode_solvers` defaults.
const SAFETY_FACTOR: f64 = 0.9;
const BETA: f64 = 0.04;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;
/// Step budget per sample gap
const MAX_STEPS: u32 = 100_000;
const STIFFNESS_CHECK_STEPS: u32 = 1000;

/// Adaptive-step Dormand-Prince 5(4) solver backed by `ode_solvers::Dopri5`.
///
/// The stepper is restarted between consecutive sample times, so every
/// reported state lands exactly on a requested time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dopri5Solver {
    /// Relative local error tolerance
    pub rtol: f64,
    /// Absolute local error tolerance
    pub atol: f64,
}

impl Default for Dopri5Solver {
    fn default() -> Self {
        Dopri5Solver {
            rtol: 1e-6,
            atol: 1e-9,
        }
    }
}

impl Dopri5Solver {
    pub fn with_tolerances(rtol: f64, atol: f64) -> Self {
        Dopri5Solver { rtol, atol }
    }
}

/// Bridges an `OdeSystem` into `ode_solvers`, parking the first derivative
/// failure so the stepper can be stopped and the error surfaced afterwards.
struct DerivativeBridge<'a, S, const N: usize> {
    system: &'a S,
    failure: &'a RefCell<Option<SimError>>,
}

impl<S: OdeSystem<N>, const N: usize> System<f64, SVector<f64, N>> for DerivativeBridge<'_, S, N> {
    fn system(&self, t: f64, y: &SVector<f64, N>, dy: &mut SVector<f64, N>) {
        if self.failure.borrow().is_some() {
            dy.fill(0.0);
            return;
        }
        let mut state = [0.0; N];
        state.copy_from_slice(y.as_slice());
        match self.system.derivative(t, &state) {
            Ok(derivative) => dy.copy_from_slice(&derivative),
            Err(err) => {
                dy.fill(0.0);
                *self.failure.borrow_mut() = Some(err);
            }
        }
    }

    fn solout(&mut self, _t: f64, _y: &SVector<f64, N>, _dy: &SVector<f64, N>) -> bool {
        self.failure.borrow().is_some()
    }
}

impl OdeSolver for Dopri5Solver {
    fn solve<const N: usize, S: OdeSystem<N>>(
        &self,
        system: &S,
        t0: f64,
        y0: [f64; N],
        t_eval: &[f64],
    ) -> SimResult<Trajectory<N>> {
        require_positive("rtol", self.rtol)?;
        require_positive("atol", self.atol)?;

        let mut evaluations = 0u64;
        let mut accepted = 0u64;
        let mut rejected = 0u64;

        let trajectory = sample_at(t0, y0, t_eval, |t_start, y_start, t_end| {
            let failure = RefCell::new(None);
            let bridge = DerivativeBridge {
                system,
                failure: &failure,
            };
            // Sparse output records accepted steps only, so the last entry is
            // the state at `t_end` rather than an interpolated dense point.
            let mut stepper = Dopri5::from_param(
                bridge,
                t_start,
                t_end,
                0.0,
                SVector::<f64, N>::from_column_slice(&y_start),
                self.rtol,
                self.atol,
                SAFETY_FACTOR,
                BETA,
                FAC_MIN,
                FAC_MAX,
                t_end - t_start,
                0.0,
                MAX_STEPS,
                STIFFNESS_CHECK_STEPS,
                OutputType::Sparse,
            );
            let outcome = stepper.integrate();

            if let Some(err) = failure.borrow_mut().take() {
                return Err(err);
            }
            let stats = outcome.map_err(|e| SimError::Integration {
                stage: "adaptive integration",
                reason: format!("{e:?} between t = {t_start} s and t = {t_end} s"),
            })?;
            evaluations += stats.num_eval as u64;
            accepted += stats.accepted_steps as u64;
            rejected += stats.rejected_steps as u64;

            let y_end = stepper.y_out().last().ok_or_else(|| SimError::Integration {
                stage: "adaptive integration",
                reason: format!("no output produced for t = {t_end} s"),
            })?;
            let mut out = [0.0; N];
            out.copy_from_slice(y_end.as_slice());
            trace!("dopri5 segment [{t_start:.6}, {t_end:.6}] -> {out:?}");
            Ok(out)
        })?;

        debug!(
            "dopri5: {} samples, {} accepted / {} rejected steps, {} derivative evaluations",
            trajectory.len(),
            accepted,
            rejected,
            evaluations
        );
        Ok(trajectory)
    }
}

// ============================================================================
// Fixed-step Runge-Kutta 4
// ============================================================================

/// Classical fourth-order Runge-Kutta with a bounded sub-step.
///
/// Each gap between sample times is split into equal sub-steps no longer than `max_step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RungeKutta4 {
    pub max_step: f64,
}

impl Default for RungeKutta4 {
    fn default() -> Self {
        RungeKutta4 { max_step: 1e-4 }
    }
}

fn offset<const N: usize>(y: &[f64; N], k: &[f64; N], h: f64) -> [f64; N] {
    let mut out = *y;
    for (o, k) in out.iter_mut().zip(k) {
        *o += h * k;
    }
    out
}

impl RungeKutta4 {
    fn step<const N: usize, S: OdeSystem<N>>(
        system: &S,
        t: f64,
        y: &[f64; N],
        h: f64,
    ) -> SimResult<[f64; N]> {
        let k1 = system.derivative(t, y)?;
        let k2 = system.derivative(t + 0.5 * h, &offset(y, &k1, 0.5 * h))?;
        let k3 = system.derivative(t + 0.5 * h, &offset(y, &k2, 0.5 * h))?;
        let k4 = system.derivative(t + h, &offset(y, &k3, h))?;

        let mut out = *y;
        for i in 0..N {
            out[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        Ok(out)
    }
}

impl OdeSolver for RungeKutta4 {
    fn solve<const N: usize, S: OdeSystem<N>>(
        &self,
        system: &S,
        t0: f64,
        y0: [f64; N],
        t_eval: &[f64],
    ) -> SimResult<Trajectory<N>> {
        require_positive("max_step", self.max_step)?;

        sample_at(t0, y0, t_eval, |t_start, y_start, t_end| {
            let span = t_end - t_start;
            let n = (span / self.max_step).ceil().max(1.0) as usize;
            let h = span / n as f64;
            let mut y = y_start;
            for i in 0..n {
                y = Self::step(system, t_start + h * i as f64, &y, h)?;
            }
            Ok(y)
        })
    }
}
