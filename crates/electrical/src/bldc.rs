//! BLDC generator model for regenerative braking.
//!
//! Couples rotor mechanics (inertia, braking load) with three-phase winding
//! dynamics (resistance, inductance, back-EMF) and integrates them through an
//! injected [`OdeSolver`].

use std::f64::consts::PI;

use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use simcore::{linspace, require_finite, require_positive, OdeSolver, OdeSystem, SimError, SimResult};

/// Electrical offsets of phases A, B and C.
const PHASE_OFFSETS: [f64; 3] = [0.0, -2.0 * PI / 3.0, 2.0 * PI / 3.0];

/// `linspace(0, 1, 3)`
const LINEARLY_SPACED_MULTIPLIERS: Vector3<f64> = Vector3::new(0.0, 0.5, 1.0);
const SYMMETRIC_MULTIPLIERS: Vector3<f64> = Vector3::new(1.0, 1.0, 1.0);

/// How the per-phase electrical angle is derived from rotor speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhaseAngleModel {
    /// `speed * m_k * pole_count` with `m = linspace(0, 1, 3)`.
    ///
    /// Gives each phase a different angle (phase A is pinned at zero). Kept as
    /// the default for compatibility with existing results.
    #[default]
    LinearlySpaced,
    /// One shared angle `speed * pole_count` for all three phases.
    Symmetric,
}

impl PhaseAngleModel {
    /// Per-phase multipliers applied to the rotor speed.
    pub fn multipliers(self) -> Vector3<f64> {
        match self {
            PhaseAngleModel::LinearlySpaced => LINEARLY_SPACED_MULTIPLIERS,
            PhaseAngleModel::Symmetric => SYMMETRIC_MULTIPLIERS,
        }
    }
}

/// Fixed electromechanical constants of the hub motor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorParameters {
    /// Rotor inertia (kg*m^2)
    pub rotor_inertia: f64,
    pub pole_count: u32,
    /// Phase resistance (Ohm)
    pub resistance: f64,
    /// Phase inductance (H)
    pub inductance: f64,
    /// Back-EMF constant (V per rad/s)
    pub emf_constant: f64,
    /// Braking load torque (N*m)
    pub load_torque: f64,
    #[serde(default)]
    pub phase_angle_model: PhaseAngleModel,
}

impl MotorParameters {
    /// Front-wheel hub motor: 6 pole pairs, small windings.
    pub fn m1_front() -> Self {
        MotorParameters {
            rotor_inertia: 0.004,
            pole_count: 12,
            resistance: 0.08,
            inductance: 0.0003,
            emf_constant: 0.12,
            load_torque: 0.03,
            phase_angle_model: PhaseAngleModel::default(),
        }
    }

    pub fn with_phase_angle_model(mut self, model: PhaseAngleModel) -> Self {
        self.phase_angle_model = model;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        require_positive("rotor_inertia", self.rotor_inertia)?;
        if self.pole_count == 0 {
            return Err(SimError::invalid("pole_count", "must be a positive integer, got 0"));
        }
        require_positive("resistance", self.resistance)?;
        require_positive("inductance", self.inductance)?;
        require_positive("emf_constant", self.emf_constant)?;
        require_positive("load_torque", self.load_torque)?;
        Ok(())
    }

    /// Three-phase back-EMF (V) at the given rotor speed (rad/s).
    pub fn back_emf(&self, speed: f64) -> Vector3<f64> {
        let poles = self.pole_count as f64;
        let theta = self.phase_angle_model.multipliers().map(|m| speed * m * poles);
        let offsets = Vector3::from(PHASE_OFFSETS);
        theta.zip_map(&offsets, |angle, offset| self.emf_constant * (angle + offset).sin())
    }
}

impl Default for MotorParameters {
    fn default() -> Self {
        MotorParameters::m1_front()
    }
}

/// Rotor speed and phase currents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorState {
    /// Rotor speed (rad/s)
    pub speed: f64,
    /// Phase currents A, B, C (A)
    pub currents: Vector3<f64>,
}

impl MotorState {
    pub fn new(speed: f64, ia: f64, ib: f64, ic: f64) -> Self {
        MotorState {
            speed,
            currents: Vector3::new(ia, ib, ic),
        }
    }

    /// Spinning rotor with de-energised windings.
    pub fn at_speed(speed: f64) -> Self {
        MotorState::new(speed, 0.0, 0.0, 0.0)
    }

    /// Solver ordering `[speed, ia, ib, ic]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.speed, self.currents.x, self.currents.y, self.currents.z]
    }

    pub fn from_array(y: &[f64; 4]) -> Self {
        MotorState::new(y[0], y[1], y[2], y[3])
    }

    fn is_finite(&self) -> bool {
        self.speed.is_finite() && self.currents.iter().all(|i| i.is_finite())
    }
}

/// Torque produced by the windings: phase currents dotted with phase EMFs.
pub fn electromagnetic_torque(currents: &Vector3<f64>, emf: &Vector3<f64>) -> f64 {
    currents.dot(emf)
}

/// Averages the three phase currents after clamping each to be non-negative.
pub fn rectify_sample(currents: &Vector3<f64>) -> f64 {
    currents.map(|i| i.max(0.0)).sum() / 3.0
}

/// Simplified full-bridge output: per sample, clamp each phase at zero and average.
///
/// The output is as long as the shortest input.
pub fn rectify_dc(ia: &[f64], ib: &[f64], ic: &[f64]) -> Vec<f64> {
    ia.iter()
        .zip(ib)
        .zip(ic)
        .map(|((&a, &b), &c)| rectify_sample(&Vector3::new(a, b, c)))
        .collect()
}

/// The generator as an ODE system over `[speed, ia, ib, ic]`.
#[derive(Debug, Clone, Copy)]
pub struct BldcGenerator {
    params: MotorParameters,
}

impl BldcGenerator {
    pub fn new(params: MotorParameters) -> SimResult<Self> {
        params.validate()?;
        Ok(BldcGenerator { params })
    }

    pub fn params(&self) -> &MotorParameters {
        &self.params
    }

    /// Instantaneous time derivative of the motor state.
    pub fn derivative(&self, t: f64, state: &MotorState) -> SimResult<MotorState> {
        let p = &self.params;
        let emf = p.back_emf(state.speed);
        let torque = electromagnetic_torque(&state.currents, &emf);

        let d_state = MotorState {
            speed: (torque - p.load_torque) / p.rotor_inertia,
            currents: (emf - state.currents * p.resistance) / p.inductance,
        };
        if !d_state.is_finite() {
            return Err(SimError::NonFinite {
                stage: "derivative evaluation",
                t,
            });
        }
        Ok(d_state)
    }
}

impl OdeSystem<4> for BldcGenerator {
    fn derivative(&self, t: f64, y: &[f64; 4]) -> SimResult<[f64; 4]> {
        BldcGenerator::derivative(self, t, &MotorState::from_array(y)).map(|d| d.to_array())
    }
}

/// A regenerative-braking run: the motor, where it starts, and how it is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenScenario {
    pub motor: MotorParameters,
    /// Rotor speed when braking starts (rad/s)
    pub initial_speed: f64,
    /// End of the simulated interval (s), which always starts at 0
    pub t_end: f64,
    /// Number of evenly spaced output samples, both ends included
    pub samples: usize,
}

impl Default for RegenScenario {
    fn default() -> Self {
        RegenScenario {
            motor: MotorParameters::default(),
            initial_speed: 83.77,
            t_end: 1.5,
            samples: 1000,
        }
    }
}

impl RegenScenario {
    pub fn with_motor(mut self, motor: MotorParameters) -> Self {
        self.motor = motor;
        self
    }

    pub fn with_initial_speed(mut self, initial_speed: f64) -> Self {
        self.initial_speed = initial_speed;
        self
    }

    pub fn with_horizon(mut self, t_end: f64, samples: usize) -> Self {
        self.t_end = t_end;
        self.samples = samples;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        self.motor.validate()?;
        require_finite("initial_speed", self.initial_speed)?;
        require_positive("t_end", self.t_end)?;
        if self.samples < 2 {
            return Err(SimError::invalid(
                "samples",
                format!("need at least 2 output samples, got {}", self.samples),
            ));
        }
        Ok(())
    }
}

/// Sampled result of a regenerative-braking run.
#[derive(Debug, Clone, PartialEq)]
pub struct RegenRun {
    pub times: Vec<f64>,
    pub states: Vec<MotorState>,
    /// Rectified DC output at each sample
    pub dc_output: Vec<f64>,
}

impl RegenRun {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn speed(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.speed).collect()
    }

    /// Current of phase `k` (0 = A, 1 = B, 2 = C) across the run.
    pub fn phase_current(&self, k: usize) -> Vec<f64> {
        self.states.iter().map(|s| s.currents[k]).collect()
    }
}

/// Integrates the generator from `[initial_speed, 0, 0, 0]` over `[0, t_end]`.
pub fn simulate_regen<S: OdeSolver>(solver: &S, scenario: &RegenScenario) -> SimResult<RegenRun> {
    scenario.validate()?;
    let generator = BldcGenerator::new(scenario.motor)?;
    debug!(
        "regen run: {} poles, initial speed {} rad/s, {} samples over {} s, {:?} phase angles",
        scenario.motor.pole_count,
        scenario.initial_speed,
        scenario.samples,
        scenario.t_end,
        scenario.motor.phase_angle_model
    );

    let t_eval = linspace(0.0, scenario.t_end, scenario.samples);
    let initial = MotorState::at_speed(scenario.initial_speed);
    let trajectory = solver.solve(&generator, 0.0, initial.to_array(), &t_eval)?;

    let states: Vec<MotorState> = trajectory.states.iter().map(MotorState::from_array).collect();
    let dc_output = states.iter().map(|s| rectify_sample(&s.currents)).collect();

    if let Some(last) = states.last() {
        info!(
            "regen run finished: speed {:.3} -> {:.3} rad/s after {} s",
            scenario.initial_speed, last.speed, scenario.t_end
        );
    }

    Ok(RegenRun {
        times: trajectory.times,
        states,
        dc_output,
    })
}
