//! Aggregate figures derived from finished runs, for the console summaries.

use std::fmt;

use simcore::{SimError, SimResult};

use crate::battery::{BatteryParameters, SocTrajectory};
use crate::bldc::RegenRun;

// ============================================================================
// Battery
// ============================================================================

/// Energy totals and end state of a battery run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatterySummary {
    pub duration_h: f64,
    pub capacity_kwh: f64,
    pub initial_soc_percent: f64,
    pub regen_energy_kwh: f64,
    pub solar_energy_kwh: f64,
    /// Constant consumption over the full duration (kWh)
    pub consumed_energy_kwh: f64,
    pub final_soc_kwh: f64,
    pub final_soc_percent: f64,
}

/// Rectangle-rule energy of a power profile (Wh).
fn profile_energy_wh(power_w: &[f64], step_s: f64) -> f64 {
    power_w.iter().sum::<f64>() * (step_s / 3600.0)
}

impl BatterySummary {
    pub fn from_run(params: &BatteryParameters, run: &SocTrajectory) -> SimResult<Self> {
        let final_soc_kwh = run
            .final_soc_kwh()
            .ok_or_else(|| SimError::invalid("run", "battery trajectory is empty"))?;

        Ok(BatterySummary {
            duration_h: params.total_time_s / 3600.0,
            capacity_kwh: params.capacity_kwh,
            initial_soc_percent: params.initial_soc_percent,
            regen_energy_kwh: profile_energy_wh(&run.regen_w, params.step_s) / 1000.0,
            solar_energy_kwh: profile_energy_wh(&run.solar_w, params.step_s) / 1000.0,
            consumed_energy_kwh: params.consumption_power_w * (params.total_time_s / 3600.0) / 1000.0,
            final_soc_kwh,
            final_soc_percent: final_soc_kwh / params.capacity_kwh * 100.0,
        })
    }
}

impl fmt::Display for BatterySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Time: {:.2} hours", self.duration_h)?;
        writeln!(f, "Battery Capacity: {} kWh", self.capacity_kwh)?;
        writeln!(f, "Initial SOC: {}%", self.initial_soc_percent)?;
        writeln!(
            f,
            "Total regenerative braking energy input: {:.3} kWh",
            self.regen_energy_kwh
        )?;
        writeln!(f, "Total solar energy input: {:.3} kWh", self.solar_energy_kwh)?;
        writeln!(f, "Total energy consumed by bike: {:.3} kWh", self.consumed_energy_kwh)?;
        write!(
            f,
            "Final battery SOC: {:.3} kWh ({:.1}%)",
            self.final_soc_kwh, self.final_soc_percent
        )
    }
}

// ============================================================================
// Regenerative braking
// ============================================================================

/// Headline numbers of a regenerative-braking run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegenSummary {
    pub duration_s: f64,
    pub initial_speed: f64,
    pub final_speed: f64,
    /// Largest |current| seen on phases A, B, C (A)
    pub peak_phase_current: [f64; 3],
    pub peak_dc_output: f64,
    pub mean_dc_output: f64,
}

impl RegenSummary {
    pub fn from_run(run: &RegenRun) -> SimResult<Self> {
        let (first, last) = match (run.states.first(), run.states.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(SimError::invalid("run", "regen trajectory is empty")),
        };
        let t0 = run.times.first().copied().unwrap_or(0.0);
        let t1 = run.times.last().copied().unwrap_or(0.0);

        let mut peak_phase_current = [0.0f64; 3];
        for state in &run.states {
            for (peak, i) in peak_phase_current.iter_mut().zip(state.currents.iter()) {
                *peak = peak.max(i.abs());
            }
        }

        let peak_dc_output = run.dc_output.iter().copied().fold(0.0, f64::max);
        let mean_dc_output = if run.dc_output.is_empty() {
            0.0
        } else {
            run.dc_output.iter().sum::<f64>() / run.dc_output.len() as f64
        };

        Ok(RegenSummary {
            duration_s: t1 - t0,
            initial_speed: first.speed,
            final_speed: last.speed,
            peak_phase_current,
            peak_dc_output,
            mean_dc_output,
        })
    }
}

impl fmt::Display for RegenSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Time: {:.3} s", self.duration_s)?;
        writeln!(
            f,
            "Rotor speed: {:.3} -> {:.3} rad/s",
            self.initial_speed, self.final_speed
        )?;
        let [a, b, c] = self.peak_phase_current;
        writeln!(f, "Peak phase current: A {a:.3} A, B {b:.3} A, C {c:.3} A")?;
        write!(
            f,
            "Rectified DC output: peak {:.4}, mean {:.4}",
            self.peak_dc_output, self.mean_dc_output
        )
    }
}
