use std::f64::consts::PI;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use simcore::{arange, require_finite, require_positive, SimError, SimResult};

/// Mean of the synthetic regen profile (W); it swings between 0 and twice this.
const REGEN_MEAN_W: f64 = 75.0;
/// Period of the synthetic braking cycle (s).
const REGEN_PERIOD_S: f64 = 600.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Battery and load configuration for an energy-balance run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryParameters {
    /// Usable capacity (kWh), typically 7 to 9
    pub capacity_kwh: f64,
    /// State of charge at t = 0 (%)
    pub initial_soc_percent: f64,
    /// Simulated duration (s)
    pub total_time_s: f64,
    /// Step size (s)
    pub step_s: f64,
    /// Constant solar panel input (W)
    pub solar_power_w: f64,
    /// Constant bike consumption (W)
    pub consumption_power_w: f64,
}

impl Default for BatteryParameters {
    fn default() -> Self {
        BatteryParameters {
            capacity_kwh: 8.0,
            initial_soc_percent: 100.0,
            total_time_s: 3600.0,
            step_s: 1.0,
            solar_power_w: 50.0,
            consumption_power_w: 500.0,
        }
    }
}

impl BatteryParameters {
    pub fn with_capacity(mut self, capacity_kwh: f64, initial_soc_percent: f64) -> Self {
        self.capacity_kwh = capacity_kwh;
        self.initial_soc_percent = initial_soc_percent;
        self
    }

    pub fn with_timing(mut self, total_time_s: f64, step_s: f64) -> Self {
        self.total_time_s = total_time_s;
        self.step_s = step_s;
        self
    }

    pub fn with_solar(mut self, solar_power_w: f64) -> Self {
        self.solar_power_w = solar_power_w;
        self
    }

    pub fn with_consumption(mut self, consumption_power_w: f64) -> Self {
        self.consumption_power_w = consumption_power_w;
        self
    }

    pub fn capacity_wh(&self) -> f64 {
        self.capacity_kwh * 1000.0
    }

    /// `floor(total_time_s / step_s)`.
    pub fn step_count(&self) -> usize {
        (self.total_time_s / self.step_s).floor() as usize
    }

    /// Checks the configuration and returns the number of steps it describes.
    pub fn validate(&self) -> SimResult<usize> {
        require_positive("capacity_kwh", self.capacity_kwh)?;
        require_finite("initial_soc_percent", self.initial_soc_percent)?;
        if !(0.0..=100.0).contains(&self.initial_soc_percent) {
            return Err(SimError::invalid(
                "initial_soc_percent",
                format!("must be within [0, 100], got {}", self.initial_soc_percent),
            ));
        }
        require_positive("step_s", self.step_s)?;
        require_finite("total_time_s", self.total_time_s)?;
        require_finite("solar_power_w", self.solar_power_w)?;
        require_finite("consumption_power_w", self.consumption_power_w)?;

        let steps = self.step_count();
        if steps == 0 {
            return Err(SimError::invalid(
                "total_time_s",
                format!(
                    "must cover at least one step of {} s, got {}",
                    self.step_s, self.total_time_s
                ),
            ));
        }
        Ok(steps)
    }
}

/// Braking power sampled at `t_i = i * step_s` over `[0, total_time_s)`:
/// a 10-minute sinusoid between 0 and 150 W.
///
/// Sampling the end-inclusive grid `linspace(0, total, steps)` instead would
/// stretch profile time by `steps / (steps - 1)` and shift totals accordingly.
pub fn synthesize_regen_profile(total_time_s: f64, step_s: f64) -> Vec<f64> {
    let steps = (total_time_s / step_s).floor() as usize;
    arange(steps, step_s)
        .into_iter()
        .map(|t| REGEN_MEAN_W * (1.0 + (2.0 * PI * t / REGEN_PERIOD_S).sin()))
        .collect()
}

/// Per-step outputs of an energy-balance run.
#[derive(Debug, Clone, PartialEq)]
pub struct SocTrajectory {
    /// Elapsed time at the start of each step (min)
    pub time_min: Vec<f64>,
    /// State of charge after each step (kWh)
    pub soc_kwh: Vec<f64>,
    pub regen_w: Vec<f64>,
    pub solar_w: Vec<f64>,
    pub consumption_w: Vec<f64>,
    /// `regen + solar - consumption`, independent of the SOC clamp
    pub net_w: Vec<f64>,
}

impl SocTrajectory {
    pub fn len(&self) -> usize {
        self.soc_kwh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.soc_kwh.is_empty()
    }

    pub fn final_soc_kwh(&self) -> Option<f64> {
        self.soc_kwh.last().copied()
    }
}

/// Runs the explicit energy balance one step at a time.
///
/// When `regen_profile` is `None` the sinusoidal braking profile from
/// [`synthesize_regen_profile`] is used; a supplied profile must hold exactly
/// one finite value per step. SOC is hard-clamped to `[0, capacity]` after
/// every step and whatever falls outside is dropped.
pub fn simulate_battery(
    params: &BatteryParameters,
    regen_profile: Option<&[f64]>,
) -> SimResult<SocTrajectory> {
    let steps = params.validate()?;

    let regen_w = match regen_profile {
        Some(profile) => {
            if profile.len() != steps {
                return Err(SimError::invalid(
                    "regen_profile",
                    format!("expected {steps} samples, got {}", profile.len()),
                ));
            }
            if let Some(bad) = profile.iter().position(|p| !p.is_finite()) {
                return Err(SimError::invalid(
                    "regen_profile",
                    format!("sample {bad} is not finite"),
                ));
            }
            profile.to_vec()
        }
        None => synthesize_regen_profile(params.total_time_s, params.step_s),
    };
    let solar_w = vec![params.solar_power_w; steps];
    let consumption_w = vec![params.consumption_power_w; steps];

    debug!(
        "battery run: {} kWh from {}% over {} steps of {} s",
        params.capacity_kwh, params.initial_soc_percent, steps, params.step_s
    );

    let capacity_wh = params.capacity_wh();
    let mut soc_wh = (params.initial_soc_percent / 100.0) * capacity_wh;
    let hours_per_step = params.step_s / SECONDS_PER_HOUR;

    let mut soc_kwh = Vec::with_capacity(steps);
    let mut net_w = Vec::with_capacity(steps);
    let mut hit_full = false;
    let mut hit_empty = false;

    for i in 0..steps {
        let (regen, solar, consumption) = (regen_w[i], solar_w[i], consumption_w[i]);

        let energy_in_wh = (regen + solar) * hours_per_step;
        let energy_out_wh = consumption * hours_per_step;
        soc_wh += energy_in_wh - energy_out_wh;

        if soc_wh > capacity_wh && !hit_full {
            hit_full = true;
            warn!("battery full at step {i}; surplus energy is discarded");
        } else if soc_wh < 0.0 && !hit_empty {
            hit_empty = true;
            warn!("battery empty at step {i}; unmet demand is discarded");
        }
        soc_wh = soc_wh.clamp(0.0, capacity_wh);

        // Wh -> kWh may round one ulp above a full battery.
        soc_kwh.push((soc_wh / 1000.0).min(params.capacity_kwh));
        net_w.push(regen + solar - consumption);
    }

    let time_min = arange(steps, params.step_s)
        .into_iter()
        .map(|t| t / 60.0)
        .collect();

    info!(
        "battery run finished: {:.3} kWh after {} s",
        soc_wh / 1000.0,
        params.total_time_s
    );

    Ok(SocTrajectory {
        time_min,
        soc_kwh,
        regen_w,
        solar_w,
        consumption_w,
        net_w,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_defaults_describe_one_hour_at_one_second() {
        let params = BatteryParameters::default();
        assert_eq!(params.validate().unwrap(), 3600);
        assert_eq!(params.capacity_wh(), 8000.0);
    }

    #[test]
    fn test_regen_profile_range_and_period() {
        let profile = synthesize_regen_profile(1200.0, 1.0);
        assert_eq!(profile.len(), 1200);
        assert_eq!(profile[0], 75.0);
        assert_abs_diff_eq!(profile[150], 150.0, epsilon = 1e-9);
        assert_abs_diff_eq!(profile[450], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(profile[600], profile[0], epsilon = 1e-9);
        assert!(profile.iter().all(|&p| (0.0..=150.0).contains(&p)));
    }

    #[test]
    fn test_regen_profile_excludes_end_time() {
        let profile = synthesize_regen_profile(600.0, 2.0);
        assert_eq!(profile.len(), 300);
        assert_eq!(profile[0], REGEN_MEAN_W);
        // Last sample sits one step before the horizon, not on it.
        let t_last = 598.0;
        assert_abs_diff_eq!(
            profile[299],
            REGEN_MEAN_W * (1.0 + (2.0 * PI * t_last / REGEN_PERIOD_S).sin()),
            epsilon = 1e-12
        );
        assert!((profile[299] - REGEN_MEAN_W).abs() > 1e-3);
    }

    #[test]
    fn test_supplied_profile_length_must_match() {
        let params = BatteryParameters::default().with_timing(10.0, 1.0);
        let err = simulate_battery(&params, Some(&[0.0; 9][..])).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { name: "regen_profile", .. }));

        let mut profile = [0.0; 10];
        profile[3] = f64::NAN;
        assert!(simulate_battery(&params, Some(&profile[..])).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_configurations() {
        let base = BatteryParameters::default();
        assert!(base.with_capacity(0.0, 50.0).validate().is_err());
        assert!(base.with_capacity(8.0, 101.0).validate().is_err());
        assert!(base.with_capacity(8.0, -1.0).validate().is_err());
        assert!(base.with_timing(3600.0, 0.0).validate().is_err());
        assert!(matches!(
            base.with_timing(0.5, 1.0).validate(),
            Err(SimError::InvalidParameter { name: "total_time_s", .. })
        ));
        assert!(base.with_solar(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_step_count_truncates() {
        let params = BatteryParameters::default().with_timing(10.5, 2.0);
        assert_eq!(params.validate().unwrap(), 5);
        let run = simulate_battery(&params, None).unwrap();
        assert_eq!(run.len(), 5);
        assert_eq!(run.time_min, vec![0.0, 2.0 / 60.0, 4.0 / 60.0, 6.0 / 60.0, 8.0 / 60.0]);
    }

    #[test]
    fn test_charging_clamps_at_capacity() {
        let params = BatteryParameters::default()
            .with_capacity(1.0, 99.0)
            .with_solar(2000.0)
            .with_consumption(0.0)
            .with_timing(600.0, 1.0);
        let run = simulate_battery(&params, Some(&[0.0; 600][..])).unwrap();

        assert_eq!(run.final_soc_kwh(), Some(1.0));
        // Net power keeps reporting the surplus even though SOC cannot absorb it.
        assert!(run.net_w.iter().all(|&p| p == 2000.0));
    }

    #[test]
    fn test_net_power_ignores_clamp_when_empty() {
        let params = BatteryParameters::default()
            .with_capacity(0.1, 0.0)
            .with_solar(0.0)
            .with_consumption(300.0)
            .with_timing(60.0, 1.0);
        let run = simulate_battery(&params, Some(&[100.0; 60][..])).unwrap();
        assert!(run.soc_kwh.iter().all(|&s| s == 0.0));
        assert!(run.net_w.iter().all(|&p| p == -200.0));
    }

    #[test]
    fn test_consumption_profile_is_constant() {
        let run = simulate_battery(&BatteryParameters::default().with_timing(30.0, 1.0), None).unwrap();
        assert_eq!(run.consumption_w, vec![500.0; 30]);
        assert_eq!(run.solar_w, vec![50.0; 30]);
    }
}
