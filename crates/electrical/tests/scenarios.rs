use approx::assert_abs_diff_eq;
use electrical::{
    simulate_battery, simulate_regen, synthesize_regen_profile, BatteryParameters, BatterySummary,
    MotorParameters, MotorState, PhaseAngleModel, RegenScenario, RegenSummary,
};
use proptest::prelude::*;
use simcore::{Dopri5Solver, RungeKutta4};

#[test]
fn drain_reaches_empty_at_ten_hours_and_stays_there() {
    let params = BatteryParameters::default()
        .with_capacity(8.0, 100.0)
        .with_solar(0.0)
        .with_consumption(800.0)
        .with_timing(36000.0, 1.0);
    let run = simulate_battery(&params, Some(vec![0.0; 36000].as_slice())).unwrap();

    assert_eq!(run.len(), 36000);
    assert!(run.soc_kwh[35998] > 0.0);
    assert_abs_diff_eq!(run.final_soc_kwh().unwrap(), 0.0, epsilon = 1e-9);

    // Keep going past the 10 h mark: the clamp holds SOC at exactly zero.
    let longer = params.with_timing(40000.0, 1.0);
    let run = simulate_battery(&longer, Some(vec![0.0; 40000].as_slice())).unwrap();
    assert!(run.soc_kwh[36000..].iter().all(|&s| s == 0.0));
    assert!(run.net_w.iter().all(|&p| p == -800.0));
}

#[test]
fn constant_solar_and_load_for_one_hour() {
    let params = BatteryParameters::default()
        .with_capacity(8.0, 100.0)
        .with_solar(75.0)
        .with_consumption(450.0)
        .with_timing(3600.0, 1.0);
    let run = simulate_battery(&params, Some(vec![0.0; 3600].as_slice())).unwrap();

    assert!(run.net_w.iter().all(|&p| p == -375.0));
    assert_abs_diff_eq!(run.final_soc_kwh().unwrap(), 7.625, epsilon = 1e-9);
    assert_eq!(run.time_min[60], 1.0);
}

#[test]
fn synthesized_regen_midpoint_of_one_period() {
    let profile = synthesize_regen_profile(600.0, 1.0);
    assert_eq!(profile.len(), 600);
    assert_abs_diff_eq!(profile[300], 75.0, epsilon = 1e-9);
}

#[test]
fn repeated_runs_are_bit_identical() {
    let params = BatteryParameters::default().with_timing(1800.0, 0.5);
    let regen: Vec<f64> = (0..3600).map(|i| (i % 97) as f64 * 1.7).collect();

    let first = simulate_battery(&params, Some(regen.as_slice())).unwrap();
    let second = simulate_battery(&params, Some(regen.as_slice())).unwrap();
    assert_eq!(first, second);

    let synthesized = simulate_battery(&params, None).unwrap();
    assert_eq!(synthesized, simulate_battery(&params, None).unwrap());
}

#[test]
fn two_hour_worked_example() {
    let params = BatteryParameters::default()
        .with_timing(7200.0, 1.0)
        .with_solar(75.0)
        .with_consumption(450.0);
    let run = simulate_battery(&params, None).unwrap();
    let summary = BatterySummary::from_run(&params, &run).unwrap();

    // Twelve full braking cycles average out to the 75 W mean.
    assert_abs_diff_eq!(summary.regen_energy_kwh, 0.150, epsilon = 1e-6);
    assert_abs_diff_eq!(summary.consumed_energy_kwh, 0.900, epsilon = 1e-12);
    assert_abs_diff_eq!(summary.final_soc_kwh, 8.0 + 0.150 + 0.150 - 0.900, epsilon = 1e-6);
    assert!(summary.final_soc_percent < 100.0);
}

#[test]
fn regen_run_starts_from_rest_windings() {
    let run = simulate_regen(&Dopri5Solver::default(), &RegenScenario::default()).unwrap();
    assert_eq!(run.states[0], MotorState::at_speed(83.77));
    assert_eq!(run.times.len(), 1000);
    assert!(run.dc_output.iter().all(|&v| v >= 0.0));

    let summary = RegenSummary::from_run(&run).unwrap();
    assert_eq!(summary.initial_speed, 83.77);
    assert!(summary.final_speed.is_finite());
    assert!(summary.peak_dc_output >= summary.mean_dc_output);
}

#[test]
fn corrected_phase_model_runs_with_both_solvers() {
    let motor = MotorParameters::m1_front().with_phase_angle_model(PhaseAngleModel::Symmetric);
    let scenario = RegenScenario::default().with_motor(motor).with_horizon(0.02, 21);

    let adaptive = simulate_regen(&Dopri5Solver::default(), &scenario).unwrap();
    let fixed = simulate_regen(&RungeKutta4 { max_step: 1e-5 }, &scenario).unwrap();
    for (a, f) in adaptive.states.iter().zip(&fixed.states) {
        assert_abs_diff_eq!(a.speed, f.speed, epsilon = 1e-4);
        for k in 0..3 {
            assert_abs_diff_eq!(a.currents[k], f.currents[k], epsilon = 1e-4);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn soc_stays_within_capacity(
        capacity in 0.05f64..20.0,
        soc_percent in 0.0f64..=100.0,
        step in 0.5f64..30.0,
        steps in 1usize..400,
        solar in 0.0f64..3000.0,
        consumption in 0.0f64..3000.0,
        regen_scale in 0.0f64..2000.0,
    ) {
        let params = BatteryParameters::default()
            .with_capacity(capacity, soc_percent)
            .with_timing(step * steps as f64 + step * 0.5, step)
            .with_solar(solar)
            .with_consumption(consumption);
        let n = params.validate().unwrap();
        let regen: Vec<f64> = (0..n).map(|i| regen_scale * ((i as f64) * 0.37).sin().abs()).collect();

        let run = simulate_battery(&params, Some(regen.as_slice())).unwrap();
        prop_assert_eq!(run.len(), n);
        for &soc in &run.soc_kwh {
            prop_assert!(soc >= 0.0);
            prop_assert!(soc <= capacity);
        }
    }
}
