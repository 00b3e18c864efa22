use electrical::{simulate_regen, PhaseAngleModel, RegenScenario};
use simcore::Dopri5Solver;
use std::fs::File;
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Same braking run twice: the literal phase-angle formula and the balanced one.
    for (model, path) in [
        (PhaseAngleModel::LinearlySpaced, "regen_linearly_spaced.csv"),
        (PhaseAngleModel::Symmetric, "regen_symmetric.csv"),
    ] {
        let mut scenario = RegenScenario::default();
        scenario.motor = scenario.motor.with_phase_angle_model(model);
        let run = simulate_regen(&Dopri5Solver::default(), &scenario)?;

        let mut csv = File::create(path)?;
        writeln!(csv, "t,speed,current_a,current_b,current_c,dc_output")?;
        for ((t, state), dc) in run.times.iter().zip(&run.states).zip(&run.dc_output) {
            writeln!(
                csv,
                "{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                t, state.speed, state.currents.x, state.currents.y, state.currents.z, dc
            )?;
        }
        println!("Wrote {path}");
    }

    Ok(())
}
