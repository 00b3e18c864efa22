use drivetrain_app::logging;
use drivetrain_app::plot::{self, Panel, Series};
use electrical::{simulate_regen, RegenScenario, RegenSummary};
use log::{debug, info};
use plotters::prelude::{BLUE, GREEN, RED};
use simcore::Dopri5Solver;

const OUTPUT: &str = "bldc_regen.png";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    // M1 front motor braking from 83.77 rad/s over 1.5 s
    let scenario = RegenScenario::default();
    let solver = Dopri5Solver::default();
    debug!("scenario: {}", serde_json::to_string(&scenario)?);
    debug!("solver: {}", serde_json::to_string(&solver)?);

    let run = simulate_regen(&solver, &scenario)?;
    println!("{}", RegenSummary::from_run(&run)?);

    let speed = run.speed();
    let [ia, ib, ic] = [0, 1, 2].map(|k| run.phase_current(k));

    let panels = [
        Panel {
            title: "Rotor Speed over Time (M1 Motor)",
            x_label: "Time (s)",
            y_label: "Speed (rad/s)",
            series: vec![Series { label: "Rotor Speed (rad/s)", color: BLUE, x: &run.times, y: &speed }],
            zero_line: false,
        },
        Panel {
            title: "Phase Currents",
            x_label: "Time (s)",
            y_label: "Current (A)",
            series: vec![
                Series { label: "Phase A", color: BLUE, x: &run.times, y: &ia },
                Series { label: "Phase B", color: RED, x: &run.times, y: &ib },
                Series { label: "Phase C", color: GREEN, x: &run.times, y: &ic },
            ],
            zero_line: false,
        },
        Panel {
            title: "DC Voltage from M1 Generator",
            x_label: "Time (s)",
            y_label: "DC Voltage (V)",
            series: vec![Series { label: "Rectified DC Output", color: GREEN, x: &run.times, y: &run.dc_output }],
            zero_line: false,
        },
    ];
    plot::draw_stacked(OUTPUT, (1400, 1000), &panels)?;
    info!("wrote {OUTPUT}");

    Ok(())
}
