use drivetrain_app::logging;
use drivetrain_app::plot::{self, Panel, Series};
use electrical::{simulate_battery, BatteryParameters, BatterySummary};
use log::{debug, info};
use plotters::prelude::{RGBColor, BLUE, GREEN, RED};

const OUTPUT: &str = "battery_soc.png";
const ORANGE: RGBColor = RGBColor(255, 165, 0);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    // Two-hour ride on an 8 kWh pack with a 75 W panel and 450 W average draw.
    let params = BatteryParameters::default()
        .with_capacity(8.0, 100.0)
        .with_timing(3600.0 * 2.0, 1.0)
        .with_solar(75.0)
        .with_consumption(450.0);
    debug!("battery: {}", serde_json::to_string(&params)?);

    let run = simulate_battery(&params, None)?;
    println!("{}", BatterySummary::from_run(&params, &run)?);

    let panels = [
        Panel {
            title: "Battery State of Charge Over Time",
            x_label: "Time (minutes)",
            y_label: "SOC (kWh)",
            series: vec![Series { label: "Battery SOC (kWh)", color: BLUE, x: &run.time_min, y: &run.soc_kwh }],
            zero_line: false,
        },
        Panel {
            title: "Power Inputs Over Time",
            x_label: "Time (minutes)",
            y_label: "Power (W)",
            series: vec![
                Series { label: "Regenerative Braking Power (W)", color: GREEN, x: &run.time_min, y: &run.regen_w },
                Series { label: "Solar Panel Power (W)", color: ORANGE, x: &run.time_min, y: &run.solar_w },
            ],
            zero_line: false,
        },
        Panel {
            title: "Net Power Over Time",
            x_label: "Time (minutes)",
            y_label: "Power (W)",
            series: vec![Series {
                label: "Net Power (W) = Regen + Solar - Consumption",
                color: RED,
                x: &run.time_min,
                y: &run.net_w,
            }],
            zero_line: true,
        },
    ];
    plot::draw_stacked(OUTPUT, (1400, 800), &panels)?;
    info!("wrote {OUTPUT}");

    Ok(())
}
