pub mod analysis;
pub mod battery;
pub mod bldc;

pub use analysis::{BatterySummary, RegenSummary};
pub use battery::{simulate_battery, synthesize_regen_profile, BatteryParameters, SocTrajectory};
pub use bldc::{
    rectify_dc, simulate_regen, BldcGenerator, MotorParameters, MotorState, PhaseAngleModel, RegenRun,
    RegenScenario,
};
