//! Shared numeric plumbing for the drivetrain simulations: the error type,
//! sample grids, and the injected ODE-solver capability.

pub mod error;
pub mod integrators;
pub mod sampling;

pub use error::{require_finite, require_positive, SimError, SimResult};
pub use integrators::{Dopri5Solver, OdeSolver, OdeSystem, RungeKutta4, Trajectory};
pub use sampling::{arange, linspace};
