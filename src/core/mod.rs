pub mod context;
pub mod design_temps;
pub mod ducts;
pub mod envelope;
pub mod equipment;
pub mod ground_loop;
pub mod psychrometrics;
pub(crate) mod solvers;
pub mod units;
