pub mod errors;
mod measurements;
mod state;
pub mod utils;

pub use measurements::{Basis, MeasurementResult};
pub use state::{EntangledPair, Qubit, Side};
