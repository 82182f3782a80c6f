pub mod cipher;
pub mod config;
mod core;
pub mod protocols;
pub mod random;
mod sampler;
pub mod session;

pub use crate::cipher::{KeyMaterial, Reconciliation};
pub use crate::config::Config;
pub use crate::core::{Basis, EntangledPair, MeasurementResult, Qubit, Side, errors, utils};
pub use crate::protocols::{Engine, KeyDistribution, Protocol, Stage};
pub use crate::random::{Mt19937, RandomSource};
pub use crate::sampler::{SampleSummary, Sampler};
pub use crate::session::{EveView, Session, Transmission};
