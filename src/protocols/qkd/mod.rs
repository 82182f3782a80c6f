//! Quantum Key Distribution (QKD) Protocols.
//!
//! This module contains the simulated QKD engines:
//! - **BB84**: prepare-and-measure with two bases and QBER sampling.
//! - **E91**: entanglement-based, secured by a CHSH Bell test.

pub mod bb84;
pub mod e91;
