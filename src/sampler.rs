use crate::config::Config;
use crate::core::errors::ProtocolError;
use crate::protocols::{Engine, KeyDistribution, Protocol};
use std::collections::HashMap;
use tracing::debug;

/// Aggregated outcome of repeated sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSummary {
    /// Number of sessions run.
    pub trials: usize,
    /// Session count per outcome label (`"valid"` or `"compromised"`).
    pub counts: HashMap<String, usize>,
    /// Mean error rate over all basis-matched positions (BB84 only).
    pub mean_sifted_qber: Option<f64>,
    /// Mean CHSH value (E91 only).
    pub mean_chsh: Option<f64>,
}

impl SampleSummary {
    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Fraction of sessions reported as compromised.
    pub fn compromised_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.count("compromised") as f64 / self.trials as f64
        }
    }
}

/// Runs many independent sessions of one protocol.
///
/// The `Sampler` repeats generate, send and reconcile with consecutive seeds
/// and collects the security statistics each protocol reports.
#[derive(Debug, Clone)]
pub struct Sampler {
    pub protocol: Protocol,
    pub config: Config,
    /// Whether every session is intercepted.
    pub eavesdropping: bool,
}

impl Sampler {
    /// Creates a new `Sampler` without eavesdropping.
    pub fn new(protocol: Protocol, config: Config) -> Self {
        Self {
            protocol,
            config,
            eavesdropping: false,
        }
    }

    /// Sets whether the sessions are intercepted.
    pub fn with_eavesdropping(mut self, eavesdropping: bool) -> Self {
        self.eavesdropping = eavesdropping;
        self
    }

    /// Runs `num_trials` sessions seeded `first_seed`, `first_seed + 1`, ...
    ///
    /// # Returns
    ///
    /// A `SampleSummary` with outcome counts and the mean QBER / CHSH values,
    /// or the first `ProtocolError` encountered.
    pub fn run(&self, num_trials: usize, first_seed: u32) -> Result<SampleSummary, ProtocolError> {
        let mut summary = SampleSummary {
            trials: num_trials,
            ..SampleSummary::default()
        };
        let mut qber_sum = 0.0;
        let mut qber_samples = 0usize;
        let mut chsh_sum = 0.0;
        let mut chsh_samples = 0usize;

        for trial in 0..num_trials {
            let seed = first_seed.wrapping_add(trial as u32);
            let mut engine = Engine::new(self.protocol, &self.config)?;
            engine.generate_key(Some(seed));
            engine.send_key(self.eavesdropping, None)?;
            let outcome = engine.reconcile_key()?;

            let label = if outcome.compromised { "compromised" } else { "valid" };
            *summary.counts.entry(label.to_string()).or_insert(0) += 1;

            match &engine {
                Engine::Bb84(bb84) => {
                    if let Some(report) = bb84.report().filter(|r| r.sifted_length > 0) {
                        qber_sum += report.sifted_error_rate();
                        qber_samples += 1;
                    }
                }
                Engine::E91(e91) => {
                    if let Some(report) = e91.report() {
                        chsh_sum += report.chsh;
                        chsh_samples += 1;
                    }
                }
                Engine::Baseline(_) => {}
            }
        }

        summary.mean_sifted_qber = (qber_samples > 0).then(|| qber_sum / qber_samples as f64);
        summary.mean_chsh = (chsh_samples > 0).then(|| chsh_sum / chsh_samples as f64);

        debug!(
            protocol = %self.protocol,
            trials = num_trials,
            compromised = summary.count("compromised"),
            "sampling finished"
        );
        Ok(summary)
    }
}
