use qkd_cipher::{Config, Protocol, Sampler};

#[test]
fn bb84_undisturbed_sessions_always_succeed() {
    let summary = Sampler::new(Protocol::Bb84, Config::default())
        .run(20, 0)
        .unwrap();
    assert_eq!(summary.count("valid"), 20);
    assert_eq!(summary.mean_sifted_qber, Some(0.0));
}

#[test]
fn bb84_intercept_resend_error_rate_approaches_one_quarter() {
    let summary = Sampler::new(Protocol::Bb84, Config::default())
        .with_eavesdropping(true)
        .run(20, 1000)
        .unwrap();
    let qber = summary.mean_sifted_qber.unwrap();
    assert!((0.22..0.28).contains(&qber), "qber = {qber}");
    assert_eq!(summary.count("compromised"), 20);
}

#[test]
fn e91_undisturbed_pairs_exceed_classical_bound() {
    let summary = Sampler::new(Protocol::E91, Config::default())
        .run(10, 500)
        .unwrap();
    let chsh = summary.mean_chsh.unwrap();
    assert!(chsh > 2.5, "chsh = {chsh}");
    assert!(chsh < 2.0 * std::f64::consts::SQRT_2 + 0.15);
    assert_eq!(summary.count("valid"), 10);
}

#[test]
fn e91_interception_stays_within_classical_bound() {
    let summary = Sampler::new(Protocol::E91, Config::default())
        .with_eavesdropping(true)
        .run(10, 500)
        .unwrap();
    let chsh = summary.mean_chsh.unwrap();
    assert!(chsh <= 2.0, "chsh = {chsh}");
    assert_eq!(summary.compromised_rate(), 1.0);
}
