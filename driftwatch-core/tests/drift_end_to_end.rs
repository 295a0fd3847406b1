//! End-to-end checks on seeded Normal samples and the documented asymmetry.

use driftwatch_core::synthetic::simulate_pair;
use driftwatch_core::{
    calculate_psi, classify, DriftTier, EvaluationConfig, InvalidInputError, PsiCalculator,
    SampleRole,
};

#[test]
fn half_sigma_shift_is_flagged() {
    let pair = simulate_pair(42, 1000, 0.0, 0.5, 1.0);
    let psi = calculate_psi(&pair.reference, &pair.current, 10).unwrap();

    assert!((0.15..=0.60).contains(&psi), "psi = {psi}");
    let tier = classify(psi).unwrap();
    assert!(
        matches!(tier, DriftTier::PossibleDrift | DriftTier::LikelyDrift),
        "tier = {tier}"
    );
}

#[test]
fn same_distribution_is_quiet() {
    let pair = simulate_pair(7, 2000, 0.0, 0.0, 1.0);
    let psi = calculate_psi(&pair.reference, &pair.current, 10).unwrap();
    assert!(psi < 0.10, "psi = {psi}");
    assert_eq!(classify(psi).unwrap(), DriftTier::NoDrift);
}

#[test]
fn original_simulation_drifts() {
    // Reference N(50, 5) against current N(60, 5), 100 rows each.
    let pair = simulate_pair(42, 100, 50.0, 60.0, 5.0);
    let psi = calculate_psi(&pair.reference, &pair.current, 10).unwrap();
    assert_eq!(classify(psi).unwrap(), DriftTier::LikelyDrift);
}

#[test]
fn equal_width_mode_also_detects_shift() {
    let pair = simulate_pair(11, 1000, 0.0, 0.5, 1.0);
    let config = EvaluationConfig {
        binning: driftwatch_core::BinningMode::EqualWidth,
        ..EvaluationConfig::default()
    };
    let psi = PsiCalculator::from_config(&config)
        .calculate(&pair.reference, &pair.current)
        .unwrap();
    assert!(psi > 0.10, "psi = {psi}");
}

#[test]
fn psi_is_asymmetric_because_edges_follow_the_reference() {
    let wide: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let narrow: Vec<f64> = (0..50).map(|i| i as f64 * 9.0 / 49.0).collect();

    let forward = calculate_psi(&wide, &narrow, 10).unwrap();
    let backward = calculate_psi(&narrow, &wide, 10).unwrap();

    assert!(forward > 0.25 && backward > 0.25);
    assert!(
        (forward - backward).abs() > 1.0,
        "forward = {forward}, backward = {backward}"
    );

    // Swapping arguments is the same as swapping which sample the edges come from.
    let calc = PsiCalculator::new(10);
    let narrow_edges = calc.edges(&narrow).unwrap();
    let via_edges = calc
        .calculate_with_edges(&narrow_edges, &narrow, &wide)
        .unwrap();
    assert_eq!(backward, via_edges);
}

#[test]
fn empty_reference_is_invalid_input() {
    let err = calculate_psi(&[], &[1.0, 2.0, 3.0], 10).unwrap_err();
    assert_eq!(err, InvalidInputError::EmptySample(SampleRole::Reference));
}

#[test]
fn nan_in_current_is_invalid_input() {
    let err = calculate_psi(&[1.0, 2.0], &[1.0, f64::NAN], 10).unwrap_err();
    assert_eq!(
        err,
        InvalidInputError::NonFiniteObservation {
            role: SampleRole::Current,
            index: 1
        }
    );
}
