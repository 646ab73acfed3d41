use super::*;

#[test]
fn luma_of_white_is_one() {
    assert!((luma([1.0, 1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
    assert_eq!(luma([0.0, 0.0, 0.0, 1.0]), 0.0);
}

#[test]
fn lerp_endpoints_are_exact() {
    assert_eq!(lerp(0.25, 0.75, 0.0), 0.25);
    assert_eq!(lerp(0.3, 0.3, 0.9), 0.3);
    let t = lerp_texel([0.0; 4], [1.0, 2.0, 3.0, 4.0], 0.5);
    assert_eq!(t, [0.5, 1.0, 1.5, 2.0]);
}

#[test]
fn quantize_f16_rounds_to_half_precision() {
    assert_eq!(quantize_f16(0.5), 0.5);
    let q = quantize_f16(0.1);
    assert_ne!(q, 0.1);
    assert!((q - 0.1).abs() < 1e-4);
}

#[test]
fn min_eigenvalue_of_diagonal_and_degenerate_tensors() {
    assert!((min_eigenvalue_sym2(3.0, 0.0, 2.0) - 2.0).abs() < 1e-6);
    // Rank-one tensor (pure horizontal gradient): aperture problem.
    assert!(min_eigenvalue_sym2(4.0, 0.0, 0.0).abs() < 1e-6);
    assert!(min_eigenvalue_sym2(1.0, 1.0, 1.0).abs() < 1e-6);
}
