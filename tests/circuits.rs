//! End-to-end tests: parse a netlist, solve it, check node values.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use approx::assert_relative_eq;
use kirchhoff_core::circuit::{validate_circuit, Circuit};
use kirchhoff_core::{netlist, KirchhoffError, Network, NetworkConfig};

#[test]
fn test_voltage_divider() {
    let text = r#"
.title Voltage Divider
* 5V source into 1k over 2k
V1 1 0 DC 5
R1 1 2 1k
R2 2 0 2k
.end
"#;

    let ast = netlist::parse(text).expect("parse should succeed");
    assert_eq!(ast.title.as_deref(), Some("Voltage Divider"));
    assert_eq!(ast.components.len(), 3);

    let circuit = Circuit::from_ast(ast).expect("build should succeed");
    validate_circuit(&circuit).expect("circuit should be valid");
    let mut net = Network::new(circuit).unwrap();
    net.solve_dc().expect("DC solve should succeed");

    let v2 = net.node_voltage("2").unwrap();
    assert!((v2 - 10.0 / 3.0).abs() < 1e-9, "V(2) = {} (expected 10/3)", v2);
    assert_relative_eq!(net.branch_current("V1").unwrap(), -5.0 / 3e3, epsilon = 1e-12);
}

#[test]
fn test_parallel_current_source() {
    let mut net = Network::from_netlist("I1 0 1 10m\nR1 1 0 1k\nR2 1 0 1k").unwrap();
    net.solve_dc().unwrap();
    // 10 mA into 500 ohm
    assert_relative_eq!(net.node_voltage("1").unwrap(), 5.0, epsilon = 1e-9);
}

#[test]
fn test_rc_lowpass_at_corner() {
    let text = "V1 in 0 AC 1\nR1 in out 1k\nC1 out 0 1u";
    let mut net = Network::from_netlist(text).unwrap();
    let corner = 1.0 / (2.0 * PI * 1e3 * 1e-6);
    net.solve_ac(corner).unwrap();

    let out = net.node_phasor("out").unwrap();
    assert_relative_eq!(out.norm(), FRAC_1_SQRT_2, epsilon = 1e-9);
    assert_relative_eq!(out.arg().to_degrees(), -45.0, epsilon = 1e-6);

    let input = net.node_phasor("in").unwrap();
    assert_relative_eq!(input.re, 1.0, epsilon = 1e-12);
    assert_relative_eq!(input.im, 0.0, epsilon = 1e-12);
}

#[test]
fn test_rl_highpass_at_corner() {
    // Output across the inductor: |H| = wL / |R + jwL|
    let text = "V1 in 0 AC 2\nR1 in out 100\nL1 out 0 10m";
    let mut net = Network::from_netlist(text).unwrap();
    let corner = 100.0 / (2.0 * PI * 10e-3);
    net.solve_ac(corner).unwrap();

    let out = net.node_phasor("out").unwrap();
    assert_relative_eq!(out.norm(), 2.0 * FRAC_1_SQRT_2, epsilon = 1e-9);
    assert_relative_eq!(out.arg().to_degrees(), 45.0, epsilon = 1e-6);
}

#[test]
fn test_dc_and_ac_share_one_network() {
    let text = "V1 in 0 DC 4 AC 1\nR1 in out 1k\nC1 out 0 1u\nR2 out 0 1k";
    let mut net = Network::from_netlist(text).unwrap();

    net.solve_dc().unwrap();
    assert_relative_eq!(net.node_voltage("out").unwrap(), 2.0, epsilon = 1e-9);

    // Near DC the AC response matches the resistive divider
    net.solve_ac(1e-3).unwrap();
    assert_relative_eq!(net.node_phasor("out").unwrap().norm(), 0.5, epsilon = 1e-6);

    // Back to real mode on the same matrix
    net.solve_dc().unwrap();
    assert_relative_eq!(net.node_voltage("out").unwrap(), 2.0, epsilon = 1e-9);
    assert!(net.ac_solution().is_some());
}

#[test]
fn test_vccs_inverting_stage() {
    let text = "V1 in 0 1\nR1 in 0 1k\nG1 out 0 in 0 2m\nR2 out 0 1k";
    let mut net = Network::from_netlist(text).unwrap();
    net.solve_dc().unwrap();
    assert_relative_eq!(net.node_voltage("out").unwrap(), -2.0, epsilon = 1e-9);
}

#[test]
fn test_floating_pair_is_singular() {
    let mut net = Network::from_netlist("V1 a 0 1\nR1 a 0 1k\nR2 b c 1k").unwrap();
    let err = net.solve_dc().unwrap_err();
    assert!(err.is_singular());
    assert!(matches!(
        net.node_voltage("a"),
        Err(KirchhoffError::NoSolution { .. })
    ));
}

#[test]
fn test_ground_aliases() {
    let mut net = Network::from_netlist("V1 a GND 3\nR1 a gnd 1k").unwrap();
    net.solve_dc().unwrap();
    assert_relative_eq!(net.node_voltage("a").unwrap(), 3.0, epsilon = 1e-12);
    assert_eq!(net.node_voltage("0").unwrap(), 0.0);
}

#[test]
fn test_custom_thresholds() {
    let config = NetworkConfig::new().with_rel_threshold(0.5);
    let mut net =
        Network::from_netlist_with_config("V1 a 0 1\nR1 a b 1k\nR2 b 0 1k", config).unwrap();
    net.solve_dc().unwrap();
    assert_eq!(net.matrix().rel_threshold(), 0.5);
    assert_relative_eq!(net.node_voltage("b").unwrap(), 0.5, epsilon = 1e-12);
}

#[test]
fn test_bad_netlists() {
    assert!(matches!(
        Network::from_netlist("X1 a 0 1"),
        Err(KirchhoffError::UnknownComponentType { .. })
    ));
    assert!(matches!(
        Network::from_netlist("R1 a b 1k\nR2 b a 1k"),
        Err(KirchhoffError::InvalidTopology { .. })
    ));
    assert!(matches!(
        Network::from_netlist("V1 a 0 1\nR1 a 0 1k\nR1 a 0 2k"),
        Err(KirchhoffError::DuplicateComponent { .. })
    ));
}

#[test]
fn test_current_into_unloaded_node_is_singular() {
    // Nothing but the current source touches node a
    let mut net = Network::from_netlist("I1 0 a 1m\nR1 b 0 1k\nV1 b 0 1").unwrap();
    let err = net.solve_dc().unwrap_err();
    assert!(err.is_singular());
    assert!(net.dc_solution().is_none());
}
