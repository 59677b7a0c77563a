//! WASM bindings for Kirchhoff Core.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmNetwork } from 'kirchhoff_core';
//!
//! await init();
//!
//! const net = new WasmNetwork(`
//!   V1 in 0 DC 5 AC 1
//!   R1 in out 1k
//!   C1 out 0 100n
//! `);
//!
//! net.solve_dc();
//! console.log(net.node_voltage('out'));
//!
//! net.solve_ac(1000);
//! console.log(net.node_magnitude('out'), net.node_phase('out'));
//! ```

use wasm_bindgen::prelude::*;

use crate::error::KirchhoffError;
use crate::solver::{Network, NetworkConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(err: KirchhoffError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// WASM-compatible network solver.
///
/// Wraps the native [`Network`] with a JavaScript-friendly API.
#[wasm_bindgen]
pub struct WasmNetwork {
    network: Network,
}

#[wasm_bindgen]
impl WasmNetwork {
    /// Build a network from netlist text.
    #[wasm_bindgen(constructor)]
    pub fn new(netlist: &str) -> Result<WasmNetwork, JsValue> {
        let network = Network::from_netlist(netlist).map_err(to_js)?;
        Ok(WasmNetwork { network })
    }

    /// Build a network with custom pivot thresholds.
    #[wasm_bindgen]
    pub fn with_config(
        netlist: &str,
        rel_threshold: f64,
        abs_threshold: f64,
    ) -> Result<WasmNetwork, JsValue> {
        let config = NetworkConfig::new()
            .with_rel_threshold(rel_threshold)
            .with_abs_threshold(abs_threshold);
        let network = Network::from_netlist_with_config(netlist, config).map_err(to_js)?;
        Ok(WasmNetwork { network })
    }

    /// Solve the DC operating point.
    #[wasm_bindgen]
    pub fn solve_dc(&mut self) -> Result<(), JsValue> {
        self.network.solve_dc().map_err(to_js)?;
        Ok(())
    }

    /// Solve the small-signal response at `frequency` Hz.
    #[wasm_bindgen]
    pub fn solve_ac(&mut self, frequency: f64) -> Result<(), JsValue> {
        self.network.solve_ac(frequency).map_err(to_js)?;
        Ok(())
    }

    /// DC voltage at a named node.
    #[wasm_bindgen]
    pub fn node_voltage(&self, node_name: &str) -> Result<f64, JsValue> {
        self.network.node_voltage(node_name).map_err(to_js)
    }

    /// AC magnitude at a named node.
    #[wasm_bindgen]
    pub fn node_magnitude(&self, node_name: &str) -> Result<f64, JsValue> {
        self.network
            .node_phasor(node_name)
            .map(|p| p.norm())
            .map_err(to_js)
    }

    /// AC phase at a named node, in degrees.
    #[wasm_bindgen]
    pub fn node_phase(&self, node_name: &str) -> Result<f64, JsValue> {
        self.network
            .node_phasor(node_name)
            .map(|p| p.arg().to_degrees())
            .map_err(to_js)
    }

    /// Number of fill-ins created by the last factorization.
    #[wasm_bindgen(getter)]
    pub fn fill_in_count(&self) -> usize {
        self.network.matrix().fill_in_count()
    }

    /// Text rendering of the matrix.
    #[wasm_bindgen]
    pub fn matrix_string(&self) -> String {
        self.network.matrix().to_string()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
