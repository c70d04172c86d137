// src/config.rs
use serde::Deserialize;

/// Generation and animation parameters for the network graphic.
///
/// Defaults reproduce the layout shipped on the landing page. Overrides
/// arrive as JSON: a file path argument on native, `WasmApi::set_config`
/// from the host page on wasm.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub node_count: usize,
    /// Maximum distance (world units) at which two nodes get connected.
    pub edge_threshold: f32,
    pub particle_count: usize,
    /// Background starfield density; 0 disables the layer.
    pub star_count: usize,

    /// Primary palette endpoints (violet family), hex strings.
    pub palette_a: [String; 2],
    /// Secondary palette endpoints (cyan family), hex strings.
    pub palette_b: [String; 2],

    /// Node base radius band as [lo, span]: values drawn in [lo, lo+span).
    pub radius_range: [f32; 2],
    /// Node activity cycle length band in seconds, same [lo, span] shape.
    pub cycle_range: [f32; 2],
    /// Particle speed band, edge lengths per second, [lo, span].
    pub speed_range: [f32; 2],
    /// Particle display size band in world units, [lo, span].
    pub size_range: [f32; 2],

    pub seed: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_count: 50,
            edge_threshold: 4.5,
            particle_count: 70,
            star_count: 400,
            palette_a: ["#8B5CF6".into(), "#A78BFA".into()],
            palette_b: ["#06B6D4".into(), "#22D3EE".into()],
            radius_range: [0.05, 0.09],
            cycle_range: [3.0, 7.0],
            speed_range: [0.08, 0.18],
            size_range: [0.02, 0.03],
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_override_keeps_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{ "node_count": 12, "seed": 7 }"#).unwrap();
        assert_eq!(config.node_count, 12);
        assert_eq!(config.seed, 7);
        assert_eq!(config.particle_count, 70);
        assert_eq!(config.edge_threshold, 4.5);
    }

    #[test]
    fn bad_json_is_an_error_not_a_panic() {
        assert!(serde_json::from_str::<NetworkConfig>(r#"{ "node_count": "many" }"#).is_err());
    }
}
