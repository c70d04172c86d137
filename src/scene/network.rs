use glam::Vec3;

use crate::color::{Color, ScenePalette};
use crate::config::NetworkConfig;
use crate::rng::Lcg;
use crate::scene::edge::Edge;
use crate::scene::node::Node;
use crate::scene::particle::Particle;

// 节点分布在一个压扁的球壳上，形成透镜状的轮廓
const SHELL_RADIUS_MIN: f32 = 2.5;
const SHELL_RADIUS_SPAN: f32 = 4.5;
const Y_FLATTEN: f32 = 0.6;
/// Probability mass below which a node falls into the secondary palette.
const PALETTE_B_CUTOFF: f32 = 0.35;

/// The generated graph: immutable nodes and edges plus the initial
/// particle states. Rebuilt from scratch whenever the config changes,
/// never persisted.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub particles: Vec<Particle>,
}

impl NetworkTopology {
    /// Deterministic: the same config (seed included) reproduces
    /// bit-identical positions and colors on every run and platform.
    pub fn generate(config: &NetworkConfig) -> anyhow::Result<Self> {
        let palette = ScenePalette::from_config(config)?;
        let mut rng = Lcg::new(config.seed);

        let mut nodes = Vec::with_capacity(config.node_count);
        for _ in 0..config.node_count {
            // 球面均匀分布：方位角均匀，极角用 acos(2u-1)
            let theta = rng.next_f32() * std::f32::consts::TAU;
            let phi = (2.0 * rng.next_f32() - 1.0).acos();
            let r = rng.range(SHELL_RADIUS_MIN, SHELL_RADIUS_SPAN);

            let position = Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin() * Y_FLATTEN,
                r * phi.cos(),
            );

            let family = if rng.next_f32() > PALETTE_B_CUTOFF {
                palette.primary
            } else {
                palette.secondary
            };
            let color = Color::lerp(family[0], family[1], rng.next_f32());

            nodes.push(Node {
                position,
                color,
                base_radius: rng.range(config.radius_range[0], config.radius_range[1]),
                phase_offset: rng.next_f32() * std::f32::consts::TAU,
                activity_cycle: rng.range(config.cycle_range[0], config.cycle_range[1]),
            });
        }

        // O(N²) proximity pass. N stays in the tens here; a spatial index
        // would be needed before growing N much beyond that.
        let mut edges = Vec::new();
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let dist = nodes[i].position.distance(nodes[j].position);
                if dist < config.edge_threshold {
                    edges.push(Edge {
                        from: i,
                        to: j,
                        strength: 1.0 - dist / config.edge_threshold,
                    });
                }
            }
        }

        // No edges, no particles: guards the index draw below
        let mut particles = Vec::new();
        if !edges.is_empty() {
            particles.reserve(config.particle_count);
            for _ in 0..config.particle_count {
                particles.push(Particle {
                    edge_index: rng.pick_index(edges.len()),
                    t: rng.next_f32(),
                    speed: rng.range(config.speed_range[0], config.speed_range[1]),
                    size: rng.range(config.size_range[0], config.size_range[1]),
                });
            }
        }

        log::info!(
            "Generated topology: {} nodes, {} edges, {} particles (seed {})",
            nodes.len(),
            edges.len(),
            particles.len(),
            config.seed
        );

        Ok(Self {
            nodes,
            edges,
            particles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_topology() -> NetworkTopology {
        NetworkTopology::generate(&NetworkConfig::default()).unwrap()
    }

    #[test]
    fn generation_is_deterministic() {
        let a = default_topology();
        let b = default_topology();

        assert_eq!(a.nodes.len(), b.nodes.len());
        for (left, right) in a.nodes.iter().zip(&b.nodes) {
            assert_eq!(left.position.x.to_bits(), right.position.x.to_bits());
            assert_eq!(left.position.y.to_bits(), right.position.y.to_bits());
            assert_eq!(left.position.z.to_bits(), right.position.z.to_bits());
            assert_eq!(left.color, right.color);
            assert_eq!(left.base_radius.to_bits(), right.base_radius.to_bits());
        }
        assert_eq!(a.edges.len(), b.edges.len());
        assert_eq!(a.particles.len(), b.particles.len());
    }

    #[test]
    fn different_seeds_differ() {
        let a = default_topology();
        let b = NetworkTopology::generate(&NetworkConfig {
            seed: 43,
            ..Default::default()
        })
        .unwrap();
        assert!(
            a.nodes
                .iter()
                .zip(&b.nodes)
                .any(|(l, r)| l.position != r.position)
        );
    }

    #[test]
    fn edges_respect_threshold_and_strength_bounds() {
        let config = NetworkConfig::default();
        let topology = NetworkTopology::generate(&config).unwrap();
        assert!(!topology.edges.is_empty());

        for edge in &topology.edges {
            assert_ne!(edge.from, edge.to, "self-edge");
            assert!(edge.from < edge.to);
            let dist = topology.nodes[edge.from]
                .position
                .distance(topology.nodes[edge.to].position);
            assert!(dist < config.edge_threshold);
            assert!((0.0..=1.0).contains(&edge.strength));
            let expected = 1.0 - dist / config.edge_threshold;
            assert!((edge.strength - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn particles_reference_valid_edges() {
        let topology = default_topology();
        for particle in &topology.particles {
            assert!(particle.edge_index < topology.edges.len());
            assert!((0.0..=1.0).contains(&particle.t));
            assert!(particle.speed > 0.0);
        }
    }

    #[test]
    fn empty_graph_is_safe() {
        let topology = NetworkTopology::generate(&NetworkConfig {
            node_count: 0,
            ..Default::default()
        })
        .unwrap();
        assert!(topology.nodes.is_empty());
        assert!(topology.edges.is_empty());
        assert!(topology.particles.is_empty());
    }

    #[test]
    fn edge_free_graph_seeds_no_particles() {
        // 单个节点不可能有边
        let topology = NetworkTopology::generate(&NetworkConfig {
            node_count: 1,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(topology.nodes.len(), 1);
        assert!(topology.edges.is_empty());
        assert!(topology.particles.is_empty());
    }

    #[test]
    fn bad_palette_hex_is_an_error() {
        let result = NetworkTopology::generate(&NetworkConfig {
            palette_a: ["#GGGGGG".into(), "#A78BFA".into()],
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
