// src/animator.rs
// 每帧重新采样的动画驱动：拓扑不可变，仅粒子进度是可变状态
use glam::Vec3;

use crate::color::{Color, ScenePalette};
use crate::rng::Lcg;
use crate::scene::network::NetworkTopology;
use crate::scene::particle::Particle;
use crate::scene::starfield::Starfield;

// 指针增益 0.3 × 位移增益 0.15，与页面上的视差幅度一致
const POINTER_GAIN: f32 = 0.3;
const PARALLAX_SHIFT: f32 = 0.15;

const IDLE_YAW_RATE: f32 = 0.04;
const POINTER_YAW_GAIN: f32 = 0.08;
const TILT_RATE: f32 = 0.02;
const TILT_AMPLITUDE: f32 = 0.05;
const POINTER_TILT_GAIN: f32 = 0.05;

const EDGE_PULSE_RATE: f32 = 1.5;
const EDGE_PULSE_SPREAD: f32 = 0.3;
const PARTICLE_PULSE_RATE: f32 = 3.0;

// 星星缓慢呼吸，不受指针和场景旋转影响
const STAR_TWINKLE_RATE: f32 = 0.3;
const STAR_COLOR: (u8, u8, u8) = (0xE6, 0xE6, 0xF2);

/// Latest normalized cursor sample, both axes in roughly [-1, 1].
///
/// Taken as an immutable per-frame snapshot: the input side overwrites its
/// own copy, the animation side reads whatever was current when the frame
/// started. Tearing between the two floats is imperceptible and accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerOffset {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct NodeVisual {
    pub position: Vec3,
    pub radius: f32,
    pub color: Color,
}

/// One edge segment with its endpoint colors; alpha is premixed in.
#[derive(Debug, Clone, Copy)]
pub struct EdgeVisual {
    pub start: Vec3,
    pub end: Vec3,
    pub start_color: Color,
    pub end_color: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct ParticleVisual {
    pub position: Vec3,
    pub size: f32,
    pub color: Color,
}

/// Everything the shell needs to draw one frame. Owns its data, holds no
/// GPU resources, and carries the scene rotation so the renderer can bake
/// it into the model matrix.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub yaw: f32,
    pub tilt: f32,
    pub nodes: Vec<NodeVisual>,
    pub edges: Vec<EdgeVisual>,
    pub particles: Vec<ParticleVisual>,
    /// Backdrop dots in world space, exempt from yaw/tilt and parallax.
    pub stars: Vec<ParticleVisual>,
}

/// Per-frame driver over a fixed topology.
///
/// `tick` is a pure resampling from accumulated elapsed time and the
/// latest pointer snapshot; there are no modes or transitions. The only
/// state it mutates is particle progress, advanced by the frame delta so
/// the end state depends on total elapsed time, not on step count.
pub struct Animator {
    topology: NetworkTopology,
    palette: ScenePalette,
    starfield: Starfield,
    particles: Vec<Particle>,
    elapsed: f32,
    /// Deliberately non-deterministic in production (seeded from the
    /// clock by the shell): reassignment on wrap is pure decoration and
    /// is kept outside the reproducible topology stream.
    reassign_rng: Lcg,
}

impl Animator {
    pub fn new(
        topology: NetworkTopology,
        palette: ScenePalette,
        starfield: Starfield,
        reassign_rng: Lcg,
    ) -> Self {
        let particles = topology.particles.clone();
        Self {
            topology,
            palette,
            starfield,
            particles,
            elapsed: 0.0,
            reassign_rng,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advances the animation by `dt` seconds and produces the frame's
    /// renderable scene description.
    pub fn tick(&mut self, dt: f32, pointer: PointerOffset) -> SceneSnapshot {
        self.elapsed += dt;
        let t = self.elapsed;

        let parallax = Vec3::new(
            pointer.x * POINTER_GAIN * PARALLAX_SHIFT,
            pointer.y * POINTER_GAIN * PARALLAX_SHIFT,
            0.0,
        );

        let mut snapshot = SceneSnapshot {
            yaw: t * IDLE_YAW_RATE + pointer.x * POINTER_YAW_GAIN,
            tilt: (t * TILT_RATE).sin() * TILT_AMPLITUDE + pointer.y * POINTER_TILT_GAIN,
            nodes: Vec::with_capacity(self.topology.nodes.len()),
            edges: Vec::with_capacity(self.topology.edges.len()),
            particles: Vec::with_capacity(self.particles.len()),
            stars: Vec::with_capacity(self.starfield.stars.len()),
        };

        let star_color = Color::from(STAR_COLOR);
        for star in &self.starfield.stars {
            let twinkle = 0.5 + 0.5 * (t * STAR_TWINKLE_RATE + star.phase).sin();
            snapshot.stars.push(ParticleVisual {
                position: star.position,
                size: star.size,
                color: star_color.with_alpha(0.3 + twinkle * 0.6),
            });
        }

        for node in &self.topology.nodes {
            // 活跃度：[0,1] 的平滑振荡，驱动缩放和亮度
            let activity = 0.5 + 0.5 * (t / node.activity_cycle + node.phase_offset).sin();
            snapshot.nodes.push(NodeVisual {
                position: node.position + parallax,
                radius: node.base_radius * (0.8 + activity * 0.6),
                color: node.color.scaled(0.8 + activity),
            });
        }

        let gradient = (self.palette.primary[0], self.palette.secondary[0]);
        for (index, edge) in self.topology.edges.iter().enumerate() {
            let pulse = 0.5 + 0.5 * (t * EDGE_PULSE_RATE + index as f32 * EDGE_PULSE_SPREAD).sin();
            let alpha = edge.strength * (0.25 + pulse * 0.45);
            snapshot.edges.push(EdgeVisual {
                start: self.topology.nodes[edge.from].position + parallax,
                end: self.topology.nodes[edge.to].position + parallax,
                start_color: Color::lerp(gradient.0, gradient.1, pulse * 0.5).with_alpha(alpha),
                end_color: Color::lerp(gradient.0, gradient.1, 0.5 + pulse * 0.5).with_alpha(alpha),
            });
        }

        let edge_count = self.topology.edges.len();
        for (index, particle) in self.particles.iter_mut().enumerate() {
            particle.t += particle.speed * dt;
            if particle.t > 1.0 {
                particle.t -= 1.0;
                particle.edge_index = self.reassign_rng.pick_index(edge_count);
            }

            let edge = self.topology.edges[particle.edge_index];
            let start = self.topology.nodes[edge.from].position + parallax;
            let end = self.topology.nodes[edge.to].position + parallax;

            let pulse = 0.5 + 0.5 * (t * PARTICLE_PULSE_RATE + index as f32).sin();
            // 两个色系按 index 交替，亮端点加闪烁
            let base = if index % 3 != 0 {
                self.palette.primary[1]
            } else {
                self.palette.secondary[1]
            };

            snapshot.particles.push(ParticleVisual {
                position: start.lerp(end, particle.t),
                size: particle.size * (0.5 + pulse * 0.5),
                color: base.shimmer(0.7 + pulse * 0.3),
            });
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::scene::edge::Edge;
    use crate::scene::node::Node;

    fn test_palette() -> ScenePalette {
        ScenePalette::from_config(&NetworkConfig::default()).unwrap()
    }

    fn default_animator() -> Animator {
        let config = NetworkConfig::default();
        let topology = NetworkTopology::generate(&config).unwrap();
        let starfield = Starfield::generate(&config);
        Animator::new(topology, test_palette(), starfield, Lcg::new(1))
    }

    fn tiny_node(x: f32) -> Node {
        Node {
            position: Vec3::new(x, 0.0, 0.0),
            base_radius: 0.1,
            phase_offset: 0.0,
            activity_cycle: 5.0,
            color: Color::from((255, 255, 255)),
        }
    }

    /// Hand-built topology: a triangle of nodes, three edges, one particle.
    fn triangle_animator(particle: Particle) -> Animator {
        let topology = NetworkTopology {
            nodes: vec![tiny_node(0.0), tiny_node(1.0), tiny_node(2.0)],
            edges: vec![
                Edge { from: 0, to: 1, strength: 1.0 },
                Edge { from: 1, to: 2, strength: 0.5 },
                Edge { from: 0, to: 2, strength: 0.25 },
            ],
            particles: vec![particle],
        };
        Animator::new(topology, test_palette(), Starfield::default(), Lcg::new(99))
    }

    #[test]
    fn particle_wraps_and_is_reassigned() {
        let mut animator = triangle_animator(Particle {
            edge_index: 0,
            t: 0.98,
            speed: 0.08,
            size: 0.02,
        });

        animator.tick(1.0, PointerOffset::default());

        let p = animator.particles[0];
        assert!((p.t - 0.06).abs() < 1e-5, "t after wrap: {}", p.t);
        assert!(p.edge_index < 3);
    }

    #[test]
    fn reassignment_eventually_visits_other_edges() {
        let mut animator = triangle_animator(Particle {
            edge_index: 0,
            t: 0.0,
            speed: 0.2,
            size: 0.02,
        });

        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            animator.tick(0.1, PointerOffset::default());
            seen.insert(animator.particles[0].edge_index);
        }
        assert!(seen.len() > 1, "particle never left its first edge");
    }

    #[test]
    fn particle_state_stays_valid_every_frame() {
        let mut animator = default_animator();
        let edge_count = animator.topology.edges.len();
        for frame in 0..600 {
            // 变化的帧间隔，模拟不稳定的刷新率
            let dt = 1.0 / 60.0 + (frame % 7) as f32 * 0.01;
            animator.tick(dt, PointerOffset { x: 0.4, y: -0.2 });
            for particle in &animator.particles {
                assert!(particle.edge_index < edge_count);
                assert!(
                    (0.0..=1.0).contains(&particle.t),
                    "t out of range: {}",
                    particle.t
                );
            }
        }
    }

    #[test]
    fn idle_rotation_is_frame_rate_independent() {
        let total = 9.0_f32;
        let origin = PointerOffset::default();

        let mut at_30 = default_animator();
        for _ in 0..30 {
            at_30.tick(total / 30.0, origin);
        }
        let mut at_60 = default_animator();
        let mut last = SceneSnapshot::default();
        for _ in 0..60 {
            last = at_60.tick(total / 60.0, origin);
        }

        let expected = 0.04 * total;
        assert!((last.yaw - expected).abs() < 1e-4, "yaw: {}", last.yaw);
        assert!((at_30.elapsed() - at_60.elapsed()).abs() < 1e-4);
    }

    #[test]
    fn pointer_applies_parallax_shift() {
        let mut centered = default_animator();
        let mut shifted = default_animator();

        let still = centered.tick(0.016, PointerOffset::default());
        let moved = shifted.tick(0.016, PointerOffset { x: 1.0, y: 0.0 });

        let dx = moved.nodes[0].position.x - still.nodes[0].position.x;
        assert!((dx - 0.045).abs() < 1e-5, "parallax dx: {dx}");
        assert_eq!(moved.nodes[0].position.z, still.nodes[0].position.z);
    }

    #[test]
    fn edge_alpha_stays_within_strength_envelope() {
        let mut animator = default_animator();
        let snapshot = animator.tick(0.5, PointerOffset::default());
        assert_eq!(snapshot.edges.len(), animator.topology.edges.len());
        // pulse ∈ [0,1] ⇒ alpha ∈ [0.25, 0.70] × strength
        for (visual, edge) in snapshot.edges.iter().zip(&animator.topology.edges) {
            let alpha = visual.start_color.into_linear_rgba()[3];
            assert!(alpha >= 0.25 * edge.strength - 1e-6);
            assert!(alpha <= 0.70 * edge.strength + 1e-6);
        }
    }

    #[test]
    fn particle_shimmer_leaves_dominant_channel_alone() {
        let mut animator = triangle_animator(Particle {
            edge_index: 0,
            t: 0.1,
            speed: 0.01,
            size: 0.02,
        });

        // 两个采样点的脉冲相位不同，但主通道 (两个色系都是蓝) 不该漂移
        let first = animator.tick(0.2, PointerOffset::default());
        let second = animator.tick(0.7, PointerOffset::default());

        let blue_first = first.particles[0].color.into_linear_rgba()[2];
        let blue_second = second.particles[0].color.into_linear_rgba()[2];
        assert_eq!(blue_first.to_bits(), blue_second.to_bits());
        assert_ne!(
            first.particles[0].color.into_linear_rgba()[1].to_bits(),
            second.particles[0].color.into_linear_rgba()[1].to_bits(),
            "pulse should still modulate the non-peak channels"
        );
    }

    #[test]
    fn stars_ignore_pointer_and_only_twinkle() {
        let mut centered = default_animator();
        let mut shifted = default_animator();

        let still = centered.tick(0.016, PointerOffset::default());
        let moved = shifted.tick(0.016, PointerOffset { x: 1.0, y: -1.0 });

        assert_eq!(still.stars.len(), 400);
        for (a, b) in still.stars.iter().zip(&moved.stars) {
            // 指针只推动网络，星空纹丝不动
            assert_eq!(a.position, b.position);
            assert_eq!(a.color, b.color);
        }

        let later = centered.tick(2.0, PointerOffset::default());
        let alpha_then = still.stars[0].color.into_linear_rgba()[3];
        let alpha_now = later.stars[0].color.into_linear_rgba()[3];
        assert_ne!(alpha_then.to_bits(), alpha_now.to_bits(), "twinkle is frozen");
        for star in &later.stars {
            let alpha = star.color.into_linear_rgba()[3];
            assert!((0.3 - 1e-6..=0.9 + 1e-6).contains(&alpha), "alpha: {alpha}");
        }
    }

    #[test]
    fn empty_topology_ticks_without_panic() {
        let topology = NetworkTopology {
            nodes: Vec::new(),
            edges: Vec::new(),
            particles: Vec::new(),
        };
        let mut animator = Animator::new(topology, test_palette(), Starfield::default(), Lcg::new(1));
        let snapshot = animator.tick(0.016, PointerOffset { x: 0.5, y: 0.5 });
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.edges.is_empty());
        assert!(snapshot.particles.is_empty());
        assert!(snapshot.stars.is_empty());
    }
}
