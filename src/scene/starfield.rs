use glam::Vec3;

use crate::config::NetworkConfig;
use crate::rng::Lcg;

// 星星落在包裹整个网络的厚球壳里，远在网络之外
const STAR_SHELL_RADIUS_MIN: f32 = 15.0;
const STAR_SHELL_RADIUS_SPAN: f32 = 30.0;
const STAR_SIZE_MIN: f32 = 0.08;
const STAR_SIZE_SPAN: f32 = 0.10;

// 星场和网络共用配置种子，但走独立的随机流，
// 改星星数量不会动到网络的节点布局
const STREAM_SALT: u32 = 0x9E37_79B9;

#[derive(Debug, Clone, Copy)]
pub struct Star {
    pub position: Vec3,
    /// Twinkle phase offset in radians.
    pub phase: f32,
    pub size: f32,
}

/// Static backdrop dots behind the network. Generated once per config,
/// never rotated or parallax-shifted; only their brightness animates.
#[derive(Debug, Clone, Default)]
pub struct Starfield {
    pub stars: Vec<Star>,
}

impl Starfield {
    /// Deterministic for a given config, like the network itself.
    pub fn generate(config: &NetworkConfig) -> Self {
        let mut rng = Lcg::new(config.seed ^ STREAM_SALT);

        let mut stars = Vec::with_capacity(config.star_count);
        for _ in 0..config.star_count {
            let theta = rng.next_f32() * std::f32::consts::TAU;
            let phi = (2.0 * rng.next_f32() - 1.0).acos();
            let r = rng.range(STAR_SHELL_RADIUS_MIN, STAR_SHELL_RADIUS_SPAN);

            stars.push(Star {
                position: Vec3::new(
                    r * phi.sin() * theta.cos(),
                    r * phi.sin() * theta.sin(),
                    r * phi.cos(),
                ),
                phase: rng.next_f32() * std::f32::consts::TAU,
                size: rng.range(STAR_SIZE_MIN, STAR_SIZE_SPAN),
            });
        }

        Self { stars }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let config = NetworkConfig::default();
        let a = Starfield::generate(&config);
        let b = Starfield::generate(&config);

        assert_eq!(a.stars.len(), 400);
        for (left, right) in a.stars.iter().zip(&b.stars) {
            assert_eq!(left.position.x.to_bits(), right.position.x.to_bits());
            assert_eq!(left.position.y.to_bits(), right.position.y.to_bits());
            assert_eq!(left.position.z.to_bits(), right.position.z.to_bits());
            assert_eq!(left.phase.to_bits(), right.phase.to_bits());
        }
    }

    #[test]
    fn stars_stay_inside_their_shell() {
        let field = Starfield::generate(&NetworkConfig::default());
        for star in &field.stars {
            let r = star.position.length();
            assert!(
                (STAR_SHELL_RADIUS_MIN..STAR_SHELL_RADIUS_MIN + STAR_SHELL_RADIUS_SPAN + 1e-3)
                    .contains(&r),
                "star outside shell: r = {r}"
            );
            assert!(star.size >= STAR_SIZE_MIN);
        }
    }

    #[test]
    fn star_count_zero_disables_the_layer() {
        let field = Starfield::generate(&NetworkConfig {
            star_count: 0,
            ..Default::default()
        });
        assert!(field.stars.is_empty());
    }

    #[test]
    fn star_stream_does_not_disturb_the_network() {
        // 同一种子下，星星数量不同，网络必须逐位一致
        let base = crate::scene::network::NetworkTopology::generate(&NetworkConfig::default())
            .unwrap();
        let other = crate::scene::network::NetworkTopology::generate(&NetworkConfig {
            star_count: 10,
            ..Default::default()
        })
        .unwrap();
        for (l, r) in base.nodes.iter().zip(&other.nodes) {
            assert_eq!(l.position.x.to_bits(), r.position.x.to_bits());
        }
    }
}
