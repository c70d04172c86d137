// src/color.rs
// sRGB 调色板颜色，渲染前统一转换到线性空间
use bevy_color::{ColorToComponents, LinearRgba, Mix, Srgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(Srgba);

impl Color {
    /// Parses `#RRGGBB` / `#RGB` style hex strings.
    pub fn from_hex(hex: &str) -> anyhow::Result<Self> {
        let srgba =
            Srgba::hex(hex).map_err(|e| anyhow::anyhow!("invalid palette color {hex:?}: {e:?}"))?;
        Ok(Self(srgba))
    }

    /// Component-wise interpolation between two palette endpoints.
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self(a.0.mix(&b.0, t))
    }

    /// Uniform brightness scale, alpha untouched.
    pub fn scaled(self, factor: f32) -> Self {
        Self(Srgba {
            red: self.0.red * factor,
            green: self.0.green * factor,
            blue: self.0.blue * factor,
            alpha: self.0.alpha,
        })
    }

    /// Shimmer modulation: scales every channel except the brightest,
    /// which stays pinned so the hue does not drift with the pulse.
    pub fn shimmer(self, factor: f32) -> Self {
        let Srgba {
            red,
            green,
            blue,
            alpha,
        } = self.0;
        let peak = red.max(green).max(blue);
        let modulate = |c: f32| if c == peak { c } else { c * factor };
        Self(Srgba {
            red: modulate(red),
            green: modulate(green),
            blue: modulate(blue),
            alpha,
        })
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self(Srgba { alpha, ..self.0 })
    }

    pub fn into_linear_rgba(self) -> [f32; 4] {
        LinearRgba::from(self.0).to_f32_array()
    }

    pub fn into_linear_wgpu_color(self) -> wgpu::Color {
        let linear = LinearRgba::from(self.0);
        wgpu::Color {
            r: linear.red as f64,
            g: linear.green as f64,
            b: linear.blue as f64,
            a: linear.alpha as f64,
        }
    }
}

/// The two palette families of the graphic, parsed out of the config's
/// hex strings once per topology rebuild. `[0]` is the deep endpoint used
/// for edge gradients, `[1]` the light endpoint used for particles.
#[derive(Debug, Clone, Copy)]
pub struct ScenePalette {
    pub primary: [Color; 2],
    pub secondary: [Color; 2],
}

impl ScenePalette {
    pub fn from_config(config: &crate::config::NetworkConfig) -> anyhow::Result<Self> {
        Ok(Self {
            primary: [
                Color::from_hex(&config.palette_a[0])?,
                Color::from_hex(&config.palette_a[1])?,
            ],
            secondary: [
                Color::from_hex(&config.palette_b[0])?,
                Color::from_hex(&config.palette_b[1])?,
            ],
        })
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self(Srgba::rgb_u8(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let violet = Color::from_hex("#8B5CF6").unwrap();
        assert_eq!(violet, Color::from((0x8B, 0x5C, 0xF6)));
    }

    #[test]
    fn lerp_endpoints() {
        let a = Color::from((10, 20, 30));
        let b = Color::from((200, 100, 50));
        assert_eq!(Color::lerp(a, b, 0.0), a);
        assert_eq!(Color::lerp(a, b, 1.0), b);
    }

    #[test]
    fn shimmer_pins_the_peak_channel() {
        // 浅紫端点：蓝是主通道，闪烁时应保持不动
        let violet = Color::from_hex("#A78BFA").unwrap();
        let dimmed = violet.shimmer(0.7);

        let before = violet.into_linear_rgba();
        let after = dimmed.into_linear_rgba();
        assert_eq!(after[2], before[2], "peak channel drifted");
        assert!(after[0] < before[0]);
        assert!(after[1] < before[1]);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        assert!(Color::from_hex("not-a-color").is_err());
    }
}
