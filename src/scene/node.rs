use glam::Vec3;

use crate::color::Color;

/// A point in the network graphic. Position, radius and animation timing
/// are fixed at generation; the time-varying activity value is derived
/// every frame and never stored here.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub position: Vec3,
    pub base_radius: f32,
    /// Offset into the activity oscillation, radians.
    pub phase_offset: f32,
    /// Length of one activity oscillation, seconds.
    pub activity_cycle: f32,
    pub color: Color,
}
