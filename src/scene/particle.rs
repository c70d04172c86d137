/// A light mote travelling along one edge.
///
/// The only per-frame mutable state in the topology: `t` advances by
/// `speed * dt` and wraps past 1.0 onto a freshly chosen edge.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub edge_index: usize,
    /// Progress along the current edge, [0, 1].
    pub t: f32,
    /// Edge lengths per second.
    pub speed: f32,
    pub size: f32,
}
