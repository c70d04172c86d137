/// A proximity-derived connection between two nodes.
///
/// Indices point into the topology's node list, `from < to`. Strength is
/// `1 - distance / threshold`, so closer pairs render brighter.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub strength: f32,
}
