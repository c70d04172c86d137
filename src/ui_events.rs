use crate::animator::PointerOffset;
use crate::app_state::State;
use crate::config::NetworkConfig;

#[allow(unused)]
#[derive(Debug)]
pub enum UserCommand {
    /// Latest normalized pointer sample from the host page, both axes in
    /// [-1, 1]. A background canvas usually has `pointer-events: none`,
    /// so the page forwards its own mousemove events here.
    SetPointerOffset { x: f32, y: f32 },
    /// Replace generation parameters and rebuild the whole topology.
    SetConfig(NetworkConfig),
    /// Rebuild with the current parameters under a different seed.
    Regenerate { seed: u32 },
    StateInitialized, // Notifies App that State setup is complete
}

impl State {
    pub fn process_command(&mut self, command: UserCommand) {
        match command {
            UserCommand::SetPointerOffset { x, y } => {
                self.pointer = PointerOffset {
                    x: x.clamp(-1.0, 1.0),
                    y: y.clamp(-1.0, 1.0),
                };
            }
            UserCommand::SetConfig(network_config) => {
                log::info!(
                    "Applying config: {} nodes, {} particles, threshold {}.",
                    network_config.node_count,
                    network_config.particle_count,
                    network_config.edge_threshold
                );
                // 配置无效时保留当前场景继续运行
                if let Err(e) = self.rebuild_network(network_config) {
                    log::error!("Rejected config, keeping current scene: {e:#}");
                }
            }
            UserCommand::Regenerate { seed } => {
                let mut network_config = self.network_config.clone();
                network_config.seed = seed;
                if let Err(e) = self.rebuild_network(network_config) {
                    log::error!("Regenerate with seed {seed} failed: {e:#}");
                }
            }
            UserCommand::StateInitialized => {
                // This command is handled in App::user_event
            }
        }
    }
}
