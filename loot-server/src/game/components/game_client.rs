use crossbeam_channel::Sender;

use loot_game_common::messages::server::ServerMessage;

pub struct GameClient {
    pub server_message_tx: Sender<ServerMessage>,
}

impl GameClient {
    pub fn new(server_message_tx: Sender<ServerMessage>) -> Self {
        Self { server_message_tx }
    }
}
