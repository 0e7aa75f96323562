use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;

use super::types::Command;

/// Queue between input handling and the transport
pub struct CommandBus {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl CommandBus {
    pub fn new() -> Self {
        let (tx, rx) = bounded(256);
        Self { tx, rx }
    }

    /// Get a sender that can be cloned and shared
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Drain everything queued so far
    pub fn drain(&self) -> Vec<Command> {
        self.rx.try_iter().collect()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sender for dispatching commands
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// Send a command (non-blocking, drops if buffer full)
    pub fn send(&self, cmd: Command) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                warn!("Command buffer full, dropping: {}", cmd.description());
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_order() {
        let bus = CommandBus::new();
        let sender = bus.sender();
        assert!(sender.send(Command::SetBpm(100)));
        assert!(sender.clone().send(Command::TogglePlay));

        assert_eq!(bus.drain(), vec![Command::SetBpm(100), Command::TogglePlay]);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn full_buffer_drops() {
        let bus = CommandBus::new();
        let sender = bus.sender();
        for _ in 0..256 {
            assert!(sender.send(Command::Stop));
        }
        assert!(!sender.send(Command::Stop));
    }
}
