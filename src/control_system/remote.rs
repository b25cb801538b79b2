use serde::{Deserialize, Serialize};

use crate::peripherals::RemoteLink;

/// Single-byte operator commands. No framing; anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteCommand {
    /// `'1'`: force a change to junction 1.
    TriggerJunctionOne,
    /// `'2'`: force a change to junction 2.
    TriggerJunctionTwo,
    /// `'P'`: force the pedestrian phase.
    TriggerPedestrian,
    /// `'C'`: recalibrate both presence sensors.
    Recalibrate,
    /// `'S'`: emergency stop.
    EmergencyStop,
    /// `'G'`: resume after an emergency stop.
    Resume,
}

impl RemoteCommand {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Self::TriggerJunctionOne),
            b'2' => Some(Self::TriggerJunctionTwo),
            b'P' => Some(Self::TriggerPedestrian),
            b'C' => Some(Self::Recalibrate),
            b'S' => Some(Self::EmergencyStop),
            b'G' => Some(Self::Resume),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::TriggerJunctionOne => b'1',
            Self::TriggerJunctionTwo => b'2',
            Self::TriggerPedestrian => b'P',
            Self::Recalibrate => b'C',
            Self::EmergencyStop => b'S',
            Self::Resume => b'G',
        }
    }

    fn acknowledgement(self) -> &'static str {
        match self {
            Self::TriggerJunctionOne => "OK J1 requested",
            Self::TriggerJunctionTwo => "OK J2 requested",
            Self::TriggerPedestrian => "OK crossing requested",
            Self::Recalibrate => "OK sensors recalibrated",
            Self::EmergencyStop => "STOPPED send G to resume",
            Self::Resume => "RESUMED",
        }
    }
}

/// Reads the operator link and turns bytes into commands.
pub struct RemoteCommandHandler {
    link: Box<dyn RemoteLink>,
}

impl RemoteCommandHandler {
    pub fn new(link: Box<dyn RemoteLink>) -> Self {
        Self { link }
    }

    /// Next recognised command waiting on the link, skipping unknown bytes.
    pub fn next_command(&mut self) -> Option<RemoteCommand> {
        while let Some(byte) = self.link.try_read_byte() {
            match RemoteCommand::from_byte(byte) {
                Some(command) => return Some(command),
                None => log::trace!("Ignoring remote byte {:#04x}", byte),
            }
        }
        None
    }

    /// Tells the operator that a command took effect.
    pub fn acknowledge(&mut self, command: RemoteCommand) {
        self.link.write_line(command.acknowledgement());
    }
}
