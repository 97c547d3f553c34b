/// Events emitted during a simulation tick.
/// Sound and animation collaborators consume these; the simulation never
/// reads them back.

use crate::domain::entity::{EntityId, Position};

#[derive(Clone, PartialEq, Debug)]
pub enum GameEvent {
    DirtEaten { at: Position },
    CollectablePicked { at: Position, collected: u32, required: u32 },
    ExitOpened,
    LevelExited,
    BoulderPushed { id: EntityId, to: Position },
    EnemyCrushed { id: EntityId, at: Position },
    PlayerCrushed,
    PlayerKilled,
    TimeRanOut,
}

impl GameEvent {
    /// Sound cue name for this event, if any.
    pub fn sound(&self) -> Option<&'static str> {
        match self {
            GameEvent::DirtEaten { .. } => Some("eat-dirt"),
            GameEvent::CollectablePicked { .. } => Some("eat-grub"),
            GameEvent::ExitOpened => Some("open-door"),
            GameEvent::LevelExited => Some("exit-level"),
            GameEvent::EnemyCrushed { .. } => Some("fox-death"),
            GameEvent::PlayerCrushed => Some("death"),
            _ => None,
        }
    }
}
