use rmfs_core::{BotId, PodId};
use rmfs_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("pod {pod} is not available to bot {bot}")]
    PodUnavailable { pod: PodId, bot: BotId },

    #[error("bot {bot} has no augmentable task")]
    NoAugmentableTask { bot: BotId },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type ControlResult<T> = Result<T, ControlError>;
