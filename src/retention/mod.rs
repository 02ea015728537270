mod manager;
mod score;

pub use manager::{
    DiscardReason, HookOp, HookWarning, RegisterOutcome, RegisterReport, RetainedCheckpoint,
    RetentionConfig, RetentionManager,
};
pub use score::{score_key, ScoreKey, ScoreOrder};
