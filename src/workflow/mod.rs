pub mod item_ctx;
pub mod restore_flow;

pub use item_ctx::ItemCtx;
pub use restore_flow::{ItemOutcome, RestoreFlow, SkipReason};
