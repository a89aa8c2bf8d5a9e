mod generate;
mod index;
mod types;

pub use generate::generate_actions;
pub use index::ActionsIndex;
pub use types::{Action, ActionId, ActionKind};
