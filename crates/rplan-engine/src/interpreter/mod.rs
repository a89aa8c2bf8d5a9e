mod model;
mod shrink;
mod validate;

pub use model::{InterpreterError, ModelInterpreter};
pub use shrink::{shrink_with_inheritance, ShrinkOutcome};
pub use validate::{validate_plan, validate_plan_values, PlanValidationError};
