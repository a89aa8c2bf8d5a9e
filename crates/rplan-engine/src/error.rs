use crate::actions::Action;
use crate::interpreter::{InterpreterError, PlanValidationError};
use rplan_core::{Handle, HandleKind, Pid, ResourceId, SnapshotError, TreeError};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("resource {resource} has no holder")]
    OrphanResource { resource: ResourceId },
    #[error("no process in the tree can create resource {resource}")]
    ImpossibleToCreate { resource: ResourceId },
    #[error("inherited-only resource {resource} needs more than one handle kind")]
    MultiHandleInheritanceUnsupported { resource: ResourceId },
    #[error("private resource {resource} must have exactly one holder, found {holders:?}")]
    PrivateResourceHolders { resource: ResourceId, holders: Vec<Pid> },
    #[error("creator {process} of resource {resource} holds no {missing:?} handle")]
    InsufficientHandlesForCreate {
        process: Pid,
        resource: ResourceId,
        missing: HandleKind,
    },
    #[error("no action obtains {resource} at {handle} in process {process}")]
    NoProperObtainAction {
        process: Pid,
        resource: ResourceId,
        handle: Handle,
    },
    #[error("resource {resource} has more than one create action")]
    DuplicateCreateForResource { resource: ResourceId },
    #[error("precedence graph is not acyclic ({} actions in cycle)", .cycle.len())]
    NotAcyclic { cycle: Vec<Action> },
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("interpreter error: {0}")]
    Interpreter(#[from] InterpreterError),
    #[error("plan validation failed: {0}")]
    Validation(#[from] PlanValidationError),
}
