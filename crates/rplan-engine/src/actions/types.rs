use rplan_core::{Handle, Pid, ResourceId, ResourceTable};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Index of an action vertex inside an `ActionGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub usize);

impl Display for ActionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fork,
    Create,
    Share,
    Remove,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [Self::Fork, Self::Create, Self::Share, Self::Remove];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fork => "fork",
            Self::Create => "create",
            Self::Share => "share",
            Self::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Fork {
        parent: Pid,
        child: Pid,
    },
    Create {
        process: Pid,
        resource: ResourceId,
        handles: Vec<Handle>,
    },
    Share {
        process_from: Pid,
        process_to: Pid,
        resource: ResourceId,
        handle_from: Handle,
        handle_to: Handle,
    },
    Remove {
        process: Pid,
        resource: ResourceId,
        handle: Handle,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Fork { .. } => ActionKind::Fork,
            Self::Create { .. } => ActionKind::Create,
            Self::Share { .. } => ActionKind::Share,
            Self::Remove { .. } => ActionKind::Remove,
        }
    }

    /// The process that performs the action.
    pub fn executor(&self) -> Pid {
        match self {
            Self::Fork { parent, .. } => *parent,
            Self::Create { process, .. } | Self::Remove { process, .. } => *process,
            Self::Share { process_from, .. } => *process_from,
        }
    }

    /// Processes that must exist when the action runs. A fork involves only
    /// its parent; the child comes into existence through it.
    pub fn involved(&self) -> Vec<Pid> {
        match self {
            Self::Share {
                process_from,
                process_to,
                ..
            } if process_from != process_to => vec![*process_from, *process_to],
            _ => vec![self.executor()],
        }
    }

    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::Fork { .. } => None,
            Self::Create { resource, .. }
            | Self::Share { resource, .. }
            | Self::Remove { resource, .. } => Some(*resource),
        }
    }

    /// Renders the action with resource labels from `resources`.
    pub fn describe(&self, resources: &ResourceTable) -> String {
        let label = |id: &ResourceId| {
            resources
                .get(*id)
                .map(|resource| resource.label())
                .unwrap_or_else(|| id.to_string())
        };
        match self {
            Self::Fork { parent, child } => format!("fork {parent} -> {child}"),
            Self::Create {
                process,
                resource,
                handles,
            } => {
                let handles = handles
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("create {} in {process} [{handles}]", label(resource))
            }
            Self::Share {
                process_from,
                process_to,
                resource,
                handle_from,
                handle_to,
            } => format!(
                "share {} {process_from} [{handle_from}] -> {process_to} [{handle_to}]",
                label(resource)
            ),
            Self::Remove {
                process,
                resource,
                handle,
            } => format!("remove {} from {process} [{handle}]", label(resource)),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe(&ResourceTable::default()))
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
