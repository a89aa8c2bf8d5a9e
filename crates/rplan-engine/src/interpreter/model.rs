use crate::actions::{Action, ActionKind};
use rplan_core::{Handle, Pid, ResourceId, ResourceTable, ROOT_PID};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpreterError {
    #[error("process {pid} does not hold {resource} at {handle}")]
    ResourceDoesNotExist {
        pid: Pid,
        resource: ResourceId,
        handle: Handle,
    },
    #[error("process {pid} already holds {resource} at {handle} on create")]
    ResourceAlreadyExistsOnCreate {
        pid: Pid,
        resource: ResourceId,
        handle: Handle,
    },
    #[error("process {pid} already holds {resource} at {handle} on share")]
    ResourceAlreadyExistsOnShare {
        pid: Pid,
        resource: ResourceId,
        handle: Handle,
    },
    #[error("executor {0} does not exist")]
    ExecutorDoesNotExist(Pid),
    #[error("process {0} was already forked")]
    ProcessAlreadyForked(Pid),
    #[error("involved process {0} does not exist")]
    InvolvedProcessDoesNotExist(Pid),
    #[error("unknown action kind `{0}`")]
    UnknownActionKind(String),
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
    #[error("invalid action record: {0}")]
    InvalidRecord(String),
}

/// Simulated process table used to replay plans. Starts with the synthetic
/// root holding nothing.
#[derive(Debug, Clone)]
pub struct ModelInterpreter<'a> {
    resources: &'a ResourceTable,
    processes: BTreeMap<Pid, BTreeSet<(ResourceId, Handle)>>,
}

impl<'a> ModelInterpreter<'a> {
    pub fn new(resources: &'a ResourceTable) -> Self {
        Self {
            resources,
            processes: BTreeMap::from([(ROOT_PID, BTreeSet::new())]),
        }
    }

    pub fn processes(&self) -> &BTreeMap<Pid, BTreeSet<(ResourceId, Handle)>> {
        &self.processes
    }

    pub fn holdings(&self, pid: Pid) -> Option<&BTreeSet<(ResourceId, Handle)>> {
        self.processes.get(&pid)
    }

    pub fn execute(&mut self, action: &Action) -> Result<(), InterpreterError> {
        match action {
            Action::Fork { parent, child } => {
                let Some(held) = self.processes.get(parent) else {
                    return Err(InterpreterError::ExecutorDoesNotExist(*parent));
                };
                if self.processes.contains_key(child) {
                    return Err(InterpreterError::ProcessAlreadyForked(*child));
                }
                let mut inherited = BTreeSet::new();
                for (resource, handle) in held {
                    let entry = self
                        .resources
                        .get(*resource)
                        .ok_or(InterpreterError::UnknownResource(*resource))?;
                    if entry.is_inherited() {
                        inherited.insert((*resource, *handle));
                    }
                }
                self.processes.insert(*child, inherited);
            }
            Action::Create {
                process,
                resource,
                handles,
            } => {
                if self.resources.get(*resource).is_none() {
                    return Err(InterpreterError::UnknownResource(*resource));
                }
                let held = self
                    .processes
                    .get_mut(process)
                    .ok_or(InterpreterError::ExecutorDoesNotExist(*process))?;
                if let Some(handle) = handles
                    .iter()
                    .find(|handle| held.contains(&(*resource, **handle)))
                {
                    return Err(InterpreterError::ResourceAlreadyExistsOnCreate {
                        pid: *process,
                        resource: *resource,
                        handle: *handle,
                    });
                }
                held.extend(handles.iter().map(|handle| (*resource, *handle)));
            }
            Action::Share {
                process_from,
                process_to,
                resource,
                handle_from,
                handle_to,
            } => {
                let source = self
                    .processes
                    .get(process_from)
                    .ok_or(InterpreterError::ExecutorDoesNotExist(*process_from))?;
                let source_holds = source.contains(&(*resource, *handle_from));
                let destination = self
                    .processes
                    .get_mut(process_to)
                    .ok_or(InterpreterError::InvolvedProcessDoesNotExist(*process_to))?;
                if !source_holds {
                    return Err(InterpreterError::ResourceDoesNotExist {
                        pid: *process_from,
                        resource: *resource,
                        handle: *handle_from,
                    });
                }
                if !destination.insert((*resource, *handle_to)) {
                    return Err(InterpreterError::ResourceAlreadyExistsOnShare {
                        pid: *process_to,
                        resource: *resource,
                        handle: *handle_to,
                    });
                }
            }
            Action::Remove {
                process,
                resource,
                handle,
            } => {
                let held = self
                    .processes
                    .get_mut(process)
                    .ok_or(InterpreterError::ExecutorDoesNotExist(*process))?;
                if !held.remove(&(*resource, *handle)) {
                    return Err(InterpreterError::ResourceDoesNotExist {
                        pid: *process,
                        resource: *resource,
                        handle: *handle,
                    });
                }
            }
        }
        Ok(())
    }

    /// Replays a raw JSON action record, as read from a plan file.
    pub fn execute_value(&mut self, record: &Value) -> Result<Action, InterpreterError> {
        let kind = record
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| InterpreterError::InvalidRecord("missing `type`".to_string()))?;
        if !ActionKind::ALL.iter().any(|known| known.as_str() == kind) {
            return Err(InterpreterError::UnknownActionKind(kind.to_string()));
        }
        let action = serde_json::from_value::<Action>(record.clone())
            .map_err(|error| InterpreterError::InvalidRecord(error.to_string()))?;
        self.execute(&action)?;
        Ok(action)
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
