use rplan_core::{Handle, Resource, ResourcePayload};

/// Whether one process may hold both pairs at the same instant.
pub fn can_exist_together(
    left: &Resource,
    left_handle: Handle,
    right: &Resource,
    right_handle: Handle,
) -> bool {
    if left.id == right.id && left_handle == right_handle {
        return true;
    }
    match (&left.payload, &right.payload) {
        (ResourcePayload::ProcessSession { .. }, ResourcePayload::ProcessSession { .. })
        | (ResourcePayload::ProcessGroup { .. }, ResourcePayload::ProcessGroup { .. }) => {
            return left.id == right.id;
        }
        (ResourcePayload::Vma(left_vma), ResourcePayload::Vma(right_vma)) => {
            let overlap = left_vma.area.end >= right_vma.area.start
                && right_vma.area.end >= left_vma.area.start;
            return !overlap;
        }
        _ => {}
    }
    match (left_handle.fd(), right_handle.fd()) {
        (Some(left_fd), Some(right_fd)) => left_fd != right_fd,
        _ => true,
    }
}

#[cfg(test)]
#[path = "consistency_test.rs"]
mod tests;
