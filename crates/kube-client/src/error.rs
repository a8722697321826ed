//! Mapping from `kube` errors into the harness cluster error type.

use devops_e2e_core::error::ClusterError;

/// Converts a `kube::Error` for a single object call into a [`ClusterError`].
///
/// - **404**: `ClusterError::NotFound`
/// - **409**: `ClusterError::AlreadyExists`
/// - **403**: `ClusterError::Forbidden`
/// - anything else: `ClusterError::Api`
pub fn map_object_error(err: kube::Error, kind: &str, name: &str) -> ClusterError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => ClusterError::NotFound {
            kind: kind.to_owned(),
            name: name.to_owned(),
        },
        kube::Error::Api(ae) if ae.code == 409 => ClusterError::AlreadyExists {
            kind: kind.to_owned(),
            name: name.to_owned(),
        },
        kube::Error::Api(ae) if ae.code == 403 => {
            ClusterError::Forbidden(format!("{kind} '{name}': {}", ae.message))
        }
        other => ClusterError::Api(format!("{kind} '{name}': {other}")),
    }
}

/// Converts a `kube::Error` for a collection call (list) into a [`ClusterError`].
pub fn map_list_error(err: kube::Error, what: &str) -> ClusterError {
    match err {
        kube::Error::Api(ae) if ae.code == 403 => {
            ClusterError::Forbidden(format!("list {what}: {}", ae.message))
        }
        other => ClusterError::Api(format!("list {what}: {other}")),
    }
}
