//! Cluster Handle Adapters
//!
//! - [`live`]: the control plane through `kube::Api`
//! - [`memory`]: an in-process cluster recording every call

pub mod live;
pub mod memory;

pub use live::*;
pub use memory::*;

use crate::domain::ports::ClusterResourceKey;
use kube::core::ErrorResponse;

/// Whether `err` is a well-formed not-found answer from the API server
///
/// Only this condition authorizes creating an object. Any other failure,
/// including a 404 without the `NotFound` reason, stays an error.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404 && ae.reason == "NotFound")
}

fn status_response(code: u16, reason: &str, message: String) -> ErrorResponse {
    ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }
}

/// The response an API server gives for a missing object
pub fn not_found_response(key: &ClusterResourceKey) -> ErrorResponse {
    status_response(
        404,
        "NotFound",
        format!("{} \"{}\" not found", key.kind, key.name),
    )
}

/// The response an API server gives when creating a duplicate object
pub fn already_exists_response(key: &ClusterResourceKey) -> ErrorResponse {
    status_response(
        409,
        "AlreadyExists",
        format!("{} \"{}\" already exists", key.kind, key.name),
    )
}
