//! Cloud control-plane error types

use thiserror::Error;

/// Errors reported by the cloud control plane or by resolution logic
/// running against it.
///
/// Expected "not found" lookups are modeled as `Option` results on
/// [`crate::CloudClient`], never as errors. Idempotent deletes treat an
/// already-absent resource as success, so there is no "absent" variant here.
#[derive(Error, Debug)]
pub enum CloudError {
    /// Malformed input configuration. Raised before any resource mutation.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A named network- or application-security-group was not found in any
    /// of the searched resource groups.
    #[error("Cannot find the security group '{name}' in resource groups {searched:?}")]
    SecurityGroupNotFound { name: String, searched: Vec<String> },

    /// An accepted asynchronous operation reached a failed terminal state
    /// when polled. Transient: retried exactly once at the VM-create step.
    #[error("Asynchronous {operation} operation finished with status '{status}'")]
    AsyncOperationFailed { operation: String, status: String },

    /// Terminal provisioning failure, after retry exhaustion or a
    /// non-transient error. The original failure is preserved as the source.
    #[error("Provisioning of VM '{vm_name}' failed: {source}")]
    ProvisioningFailed {
        vm_name: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Invalid instance id '{0}': expected <resource-group>/<vm|vmss>/<name>")]
    InvalidInstanceId(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether this is the transient asynchronous-operation failure class,
    /// eligible for the single retry at VM-create time.
    pub fn is_transient_async_failure(&self) -> bool {
        matches!(self, CloudError::AsyncOperationFailed { .. })
    }

    pub fn async_failed(operation: impl Into<String>, status: impl Into<String>) -> Self {
        CloudError::AsyncOperationFailed {
            operation: operation.into(),
            status: status.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
