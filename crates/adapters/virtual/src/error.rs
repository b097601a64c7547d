//! Errors raised by the virtual device transport.

use scenehub_domain::attribute::AttributeRef;
use scenehub_domain::error::{DeviceOfflineError, SceneHubError};
use scenehub_domain::id::DeviceId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualError {
    #[error("virtual device {0} is offline")]
    Offline(DeviceId),

    #[error("no virtual device {0}")]
    UnknownDevice(DeviceId),

    #[error("attribute {0} is not supported")]
    UnsupportedAttribute(AttributeRef),

    #[error("attribute {attribute} does not accept {value}")]
    InvalidValue {
        attribute: AttributeRef,
        value: String,
    },

    #[error("attribute {0} is read-only")]
    ReadOnly(AttributeRef),
}

impl From<VirtualError> for SceneHubError {
    fn from(err: VirtualError) -> Self {
        match err {
            VirtualError::Offline(device_id) => DeviceOfflineError { device_id }.into(),
            other => Self::Transport(Box::new(other)),
        }
    }
}
