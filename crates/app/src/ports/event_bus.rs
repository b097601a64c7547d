//! Event bus port — publish/subscribe for device events.

use std::future::Future;

use scenehub_domain::error::SceneHubError;
use scenehub_domain::event::DeviceEvent;

/// Publishes device events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: DeviceEvent)
    -> impl Future<Output = Result<(), SceneHubError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: DeviceEvent,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).publish(event)
    }
}
