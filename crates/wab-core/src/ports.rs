use async_trait::async_trait;

use crate::Result;

/// Subscriber for feature-flag changes made through the config store.
///
/// Modules that keep an in-memory copy of a flag subscribe here instead of being
/// poked directly. No subscribers simply means no listeners.
pub trait FeatureObserver: Send + Sync {
    fn on_feature_changed(&self, name: &str, enabled: bool);
}

impl<F> FeatureObserver for F
where
    F: Fn(&str, bool) + Send + Sync,
{
    fn on_feature_changed(&self, name: &str, enabled: bool) {
        self(name, enabled)
    }
}

/// Hexagonal port for mapping a JID from any identifier space (phone number,
/// linked-device id, ...) to one canonical user id.
///
/// Implemented by the chat-protocol adapter, which owns the directory lookups.
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    /// `Ok(None)` when the directory has no mapping for `jid`.
    async fn resolve(&self, jid: &str) -> Result<Option<String>>;
}
