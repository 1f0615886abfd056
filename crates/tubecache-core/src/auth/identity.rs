use async_trait::async_trait;
use parking_lot::RwLock;

/// Source of the active owner id.
///
/// Read once per sync. `None` means nobody is signed in, in which case the
/// coordinator serves the cache without touching the network.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_owner_id(&self) -> Option<String>;
}

/// An identity set directly by the embedding application.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    owner_id: RwLock<Option<String>>,
}

impl StaticIdentity {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: RwLock::new(Some(owner_id.into())),
        }
    }

    /// No one signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Switch accounts (or sign out with `None`).
    pub fn set(&self, owner_id: Option<String>) {
        *self.owner_id.write() = owner_id;
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_owner_id(&self) -> Option<String> {
        self.owner_id.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_identity_switches_owner() {
        let identity = StaticIdentity::new("user-1");
        assert_eq!(identity.current_owner_id().await.as_deref(), Some("user-1"));

        identity.set(Some("user-2".into()));
        assert_eq!(identity.current_owner_id().await.as_deref(), Some("user-2"));

        identity.set(None);
        assert_eq!(identity.current_owner_id().await, None);
        assert_eq!(StaticIdentity::anonymous().current_owner_id().await, None);
    }
}
