use authwatch_audit_types::{Alert, AlertId, NewAlert, Severity};
use authwatch_database::{AlertStore, DbResult};
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Buffered alerts per subscriber before the slowest one starts lagging.
pub const ALERT_CHANNEL_CAPACITY: usize = 256;

/// Result of raising an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaiseOutcome {
    /// A new alert was stored.
    Raised(Alert),
    /// An unresolved alert of the same type and principal is still within
    /// the dedup window; nothing changed.
    Suppressed,
}

/// Alert lifecycle: create with dedup, resolve, list.
pub struct AlertManager {
    store: Arc<dyn AlertStore>,
    dedup_window: Duration,
    sender: broadcast::Sender<Alert>,
}

impl AlertManager {
    pub fn new(store: Arc<dyn AlertStore>, dedup_window: Duration) -> Self {
        let (sender, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            store,
            dedup_window,
            sender,
        }
    }

    /// Receive every alert created from now on.
    ///
    /// A receiver that falls behind loses the oldest alerts rather than
    /// slowing ingestion.
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.sender.subscribe()
    }

    /// Store the alert unless an active duplicate exists.
    pub async fn raise(&self, alert: NewAlert) -> DbResult<RaiseOutcome> {
        match self.store.insert_unless_active(alert, self.dedup_window).await? {
            Some(alert) => {
                log_alert(&alert);
                // No receivers is fine.
                let _ = self.sender.send(alert.clone());
                Ok(RaiseOutcome::Raised(alert))
            }
            None => Ok(RaiseOutcome::Suppressed),
        }
    }

    /// Mark an alert resolved. Unknown or already-resolved ids are a no-op.
    pub async fn resolve(&self, id: AlertId) -> DbResult<bool> {
        let changed = self.store.resolve(id).await?;
        if changed {
            info!(alert_id = %id, "Alert resolved");
        }
        Ok(changed)
    }

    pub async fn get(&self, id: AlertId) -> DbResult<Option<Alert>> {
        self.store.get(id).await
    }

    /// Unresolved alerts, newest first.
    pub async fn list_active(&self) -> DbResult<Vec<Alert>> {
        self.store.list_active().await
    }
}

fn log_alert(alert: &Alert) {
    match alert.severity {
        Severity::Critical => error!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            principal = %alert.principal,
            description = %alert.description,
            "CRITICAL ALERT"
        ),
        Severity::High => warn!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            principal = %alert.principal,
            description = %alert.description,
            "HIGH ALERT"
        ),
        Severity::Medium | Severity::Low => info!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            principal = %alert.principal,
            description = %alert.description,
            "Alert raised"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authwatch_audit_types::AlertType;
    use authwatch_database::{DatabasePool, SqliteAlertStore};
    use authwatch_test_utils::at;

    async fn manager() -> AlertManager {
        let db = DatabasePool::open_in_memory().await.unwrap();
        AlertManager::new(Arc::new(SqliteAlertStore::new(&db)), Duration::hours(1))
    }

    fn alert(principal: &str, minute: u32) -> NewAlert {
        NewAlert::new(AlertType::RapidFire, principal, "Detected 10 attempts in 1 minute", at(3, minute, 0))
    }

    #[tokio::test]
    async fn test_raise_then_suppress() {
        let manager = manager().await;
        let first = manager.raise(alert("bot", 0)).await.unwrap();
        assert!(matches!(first, RaiseOutcome::Raised(ref a) if a.severity == Severity::Critical));
        assert_eq!(manager.raise(alert("bot", 10)).await.unwrap(), RaiseOutcome::Suppressed);
    }

    #[tokio::test]
    async fn test_subscribers_see_new_alerts_only() {
        let manager = manager().await;
        let mut rx = manager.subscribe();

        manager.raise(alert("bot", 0)).await.unwrap();
        manager.raise(alert("bot", 1)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.principal, "bot");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_raise_without_subscribers() {
        let manager = manager().await;
        assert!(matches!(manager.raise(alert("bot", 0)).await.unwrap(), RaiseOutcome::Raised(_)));
    }

    #[tokio::test]
    async fn test_resolve_lifecycle() {
        let manager = manager().await;
        let RaiseOutcome::Raised(raised) = manager.raise(alert("bot", 0)).await.unwrap() else {
            panic!("expected a new alert");
        };

        assert_eq!(manager.list_active().await.unwrap().len(), 1);
        assert!(manager.resolve(raised.id).await.unwrap());
        assert!(!manager.resolve(raised.id).await.unwrap());
        assert!(manager.list_active().await.unwrap().is_empty());
        assert!(manager.get(raised.id).await.unwrap().unwrap().resolved);
    }
}
