//! Registry of mounted insights views.
//!
//! Each view belongs to the session that mounted it. Mounting starts the one
//! record fetch for the view in the background; the result lands through
//! `InsightsView::complete_load`, which ignores it once the view is gone.
//! Views nobody has read for a while are evicted, and a session keeps at most
//! `MAX_VIEWS_PER_SESSION` of them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use clearcoa_models::CoaRecord;
use clearcoa_utils::insights::InsightsView;
use clearcoa_utils::{CoaError, CoaResult};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::SessionContext;

pub type SharedView = Arc<Mutex<InsightsView>>;

pub const MAX_VIEWS_PER_SESSION: usize = 8;

struct ViewEntry {
    session_id: Uuid,
    view: SharedView,
    // Unix millis of the last mount or lookup
    last_access: AtomicI64,
}

impl ViewEntry {
    fn touch(&self) {
        self.last_access
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn last_access(&self) -> i64 {
        self.last_access.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Default)]
pub struct InsightsRegistry {
    views: Arc<RwLock<HashMap<Uuid, ViewEntry>>>,
}

impl InsightsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a view for the session's organization and start loading it.
    ///
    /// `fetch` receives the organization id. The returned handle resolves
    /// to whether the fetch result was applied.
    pub async fn mount<F, Fut>(&self, session: &SessionContext, fetch: F) -> (Uuid, JoinHandle<bool>)
    where
        F: FnOnce(Uuid) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Vec<CoaRecord>>> + Send + 'static,
    {
        let view_id = Uuid::new_v4();
        let organization_id = session.organization_id;

        let mut view = InsightsView::new(organization_id);
        let ticket = view.begin_load();
        let view = Arc::new(Mutex::new(view));

        let displaced = {
            let mut views = self.views.write().await;
            let displaced = Self::oldest_over_limit(&views, session.session_id)
                .and_then(|id| views.remove(&id).map(|entry| (id, entry)));
            views.insert(
                view_id,
                ViewEntry {
                    session_id: session.session_id,
                    view: view.clone(),
                    last_access: AtomicI64::new(Utc::now().timestamp_millis()),
                },
            );
            displaced
        };
        if let Some((displaced_id, entry)) = displaced {
            entry.view.lock().await.unmount();
            info!(view_id = %displaced_id, "Insights view displaced by a newer mount");
        }
        info!(%view_id, %organization_id, "Insights view mounted");

        let handle = tokio::spawn(async move {
            let result = fetch(organization_id).await.map_err(|e| {
                warn!(%view_id, %organization_id, error = %e, "Insights record fetch failed");
                format!("Failed to load COA data: {}", e)
            });
            view.lock().await.complete_load(ticket, result)
        });

        (view_id, handle)
    }

    /// The view, if it exists and was mounted by this session.
    pub async fn get(&self, session: &SessionContext, view_id: Uuid) -> CoaResult<SharedView> {
        let views = self.views.read().await;
        views
            .get(&view_id)
            .filter(|entry| entry.session_id == session.session_id)
            .map(|entry| {
                entry.touch();
                entry.view.clone()
            })
            .ok_or_else(|| CoaError::not_found(format!("insights view {}", view_id)))
    }

    pub async fn unmount(&self, session: &SessionContext, view_id: Uuid) -> CoaResult<()> {
        let entry = {
            let mut views = self.views.write().await;
            match views.get(&view_id) {
                Some(entry) if entry.session_id == session.session_id => views.remove(&view_id),
                _ => None,
            }
        };

        let entry = entry.ok_or_else(|| CoaError::not_found(format!("insights view {}", view_id)))?;
        entry.view.lock().await.unmount();
        info!(%view_id, "Insights view unmounted");
        Ok(())
    }

    /// Unmount everything a session mounted; used on sign-out and session purge.
    pub async fn unmount_session(&self, session_id: Uuid) -> usize {
        self.unmount_where(|entry| entry.session_id == session_id).await
    }

    /// Unmount views that have not been mounted or read within `max_idle`.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = (Utc::now() - max_idle).timestamp_millis();
        self.unmount_where(|entry| entry.last_access() <= cutoff).await
    }

    async fn unmount_where(&self, predicate: impl Fn(&ViewEntry) -> bool) -> usize {
        let removed: Vec<ViewEntry> = {
            let mut views = self.views.write().await;
            let ids: Vec<Uuid> = views
                .iter()
                .filter(|(_, entry)| predicate(entry))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| views.remove(id)).collect()
        };

        for entry in &removed {
            entry.view.lock().await.unmount();
        }
        removed.len()
    }

    /// The least recently used view of a session that is already at its limit.
    fn oldest_over_limit(views: &HashMap<Uuid, ViewEntry>, session_id: Uuid) -> Option<Uuid> {
        let owned: Vec<(&Uuid, &ViewEntry)> = views
            .iter()
            .filter(|(_, entry)| entry.session_id == session_id)
            .collect();
        if owned.len() < MAX_VIEWS_PER_SESSION {
            return None;
        }
        owned
            .into_iter()
            .min_by_key(|(_, entry)| entry.last_access())
            .map(|(id, _)| *id)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.views.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clearcoa_models::TestOutcome;
    use clearcoa_utils::insights::ViewState;
    use tokio::sync::oneshot;

    fn session() -> SessionContext {
        SessionContext {
            session_id: Uuid::new_v4(),
            tenant_id: "tenant-a".to_string(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_email: "qa@acme.com".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn failing_record(org: Uuid) -> CoaRecord {
        CoaRecord::new(org)
            .with_supplier("Acme")
            .with_product("Resin")
            .with_test("pH")
            .with_result(TestOutcome::Fail)
            .with_date("2024-01-15")
    }

    #[tokio::test]
    async fn test_mount_loads_records() {
        let registry = InsightsRegistry::new();
        let session = session();

        let (view_id, handle) = registry
            .mount(&session, |org| async move { Ok(vec![failing_record(org)]) })
            .await;
        assert!(handle.await.unwrap());

        let view = registry.get(&session, view_id).await.unwrap();
        let snapshot = view.lock().await.snapshot();
        assert_eq!(snapshot.state, ViewState::Ready);
        assert_eq!(snapshot.total_records, 1);
    }

    #[tokio::test]
    async fn test_view_is_loading_until_fetch_resolves() {
        let registry = InsightsRegistry::new();
        let session = session();
        let (release, gate) = oneshot::channel::<()>();

        let (view_id, handle) = registry
            .mount(&session, |org| async move {
                let _ = gate.await;
                Ok(vec![failing_record(org)])
            })
            .await;

        let view = registry.get(&session, view_id).await.unwrap();
        assert_eq!(view.lock().await.snapshot().state, ViewState::Loading);

        release.send(()).unwrap();
        assert!(handle.await.unwrap());
        assert_eq!(view.lock().await.snapshot().state, ViewState::Ready);
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_error_state() {
        let registry = InsightsRegistry::new();
        let session = session();

        let (view_id, handle) = registry
            .mount(&session, |_| async move { Err(anyhow::anyhow!("connection refused")) })
            .await;
        assert!(handle.await.unwrap());

        let view = registry.get(&session, view_id).await.unwrap();
        let snapshot = view.lock().await.snapshot();
        assert_eq!(snapshot.state, ViewState::Error);
        assert!(snapshot.error.unwrap().contains("connection refused"));
        assert!(snapshot.insights.is_none());
    }

    #[tokio::test]
    async fn test_late_result_after_unmount_is_discarded() {
        let registry = InsightsRegistry::new();
        let session = session();
        let (release, gate) = oneshot::channel::<()>();

        let (view_id, handle) = registry
            .mount(&session, |org| async move {
                let _ = gate.await;
                Ok(vec![failing_record(org)])
            })
            .await;
        let view = registry.get(&session, view_id).await.unwrap();

        registry.unmount(&session, view_id).await.unwrap();
        release.send(()).unwrap();

        assert!(!handle.await.unwrap());
        assert!(view.lock().await.is_loading());
        assert!(registry.get(&session, view_id).await.is_err());
    }

    #[tokio::test]
    async fn test_views_are_private_to_their_session() {
        let registry = InsightsRegistry::new();
        let owner = session();
        let other = session();

        let (view_id, handle) = registry.mount(&owner, |_| async move { Ok(Vec::new()) }).await;
        handle.await.unwrap();

        assert!(registry.get(&other, view_id).await.is_err());
        assert!(registry.unmount(&other, view_id).await.is_err());
        assert!(registry.get(&owner, view_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unmount_session_removes_all_its_views() {
        let registry = InsightsRegistry::new();
        let owner = session();
        let other = session();

        for _ in 0..2 {
            let (_, handle) = registry.mount(&owner, |_| async move { Ok(Vec::new()) }).await;
            handle.await.unwrap();
        }
        let (_, handle) = registry.mount(&other, |_| async move { Ok(Vec::new()) }).await;
        handle.await.unwrap();

        assert_eq!(registry.unmount_session(owner.session_id).await, 2);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_evict_idle_drops_unread_views() {
        let registry = InsightsRegistry::new();
        let session = session();
        let (view_id, handle) = registry.mount(&session, |_| async move { Ok(Vec::new()) }).await;
        handle.await.unwrap();

        assert_eq!(registry.evict_idle(Duration::hours(1)).await, 0);
        assert_eq!(registry.len().await, 1);

        assert_eq!(registry.evict_idle(Duration::zero()).await, 1);
        assert_eq!(registry.len().await, 0);
        assert!(registry.get(&session, view_id).await.is_err());
    }

    #[tokio::test]
    async fn test_mounts_per_session_are_capped() {
        let registry = InsightsRegistry::new();
        let owner = session();
        let other = session();

        let mut mounted = Vec::new();
        for _ in 0..MAX_VIEWS_PER_SESSION {
            let (view_id, handle) = registry.mount(&owner, |_| async move { Ok(Vec::new()) }).await;
            handle.await.unwrap();
            mounted.push(view_id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let (other_view, _) = registry.mount(&other, |_| async move { Ok(Vec::new()) }).await;

        // Reading the first view makes the second one the least recently used
        registry.get(&owner, mounted[0]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let (newest, handle) = registry.mount(&owner, |_| async move { Ok(Vec::new()) }).await;
        handle.await.unwrap();

        assert_eq!(registry.len().await, MAX_VIEWS_PER_SESSION + 1);
        assert!(registry.get(&owner, mounted[1]).await.is_err());
        assert!(registry.get(&owner, mounted[0]).await.is_ok());
        assert!(registry.get(&owner, newest).await.is_ok());
        assert!(registry.get(&other, other_view).await.is_ok());
    }
}
