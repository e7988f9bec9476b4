use crate::error::LifecycleError;
use crate::machine::apply_transition;
use crate::transitions::Trigger;
use pkg_state::StateStore;
use std::future::Future;
use tracing::{error, info};

/// Bracket a long-running background operation with guaranteed state
/// transitions.
///
/// 1. Transition the instance via `processing` (e.g. `BeginProvisioning`).
///    If the row is missing or the transition is illegal, abort here:
///    there is nothing to compensate.
/// 2. Run `processing_fn` outside any store transaction.
/// 3. On success, transition via `desired` (e.g. `SetOnline`); on failure,
///    log the error and transition to `Erred` instead — the one place an
///    operation failure becomes persisted state rather than re-raised.
///
/// Each transition re-fetches the row, so fields written concurrently by
/// other callers survive; only the state field is touched here. No retry
/// policy lives here — that is the task scheduler's concern.
pub async fn tracked_processing<F, Fut>(
    store: &StateStore,
    instance_id: &str,
    processing: Trigger,
    desired: Trigger,
    processing_fn: F,
) -> Result<pkg_types::instance::Instance, LifecycleError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    apply_transition(store, instance_id, processing).await?;
    info!("Instance {}: started {}", instance_id, processing);

    match processing_fn(instance_id.to_string()).await {
        Ok(()) => {
            let instance = apply_transition(store, instance_id, desired).await?;
            info!("Instance {}: finished {}", instance_id, desired);
            Ok(instance)
        }
        Err(e) => {
            error!(
                "Instance {}: operation failed after {}: {:#}",
                instance_id, processing, e
            );
            apply_transition(store, instance_id, Trigger::SetErred).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pkg_constants::paths::INSTANCES_PREFIX;
    use pkg_state::Transaction;
    use pkg_types::instance::{Instance, InstanceState};

    fn key(id: &str) -> String {
        format!("{}{}", INSTANCES_PREFIX, id)
    }

    async fn store_with_scheduled_instance(id: &str) -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().to_str().unwrap()).await.unwrap();
        let instance = Instance {
            id: id.to_string(),
            service_link_id: "l1".to_string(),
            name: format!("vm-{}", id),
            state: InstanceState::ProvisioningScheduled,
            backend_id: String::new(),
            cores: 1,
            ram_mb: 1024,
            disk_mb: 10240,
            user_data: String::new(),
            created_at: Utc::now(),
        };
        let txn = Transaction::new().put(key(id), 0, &instance).unwrap();
        store.commit(txn).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn success_lands_in_the_desired_state() {
        let (_dir, store) = store_with_scheduled_instance("i1").await;
        let observer = store.clone();

        let finished = tracked_processing(
            &store,
            "i1",
            Trigger::BeginProvisioning,
            Trigger::SetOnline,
            |id| async move {
                // Intermediate state is visible while the operation runs.
                let (_, seen): (u64, Instance) =
                    observer.load(&key(&id)).await.unwrap().unwrap();
                assert_eq!(seen.state, InstanceState::Provisioning);
                Ok(())
            },
        )
        .await
        .unwrap();
        assert_eq!(finished.state, InstanceState::Online);
    }

    #[tokio::test]
    async fn failure_lands_in_erred() {
        let (_dir, store) = store_with_scheduled_instance("i1").await;
        let finished = tracked_processing(
            &store,
            "i1",
            Trigger::BeginProvisioning,
            Trigger::SetOnline,
            |_| async { anyhow::bail!("backend exploded") },
        )
        .await
        .unwrap();
        assert_eq!(finished.state, InstanceState::Erred);
    }

    #[tokio::test]
    async fn illegal_entry_transition_aborts_without_running_the_operation() {
        let (_dir, store) = store_with_scheduled_instance("i1").await;
        // BeginStarting is not legal from ProvisioningScheduled.
        let err = tracked_processing(
            &store,
            "i1",
            Trigger::BeginStarting,
            Trigger::SetOnline,
            |_| async { panic!("operation must not run") },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::IllegalTransition { .. }));

        let (_, stored): (u64, Instance) = store.load(&key("i1")).await.unwrap().unwrap();
        assert_eq!(stored.state, InstanceState::ProvisioningScheduled);
    }

    #[tokio::test]
    async fn missing_instance_aborts_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().to_str().unwrap()).await.unwrap();
        let err = tracked_processing(
            &store,
            "ghost",
            Trigger::BeginProvisioning,
            Trigger::SetOnline,
            |_| async { Ok(()) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound { .. }));
    }

    #[tokio::test]
    async fn concurrent_field_updates_survive_the_bracketing() {
        let (_dir, store) = store_with_scheduled_instance("i1").await;
        let side_writer = store.clone();

        let finished = tracked_processing(
            &store,
            "i1",
            Trigger::BeginProvisioning,
            Trigger::SetOnline,
            |id| async move {
                // An external worker records the backend id mid-flight.
                let k = key(&id);
                let (version, mut record): (u64, Instance) =
                    side_writer.load(&k).await.unwrap().unwrap();
                record.backend_id = "backend-42".to_string();
                let txn = Transaction::new().put(&k, version, &record).unwrap();
                side_writer.commit(txn).await.unwrap();
                Ok(())
            },
        )
        .await
        .unwrap();
        assert_eq!(finished.state, InstanceState::Online);
        assert_eq!(finished.backend_id, "backend-42");
    }
}
