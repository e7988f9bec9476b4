use crate::aggregates::AggregateRegistry;
use crate::error::QuotaError;
use crate::graph::ScopeDirectory;
use pkg_constants::quotas::UNLIMITED;
use pkg_state::{StateStore, Transaction};
use pkg_types::quota::Quota;
use pkg_types::scope::{ScopeKind, ScopeRef};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Source of truth for named numeric limits and usage per scope.
///
/// Usage deltas are applied as guarded batches: the scope's own rows plus
/// every propagated ancestor row commit in one store transaction, so
/// concurrent readers never observe a half-applied change.
pub struct QuotaLedger {
    store: StateStore,
    directory: Arc<dyn ScopeDirectory>,
    aggregates: AggregateRegistry,
}

impl QuotaLedger {
    pub fn new(
        store: StateStore,
        directory: Arc<dyn ScopeDirectory>,
        aggregates: AggregateRegistry,
    ) -> Self {
        Self {
            store,
            directory,
            aggregates,
        }
    }

    /// Seed quota rows for a freshly created scope, usage 0. Rows that
    /// already exist are left untouched.
    pub async fn init_quotas(
        &self,
        scope: &ScopeRef,
        names: &[(&str, i64)],
    ) -> Result<(), QuotaError> {
        let txn = self.stage_init_quotas(Transaction::new(), scope, names).await?;
        if !txn.is_empty() {
            self.store.commit(txn).await?;
            info!("Initialized quotas on {}", scope);
        }
        Ok(())
    }

    /// Stage the seed rows of [`Self::init_quotas`] into a caller-supplied
    /// transaction, so the scope's record write and its quota rows land in
    /// one guarded commit.
    pub async fn stage_init_quotas(
        &self,
        mut txn: Transaction,
        scope: &ScopeRef,
        names: &[(&str, i64)],
    ) -> Result<Transaction, QuotaError> {
        for (name, limit) in names {
            if *limit < UNLIMITED {
                return Err(QuotaError::InvalidLimit { limit: *limit });
            }
            let key = scope.quota_key(name);
            if self.store.load::<Quota>(&key).await?.is_none() {
                txn = txn.put(key, 0, &Quota::new(*name, *limit)).map_err(QuotaError::from)?;
            }
        }
        Ok(txn)
    }

    /// Remove every quota row owned by `scope` (cascade on entity deletion).
    pub async fn drop_quotas(&self, scope: &ScopeRef) -> Result<(), QuotaError> {
        let txn = self.stage_drop_quotas(Transaction::new(), scope).await?;
        if !txn.is_empty() {
            self.store.commit(txn).await?;
        }
        Ok(())
    }

    /// Stage the cascade deletes of [`Self::drop_quotas`] into a
    /// caller-supplied transaction.
    pub async fn stage_drop_quotas(
        &self,
        mut txn: Transaction,
        scope: &ScopeRef,
    ) -> Result<Transaction, QuotaError> {
        let rows: Vec<(String, u64, Quota)> =
            self.store.list_prefix(&scope.quota_prefix()).await?;
        for (key, version, _) in rows {
            txn = txn.delete(key, version);
        }
        Ok(txn)
    }

    pub async fn get(&self, scope: &ScopeRef, name: &str) -> Result<Quota, QuotaError> {
        let (_, quota) = self.load_row(scope, name).await?;
        Ok(quota)
    }

    /// Overwrite the limit. No usage side effect. `-1` means unlimited;
    /// any other negative value is rejected.
    pub async fn set_limit(
        &self,
        scope: &ScopeRef,
        name: &str,
        new_limit: i64,
    ) -> Result<Quota, QuotaError> {
        if new_limit < UNLIMITED {
            return Err(QuotaError::InvalidLimit { limit: new_limit });
        }
        let (version, mut quota) = self.load_row(scope, name).await?;
        quota.limit = new_limit;
        let txn = Transaction::new()
            .put(scope.quota_key(name), version, &quota)
            .map_err(QuotaError::from)?;
        self.store.commit(txn).await?;
        info!("Quota '{}' on {} limit set to {}", name, scope, new_limit);
        Ok(quota)
    }

    /// Apply one usage delta; see [`QuotaLedger::add_usage_batch`].
    pub async fn add_usage(
        &self,
        scope: &ScopeRef,
        name: &str,
        delta: i64,
    ) -> Result<(), QuotaError> {
        self.add_usage_batch(scope, &[(name, delta)]).await
    }

    /// Atomically apply a batch of usage deltas to `scope`, propagating
    /// each delta to every ancestor scope that carries a matching
    /// aggregate rule. All-or-nothing: a delta that would drive any usage
    /// negative fails the whole batch and writes nothing.
    pub async fn add_usage_batch(
        &self,
        scope: &ScopeRef,
        deltas: &[(&str, i64)],
    ) -> Result<(), QuotaError> {
        let txn = self.stage_usage_batch(Transaction::new(), scope, deltas).await?;
        self.store.commit(txn).await?;
        info!("Applied quota deltas {:?} on {}", deltas, scope);
        Ok(())
    }

    /// Stage the writes of [`Self::add_usage_batch`] (the scope's own rows
    /// plus all ancestor propagation) into a caller-supplied transaction.
    /// The caller's record write and the quota deltas then commit as one
    /// guarded batch: if either side's guard fails, neither lands, so a
    /// retry never double-applies the batch.
    pub async fn stage_usage_batch(
        &self,
        mut txn: Transaction,
        scope: &ScopeRef,
        deltas: &[(&str, i64)],
    ) -> Result<Transaction, QuotaError> {
        let ancestors = self.ancestor_chain(scope).await?;
        for (name, delta) in deltas {
            txn = self.stage_delta(txn, scope, name, *delta).await?;
            for (ancestor, path_child) in &ancestors {
                let propagates = self
                    .aggregates
                    .rule_for(ancestor.kind, name)
                    .is_some_and(|rule| rule.children.contains(path_child));
                if propagates {
                    txn = self.stage_delta(txn, ancestor, name, *delta).await?;
                }
            }
        }
        Ok(txn)
    }

    /// True if applying `delta` would push usage past the limit. Read-only.
    pub async fn is_exceeded(
        &self,
        scope: &ScopeRef,
        name: &str,
        delta: i64,
    ) -> Result<bool, QuotaError> {
        Ok(self.get(scope, name).await?.is_exceeded(delta))
    }

    /// Pure advisory check: one human-readable message per quota whose
    /// post-delta usage would exceed its limit, covering the scope itself
    /// and every ancestor the delta would propagate to; empty means OK.
    /// Callers must run this before committing the change that triggers
    /// the matching `add_usage` calls — nothing enforces it, so a caller
    /// that skips validation can still push usage over limit.
    pub async fn validate_quota_change(
        &self,
        scope: &ScopeRef,
        deltas: &[(&str, i64)],
    ) -> Result<Vec<String>, QuotaError> {
        let ancestors = self.ancestor_chain(scope).await?;
        let mut violations = Vec::new();
        for (name, delta) in deltas {
            self.check_violation(scope, name, *delta, &mut violations)
                .await?;
            for (ancestor, path_child) in &ancestors {
                let propagates = self
                    .aggregates
                    .rule_for(ancestor.kind, name)
                    .is_some_and(|rule| rule.children.contains(path_child));
                if propagates {
                    self.check_violation(ancestor, name, *delta, &mut violations)
                        .await?;
                }
            }
        }
        if !violations.is_empty() {
            warn!("Quota validation failed on {}: {:?}", scope, violations);
        }
        Ok(violations)
    }

    async fn check_violation(
        &self,
        scope: &ScopeRef,
        name: &str,
        delta: i64,
        violations: &mut Vec<String>,
    ) -> Result<(), QuotaError> {
        let quota = self.get(scope, name).await?;
        if quota.is_exceeded(delta) {
            violations.push(format!(
                "'{}' quota is over limit on {}: limit {}, requires {}",
                name,
                scope,
                quota.limit,
                quota.usage + delta
            ));
        }
        Ok(())
    }

    /// Incrementally adjust an aggregate quota on one scope, without any
    /// further upward propagation. The hot-path primitive behind batch
    /// propagation, exposed for verification against [`Self::recompute`].
    pub async fn apply_delta(
        &self,
        scope: &ScopeRef,
        name: &str,
        delta: i64,
    ) -> Result<(), QuotaError> {
        let txn = self.stage_delta(Transaction::new(), scope, name, delta).await?;
        self.store.commit(txn).await?;
        Ok(())
    }

    /// Recompute an aggregate quota's usage from scratch as the sum over
    /// matching child scopes. Used for correction and verification; must
    /// agree with the incrementally maintained value.
    pub async fn recompute(&self, parent: &ScopeRef, name: &str) -> Result<Quota, QuotaError> {
        let rule = self
            .aggregates
            .rule_for(parent.kind, name)
            .ok_or_else(|| QuotaError::UnknownAggregate {
                kind: parent.kind,
                name: name.to_string(),
            })?;
        let children = self.directory.children_of(parent, &rule.children).await?;

        let mut sum = 0;
        for child in &children {
            // Children without the row contribute zero.
            if let Some((_, quota)) = self
                .store
                .load::<Quota>(&child.quota_key(name))
                .await?
            {
                sum += quota.usage;
            }
        }

        let (version, mut quota) = self.load_row(parent, name).await?;
        if quota.usage != sum {
            warn!(
                "Aggregate '{}' on {} drifted: stored {}, recomputed {}",
                name, parent, quota.usage, sum
            );
        }
        quota.usage = sum;
        let txn = Transaction::new()
            .put(parent.quota_key(name), version, &quota)
            .map_err(QuotaError::from)?;
        self.store.commit(txn).await?;
        Ok(quota)
    }

    async fn load_row(&self, scope: &ScopeRef, name: &str) -> Result<(u64, Quota), QuotaError> {
        self.store
            .load::<Quota>(&scope.quota_key(name))
            .await?
            .ok_or_else(|| QuotaError::NotFound {
                scope: scope.clone(),
                name: name.to_string(),
            })
    }

    /// Stage `usage += delta` for one row into `txn`, rejecting a result
    /// below zero.
    async fn stage_delta(
        &self,
        txn: Transaction,
        scope: &ScopeRef,
        name: &str,
        delta: i64,
    ) -> Result<Transaction, QuotaError> {
        let (version, mut quota) = self.load_row(scope, name).await?;
        let new_usage = quota.usage + delta;
        if new_usage < 0 {
            return Err(QuotaError::NegativeUsage {
                scope: scope.clone(),
                name: name.to_string(),
                usage: quota.usage,
                delta,
            });
        }
        quota.usage = new_usage;
        txn.put(scope.quota_key(name), version, &quota)
            .map_err(QuotaError::from)
    }

    /// All ancestors of `scope`, each paired with the kind of the scope
    /// one level below it on the walk (the kind aggregate rules match on).
    async fn ancestor_chain(
        &self,
        scope: &ScopeRef,
    ) -> Result<Vec<(ScopeRef, ScopeKind)>, QuotaError> {
        let mut chain = Vec::new();
        let mut seen: HashSet<ScopeRef> = HashSet::new();
        let mut frontier = vec![scope.clone()];
        while let Some(current) = frontier.pop() {
            for parent in self.directory.parents_of(&current).await? {
                if seen.insert(parent.clone()) {
                    chain.push((parent.clone(), current.kind));
                    frontier.push(parent);
                }
            }
        }
        Ok(chain)
    }
}
