//! Generic diff-and-converge engine.
//!
//! Each resource kind implements [`Adapter`], and kinds that can be enumerated
//! also implement [`Collection`]. The [`Reconciler`] drives the shared
//! algorithm:
//!
//! 1. Fetch the live instance (absent when the server says so).
//! 2. Absent: create it from the declared parameters.
//! 3. Present and satisfied: nothing to do.
//! 4. Present but not satisfied: recreate when the mismatch touches fields the
//!    server cannot change in place, otherwise update.
//! 5. For whole collections, delete live instances that were not declared.

mod report;

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::client::ResourceClient;
use crate::core::compare;
use crate::core::types::{Declarations, Params, ResourceKey};
use crate::error::Result;

pub use report::{Action, Change, ChangeReport};

/// Per-kind capabilities used by the [`Reconciler`].
pub trait Adapter {
    /// Kind name used in logs and reports.
    fn kind(&self) -> &'static str;

    /// The live instance for `key`, or `None` if it does not exist.
    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>>;

    /// Whether the live instance already matches the declaration.
    fn is_satisfied(&self, desired: &Params, actual: &Value) -> bool {
        compare::satisfies(desired, actual)
    }

    /// Whether the mismatch can only be fixed by deleting and recreating.
    fn recreate_required(&self, _desired: &Params, _actual: &Value) -> bool {
        false
    }

    /// Payload for creating a new instance.
    fn create_payload(&self, desired: &Params) -> Value {
        Value::Object(desired.clone())
    }

    /// Payload for updating an existing instance in place.
    fn update_payload(&self, desired: &Params, _actual: &Value) -> Value {
        Value::Object(desired.clone())
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()>;

    /// Most kinds upsert with the same request they create with.
    fn update(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        self.create(client, key, payload)
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()>;

    /// Built-in instances that must never be deleted.
    fn is_protected(&self, _key: &str) -> bool {
        false
    }

    /// Delete unwanted instances before creating, for kinds whose paths may be
    /// claimed again in the same run.
    fn prune_first(&self) -> bool {
        false
    }
}

/// A kind whose live instances can be enumerated, so undeclared ones can be
/// pruned.
pub trait Collection: Adapter {
    /// Keys of every live instance of this kind.
    fn list(&self, client: &dyn ResourceClient) -> Result<Vec<ResourceKey>>;
}

/// Drives [`Adapter`]s against a [`ResourceClient`].
pub struct Reconciler<'c> {
    client: &'c dyn ResourceClient,
}

impl<'c> Reconciler<'c> {
    pub fn new(client: &'c dyn ResourceClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &'c dyn ResourceClient {
        self.client
    }

    /// Converge one named instance, leaving every other instance untouched.
    ///
    /// `desired = None` deletes the instance if it exists.
    ///
    /// # Errors
    ///
    /// Returns the first client error. A failed recreate may leave the
    /// instance deleted; running again converges it.
    pub fn converge_one<A: Adapter + ?Sized>(
        &self,
        adapter: &A,
        key: &str,
        desired: Option<&Params>,
    ) -> Result<Action> {
        let actual = adapter.fetch(self.client, key)?;
        self.apply(adapter, key, desired, actual.as_ref())
    }

    /// Converge a whole collection.
    ///
    /// Declared keys are created, updated or (for `None`) deleted; live keys
    /// that were not declared are deleted unless the adapter protects them.
    pub fn converge_all<A: Collection + ?Sized>(
        &self,
        adapter: &A,
        desired: &Declarations<Params>,
    ) -> Result<ChangeReport> {
        let existing: BTreeSet<ResourceKey> = adapter.list(self.client)?.into_iter().collect();
        let stale: Vec<&ResourceKey> = existing
            .iter()
            .filter(|key| !desired.contains_key(*key))
            .filter(|key| {
                let protected = adapter.is_protected(key);
                if protected {
                    debug!(kind = adapter.kind(), key = %key, "keeping built-in");
                }
                !protected
            })
            .collect();

        let mut report = ChangeReport::new();

        if adapter.prune_first() {
            for key in &stale {
                self.remove(adapter, key, &mut report)?;
            }
            for (key, _) in desired.iter().filter(|(_, params)| params.is_none()) {
                self.converge_declared(adapter, key, None, &existing, &mut report)?;
            }
            for (key, params) in desired.iter().filter(|(_, params)| params.is_some()) {
                self.converge_declared(adapter, key, params.as_ref(), &existing, &mut report)?;
            }
        } else {
            for (key, params) in desired {
                self.converge_declared(adapter, key, params.as_ref(), &existing, &mut report)?;
            }
            for key in &stale {
                self.remove(adapter, key, &mut report)?;
            }
        }

        Ok(report)
    }

    /// Converge every declared key as a singleton. Undeclared instances are
    /// left alone.
    pub fn converge_each<A: Adapter + ?Sized>(
        &self,
        adapter: &A,
        desired: &Declarations<Params>,
    ) -> Result<ChangeReport> {
        let mut report = ChangeReport::new();
        for (key, params) in desired {
            if params.is_none() && adapter.is_protected(key) {
                warn!(kind = adapter.kind(), key = %key, "refusing to delete built-in");
                continue;
            }
            let action = self.converge_one(adapter, key, params.as_ref())?;
            report.record(adapter.kind(), key, action);
        }
        Ok(report)
    }

    fn converge_declared<A: Adapter + ?Sized>(
        &self,
        adapter: &A,
        key: &str,
        desired: Option<&Params>,
        existing: &BTreeSet<ResourceKey>,
        report: &mut ChangeReport,
    ) -> Result<()> {
        let action = match desired {
            None if !existing.contains(key) => Action::Unchanged,
            None if adapter.is_protected(key) => {
                warn!(kind = adapter.kind(), key, "refusing to delete built-in");
                Action::Unchanged
            }
            _ => self.converge_one(adapter, key, desired)?,
        };
        report.record(adapter.kind(), key, action);
        Ok(())
    }

    fn remove<A: Adapter + ?Sized>(
        &self,
        adapter: &A,
        key: &str,
        report: &mut ChangeReport,
    ) -> Result<()> {
        adapter.delete(self.client, key)?;
        info!(kind = adapter.kind(), key, "deleted undeclared");
        report.record(adapter.kind(), key, Action::Deleted);
        Ok(())
    }

    fn apply<A: Adapter + ?Sized>(
        &self,
        adapter: &A,
        key: &str,
        desired: Option<&Params>,
        actual: Option<&Value>,
    ) -> Result<Action> {
        let client = self.client;
        let action = match (desired, actual) {
            (None, None) => Action::Unchanged,
            (None, Some(_)) => {
                adapter.delete(client, key)?;
                Action::Deleted
            }
            (Some(desired), None) => {
                adapter.create(client, key, &adapter.create_payload(desired))?;
                Action::Created
            }
            (Some(desired), Some(actual)) if adapter.is_satisfied(desired, actual) => {
                Action::Unchanged
            }
            (Some(desired), Some(actual)) if adapter.recreate_required(desired, actual) => {
                debug!(
                    kind = adapter.kind(),
                    key,
                    mismatched = ?compare::mismatched_keys(desired, actual),
                    "immutable fields differ"
                );
                adapter.delete(client, key)?;
                adapter.create(client, key, &adapter.create_payload(desired))?;
                Action::Recreated
            }
            (Some(desired), Some(actual)) => {
                adapter.update(client, key, &adapter.update_payload(desired, actual))?;
                Action::Updated
            }
        };

        if action.is_change() {
            info!(kind = adapter.kind(), key, action = %action, "converged");
        } else {
            debug!(kind = adapter.kind(), key, "already converged");
        }
        Ok(action)
    }
}
