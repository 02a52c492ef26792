//! Command handling on top of the audit log.

use std::marker::PhantomData;

use audit_log::{
    AppendOptions, AuditLog, AuditLogExt, AuditRecord, RegistryId, StateSnapshot, Version,
};
use common::Identity;
use serde::{Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Snapshot every this many records unless configured otherwise.
pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 50;

/// Outcome of a successfully executed command.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// State after the new events were applied.
    pub aggregate: A,

    /// Events that were persisted, in emission order.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// An intention to change an aggregate, made by a caller.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn registry_id(&self) -> RegistryId;

    /// Identity on whose behalf the command runs.
    fn caller(&self) -> Identity;
}

/// Loads aggregates from an [`AuditLog`], runs commands against them and
/// persists the resulting events.
pub struct CommandHandler<S, A>
where
    S: AuditLog,
    A: Aggregate,
{
    log: S,
    snapshot_interval: u64,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: AuditLog,
    A: Aggregate,
{
    pub fn new(log: S) -> Self {
        Self {
            log,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            _phantom: PhantomData,
        }
    }

    /// Sets the snapshot interval. 0 disables snapshots.
    pub fn with_snapshot_interval(mut self, interval: u64) -> Self {
        self.snapshot_interval = interval;
        self
    }

    pub fn log(&self) -> &S {
        &self.log
    }

    pub fn snapshot_interval(&self) -> u64 {
        self.snapshot_interval
    }

    /// Loads an aggregate from its latest snapshot plus the records after it.
    ///
    /// A registry with no records loads as `A::default()`.
    pub async fn load(&self, registry_id: RegistryId) -> Result<A, DomainError>
    where
        A: DeserializeOwned,
    {
        let (snapshot, records) = self.log.load_history(registry_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => {
                let version = snapshot.version;
                let mut aggregate: A = snapshot.restore()?;
                aggregate.set_version(version);
                aggregate
            }
            None => A::default(),
        };

        for record in records {
            let event: A::Event = record.decode()?;
            aggregate.apply(event);
            aggregate.set_version(record.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning `None` if it was never created.
    pub async fn load_existing(&self, registry_id: RegistryId) -> Result<Option<A>, DomainError>
    where
        A: DeserializeOwned,
    {
        let aggregate = self.load(registry_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Runs `command_fn` against the current state and persists its events.
    ///
    /// The append expects the version that was loaded, so a concurrent
    /// writer makes this fail with a concurrency conflict and nothing is
    /// applied. A command that yields no events appends nothing.
    pub async fn execute<F>(
        &self,
        registry_id: RegistryId,
        caller: Identity,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A: DeserializeOwned,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(registry_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let records = self.build_records(registry_id, caller, current_version, &events)?;
        let new_version = self
            .log
            .append(records, AppendOptions::expect_version(current_version))
            .await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        tracing::debug!(
            %registry_id,
            %caller,
            version = %new_version,
            events = events.len(),
            "command executed"
        );

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    fn build_records(
        &self,
        registry_id: RegistryId,
        caller: Identity,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<AuditRecord>, DomainError> {
        let mut records = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let record = AuditRecord::builder()
                .registry_id(registry_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .metadata("caller", serde_json::Value::String(caller.to_string()))
                .build()?;
            records.push(record);
        }

        Ok(records)
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: AuditLog,
    A: SnapshotCapable,
{
    /// Like [`CommandHandler::execute`], then saves a snapshot when one is due.
    ///
    /// The events are committed once `execute` returns, so a failed snapshot
    /// is logged and the command still succeeds. The next due interval tries
    /// again.
    pub async fn execute_with_snapshot<F>(
        &self,
        registry_id: RegistryId,
        caller: Identity,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self.execute(registry_id, caller, command_fn).await?;

        if result.events.is_empty() {
            return Ok(result);
        }

        let previous = Version::new(result.new_version.as_i64() - result.events.len() as i64);
        if result.aggregate.should_snapshot(previous, self.snapshot_interval) {
            if let Err(e) = self.save_snapshot(registry_id, &result).await {
                tracing::warn!(%registry_id, error = %e, "snapshot failed");
                metrics::counter!("registry_snapshot_failures_total").increment(1);
            }
        }

        Ok(result)
    }

    async fn save_snapshot(
        &self,
        registry_id: RegistryId,
        result: &CommandResult<A>,
    ) -> Result<(), DomainError> {
        let snapshot = StateSnapshot::capture(
            registry_id,
            A::aggregate_type(),
            result.new_version,
            &result.aggregate,
        )?;
        self.log.save_snapshot(snapshot).await?;
        tracing::debug!(%registry_id, version = %result.new_version, "snapshot saved");
        Ok(())
    }
}
