//! Registry service: the caller-facing API over the command handler.

use std::time::Instant;

use audit_log::AuditLog;
use common::{Identity, ParcelId, RegistryId};
use tokio::sync::Mutex;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{
    AddOfficer, CreateRegistry, Parcel, RegisterParcel, Registry, RegistryError, RegistryEvent,
    RenounceAdministration, TransferAdministration, TransferContext, TransferParcel,
};

/// Runs registry operations against an audit log.
///
/// Mutations go through one at a time within a service; a second service
/// on the same log is kept honest by the audit log's version check.
pub struct RegistryService<S: AuditLog> {
    handler: CommandHandler<S, Registry>,
    write_gate: Mutex<()>,
}

impl<S: AuditLog> RegistryService<S> {
    pub fn new(log: S) -> Self {
        Self {
            handler: CommandHandler::new(log),
            write_gate: Mutex::new(()),
        }
    }

    /// Snapshots every `interval` records instead of the default.
    pub fn with_snapshot_interval(self, interval: u64) -> Self {
        Self {
            handler: self.handler.with_snapshot_interval(interval),
            write_gate: self.write_gate,
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Registry> {
        &self.handler
    }

    #[tracing::instrument(skip(self), fields(registry_id = %cmd.registry_id))]
    pub async fn create_registry(
        &self,
        cmd: CreateRegistry,
    ) -> Result<CommandResult<Registry>, DomainError> {
        let CreateRegistry {
            registry_id,
            name,
            administrator,
        } = cmd;

        self.run("create_registry", registry_id, administrator, |registry| {
            registry.create(registry_id, name, administrator)
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(registry_id = %cmd.registry_id))]
    pub async fn add_officer(&self, cmd: AddOfficer) -> Result<CommandResult<Registry>, DomainError> {
        let AddOfficer {
            registry_id,
            caller,
            officer,
        } = cmd;

        self.run("add_officer", registry_id, caller, |registry| {
            registry.add_officer(caller, officer)
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(registry_id = %cmd.registry_id))]
    pub async fn transfer_administration(
        &self,
        cmd: TransferAdministration,
    ) -> Result<CommandResult<Registry>, DomainError> {
        let TransferAdministration {
            registry_id,
            caller,
            new_administrator,
        } = cmd;

        self.run("transfer_administration", registry_id, caller, |registry| {
            registry.transfer_administration(caller, new_administrator)
        })
        .await
    }

    /// Gives up the administrator role for good.
    #[tracing::instrument(skip(self), fields(registry_id = %cmd.registry_id))]
    pub async fn renounce_administration(
        &self,
        cmd: RenounceAdministration,
    ) -> Result<CommandResult<Registry>, DomainError> {
        let RenounceAdministration {
            registry_id,
            caller,
        } = cmd;

        self.run("renounce_administration", registry_id, caller, |registry| {
            registry.renounce_administration(caller)
        })
        .await
    }

    /// Registers a parcel and returns its id.
    #[tracing::instrument(skip(self), fields(registry_id = %cmd.registry_id))]
    pub async fn register_parcel(
        &self,
        cmd: RegisterParcel,
    ) -> Result<(ParcelId, CommandResult<Registry>), DomainError> {
        let RegisterParcel {
            registry_id,
            caller,
            owner,
            location,
            area,
        } = cmd;

        let result = self
            .run("register_parcel", registry_id, caller, |registry| {
                registry.register_parcel(caller, owner, location, area)
            })
            .await?;

        // registrations are sequential, so the newest id is the count
        let parcel_id = ParcelId::new(result.aggregate.parcel_count());
        Ok((parcel_id, result))
    }

    #[tracing::instrument(skip(self), fields(registry_id = %cmd.registry_id))]
    pub async fn transfer_parcel(
        &self,
        cmd: TransferParcel,
    ) -> Result<CommandResult<Registry>, DomainError> {
        self.transfer_parcel_with(cmd, |_| Ok(())).await
    }

    /// Transfers a parcel, running `side_effects` while it is locked.
    ///
    /// Nothing is recorded unless the whole transfer, side effects
    /// included, succeeds.
    pub async fn transfer_parcel_with<F>(
        &self,
        cmd: TransferParcel,
        side_effects: F,
    ) -> Result<CommandResult<Registry>, DomainError>
    where
        F: FnOnce(&mut TransferContext<'_>) -> Result<(), RegistryError> + Send,
    {
        let TransferParcel {
            registry_id,
            caller,
            parcel_id,
            new_owner,
        } = cmd;

        self.run("transfer_parcel", registry_id, caller, |registry| {
            registry.transfer_parcel_with(caller, parcel_id, new_owner, side_effects)
        })
        .await
    }

    // Queries

    /// Loads a registry, `None` if it was never created.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, registry_id: RegistryId) -> Result<Option<Registry>, DomainError> {
        self.handler.load_existing(registry_id).await
    }

    pub async fn get_registry(&self, registry_id: RegistryId) -> Result<Registry, DomainError> {
        self.load(registry_id)
            .await?
            .ok_or(DomainError::NotFound { registry_id })
    }

    pub async fn administrator(&self, registry_id: RegistryId) -> Result<Identity, DomainError> {
        Ok(self.get_registry(registry_id).await?.administrator())
    }

    pub async fn registry_name(&self, registry_id: RegistryId) -> Result<String, DomainError> {
        Ok(self.get_registry(registry_id).await?.name().to_string())
    }

    pub async fn is_officer(
        &self,
        registry_id: RegistryId,
        identity: Identity,
    ) -> Result<bool, DomainError> {
        Ok(self.get_registry(registry_id).await?.is_officer(identity))
    }

    /// Returns the parcel, or the default record for an unknown parcel id.
    pub async fn get_parcel(
        &self,
        registry_id: RegistryId,
        parcel_id: ParcelId,
    ) -> Result<Parcel, DomainError> {
        Ok(self.get_registry(registry_id).await?.parcel(parcel_id))
    }

    pub async fn parcel_count(&self, registry_id: RegistryId) -> Result<u64, DomainError> {
        Ok(self.get_registry(registry_id).await?.parcel_count())
    }

    async fn run<F>(
        &self,
        command: &'static str,
        registry_id: RegistryId,
        caller: Identity,
        command_fn: F,
    ) -> Result<CommandResult<Registry>, DomainError>
    where
        F: FnOnce(&Registry) -> Result<Vec<RegistryEvent>, RegistryError> + Send,
    {
        let _gate = self.write_gate.lock().await;
        let started = Instant::now();

        let result = self
            .handler
            .execute_with_snapshot(registry_id, caller, command_fn)
            .await;

        metrics::histogram!("registry_command_duration_seconds", "command" => command)
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => {
                metrics::counter!("registry_commands_total", "command" => command).increment(1);
                tracing::info!(
                    %registry_id,
                    %caller,
                    command = command,
                    version = %outcome.new_version,
                    "command applied"
                );
            }
            Err(e) => {
                metrics::counter!("registry_command_failures_total", "command" => command)
                    .increment(1);
                tracing::warn!(
                    %registry_id,
                    %caller,
                    command = command,
                    error = %e,
                    "command rejected"
                );
            }
        }

        result
    }
}
