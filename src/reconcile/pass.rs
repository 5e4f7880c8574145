// ABOUTME: A reconciliation pass: discover, plan, execute, validate.
// ABOUTME: Full passes for startup and start events, prune passes for die events.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::Diagnostics;
use crate::runtime::{ContainerOps, NetworkOps};
use crate::types::ContainerId;

use super::error::ReconcileError;
use super::executor::{Executor, PassReport};
use super::inventory::{ContainerIdentity, DiscoveryOptions, capture_state};
use super::plan::{OperationPlan, build_plan, build_prune_plan};
use super::retry::RetryPolicy;
use super::state::PassPhase;

/// Everything a pass needs besides the runtime.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// The managed container, by name or ID.
    pub container: ContainerId,
    pub discovery: DiscoveryOptions,
    pub retry: RetryPolicy,
    /// Wait after each join before checking connectivity.
    pub stabilization: Duration,
}

/// A plan together with the warnings gathered while computing it.
#[derive(Debug)]
pub struct PlannedPass {
    pub plan: OperationPlan,
    pub diagnostics: Diagnostics,
}

/// Runs passes for one container against one runtime.
pub struct Reconciler<'a, R> {
    runtime: &'a R,
    settings: &'a ReconcileSettings,
    cancel: CancellationToken,
}

impl<'a, R: ContainerOps + NetworkOps> Reconciler<'a, R> {
    pub fn new(runtime: &'a R, settings: &'a ReconcileSettings, cancel: CancellationToken) -> Self {
        Self {
            runtime,
            settings,
            cancel,
        }
    }

    /// Resolve the managed container's full ID and name.
    pub async fn identify(&self) -> Result<ContainerIdentity, ReconcileError> {
        Ok(capture_state(self.runtime, &self.settings.container)
            .await?
            .container)
    }

    /// Discovery and planning only. Touches nothing.
    pub async fn plan(&self) -> Result<PlannedPass, ReconcileError> {
        self.ensure_running()?;
        let mut diagnostics = Diagnostics::default();
        let plan = build_plan(
            self.runtime,
            &self.settings.container,
            &self.settings.discovery,
            &mut diagnostics,
        )
        .await?;
        Ok(PlannedPass { plan, diagnostics })
    }

    /// Join every manageable network and leave every stale one.
    pub async fn full_pass(&self) -> Result<PassReport, ReconcileError> {
        tracing::info!(phase = %PassPhase::Planning, "starting full pass");
        let planned = self.plan().await?;
        self.execute(planned).await
    }

    /// Leave current networks that no longer have a manageable member.
    pub async fn prune_pass(&self) -> Result<PassReport, ReconcileError> {
        tracing::info!(phase = %PassPhase::Planning, "starting prune pass");
        self.ensure_running()?;
        let mut diagnostics = Diagnostics::default();
        let plan = build_prune_plan(
            self.runtime,
            &self.settings.container,
            &self.settings.discovery,
            &mut diagnostics,
        )
        .await?;
        self.execute(PlannedPass { plan, diagnostics }).await
    }

    async fn execute(&self, planned: PlannedPass) -> Result<PassReport, ReconcileError> {
        self.ensure_running()?;
        let executor = Executor::new(
            self.runtime,
            self.settings.retry,
            self.settings.stabilization,
            &self.cancel,
        );
        executor.execute(planned.plan, planned.diagnostics).await
    }

    fn ensure_running(&self) -> Result<(), ReconcileError> {
        if self.cancel.is_cancelled() {
            Err(ReconcileError::Cancelled)
        } else {
            Ok(())
        }
    }
}
