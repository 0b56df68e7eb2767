use async_trait::async_trait;

use super::*;

/// State shared by the provisioning steps of one issuance.
pub(super) struct ProvisioningContext {
    pub(super) platform: Arc<dyn IdentityPlatform>,
    pub(super) username: String,
    pub(super) group_name: GroupName,
    pub(super) access_key: Option<AccessKey>,
}

/// One forward action paired with the action that undoes it.
#[async_trait]
pub(super) trait SagaStep: Send + Sync {
    fn step(&self) -> ProvisioningStep;

    async fn forward(&self, context: &mut ProvisioningContext) -> AppResult<()>;

    async fn compensate(&self, context: &ProvisioningContext) -> AppResult<()>;
}

pub(super) struct CreateIdentity;

#[async_trait]
impl SagaStep for CreateIdentity {
    fn step(&self) -> ProvisioningStep {
        ProvisioningStep::CreateIdentity
    }

    async fn forward(&self, context: &mut ProvisioningContext) -> AppResult<()> {
        // The platform display name is the generated username.
        context
            .platform
            .create_identity(context.username.as_str(), context.username.as_str())
            .await
    }

    async fn compensate(&self, context: &ProvisioningContext) -> AppResult<()> {
        context
            .platform
            .delete_identity(context.username.as_str())
            .await
    }
}

pub(super) struct AttachToGroup;

#[async_trait]
impl SagaStep for AttachToGroup {
    fn step(&self) -> ProvisioningStep {
        ProvisioningStep::AttachToGroup
    }

    async fn forward(&self, context: &mut ProvisioningContext) -> AppResult<()> {
        context
            .platform
            .add_to_group(context.username.as_str(), &context.group_name)
            .await
    }

    async fn compensate(&self, context: &ProvisioningContext) -> AppResult<()> {
        context
            .platform
            .remove_from_group(context.username.as_str(), &context.group_name)
            .await
    }
}

pub(super) struct CreateAccessKey;

#[async_trait]
impl SagaStep for CreateAccessKey {
    fn step(&self) -> ProvisioningStep {
        ProvisioningStep::CreateAccessKey
    }

    async fn forward(&self, context: &mut ProvisioningContext) -> AppResult<()> {
        let access_key = context
            .platform
            .create_access_key(context.username.as_str())
            .await?;
        context.access_key = Some(access_key);
        Ok(())
    }

    async fn compensate(&self, context: &ProvisioningContext) -> AppResult<()> {
        let Some(access_key) = context.access_key.as_ref() else {
            return Ok(());
        };

        context
            .platform
            .delete_access_key(context.username.as_str(), access_key.id())
            .await
    }
}

/// Why a saga run stopped.
#[derive(Debug)]
pub(super) enum SagaAbort {
    /// Cancelled before the first step; the platform was never called.
    NotStarted,
    /// A step failed or cancellation stopped the run midway.
    Failed(ProvisioningFailure),
}

/// Runs `steps` in order, unwinding completed steps in reverse on failure.
///
/// Once `cancel` fires no further call is started, forward or compensating;
/// completed steps left in place are reported as skipped.
pub(super) async fn run(
    steps: &[&dyn SagaStep],
    context: &mut ProvisioningContext,
    cancel: &CancellationToken,
) -> Result<(), SagaAbort> {
    let mut completed: Vec<&dyn SagaStep> = Vec::with_capacity(steps.len());

    for step in steps {
        if cancel.is_cancelled() {
            if completed.is_empty() {
                return Err(SagaAbort::NotStarted);
            }

            warn!(
                username = %context.username,
                step = %step.step(),
                "provisioning cancelled before step started"
            );
            return Err(SagaAbort::Failed(ProvisioningFailure {
                step: step.step(),
                message: format!("cancelled before {} started", step.step()),
                cancelled: true,
                cleanup_failures: Vec::new(),
                skipped_compensations: completed.iter().rev().map(|done| done.step()).collect(),
            }));
        }

        match step.forward(context).await {
            Ok(()) => {
                info!(
                    username = %context.username,
                    group = %context.group_name,
                    step = %step.step(),
                    "provisioning step completed"
                );
                completed.push(*step);
            }
            Err(forward_error) => {
                let message = remote_message(forward_error);
                error!(
                    username = %context.username,
                    group = %context.group_name,
                    step = %step.step(),
                    error = %message,
                    "provisioning step failed"
                );

                let (cleanup_failures, skipped_compensations) =
                    unwind(completed.as_slice(), context, cancel).await;

                return Err(SagaAbort::Failed(ProvisioningFailure {
                    step: step.step(),
                    message,
                    cancelled: cancel.is_cancelled(),
                    cleanup_failures,
                    skipped_compensations,
                }));
            }
        }
    }

    Ok(())
}

async fn unwind(
    completed: &[&dyn SagaStep],
    context: &ProvisioningContext,
    cancel: &CancellationToken,
) -> (Vec<CleanupFailure>, Vec<ProvisioningStep>) {
    let mut cleanup_failures = Vec::new();
    let mut skipped = Vec::new();

    for step in completed.iter().rev() {
        if cancel.is_cancelled() {
            skipped.push(step.step());
            continue;
        }

        match step.compensate(context).await {
            Ok(()) => info!(
                username = %context.username,
                step = %step.step(),
                "provisioning step compensated"
            ),
            Err(cleanup_error) => {
                let message = remote_message(cleanup_error);
                error!(
                    username = %context.username,
                    step = %step.step(),
                    error = %message,
                    "compensation failed; remote identity may be orphaned"
                );
                cleanup_failures.push(CleanupFailure {
                    step: step.step(),
                    message,
                });
            }
        }
    }

    if !skipped.is_empty() {
        warn!(
            username = %context.username,
            skipped = skipped.len(),
            "compensation skipped after cancellation; remote identity may be orphaned"
        );
    }

    (cleanup_failures, skipped)
}
