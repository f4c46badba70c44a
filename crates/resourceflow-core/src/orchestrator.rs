//! Lifecycle orchestrator
//!
//! Each mutating operation is an ordered stage list (see
//! [`OperationType::stages`]). One invocation folds over that list: stages
//! already marked in the context are skipped, each stage that advances is
//! marked, and the first stage that does not advance decides the result.
//!
//! | stage outcome | result |
//! |---------------|--------|
//! | advance       | next stage (success after the last one) |
//! | finish        | success, remaining stages skipped |
//! | wait          | in progress, context returned |
//! | fail          | failed |
//!
//! Invocations for one operation instance must be sequential. The
//! orchestrator does no locking of its own.

use crate::classify::{self, ClassifiedError, Disposition, ErrorKind};
use crate::config::EngineConfig;
use crate::context::{Context, Stage};
use crate::poller::{PollState, StabilizationPoller};
use crate::port::ServiceClient;
use crate::result::{Invocation, OperationResult, OperationType, Resolved};
use crate::status::{ObservedResource, ResourceStatus};
use crate::step::OperationStep;
use crate::translate::{Observation, Page, Translator};
use std::time::Duration;
use tracing::Instrument;

/// Result of running one stage
enum StepOutcome<O> {
    Advance,
    Finish(Option<O>),
    Wait(Duration),
    Fail(ClassifiedError),
}

/// Drives create/read/update/delete/list for one resource type
pub struct Orchestrator<T, C> {
    translator: T,
    client: C,
    config: EngineConfig,
}

impl<T, C> Orchestrator<T, C>
where
    T: Translator,
    C: ServiceClient<Request = T::Request, Response = T::Response>,
{
    pub fn new(translator: T, client: C, config: EngineConfig) -> Self {
        Self {
            translator,
            client,
            config,
        }
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Dispatches an invocation envelope to the matching operation
    pub async fn invoke(
        &self,
        invocation: Invocation<T::Desired, T::Observed>,
    ) -> OperationResult<Resolved<T::Observed>, T::Observed> {
        let Invocation {
            operation,
            desired_state,
            prior_context,
            cursor,
        } = invocation;

        if !operation.is_mutating() && prior_context.is_some() {
            return OperationResult::failed(ClassifiedError::invalid_input(format!(
                "{operation} does not take a context"
            )));
        }

        match operation {
            OperationType::Create => self
                .create(&desired_state, prior_context)
                .await
                .map(Resolved::Resource),
            OperationType::Update => self
                .update(&desired_state, prior_context)
                .await
                .map(Resolved::Resource),
            OperationType::Delete => self
                .delete(&desired_state, prior_context)
                .await
                .map(|resource| resource.map_or(Resolved::Absent, Resolved::Resource)),
            OperationType::Read => self.read(&desired_state).await.map(Resolved::Resource),
            OperationType::List => self
                .list(&desired_state, cursor.as_deref())
                .await
                .map(Resolved::Page),
        }
    }

    pub async fn create(
        &self,
        desired: &T::Desired,
        context: Option<Context<T::Observed>>,
    ) -> OperationResult<T::Observed, T::Observed> {
        require_resource(self.resume(OperationType::Create, desired, context).await)
    }

    pub async fn update(
        &self,
        desired: &T::Desired,
        context: Option<Context<T::Observed>>,
    ) -> OperationResult<T::Observed, T::Observed> {
        require_resource(self.resume(OperationType::Update, desired, context).await)
    }

    /// Succeeds with `None` once the resource is gone, including when it
    /// never existed
    pub async fn delete(
        &self,
        desired: &T::Desired,
        context: Option<Context<T::Observed>>,
    ) -> OperationResult<Option<T::Observed>, T::Observed> {
        self.resume(OperationType::Delete, desired, context).await
    }

    /// Single read; absence is a `NotFound` failure
    pub async fn read(&self, desired: &T::Desired) -> OperationResult<T::Observed, T::Observed> {
        let key = self.translator.resource_key(desired);
        if let Err(error) = self.validate(OperationType::Read, desired) {
            return OperationResult::failed(error);
        }

        let request = self.translator.read_request(desired, None);
        match self.step().run(Stage::Fetch, request).await {
            Ok(observation) => match observation.into_present() {
                Some(observed) => OperationResult::success(observed),
                None => OperationResult::failed(ClassifiedError::not_found(format!(
                    "{} {} not found",
                    self.translator.resource_type(),
                    key
                ))),
            },
            Err(error) => OperationResult::failed(error),
        }
    }

    /// Single list call; absence is an empty page
    pub async fn list(
        &self,
        desired: &T::Desired,
        cursor: Option<&str>,
    ) -> OperationResult<Page<T::Observed>, T::Observed> {
        if let Err(error) = self.validate(OperationType::List, desired) {
            return OperationResult::failed(error);
        }

        let request = self.translator.list_request(desired, cursor);
        match self.step().run(Stage::Fetch, request).await {
            Ok(Observation::Page(page)) => OperationResult::success(page),
            Ok(observation) => {
                let items = observation.into_present().into_iter().collect();
                OperationResult::success(Page::new(items, None))
            }
            Err(error) => {
                match classify::disposition(error.kind, OperationType::List, Stage::Fetch) {
                    Disposition::Absent => OperationResult::success(Page::empty()),
                    _ => OperationResult::failed(error),
                }
            }
        }
    }

    async fn resume(
        &self,
        operation: OperationType,
        desired: &T::Desired,
        prior: Option<Context<T::Observed>>,
    ) -> OperationResult<Option<T::Observed>, T::Observed> {
        let span = tracing::info_span!(
            "resume",
            %operation,
            resource_type = self.translator.resource_type(),
            key = %self.translator.resource_key(desired),
        );
        self.fold(operation, desired, prior).instrument(span).await
    }

    async fn fold(
        &self,
        operation: OperationType,
        desired: &T::Desired,
        prior: Option<Context<T::Observed>>,
    ) -> OperationResult<Option<T::Observed>, T::Observed> {
        let mut context = match self.prepare_context(operation, prior) {
            Ok(context) => context,
            Err(error) => return OperationResult::failed(error),
        };
        if let Err(error) = self.validate(operation, desired) {
            return OperationResult::failed(error);
        }

        let mut last: Option<T::Observed> = None;
        for &stage in operation.stages() {
            if context.progress().is_complete(stage) {
                continue;
            }

            match self
                .run_stage(operation, stage, desired, &mut context, &mut last)
                .await
            {
                StepOutcome::Advance => {
                    tracing::debug!("{} stage complete", stage);
                    context.progress_mut().mark(stage);
                }
                StepOutcome::Finish(observed) => {
                    tracing::info!("{} finished at {} stage", operation, stage);
                    return OperationResult::success(observed);
                }
                StepOutcome::Wait(delay) => {
                    return OperationResult::in_progress(context, delay);
                }
                StepOutcome::Fail(error) => {
                    tracing::info!(kind = %error.kind, "{} failed at {} stage", operation, stage);
                    return OperationResult::failed(error.for_operation(operation));
                }
            }
        }

        tracing::info!("{} complete", operation);
        OperationResult::success(last)
    }

    async fn run_stage(
        &self,
        operation: OperationType,
        stage: Stage,
        desired: &T::Desired,
        context: &mut Context<T::Observed>,
        last: &mut Option<T::Observed>,
    ) -> StepOutcome<T::Observed> {
        match stage {
            Stage::Guard => self.guard(desired, context).await,
            Stage::PreCheck => self.pre_check(operation, desired, context, last).await,
            Stage::Submit => self.submit(operation, desired, context, last).await,
            Stage::Stabilize => self.stabilize(operation, desired, context, last).await,
            Stage::Refresh => self.refresh(operation, desired, context, last).await,
            Stage::Fetch => StepOutcome::Fail(ClassifiedError::new(
                ErrorKind::Unknown,
                format!("{operation} has no fetch stage"),
            )),
        }
    }

    async fn guard(
        &self,
        desired: &T::Desired,
        context: &mut Context<T::Observed>,
    ) -> StepOutcome<T::Observed> {
        let Some(request) = self.translator.guard_request(desired) else {
            return StepOutcome::Advance;
        };

        match self.step().run(Stage::Guard, request).await {
            Ok(observation) => match observation.into_present() {
                Some(existing) => StepOutcome::Fail(ClassifiedError::new(
                    ErrorKind::Conflict,
                    format!(
                        "{} {} is already present (id {})",
                        self.translator.resource_type(),
                        self.translator.resource_key(desired),
                        existing.identifier().unwrap_or("<unassigned>")
                    ),
                )),
                None => StepOutcome::Advance,
            },
            Err(error) => self.settle(OperationType::Create, Stage::Guard, error, context, || {
                StepOutcome::Advance
            }),
        }
    }

    async fn pre_check(
        &self,
        operation: OperationType,
        desired: &T::Desired,
        context: &mut Context<T::Observed>,
        last: &mut Option<T::Observed>,
    ) -> StepOutcome<T::Observed> {
        let request = self.translator.read_request(desired, context.resource_id());
        let observation = match self.step().run(Stage::PreCheck, request).await {
            Ok(observation) => observation,
            Err(error) => {
                return self.settle(operation, Stage::PreCheck, error, context, || {
                    StepOutcome::Finish(None)
                });
            }
        };

        let Some(existing) = observation.into_present() else {
            return match operation {
                OperationType::Delete => {
                    tracing::info!("resource already absent, nothing to delete");
                    StepOutcome::Finish(None)
                }
                _ => StepOutcome::Fail(ClassifiedError::not_found(format!(
                    "{} {} does not exist",
                    self.translator.resource_type(),
                    self.translator.resource_key(desired)
                ))),
            };
        };

        if let Some(id) = existing.identifier() {
            context.set_resource_id(id);
        }
        if operation == OperationType::Delete && existing.status() == ResourceStatus::Deleting {
            // A delete is already running remotely; submitting again would duplicate it
            context.progress_mut().mark(Stage::Submit);
        }
        context.capture(existing.clone());
        *last = Some(existing);
        StepOutcome::Advance
    }

    async fn submit(
        &self,
        operation: OperationType,
        desired: &T::Desired,
        context: &mut Context<T::Observed>,
        last: &mut Option<T::Observed>,
    ) -> StepOutcome<T::Observed> {
        let request = match operation {
            OperationType::Create => self.translator.create_request(desired),
            OperationType::Update => match context.captured() {
                Some(current) => self.translator.update_request(desired, current),
                None => {
                    return StepOutcome::Fail(ClassifiedError::new(
                        ErrorKind::Unknown,
                        "update context is missing its pre-check state",
                    ));
                }
            },
            OperationType::Delete => self.translator.delete_request(desired, context.resource_id()),
            OperationType::Read | OperationType::List => {
                return StepOutcome::Fail(ClassifiedError::new(
                    ErrorKind::Unknown,
                    format!("{operation} has no submit stage"),
                ));
            }
        };

        match self.step().run(Stage::Submit, request).await {
            Ok(observation) => {
                if let Some(observed) = observation.into_present() {
                    if let Some(id) = observed.identifier() {
                        context.set_resource_id(id);
                    }
                    *last = Some(observed);
                }
                tracing::info!(
                    resource_id = context.resource_id().unwrap_or("<unassigned>"),
                    "{} submitted",
                    operation
                );
                StepOutcome::Advance
            }
            Err(error) => self.settle(operation, Stage::Submit, error, context, || {
                tracing::info!("resource vanished before the delete landed");
                StepOutcome::Finish(None)
            }),
        }
    }

    async fn stabilize(
        &self,
        operation: OperationType,
        desired: &T::Desired,
        context: &mut Context<T::Observed>,
        last: &mut Option<T::Observed>,
    ) -> StepOutcome<T::Observed> {
        let request = self.translator.read_request(desired, context.resource_id());
        let rules = self.translator.stabilization_rules(operation);
        let step = self.step();

        match self
            .poller()
            .poll(&step, operation, request, &rules, context.progress_mut())
            .await
        {
            PollState::Stable(observed) => {
                if let Some(id) = observed.as_ref().and_then(|o| o.identifier()) {
                    context.set_resource_id(id);
                }
                *last = observed;
                StepOutcome::Advance
            }
            PollState::Polling { delay } => StepOutcome::Wait(delay),
            PollState::Unstable(error) => StepOutcome::Fail(error),
        }
    }

    async fn refresh(
        &self,
        operation: OperationType,
        desired: &T::Desired,
        context: &mut Context<T::Observed>,
        last: &mut Option<T::Observed>,
    ) -> StepOutcome<T::Observed> {
        if !self.translator.refresh_after_stabilize() {
            return StepOutcome::Advance;
        }

        let request = self.translator.read_request(desired, context.resource_id());
        match self.step().run(Stage::Refresh, request).await {
            Ok(observation) => match observation.into_present() {
                Some(observed) => {
                    *last = Some(observed);
                    StepOutcome::Advance
                }
                None => StepOutcome::Fail(ClassifiedError::not_found(
                    "resource disappeared after it stabilized",
                )),
            },
            Err(error) => self.settle(operation, Stage::Refresh, error, context, || {
                StepOutcome::Fail(ClassifiedError::not_found(
                    "resource disappeared after it stabilized",
                ))
            }),
        }
    }

    /// Applies the fixed disposition of a classified error
    fn settle(
        &self,
        operation: OperationType,
        stage: Stage,
        error: ClassifiedError,
        context: &mut Context<T::Observed>,
        on_absent: impl FnOnce() -> StepOutcome<T::Observed>,
    ) -> StepOutcome<T::Observed> {
        match classify::disposition(error.kind, operation, stage) {
            Disposition::Absent => on_absent(),
            Disposition::Retry => match self.poller().backoff(error, context.progress_mut()) {
                PollState::Polling { delay } => StepOutcome::Wait(delay),
                PollState::Stable(observed) => StepOutcome::Finish(observed),
                PollState::Unstable(error) => StepOutcome::Fail(error),
            },
            Disposition::Terminal => StepOutcome::Fail(error),
        }
    }

    fn prepare_context(
        &self,
        operation: OperationType,
        prior: Option<Context<T::Observed>>,
    ) -> Result<Context<T::Observed>, ClassifiedError> {
        match prior {
            Some(context) => {
                context
                    .ensure_operation(operation)
                    .map_err(|e| ClassifiedError::invalid_input(e.to_string()))?;
                tracing::debug!(
                    attempts = context.progress().attempts,
                    "resuming from prior context"
                );
                Ok(context)
            }
            None => Context::new(operation).ok_or_else(|| {
                ClassifiedError::invalid_input(format!("{operation} does not take a context"))
            }),
        }
    }

    fn validate(
        &self,
        operation: OperationType,
        desired: &T::Desired,
    ) -> Result<(), ClassifiedError> {
        self.translator
            .validate(operation, desired)
            .map_err(ClassifiedError::invalid_input)
    }

    fn step(&self) -> OperationStep<'_, T, C> {
        OperationStep::new(&self.translator, &self.client, &self.config.classifier)
    }

    fn poller(&self) -> StabilizationPoller<'_> {
        StabilizationPoller::new(&self.config)
    }
}

/// Create and update always end with a resource
fn require_resource<O>(result: OperationResult<Option<O>, O>) -> OperationResult<O, O> {
    match result {
        OperationResult::Success {
            resource: Some(resource),
        } => OperationResult::success(resource),
        OperationResult::Success { resource: None } => OperationResult::failed(
            ClassifiedError::new(ErrorKind::Unknown, "operation finished without a resource"),
        ),
        OperationResult::Failed {
            error_kind,
            message,
        } => OperationResult::Failed {
            error_kind,
            message,
        },
        OperationResult::InProgress {
            context,
            delay_seconds,
        } => OperationResult::InProgress {
            context,
            delay_seconds,
        },
    }
}
