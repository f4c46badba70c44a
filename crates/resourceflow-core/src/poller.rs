//! Stabilization poller
//!
//! Issues one status read per invocation and decides whether the resource
//! has settled. The attempt counter lives in the caller's [`Progress`], so
//! a poll that never settles ends in `NotStabilized` instead of being
//! re-invoked forever.

use crate::classify::{self, ClassifiedError, Disposition, ErrorKind};
use crate::config::EngineConfig;
use crate::context::{Progress, Stage};
use crate::port::ServiceClient;
use crate::result::OperationType;
use crate::status::{ObservedResource, ResourceStatus};
use crate::step::OperationStep;
use crate::translate::{Observation, Translator};
use std::time::Duration;

/// What a read that matched nothing means while polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentPolicy {
    /// The resource is gone, which is the goal (delete)
    Stable,
    /// Not visible yet; reads may lag behind writes (create)
    KeepPolling,
    /// The resource vanished mid-operation (update)
    Fail,
}

/// Terminal statuses for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilizationRules {
    pub stable: Vec<ResourceStatus>,
    pub failed: Vec<ResourceStatus>,
    pub absent: AbsentPolicy,
}

impl StabilizationRules {
    pub fn for_create() -> Self {
        Self {
            stable: vec![ResourceStatus::Active],
            failed: vec![ResourceStatus::Failed],
            absent: AbsentPolicy::KeepPolling,
        }
    }

    pub fn for_update() -> Self {
        Self {
            stable: vec![ResourceStatus::Active],
            failed: vec![ResourceStatus::Failed],
            absent: AbsentPolicy::Fail,
        }
    }

    pub fn for_delete() -> Self {
        Self {
            stable: Vec::new(),
            failed: vec![ResourceStatus::Failed],
            absent: AbsentPolicy::Stable,
        }
    }

    pub fn for_operation(operation: OperationType) -> Self {
        match operation {
            OperationType::Update => Self::for_update(),
            OperationType::Delete => Self::for_delete(),
            OperationType::Create | OperationType::Read | OperationType::List => {
                Self::for_create()
            }
        }
    }
}

/// Poller state after one read
#[derive(Debug, Clone, PartialEq)]
pub enum PollState<O> {
    /// Not settled; invoke again after `delay`
    Polling { delay: Duration },
    /// Settled. `None` when the goal was absence.
    Stable(Option<O>),
    /// Settled in a failed state, or the budget ran out
    Unstable(ClassifiedError),
}

/// Outcome of classifying one observation, before any budget is spent
#[derive(Debug, Clone, PartialEq)]
enum Transition<O> {
    Polling,
    Stable(Option<O>),
    Unstable(ClassifiedError),
}

pub struct StabilizationPoller<'a> {
    config: &'a EngineConfig,
}

impl<'a> StabilizationPoller<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Reads the resource once and advances the state machine
    ///
    /// No read happens if `progress` already has the stabilize stage
    /// marked; the caller checks that before calling.
    pub async fn poll<T, C>(
        &self,
        step: &OperationStep<'_, T, C>,
        operation: OperationType,
        request: T::Request,
        rules: &StabilizationRules,
        progress: &mut Progress,
    ) -> PollState<T::Observed>
    where
        T: Translator,
        C: ServiceClient<Request = T::Request, Response = T::Response>,
    {
        let transition = match step.run(Stage::Stabilize, request).await {
            Ok(observation) => {
                progress.reset_retries();
                transition(rules, observation)
            }
            Err(error) => match classify::disposition(error.kind, operation, Stage::Stabilize) {
                Disposition::Absent => transition(rules, Observation::Absent),
                Disposition::Retry => return self.backoff(error, progress),
                Disposition::Terminal => Transition::Unstable(error),
            },
        };

        match transition {
            Transition::Polling => {
                if progress.try_consume_attempt(self.config.max_attempts) {
                    tracing::debug!(
                        "{} still settling (attempt {}/{})",
                        operation,
                        progress.attempts,
                        self.config.max_attempts
                    );
                    PollState::Polling {
                        delay: self.config.poll_interval,
                    }
                } else {
                    PollState::Unstable(ClassifiedError::new(
                        ErrorKind::NotStabilized,
                        format!(
                            "resource did not stabilize after {} attempts",
                            self.config.max_attempts
                        ),
                    ))
                }
            }
            Transition::Stable(observed) => PollState::Stable(observed),
            Transition::Unstable(error) => PollState::Unstable(error),
        }
    }

    /// Spends one attempt on a retryable error
    ///
    /// Used for retryable errors in any stage, not only while polling; all
    /// of them share the one budget. The delay grows with the streak of
    /// consecutive retryable errors, not with the attempts spent polling.
    pub fn backoff<O>(&self, error: ClassifiedError, progress: &mut Progress) -> PollState<O> {
        if progress.try_consume_attempt(self.config.max_attempts) {
            let delay = self.config.retry.delay_for_attempt(progress.next_retry());
            tracing::warn!(
                kind = %error.kind,
                "retryable error, asking to be invoked again in {:?}",
                delay
            );
            PollState::Polling { delay }
        } else {
            PollState::Unstable(ClassifiedError::new(
                error.kind,
                format!(
                    "retry budget exhausted after {} attempts: {}",
                    self.config.max_attempts, error.message
                ),
            ))
        }
    }
}

fn transition<O: ObservedResource>(
    rules: &StabilizationRules,
    observation: Observation<O>,
) -> Transition<O> {
    let observed = match observation {
        Observation::Resource(resource) => resource,
        Observation::Page(page) => match page.items.into_iter().next() {
            Some(resource) => resource,
            None => return absent(rules),
        },
        Observation::Absent => return absent(rules),
        // No status to judge by
        Observation::Accepted => return Transition::Polling,
    };

    let status = observed.status();
    if status.is_absent() {
        return absent(rules);
    }
    if rules.stable.contains(&status) {
        return Transition::Stable(Some(observed));
    }
    if rules.failed.contains(&status) {
        let id = observed.identifier().unwrap_or("<unassigned>");
        return Transition::Unstable(ClassifiedError::new(
            ErrorKind::NotStabilized,
            format!("resource {id} entered {status} status"),
        ));
    }
    Transition::Polling
}

fn absent<O>(rules: &StabilizationRules) -> Transition<O> {
    match rules.absent {
        AbsentPolicy::Stable => Transition::Stable(None),
        AbsentPolicy::KeepPolling => Transition::Polling,
        AbsentPolicy::Fail => Transition::Unstable(ClassifiedError::not_found(
            "resource disappeared before it stabilized",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Page;

    #[derive(Debug, Clone, PartialEq)]
    struct Sample(ResourceStatus);

    impl ObservedResource for Sample {
        fn status(&self) -> ResourceStatus {
            self.0
        }

        fn identifier(&self) -> Option<&str> {
            Some("p1")
        }
    }

    #[test]
    fn test_create_rules() {
        let rules = StabilizationRules::for_create();
        assert_eq!(
            transition(&rules, Observation::Resource(Sample(ResourceStatus::Creating))),
            Transition::Polling
        );
        assert_eq!(
            transition(&rules, Observation::Resource(Sample(ResourceStatus::Active))),
            Transition::Stable(Some(Sample(ResourceStatus::Active)))
        );
        assert_eq!(
            transition::<Sample>(&rules, Observation::Absent),
            Transition::Polling
        );
    }

    #[test]
    fn test_delete_rules_treat_absence_as_done() {
        let rules = StabilizationRules::for_delete();
        assert_eq!(
            transition::<Sample>(&rules, Observation::Absent),
            Transition::Stable(None)
        );
        assert_eq!(
            transition(&rules, Observation::Page(Page::<Sample>::empty())),
            Transition::Stable(None)
        );
        assert_eq!(
            transition(&rules, Observation::Resource(Sample(ResourceStatus::NotFound))),
            Transition::Stable(None)
        );
        assert_eq!(
            transition(&rules, Observation::Resource(Sample(ResourceStatus::Deleting))),
            Transition::Polling
        );
    }

    #[test]
    fn test_failed_status_is_unstable() {
        let rules = StabilizationRules::for_update();
        match transition(&rules, Observation::Resource(Sample(ResourceStatus::Failed))) {
            Transition::Unstable(error) => {
                assert_eq!(error.kind, ErrorKind::NotStabilized);
                assert!(error.message.contains("FAILED"));
            }
            other => panic!("expected unstable, got {other:?}"),
        }
    }

    #[test]
    fn test_update_absence_fails() {
        let rules = StabilizationRules::for_update();
        match transition::<Sample>(&rules, Observation::Absent) {
            Transition::Unstable(error) => assert_eq!(error.kind, ErrorKind::NotFound),
            other => panic!("expected unstable, got {other:?}"),
        }
    }

    #[test]
    fn test_accepted_keeps_polling() {
        let rules = StabilizationRules::for_create();
        assert_eq!(
            transition::<Sample>(&rules, Observation::Accepted),
            Transition::Polling
        );
    }

    #[test]
    fn test_backoff_exhausts_budget() {
        let config = EngineConfig::default().with_max_attempts(1);
        let poller = StabilizationPoller::new(&config);
        let mut progress = Progress::new();

        let first: PollState<Sample> =
            poller.backoff(ClassifiedError::new(ErrorKind::Throttled, "slow down"), &mut progress);
        assert!(matches!(first, PollState::Polling { .. }));

        let second: PollState<Sample> =
            poller.backoff(ClassifiedError::new(ErrorKind::Throttled, "slow down"), &mut progress);
        match second {
            PollState::Unstable(error) => {
                assert_eq!(error.kind, ErrorKind::Throttled);
                assert!(error.message.starts_with("retry budget exhausted after 1 attempts"));
            }
            other => panic!("expected unstable, got {other:?}"),
        }
    }

    #[test]
    fn test_backoff_delay_follows_retry_streak() {
        let config = EngineConfig::default().with_max_attempts(10);
        let poller = StabilizationPoller::new(&config);
        let mut progress = Progress::new();
        // five polls already spent
        progress.attempts = 5;

        let first: PollState<Sample> =
            poller.backoff(ClassifiedError::new(ErrorKind::Throttled, "slow down"), &mut progress);
        assert_eq!(
            first,
            PollState::Polling {
                delay: config.retry.delay_for_attempt(0)
            }
        );

        let second: PollState<Sample> =
            poller.backoff(ClassifiedError::new(ErrorKind::Throttled, "slow down"), &mut progress);
        assert_eq!(
            second,
            PollState::Polling {
                delay: config.retry.delay_for_attempt(1)
            }
        );
        assert_eq!(progress.attempts, 7);
    }
}
