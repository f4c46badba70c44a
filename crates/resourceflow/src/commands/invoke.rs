use crate::commands::read_json;
use crate::output;
use resourceflow_core::{Invocation, Orchestrator, ServiceClient, Translator};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Runs exactly one invocation from an envelope
pub async fn handle<T, C>(orchestrator: &Orchestrator<T, C>, request: &Path) -> anyhow::Result<bool>
where
    T: Translator,
    T::Desired: DeserializeOwned,
    C: ServiceClient<Request = T::Request, Response = T::Response>,
{
    let invocation: Invocation<T::Desired, T::Observed> = read_json(request).await?;
    tracing::debug!(
        operation = %invocation.operation,
        resumed = invocation.prior_context.is_some(),
        "invoke"
    );

    let result = orchestrator.invoke(invocation).await;
    output::print_result(&result)
}
