use crate::commands::read_json;
use crate::output;
use resourceflow_core::{Orchestrator, ServiceClient, Translator};
use serde::de::DeserializeOwned;
use std::path::Path;

pub async fn handle_read<T, C>(
    orchestrator: &Orchestrator<T, C>,
    desired: &Path,
) -> anyhow::Result<bool>
where
    T: Translator,
    T::Desired: DeserializeOwned,
    C: ServiceClient<Request = T::Request, Response = T::Response>,
{
    let desired: T::Desired = read_json(desired).await?;
    let result = orchestrator.read(&desired).await;
    output::print_result(&result)
}

pub async fn handle_list<T, C>(
    orchestrator: &Orchestrator<T, C>,
    desired: &Path,
    cursor: Option<&str>,
) -> anyhow::Result<bool>
where
    T: Translator,
    T::Desired: DeserializeOwned,
    C: ServiceClient<Request = T::Request, Response = T::Response>,
{
    let desired: T::Desired = read_json(desired).await?;
    let result = orchestrator.list(&desired, cursor).await;
    output::print_result(&result)
}
