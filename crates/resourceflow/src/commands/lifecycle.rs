use crate::commands::read_json;
use crate::output;
use crate::store::ContextStore;
use colored::Colorize;
use resourceflow_core::{
    Invocation, OperationResult, OperationType, Orchestrator, ServiceClient, Translator,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

pub struct LifecycleOptions<'a> {
    pub desired: &'a Path,
    pub key: Option<&'a str>,
    /// Keep resuming until the operation is terminal
    pub follow: bool,
}

/// Default store key: `<resource type>-<resource key>`
pub fn default_key<T: Translator>(translator: &T, desired: &T::Desired) -> String {
    format!(
        "{}-{}",
        translator.resource_type(),
        translator.resource_key(desired)
    )
}

/// Runs create, update or delete, resuming from the stored context if one exists
pub async fn handle<T, C>(
    orchestrator: &Orchestrator<T, C>,
    store: &ContextStore,
    operation: OperationType,
    options: LifecycleOptions<'_>,
) -> anyhow::Result<bool>
where
    T: Translator,
    T::Desired: DeserializeOwned + Clone,
    C: ServiceClient<Request = T::Request, Response = T::Response>,
{
    let desired: T::Desired = read_json(options.desired).await?;
    let key = options
        .key
        .map(str::to_string)
        .unwrap_or_else(|| default_key(orchestrator.translator(), &desired));

    let mut context = match store.load::<T::Observed>(&key).await? {
        Some(stored) if stored.operation != operation => {
            anyhow::bail!(
                "{} では別の操作 ({}) が進行中です。先に完了させるか、{} を削除してください",
                key,
                stored.operation,
                store.path(&key).display()
            );
        }
        Some(stored) => {
            eprintln!(
                "{}",
                format!(
                    "{} を再開します (試行 {} 回目, 最終更新 {})",
                    operation,
                    stored.context.progress().attempts + 1,
                    stored.updated_at.format("%Y-%m-%d %H:%M:%S")
                )
                .cyan()
            );
            Some(stored.context)
        }
        None => None,
    };

    loop {
        let invocation = Invocation::new(operation, desired.clone()).with_context(context.take());
        let result = orchestrator.invoke(invocation).await;

        if let OperationResult::InProgress {
            context: next,
            delay_seconds,
        } = &result
        {
            let delay_seconds = *delay_seconds;
            store.save(&key, next).await?;
            if options.follow {
                output::waiting(delay_seconds);
                tokio::time::sleep(Duration::from_secs(delay_seconds)).await;
                context = result.into_context();
                continue;
            }
        } else {
            store.remove(&key).await?;
        }

        return output::print_result(&result);
    }
}
