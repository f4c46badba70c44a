mod common;

use common::*;
use resourceflow_core::{Context, ErrorKind, OperationResult, OperationType, ResourceStatus, Stage};

#[tokio::test]
async fn test_update_with_stale_version_conflict() {
    let client = ScriptedClient::new();
    client
        .respond(WidgetResponse::One(WidgetState::versioned(
            "r1",
            ResourceStatus::Active,
            "v1",
        )))
        .fail("ConcurrentModificationException", "version v1 is stale");
    let orchestrator = orchestrator(&client);

    let result = orchestrator.update(&Widget::named("x"), None).await;

    match result {
        OperationResult::Failed {
            error_kind,
            message,
        } => {
            assert_eq!(error_kind, ErrorKind::Conflict);
            assert!(message.starts_with("resource busy or version conflict"));
            assert!(message.contains("version v1 is stale"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        client.calls()[1],
        WidgetRequest::Update {
            id: "r1".to_string(),
            version: Some("v1".to_string())
        }
    );
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_update_requires_existing_resource() {
    let client = ScriptedClient::new();
    client.respond(WidgetResponse::Nothing);
    let orchestrator = orchestrator(&client);

    let result = orchestrator.update(&Widget::named("x"), None).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_update_pre_check_not_found_error_is_terminal() {
    let client = ScriptedClient::new();
    client.fail("ResourceNotFoundException", "gone");
    let orchestrator = orchestrator(&client);

    let result = orchestrator.update(&Widget::named("x"), None).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_update_carries_pre_check_state_across_invocations() {
    let client = ScriptedClient::new();
    client
        .respond(WidgetResponse::One(WidgetState::versioned(
            "r1",
            ResourceStatus::Active,
            "v7",
        )))
        .fail("Throttling", "slow down");
    let orchestrator = orchestrator(&client);
    let desired = Widget::named("x");

    let first = orchestrator.update(&desired, None).await;
    let context = first.into_context().expect("throttled submit should be retried");
    assert!(context.progress().is_complete(Stage::PreCheck));
    assert_eq!(context.captured().and_then(|c| c.version.as_deref()), Some("v7"));

    // The persisted blob alone is enough to resume
    let blob = context.to_json().unwrap();
    let restored: Context<WidgetState> = Context::from_json(&blob).unwrap();

    client
        .respond(WidgetResponse::One(WidgetState::versioned(
            "r1",
            ResourceStatus::Updating,
            "v8",
        )))
        .respond(WidgetResponse::One(WidgetState::versioned(
            "r1",
            ResourceStatus::Active,
            "v8",
        )));
    let second = orchestrator.update(&desired, Some(restored)).await;

    assert_eq!(second.resource().map(|r| r.status), Some(ResourceStatus::Active));
    let calls = client.calls();
    // pre-check ran once; submit used the captured version
    assert_eq!(calls.iter().filter(|c| c.is_read()).count(), 2);
    assert_eq!(
        calls[2],
        WidgetRequest::Update {
            id: "r1".to_string(),
            version: Some("v7".to_string())
        }
    );
}

#[tokio::test]
async fn test_resource_vanishing_during_update_fails() {
    let client = ScriptedClient::new();
    client
        .respond(WidgetResponse::One(WidgetState::new("r1", ResourceStatus::Active)))
        .respond(WidgetResponse::One(WidgetState::new("r1", ResourceStatus::Updating)))
        .respond(WidgetResponse::Nothing);
    let orchestrator = orchestrator(&client);

    let result = orchestrator.update(&Widget::named("x"), None).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_update_context_without_capture_fails() {
    let client = ScriptedClient::new();
    let orchestrator = orchestrator(&client);
    let mut context: Context<WidgetState> = Context::new(OperationType::Update).unwrap();
    context.progress_mut().mark(Stage::PreCheck);

    let result = orchestrator.update(&Widget::named("x"), Some(context)).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::Unknown));
    assert_eq!(client.call_count(), 0);
}
