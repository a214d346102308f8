//! Concurrent dispatch of one turn's tool calls.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Tool, ToolError, ToolRegistry};
use crate::chat::ToolCall;
use crate::error::LlmError;

/// Runs every call concurrently and returns the outcomes in call order.
///
/// All names are resolved before anything runs; an unregistered name
/// fails the whole batch. Each call gets a child of a group token that is
/// cancelled when the caller cancels or a task fails to join, which also
/// aborts the remaining tasks.
pub(crate) async fn dispatch_all(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    cancel: &CancellationToken,
) -> Result<Vec<Result<String, ToolError>>, LlmError> {
    let mut resolved: Vec<(Arc<dyn Tool>, String)> = Vec::with_capacity(calls.len());
    for call in calls {
        let tool = registry
            .get(&call.function.name)
            .ok_or_else(|| LlmError::ToolNotFound(call.function.name.clone()))?;
        resolved.push((Arc::clone(tool), call.function.arguments.clone()));
    }

    let group = cancel.child_token();
    let mut tasks = JoinSet::new();
    for (idx, (tool, arguments)) in resolved.into_iter().enumerate() {
        let token = group.child_token();
        tasks.spawn(async move {
            let outcome = tool.call(&arguments, token).await;
            (idx, outcome)
        });
    }

    let mut outcomes: Vec<Option<Result<String, ToolError>>> =
        (0..calls.len()).map(|_| None).collect();
    loop {
        let joined = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                group.cancel();
                tasks.abort_all();
                return Err(LlmError::Cancelled);
            }
            joined = tasks.join_next() => joined,
        };
        match joined {
            None => break,
            Some(Ok((idx, outcome))) => {
                debug!(
                    tool = %calls[idx].function.name,
                    call_id = %calls[idx].id,
                    ok = outcome.is_ok(),
                    "tool call finished"
                );
                outcomes[idx] = Some(outcome);
            }
            Some(Err(join_err)) => {
                group.cancel();
                tasks.abort_all();
                return Err(LlmError::ToolDispatch(join_err.to_string()));
            }
        }
    }

    outcomes
        .into_iter()
        .enumerate()
        .map(|(idx, outcome)| {
            outcome.ok_or_else(|| LlmError::Protocol(format!("tool call {idx} result is missing")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::tool::{tool_fn, ToolSpec};

    fn sleeper(name: &str, millis: u64) -> Arc<dyn Tool> {
        let reply = name.to_owned();
        Arc::new(tool_fn(
            ToolSpec::new(name, "sleeps", json!({})),
            move |_args, _cancel| {
                let reply = reply.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    Ok(reply)
                }
            },
        ))
    }

    #[tokio::test]
    async fn test_outcomes_in_call_order() {
        let mut registry = ToolRegistry::new();
        registry.register(sleeper("slow", 150));
        registry.register(sleeper("fast", 1));
        let calls = vec![
            ToolCall::new("a", 0, "slow", "{}"),
            ToolCall::new("b", 1, "fast", "{}"),
        ];
        let out = dispatch_all(&registry, &calls, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, vec![Ok("slow".to_owned()), Ok("fast".to_owned())]);
    }

    #[tokio::test]
    async fn test_runs_concurrently() {
        let mut registry = ToolRegistry::new();
        registry.register(sleeper("t", 200));
        let calls: Vec<_> = (0..4).map(|i| ToolCall::new(format!("c{i}"), i, "t", "{}")).collect();
        let started = std::time::Instant::now();
        dispatch_all(&registry, &calls, &CancellationToken::new())
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_missing_tool_fails_batch() {
        let mut registry = ToolRegistry::new();
        registry.register(sleeper("known", 1));
        let calls = vec![
            ToolCall::new("a", 0, "known", "{}"),
            ToolCall::new("b", 1, "unknown", "{}"),
        ];
        let err = dispatch_all(&registry, &calls, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, LlmError::ToolNotFound("unknown".into()));
    }

    #[tokio::test]
    async fn test_tool_error_is_an_outcome() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(tool_fn(
            ToolSpec::new("broken", "", json!({})),
            |_args, _cancel| async move { Err(ToolError::new("exit status 2")) },
        )));
        let calls = vec![ToolCall::new("a", 0, "broken", "{}")];
        let out = dispatch_all(&registry, &calls, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, vec![Err(ToolError::new("exit status 2"))]);
    }

    #[tokio::test]
    async fn test_panicking_tool_cancels_siblings() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(tool_fn(
            ToolSpec::new("panics", "", json!({})),
            |args, _cancel| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if args == "{}" {
                    panic!("tool blew up");
                }
                Ok(args)
            },
        )));
        registry.register(Arc::new(tool_fn(
            ToolSpec::new("waits", "", json!({})),
            |_args, cancel: CancellationToken| async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(Duration::from_secs(5)) => {}
                }
                Ok(String::new())
            },
        )));
        let calls = vec![
            ToolCall::new("a", 0, "panics", "{}"),
            ToolCall::new("b", 1, "waits", "{}"),
        ];
        let started = std::time::Instant::now();
        let err = dispatch_all(&registry, &calls, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ToolDispatch(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_caller_cancellation() {
        let mut registry = ToolRegistry::new();
        registry.register(sleeper("slow", 5_000));
        let calls = vec![ToolCall::new("a", 0, "slow", "{}")];
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = dispatch_all(&registry, &calls, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
