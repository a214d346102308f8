//! The multi-turn, tool-calling conversation loop.
//!
//! [`Orchestrator`] drives any [`WireAdapter`]: it issues one wire call per
//! turn, tees every event to the caller while folding it through a
//! [`MessageBuilder`], dispatches the resulting tool calls concurrently
//! and appends their results to a private copy of the history before the
//! next turn.
//!
//! ```text
//!  caller ◄── EventStream ◄──┬── wire turn (SSE → Event)
//!                            │        │
//!                            │   MessageBuilder → assistant Message
//!                            │        │
//!                            └── ToolResult ◄── dispatch_all (JoinSet)
//! ```

use std::sync::Arc;

use futures::channel::mpsc;
use futures::SinkExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::builder::MessageBuilder;
use crate::cache::CacheCheckpoints;
use crate::chat::Message;
use crate::config::StreamConfig;
use crate::error::LlmError;
use crate::event::{Event, EventStream};
use crate::tool::{dispatch_all, Tool, ToolRegistry, ToolSpec};
use crate::wire::transport::{self, FrameReader};
use crate::wire::WireAdapter;

const EVENT_BUFFER: usize = 64;

/// A streaming, tool-calling model.
///
/// Object-safe, so callers can hold any adapter as `Box<dyn Model>`.
pub trait Model: Send + Sync {
    /// Adds a tool the model may call.
    fn register(&mut self, tool: Arc<dyn Tool>);

    /// Starts a run over `messages` and returns its events.
    ///
    /// `messages` is copied; the caller's history is never modified. The
    /// run stops when `cancel` fires, when the model answers without tool
    /// calls, when `config` says so, or when the stream is dropped.
    fn stream(
        &self,
        messages: &[Message],
        config: StreamConfig,
        cancel: CancellationToken,
    ) -> EventStream;
}

/// Drives turns of one [`WireAdapter`].
///
/// # Example
///
/// ```rust,ignore
/// let mut model = Orchestrator::new(adapter);
/// model.register(Arc::new(bash_tool));
/// let events = model.stream(
///     &[Message::user("list files")],
///     StreamConfig::default().with_max_turns(10),
///     CancellationToken::new(),
/// );
/// let rollup = ikm_llm::rollup(events).await?;
/// ```
pub struct Orchestrator<A> {
    adapter: Arc<A>,
    tools: ToolRegistry,
}

impl<A: WireAdapter> std::fmt::Debug for Orchestrator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.adapter.name())
            .field("model", &self.adapter.model())
            .field("tools", &self.tools)
            .finish()
    }
}

impl<A: WireAdapter> Orchestrator<A> {
    /// Wraps an adapter with an empty tool registry.
    pub fn new(adapter: A) -> Self {
        Self {
            adapter: Arc::new(adapter),
            tools: ToolRegistry::new(),
        }
    }

    /// The wrapped adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The registered tools.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

impl<A: WireAdapter> Model for Orchestrator<A> {
    fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    /// Spawns the run on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    fn stream(
        &self,
        messages: &[Message],
        config: StreamConfig,
        cancel: CancellationToken,
    ) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let span = info_span!(
            "stream",
            provider = self.adapter.name(),
            model = %self.adapter.model()
        );
        let run = Run {
            adapter: Arc::clone(&self.adapter),
            tools: self.tools.clone(),
            history: messages.to_vec(),
            config,
            cancel,
            tx,
        };
        tokio::spawn(run.execute().instrument(span));
        rx
    }
}

enum TurnOutcome {
    Completed,
    // An error event was already delivered.
    Failed,
    // The caller dropped the stream.
    Closed,
}

struct Run<A> {
    adapter: Arc<A>,
    tools: ToolRegistry,
    history: Vec<Message>,
    config: StreamConfig,
    cancel: CancellationToken,
    tx: mpsc::Sender<Event>,
}

impl<A: WireAdapter> Run<A> {
    async fn execute(mut self) {
        let specs = self.tools.specs();
        let mut checkpoints = self
            .adapter
            .cache_checkpoint_interval()
            .map(CacheCheckpoints::new);

        for turn in 0..self.config.max_turns {
            if self.cancel.is_cancelled() {
                self.fail(LlmError::Cancelled).await;
                return;
            }
            debug!(turn, messages = self.history.len(), "starting turn");

            let mut builder = MessageBuilder::new();
            match self.wire_turn(&specs, &mut builder).await {
                TurnOutcome::Completed => {}
                TurnOutcome::Failed | TurnOutcome::Closed => return,
            }
            let rollup = match builder.finish() {
                Ok(rollup) => rollup,
                Err(err) => {
                    self.fail(err).await;
                    return;
                }
            };
            let count = rollup.messages.len();
            let Ok([assistant]) = <[Message; 1]>::try_from(rollup.messages) else {
                self.fail(LlmError::Protocol(format!(
                    "expected exactly one message, got {count}"
                )))
                .await;
                return;
            };
            if let Some(checkpoints) = checkpoints.as_mut() {
                checkpoints.record(&rollup.usage);
            }
            if assistant.tool_calls.is_empty() {
                debug!(turn, "turn finished without tool calls");
                return;
            }

            let calls = assistant.tool_calls.clone();
            self.history.push(assistant);
            debug!(turn, calls = calls.len(), "dispatching tool calls");
            let outcomes = match dispatch_all(&self.tools, &calls, &self.cancel).await {
                Ok(outcomes) => outcomes,
                Err(err) => {
                    self.fail(err).await;
                    return;
                }
            };
            for (call, result) in calls.iter().zip(outcomes) {
                let content = match &result {
                    Ok(output) => output.clone(),
                    Err(err) => format!("Error: {err}"),
                };
                let event = Event::ToolResult {
                    id: call.id.clone(),
                    result,
                };
                if self.tx.send(event).await.is_err() {
                    return;
                }
                self.history.push(Message::tool_result(
                    call.id.clone(),
                    call.function.name.clone(),
                    content,
                ));
            }
            if let Some(checkpoints) = &checkpoints {
                if checkpoints.apply(&mut self.history) {
                    debug!(turn, "moved cache checkpoint");
                }
            }

            if turn + 1 >= self.config.max_turns || self.config.should_stop(turn, &self.history) {
                debug!(turn, "stopping after tool results");
                return;
            }
        }
    }

    /// Issues one wire call and forwards its events.
    async fn wire_turn(&mut self, specs: &[ToolSpec], builder: &mut MessageBuilder) -> TurnOutcome {
        let events = match self.collect_wire_events(specs, builder).await {
            Ok(outcome) => return outcome,
            Err(err) => vec![Event::Error(err)],
        };
        self.forward(events, builder).await
    }

    async fn collect_wire_events(
        &mut self,
        specs: &[ToolSpec],
        builder: &mut MessageBuilder,
    ) -> Result<TurnOutcome, LlmError> {
        let adapter = Arc::clone(&self.adapter);
        let request = adapter.build_request(&self.history, specs, &self.config)?;
        debug!(url = %request.url, body = %request.body, "sending request");

        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(LlmError::Cancelled),
            response = transport::send(&*adapter, request) => response?,
        };

        let mut reader = FrameReader::new(response.bytes_stream());
        let mut state = A::State::default();
        let mut events = Vec::new();
        let mut terminated = false;
        'read: while let Some(frames) = reader.next_batch(&self.cancel).await? {
            for frame in &frames {
                let flow = adapter.parse_frame(frame, &mut state, &mut events);
                match self.forward(std::mem::take(&mut events), builder).await {
                    TurnOutcome::Completed => {}
                    outcome => return Ok(outcome),
                }
                if flow.is_break() {
                    terminated = true;
                    break 'read;
                }
            }
        }
        if !terminated {
            adapter.finish(&mut state, &mut events);
        }
        Ok(self.forward(events, builder).await)
    }

    /// Folds events into the builder and sends them to the caller.
    async fn forward(&mut self, events: Vec<Event>, builder: &mut MessageBuilder) -> TurnOutcome {
        for event in events {
            builder.process(&event);
            let is_error = event.is_error();
            if self.tx.send(event).await.is_err() {
                return TurnOutcome::Closed;
            }
            if is_error {
                return TurnOutcome::Failed;
            }
        }
        TurnOutcome::Completed
    }

    async fn fail(&mut self, err: LlmError) {
        debug!(error = %err, "run failed");
        // A closed channel means nobody is listening.
        let _ = self.tx.send(Event::Error(err)).await;
    }
}
