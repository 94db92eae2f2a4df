//! The agent controller: a bounded recursive tool-calling loop.
//!
//! One run alternates model turns with tool executions. A turn whose reply
//! carries tool calls consumes one iteration; a plain-text turn ends the run.
//! The iteration cap is checked before each model call, so a run never does
//! more tool-invoking turns than configured and a cap of zero never contacts
//! the model at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use loopwright_core::{
    AgentError, ChatClient, ChatRequest, ClientError, FINAL_ANSWER_TOOL, Message, Role, ToolCall,
    ToolError, ToolRegistry, Transcript, final_answer_definition, sanitize,
};

/// Seeded when the caller supplies no system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the available tools \
    when they help you answer the user's question. You may call tools multiple times and build \
    on earlier results. When you have everything you need, reply with a final textual answer.";

/// Two retries on top of the first attempt for a turn that yields no
/// usable reply (empty after sanitizing, undecodable, or protocol-breaking).
const MAX_TURN_ATTEMPTS: u32 = 3;

/// Cooperative cancellation flag, observed at turn boundaries.
///
/// Cancelling never interrupts an in-flight model call or tool handler;
/// the run stops before it would start the next turn.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a run reached its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminated {
    /// The model produced a final text reply (or called `final_answer`).
    Natural,
    /// The iteration cap was reached.
    Cap,
}

/// The outcome of a completed run.
#[derive(Debug)]
pub struct FinalResult {
    /// Sanitized final answer text.
    pub answer: String,
    /// The full transcript, returned for inspection.
    pub transcript: Transcript,
    /// Tool-invoking turns consumed.
    pub iterations_used: u32,
    pub terminated_by: Terminated,
}

/// Drives the turn loop against one client and one registry.
///
/// The runner is cheap to share: all per-run state lives in the transcript,
/// so one runner may serve many sequential runs.
pub struct AgentRunner {
    client: Arc<dyn ChatClient>,
    registry: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
    top_p: f32,
    max_iterations: u32,
    system_prompt: String,
    offer_final_answer: bool,
    idempotent_short_circuit: bool,
}

impl AgentRunner {
    pub fn new(
        client: Arc<dyn ChatClient>,
        registry: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            registry,
            model: model.into(),
            temperature: 0.1,
            top_p: 0.9,
            max_iterations: 10,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            offer_final_answer: false,
            idempotent_short_circuit: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Upper bound on tool-invoking turns. Zero answers without ever
    /// contacting the model.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Also advertise the reserved `final_answer` tool, letting the model
    /// terminate explicitly instead of by replying with plain text.
    pub fn with_final_answer_tool(mut self, offer: bool) -> Self {
        self.offer_final_answer = offer;
        self
    }

    /// Replay the previous turn's results when the model repeats an
    /// identical tool-call sequence, for handlers declared idempotent.
    /// Off by default.
    pub fn with_idempotent_short_circuit(mut self, enabled: bool) -> Self {
        self.idempotent_short_circuit = enabled;
        self
    }

    /// Run one question to completion on a fresh transcript.
    pub async fn run(&self, user_input: &str) -> Result<FinalResult, AgentError> {
        self.run_with_cancel(user_input, CancelHandle::new()).await
    }

    /// Like [`run`](Self::run), with a cancellation flag observed at turn
    /// boundaries.
    pub async fn run_with_cancel(
        &self,
        user_input: &str,
        cancel: CancelHandle,
    ) -> Result<FinalResult, AgentError> {
        let mut transcript = Transcript::new();
        transcript.append(Message::system(self.system_prompt.clone()));
        transcript.append(Message::user(user_input));
        self.drive(transcript, &cancel).await
    }

    /// Continue an existing transcript with a follow-up question. Used by
    /// interactive sessions to thread conversation state across runs.
    pub async fn resume(
        &self,
        mut transcript: Transcript,
        user_input: &str,
    ) -> Result<FinalResult, AgentError> {
        if transcript.is_empty() {
            transcript.append(Message::system(self.system_prompt.clone()));
        }
        transcript.append(Message::user(user_input));
        self.drive(transcript, &CancelHandle::new()).await
    }

    async fn drive(
        &self,
        mut transcript: Transcript,
        cancel: &CancelHandle,
    ) -> Result<FinalResult, AgentError> {
        let mut iterations = 0u32;
        // previous turn's (call, output) pairs for the optional short-circuit
        let mut previous_turn: Vec<(ToolCall, String)> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                info!(iterations, "Run cancelled at turn boundary");
                return Err(AgentError::Cancelled);
            }

            if iterations >= self.max_iterations {
                return Ok(self.cap_result(transcript, iterations));
            }

            let reply = self.model_turn(&transcript).await?;

            if !reply.has_tool_calls() {
                let answer = sanitize::clean(&reply.content);
                transcript.append(reply);
                info!(iterations, "Run finished with a text reply");
                return Ok(FinalResult {
                    answer,
                    transcript,
                    iterations_used: iterations,
                    terminated_by: Terminated::Natural,
                });
            }

            // explicit termination via the reserved tool; a call with no
            // usable answer falls through to normal dispatch, where the
            // unregistered name comes back as a tool error the model can
            // correct on its next turn
            if let Some(call) = reply
                .tool_calls
                .iter()
                .find(|c| c.name == FINAL_ANSWER_TOOL)
            {
                let answer = sanitize::clean(
                    call.arguments
                        .get("answer")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default(),
                );
                if !answer.is_empty() {
                    transcript.append(reply.clone());
                    transcript.append(Message::assistant(answer.clone()));
                    info!(iterations, "Run finished via final_answer tool");
                    return Ok(FinalResult {
                        answer,
                        transcript,
                        iterations_used: iterations,
                        terminated_by: Terminated::Natural,
                    });
                }
                warn!("final_answer call carried no answer text");
            }

            let calls = reply.tool_calls.clone();
            transcript.append(reply);

            let replayable = self.idempotent_short_circuit
                && previous_turn.len() == calls.len()
                && previous_turn
                    .iter()
                    .zip(&calls)
                    .all(|((prev, _), cur)| prev.name == cur.name && prev.arguments == cur.arguments);

            let mut this_turn = Vec::with_capacity(calls.len());
            for (index, call) in calls.iter().enumerate() {
                let output = if replayable && self.is_idempotent(&call.name) {
                    debug!(tool = %call.name, "Replaying previous result for repeated call");
                    let (_, cached) = &previous_turn[index];
                    transcript.append(Message::tool_result(
                        call.name.clone(),
                        call.id.clone(),
                        cached.clone(),
                    ));
                    cached.clone()
                } else {
                    self.dispatch(call, &mut transcript).await
                };
                this_turn.push((call.clone(), output));
            }
            previous_turn = this_turn;

            iterations += 1;
        }
    }

    /// One model call with the per-turn retry budget.
    ///
    /// A reply that sanitizes to nothing, fails to decode, or breaks the
    /// turn protocol is retried with the same transcript; nothing has been
    /// appended yet, so retrying never duplicates messages.
    async fn model_turn(&self, transcript: &Transcript) -> Result<Message, AgentError> {
        let mut tools: Vec<_> = self.registry.definitions();
        if self.offer_final_answer {
            tools.push(final_answer_definition());
        }
        let request = ChatRequest {
            model: self.model.clone(),
            messages: transcript.as_slice().to_vec(),
            tools,
            temperature: self.temperature,
            top_p: self.top_p,
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.client.send(request.clone()).await {
                Ok(reply) if reply.has_tool_calls() => return Ok(reply),
                Ok(reply) => {
                    if !sanitize::clean(&reply.content).is_empty() {
                        return Ok(reply);
                    }
                    if attempts >= MAX_TURN_ATTEMPTS {
                        return Err(AgentError::EmptyReply { attempts });
                    }
                    warn!(attempts, "Reply sanitized to nothing, retrying turn");
                }
                Err(e @ (ClientError::Decode(_) | ClientError::Protocol(_)))
                    if attempts < MAX_TURN_ATTEMPTS =>
                {
                    warn!(attempts, error = %e, "Malformed reply, retrying turn");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Execute one tool call and append its result message. Unknown tools
    /// are reflected back to the model with the list of what is available.
    async fn dispatch(&self, call: &ToolCall, transcript: &mut Transcript) -> String {
        let output = match self.registry.invoke(call).await {
            Ok(outcome) => {
                let mut message = Message::tool_result(
                    call.name.clone(),
                    call.id.clone(),
                    outcome.output.clone(),
                );
                if !outcome.dropped_arguments.is_empty() {
                    message.metadata.insert(
                        "dropped_arguments".into(),
                        serde_json::json!(outcome.dropped_arguments),
                    );
                }
                debug!(tool = %call.name, bytes = outcome.output.len(), "Tool executed");
                transcript.append(message);
                return outcome.output;
            }
            Err(ToolError::UnknownTool(name)) => {
                warn!(tool = %name, "Model requested a tool that is not registered");
                format!(
                    "error: unknown tool {name}; available tools: {}",
                    self.registry.names().join(", ")
                )
            }
            Err(e) => format!("error: {e}"),
        };
        transcript.append(Message::tool_result(
            call.name.clone(),
            call.id.clone(),
            output.clone(),
        ));
        output
    }

    fn is_idempotent(&self, name: &str) -> bool {
        self.registry.get(name).is_some_and(|t| t.idempotent())
    }

    fn cap_result(&self, mut transcript: Transcript, iterations: u32) -> FinalResult {
        info!(iterations, "Iteration cap reached");
        let mut answer = format!(
            "Reached the maximum number of reasoning steps ({}).",
            self.max_iterations
        );
        let last_assistant = transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.is_empty())
            .map(|m| m.content.clone());
        if let Some(text) = last_assistant {
            // included verbatim so the caller can inspect where it stalled
            answer.push_str("\n\nLast assistant message:\n");
            answer.push_str(&text);
        }
        transcript.append(Message::assistant(answer.clone()));
        FinalResult {
            answer,
            transcript,
            iterations_used: iterations,
            terminated_by: Terminated::Cap,
        }
    }
}
