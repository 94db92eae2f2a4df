//! End-to-end runner scenarios against a scripted model.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use loopwright_agent::test_helpers::{ScriptedClient, tool_call_reply};
use loopwright_agent::{AgentRunner, CancelHandle, Terminated};
use loopwright_core::{
    AgentError, ClientError, Message, ParamSpec, Role, Tool, ToolError, ToolRegistry,
};

/// `get_weather` returning a fixed literal per city, recording the
/// arguments each invocation received.
struct RecordingWeather {
    invocations: Arc<Mutex<Vec<serde_json::Map<String, serde_json::Value>>>>,
}

impl RecordingWeather {
    fn new() -> (Self, Arc<Mutex<Vec<serde_json::Map<String, serde_json::Value>>>>) {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                invocations: invocations.clone(),
            },
            invocations,
        )
    }
}

#[async_trait]
impl Tool for RecordingWeather {
    fn name(&self) -> &str {
        "get_weather"
    }
    fn description(&self) -> &str {
        "Weather lookup"
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string("city", "The city").required().alias("location")]
    }
    async fn call(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ToolError> {
        self.invocations.lock().unwrap().push(arguments.clone());
        let city = arguments.get("city").and_then(|v| v.as_str()).unwrap_or("?");
        Ok(serde_json::Value::String(format!(
            r#"{{"city":"{city}","temperature":"25C","condition":"sunny"}}"#
        )))
    }
}

fn weather_registry() -> (ToolRegistry, Arc<Mutex<Vec<serde_json::Map<String, serde_json::Value>>>>)
{
    let (tool, invocations) = RecordingWeather::new();
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(tool)).unwrap();
    (registry, invocations)
}

fn runner(client: Arc<ScriptedClient>, registry: ToolRegistry) -> AgentRunner {
    AgentRunner::new(client, Arc::new(registry), "qwen3:8b")
}

#[tokio::test]
async fn single_tool_single_turn() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![(
            "get_weather",
            serde_json::json!({"city": "Tokyo"}),
        )])),
        Ok(Message::assistant("It is 25°C and sunny in Tokyo.")),
    ]));
    let result = runner(client.clone(), registry)
        .run("What's the weather in Tokyo?")
        .await
        .unwrap();

    assert_eq!(result.answer, "It is 25°C and sunny in Tokyo.");
    assert_eq!(result.iterations_used, 1);
    assert_eq!(result.terminated_by, Terminated::Natural);
    assert_eq!(client.calls_made(), 2);

    // system, user, assistant(tool_calls), tool, assistant(text)
    let roles: Vec<Role> = result.transcript.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    let tool_msg = result.transcript.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(tool_msg.content.contains("sunny"));
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_0"));
}

#[tokio::test]
async fn no_tool_needed() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![Ok(Message::assistant("Paris."))]));
    let result = runner(client, registry)
        .run("What is the capital of France?")
        .await
        .unwrap();

    assert_eq!(result.answer, "Paris.");
    assert_eq!(result.iterations_used, 0);
    assert_eq!(result.terminated_by, Terminated::Natural);
}

#[tokio::test]
async fn unknown_tool_self_correction() {
    let (registry, invocations) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![(
            "lookup_weather",
            serde_json::json!({"city": "Tokyo"}),
        )])),
        Ok(tool_call_reply(vec![(
            "get_weather",
            serde_json::json!({"city": "Tokyo"}),
        )])),
        Ok(Message::assistant("It is sunny in Tokyo.")),
    ]));
    let result = runner(client, registry)
        .run("Weather in Tokyo?")
        .await
        .unwrap();

    assert_eq!(result.answer, "It is sunny in Tokyo.");
    assert_eq!(result.iterations_used, 2);
    let error_msg = result
        .transcript
        .iter()
        .find(|m| m.content.starts_with("error: unknown tool lookup_weather"))
        .unwrap();
    assert_eq!(error_msg.role, Role::Tool);
    assert!(error_msg.content.contains("get_weather"));
    assert_eq!(invocations.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn alias_resolves_to_declared_name() {
    let (registry, invocations) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![(
            "get_weather",
            serde_json::json!({"location": "Paris"}),
        )])),
        Ok(Message::assistant("Cloudy in Paris.")),
    ]));
    let result = runner(client, registry).run("Weather in Paris?").await.unwrap();

    assert_eq!(result.terminated_by, Terminated::Natural);
    let seen = invocations.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get("city").and_then(|v| v.as_str()), Some("Paris"));
    assert!(seen[0].get("location").is_none());
}

#[tokio::test]
async fn iteration_cap_stops_the_loop() {
    let (registry, invocations) = weather_registry();
    // The model would call tools forever; the script never runs out before
    // the cap takes effect.
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![("get_weather", serde_json::json!({"city": "Tokyo"}))])),
        Ok(tool_call_reply(vec![("get_weather", serde_json::json!({"city": "Paris"}))])),
        Ok(tool_call_reply(vec![("get_weather", serde_json::json!({"city": "London"}))])),
    ]));
    let result = runner(client.clone(), registry)
        .with_max_iterations(2)
        .run("Weather everywhere?")
        .await
        .unwrap();

    assert_eq!(result.terminated_by, Terminated::Cap);
    assert_eq!(result.iterations_used, 2);
    assert!(result.answer.contains("maximum number of reasoning steps (2)"));
    // two tool-invoking turns, never a third
    assert_eq!(client.calls_made(), 2);
    assert_eq!(invocations.lock().unwrap().len(), 2);
    // the synthetic cap message closes the transcript
    assert_eq!(result.transcript.last().unwrap().role, Role::Assistant);
}

#[tokio::test]
async fn cap_of_zero_never_contacts_the_model() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![]));
    let result = runner(client.clone(), registry)
        .with_max_iterations(0)
        .run("Anything")
        .await
        .unwrap();

    assert_eq!(result.terminated_by, Terminated::Cap);
    assert_eq!(result.iterations_used, 0);
    assert_eq!(client.calls_made(), 0);
}

#[tokio::test]
async fn two_calls_in_one_turn_run_in_order() {
    let (registry, invocations) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![
            ("get_weather", serde_json::json!({"city": "Tokyo"})),
            ("get_weather", serde_json::json!({"city": "Paris"})),
        ])),
        Ok(Message::assistant("Sunny in both.")),
    ]));
    let result = runner(client, registry).run("Tokyo and Paris?").await.unwrap();

    assert_eq!(result.iterations_used, 1);
    let tool_messages: Vec<&Message> = result
        .transcript
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_messages.len(), 2);
    assert!(tool_messages[0].content.contains("Tokyo"));
    assert!(tool_messages[1].content.contains("Paris"));
    let seen = invocations.lock().unwrap();
    assert_eq!(seen[0]["city"], "Tokyo");
    assert_eq!(seen[1]["city"], "Paris");
}

#[tokio::test]
async fn three_calls_yield_three_tool_messages_then_one_more_turn() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![
            ("get_weather", serde_json::json!({"city": "Tokyo"})),
            ("get_weather", serde_json::json!({"city": "Paris"})),
            ("get_weather", serde_json::json!({"city": "London"})),
        ])),
        Ok(Message::assistant("Done.")),
    ]));
    let result = runner(client.clone(), registry).run("Three cities").await.unwrap();

    let tool_count = result.transcript.iter().filter(|m| m.role == Role::Tool).count();
    assert_eq!(tool_count, 3);
    assert_eq!(client.calls_made(), 2);
}

#[tokio::test]
async fn thinking_spans_stripped_from_final_answer_only() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![Ok(Message::assistant(
        "<think>The capital is obviously Paris.</think>Paris.",
    ))]));
    let result = runner(client, registry).run("Capital of France?").await.unwrap();

    assert_eq!(result.answer, "Paris.");
    // the transcript keeps the raw reply
    assert!(result.transcript.last().unwrap().content.contains("<think>"));
}

#[tokio::test]
async fn empty_reply_retried_within_budget() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(Message::assistant("<think>hmm</think>")),
        Ok(Message::assistant("   ")),
        Ok(Message::assistant("A real answer.")),
    ]));
    let result = runner(client.clone(), registry).run("Question").await.unwrap();

    assert_eq!(result.answer, "A real answer.");
    assert_eq!(client.calls_made(), 3);
    // the discarded empty replies never reached the transcript
    let assistant_count = result
        .transcript
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .count();
    assert_eq!(assistant_count, 1);
}

#[tokio::test]
async fn empty_replies_exhaust_the_retry_budget() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(Message::assistant("<think>a</think>")),
        Ok(Message::assistant("<think>b</think>")),
        Ok(Message::assistant("<think>c</think>")),
    ]));
    let err = runner(client.clone(), registry).run("Question").await.unwrap_err();

    assert!(matches!(err, AgentError::EmptyReply { attempts: 3 }));
    assert_eq!(client.calls_made(), 3);
}

#[tokio::test]
async fn protocol_errors_retried_then_surfaced() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Err(ClientError::Protocol("empty choices".into())),
        Err(ClientError::Decode("bad json".into())),
        Err(ClientError::Decode("bad json again".into())),
    ]));
    let err = runner(client.clone(), registry).run("Question").await.unwrap_err();

    assert!(matches!(err, AgentError::Client(ClientError::Decode(_))));
    assert_eq!(client.calls_made(), 3);
}

#[tokio::test]
async fn transport_errors_surface_immediately() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![Err(ClientError::Transport(
        "connection refused".into(),
    ))]));
    let err = runner(client.clone(), registry).run("Question").await.unwrap_err();

    assert!(matches!(err, AgentError::Client(ClientError::Transport(_))));
    assert_eq!(client.calls_made(), 1);
}

#[tokio::test]
async fn final_answer_tool_terminates_without_another_turn() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![Ok(tool_call_reply(vec![(
        "final_answer",
        serde_json::json!({"answer": "The weather is fine."}),
    )]))]));
    let result = runner(client.clone(), registry)
        .with_final_answer_tool(true)
        .run("Weather?")
        .await
        .unwrap();

    assert_eq!(result.answer, "The weather is fine.");
    assert_eq!(result.terminated_by, Terminated::Natural);
    assert_eq!(result.iterations_used, 0);
    assert_eq!(client.calls_made(), 1);
    assert_eq!(result.transcript.last().unwrap().role, Role::Assistant);
    assert_eq!(result.transcript.last().unwrap().content, "The weather is fine.");

    // the reserved tool was advertised alongside the registry's own
    let request = &client.requests()[0];
    assert!(request.tools.iter().any(|t| t.name == "final_answer"));
}

#[tokio::test]
async fn final_answer_without_answer_text_is_reflected_back() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![("final_answer", serde_json::json!({}))])),
        Ok(tool_call_reply(vec![(
            "final_answer",
            serde_json::json!({"answer": "<think>still deciding</think>"}),
        )])),
        Ok(Message::assistant("A proper answer.")),
    ]));
    let result = runner(client.clone(), registry)
        .with_final_answer_tool(true)
        .run("Question")
        .await
        .unwrap();

    // the empty calls never terminated the run
    assert_eq!(result.answer, "A proper answer.");
    assert_eq!(result.terminated_by, Terminated::Natural);
    assert!(!result.answer.is_empty());
    assert_eq!(result.iterations_used, 2);
    assert_eq!(client.calls_made(), 3);
    // the unusable calls came back as tool errors the model could act on
    let reflected = result
        .transcript
        .iter()
        .filter(|m| m.content.starts_with("error: unknown tool final_answer"))
        .count();
    assert_eq!(reflected, 2);
    assert_eq!(result.transcript.last().unwrap().role, Role::Assistant);
    assert_eq!(result.transcript.last().unwrap().content, "A proper answer.");
}

#[tokio::test]
async fn final_answer_not_advertised_by_default() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![Ok(Message::assistant("Hi."))]));
    runner(client.clone(), registry).run("Hello").await.unwrap();

    let request = &client.requests()[0];
    assert!(!request.tools.iter().any(|t| t.name == "final_answer"));
    assert!(request.tools.iter().any(|t| t.name == "get_weather"));
}

#[tokio::test]
async fn repeated_identical_calls_replayed_when_opted_in() {
    struct CountingIdempotent {
        count: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl Tool for CountingIdempotent {
        fn name(&self) -> &str {
            "lookup"
        }
        fn description(&self) -> &str {
            "Idempotent lookup"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::string("key", "The key").required()]
        }
        fn idempotent(&self) -> bool {
            true
        }
        async fn call(
            &self,
            _arguments: serde_json::Map<String, serde_json::Value>,
        ) -> Result<serde_json::Value, ToolError> {
            *self.count.lock().unwrap() += 1;
            Ok(serde_json::Value::String("value".into()))
        }
    }

    let count = Arc::new(Mutex::new(0u32));
    let mut registry = ToolRegistry::new();
    registry
        .register(Box::new(CountingIdempotent { count: count.clone() }))
        .unwrap();

    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![("lookup", serde_json::json!({"key": "a"}))])),
        Ok(tool_call_reply(vec![("lookup", serde_json::json!({"key": "a"}))])),
        Ok(Message::assistant("Found it.")),
    ]));
    let result = AgentRunner::new(client, Arc::new(registry), "qwen3:8b")
        .with_idempotent_short_circuit(true)
        .run("Look up a")
        .await
        .unwrap();

    assert_eq!(result.answer, "Found it.");
    // second identical call was answered from the first result
    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(
        result.transcript.iter().filter(|m| m.role == Role::Tool).count(),
        2
    );
}

#[tokio::test]
async fn cancelled_handle_stops_before_the_first_turn() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![Ok(Message::assistant("Never sent."))]));
    let cancel = CancelHandle::new();
    cancel.cancel();
    let err = runner(client.clone(), registry)
        .run_with_cancel("Question", cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Cancelled));
    assert_eq!(client.calls_made(), 0);
}

#[tokio::test]
async fn resume_threads_an_existing_transcript() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(Message::assistant("First answer.")),
        Ok(Message::assistant("Second answer.")),
    ]));
    let agent = runner(client.clone(), registry);

    let first = agent.run("First question").await.unwrap();
    let second = agent
        .resume(first.transcript, "Second question")
        .await
        .unwrap();

    assert_eq!(second.answer, "Second answer.");
    // the second request carried the whole prior conversation
    let request = &client.requests()[1];
    assert!(request.messages.iter().any(|m| m.content == "First question"));
    assert!(request.messages.iter().any(|m| m.content == "First answer."));
}

#[tokio::test]
async fn builtin_registry_chains_manager_then_team() {
    let registry = loopwright_tools::default_registry().unwrap();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![("get_my_manager", serde_json::json!({}))])),
        Ok(tool_call_reply(vec![(
            "get_team_members",
            serde_json::json!({"manager_name": "Alice Johnson"}),
        )])),
        Ok(Message::assistant(
            "Your manager is Alice Johnson; her team has three members.",
        )),
    ]));
    let result = AgentRunner::new(client, Arc::new(registry), "qwen3:8b")
        .run("Who is on my manager's team?")
        .await
        .unwrap();

    assert_eq!(result.iterations_used, 2);
    let team_msg = result
        .transcript
        .iter()
        .find(|m| m.tool_name.as_deref() == Some("get_team_members"))
        .unwrap();
    assert!(team_msg.content.contains("Bob Smith"));
}

#[tokio::test]
async fn oversized_tool_result_is_truncated_and_run_continues() {
    struct BigTool;

    #[async_trait]
    impl Tool for BigTool {
        fn name(&self) -> &str {
            "dump"
        }
        fn description(&self) -> &str {
            "Large output"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![]
        }
        async fn call(
            &self,
            _arguments: serde_json::Map<String, serde_json::Value>,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::Value::String("y".repeat(64 * 1024)))
        }
    }

    let mut registry = ToolRegistry::new().with_result_max_bytes(1024);
    registry.register(Box::new(BigTool)).unwrap();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![("dump", serde_json::json!({}))])),
        Ok(Message::assistant("That was a lot.")),
    ]));
    let result = AgentRunner::new(client, Arc::new(registry), "qwen3:8b")
        .run("Dump it")
        .await
        .unwrap();

    assert_eq!(result.terminated_by, Terminated::Natural);
    let tool_msg = result.transcript.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(tool_msg.content.ends_with("…[truncated]"));
    assert!(tool_msg.content.len() < 2048);
}

#[tokio::test]
async fn dropped_arguments_recorded_in_metadata() {
    let (registry, _) = weather_registry();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_call_reply(vec![(
            "get_weather",
            serde_json::json!({"city": "Tokyo", "verbosity": "high"}),
        )])),
        Ok(Message::assistant("Sunny.")),
    ]));
    let result = runner(client, registry).run("Weather?").await.unwrap();

    let tool_msg = result.transcript.iter().find(|m| m.role == Role::Tool).unwrap();
    assert_eq!(
        tool_msg.metadata["dropped_arguments"],
        serde_json::json!(["verbosity"])
    );
}
