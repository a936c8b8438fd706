//! End-to-end tests of the bus, the three agents and the bootstrap

use super::*;
use crate::ai::{AiClient, AiError, AiResponse, MockAiClient, ToolCall};
use crate::db::Database;
use crate::gateway::{EventBroadcaster, GatewayEvent};
use crate::tools::builtin::ExecutionAccount;
use crate::tools::signals::{self, NO_FURTHER_ACTIONS, SEND_MESSAGE_TO_EXECUTOR, SEND_MESSAGE_TO_OBSERVER};
use crate::tools::Toolkit;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

// ---------------------------------------------------------------------------
// Test agents
// ---------------------------------------------------------------------------

/// Records which stub handled which route and replies with a fixed envelope
struct StubAgent {
    name: AgentName,
    label: usize,
    hits: Arc<Mutex<Vec<(usize, Route)>>>,
    reply: Option<Envelope>,
}

impl StubAgent {
    fn new(name: AgentName, label: usize, hits: &Arc<Mutex<Vec<(usize, Route)>>>) -> Arc<Self> {
        Arc::new(StubAgent { name, label, hits: hits.clone(), reply: None })
    }
}

#[async_trait]
impl Agent for StubAgent {
    fn name(&self) -> AgentName {
        self.name
    }

    async fn handle_event(
        &self,
        envelope: Envelope,
        _cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        self.hits.lock().push((self.label, envelope.route()));
        Ok(self.reply.clone())
    }
}

/// Wraps a real agent, records every envelope it receives and cancels the
/// cycle once `stop_after` envelopes have been seen across all recorders
struct Recorder {
    inner: Arc<dyn Agent>,
    seen: Arc<Mutex<Vec<Envelope>>>,
    stop_after: usize,
    cancel: CancellationToken,
}

#[async_trait]
impl Agent for Recorder {
    fn name(&self) -> AgentName {
        self.inner.name()
    }

    async fn handle_event(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        let count = {
            let mut seen = self.seen.lock();
            seen.push(envelope.clone());
            seen.len()
        };
        if count >= self.stop_after {
            self.cancel.cancel();
        }
        self.inner.handle_event(envelope, cancel).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    observer: Arc<ObserverAgent>,
    task_manager: Arc<TaskManagerAgent>,
    executor: Arc<ExecutorAgent>,
    observer_ai: Arc<AiClient>,
    task_manager_ai: Arc<AiClient>,
    executor_ai: Arc<AiClient>,
    report_ai: Arc<AiClient>,
    db: Arc<Database>,
}

fn scripted(responses: Vec<AiResponse>) -> AiClient {
    AiClient::mock(responses.into_iter().map(Ok).collect())
}

fn repeating(response: AiResponse) -> AiClient {
    AiClient::Mock(MockAiClient::new(vec![]).with_fallback(response))
}

fn harness(
    observer_ai: AiClient,
    task_manager_ai: AiClient,
    executor_ai: AiClient,
    report_ai: AiClient,
    broadcaster: Option<Arc<EventBroadcaster>>,
) -> Harness {
    let db = Arc::new(Database::new(":memory:").unwrap());
    let observer_ai = Arc::new(observer_ai);
    let task_manager_ai = Arc::new(task_manager_ai);
    let executor_ai = Arc::new(executor_ai);
    let report_ai = Arc::new(report_ai);

    let deps = |ai: &Arc<AiClient>| {
        let deps = AgentDeps::new(ai.clone(), db.clone());
        match &broadcaster {
            Some(b) => deps.with_broadcaster(b.clone()),
            None => deps,
        }
    };

    let account = ExecutionAccount::from_private_key(DEV_KEY, 8453, "base", "http://127.0.0.1:1", true).unwrap();

    let observer = Arc::new(ObserverAgent::new(
        deps(&observer_ai),
        Arc::new(Toolkit::new("observer").with_signal(signals::no_further_actions_tool())),
        account.address_string(),
        ObserverSettings {
            network: "base".to_string(),
            step_limit: 10,
            idle_default: Duration::from_secs(300),
            idle_max: Duration::from_secs(3600),
        },
    ));
    let task_manager = Arc::new(TaskManagerAgent::new(deps(&task_manager_ai), report_ai.clone(), 10));
    let executor = Arc::new(ExecutorAgent::new(
        deps(&executor_ai),
        Arc::new(Toolkit::new("executor")),
        Arc::new(account),
        10,
    ));

    Harness {
        observer,
        task_manager,
        executor,
        observer_ai,
        task_manager_ai,
        executor_ai,
        report_ai,
        db,
    }
}

impl Harness {
    /// Bus wired through recorders that cancel after `stop_after` deliveries
    fn recorded_bus(&self, stop_after: usize) -> (Bus, Arc<Mutex<Vec<Envelope>>>, CancellationToken) {
        let cancel = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = |inner: Arc<dyn Agent>| -> Arc<dyn Agent> {
            Arc::new(Recorder {
                inner,
                seen: seen.clone(),
                stop_after,
                cancel: cancel.clone(),
            })
        };

        let observer: Arc<dyn Agent> = self.observer.clone();
        let task_manager: Arc<dyn Agent> = self.task_manager.clone();
        let executor: Arc<dyn Agent> = self.executor.clone();

        let mut bus = Bus::new(cancel.clone());
        wire(&mut bus, record(observer), record(task_manager), record(executor)).unwrap();
        (bus, seen, cancel)
    }
}

fn executor_call(message: &str) -> AiResponse {
    AiResponse::with_tools("", vec![ToolCall::new(SEND_MESSAGE_TO_EXECUTOR, json!({ "message": message }))])
}

fn observer_call(message: &str) -> AiResponse {
    AiResponse::with_tools("", vec![ToolCall::new(SEND_MESSAGE_TO_OBSERVER, json!({ "message": message }))])
}

fn idle_call(wait_time: u64) -> AiResponse {
    AiResponse::with_tools(
        "",
        vec![ToolCall::new(NO_FURTHER_ACTIONS, json!({ "reason": "market is flat", "wait_time": wait_time }))],
    )
}

async fn next_event(rx: &mut mpsc::Receiver<GatewayEvent>, name: &str) -> Option<GatewayEvent> {
    loop {
        match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
            Ok(Some(event)) if event.event == name => return Some(event),
            Ok(Some(_)) => continue,
            _ => return None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut bus = Bus::new(CancellationToken::new());

    bus.register(Route::ObserverToTaskManager, StubAgent::new(AgentName::TaskManager, 1, &hits))
        .unwrap();
    let err = bus
        .register(Route::ObserverToTaskManager, StubAgent::new(AgentName::TaskManager, 2, &hits))
        .unwrap_err();
    assert!(matches!(err, BusError::RouteAlreadyRegistered(Route::ObserverToTaskManager)));

    bus.dispatch(Envelope::ObserverToTaskManager(Observation::Report { report: "r".to_string() }))
        .await
        .unwrap();
    assert_eq!(*hits.lock(), vec![(1, Route::ObserverToTaskManager)]);
}

#[tokio::test]
async fn test_replace_always_reaches_latest_handler() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut bus = Bus::new(CancellationToken::new());

    for n in 1..=5 {
        let previous = bus.replace(Route::TaskManagerToObserver, StubAgent::new(AgentName::Observer, n, &hits));
        assert_eq!(previous.is_some(), n > 1);

        bus.dispatch(Envelope::TaskManagerToObserver(None)).await.unwrap();
        assert_eq!(hits.lock().last(), Some(&(n, Route::TaskManagerToObserver)));
    }
    assert_eq!(hits.lock().len(), 5);
}

#[tokio::test]
async fn test_unregistered_route_is_silently_dropped() {
    let bus = Bus::new(CancellationToken::new());
    let envelope = Envelope::TaskManagerToObserver(Some(CycleFeedback {
        result: "done".to_string(),
        report: "r".to_string(),
    }));

    assert_eq!(bus.dispatch(envelope.clone()).await.unwrap(), None);
    assert_eq!(
        bus.emit(envelope).await.unwrap(),
        EmitOutcome::Dropped { route: Route::TaskManagerToObserver, hops: 0 }
    );
}

#[tokio::test]
async fn test_emit_stops_at_missing_feedback_route() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut bus = Bus::new(CancellationToken::new());
    let reply = Envelope::TaskManagerToObserver(None);
    bus.register(
        Route::ObserverToTaskManager,
        Arc::new(StubAgent { name: AgentName::TaskManager, label: 1, hits: hits.clone(), reply: Some(reply) }),
    )
    .unwrap();

    let outcome = bus
        .emit(Envelope::ObserverToTaskManager(Observation::Report { report: "r".to_string() }))
        .await
        .unwrap();
    assert_eq!(outcome, EmitOutcome::Dropped { route: Route::TaskManagerToObserver, hops: 1 });
}

#[tokio::test]
async fn test_wiring_is_independent_of_registration_order() {
    fn permutations(items: &[Route]) -> Vec<Vec<Route>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let first = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, first);
                out.push(tail);
            }
        }
        out
    }

    let sample = |route: Route| match route {
        Route::ObserverToTaskManager => Envelope::ObserverToTaskManager(Observation::Report { report: "r".to_string() }),
        Route::TaskManagerToExecutor => Envelope::TaskManagerToExecutor(DispatchInstruction {
            instruction: "i".to_string(),
            report: "r".to_string(),
        }),
        Route::ExecutorToTaskManager => Envelope::ExecutorToTaskManager(ExecutionResult {
            result: "x".to_string(),
            report: "r".to_string(),
        }),
        Route::TaskManagerToObserver => Envelope::TaskManagerToObserver(None),
    };

    let orders = permutations(&Route::ALL);
    assert_eq!(orders.len(), 24);

    for order in orders {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let observer = StubAgent::new(AgentName::Observer, 0, &hits);
        let task_manager = StubAgent::new(AgentName::TaskManager, 1, &hits);
        let executor = StubAgent::new(AgentName::Executor, 2, &hits);

        let mut bus = Bus::new(CancellationToken::new());
        for route in &order {
            let agent: Arc<dyn Agent> = match route.destination() {
                AgentName::Observer => observer.clone(),
                AgentName::TaskManager => task_manager.clone(),
                AgentName::Executor => executor.clone(),
            };
            bus.register(*route, agent).unwrap();
        }
        assert_eq!(bus.routes(), Route::ALL.to_vec());

        for route in Route::ALL {
            bus.dispatch(sample(route)).await.unwrap();
        }
        assert_eq!(
            *hits.lock(),
            vec![
                (1, Route::ObserverToTaskManager),
                (2, Route::TaskManagerToExecutor),
                (1, Route::ExecutorToTaskManager),
                (0, Route::TaskManagerToObserver),
            ],
            "order {:?}",
            order
        );
    }
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_scenario_full_cycle() {
    let h = harness(
        scripted(vec![AiResponse::text("price is high")]),
        scripted(vec![executor_call("sell 10 units")]),
        scripted(vec![AiResponse::text("sold")]),
        scripted(vec![AiResponse::text("cycle complete")]),
        None,
    );
    let (bus, seen, cancel) = h.recorded_bus(4);

    let first = h.observer.start(None, &cancel).await.unwrap();
    let outcome = bus.emit(first).await.unwrap();
    assert_eq!(outcome, EmitOutcome::Cancelled { hops: 4 });
    assert_eq!(bus.completed_cycles(), 1);

    assert_eq!(
        *seen.lock(),
        vec![
            Envelope::ObserverToTaskManager(Observation::Report { report: "price is high".to_string() }),
            Envelope::TaskManagerToExecutor(DispatchInstruction {
                instruction: "sell 10 units".to_string(),
                report: "price is high".to_string(),
            }),
            Envelope::ExecutorToTaskManager(ExecutionResult {
                result: "sold".to_string(),
                report: "price is high".to_string(),
            }),
            Envelope::TaskManagerToObserver(Some(CycleFeedback {
                result: "cycle complete".to_string(),
                report: "price is high".to_string(),
            })),
        ]
    );

    let tm_trace = h.task_manager_ai.mock_trace();
    assert_eq!(tm_trace.len(), 1);
    assert!(tm_trace[0].input_messages[1].content.contains("Observer agent report:\nprice is high"));
    assert_eq!(tm_trace[0].tool_names, vec![SEND_MESSAGE_TO_EXECUTOR, SEND_MESSAGE_TO_OBSERVER]);
    assert_eq!(h.executor_ai.mock_trace().len(), 1);
    assert_eq!(h.report_ai.mock_trace().len(), 1);

    use crate::memory::AgentMemory;
    let stored = h.db.retrieve_reports("cycle complete", 5).unwrap();
    assert_eq!(stored[0].content, "cycle complete");
}

#[tokio::test]
async fn test_cycle_liveness_over_many_rounds() {
    const ROUNDS: usize = 5;
    let h = harness(
        repeating(AiResponse::text("price is high")),
        repeating(executor_call("sell 10 units")),
        repeating(AiResponse::text("sold")),
        repeating(AiResponse::text("cycle complete")),
        None,
    );
    let (bus, seen, cancel) = h.recorded_bus(ROUNDS * 4);

    let first = h.observer.start(None, &cancel).await.unwrap();
    let outcome = bus.emit(first).await.unwrap();
    assert_eq!(outcome, EmitOutcome::Cancelled { hops: ROUNDS * 4 });

    let routes: Vec<Route> = seen.lock().iter().map(|e| e.route()).collect();
    let expected: Vec<Route> = Route::ALL.iter().copied().cycle().take(ROUNDS * 4).collect();
    assert_eq!(routes, expected);

    // Observer: one fresh start plus one observation per completed round before the cancel
    assert_eq!(h.observer_ai.mock_trace().len(), ROUNDS);
    assert_eq!(h.executor_ai.mock_trace().len(), ROUNDS);
}

#[tokio::test(start_paused = true)]
async fn test_idle_branch_waits_without_deciding() {
    let h = harness(scripted(vec![]), scripted(vec![]), scripted(vec![]), scripted(vec![]), None);
    let started = tokio::time::Instant::now();

    let out = h
        .task_manager
        .handle_event(
            Envelope::ObserverToTaskManager(Observation::Idle(IdleSignal {
                reason: "market is flat".to_string(),
                wait: Duration::from_millis(1000),
            })),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(out, Some(Envelope::TaskManagerToObserver(None)));
    assert!(h.task_manager_ai.mock_trace().is_empty());
    assert!(h.report_ai.mock_trace().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_observer_idle_round_trip_restarts_fresh() {
    let h = harness(
        scripted(vec![idle_call(2), AiResponse::text("fresh report")]),
        scripted(vec![]),
        scripted(vec![]),
        scripted(vec![]),
        None,
    );
    let (bus, seen, cancel) = h.recorded_bus(3);
    let started = tokio::time::Instant::now();

    let feedback = Some(CycleFeedback { result: "sold".to_string(), report: "price is high".to_string() });
    let first = h.observer.start(feedback, &cancel).await.unwrap();
    assert!(matches!(first, Envelope::ObserverToTaskManager(Observation::Idle(_))));

    let outcome = bus.emit(first).await.unwrap();
    assert_eq!(outcome, EmitOutcome::Cancelled { hops: 3 });
    assert!(started.elapsed() >= Duration::from_secs(2));

    let seen = seen.lock();
    assert_eq!(seen[1], Envelope::TaskManagerToObserver(None));
    assert_eq!(
        seen[2],
        Envelope::ObserverToTaskManager(Observation::Report { report: "fresh report".to_string() })
    );

    // The restart after idle uses the starting prompt, not feedback
    let trace = h.observer_ai.mock_trace();
    assert_eq!(trace[1].input_messages.len(), 2);
    assert!(h.task_manager_ai.mock_trace().is_empty());
}

#[tokio::test]
async fn test_ambiguous_decision_defaults_to_observer() {
    for response in [
        AiResponse::text("I am not sure"),
        executor_call(""),
        AiResponse::with_tools("", vec![ToolCall::new(SEND_MESSAGE_TO_EXECUTOR, json!({}))]),
    ] {
        let h = harness(scripted(vec![]), scripted(vec![response]), scripted(vec![]), scripted(vec![]), None);

        let out = h
            .task_manager
            .handle_event(
                Envelope::ObserverToTaskManager(Observation::Report { report: "price is high".to_string() }),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            out,
            Some(Envelope::TaskManagerToObserver(Some(CycleFeedback {
                result: DEFAULT_GUIDANCE.to_string(),
                report: "price is high".to_string(),
            })))
        );
        assert!(!DEFAULT_GUIDANCE.is_empty());
    }
}

#[tokio::test]
async fn test_observer_guidance_is_forwarded() {
    let h = harness(scripted(vec![]), scripted(vec![observer_call("look at EURC")]), scripted(vec![]), scripted(vec![]), None);
    let out = h
        .task_manager
        .handle_event(
            Envelope::ObserverToTaskManager(Observation::Report { report: "r".to_string() }),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        out,
        Some(Envelope::TaskManagerToObserver(Some(CycleFeedback {
            result: "look at EURC".to_string(),
            report: "r".to_string(),
        })))
    );
}

// ---------------------------------------------------------------------------
// Failures and lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_handler_error_is_caught_and_broadcast() {
    let broadcaster = Arc::new(EventBroadcaster::new());
    let (_id, mut rx) = broadcaster.subscribe();

    let h = harness(
        scripted(vec![]),
        scripted(vec![executor_call("sell 10 units")]),
        AiClient::mock(vec![Err(AiError::with_status("upstream down", 503))]),
        scripted(vec![]),
        Some(broadcaster.clone()),
    );
    let mut bus = Bus::new(CancellationToken::new()).with_broadcaster(broadcaster.clone());
    wire(&mut bus, h.observer.clone(), h.task_manager.clone(), h.executor.clone()).unwrap();

    let err = bus
        .emit(Envelope::ObserverToTaskManager(Observation::Report { report: "price is high".to_string() }))
        .await
        .unwrap_err();

    match &err {
        BusError::Handler { route, agent, error } => {
            assert_eq!(*route, Route::TaskManagerToExecutor);
            assert_eq!(*agent, AgentName::Executor);
            assert!(matches!(error, AgentError::Decision(e) if e.status_code == Some(503)));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let event = next_event(&mut rx, "agent.error").await.expect("agent.error event");
    assert_eq!(event.data["route"], "task-manager-executor");
    assert_eq!(event.data["agent"], "executor");
}

#[tokio::test]
async fn test_route_delivered_events_carry_payloads() {
    let broadcaster = Arc::new(EventBroadcaster::new());
    let (_id, mut rx) = broadcaster.subscribe();
    let hits = Arc::new(Mutex::new(Vec::new()));

    let mut bus = Bus::new(CancellationToken::new()).with_broadcaster(broadcaster.clone());
    bus.register(Route::ObserverToTaskManager, StubAgent::new(AgentName::TaskManager, 1, &hits))
        .unwrap();
    bus.emit(Envelope::ObserverToTaskManager(Observation::Report { report: "price is high".to_string() }))
        .await
        .unwrap();

    let event = next_event(&mut rx, "route.delivered").await.expect("route.delivered event");
    assert_eq!(event.data["route"], "observer-task-manager");
    assert_eq!(event.data["hop"], 1);
    assert_eq!(event.data["payload"]["report"], "price is high");
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_idle_wait() {
    let h = harness(scripted(vec![]), scripted(vec![]), scripted(vec![]), scripted(vec![]), None);
    let cancel = CancellationToken::new();
    let mut bus = Bus::new(cancel.clone());
    wire(&mut bus, h.observer.clone(), h.task_manager.clone(), h.executor.clone()).unwrap();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let started = tokio::time::Instant::now();
    let outcome = bus
        .emit(Envelope::ObserverToTaskManager(Observation::Idle(IdleSignal {
            reason: "market is flat".to_string(),
            wait: Duration::from_secs(3600),
        })))
        .await
        .unwrap();

    assert_eq!(outcome, EmitOutcome::Cancelled { hops: 1 });
    assert!(started.elapsed() < Duration::from_secs(3600));
    assert!(h.observer_ai.mock_trace().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_only_one_cycle_in_flight() {
    let h = harness(
        scripted(vec![AiResponse::text("price is high"), idle_call(3600)]),
        scripted(vec![observer_call("watch more")]),
        scripted(vec![]),
        scripted(vec![]),
        None,
    );
    let orchestrator = Arc::new(
        Orchestrator::new(h.observer.clone(), h.task_manager.clone(), h.executor.clone(), None).unwrap(),
    );

    let running = orchestrator.clone();
    let handle = tokio::spawn(async move { running.run().await });
    while !orchestrator.is_running() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(orchestrator.run().await, Err(OrchestratorError::CycleInFlight)));

    orchestrator.shutdown();
    let outcome = handle.await.unwrap().unwrap();
    assert!(matches!(outcome, EmitOutcome::Cancelled { .. }));
    assert!(!orchestrator.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_restart_limit() {
    let h = harness(scripted(vec![]), scripted(vec![]), scripted(vec![]), scripted(vec![]), None);
    let orchestrator =
        Orchestrator::new(h.observer.clone(), h.task_manager.clone(), h.executor.clone(), None).unwrap();

    let result = orchestrator
        .run_with_restarts(RestartPolicy {
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(2),
            max_restarts: Some(2),
        })
        .await;

    assert!(matches!(result, Err(OrchestratorError::RestartLimitReached(2))));
    assert_eq!(h.observer_ai.mock_trace().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_completed_cycle_resets_failure_streak() {
    let mut observer_script = Vec::new();
    for _ in 0..3 {
        observer_script.push(Ok(AiResponse::text("price is high")));
        observer_script.push(Err(AiError::new("model down")));
    }
    let h = harness(
        AiClient::mock(observer_script),
        repeating(executor_call("sell 10 units")),
        repeating(AiResponse::text("sold")),
        repeating(AiResponse::text("cycle complete")),
        None,
    );
    let orchestrator =
        Orchestrator::new(h.observer.clone(), h.task_manager.clone(), h.executor.clone(), None).unwrap();

    let result = orchestrator
        .run_with_restarts(RestartPolicy {
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(2),
            max_restarts: Some(1),
        })
        .await;

    // Three runs each close a cycle and then fail; only the fourth, which
    // fails straight away, extends the streak past the limit
    assert!(matches!(result, Err(OrchestratorError::RestartLimitReached(1))));
    assert_eq!(orchestrator.bus().completed_cycles(), 3);
    assert_eq!(h.observer_ai.mock_trace().len(), 7);

    use crate::memory::AgentMemory;
    assert_eq!(h.db.retrieve_reports("cycle complete", 10).unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_restart_loop() {
    let h = harness(scripted(vec![]), scripted(vec![]), scripted(vec![]), scripted(vec![]), None);
    let orchestrator = Arc::new(
        Orchestrator::new(h.observer.clone(), h.task_manager.clone(), h.executor.clone(), None).unwrap(),
    );

    let running = orchestrator.clone();
    let handle = tokio::spawn(async move { running.run_with_restarts(RestartPolicy::default()).await });

    tokio::time::sleep(Duration::from_secs(30)).await;
    orchestrator.shutdown();

    assert!(handle.await.unwrap().is_ok());
    assert!(h.observer_ai.mock_trace().len() >= 2);
}

#[test]
fn test_orchestrator_wires_all_routes() {
    let h = harness(scripted(vec![]), scripted(vec![]), scripted(vec![]), scripted(vec![]), None);
    let orchestrator =
        Orchestrator::new(h.observer.clone(), h.task_manager.clone(), h.executor.clone(), None).unwrap();
    assert_eq!(orchestrator.bus().routes(), Route::ALL.to_vec());
    assert!(!orchestrator.is_running());
}
