use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use vigil_core::common::time::FakeClockProvider;
use vigil_core::config::SessionConfig;
use vigil_core::history::error::HistoryError;
use vigil_core::order::entity::OrderEvent;
use vigil_core::packet::entity::{AlgorithmStatus, AlgorithmStatusPacket, LiveNodePacket, PacketType};
use vigil_core::result::entity::ResultKind;
use vigil_core::session::entity::{LogKind, ResultContext, SessionState};
use vigil_core::session::error::SessionError;
use vigil_core::session::port::SessionHandler;
use vigil_core::test_utils::{MemoryHistory, ScriptedTransport};
use vigil_core::transport::error::TransportError;
use vigil_session::{ChannelHandler, Session, SessionEvent};

fn config() -> SessionConfig {
    SessionConfig {
        poll_timeout_ms: 20,
        teardown_timeout_ms: 500,
        ..SessionConfig::default()
    }
}

fn start(transport: Arc<ScriptedTransport>, config: SessionConfig) -> (Session, UnboundedReceiver<SessionEvent>) {
    let (handler, rx) = ChannelHandler::new();
    let session = Session::new(config, transport, Arc::new(handler)).unwrap();
    (session, rx)
}

async fn next_event(rx: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

async fn assert_quiet(rx: &mut UnboundedReceiver<SessionEvent>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "unexpected extra event");
}

fn log(message: &str) -> String {
    json!({"type": "Log", "message": message}).to_string()
}

fn log_text(event: SessionEvent) -> String {
    match event {
        SessionEvent::Log { text, .. } => text,
        other => panic!("expected a log line, got {:?}", other),
    }
}

fn backtest(progress: &str) -> String {
    json!({"type": 5, "backtestId": "bt-1", "progress": progress, "results": {
        "statistics": {"Total Trades": "4"}
    }})
    .to_string()
}

#[tokio::test]
async fn test_packets_are_delivered_in_order() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let clock_time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let (handler, mut rx) = ChannelHandler::new();
    let session = Session::with_clock(
        config(),
        transport.clone(),
        Arc::new(handler),
        Arc::new(FakeClockProvider::new(clock_time)),
    )?;

    session.subscribe().await?;
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Subscribed));

    for i in 0..25 {
        transport.push(&log(&format!("line-{}", i)));
    }
    for i in 0..25 {
        match next_event(&mut rx).await {
            SessionEvent::Log { timestamp, text, kind } => {
                assert_eq!(text, format!("line-{}", i));
                assert_eq!(kind, LogKind::Log);
                assert_eq!(timestamp, clock_time);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_subscribe_is_idempotent() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport.clone(), config());

    session.subscribe().await?;
    session.subscribe().await?;
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Subscribed));

    transport.push(&log("once"));
    assert_eq!(log_text(next_event(&mut rx).await), "once");
    assert_quiet(&mut rx).await;
    assert_eq!(transport.open_count(), 1);
    assert_eq!(session.state().await, SessionState::Subscribed);

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport.clone(), config());

    session.unsubscribe().await;
    session.subscribe().await?;
    session.unsubscribe().await;
    session.unsubscribe().await;

    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Subscribed));
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Unsubscribed));
    assert_quiet(&mut rx).await;
    assert_eq!(session.state().await, SessionState::Unsubscribed);

    // a new period picks up where the old one stopped
    session.subscribe().await?;
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Subscribed));
    transport.push(&log("again"));
    assert_eq!(log_text(next_event(&mut rx).await), "again");

    session.dispose().await;
    Ok(())
}

/// Records log lines with their start and end, sleeping on the line "slow".
#[derive(Default)]
struct TimedRecorder {
    trace: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl TimedRecorder {
    fn trace(&self) -> Vec<String> {
        self.trace.lock().unwrap().clone()
    }

    async fn wait_for(&self, entries: usize) {
        for _ in 0..200 {
            if self.trace().len() >= entries {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("trace stuck at {:?}", self.trace());
    }
}

#[async_trait]
impl SessionHandler for TimedRecorder {
    async fn handle_algorithm_status(&self, _packet: AlgorithmStatusPacket) {}

    async fn handle_live_node(&self, _packet: LiveNodePacket) {}

    async fn handle_result(&self, _context: ResultContext) {}

    async fn handle_log_message(&self, _timestamp: DateTime<Utc>, text: String, _kind: LogKind) {
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        self.trace.lock().unwrap().push(format!("start {}", text));
        if text == "slow" {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        self.trace.lock().unwrap().push(format!("end {}", text));
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    async fn handle_order_event(&self, _event: OrderEvent) {}

    async fn handle_state_changed(&self, _state: SessionState) {}
}

#[tokio::test]
async fn test_next_period_waits_for_in_flight_dispatch() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let recorder = Arc::new(TimedRecorder::default());
    let session = Session::new(config(), transport.clone(), recorder.clone())?;

    session.subscribe().await?;
    transport.push(&log("slow"));
    recorder.wait_for(1).await;

    session.unsubscribe().await;
    session.subscribe().await?;
    transport.push(&log("fast"));
    recorder.wait_for(4).await;

    assert_eq!(recorder.trace(), vec!["start slow", "end slow", "start fast", "end fast"]);
    assert_eq!(recorder.peak.load(Ordering::SeqCst), 1);

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_order_events_wait_for_algorithm_id() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport.clone(), config());
    session.subscribe().await?;
    next_event(&mut rx).await;

    let order_event = json!({"type": "OrderEvent", "algorithmId": "algo-7", "event": {
        "orderId": 1, "orderEventId": 3, "symbol": "SPY", "time": 1714564800,
        "status": "Filled", "fillPrice": 512.25, "fillQuantity": 10, "direction": "Buy"
    }})
    .to_string();

    transport.push(&order_event);
    transport.push(&log("before"));
    transport.push(&json!({"type": "AlgorithmNameUpdate", "algorithmId": "algo-7", "name": "Mean Reversion"}).to_string());
    transport.push(&order_event);

    assert_eq!(log_text(next_event(&mut rx).await), "before");
    match next_event(&mut rx).await {
        SessionEvent::OrderEvent(event) => {
            assert_eq!(event.id, "algo-7-1-3");
            assert_eq!(event.fill_price, dec!(512.25));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_quiet(&mut rx).await;
    assert_eq!(session.decoder().installed_algorithm(), Some("algo-7"));

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_kinds_and_multi_frame_messages_are_skipped() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport.clone(), config());
    session.subscribe().await?;
    next_event(&mut rx).await;

    transport.push(&json!({"type": "Telemetry", "cpu": 0.5}).to_string());
    transport.push("{not json");
    transport.push_frames(vec![b"topic".to_vec(), log("framed").into_bytes()]);
    transport.push(&json!({"type": "Debug", "message": "still alive"}).to_string());
    transport.push(&json!({"type": "HandledError", "message": "boom", "stackTrace": "at Main"}).to_string());

    match next_event(&mut rx).await {
        SessionEvent::Log { text, kind, .. } => {
            assert_eq!(text, "still alive");
            assert_eq!(kind, LogKind::Debug);
        }
        other => panic!("unexpected event {:?}", other),
    }
    match next_event(&mut rx).await {
        SessionEvent::Log { text, kind, .. } => {
            assert_eq!(text, "boom\nat Main");
            assert_eq!(kind, LogKind::Error);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(session.state().await, SessionState::Subscribed);

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_completed_backtest_closes_after_delivery() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(
        transport.clone(),
        SessionConfig {
            close_after_completed: true,
            ..config()
        },
    );
    session.subscribe().await?;
    next_event(&mut rx).await;

    transport.push(&backtest("0.5"));
    transport.push(&backtest("1"));

    for expected in [dec!(0.5), dec!(1)] {
        match next_event(&mut rx).await {
            SessionEvent::Result(context) => {
                assert_eq!(context.name, "localhost:33333");
                assert_eq!(context.progress, Some(expected));
                assert_eq!(context.result.kind(), ResultKind::Backtest);
                assert_eq!(context.result.statistics["Total Trades"], "4");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Unsubscribed));
    assert_eq!(session.state().await, SessionState::Unsubscribed);

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_completed_backtest_keeps_session_open_by_default() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport.clone(), config());
    session.subscribe().await?;
    next_event(&mut rx).await;

    transport.push(&backtest("1"));
    assert!(matches!(next_event(&mut rx).await, SessionEvent::Result(_)));
    assert_quiet(&mut rx).await;
    assert_eq!(session.state().await, SessionState::Subscribed);

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_unsubscribes_and_reports() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport.clone(), config());
    session.subscribe().await?;
    next_event(&mut rx).await;

    transport.fail(TransportError::Authentication("bad credentials".to_string()));
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::Faulted(SessionError::Transport(TransportError::Authentication(
            "bad credentials".to_string()
        )))
    );
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Unsubscribed));

    // recovery needs an explicit subscribe
    session.subscribe().await?;
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Subscribed));
    transport.push(&log("recovered"));
    assert_eq!(log_text(next_event(&mut rx).await), "recovered");

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_failed_open_unsubscribes() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    transport.fail_next_open(TransportError::Connection("refused".to_string()));
    let (session, mut rx) = start(transport.clone(), config());
    session.subscribe().await?;

    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Subscribed));
    assert!(matches!(
        next_event(&mut rx).await,
        SessionEvent::Faulted(SessionError::Transport(TransportError::Connection(_)))
    ));
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Unsubscribed));

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_change_stream_transport() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::changes());
    let (session, mut rx) = start(transport.clone(), config());
    session.subscribe().await?;
    next_event(&mut rx).await;

    transport.push(&json!({"type": "AlgorithmStatus", "algorithmId": "algo-1", "status": 2}).to_string());
    transport.push(&log("from the feed"));

    match next_event(&mut rx).await {
        SessionEvent::AlgorithmStatus(packet) => assert_eq!(packet.status, AlgorithmStatus::Running),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(log_text(next_event(&mut rx).await), "from the feed");

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_catch_up_enqueues_node_status_and_merged_result() -> anyhow::Result<()> {
    let history = MemoryHistory::new();
    let live = |cash: serde_json::Value, holdings: serde_json::Value, tag: &str| {
        json!({"deployId": "L-1", "results": {
            "cash": cash, "holdings": holdings, "statistics": {"tag": tag}
        }})
        .to_string()
    };
    let usd = |amount: &str| json!({"USD": {"symbol": "USD", "amount": amount, "conversionRate": 1, "currencySymbol": "$"}});
    let spy = |quantity: i64| json!({"SPY": {"symbol": "SPY R735QTJ8XC9X", "quantity": quantity, "averagePrice": 500}});

    history.record(PacketType::LiveNode, &json!({"algorithmId": "algo-1", "hostName": "node-a"}).to_string());
    history.record(PacketType::LiveResult, &live(usd("1"), spy(1), "t1"));
    history.record(PacketType::AlgorithmStatus, &json!({"algorithmId": "algo-1", "status": "Running"}).to_string());
    history.record(PacketType::LiveResult, &live(usd("2"), json!({}), "t2"));
    history.record(PacketType::LiveResult, "{broken");
    history.record(PacketType::LiveResult, &live(json!({}), spy(3), "t3"));

    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport, config());
    session.load_recent(&history).await?;
    session.subscribe().await?;

    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Subscribed));
    match next_event(&mut rx).await {
        SessionEvent::LiveNode(node) => assert_eq!(node.extra["hostName"], "node-a"),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(next_event(&mut rx).await, SessionEvent::AlgorithmStatus(_)));
    match next_event(&mut rx).await {
        SessionEvent::Result(context) => {
            let result = context.result;
            assert_eq!(result.kind(), ResultKind::Live);
            assert_eq!(context.progress, None);
            assert_eq!(result.statistics["tag"], "t3");
            assert_eq!(result.cash.unwrap_or_default()["USD"].amount, dec!(2));
            assert_eq!(result.holdings.unwrap_or_default()["SPY"].quantity, dec!(3));
        }
        other => panic!("unexpected event {:?}", other),
    }

    session.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_catch_up_reports_history_failures() {
    let history = MemoryHistory::new();
    history.fail_with(HistoryError::Backend("disk gone".to_string()));
    let (session, _rx) = start(Arc::new(ScriptedTransport::socket()), config());

    assert_eq!(
        session.load_recent(&history).await,
        Err(SessionError::History(HistoryError::Backend("disk gone".to_string())))
    );
}

#[tokio::test]
async fn test_dispose_is_final() -> anyhow::Result<()> {
    let transport = Arc::new(ScriptedTransport::socket());
    let (session, mut rx) = start(transport, config());
    session.subscribe().await?;
    next_event(&mut rx).await;

    session.dispose().await;
    session.dispose().await;
    assert_eq!(next_event(&mut rx).await, SessionEvent::StateChanged(SessionState::Unsubscribed));
    assert_quiet(&mut rx).await;

    assert_eq!(session.subscribe().await, Err(SessionError::Disposed));
    assert_eq!(session.load_recent(&MemoryHistory::new()).await, Err(SessionError::Disposed));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() {
    let (handler, _rx) = ChannelHandler::new();
    let result = Session::new(
        SessionConfig {
            port: 0,
            ..SessionConfig::default()
        },
        Arc::new(ScriptedTransport::socket()),
        Arc::new(handler),
    );
    assert!(matches!(result, Err(SessionError::Config(_))));
}
