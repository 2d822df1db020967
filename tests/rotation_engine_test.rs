use async_trait::async_trait;
use host_rotation::core::session::SessionState;
use host_rotation::core::{Event, LedgerEntry, Member, ReplyKind, Transport};
use host_rotation::{RotationEngine, RotationError, RotationLedger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sent {
    Prompt(String),
    Confirmation(String),
    Rebuff,
}

#[derive(Clone)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<Sent>>>,
    ready: Arc<AtomicBool>,
    failing: bool,
}

impl RecordingTransport {
    fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            ready: Arc::new(AtomicBool::new(true)),
            failing: false,
        }
    }

    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    async fn record(&self, message: Sent) -> host_rotation::Result<()> {
        self.sent.lock().await.push(message);
        if self.failing {
            return Err(RotationError::TelegramApiError {
                method: "sendMessage".to_string(),
                description: "Bad Gateway".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_prompt(&self, candidate: &Member) -> host_rotation::Result<()> {
        self.record(Sent::Prompt(candidate.username().to_string()))
            .await
    }

    async fn send_confirmation(&self, hosted_by: &Member) -> host_rotation::Result<()> {
        self.record(Sent::Confirmation(hosted_by.username().to_string()))
            .await
    }

    async fn send_rebuff(&self) -> host_rotation::Result<()> {
        self.record(Sent::Rebuff).await
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

fn ledger(counts: &[(&str, u32)]) -> RotationLedger {
    RotationLedger::with_counts(counts.iter().map(|(name, weeks)| LedgerEntry {
        member: Member::new(*name),
        weeks_since: *weeks,
    }))
    .unwrap()
}

fn reply(from: &str, kind: ReplyKind) -> Event {
    Event::Reply {
        from: from.to_string(),
        kind,
    }
}

fn counts(engine: &RotationEngine<RecordingTransport>) -> Vec<u32> {
    engine
        .ledger()
        .entries()
        .iter()
        .map(|e| e.weeks_since)
        .collect()
}

#[tokio::test]
async fn test_decline_then_accept_round() {
    let transport = RecordingTransport::new();
    let mut engine = RotationEngine::new(ledger(&[("a", 0), ("b", 0), ("c", 0)]), transport.clone());

    engine.handle(Event::Tick).await.unwrap();
    engine.handle(reply("a", ReplyKind::Decline)).await.unwrap();
    engine.handle(reply("b", ReplyKind::Accept)).await.unwrap();

    assert_eq!(
        transport.sent().await,
        vec![
            Sent::Prompt("a".to_string()),
            Sent::Prompt("b".to_string()),
            Sent::Confirmation("b".to_string()),
        ]
    );
    assert_eq!(counts(&engine), vec![1, 0, 1]);
    assert_eq!(engine.session().state(), &SessionState::Idle);
}

#[tokio::test]
async fn test_exhaustion_surfaces_error_and_resets() {
    let transport = RecordingTransport::new();
    let mut engine = RotationEngine::new(ledger(&[("a", 2), ("b", 5), ("c", 1)]), transport.clone());

    engine.handle(Event::Tick).await.unwrap();
    engine.handle(reply("b", ReplyKind::Decline)).await.unwrap();
    engine.handle(reply("a", ReplyKind::Decline)).await.unwrap();
    let result = engine.handle(reply("c", ReplyKind::Decline)).await;

    assert!(matches!(result, Err(RotationError::SelectionExhausted { declined: 3 })));
    assert_eq!(counts(&engine), vec![2, 5, 1]);
    assert!(!engine.session().is_searching());
    assert!(engine.session().excluded().is_empty());

    // 下一次排程重新從頭詢問
    engine.handle(Event::Tick).await.unwrap();
    assert_eq!(
        transport.sent().await.last(),
        Some(&Sent::Prompt("b".to_string()))
    );
}

#[tokio::test]
async fn test_repeated_ticks_do_not_restart_round() {
    let transport = RecordingTransport::new();
    let mut engine = RotationEngine::new(ledger(&[("a", 0), ("b", 1)]), transport.clone());

    engine.handle(Event::Tick).await.unwrap();
    engine.handle(Event::Tick).await.unwrap();

    assert_eq!(transport.sent().await, vec![Sent::Prompt("b".to_string())]);
}

#[tokio::test]
async fn test_idle_reply_is_rebuffed_and_bystander_ignored() {
    let transport = RecordingTransport::new();
    let mut engine = RotationEngine::new(ledger(&[("a", 0), ("b", 0)]), transport.clone());

    engine.handle(reply("a", ReplyKind::Accept)).await.unwrap();
    engine.handle(Event::Tick).await.unwrap();
    engine.handle(reply("b", ReplyKind::Accept)).await.unwrap();
    engine.handle(reply("b", ReplyKind::Other)).await.unwrap();

    assert_eq!(
        transport.sent().await,
        vec![Sent::Rebuff, Sent::Prompt("a".to_string())]
    );
    assert_eq!(counts(&engine), vec![0, 0]);
}

#[tokio::test]
async fn test_tick_skipped_until_transport_ready() {
    let transport = RecordingTransport::new();
    transport.ready.store(false, Ordering::SeqCst);
    let mut engine = RotationEngine::new(ledger(&[("a", 0)]), transport.clone());

    engine.handle(Event::Tick).await.unwrap();
    assert!(transport.sent().await.is_empty());
    assert!(!engine.session().is_searching());

    transport.ready.store(true, Ordering::SeqCst);
    engine.handle(Event::Tick).await.unwrap();
    assert_eq!(transport.sent().await, vec![Sent::Prompt("a".to_string())]);
}

#[tokio::test]
async fn test_delivery_failure_does_not_change_state() {
    let transport = RecordingTransport::failing();
    let mut engine = RotationEngine::new(ledger(&[("a", 0), ("b", 0)]), transport.clone());

    engine.handle(Event::Tick).await.unwrap();
    assert_eq!(
        engine.session().candidate().map(|m| m.username()),
        Some("a")
    );

    engine.handle(reply("a", ReplyKind::Accept)).await.unwrap();
    assert_eq!(counts(&engine), vec![0, 1]);
}

#[tokio::test]
async fn test_run_processes_queue_until_closed() {
    let transport = RecordingTransport::new();
    let mut engine = RotationEngine::new(ledger(&[("a", 0), ("b", 0)]), transport.clone());
    let (tx, rx) = mpsc::channel(8);

    for event in [
        Event::Tick,
        reply("a", ReplyKind::Decline),
        reply("b", ReplyKind::Decline),
        Event::Tick,
        reply("a", ReplyKind::Accept),
    ] {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    engine.run(rx).await;

    assert_eq!(
        transport.sent().await,
        vec![
            Sent::Prompt("a".to_string()),
            Sent::Prompt("b".to_string()),
            Sent::Prompt("a".to_string()),
            Sent::Confirmation("a".to_string()),
        ]
    );
    assert_eq!(counts(&engine), vec![0, 1]);
}
