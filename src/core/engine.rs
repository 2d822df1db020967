use crate::core::ledger::RotationLedger;
use crate::core::session::NegotiationSession;
use crate::domain::model::{Event, Notice};
use crate::domain::ports::Transport;
use crate::utils::error::{Result, RotationError};
use tokio::sync::mpsc;

/// Owns the ledger and the session and applies events to them one at a time.
///
/// Ticks and replies arrive from different tasks; funnelling them through a
/// single receiver is what keeps the read-then-write on the combined state
/// race free.
pub struct RotationEngine<T: Transport> {
    ledger: RotationLedger,
    session: NegotiationSession,
    transport: T,
}

impl<T: Transport> RotationEngine<T> {
    pub fn new(ledger: RotationLedger, transport: T) -> Self {
        Self {
            ledger,
            session: NegotiationSession::new(),
            transport,
        }
    }

    pub fn ledger(&self) -> &RotationLedger {
        &self.ledger
    }

    pub fn session(&self) -> &NegotiationSession {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 依序處理事件，直到所有發送端都關閉
    pub async fn run(&mut self, mut events: mpsc::Receiver<Event>) {
        tracing::info!("🚀 Rotation engine started with {} members", self.ledger.len());

        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(event).await {
                match e {
                    RotationError::SelectionExhausted { .. } => {
                        tracing::error!("❌ {}", e);
                        tracing::error!("💡 {}", e.recovery_suggestion());
                    }
                    _ => tracing::error!(
                        "❌ Failed to handle event: {} (Category: {:?}, Severity: {:?})",
                        e,
                        e.category(),
                        e.severity()
                    ),
                }
            }
        }

        tracing::info!("Event channel closed, rotation engine stopping");
    }

    pub async fn handle(&mut self, event: Event) -> Result<()> {
        let notices = match event {
            Event::Tick => {
                if !self.transport.is_ready() {
                    tracing::warn!("Tick skipped: no group chat bound yet (send /start)");
                    return Ok(());
                }
                tracing::debug!("Tick received");
                self.session.start_round(&self.ledger)?
            }
            Event::Reply { from, kind } => {
                tracing::debug!("Reply {:?} from @{}", kind, from);
                self.session.on_reply(&mut self.ledger, &from, kind)?
            }
        };

        self.dispatch(notices).await;
        Ok(())
    }

    async fn dispatch(&self, notices: Vec<Notice>) {
        for notice in notices {
            let delivered = match &notice {
                Notice::Prompt(candidate) => self.transport.send_prompt(candidate).await,
                Notice::Confirmation(host) => self.transport.send_confirmation(host).await,
                Notice::Rebuff => self.transport.send_rebuff().await,
            };

            if let Err(e) = delivered {
                tracing::warn!("Failed to deliver {:?}: {}", notice, e);
            }
        }
    }
}
