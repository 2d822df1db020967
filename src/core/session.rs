use crate::core::ledger::RotationLedger;
use crate::domain::model::{Member, Notice, ReplyKind};
use crate::utils::error::{Result, RotationError};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply { candidate: Member },
}

/// Per-round negotiation state: who is being asked and who already said no.
///
/// Every operation returns the notices to deliver instead of sending them, so
/// the session itself never does I/O. A candidate stays asked until they
/// answer; there is no reply timeout.
#[derive(Debug, Clone)]
pub struct NegotiationSession {
    state: SessionState,
    excluded: HashSet<Member>,
}

impl Default for NegotiationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl NegotiationSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            excluded: HashSet::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.state, SessionState::AwaitingReply { .. })
    }

    pub fn candidate(&self) -> Option<&Member> {
        match &self.state {
            SessionState::AwaitingReply { candidate } => Some(candidate),
            SessionState::Idle => None,
        }
    }

    pub fn excluded(&self) -> &HashSet<Member> {
        &self.excluded
    }

    /// Starts a round. A no-op while a round is already running.
    pub fn start_round(&mut self, ledger: &RotationLedger) -> Result<Vec<Notice>> {
        if self.is_searching() {
            tracing::debug!("Round already in progress, ignoring start request");
            return Ok(Vec::new());
        }

        self.excluded.clear();
        self.ask_next(ledger)
    }

    pub fn on_reply(
        &mut self,
        ledger: &mut RotationLedger,
        from: &str,
        kind: ReplyKind,
    ) -> Result<Vec<Notice>> {
        match kind {
            ReplyKind::Accept => self.on_accept(ledger, from),
            ReplyKind::Decline => self.on_decline(ledger, from),
            ReplyKind::Other => Ok(Vec::new()),
        }
    }

    pub fn on_accept(&mut self, ledger: &mut RotationLedger, from: &str) -> Result<Vec<Notice>> {
        let candidate = match self.answering_candidate(from) {
            Answer::Candidate(candidate) => candidate,
            Answer::Bystander => return Ok(Vec::new()),
            Answer::NoRound => return Ok(vec![Notice::Rebuff]),
        };

        ledger.confirm_host(&candidate)?;
        tracing::info!("✅ {} accepted to host", candidate);
        self.reset();

        Ok(vec![Notice::Confirmation(candidate)])
    }

    pub fn on_decline(&mut self, ledger: &RotationLedger, from: &str) -> Result<Vec<Notice>> {
        let candidate = match self.answering_candidate(from) {
            Answer::Candidate(candidate) => candidate,
            Answer::Bystander => return Ok(Vec::new()),
            Answer::NoRound => return Ok(vec![Notice::Rebuff]),
        };

        tracing::info!("{} declined, looking for the next candidate", candidate);
        self.excluded.insert(candidate);
        self.ask_next(ledger)
    }

    fn ask_next(&mut self, ledger: &RotationLedger) -> Result<Vec<Notice>> {
        match ledger.select_candidate(&self.excluded) {
            Ok(candidate) => {
                tracing::debug!(
                    "Asking {} (declined so far: {})",
                    candidate,
                    self.excluded.len()
                );
                self.state = SessionState::AwaitingReply {
                    candidate: candidate.clone(),
                };
                Ok(vec![Notice::Prompt(candidate)])
            }
            Err(e @ RotationError::SelectionExhausted { .. }) => {
                self.reset();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn answering_candidate(&self, from: &str) -> Answer {
        match &self.state {
            SessionState::Idle => Answer::NoRound,
            SessionState::AwaitingReply { candidate } if candidate.matches(from) => {
                Answer::Candidate(candidate.clone())
            }
            SessionState::AwaitingReply { .. } => {
                tracing::debug!("Ignoring reply from non-candidate @{}", from);
                Answer::Bystander
            }
        }
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.excluded.clear();
    }
}

enum Answer {
    Candidate(Member),
    Bystander,
    NoRound,
}
