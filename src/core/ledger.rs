use crate::domain::model::{LedgerEntry, Member};
use crate::utils::error::{Result, RotationError};
use crate::utils::validation::validate_unique;
use std::collections::HashSet;

/// Weeks-since-hosted bookkeeping for the whole roster, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationLedger {
    entries: Vec<LedgerEntry>,
}

impl RotationLedger {
    /// 以設定檔順序建立，所有人從 0 開始
    pub fn new<I>(members: I) -> Result<Self>
    where
        I: IntoIterator<Item = Member>,
    {
        Self::with_counts(members.into_iter().map(|member| LedgerEntry {
            member,
            weeks_since: 0,
        }))
    }

    pub fn with_counts<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = LedgerEntry>,
    {
        let entries: Vec<LedgerEntry> = entries.into_iter().collect();
        if entries.is_empty() {
            return Err(RotationError::ConfigError {
                message: "The roster must contain at least one member".to_string(),
            });
        }
        validate_unique("members", entries.iter().map(|e| e.member.username()))?;

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.position(username).is_some()
    }

    pub fn weeks_since(&self, username: &str) -> Option<u32> {
        self.position(username).map(|i| self.entries[i].weeks_since)
    }

    /// Returns the non-excluded member with the greatest count. On a tie the
    /// member configured first wins: the leader is only replaced by a strictly
    /// greater count.
    pub fn select_candidate(&self, excluded: &HashSet<Member>) -> Result<Member> {
        let mut leader: Option<&LedgerEntry> = None;

        for entry in &self.entries {
            if excluded.contains(&entry.member) {
                continue;
            }
            match leader {
                Some(current) if entry.weeks_since <= current.weeks_since => {}
                _ => leader = Some(entry),
            }
        }

        leader
            .map(|entry| entry.member.clone())
            .ok_or_else(|| RotationError::SelectionExhausted {
                declined: self
                    .entries
                    .iter()
                    .filter(|e| excluded.contains(&e.member))
                    .count(),
            })
    }

    /// Resets the host to zero and ages everybody else by one week.
    pub fn confirm_host(&mut self, host: &Member) -> Result<()> {
        let host_index =
            self.position(host.username())
                .ok_or_else(|| RotationError::UnknownMember {
                    username: host.username().to_string(),
                })?;

        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i == host_index {
                entry.weeks_since = 0;
            } else {
                entry.weeks_since = entry.weeks_since.saturating_add(1);
            }
        }

        Ok(())
    }

    fn position(&self, username: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.member.matches(username))
    }
}
