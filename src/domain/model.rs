use serde::{Deserialize, Serialize};
use std::fmt;

/// A roster member, identified by their chat handle (without the leading `@`).
/// Telegram handles are case-insensitive, so they are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Member(String);

impl Member {
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        let trimmed = username.trim().trim_start_matches('@').trim();
        Self(trimmed.to_lowercase())
    }

    pub fn username(&self) -> &str {
        &self.0
    }

    /// Whether a raw sender handle refers to this member.
    pub fn matches(&self, handle: &str) -> bool {
        Member::new(handle) == *self
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub member: Member,
    pub weeks_since: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Accept,
    Decline,
    Other,
}

/// Something the negotiation wants said in the group chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Prompt(Member),
    Confirmation(Member),
    Rebuff,
}

/// Inputs to the rotation engine. Both kinds are handled strictly one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Tick,
    Reply { from: String, kind: ReplyKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_handle_is_normalized() {
        assert_eq!(Member::new(" @Alice ").username(), "alice");
        assert_eq!(Member::new("@Alice").to_string(), "@alice");
        assert!(Member::new("bob").matches("@BOB"));
        assert!(!Member::new("bob").matches("bobby"));
    }
}
