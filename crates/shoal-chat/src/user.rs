//! Per-channel user records.

use crate::names::ParsedNick;
use crate::roles::{Role, RoleSet, StatusSet};

/// One row of a channel's user table, keyed by the sanitized nickname.
///
/// A user with several concurrent sessions appears once, with every
/// session's full nickname collected in `nicknames`. A record present
/// in a table always holds at least one nickname; it is removed the
/// moment its last nickname leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Gateway-level identity string. Falls back to the user key when
    /// the event carried none.
    pub identity: String,
    /// Full nicknames of every live session, in sighting order.
    pub nicknames: Vec<String>,
    /// Roles granted by the user's mode prefixes.
    pub roles: RoleSet,
    /// Moderation statuses.
    pub status: StatusSet,
    /// Mode letters of the stripped prefixes, in prefix order.
    pub prefixes: Vec<char>,
}

impl UserRecord {
    /// A record from a first sighting.
    pub fn new(identity: impl Into<String>, parsed: &ParsedNick) -> Self {
        let roles = parsed
            .prefixes
            .iter()
            .filter_map(|&letter| Role::from_mode(letter))
            .collect();
        Self {
            identity: identity.into(),
            nicknames: vec![parsed.nickname.clone()],
            roles,
            status: StatusSet::empty(),
            prefixes: parsed.prefixes.clone(),
        }
    }

    /// Records another live session. Duplicates are ignored.
    pub fn add_nickname(&mut self, nickname: &str) {
        if !self.nicknames.iter().any(|n| n == nickname) {
            self.nicknames.push(nickname.to_string());
        }
    }

    /// Drops a departed session. Returns `true` when no sessions
    /// remain and the record should leave the table.
    pub fn remove_nickname(&mut self, nickname: &str) -> bool {
        self.nicknames.retain(|n| n != nickname);
        self.nicknames.is_empty()
    }

    /// The user's displayed role.
    pub fn role(&self) -> Role {
        self.roles.most_significant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::PrefixMap;

    #[test]
    fn test_record_from_prefixed_sighting() {
        let parsed = PrefixMap::default().parse("@alice");
        let record = UserRecord::new("alice", &parsed);
        assert_eq!(record.nicknames, vec!["alice"]);
        assert_eq!(record.role(), Role::Mod);
        assert_eq!(record.prefixes, vec!['o']);
    }

    #[test]
    fn test_sessions_accumulate_without_duplicates() {
        let parsed = PrefixMap::default().parse("bob");
        let mut record = UserRecord::new("bob", &parsed);
        record.add_nickname("bob_1");
        record.add_nickname("bob_1");
        assert_eq!(record.nicknames, vec!["bob", "bob_1"]);
    }

    #[test]
    fn test_record_empties_when_last_session_leaves() {
        let parsed = PrefixMap::default().parse("bob");
        let mut record = UserRecord::new("bob", &parsed);
        record.add_nickname("bob_1");
        assert!(!record.remove_nickname("bob"));
        assert!(record.remove_nickname("bob_1"));
    }
}
