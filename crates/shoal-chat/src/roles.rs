//! Role and status bitmasks.
//!
//! Both enumerations are small fixed sets combined with bitwise OR and
//! cleared with AND-NOT. "Most significant" means the highest set bit,
//! scanning from the top; an empty set falls back to the
//! lowest-significance value (`Shadow` for roles, `Nominal` for
//! statuses).

use std::fmt;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A user's channel role, ordered by significance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Shadow,
    Turbo,
    Guest,
    Mod,
    Admin,
    Owner,
}

impl Role {
    /// All roles, most significant first.
    pub const ALL: [Role; 6] = [
        Role::Owner,
        Role::Admin,
        Role::Mod,
        Role::Guest,
        Role::Turbo,
        Role::Shadow,
    ];

    const fn bit(self) -> u8 {
        match self {
            Role::Shadow => 1 << 0,
            Role::Turbo => 1 << 1,
            Role::Guest => 1 << 2,
            Role::Mod => 1 << 3,
            Role::Admin => 1 << 4,
            Role::Owner => 1 << 5,
        }
    }

    /// The role granted by a channel mode letter (`q a o h v`), if any.
    pub fn from_mode(letter: char) -> Option<Role> {
        match letter {
            'q' => Some(Role::Owner),
            'a' => Some(Role::Admin),
            'o' => Some(Role::Mod),
            'h' => Some(Role::Turbo),
            'v' => Some(Role::Guest),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Shadow => "shadow",
            Role::Turbo => "turbo",
            Role::Guest => "guest",
            Role::Mod => "mod",
            Role::Admin => "admin",
            Role::Owner => "owner",
        };
        write!(f, "{name}")
    }
}

/// A set of [`Role`] bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn remove(&mut self, role: Role) {
        self.0 &= !role.bit();
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The highest set role, or [`Role::Shadow`] when none is set.
    pub fn most_significant(self) -> Role {
        Role::ALL
            .into_iter()
            .find(|role| self.contains(*role))
            .unwrap_or(Role::Shadow)
    }

    /// Set members, most significant first.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = Self::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// A moderation status applied to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UserStatus {
    /// No status bit set; the fallback, not a bit of its own.
    Nominal,
    Muted,
    Timed,
    Banned,
}

impl UserStatus {
    /// All real statuses, most significant first.
    pub const ALL: [UserStatus; 3] =
        [UserStatus::Banned, UserStatus::Timed, UserStatus::Muted];

    const fn bit(self) -> u8 {
        match self {
            UserStatus::Nominal => 0,
            UserStatus::Muted => 1 << 0,
            UserStatus::Timed => 1 << 1,
            UserStatus::Banned => 1 << 2,
        }
    }

    /// The channel mode letter enforcing this status, if any.
    pub fn mode_letter(self) -> Option<char> {
        match self {
            UserStatus::Nominal => None,
            UserStatus::Muted => Some('q'),
            UserStatus::Timed | UserStatus::Banned => Some('b'),
        }
    }
}

/// A set of [`UserStatus`] bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSet(u8);

impl StatusSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, status: UserStatus) {
        self.0 |= status.bit();
    }

    pub fn remove(&mut self, status: UserStatus) {
        self.0 &= !status.bit();
    }

    pub fn contains(self, status: UserStatus) -> bool {
        status != UserStatus::Nominal && self.0 & status.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The highest set status, or [`UserStatus::Nominal`] when none is.
    pub fn most_significant(self) -> UserStatus {
        UserStatus::ALL
            .into_iter()
            .find(|status| self.contains(*status))
            .unwrap_or(UserStatus::Nominal)
    }

    /// Set members, most significant first.
    pub fn iter(self) -> impl Iterator<Item = UserStatus> {
        UserStatus::ALL
            .into_iter()
            .filter(move |status| self.contains(*status))
    }
}

impl FromIterator<UserStatus> for StatusSet {
    fn from_iter<I: IntoIterator<Item = UserStatus>>(iter: I) -> Self {
        let mut set = Self::empty();
        for status in iter {
            set.insert(status);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Channel modes
// ---------------------------------------------------------------------------

/// Whether a mode change adds or removes the named modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAction {
    Add,
    Remove,
}

impl ModeAction {
    pub(crate) fn sign(self) -> char {
        match self {
            ModeAction::Add => '+',
            ModeAction::Remove => '-',
        }
    }
}

/// A channel-wide mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Moderated,
    InviteOnly,
    Secret,
    TopicLock,
}

impl ChannelMode {
    pub const ALL: [ChannelMode; 4] = [
        ChannelMode::Moderated,
        ChannelMode::InviteOnly,
        ChannelMode::Secret,
        ChannelMode::TopicLock,
    ];

    const fn bit(self) -> u8 {
        match self {
            ChannelMode::Moderated => 1 << 0,
            ChannelMode::InviteOnly => 1 << 1,
            ChannelMode::Secret => 1 << 2,
            ChannelMode::TopicLock => 1 << 3,
        }
    }

    /// The IRC mode letter.
    pub fn letter(self) -> char {
        match self {
            ChannelMode::Moderated => 'm',
            ChannelMode::InviteOnly => 'i',
            ChannelMode::Secret => 's',
            ChannelMode::TopicLock => 't',
        }
    }
}

/// A set of [`ChannelMode`] bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelModeSet(u8);

impl ChannelModeSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, mode: ChannelMode) {
        self.0 |= mode.bit();
    }

    pub fn contains(self, mode: ChannelMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ChannelMode> {
        ChannelMode::ALL
            .into_iter()
            .filter(move |mode| self.contains(*mode))
    }
}

impl FromIterator<ChannelMode> for ChannelModeSet {
    fn from_iter<I: IntoIterator<Item = ChannelMode>>(iter: I) -> Self {
        let mut set = Self::empty();
        for mode in iter {
            set.insert(mode);
        }
        set
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_role_bit_wins() {
        let set: RoleSet = [Role::Guest, Role::Mod].into_iter().collect();
        assert_eq!(set.most_significant(), Role::Mod);
    }

    #[test]
    fn test_empty_role_set_defaults_to_shadow() {
        assert_eq!(RoleSet::empty().most_significant(), Role::Shadow);
    }

    #[test]
    fn test_role_remove_is_and_not() {
        let mut set: RoleSet = [Role::Owner, Role::Turbo].into_iter().collect();
        set.remove(Role::Owner);
        assert!(!set.contains(Role::Owner));
        assert!(set.contains(Role::Turbo));
        assert_eq!(set.most_significant(), Role::Turbo);
    }

    #[test]
    fn test_mode_letters_map_to_roles() {
        assert_eq!(Role::from_mode('q'), Some(Role::Owner));
        assert_eq!(Role::from_mode('o'), Some(Role::Mod));
        assert_eq!(Role::from_mode('v'), Some(Role::Guest));
        assert_eq!(Role::from_mode('h'), Some(Role::Turbo));
        assert_eq!(Role::from_mode('x'), None);
    }

    #[test]
    fn test_status_most_significant() {
        let set: StatusSet =
            [UserStatus::Muted, UserStatus::Banned].into_iter().collect();
        assert_eq!(set.most_significant(), UserStatus::Banned);
        assert_eq!(StatusSet::empty().most_significant(), UserStatus::Nominal);
    }

    #[test]
    fn test_nominal_is_never_a_member() {
        let set = StatusSet::empty();
        assert!(!set.contains(UserStatus::Nominal));
    }

    #[test]
    fn test_role_set_iterates_high_to_low() {
        let set: RoleSet =
            [Role::Turbo, Role::Owner, Role::Mod].into_iter().collect();
        let order: Vec<Role> = set.iter().collect();
        assert_eq!(order, vec![Role::Owner, Role::Mod, Role::Turbo]);
    }
}
