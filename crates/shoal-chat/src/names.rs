//! Nickname parsing: prefix stripping, session-suffix handling, and the
//! collision-recovery increment.
//!
//! The gateway appends `_<n>` to nicknames of extra sessions belonging
//! to one user; the suffix-stripped nickname is the user key under
//! which all sessions collapse to a single table row.

/// Maps a single-character IRC mode prefix symbol (`@`, `+`, ...) to a
/// mode letter (`o`, `v`, ...). Learned from the gateway's `options`
/// event; a hard-coded default applies until then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMap {
    entries: Vec<(char, char)>,
}

impl Default for PrefixMap {
    fn default() -> Self {
        Self {
            entries: vec![
                ('~', 'q'),
                ('&', 'a'),
                ('@', 'o'),
                ('%', 'h'),
                ('+', 'v'),
            ],
        }
    }
}

impl PrefixMap {
    /// A map from explicit `(symbol, mode letter)` pairs.
    pub fn new(entries: Vec<(char, char)>) -> Self {
        Self { entries }
    }

    /// The mode letter for a prefix symbol, if the symbol is known.
    pub fn mode_for(&self, symbol: char) -> Option<char> {
        self.entries
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, mode)| *mode)
    }

    /// Splits a raw user-list entry into its mode prefixes and names.
    ///
    /// Strips the maximal leading run of known prefix symbols,
    /// recording each one's mode letter in order. The remainder is the
    /// parsed nickname; stripping its trailing `_<digits>` session
    /// suffix yields the user key.
    pub fn parse(&self, raw: &str) -> ParsedNick {
        let mut prefixes = Vec::new();
        let mut rest = raw;
        while let Some(symbol) = rest.chars().next() {
            match self.mode_for(symbol) {
                Some(mode) => {
                    prefixes.push(mode);
                    rest = &rest[symbol.len_utf8()..];
                }
                None => break,
            }
        }
        ParsedNick {
            prefixes,
            nickname: rest.to_string(),
            key: sanitize_nickname(rest),
        }
    }
}

/// A raw user-list entry split into prefixes, nickname, and user key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNick {
    /// Mode letters of the stripped prefix symbols, in order.
    pub prefixes: Vec<char>,
    /// The entry with prefixes removed, session suffix intact.
    pub nickname: String,
    /// The sanitized nickname: session suffix stripped.
    pub key: String,
}

/// Strips a trailing `_<digits>` session suffix, if present.
pub fn sanitize_nickname(nickname: &str) -> String {
    match nickname.rsplit_once('_') {
        Some((base, suffix))
            if !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base.to_string()
        }
        _ => nickname.to_string(),
    }
}

/// The collision-recovery increment: bump the numeric suffix after the
/// last `_` (treating an unparsable suffix as `0`), or append `_1` when
/// there is no `_` at all.
pub fn increment_nickname(nickname: &str) -> String {
    match nickname.rsplit_once('_') {
        Some((base, suffix)) => {
            let n = suffix.parse::<u64>().unwrap_or(0);
            format!("{base}_{}", n + 1)
        }
        None => format!("{nickname}_1"),
    }
}

// =========================================================================
// Tests
// =========================================================================
