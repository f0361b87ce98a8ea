//! Matches a discovered device (manufacturer/model strings) against a
//! collection of profile references: case-insensitive exact match, then
//! bounded wildcard pattern match, with input-validation guards (spec §4.5).
//!
//! Grounded on `config.rs::ConfigWrapper::inverter_with_host`/
//! `enabled_inverter_with_datalog` — a linear scan over a small in-memory
//! `Vec`, no index structure, since profile sets are small and loaded once.

use crate::prelude::{debug, trace, warn};

/// One registered profile reference: an identifier, the manufacturer it
/// belongs to, and the (possibly wildcarded) model pattern it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileReference {
    pub id: String,
    pub manufacturer: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Found(ProfileReference),
    Unsupported { suggestion: Option<ProfileReference> },
    Unknown,
}

/// Wildcard-pattern iteration cap (spec §4.5/§8): an algorithmic-complexity
/// guard against profiles with pathological patterns.
const MAX_WILDCARD_PIECES: usize = 100;

/// Device-identifier length limit (spec §4.5/§6).
const MAX_IDENTIFIER_LEN: usize = 128;

#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<ProfileReference>,
}

impl ProfileRegistry {
    pub fn new(profiles: Vec<ProfileReference>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &[ProfileReference] {
        &self.profiles
    }

    /// Resolve a device fingerprint to a profile reference.
    pub fn resolve(&self, manufacturer: &str, model: &str) -> MatchResult {
        trace!("resolving profile for manufacturer={manufacturer:?} model={model:?}");

        if !is_valid_identifier(manufacturer) || !is_valid_identifier(model) {
            warn!("rejecting device identifier manufacturer={manufacturer:?} model={model:?}: invalid characters or length");
            return MatchResult::Unknown;
        }

        let manufacturer_lc = manufacturer.to_lowercase();
        let model_lc = model.to_lowercase();

        if let Some(found) = self
            .profiles
            .iter()
            .find(|p| p.pattern.to_lowercase() == model_lc)
        {
            debug!("matched {manufacturer}/{model} to profile {} by exact match", found.id);
            return MatchResult::Found(found.clone());
        }

        if let Some(found) = self
            .profiles
            .iter()
            .find(|p| wildcard_match(&p.pattern.to_lowercase(), &model_lc))
        {
            debug!("matched {manufacturer}/{model} to profile {} by wildcard match", found.id);
            return MatchResult::Found(found.clone());
        }

        let suggestion = self
            .profiles
            .iter()
            .find(|p| p.manufacturer.to_lowercase() == manufacturer_lc)
            .cloned();

        if let Some(s) = &suggestion {
            debug!("no model match for {manufacturer}/{model}; manufacturer known, suggesting {}", s.id);
            MatchResult::Unsupported { suggestion }
        } else {
            debug!("no profile match for {manufacturer}/{model}");
            MatchResult::Unknown
        }
    }
}

/// Reject any unicode scalar < 0x20, = 0x7F, or in 0x80..=0x9F, and any
/// string longer than 128 characters (spec §4.5).
fn is_valid_identifier(s: &str) -> bool {
    if s.chars().count() > MAX_IDENTIFIER_LEN {
        return false;
    }
    !s.chars().any(|c| {
        let scalar = c as u32;
        scalar < 0x20 || scalar == 0x7F || (0x80..=0x9F).contains(&scalar)
    })
}

/// Bounded wildcard match: `*` means zero-or-more of anything. Splits the
/// pattern on `*` (preserving empty pieces), then advances through the
/// input locating each non-empty piece in order. The first piece must
/// anchor to the start unless the pattern began with `*`; the last piece
/// must anchor to the end unless the pattern ends with `*`. Capped at 100
/// pieces (spec §4.5/§8, an algorithmic-complexity guard; no regex engine
/// is used since profile patterns are semi-trusted YAML input).
fn wildcard_match(pattern: &str, input: &str) -> bool {
    let pieces: Vec<&str> = pattern.split('*').collect();
    if pieces.len() > MAX_WILDCARD_PIECES {
        return false;
    }
    if pieces.iter().all(|p| p.is_empty()) {
        return true;
    }

    let starts_with_star = pattern.starts_with('*');
    let ends_with_star = pattern.ends_with('*');

    // A literal pattern (no `*` at all) is exactly one piece that is both
    // first and last: it must match the whole input, not just a prefix.
    if pieces.len() == 1 && !starts_with_star && !ends_with_star {
        return pattern == input;
    }

    let mut cursor = 0usize;

    for (i, piece) in pieces.iter().enumerate() {
        if piece.is_empty() {
            continue;
        }
        let is_first = i == 0;
        let is_last = i == pieces.len() - 1;

        // `is_first` and `is_last` are mutually exclusive here: a single-piece
        // pattern (both first and last) is handled by the literal-match
        // special case above, before this loop runs.
        if is_first && !starts_with_star {
            if !input[cursor..].starts_with(piece) {
                return false;
            }
            cursor += piece.len();
            continue;
        }

        if is_last && !ends_with_star {
            if input.len() < piece.len() {
                return false;
            }
            let tail_start = input.len() - piece.len();
            if tail_start < cursor || &input[tail_start..] != *piece {
                return false;
            }
            cursor = input.len();
            continue;
        }

        match input[cursor..].find(piece) {
            Some(offset) => cursor += offset + piece.len(),
            None => return false,
        }
    }

    true
}
