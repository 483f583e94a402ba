//! Domain types representing the people who share expenses.

use serde::{Deserialize, Serialize};

use crate::common::*;

/// A person who can pay for, or owe a share of, an expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Returns `true` when `reference` names this participant by id or display name.
    pub fn matches_reference(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.id == reference || self.name == reference
    }
}

impl Displayable for Participant {
    fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

/// Ordered set of known participants, unique by display name.
///
/// Order is significant: settlement tie-breaks fall back to roster order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<Participant>", into = "Vec<Participant>")]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster, keeping the first participant for each display name.
    pub fn from_participants<I>(participants: I) -> Self
    where
        I: IntoIterator<Item = Participant>,
    {
        let mut roster = Self::new();
        for participant in participants {
            roster.insert(participant);
        }
        roster
    }

    /// Adds a participant unless the display name is already taken.
    /// Returns `false` when the participant was rejected as a duplicate.
    pub fn insert(&mut self, participant: Participant) -> bool {
        if self.participants.iter().any(|p| p.name == participant.name) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    /// Replaces the participant sharing `participant.id`, or appends it.
    /// Returns `false` when the name belongs to a different participant.
    pub fn upsert(&mut self, participant: Participant) -> bool {
        if self
            .participants
            .iter()
            .any(|p| p.name == participant.name && p.id != participant.id)
        {
            return false;
        }
        match self.participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(index))
    }

    /// Resolves a payer or member reference, matching ids before names.
    pub fn resolve(&self, reference: &str) -> Option<&Participant> {
        let reference = reference.trim();
        self.participants
            .iter()
            .find(|p| p.id == reference)
            .or_else(|| self.participants.iter().find(|p| p.name == reference))
    }

    /// Canonical aggregation key for a reference: the resolved display name,
    /// or the trimmed reference itself for participants outside the roster.
    pub fn canonical_name(&self, reference: &str) -> String {
        match self.resolve(reference) {
            Some(participant) => participant.name.clone(),
            None => reference.trim().to_string(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl From<Vec<Participant>> for Roster {
    fn from(participants: Vec<Participant>) -> Self {
        Self::from_participants(participants)
    }
}

impl From<Roster> for Vec<Participant> {
    fn from(roster: Roster) -> Self {
        roster.participants
    }
}

impl FromIterator<Participant> for Roster {
    fn from_iter<T: IntoIterator<Item = Participant>>(iter: T) -> Self {
        Self::from_participants(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::from_participants([
            Participant::new("john", "John Doe"),
            Participant::new("jane", "Jane Smith"),
        ])
    }

    #[test]
    fn resolve_prefers_id_over_name() {
        let roster = Roster::from_participants([
            Participant::new("a", "b"),
            Participant::new("b", "Bee"),
        ]);
        assert_eq!(roster.resolve("b").map(|p| p.name.as_str()), Some("Bee"));
        assert_eq!(roster.resolve("a").map(|p| p.name.as_str()), Some("b"));
    }

    #[test]
    fn canonical_name_falls_back_to_reference() {
        let roster = roster();
        assert_eq!(roster.canonical_name("john"), "John Doe");
        assert_eq!(roster.canonical_name(" Jane Smith "), "Jane Smith");
        assert_eq!(roster.canonical_name(" Guest "), "Guest");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut roster = roster();
        assert!(!roster.insert(Participant::new("jd2", "John Doe")));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn upsert_replaces_by_id_and_keeps_position() {
        let mut roster = roster();
        assert!(roster.upsert(Participant::new("john", "Johnny")));
        let names: Vec<_> = roster.names().collect();
        assert_eq!(names, vec!["Johnny", "Jane Smith"]);
        assert!(!roster.upsert(Participant::new("john", "Jane Smith")));
    }

    #[test]
    fn roster_serializes_as_plain_list() {
        let json = serde_json::to_string(&roster()).expect("serialize roster");
        assert!(json.starts_with('['));
        let back: Roster = serde_json::from_str(&json).expect("deserialize roster");
        assert_eq!(back, roster());
    }

    #[test]
    fn deserializing_drops_duplicate_names() {
        let json = r#"[{"id":"a","name":"Asha"},{"id":"b","name":"Asha"}]"#;
        let roster: Roster = serde_json::from_str(json).expect("deserialize roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.resolve("a").map(|p| p.id.as_str()), Some("a"));
    }
}
