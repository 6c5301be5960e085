//! Team Data Snapshot
//!
//! The root read-only mapping of team name -> team record, exactly as the
//! governance document declares it. Records stay as raw YAML values so that
//! field absence is preserved; defaults are applied by the model layer.

use crate::error::{malformed_document, GovernanceError, GovernanceResult};
use indexmap::{IndexMap, IndexSet};
use serde_yaml::Value;
use std::borrow::Cow;

/// Ordered tag set. Insertion order decides "first match" for derived tags.
pub type TagSet = IndexSet<String>;

/// Immutable snapshot of every team, deliverable and repository
#[derive(Debug, Clone, Default)]
pub struct TeamData {
    teams: IndexMap<String, Value>,
}

/// Where a repository was found during a raw scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation<'a> {
    pub team: &'a str,
    pub deliverable: Cow<'a, str>,
}

impl TeamData {
    /// Build a snapshot from a parsed document root
    pub fn from_value(location: &str, root: Value) -> GovernanceResult<Self> {
        let mapping = match root {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Err(malformed_document(location, "document is empty")),
            other => {
                return Err(malformed_document(
                    location,
                    format!("expected a mapping of teams, found {}", kind_of(&other)),
                ))
            }
        };

        let mut teams = IndexMap::with_capacity(mapping.len());
        for (key, record) in mapping {
            let name = scalar_string(&key).ok_or_else(|| {
                malformed_document(location, format!("team key must be a scalar, found {}", kind_of(&key)))
            })?;
            teams.insert(name, record);
        }

        Ok(Self { teams })
    }

    /// Parse YAML text into a snapshot
    pub fn from_yaml_str(location: &str, text: &str) -> GovernanceResult<Self> {
        let root: Value =
            serde_yaml::from_str(text).map_err(|e| malformed_document(location, e))?;
        Self::from_value(location, root)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// Raw record for a team, if the team exists (case-sensitive)
    pub fn record(&self, team: &str) -> Option<&Value> {
        self.teams.get(team)
    }

    /// Team names in document order
    pub fn team_names(&self) -> impl Iterator<Item = &str> {
        self.teams.keys().map(String::as_str)
    }

    /// (name, record) pairs in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.teams.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Find the first deliverable whose repo list contains `repo_name` exactly.
    ///
    /// Scans the raw mapping (teams, then deliverables, then repo names in
    /// document order) without building any team views.
    pub fn locate_repository(&self, repo_name: &str) -> GovernanceResult<RepoLocation<'_>> {
        for (team, record) in self.iter() {
            for (deliverable, info) in entries(record.get("deliverables")) {
                if string_list(info.get("repos")).any(|repo| repo == repo_name) {
                    return Ok(RepoLocation { team, deliverable });
                }
            }
        }
        Err(GovernanceError::NotFound(repo_name.to_string()))
    }

    /// Name of the team owning the repository.
    ///
    /// `NotFound` is an ordinary outcome; callers usually fall back to
    /// treating the token as a team name.
    pub fn find_repo_owner(&self, repo_name: &str) -> GovernanceResult<&str> {
        self.locate_repository(repo_name).map(|location| location.team)
    }

    /// First team declaring a deliverable with this name
    pub fn find_deliverable_owner(&self, deliverable_name: &str) -> Option<&str> {
        self.iter()
            .find(|(_, record)| {
                entries(record.get("deliverables")).any(|(name, _)| name == deliverable_name)
            })
            .map(|(team, _)| team)
    }

    /// Tags for a deliverable: its own tags followed by the owning team's.
    ///
    /// Unknown teams or deliverables yield an empty set rather than an error.
    pub fn tags_for_deliverable(&self, team: &str, deliverable: &str) -> TagSet {
        let Some(record) = self.record(team) else {
            return TagSet::new();
        };
        let Some((_, info)) = entries(record.get("deliverables")).find(|(name, _)| name == deliverable)
        else {
            return TagSet::new();
        };

        let mut tags: TagSet = tag_list(info.get("tags")).collect();
        tags.extend(tag_list(record.get("tags")));
        tags
    }
}

// =============================================================================
// DEFENSIVE FIELD ACCESS
// =============================================================================

/// Stringify a scalar value; null and structured values count as absent
pub(crate) fn scalar_str(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Tagged(tagged) => scalar_str(&tagged.value),
        _ => None,
    }
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    scalar_str(value).map(Cow::into_owned)
}

/// String items of a sequence field. Anything else is skipped.
pub(crate) fn string_list(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Tag entries: plain strings, or mappings carrying a `name` key
pub(crate) fn tag_list(value: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(|entry| match entry {
            Value::String(tag) => Some(tag.clone()),
            Value::Mapping(_) => entry.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
}

/// Entries of a mapping field with scalar keys, in declared order.
/// Numeric and boolean keys are stringified the same way team keys are.
pub(crate) fn entries(value: Option<&Value>) -> impl Iterator<Item = (Cow<'_, str>, &Value)> {
    value
        .and_then(Value::as_mapping)
        .into_iter()
        .flatten()
        .filter_map(|(key, info)| scalar_str(key).map(|name| (name, info)))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
