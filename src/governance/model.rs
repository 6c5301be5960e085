//! Governance Entity Graph
//!
//! Team -> Deliverable -> Repository views built over a raw team record.
//! A `Team` owns its whole subtree in flat arenas; deliverables and
//! repositories refer back to their owner by index, and are handed out as
//! borrowed views. Views are cheap to build and are dropped after each query.

use crate::error::{GovernanceError, GovernanceResult};
use crate::governance::data::{entries, scalar_string, string_list, tag_list, TagSet, TeamData};
use crate::governance::liaison::{Liaison, LiaisonCache};
use indexmap::IndexMap;
use serde_yaml::Value;

/// Placeholder for PTL fields absent from the document
pub const MISSING: &str = "MISSING";

/// Channel used when a team declares none. Prefixed with `#` like any other
/// channel, which yields `##UNKNOWN##`.
const UNKNOWN_CHANNEL: &str = "#UNKNOWN##";

/// Repository name suffixes that mark documentation-only repositories
const NON_CODE_SUFFIXES: &[&str] = &["-specs"];

/// Substrings that mark project template repositories
const TEMPLATE_MARKERS: &[&str] = &["cookiecutter"];

/// Project team lead contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ptl {
    pub name: String,
    pub irc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliverableId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepositoryId(usize);

#[derive(Debug, Clone)]
struct DeliverableNode {
    name: String,
    tags: TagSet,
    repositories: Vec<RepositoryId>,
}

#[derive(Debug, Clone)]
struct RepositoryNode {
    name: String,
    deliverable: DeliverableId,
}

/// A project team and its fully materialized subtree
#[derive(Debug, Clone)]
pub struct Team {
    pub name: String,
    pub ptl: Ptl,
    pub irc_channel: String,
    pub mission: String,
    /// Tags asserted by the team itself
    pub tags: TagSet,
    deliverables: IndexMap<String, DeliverableNode>,
    repositories: Vec<RepositoryNode>,
}

impl Team {
    /// Build a team view from its raw record. Never fails: every missing or
    /// malformed field is replaced by its default.
    pub fn new(name: impl Into<String>, record: &Value) -> Self {
        let ptl_field = |key: &str| {
            record
                .get("ptl")
                .and_then(|ptl| ptl.get(key))
                .and_then(scalar_string)
                .unwrap_or_else(|| MISSING.to_string())
        };
        let ptl = Ptl {
            name: ptl_field("name"),
            irc: ptl_field("irc"),
        };

        let channel = record
            .get("irc-channel")
            .and_then(scalar_string)
            .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string());

        let mut deliverables = IndexMap::new();
        let mut repositories: Vec<RepositoryNode> = Vec::new();
        for (deliverable_name, info) in entries(record.get("deliverables")) {
            let id = DeliverableId(deliverables.len());
            let mut repo_ids = Vec::new();
            for repo_name in string_list(info.get("repos")) {
                let duplicate = repo_ids
                    .iter()
                    .any(|RepositoryId(i)| repositories[*i].name == repo_name);
                if duplicate {
                    continue;
                }
                repo_ids.push(RepositoryId(repositories.len()));
                repositories.push(RepositoryNode {
                    name: repo_name.to_string(),
                    deliverable: id,
                });
            }
            deliverables.insert(
                deliverable_name.to_string(),
                DeliverableNode {
                    name: deliverable_name.to_string(),
                    tags: tag_list(info.get("tags")).collect(),
                    repositories: repo_ids,
                },
            );
        }

        Self {
            name: name.into(),
            ptl,
            irc_channel: format!("#{}", channel),
            mission: record
                .get("mission")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            tags: tag_list(record.get("tags")).collect(),
            deliverables,
            repositories,
        }
    }

    /// Team view for `name`, built over an empty record when the team is
    /// absent so callers can still print the defaults.
    pub fn from_data(data: &TeamData, name: &str) -> Self {
        match data.record(name) {
            Some(record) => Self::new(name, record),
            None => Self::new(name, &Value::Null),
        }
    }

    /// Strict lookup: fails with `TeamNotFound` for unknown teams
    pub fn lookup(data: &TeamData, name: &str) -> GovernanceResult<Self> {
        data.record(name)
            .map(|record| Self::new(name, record))
            .ok_or_else(|| GovernanceError::TeamNotFound {
                team: name.to_string(),
                known: data.team_names().map(str::to_string).collect(),
            })
    }

    /// Deliverables in declared order
    pub fn deliverables(&self) -> impl Iterator<Item = Deliverable<'_>> {
        (0..self.deliverables.len()).map(move |i| Deliverable {
            team: self,
            id: DeliverableId(i),
        })
    }

    pub fn deliverable(&self, name: &str) -> Option<Deliverable<'_>> {
        self.deliverables.get_index_of(name).map(|i| Deliverable {
            team: self,
            id: DeliverableId(i),
        })
    }

    /// Every repository of every deliverable, in declared order
    #[allow(dead_code)]
    pub fn repositories(&self) -> impl Iterator<Item = Repository<'_>> {
        (0..self.repositories.len()).map(move |i| Repository {
            team: self,
            id: RepositoryId(i),
        })
    }

    pub(crate) fn repository_by_id(&self, id: RepositoryId) -> Repository<'_> {
        Repository { team: self, id }
    }

    /// Release liaison for this team, fetched through the shared cache
    pub async fn liaison(&self, cache: &LiaisonCache) -> GovernanceResult<Liaison> {
        cache.lookup(&self.name).await
    }

    fn deliverable_node(&self, id: DeliverableId) -> &DeliverableNode {
        &self.deliverables[id.0]
    }

    fn repository_node(&self, id: RepositoryId) -> &RepositoryNode {
        &self.repositories[id.0]
    }
}

/// Borrowed view of a deliverable inside its team
#[derive(Debug, Clone, Copy)]
pub struct Deliverable<'t> {
    team: &'t Team,
    id: DeliverableId,
}

impl<'t> Deliverable<'t> {
    pub fn name(&self) -> &'t str {
        &self.team.deliverable_node(self.id).name
    }

    /// Owning team
    #[allow(dead_code)]
    pub fn team(&self) -> &'t Team {
        self.team
    }

    /// Tags declared on the deliverable itself
    pub fn own_tags(&self) -> &'t TagSet {
        &self.team.deliverable_node(self.id).tags
    }

    /// Own tags followed by the team's tags. Recomputed on every call.
    pub fn tags(&self) -> TagSet {
        let mut tags = self.own_tags().clone();
        tags.extend(self.team.tags.iter().cloned());
        tags
    }

    /// Value of the first `type:` tag, or `other`
    #[allow(dead_code)]
    pub fn kind(&self) -> &'t str {
        self.tag_value("type:").unwrap_or("other")
    }

    /// Value of the first `release:` tag, or `none`
    #[allow(dead_code)]
    pub fn release_model(&self) -> &'t str {
        self.tag_value("release:").unwrap_or("none")
    }

    pub fn repositories(&self) -> impl Iterator<Item = Repository<'t>> {
        let team = self.team;
        team.deliverable_node(self.id)
            .repositories
            .iter()
            .map(move |&id| Repository { team, id })
    }

    #[allow(dead_code)]
    pub fn repository(&self, name: &str) -> Option<Repository<'t>> {
        self.repositories().find(|repo| repo.name() == name)
    }

    fn tag_value(&self, prefix: &str) -> Option<&'t str> {
        self.own_tags()
            .iter()
            .chain(self.team.tags.iter())
            .find_map(|tag| tag.strip_prefix(prefix))
    }
}

/// Borrowed view of a repository inside its team
#[derive(Debug, Clone, Copy)]
pub struct Repository<'t> {
    team: &'t Team,
    id: RepositoryId,
}

impl<'t> Repository<'t> {
    /// Full name, usually `<namespace>/<project>`
    pub fn name(&self) -> &'t str {
        &self.team.repository_node(self.id).name
    }

    pub fn deliverable(&self) -> Deliverable<'t> {
        Deliverable {
            team: self.team,
            id: self.team.repository_node(self.id).deliverable,
        }
    }

    /// Repositories carry no tags of their own
    pub fn tags(&self) -> TagSet {
        self.deliverable().tags()
    }

    /// False for specs repositories and project templates
    pub fn code_related(&self) -> bool {
        let name = self.name();
        !(NON_CODE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
            || TEMPLATE_MARKERS.iter().any(|marker| name.contains(marker)))
    }

    pub(crate) fn id(&self) -> RepositoryId {
        self.id
    }
}
