//! Repository Query Engine
//!
//! Filtered enumeration of repositories across the team graph. Team views
//! are built lazily, one team at a time, as the caller pulls items.

use crate::error::GovernanceResult;
use crate::governance::data::{TagSet, TeamData};
use crate::governance::model::{Deliverable, Repository, RepositoryId, Team};
use std::sync::Arc;

/// Filters for `enumerate_repositories`. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct RepositoryFilter {
    /// Restrict to one team. Unknown teams are an error.
    pub team: Option<String>,
    /// Restrict to one deliverable per team. Teams without it are skipped.
    pub deliverable: Option<String>,
    /// Repositories must carry all of these tags
    pub tags: TagSet,
    /// Skip specs and template repositories
    pub code_only: bool,
}

impl RepositoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    #[allow(dead_code)]
    pub fn deliverable(mut self, deliverable: impl Into<String>) -> Self {
        self.deliverable = Some(deliverable.into());
        self
    }

    #[allow(dead_code)]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[allow(dead_code)]
    pub fn code_only(mut self, code_only: bool) -> Self {
        self.code_only = code_only;
        self
    }

    fn accepts(&self, repository: &Repository<'_>) -> bool {
        if self.code_only && !repository.code_related() {
            return false;
        }
        if self.tags.is_empty() {
            return true;
        }
        let tags = repository.tags();
        self.tags.iter().all(|tag| tags.contains(tag))
    }

    fn selected_deliverables<'t>(&self, team: &'t Team) -> Vec<Deliverable<'t>> {
        match self.deliverable.as_deref() {
            Some(name) => team.deliverable(name).into_iter().collect(),
            None => team.deliverables().collect(),
        }
    }
}

/// A repository yielded by the query engine. Keeps its team view alive.
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    team: Arc<Team>,
    id: RepositoryId,
}

impl RepositoryEntry {
    pub fn repository(&self) -> Repository<'_> {
        self.team.repository_by_id(self.id)
    }

    pub fn name(&self) -> &str {
        self.repository().name()
    }

    #[allow(dead_code)]
    pub fn team(&self) -> &Team {
        &self.team
    }

    #[allow(dead_code)]
    pub fn deliverable_name(&self) -> &str {
        self.repository().deliverable().name()
    }
}

/// Enumerate repositories matching `filter`.
///
/// Order follows the document: teams, then deliverables, then repositories
/// as declared. The returned iterator is single-pass.
pub fn enumerate_repositories<'a>(
    data: &'a TeamData,
    filter: &'a RepositoryFilter,
) -> GovernanceResult<impl Iterator<Item = RepositoryEntry> + 'a> {
    let (single, all) = match filter.team.as_deref() {
        Some(name) => (Some(Team::lookup(data, name)?), None),
        None => (
            None,
            Some(data.iter().map(|(name, record)| Team::new(name, record))),
        ),
    };
    let teams = single.into_iter().chain(all.into_iter().flatten());

    Ok(teams.flat_map(move |team| {
        let team = Arc::new(team);
        let ids: Vec<RepositoryId> = filter
            .selected_deliverables(&team)
            .iter()
            .flat_map(|deliverable| deliverable.repositories())
            .filter(|repository| filter.accepts(repository))
            .map(|repository| repository.id())
            .collect();
        ids.into_iter().map(move |id| RepositoryEntry {
            team: Arc::clone(&team),
            id,
        })
    }))
}
