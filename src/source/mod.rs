//! Governance Document Sources
//!
//! Fetches the team document (YAML) and the liaison document (wiki markup)
//! from a URL or a local path. Sources only retrieve and parse; they never
//! fill in defaults and never retry.

pub mod wiki;

use crate::error::{malformed_document, source_unavailable, GovernanceResult};
use crate::governance::TeamData;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Governance projects list, plain text
pub const DEFAULT_PROJECTS_URL: &str =
    "https://opendev.org/openstack/governance/raw/branch/master/reference/projects.yaml";

/// Cross-project liaison wiki page, raw markup
pub const DEFAULT_LIAISON_URL: &str =
    "https://wiki.openstack.org/w/index.php?title=CrossProjectLiaisons&action=raw";

/// Wiki section holding the release liaison table
pub const DEFAULT_LIAISON_SECTION: &str = "Release management";

/// One row of the liaison table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiaisonEntry {
    pub project: String,
    pub liaison: Option<String>,
    pub irc_handle: Option<String>,
}

/// Liaison rows keyed by lowercased project name
pub type LiaisonData = HashMap<String, LiaisonEntry>;

/// Provider of the team document
#[async_trait]
pub trait TeamSource: Send + Sync {
    async fn fetch_team_data(&self, location: &str) -> GovernanceResult<TeamData>;
}

/// Provider of the liaison document
#[async_trait]
pub trait LiaisonSource: Send + Sync {
    async fn fetch_liaison_data(&self, location: &str) -> GovernanceResult<LiaisonData>;
}

/// Where a document lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Remote(url::Url),
    Local(PathBuf),
}

impl Location {
    fn parse(location: &str) -> Self {
        match url::Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Location::Remote(url),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Location::Local)
                .unwrap_or_else(|_| Location::Local(PathBuf::from(location))),
            _ => Location::Local(PathBuf::from(location)),
        }
    }
}

/// Fetches documents over HTTP(S) or from the local filesystem
pub struct HttpSource {
    client: reqwest::Client,
    liaison_section: String,
}

impl HttpSource {
    /// Create a source whose requests give up after `timeout`
    pub fn new(timeout: Duration, liaison_section: impl Into<String>) -> GovernanceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("guvnahbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| source_unavailable("http client", e))?;

        Ok(Self {
            client,
            liaison_section: liaison_section.into(),
        })
    }

    /// Raw text of the document at `location`
    pub async fn fetch_text(&self, location: &str) -> GovernanceResult<String> {
        match Location::parse(location) {
            Location::Remote(url) => {
                debug!("GET {}", url);
                let response = self
                    .client
                    .get(url.as_str())
                    .send()
                    .await
                    .map_err(|e| source_unavailable(location, e))?
                    .error_for_status()
                    .map_err(|e| source_unavailable(location, e))?;
                response
                    .text()
                    .await
                    .map_err(|e| source_unavailable(location, e))
            }
            Location::Local(path) => {
                debug!("Reading {}", path.display());
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| source_unavailable(location, e))
            }
        }
    }
}

#[async_trait]
impl TeamSource for HttpSource {
    async fn fetch_team_data(&self, location: &str) -> GovernanceResult<TeamData> {
        let text = self.fetch_text(location).await?;
        let data = TeamData::from_yaml_str(location, &text)?;
        info!("Loaded {} teams from {}", data.len(), location);
        Ok(data)
    }
}

#[async_trait]
impl LiaisonSource for HttpSource {
    async fn fetch_liaison_data(&self, location: &str) -> GovernanceResult<LiaisonData> {
        let page = self.fetch_text(location).await?;
        parse_liaison_page(location, &page, &self.liaison_section)
    }
}

/// Liaison table from a wiki page. Rows without a project are skipped.
pub fn parse_liaison_page(location: &str, page: &str, section: &str) -> GovernanceResult<LiaisonData> {
    let rows = wiki::wiki_table(page, section)
        .ok_or_else(|| malformed_document(location, format!("no section named {:?}", section)))?;

    let mut data = LiaisonData::new();
    for mut row in rows {
        let Some(project) = row.shift_remove("Project").filter(|p| !p.is_empty()) else {
            debug!("Skipping liaison row without a project: {:?}", row);
            continue;
        };
        let entry = LiaisonEntry {
            liaison: row.shift_remove("Liaison"),
            irc_handle: row.shift_remove("IRC Handle"),
            project,
        };
        data.insert(entry.project.to_lowercase(), entry);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GovernanceError;
    use crate::governance::data::tests::SAMPLE;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source() -> HttpSource {
        HttpSource::new(Duration::from_secs(5), DEFAULT_LIAISON_SECTION).unwrap()
    }

    #[test]
    fn test_location_parsing() {
        assert!(matches!(
            Location::parse("https://example.com/projects.yaml"),
            Location::Remote(_)
        ));
        assert_eq!(
            Location::parse("/etc/guvnahbot/projects.yaml"),
            Location::Local(PathBuf::from("/etc/guvnahbot/projects.yaml"))
        );
        assert_eq!(
            Location::parse("file:///tmp/projects.yaml"),
            Location::Local(PathBuf::from("/tmp/projects.yaml"))
        );
        assert_eq!(
            Location::parse("relative/projects.yaml"),
            Location::Local(PathBuf::from("relative/projects.yaml"))
        );
    }

    #[test]
    fn test_parse_liaison_page() {
        let data = parse_liaison_page("wiki", wiki::tests::PAGE, DEFAULT_LIAISON_SECTION).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(
            data["compute"],
            LiaisonEntry {
                project: "Compute".to_string(),
                liaison: Some("Alex Smith".to_string()),
                irc_handle: Some("asmith".to_string()),
            }
        );
        assert!(data.contains_key("release management"));
    }

    #[test]
    fn test_parse_liaison_page_missing_section() {
        let err = parse_liaison_page("wiki", "no sections at all", DEFAULT_LIAISON_SECTION).unwrap_err();
        assert!(matches!(err, GovernanceError::MalformedDocument { .. }));
    }

    #[tokio::test]
    async fn test_fetch_team_data_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reference/projects.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .expect(1)
            .mount(&server)
            .await;

        let location = format!("{}/reference/projects.yaml", server.uri());
        let data = source().fetch_team_data(&location).await.unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.find_repo_owner("openstack/swift").unwrap(), "storage");
    }

    #[tokio::test]
    async fn test_http_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source()
            .fetch_team_data(&format!("{}/projects.yaml", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_http_garbage_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("- just\n- a list\n"))
            .mount(&server)
            .await;

        let err = source()
            .fetch_team_data(&format!("{}/projects.yaml", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::MalformedDocument { .. }));
    }

    #[tokio::test]
    async fn test_fetch_liaison_data_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/index.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(wiki::tests::PAGE))
            .mount(&server)
            .await;

        let location = format!("{}/w/index.php?title=CrossProjectLiaisons&action=raw", server.uri());
        let data = source().fetch_liaison_data(&location).await.unwrap();
        assert_eq!(data["storage"].liaison.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_fetch_team_data_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let location = file.path().to_string_lossy().to_string();
        let data = source().fetch_team_data(&location).await.unwrap();
        assert!(data.record("release management").is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let err = source()
            .fetch_team_data("/nonexistent/guvnahbot/projects.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::SourceUnavailable { .. }));
    }
}
