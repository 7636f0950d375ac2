//! Where payloads come from: a JSON file, stdin, or the GraphQL API.
//!
//! Fetching is deliberately thin. There is no caching, retrying or request
//! deduplication here; each call performs exactly one read or request.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::{CovlensError, Result};

/// Coverage of one file at a commit, or at the head of a branch when
/// `$ref` names a branch.
pub const COVERAGE_FILE_QUERY: &str = r#"
query CoverageForFile($owner: String!, $repo: String!, $ref: String!, $path: String!, $flags: [String]) {
  owner(username: $owner) {
    repository(name: $repo) {
      commit(id: $ref) {
        ...CoverageForFile
      }
      branch(name: $ref) {
        head {
          ...CoverageForFile
        }
      }
    }
  }
}

fragment CoverageForFile on Commit {
  coverageFile(path: $path, flags: $flags) {
    isCriticalFile
    content
    coverage {
      line
      coverage
    }
    totals {
      coverage
    }
  }
}
"#;

/// JSON pointer to the commit payload of [`COVERAGE_FILE_QUERY`].
pub const COVERAGE_FILE_POINTER: &str = "/owner/repository/commit/coverageFile";

/// JSON pointer to the branch-head payload of [`COVERAGE_FILE_QUERY`].
pub const COVERAGE_FILE_BRANCH_POINTER: &str = "/owner/repository/branch/head/coverageFile";

/// Pointers tried in order for [`COVERAGE_FILE_QUERY`]: the commit first,
/// then the branch head.
pub const COVERAGE_FILE_POINTERS: &[&str] = &[COVERAGE_FILE_POINTER, COVERAGE_FILE_BRANCH_POINTER];

/// Single impacted file of a pull request comparison.
pub const IMPACTED_FILE_QUERY: &str = r#"
query ImpactedFileComparison($owner: String!, $repo: String!, $pullId: Int!, $path: String!) {
  owner(username: $owner) {
    repository(name: $repo) {
      pull(id: $pullId) {
        compareWithBase {
          __typename
          ... on Comparison {
            impactedFile(path: $path) {
              headName
              isNewFile
              isRenamedFile
              isDeletedFile
              isCriticalFile
              headCoverage { percentCovered }
              baseCoverage { percentCovered }
              patchCoverage { percentCovered }
              changeCoverage
              segments {
                ... on SegmentComparisons {
                  results {
                    header
                    lines {
                      baseNumber
                      headNumber
                      baseCoverage
                      headCoverage
                      content
                      coverageInfo {
                        hitCount
                        hitUploadIds
                      }
                    }
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// JSON pointer to the payload of [`IMPACTED_FILE_QUERY`].
pub const IMPACTED_FILE_POINTER: &str = "/owner/repository/pull/compareWithBase/impactedFile";

/// A source of one JSON payload.
pub trait PayloadSource {
    fn fetch(&self) -> Result<Value>;
}

/// Payload read from a file, or from stdin when the path is `-`.
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PayloadSource for FileSource {
    fn fetch(&self) -> Result<Value> {
        let text = if self.path.as_os_str() == "-" {
            std::io::read_to_string(std::io::stdin())?
        } else {
            std::fs::read_to_string(&self.path)?
        };
        Ok(serde_json::from_str(&text)?)
    }
}

/// API endpoint settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub url: String,
    pub token: Option<String>,
}

impl ApiConfig {
    /// Reads `COVLENS_API_URL` (required) and `COVLENS_TOKEN` (optional).
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("COVLENS_API_URL").map_err(|_| {
            CovlensError::Other("COVLENS_API_URL environment variable is required".to_string())
        })?;
        let token = std::env::var("COVLENS_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(Self { url, token })
    }
}

/// A single GraphQL request; the response's `data` is the payload.
pub struct GraphqlSource {
    pub config: ApiConfig,
    pub query: String,
    pub variables: Value,
}

impl PayloadSource for GraphqlSource {
    fn fetch(&self) -> Result<Value> {
        tracing::info!(url = %self.config.url, "sending GraphQL request");
        let mut request = ureq::post(&self.config.url)
            .set("Accept", "application/json")
            .set("User-Agent", "covlens");
        if let Some(token) = &self.config.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let body = serde_json::json!({
            "query": self.query,
            "variables": self.variables,
        });
        let response: Value = match request.send_json(body) {
            Ok(resp) => resp.into_json()?,
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(CovlensError::Api(format!("HTTP {code}: {body}")));
            }
            Err(e) => return Err(CovlensError::Api(e.to_string())),
        };

        extract_data(response)
    }
}

/// Pull `data` out of a GraphQL response, surfacing any `errors`.
pub fn extract_data(mut response: Value) -> Result<Value> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(CovlensError::Api(if messages.is_empty() {
                "GraphQL request failed".to_string()
            } else {
                messages.join("; ")
            }));
        }
    }
    match response.get_mut("data") {
        Some(data) if !data.is_null() => Ok(data.take()),
        _ => Err(CovlensError::Api("response has no data".to_string())),
    }
}

/// Select the payload at a JSON pointer. An empty pointer selects the
/// whole document.
pub fn select(mut value: Value, pointer: &str) -> Result<Value> {
    if pointer.is_empty() {
        return Ok(value);
    }
    value
        .pointer_mut(pointer)
        .map(Value::take)
        .ok_or_else(|| CovlensError::MissingPayload(pointer.to_string()))
}

/// Select the first non-null payload among `pointers`.
pub fn select_first(mut value: Value, pointers: &[&str]) -> Result<Value> {
    for pointer in pointers {
        if pointer.is_empty() {
            return Ok(value);
        }
        match value.pointer_mut(pointer) {
            Some(found) if !found.is_null() => return Ok(found.take()),
            _ => tracing::debug!(pointer = %pointer, "no payload at pointer"),
        }
    }
    Err(CovlensError::MissingPayload(pointers.join(" or ")))
}
