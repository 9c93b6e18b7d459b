//! npm registry search.

use serde::Deserialize;

use super::Http;
use crate::error::ToolResult;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageLinks {
    #[serde(default)]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NpmPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub links: PackageLinks,
}

impl NpmPackage {
    pub fn npm_url(&self) -> String {
        format!("https://www.npmjs.com/package/{}", self.name)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    objects: Vec<SearchObject>,
}

#[derive(Debug, Deserialize)]
struct SearchObject {
    package: NpmPackage,
}

#[derive(Debug, Clone)]
pub struct NpmClient {
    http: Http,
    base: String,
}

impl NpmClient {
    pub fn new(http: Http, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Top five packages matching `text`.
    pub async fn search(&self, text: &str) -> ToolResult<Vec<NpmPackage>> {
        let request = self
            .http
            .client()
            .get(format!("{}/-/v1/search", self.base))
            .query(&[("text", text), ("size", "5")]);
        let result: SearchResult = self.http.send(request).await?.json().await?;
        Ok(result.objects.into_iter().map(|o| o.package).collect())
    }
}
