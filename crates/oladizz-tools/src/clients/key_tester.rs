//! Checks stored API keys against their services.

use std::collections::BTreeMap;

use tracing::debug;

use super::Http;
use crate::error::ToolResult;

/// How a key is presented to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Token,
}

#[derive(Debug, Clone)]
struct Target {
    url: String,
    auth: Auth,
}

/// Outcome of a key test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCheck {
    Working(u16),
    Rejected(u16),
    /// No test is known for the service.
    Unsupported,
}

/// Calls a cheap authenticated endpoint of the key's service.
#[derive(Debug, Clone)]
pub struct KeyTester {
    http: Http,
    targets: BTreeMap<&'static str, Target>,
}

impl KeyTester {
    pub fn new(http: Http) -> Self {
        Self {
            http,
            targets: BTreeMap::new(),
        }
        .target("openai", "https://api.openai.com/v1/models")
        .target("stripe", "https://api.stripe.com/v1/charges")
        .target("github", "https://api.github.com/user")
    }

    /// Overrides the endpoint tested for `service`.
    pub fn target(mut self, service: &'static str, url: impl Into<String>) -> Self {
        let auth = if service == "github" {
            Auth::Token
        } else {
            Auth::Bearer
        };
        self.targets.insert(
            service,
            Target {
                url: url.into(),
                auth,
            },
        );
        self
    }

    /// Matches a stored service name such as `OpenAI-prod` to a known service.
    fn lookup(&self, service: &str) -> Option<&Target> {
        let service = service.to_lowercase();
        self.targets
            .iter()
            .find(|(name, _)| service.contains(*name))
            .map(|(_, target)| target)
    }

    /// Returns `true` if a test is known for `service`.
    pub fn supports(&self, service: &str) -> bool {
        self.lookup(service).is_some()
    }

    pub async fn test(&self, service: &str, key: &str) -> ToolResult<KeyCheck> {
        let Some(target) = self.lookup(service) else {
            return Ok(KeyCheck::Unsupported);
        };
        let request = self.http.client().get(&target.url);
        let request = match target.auth {
            Auth::Bearer => request.bearer_auth(key),
            Auth::Token => request.header("Authorization", format!("token {key}")),
        };
        let status = request.send().await?.status();
        debug!(service, status = status.as_u16(), "Tested API key");
        Ok(if status.is_success() {
            KeyCheck::Working(status.as_u16())
        } else {
            KeyCheck::Rejected(status.as_u16())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::testing::FakeServer;

    #[tokio::test]
    async fn test_statuses_and_unknown_service() {
        let server = FakeServer::start().await;
        server.route("GET /models", 200, "{}").route("GET /user", 401, "{}");
        let http = Http::new(&server.settings()).unwrap();
        let tester = KeyTester::new(http)
            .target("openai", server.url("/models"))
            .target("github", server.url("/user"));

        assert_eq!(tester.test("OpenAI", "sk").await.unwrap(), KeyCheck::Working(200));
        assert_eq!(tester.test("github", "gh").await.unwrap(), KeyCheck::Rejected(401));
        assert_eq!(tester.test("weather", "w").await.unwrap(), KeyCheck::Unsupported);

        let seen = server.seen();
        assert_eq!(seen[0].headers["authorization"], "Bearer sk");
        assert_eq!(seen[1].headers["authorization"], "token gh");
    }
}
