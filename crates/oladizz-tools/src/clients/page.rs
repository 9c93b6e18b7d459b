//! Web page fetching and light HTML inspection.

use regex::Regex;
use url::Url;

use super::Http;
use crate::error::{ToolError, ToolResult};

/// Metadata shown for a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
}

impl PageMetadata {
    /// Returns `true` if nothing beyond the title was found.
    pub fn only_title(&self) -> bool {
        self.description.is_none()
            && self.og_title.is_none()
            && self.og_description.is_none()
            && self.og_image.is_none()
    }
}

/// Parses `text` as an `http`/`https` URL with a host.
pub fn parse_http_url(text: &str) -> Option<Url> {
    let url = Url::parse(text.trim()).ok()?;
    (matches!(url.scheme(), "http" | "https") && url.host().is_some()).then_some(url)
}

/// Fetches pages and extracts metadata and links.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    http: Http,
    title: Regex,
    meta: Regex,
    attr: Regex,
    href: Regex,
}

impl PageFetcher {
    pub fn new(http: Http) -> ToolResult<Self> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(ToolError::decode);
        Ok(Self {
            http,
            title: compile(r"(?is)<title[^>]*>(.*?)</title>")?,
            meta: compile(r"(?is)<meta\s[^>]*>")?,
            attr: compile(r#"(?is)([a-z:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            href: compile(r#"(?is)<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
        })
    }

    pub async fn fetch(&self, url: &str) -> ToolResult<String> {
        self.http.get_text(url).await
    }

    pub async fn download(&self, url: &str) -> ToolResult<Vec<u8>> {
        self.http.get_bytes(url).await
    }

    /// Reads the title, description and Open Graph tags.
    pub fn metadata(&self, html: &str) -> PageMetadata {
        let mut meta = PageMetadata {
            title: self
                .title
                .captures(html)
                .map(|c| decode_entities(c[1].trim()))
                .filter(|t| !t.is_empty()),
            ..PageMetadata::default()
        };

        for tag in self.meta.find_iter(html) {
            let mut key = None;
            let mut content = None;
            for cap in self.attr.captures_iter(tag.as_str()) {
                let value = cap.get(2).or_else(|| cap.get(3)).map_or("", |m| m.as_str());
                match cap[1].to_ascii_lowercase().as_str() {
                    "name" | "property" => key = Some(value.to_ascii_lowercase()),
                    "content" => content = Some(decode_entities(value.trim())),
                    _ => {}
                }
            }
            let (Some(key), Some(content)) = (key, content) else {
                continue;
            };
            let slot = match key.as_str() {
                "description" => &mut meta.description,
                "og:title" => &mut meta.og_title,
                "og:description" => &mut meta.og_description,
                "og:image" => &mut meta.og_image,
                _ => continue,
            };
            if slot.is_none() && !content.is_empty() {
                *slot = Some(content);
            }
        }
        meta
    }

    /// Absolute `http`/`https` links in document order, without duplicates.
    pub fn links(&self, html: &str) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();
        for cap in self.href.captures_iter(html) {
            let raw = cap.get(1).or_else(|| cap.get(2)).map_or("", |m| m.as_str());
            if let Some(url) = parse_http_url(&decode_entities(raw)) {
                let url = url.to_string();
                if !links.contains(&url) {
                    links.push(url);
                }
            }
        }
        links
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ToolSettings;

    const PAGE: &str = r#"<html><head>
        <TITLE> Rust &amp; Friends </TITLE>
        <meta name="description" content="A page about Rust">
        <meta property='og:image' content='https://example.com/a.png' />
        <meta charset="utf-8">
        </head><body>
        <a href="https://rust-lang.org">Rust</a>
        <a class="x" href='/relative'>rel</a>
        <a href="https://rust-lang.org">again</a>
        <a href="mailto:me@example.com">mail</a>
        <a href="http://example.com/?a=1&amp;b=2">q</a>
        </body></html>"#;

    fn fetcher() -> PageFetcher {
        PageFetcher::new(Http::new(&ToolSettings::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_metadata() {
        let meta = fetcher().metadata(PAGE);
        assert_eq!(meta.title.as_deref(), Some("Rust & Friends"));
        assert_eq!(meta.description.as_deref(), Some("A page about Rust"));
        assert_eq!(meta.og_image.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(meta.og_title, None);
        assert!(!meta.only_title());
        assert!(fetcher().metadata("<title>x</title>").only_title());
    }

    #[test]
    fn test_links_are_absolute_and_unique() {
        assert_eq!(
            fetcher().links(PAGE),
            vec!["https://rust-lang.org/", "http://example.com/?a=1&b=2"]
        );
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url(" https://google.com ").is_some());
        assert!(parse_http_url("ftp://example.com").is_none());
        assert!(parse_http_url("google.com").is_none());
        assert!(parse_http_url("http://").is_none());
    }
}
