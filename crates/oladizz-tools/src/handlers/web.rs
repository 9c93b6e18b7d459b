//! Web utilities: screenshots, page PDFs, metadata, links, source and
//! downloads.

use oladizz_core::{OutboundFile, Reply};
use oladizz_framework::{ActionContext, BackgroundTask, HandlerError, HandlerResult};
use url::Url;

use super::{send, text, working, workspace, write};
use crate::clients::page::parse_http_url;
use crate::clients::{PageFetcher, PageMetadata};
use crate::media::MediaToolkit;

/// Links listed per page.
pub const MAX_LINKS: usize = 50;

const INVALID_URL: &str = "Please provide a valid URL starting with http:// or https://.";

fn target_url(ctx: &ActionContext) -> HandlerResult<(Url, String)> {
    let shown = text(ctx).to_string();
    let url = parse_http_url(&shown).ok_or_else(|| HandlerError::validation(INVALID_URL))?;
    Ok((url, shown))
}

pub async fn screenshot(ctx: ActionContext) -> HandlerResult {
    let (url, shown) = target_url(&ctx)?;
    let toolkit = ctx.require::<dyn MediaToolkit>()?;

    let task = BackgroundTask::new(
        "screenshot",
        "Sorry, I couldn't take a screenshot of that page. Please make sure the URL is correct and the page is accessible.",
        async move {
            let dir = workspace(&ctx, "shot").await?;
            let out = dir.join("screenshot.png");
            toolkit.screenshot(url.as_str(), &out).await?;
            send(&ctx, OutboundFile::photo(&out).with_caption(format!("Screenshot of {shown}"))).await?;
            Ok(Some(Reply::text(
                "Screenshot taken successfully! Send /start for more options.",
            )))
        },
    );
    Ok(working("Taking screenshot... This might take a moment.", task))
}

pub async fn page_pdf(ctx: ActionContext) -> HandlerResult {
    let (url, shown) = target_url(&ctx)?;
    let toolkit = ctx.require::<dyn MediaToolkit>()?;

    let task = BackgroundTask::new(
        "page_pdf",
        "Sorry, I couldn't convert that page to PDF. Please make sure the URL is correct and the page is accessible.",
        async move {
            let dir = workspace(&ctx, "page").await?;
            let out = dir.join("website.pdf");
            toolkit.page_pdf(url.as_str(), &out).await?;
            send(&ctx, OutboundFile::document(&out).with_caption(format!("PDF of {shown}"))).await?;
            Ok(Some(Reply::text("Website converted to PDF successfully!")))
        },
    );
    Ok(working(
        "Converting website to PDF... This might take a moment.",
        task,
    ))
}

fn metadata_reply(shown: &str, meta: &PageMetadata) -> Reply {
    let mut message = format!(
        "*Metadata for {shown}:*\n\n*Title:* {}\n",
        meta.title.as_deref().unwrap_or("N/A")
    );
    if let Some(description) = &meta.description {
        message.push_str(&format!("*Description:* {description}\n"));
    }
    if let Some(title) = &meta.og_title {
        message.push_str(&format!("*OG Title:* {title}\n"));
    }
    if let Some(description) = &meta.og_description {
        message.push_str(&format!("*OG Description:* {description}\n"));
    }
    if let Some(image) = &meta.og_image {
        message.push_str(&format!("*OG Image:* [link]({image})\n"));
    }
    if meta.title.is_some() && meta.only_title() {
        message.push_str(
            "\nNo other common metadata tags (description, Open Graph) were found on this page.",
        );
    }
    Reply::markdown(message).without_preview()
}

pub async fn metadata(ctx: ActionContext) -> HandlerResult {
    let (url, shown) = target_url(&ctx)?;
    let pages = ctx.require::<PageFetcher>()?;

    let task = BackgroundTask::new(
        "page_metadata",
        "Sorry, I couldn't fetch metadata from that page. Please make sure the URL is correct and the page is accessible.",
        async move {
            let html = pages.fetch(url.as_str()).await?;
            Ok(Some(metadata_reply(&shown, &pages.metadata(&html))))
        },
    );
    Ok(working(
        "Fetching website metadata... This might take a moment.",
        task,
    ))
}

fn links_reply(shown: &str, links: &[String]) -> Reply {
    if links.is_empty() {
        return Reply::text(format!("No unique, absolute links found on {shown}."));
    }
    let mut message = format!("*Found {} unique links on {shown}:*\n\n", links.len());
    message.push_str(&links[..links.len().min(MAX_LINKS)].join("\n"));
    if links.len() > MAX_LINKS {
        message.push_str(&format!("\n\n...and {} more.", links.len() - MAX_LINKS));
    }
    Reply::markdown(message).without_preview()
}

pub async fn links(ctx: ActionContext) -> HandlerResult {
    let (url, shown) = target_url(&ctx)?;
    let pages = ctx.require::<PageFetcher>()?;

    let task = BackgroundTask::new(
        "page_links",
        "Sorry, I couldn't extract links from that page. Please make sure the URL is correct and the page is accessible.",
        async move {
            let html = pages.fetch(url.as_str()).await?;
            Ok(Some(links_reply(&shown, &pages.links(&html))))
        },
    );
    Ok(working("Extracting links... This might take a moment.", task))
}

pub async fn source(ctx: ActionContext) -> HandlerResult {
    let (url, shown) = target_url(&ctx)?;
    let pages = ctx.require::<PageFetcher>()?;

    let task = BackgroundTask::new(
        "page_source",
        "Sorry, I couldn't get the source code from that page. Please make sure the URL is correct and the page is accessible.",
        async move {
            let html = pages.fetch(url.as_str()).await?;
            let dir = workspace(&ctx, "source").await?;
            let out = dir.join("source.html");
            write(&out, html.as_bytes()).await?;
            send(
                &ctx,
                OutboundFile::document(&out).with_caption(format!("HTML source code for {shown}")),
            )
            .await?;
            Ok(None)
        },
    );
    Ok(working("Fetching page source... This might take a moment.", task))
}

/// Last path segment of `url`, or a generic name.
pub fn download_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "downloaded_file".to_string())
}

pub async fn download(ctx: ActionContext) -> HandlerResult {
    let (url, _) = target_url(&ctx)?;
    let pages = ctx.require::<PageFetcher>()?;

    let task = BackgroundTask::new(
        "download_url",
        "Sorry, I couldn't download the file from that URL. Please make sure the link is correct and public.",
        async move {
            let bytes = pages.download(url.as_str()).await?;
            let dir = workspace(&ctx, "download").await?;
            let out = dir.join(download_name(&url));
            write(&out, &bytes).await?;
            send(&ctx, OutboundFile::document(&out)).await?;
            Ok(Some(Reply::text(
                "File downloaded successfully! Send /start for more options.",
            )))
        },
    );
    Ok(working("Downloading file... This may take a moment.", task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;

    #[test]
    fn test_download_name() {
        let name = |u: &str| download_name(&Url::parse(u).unwrap());
        assert_eq!(name("https://example.com/files/report.pdf"), "report.pdf");
        assert_eq!(name("https://example.com/files/"), "downloaded_file");
        assert_eq!(name("https://example.com"), "downloaded_file");
    }

    #[test]
    fn test_links_reply_caps_list() {
        let links: Vec<String> = (0..53).map(|i| format!("https://e.com/{i}")).collect();
        let reply = links_reply("https://e.com", &links);
        assert!(reply.text.starts_with("*Found 53 unique links on https://e.com:*\n\nhttps://e.com/0\n"));
        assert!(reply.text.contains("https://e.com/49"));
        assert!(!reply.text.contains("https://e.com/50"));
        assert!(reply.text.ends_with("\n\n...and 3 more."));
        assert_eq!(
            links_reply("https://e.com", &[]).text,
            "No unique, absolute links found on https://e.com."
        );
    }

    #[tokio::test]
    async fn test_invalid_url_keeps_waiting() {
        let h = Harness::new().await;
        h.press(1, "website_screenshot").await;
        h.text(1, "not a url").await;
        assert_eq!(h.last_text(), INVALID_URL);
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_url_for_screenshot"));

        h.text(1, "https://example.com").await;
        assert_eq!(h.doc(1).await, None);
        assert_eq!(h.toolkit.calls(), vec!["screenshot https://example.com/"]);
        assert_eq!(
            h.uploads()[0].1.as_deref(),
            Some("Screenshot of https://example.com")
        );
    }

    #[tokio::test]
    async fn test_metadata_from_page() {
        let h = Harness::new().await;
        h.server.route(
            "GET /page",
            200,
            r#"<html><head><title>Hello</title><meta name="description" content="A test"></head></html>"#,
        );
        let page = h.server.url("/page");
        h.press(1, "get_page_metadata").await;
        h.text(1, &page).await;
        assert_eq!(
            h.last_text(),
            format!("*Metadata for {page}:*\n\n*Title:* Hello\n*Description:* A test\n")
        );
    }

    #[tokio::test]
    async fn test_only_title_note() {
        let h = Harness::new().await;
        h.server.route("GET /bare", 200, "<title>Bare</title>");
        let page = h.server.url("/bare");
        h.press(1, "get_page_metadata").await;
        h.text(1, &page).await;
        assert!(h.last_text().ends_with("No other common metadata tags (description, Open Graph) were found on this page."));
    }

    #[tokio::test]
    async fn test_download_and_source() {
        let h = Harness::new().await;
        h.server.route("GET /files/notes.txt", 200, "remember");
        h.press(1, "download_from_url").await;
        h.text(1, &h.server.url("/files/notes.txt")).await;
        assert_eq!(
            h.uploads(),
            vec![("notes.txt".to_string(), None, "remember".to_string())]
        );

        h.server.route("GET /index", 200, "<html>root</html>");
        h.press(1, "view_page_source").await;
        h.text(1, &h.server.url("/index")).await;
        let (name, caption, contents) = h.uploads().remove(1);
        assert_eq!(name, "source.html");
        assert!(caption.unwrap().starts_with("HTML source code for "));
        assert_eq!(contents, "<html>root</html>");
    }

    #[tokio::test]
    async fn test_unreachable_page_reports_failure() {
        let h = Harness::new().await;
        h.server.route("GET /gone", 500, "boom");
        h.press(1, "extract_page_links").await;
        h.text(1, &h.server.url("/gone")).await;
        assert_eq!(
            h.last_text(),
            "Sorry, I couldn't extract links from that page. Please make sure the URL is correct and the page is accessible."
        );
    }
}
