//! The four-step repository search wizard.
//!
//! Each step stores one criterion under its own scratch field and advances.
//! `skip` leaves the optional filters unset. The last step runs the search
//! with everything collected and clears the action.

use oladizz_core::{ActionTag, Button, FieldUpdate, Keyboard, Reply, Scratch, fields};
use oladizz_framework::{ActionContext, BackgroundTask, HandlerError, HandlerResult, Step};
use serde_json::Value;

use super::github::{NO_TOKEN, github_error};
use super::text;
use crate::clients::github::{Repo, SORT_ORDERS};
use crate::clients::{GitHubClient, RepoSearch};

/// Callback prefix of the sort buttons.
pub const SORT_PREFIX: &str = "de_sort_";

const DESCRIPTION_LIMIT: usize = 100;

fn is_skip(input: &str) -> bool {
    input.eq_ignore_ascii_case("skip")
}

pub async fn query(ctx: ActionContext) -> HandlerResult {
    Ok(Step::advance(
        ActionTag::AwaitingDeepSearchLanguage,
        vec![FieldUpdate::set(fields::QUERY, text(&ctx).to_string())],
    )
    .reply("🔬 Deep Search | Step 2/4\n\nFilter by language? (e.g., 'javascript'). Send 'skip' for any."))
}

pub async fn language(ctx: ActionContext) -> HandlerResult {
    let input = text(&ctx);
    let updates = if is_skip(input) {
        Vec::new()
    } else {
        vec![FieldUpdate::set(fields::LANGUAGE, input.to_string())]
    };
    Ok(Step::advance(ActionTag::AwaitingDeepSearchStars, updates)
        .reply("🔬 Deep Search | Step 3/4\n\nFilter by minimum stars? (e.g., '100'). Send 'skip' for any."))
}

fn sort_keyboard() -> Keyboard {
    [
        ("Best Match", "best-match"),
        ("Most Stars", "stars"),
        ("Most Forks", "forks"),
        ("Recently Updated", "updated"),
    ]
    .into_iter()
    .fold(Keyboard::default(), |kb, (label, sort)| {
        kb.row(vec![Button::new(label, format!("{SORT_PREFIX}{sort}"))])
    })
}

pub async fn stars(ctx: ActionContext) -> HandlerResult {
    let input = text(&ctx);
    let updates = if is_skip(input) {
        Vec::new()
    } else {
        let stars: u64 = input
            .parse()
            .map_err(|_| HandlerError::validation("Please enter a valid number or 'skip'."))?;
        vec![FieldUpdate::set(fields::MIN_STARS, stars)]
    };
    Ok(Step::advance(ActionTag::AwaitingDeepSearchSort, updates).reply(
        Reply::text("🔬 Deep Search | Step 4/4\n\nHow should the results be sorted?")
            .with_keyboard(sort_keyboard()),
    ))
}

fn results_reply(total: u64, items: &[Repo]) -> Reply {
    if items.is_empty() {
        return Reply::text("No repositories found for your specific criteria.");
    }
    let mut message = format!("*Found {total} results for your deep search:*\n\n");
    for repo in items {
        let description = repo
            .description
            .as_deref()
            .map(|d| d.chars().take(DESCRIPTION_LIMIT).collect::<String>())
            .unwrap_or_else(|| "N/A".to_string());
        message.push_str(&format!(
            "*{}* (⭐️ {})\n*Desc:* {description}...\n[View on GitHub]({})\n\n",
            repo.full_name, repo.stargazers_count, repo.html_url
        ));
    }
    Reply::markdown(message).without_preview()
}

/// The collected criteria with the chosen sort order merged in.
fn with_sort(scratch: &Scratch, sort: String) -> Scratch {
    let mut criteria = scratch.as_document().clone();
    criteria.insert(fields::SORT.to_string(), Value::String(sort));
    Scratch::new(criteria)
}

/// Final step: a sort button press or a typed sort order.
pub async fn sort(ctx: ActionContext) -> HandlerResult {
    let choice = match ctx.event().callback_data() {
        Some(data) => data.strip_prefix(SORT_PREFIX).unwrap_or(data).to_string(),
        None => text(&ctx).to_lowercase(),
    };
    if !SORT_ORDERS.contains(&choice.as_str()) {
        return Err(HandlerError::validation(format!(
            "Please choose a sort order: {}.",
            SORT_ORDERS.join(", ")
        )));
    }

    let criteria = with_sort(ctx.scratch(), choice);
    let Some(search) = RepoSearch::from_scratch(&criteria) else {
        return Ok(Step::clear().reply(
            "I lost track of your search keywords. Please start the deep search again.",
        ));
    };
    let Some(token) = ctx.scratch().github_token().map(str::to_string) else {
        return Ok(Step::clear().reply(NO_TOKEN));
    };
    let github = ctx.require::<GitHubClient>()?;
    tracing::debug!(chat = %ctx.chat(), q = %search.q(), sort = %search.sort, "deep search");

    let progress = "⚙️ Building query and searching...";
    let step = match ctx.callback_message() {
        Some(message) => Step::clear().edit(message, progress),
        None => Step::clear().reply(progress),
    };
    let task = BackgroundTask::new(
        "deep_search",
        "An error occurred with the GitHub API. Please try again later.",
        async move {
            let page = github
                .deep_search(&token, &search)
                .await
                .map_err(github_error)?;
            Ok(Some(results_reply(page.total_count, &page.items)))
        },
    );
    Ok(step.spawn(task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;
    use serde_json::json;

    fn repo(name: &str, description: Option<&str>) -> Repo {
        Repo {
            full_name: name.to_string(),
            description: description.map(str::to_string),
            stargazers_count: 7,
            forks_count: 0,
            language: None,
            html_url: format!("https://github.com/{name}"),
            default_branch: None,
        }
    }

    #[test]
    fn test_results_reply() {
        let long = "x".repeat(150);
        let reply = results_reply(2, &[repo("a/b", Some(&long)), repo("c/d", None)]);
        assert_eq!(
            reply.text,
            format!(
                "*Found 2 results for your deep search:*\n\n\
                 *a/b* (⭐️ 7)\n*Desc:* {}...\n[View on GitHub](https://github.com/a/b)\n\n\
                 *c/d* (⭐️ 7)\n*Desc:* N/A...\n[View on GitHub](https://github.com/c/d)\n\n",
                "x".repeat(100)
            )
        );
        assert_eq!(
            results_reply(0, &[]).text,
            "No repositories found for your specific criteria."
        );
    }

    #[test]
    fn test_sort_completes_the_criteria() {
        let collected = Scratch::new(
            json!({ "query": "foo", "minStars": 100 })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let criteria = with_sort(&collected, "stars".to_string());
        assert_eq!(
            Value::Object(criteria.as_document().clone()),
            json!({ "query": "foo", "minStars": 100, "sort": "stars" })
        );
        let search = RepoSearch::from_scratch(&criteria).unwrap();
        assert_eq!(search.sort, "stars");
        assert_eq!(search.language, None);
    }

    #[tokio::test]
    async fn test_wizard_collects_criteria() {
        let h = Harness::new().await;
        h.server.route(
            "GET /search/repositories",
            200,
            r#"{"total_count":1,"items":[{"full_name":"a/foo","stargazers_count":120,"html_url":"https://github.com/a/foo"}]}"#,
        );
        h.seed(1, json!({ "github_pat": "pat" })).await;

        h.press(1, "github_deep_search").await;
        h.text(1, "foo").await;
        h.text(1, "Skip").await;
        h.text(1, "lots").await;
        assert_eq!(h.last_text(), "Please enter a valid number or 'skip'.");
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_deep_search_stars"));

        h.text(1, "100").await;
        assert_eq!(
            h.doc(1).await,
            Some(json!({
                "github_pat": "pat",
                "action": "awaiting_deep_search_sort",
                "query": "foo",
                "minStars": 100,
            }))
        );
        let keyboard = h.outbound.last_reply().unwrap().keyboard.unwrap();
        assert_eq!(
            keyboard.callbacks().collect::<Vec<_>>(),
            vec!["de_sort_best-match", "de_sort_stars", "de_sort_forks", "de_sort_updated"]
        );

        h.press(1, "de_sort_stars").await;
        assert_eq!(h.outbound.edits(), vec!["⚙️ Building query and searching...".to_string()]);
        let seen = h.server.seen();
        assert_eq!(
            seen[0].query,
            "q=foo+stars%3A%3E%3D100&sort=stars&order=desc&per_page=10"
        );
        assert!(h.last_text().starts_with("*Found 1 results for your deep search:*"));
        assert_eq!(h.doc(1).await, Some(json!({ "github_pat": "pat" })));
    }

    #[tokio::test]
    async fn test_typed_sort_and_missing_token() {
        let h = Harness::new().await;
        h.seed(
            1,
            json!({ "action": "awaiting_deep_search_sort", "query": "bots", "language": "rust" }),
        )
        .await;

        h.text(1, "newest").await;
        assert!(h.last_text().starts_with("Please choose a sort order:"));
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_deep_search_sort"));

        h.text(1, "Forks").await;
        assert_eq!(h.last_text(), NO_TOKEN);
        assert_eq!(h.doc(1).await, None);
        assert!(h.server.seen().is_empty());
    }
}
