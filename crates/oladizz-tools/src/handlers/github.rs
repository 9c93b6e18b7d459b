//! GitHub operations run with the chat's personal access token.
//!
//! Every handler here finishes in one turn except the upload, which first
//! stores the received file and then asks for its destination. Lookups work
//! without a token; anything that writes needs one.

use chrono::{DateTime, Utc};
use oladizz_core::{ActionTag, FieldUpdate, Reply, fields};
use oladizz_framework::{
    ActionContext, BackgroundTask, FailureCategory, HandlerError, HandlerResult, Step,
};
use tracing::info;

use super::{file, text, working};
use crate::clients::GitHubClient;
use crate::error::ToolError;

/// First prompt of the deep-search wizard.
pub const DEEP_SEARCH_STEP_1: &str =
    "🔬 Deep Search | Step 1/4\n\nPlease enter your search keywords (e.g., 'telegram bot').";

pub const NO_TOKEN: &str = "Please set your GitHub token first.";

const REQUEST_FAILED: &str = "Sorry, the GitHub request failed.";
const API_FAILED: &str = "An error occurred with the GitHub API. Please try again later.";

const INVALID_REPO: &str = "Invalid repo format: `owner/repo`.";

/// Maps a GitHub failure to the reply the user sees.
pub(crate) fn github_error(err: ToolError) -> HandlerError {
    match err.category() {
        FailureCategory::Other => {
            HandlerError::external(API_FAILED, FailureCategory::Other, err.to_string())
        }
        category => HandlerError::external(REQUEST_FAILED, category, err.to_string()),
    }
}

/// The chat's token, or an empty string for unauthenticated lookups.
fn token(ctx: &ActionContext) -> String {
    ctx.scratch().github_token().unwrap_or_default().to_string()
}

fn require_token(ctx: &ActionContext) -> HandlerResult<String> {
    ctx.scratch()
        .github_token()
        .map(str::to_string)
        .ok_or_else(|| HandlerError::external(NO_TOKEN, FailureCategory::Other, "no token"))
}

/// Splits `owner/repo`.
pub fn repo_ref(s: &str) -> Option<(&str, &str)> {
    let (owner, repo) = s.split_once('/')?;
    (!owner.is_empty() && !repo.is_empty() && !repo.contains('/')).then_some((owner, repo))
}

fn split_repo(s: &str, message: &str) -> HandlerResult<(String, String)> {
    repo_ref(s)
        .map(|(o, r)| (o.to_string(), r.to_string()))
        .ok_or_else(|| HandlerError::validation(message))
}

/// `owner/repo second`, the shape of the commit and commit-list steps.
fn repo_and_word(ctx: &ActionContext, format: &str) -> HandlerResult<(String, String, String)> {
    let mut words = text(ctx).split_whitespace();
    let (Some(full), Some(word), None) = (words.next(), words.next(), words.next()) else {
        return Err(HandlerError::validation(format));
    };
    let (owner, repo) = split_repo(full, INVALID_REPO)?;
    Ok((owner, repo, word.to_string()))
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default()
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Formats an ISO-8601 timestamp as `Tue, 14 Mar 2023 10:00:00 GMT`.
fn http_date(date: &str) -> String {
    DateTime::parse_from_rfc3339(date)
        .map(|d| {
            d.with_timezone(&Utc)
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string()
        })
        .unwrap_or_else(|_| date.to_string())
}

// =============================================================================
// Token
// =============================================================================

pub async fn set_token(ctx: ActionContext) -> HandlerResult {
    let mut step = Step::accumulate(vec![
        FieldUpdate::set(fields::GITHUB_PAT, text(&ctx).to_string()),
        FieldUpdate::delete(fields::ACTION),
    ]);
    if let Some(id) = ctx.message_id() {
        step = step.delete(id);
    }
    Ok(step.reply("Your GitHub token has been saved."))
}

// =============================================================================
// Repositories
// =============================================================================

pub async fn repo_info(ctx: ActionContext) -> HandlerResult {
    let (owner, repo) = split_repo(text(&ctx), "Invalid format. Use `owner/repo`.")?;
    let github = ctx.require::<GitHubClient>()?;
    let info = github
        .repo(&token(&ctx), &owner, &repo)
        .await
        .map_err(github_error)?;
    Ok(Step::clear().reply(Reply::markdown(format!(
        "*{}*\n*Desc:* {}\n*Stars:* {}\n*Forks:* {}\n*Lang:* {}",
        info.full_name,
        info.description.as_deref().unwrap_or("N/A"),
        info.stargazers_count,
        info.forks_count,
        info.language.as_deref().unwrap_or("N/A"),
    ))))
}

/// `name [private]`.
pub async fn create_repo(ctx: ActionContext) -> HandlerResult {
    let mut words = text(&ctx).split_whitespace();
    let Some(name) = words.next().map(str::to_string) else {
        return Err(HandlerError::validation(
            "Please send the name for the new repository (e.g., `my-cool-repo`).",
        ));
    };
    let private = words.next() == Some("private");
    let token = require_token(&ctx)?;
    let github = ctx.require::<GitHubClient>()?;

    let created = github
        .create_repo(&token, &name, private)
        .await
        .map_err(github_error)?;
    info!(chat = %ctx.chat(), repo = %created.full_name, private, "repository created");
    Ok(Step::clear().reply(Reply::markdown(format!(
        "Repository *{}* created! URL: {}",
        created.full_name, created.html_url
    ))))
}

pub async fn branches(ctx: ActionContext) -> HandlerResult {
    let (owner, repo) = split_repo(text(&ctx), "Invalid format. Use `owner/repo`.")?;
    let github = ctx.require::<GitHubClient>()?;
    let branches = github
        .branches(&token(&ctx), &owner, &repo)
        .await
        .map_err(github_error)?;

    let mut message = format!("*Branches in {owner}/{repo}:*\n");
    let names: Vec<String> = branches.iter().map(|b| format!("- {}", b.name)).collect();
    message.push_str(&names.join("\n"));
    Ok(Step::clear().reply(Reply::markdown(message)))
}

/// `owner/repo branch`, the five latest commits.
pub async fn commits(ctx: ActionContext) -> HandlerResult {
    let (owner, repo, branch) = repo_and_word(&ctx, "Invalid format. Use `owner/repo branch`.")?;
    let github = ctx.require::<GitHubClient>()?;
    let commits = github
        .commits(&token(&ctx), &owner, &repo, &branch)
        .await
        .map_err(github_error)?;

    let mut message = format!("*Recent commits on {branch} in {owner}/{repo}:*\n");
    let lines: Vec<String> = commits
        .iter()
        .map(|c| {
            format!(
                "- {} by {}: {}",
                short_sha(&c.sha),
                c.commit.author.name,
                first_line(&c.commit.message)
            )
        })
        .collect();
    message.push_str(&lines.join("\n"));
    Ok(Step::clear().reply(Reply::markdown(message)))
}

pub async fn get_commit(ctx: ActionContext) -> HandlerResult {
    let (owner, repo, sha) = repo_and_word(&ctx, "Invalid format: `owner/repo commit_hash`")?;
    let github = ctx.require::<GitHubClient>()?;
    let commit = github
        .git_commit(&token(&ctx), &owner, &repo, &sha)
        .await
        .map_err(github_error)?;

    Ok(Step::clear().reply(Reply::markdown(format!(
        "*Commit {}:*\n*Author:* {} <{}>\n*Date:* {}\n*Message:* \n{}",
        short_sha(&commit.sha),
        commit.author.name,
        commit.author.email,
        http_date(&commit.author.date),
        commit.message
    ))))
}

/// `owner/repo | title | body`.
pub async fn create_issue(ctx: ActionContext) -> HandlerResult {
    let parts: Vec<&str> = text(&ctx).split(" | ").collect();
    let &[full, title, body] = parts.as_slice() else {
        return Err(HandlerError::validation(
            "Invalid format: `owner/repo | title | body`",
        ));
    };
    let (owner, repo) = split_repo(full.trim(), INVALID_REPO)?;
    let token = require_token(&ctx)?;
    let github = ctx.require::<GitHubClient>()?;

    let issue = github
        .create_issue(&token, &owner, &repo, title.trim(), body.trim())
        .await
        .map_err(github_error)?;
    Ok(Step::clear().reply(Reply::markdown(format!(
        "Issue *#{}* created in *{owner}/{repo}*! URL: {}",
        issue.number, issue.html_url
    ))))
}

// =============================================================================
// Upload
// =============================================================================

/// Stores the received document and asks where it goes.
pub async fn upload_received(ctx: ActionContext) -> HandlerResult {
    let document = file(&ctx)?;
    let name = document.name_or("file").to_string();
    Ok(Step::advance(
        ActionTag::AwaitingUploadDetails,
        vec![
            FieldUpdate::set(fields::FILE_ID, document.file_id),
            FieldUpdate::set(fields::FILE_NAME, name),
        ],
    )
    .reply(Reply::markdown(
        "File received. Now, please provide the destination repository, branch, and full path for the file in this exact format:\n`owner/repo branch path/to/your/file.ext`",
    )))
}

/// `owner/repo branch path`; a missing branch is created from the default one.
pub async fn upload_details(ctx: ActionContext) -> HandlerResult {
    let words: Vec<&str> = text(&ctx).split_whitespace().collect();
    let &[full, branch, path] = words.as_slice() else {
        return Err(HandlerError::validation(
            "Invalid format: `owner/repo branch path/to/file.ext`",
        ));
    };
    let (owner, repo) = split_repo(full, INVALID_REPO)?;
    let (branch, path) = (branch.to_string(), path.to_string());
    let token = require_token(&ctx)?;
    let github = ctx.require::<GitHubClient>()?;
    let Some(file_id) = ctx.scratch().str(fields::FILE_ID).map(str::to_string) else {
        return Ok(Step::clear().reply("I lost track of the file. Please start the upload again."));
    };
    let file_name = ctx.scratch().str(fields::FILE_NAME).unwrap_or("file").to_string();

    let task = BackgroundTask::new("github_upload", REQUEST_FAILED, async move {
        let exists = github
            .branch_exists(&token, &owner, &repo, &branch)
            .await
            .map_err(github_error)?;
        if !exists {
            github
                .create_branch(&token, &owner, &repo, &branch)
                .await
                .map_err(github_error)?;
            ctx.outbound()
                .send_text(ctx.chat(), &Reply::text(format!("Branch '{branch}' created.")))
                .await?;
        }

        let bytes = ctx.outbound().download_file(&file_id).await?;
        github
            .put_file(
                &token,
                &owner,
                &repo,
                &branch,
                &path,
                &bytes,
                &format!("feat: upload {file_name}"),
            )
            .await
            .map_err(github_error)?;
        info!(chat = %ctx.chat(), repo = %format!("{owner}/{repo}"), %branch, %path, "file uploaded");
        Ok(Some(Reply::markdown(format!(
            "File *{file_name}* uploaded to *{owner}/{repo}* on branch *{branch}*!"
        ))))
    });
    Ok(working("Processing upload...", task))
}

// =============================================================================
// Search
// =============================================================================

pub async fn search_repos(ctx: ActionContext) -> HandlerResult {
    let query = text(&ctx).to_string();
    let github = ctx.require::<GitHubClient>()?;
    let page = github
        .search_repos(&token(&ctx), &query)
        .await
        .map_err(github_error)?;

    let mut message = format!("*Search results for \"{query}\":*\n");
    if page.items.is_empty() {
        message.push_str("No repositories found.");
    } else {
        let lines: Vec<String> = page
            .items
            .iter()
            .map(|r| format!("- *{}* ({} stars)", r.full_name, r.stargazers_count))
            .collect();
        message.push_str(&lines.join("\n"));
    }
    Ok(Step::clear().reply(Reply::markdown(message)))
}

pub async fn search_users(ctx: ActionContext) -> HandlerResult {
    let query = text(&ctx).to_string();
    let github = ctx.require::<GitHubClient>()?;
    let page = github
        .search_users(&token(&ctx), &query)
        .await
        .map_err(github_error)?;

    let mut message = format!("*Search results for \"{query}\":*\n");
    if page.items.is_empty() {
        message.push_str("No users found.");
    } else {
        let lines: Vec<String> = page
            .items
            .iter()
            .map(|u| format!("- *{}* - {}", u.login, u.html_url))
            .collect();
        message.push_str(&lines.join("\n"));
    }
    Ok(Step::clear().reply(Reply::markdown(message).without_preview()))
}

pub async fn gists(ctx: ActionContext) -> HandlerResult {
    let user = text(&ctx).to_string();
    let github = ctx.require::<GitHubClient>()?;
    let gists = github
        .gists(&token(&ctx), &user)
        .await
        .map_err(github_error)?;

    let mut message = format!("*Public gists for {user}:*\n");
    if gists.is_empty() {
        message.push_str("No public gists found.");
    } else {
        let lines: Vec<String> = gists
            .iter()
            .map(|g| format!("- *{}*: {}", g.first_file(), g.html_url))
            .collect();
        message.push_str(&lines.join("\n"));
    }
    Ok(Step::clear().reply(Reply::markdown(message).without_preview()))
}
