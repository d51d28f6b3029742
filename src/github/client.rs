//! Blocking GitHub REST client

use super::GitHubApi;
use super::models::{
  CommitEntry, Contents, DispatchEvent, Issue, NewPull, NewRelease, PullRequest, Release, Repository, SearchResults,
  User,
};
use crate::core::error::{ApiError, TagBotError, TagBotResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::de::DeserializeOwned;

const PER_PAGE: &str = "100";
const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const ACCEPT_DISPATCH: &str = "application/vnd.github.everest-preview+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw";

/// GitHub REST client authenticated with a token
pub struct GitHubClient {
  http: Client,
  api_url: String,
  token: String,
}

impl GitHubClient {
  pub fn new(api_url: &str, token: &str) -> TagBotResult<Self> {
    let http = Client::builder()
      .user_agent(concat!("TagBot/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      http,
      api_url: api_url.trim_end_matches('/').to_string(),
      token: token.to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
      path.to_string()
    } else {
      format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self.request_as(method, path, ACCEPT_V3)
  }

  /// Request with a specific media type (headers are appended, so `Accept` is set once here)
  fn request_as(&self, method: Method, path: &str, accept: &str) -> RequestBuilder {
    self
      .http
      .request(method, self.url(path))
      .header(AUTHORIZATION, format!("token {}", self.token))
      .header(ACCEPT, accept)
      .header(USER_AGENT, "TagBot")
  }

  /// Send a request, turning error statuses into `ApiError`
  fn send(&self, request: RequestBuilder) -> TagBotResult<Response> {
    let response = request.send()?;
    if response.status().is_success() {
      return Ok(response);
    }
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().unwrap_or_default();
    Err(TagBotError::Api(ApiError::Status { status, url, body }))
  }

  fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> TagBotResult<T> {
    let response = self.send(self.request(Method::GET, path).query(query))?;
    Ok(response.json()?)
  }

  /// GET that maps 404 to `None`
  fn get_optional<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> TagBotResult<Option<T>> {
    match self.get_json(path, query) {
      Ok(value) => Ok(Some(value)),
      Err(TagBotError::Api(e)) if e.status() == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(None),
      Err(e) => Err(e),
    }
  }

  /// GET every page of a list endpoint
  fn get_paginated<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> TagBotResult<Vec<T>> {
    let mut query = query.to_vec();
    query.push(("per_page", PER_PAGE));

    let mut items = Vec::new();
    let mut response = self.send(self.request(Method::GET, path).query(&query))?;
    loop {
      let next = response
        .headers()
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(next_link);
      let page: Vec<T> = response.json()?;
      items.extend(page);
      match next {
        // The next link already carries the query string
        Some(url) => response = self.send(self.request(Method::GET, &url))?,
        None => break,
      }
    }
    Ok(items)
  }

  fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> TagBotResult<Response> {
    self.send(self.request(Method::POST, path).json(body))
  }
}

impl GitHubApi for GitHubClient {
  fn repository(&self, repo: &str) -> TagBotResult<Repository> {
    self.get_json(&format!("repos/{}", repo), &[])
  }

  fn file_contents(&self, repo: &str, path: &str, git_ref: Option<&str>) -> TagBotResult<Option<String>> {
    let query: Vec<(&str, &str)> = git_ref.map(|r| vec![("ref", r)]).unwrap_or_default();
    let url = format!("repos/{}/contents/{}", repo, path);
    let Some(contents) = self.get_optional::<Contents>(&url, &query)? else {
      return Ok(None);
    };
    if let Some(text) = decode_contents(&contents)? {
      return Ok(Some(text));
    }

    // Files over 1 MB come back without content; the raw media type serves them
    tracing::debug!("Fetching {} from {} as raw content ({} bytes)", path, repo, contents.size);
    let response = self.send(self.request_as(Method::GET, &url, ACCEPT_RAW).query(&query))?;
    Ok(Some(response.text()?))
  }

  fn latest_commit_before(&self, repo: &str, until: DateTime<Utc>) -> TagBotResult<Option<String>> {
    let until = until.to_rfc3339_opts(SecondsFormat::Secs, true);
    let commits: Vec<CommitEntry> =
      self.get_json(&format!("repos/{}/commits", repo), &[("until", &until), ("per_page", "1")])?;
    Ok(commits.into_iter().next().map(|c| c.sha))
  }

  fn commit_date(&self, repo: &str, sha: &str) -> TagBotResult<DateTime<Utc>> {
    let commit: CommitEntry = self.get_json(&format!("repos/{}/commits/{}", repo, sha), &[])?;
    Ok(commit.commit.committer.date)
  }

  fn release_exists(&self, repo: &str, tag: &str) -> TagBotResult<bool> {
    let release: Option<Release> = self.get_optional(&format!("repos/{}/releases/tags/{}", repo, tag), &[])?;
    Ok(release.is_some())
  }

  fn releases(&self, repo: &str) -> TagBotResult<Vec<Release>> {
    self.get_paginated(&format!("repos/{}/releases", repo), &[])
  }

  fn create_release(&self, repo: &str, release: &NewRelease) -> TagBotResult<()> {
    self.post_json(&format!("repos/{}/releases", repo), release).map(|_| ())
  }

  fn create_pull(&self, repo: &str, pull: &NewPull) -> TagBotResult<()> {
    self.post_json(&format!("repos/{}/pulls", repo), pull).map(|_| ())
  }

  fn create_dispatch(&self, repo: &str, event: &DispatchEvent) -> TagBotResult<u16> {
    let response = self
      .request_as(Method::POST, &format!("repos/{}/dispatches", repo), ACCEPT_DISPATCH)
      .json(event)
      .send()?;
    Ok(response.status().as_u16())
  }

  fn closed_issues(&self, repo: &str, since: DateTime<Utc>) -> TagBotResult<Vec<Issue>> {
    let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
    self.get_paginated(&format!("repos/{}/issues", repo), &[("state", "closed"), ("since", &since)])
  }

  fn issue(&self, repo: &str, number: u64) -> TagBotResult<Issue> {
    self.get_json(&format!("repos/{}/issues/{}", repo, number), &[])
  }

  fn pull(&self, repo: &str, number: u64) -> TagBotResult<PullRequest> {
    self.get_json(&format!("repos/{}/pulls/{}", repo, number), &[])
  }

  fn user(&self, login: &str) -> TagBotResult<User> {
    self.get_json(&format!("users/{}", login), &[])
  }

  fn search_issues(&self, query: &str) -> TagBotResult<Vec<Issue>> {
    let results: SearchResults = self.get_json("search/issues", &[("q", query), ("per_page", PER_PAGE)])?;
    Ok(results.items)
  }
}

/// Extract the `rel="next"` URL from a `Link` header
fn next_link(header: &str) -> Option<String> {
  header.split(',').find_map(|part| {
    let mut pieces = part.split(';');
    let url = pieces.next()?.trim();
    let is_next = pieces.any(|p| p.trim() == "rel=\"next\"");
    if is_next {
      url.strip_prefix('<')?.strip_suffix('>').map(String::from)
    } else {
      None
    }
  })
}

/// Decode a contents API payload (Base64 with embedded newlines)
///
/// `None` when the payload omits the content (`encoding: none`, files over 1 MB).
fn decode_contents(contents: &Contents) -> TagBotResult<Option<String>> {
  if contents.encoding == "none" {
    return Ok(None);
  }
  if !contents.encoding.is_empty() && contents.encoding != "base64" {
    return Err(TagBotError::message(format!(
      "Unsupported content encoding: {}",
      contents.encoding
    )));
  }
  let compact: String = contents.content.chars().filter(|c| !c.is_whitespace()).collect();
  let bytes = STANDARD
    .decode(compact)
    .map_err(|e| TagBotError::message(format!("Invalid Base64 content: {}", e)))?;
  Ok(Some(String::from_utf8(bytes)?))
}
