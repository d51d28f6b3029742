//! Release notes
//!
//! Notes are rendered from a Jinja template (`trim_blocks` on) with the issues
//! closed and pull requests merged since the previous release, plus any notes the
//! author wrote in the registry pull request.

use crate::core::error::TagBotResult;
use crate::github::{GitHubApi, Issue, PullRequest, Release, User};
use crate::release::versions;
use crate::utils;
use chrono::{DateTime, Utc};
use minijinja::Environment;
use regex::Regex;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Template used when the `changelog` input is not supplied
pub const DEFAULT_TEMPLATE: &str = r#"## {{ package }} {{ version }}

{% if previous_release %}
[Diff since {{ previous_release }}]({{ compare_url }})
{% endif %}

{% if custom %}
{{ custom }}
{% endif %}

{% if issues %}
**Closed issues:**
{% for issue in issues %}
- {{ issue.title }} (#{{ issue.number }})
{% endfor %}
{% endif %}

{% if pulls %}
**Merged pull requests:**
{% for pull in pulls %}
- {{ pull.title }} (#{{ pull.number }}) (@{{ pull.author.username }})
{% endfor %}
{% endif %}
"#;

static RELEASE_NOTES: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)<!-- BEGIN RELEASE NOTES -->\n?(.*?)<!-- END RELEASE NOTES -->").unwrap());
static FENCED_NOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)`````(.*?)`````").unwrap());

fn environment() -> Environment<'static> {
  let mut env = Environment::new();
  env.set_trim_blocks(true);
  env
}

/// Check that a template compiles
pub fn validate_template(template: &str) -> Result<(), minijinja::Error> {
  environment().template_from_str(template).map(|_| ())
}

/// Render a template and tidy the whitespace
pub fn render(template: &str, data: &ChangelogData) -> TagBotResult<String> {
  let text = environment().render_str(template, data)?;
  Ok(utils::collapse_blank_lines(&text))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserData {
  pub name: String,
  pub url: String,
  pub username: String,
}

impl UserData {
  /// `name` falls back to the login when the user has no display name
  fn new(user: &User, name: Option<String>) -> Self {
    Self {
      name: name.unwrap_or_else(|| user.login.clone()),
      url: user.html_url.clone(),
      username: user.login.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueData {
  pub author: UserData,
  pub body: String,
  pub labels: Vec<String>,
  pub closer: Option<UserData>,
  pub number: u64,
  pub title: String,
  pub url: String,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullData {
  pub author: UserData,
  pub body: String,
  pub labels: Vec<String>,
  pub merger: Option<UserData>,
  pub number: u64,
  pub title: String,
  pub url: String,
}


/// Template context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangelogData {
  pub package: String,
  pub version: String,
  pub sha: String,
  pub version_url: String,
  pub previous_release: Option<String>,
  pub compare_url: Option<String>,
  pub custom: Option<String>,
  pub issues: Vec<IssueData>,
  pub pulls: Vec<PullData>,
}

/// Release notes generator for one repository
pub struct Changelog<'a> {
  api: &'a dyn GitHubApi,
  repo: &'a str,
  registry: &'a str,
  template: &'a str,
  ignore: HashSet<String>,
  /// login -> display name
  names: RefCell<HashMap<String, Option<String>>>,
}

impl<'a> Changelog<'a> {
  pub fn new(api: &'a dyn GitHubApi, repo: &'a str, registry: &'a str, template: &'a str, ignore: &[String]) -> Self {
    Self {
      api,
      repo,
      registry,
      template,
      ignore: ignore.iter().map(|s| utils::slug(s)).collect(),
      names: RefCell::new(HashMap::new()),
    }
  }

  /// Rendered notes for `version` (tag name) at commit `sha`
  pub fn get(&self, package: &str, html_url: &str, version: &str, sha: &str) -> TagBotResult<String> {
    tracing::debug!("Generating changelog for version {} ({})", version, sha);
    let data = self.collect_data(package, html_url, version, sha)?;
    render(self.template, &data)
  }

  fn collect_data(&self, package: &str, html_url: &str, version: &str, sha: &str) -> TagBotResult<ChangelogData> {
    let releases = self.api.releases(self.repo)?;
    let previous = previous_release(&releases, version);
    let start = previous.map(|r| r.created_at).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let end = self.api.commit_date(self.repo, sha)?;
    tracing::debug!("Previous release: {:?}", previous.map(|r| &r.tag_name));
    tracing::debug!("Changelog window: {} to {}", start, end);

    let (issues, pulls) = self.issues_and_pulls(start, end)?;

    Ok(ChangelogData {
      package: package.to_string(),
      version: version.to_string(),
      sha: sha.to_string(),
      version_url: format!("{}/tree/{}", html_url, version),
      previous_release: previous.map(|r| r.tag_name.clone()),
      compare_url: previous.map(|r| format!("{}/compare/{}...{}", html_url, r.tag_name, version)),
      custom: self.custom_release_notes(package, version)?,
      issues,
      pulls,
    })
  }

  fn ignored(&self, labels: &[crate::github::models::Label]) -> bool {
    labels.iter().any(|l| self.ignore.contains(&utils::slug(&l.name)))
  }

  /// Issues closed and pull requests merged in `(start, end]`, oldest first
  fn issues_and_pulls(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> TagBotResult<(Vec<IssueData>, Vec<PullData>)> {
    let mut issues = Vec::new();
    let mut pulls = Vec::new();

    // The API lists newest first
    for item in self.api.closed_issues(self.repo, start)?.iter().rev() {
      let Some(closed_at) = item.closed_at else {
        continue;
      };
      if closed_at <= start || closed_at > end || self.ignored(&item.labels) {
        continue;
      }
      if item.is_pull_request() {
        let pull = self.api.pull(self.repo, item.number)?;
        if pull.merged_at.is_some() {
          pulls.push(self.pull_data(&pull)?);
        }
      } else {
        issues.push(self.issue_data(item)?);
      }
    }

    Ok((issues, pulls))
  }

  fn issue_data(&self, item: &Issue) -> TagBotResult<IssueData> {
    // Issue lists leave out `closed_by`
    let closed_by = self.api.issue(self.repo, item.number)?.closed_by;
    Ok(IssueData {
      author: self.user_data(&item.user)?,
      body: item.body.clone().unwrap_or_default(),
      labels: item.labels.iter().map(|l| l.name.clone()).collect(),
      closer: closed_by.map(|u| self.user_data(&u)).transpose()?,
      number: item.number,
      title: item.title.clone(),
      url: item.html_url.clone(),
    })
  }

  fn pull_data(&self, pull: &PullRequest) -> TagBotResult<PullData> {
    Ok(PullData {
      author: self.user_data(&pull.user)?,
      body: pull.body.clone().unwrap_or_default(),
      labels: pull.labels.iter().map(|l| l.name.clone()).collect(),
      merger: pull.merged_by.as_ref().map(|u| self.user_data(u)).transpose()?,
      number: pull.number,
      title: pull.title.clone(),
      url: pull.html_url.clone(),
    })
  }

  /// Nested user objects carry only the login; names are looked up once per login
  fn user_data(&self, user: &User) -> TagBotResult<UserData> {
    if user.name.is_some() {
      return Ok(UserData::new(user, user.name.clone()));
    }
    if let Some(name) = self.names.borrow().get(&user.login) {
      return Ok(UserData::new(user, name.clone()));
    }
    let name = self.api.user(&user.login)?.name;
    self.names.borrow_mut().insert(user.login.clone(), name.clone());
    Ok(UserData::new(user, name))
  }

  /// Notes written in the registry pull request for this version
  fn custom_release_notes(&self, package: &str, version: &str) -> TagBotResult<Option<String>> {
    let title = format!("New version: {} {}", package, version);
    let query = format!("repo:{} is:pr \"{}\"", self.registry, title);
    let results = self.api.search_issues(&query)?;

    let Some(pr) = results.iter().find(|i| i.title == title) else {
      tracing::debug!("No registry pull request was found for this version");
      return Ok(None);
    };

    let notes = extract_release_notes(pr.body.as_deref().unwrap_or_default());
    if notes.is_none() {
      tracing::debug!("No custom release notes were found");
    }
    Ok(notes)
  }
}

/// Highest plain `vX.Y.Z` release below `version`
pub fn previous_release<'r>(releases: &'r [Release], version: &str) -> Option<&'r Release> {
  let current = versions::parse(version)?;
  releases
    .iter()
    .filter(|r| r.tag_name.starts_with('v'))
    .filter_map(|r| versions::parse(&r.tag_name).map(|v| (v, r)))
    .filter(|(v, _)| v.pre.is_empty() && v.build.is_empty() && *v < current)
    .max_by(|(a, _), (b, _)| a.cmp(b))
    .map(|(_, r)| r)
}

/// Release notes block from a registry pull request body
pub fn extract_release_notes(body: &str) -> Option<String> {
  let notes = if let Some(m) = RELEASE_NOTES.captures(body) {
    utils::unquote(&m[1])
  } else if let Some(m) = FENCED_NOTES.captures(body) {
    m[1].to_string()
  } else {
    return None;
  };
  let notes = notes.trim();
  (!notes.is_empty()).then(|| notes.to_string())
}
