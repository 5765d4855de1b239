//! Contributor leaderboard
//!
//! Points come from merged pull requests labelled for the open-source
//! programme (`gssoc25`). Only the highest level label of a PR counts:
//!
//! | label     | points |
//! |-----------|--------|
//! | `level-3` | 10     |
//! | `level-2` | 5      |
//! | `level-1` | 3      |
//!
//! PRs without a level label score nothing and are left out entirely.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = "dsamate-api";
const PER_PAGE: u32 = 100;
const MAX_PAGES: u32 = 50;
const PROGRAMME_LABEL: &str = "gssoc25";

/// Leaderboard errors
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("GitHub returned {0}")]
    Status(u16),

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Repository whose pull requests are scored
#[derive(Debug, Clone)]
pub struct GithubRepo {
    pub owner: String,
    pub name: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub user: PullRequestAuthor,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub merged_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestAuthor {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Entry of `/stats/contributors`
#[derive(Debug, Clone, Deserialize)]
pub struct CommitStats {
    pub total: u64,
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub login: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelBreakdown {
    pub level1: u32,
    pub level2: u32,
    pub level3: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorPoints {
    pub login: String,
    #[serde(rename = "html_url")]
    pub html_url: String,
    #[serde(rename = "avatar_url")]
    pub avatar_url: String,
    /// Commit count from the contributor stats, 0 when unavailable
    pub contributions: u64,
    pub points: u32,
    pub pr_count: u32,
    pub level_breakdown: LevelBreakdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStats {
    pub total_contributors: usize,
    pub total_points: u64,
    #[serde(rename = "totalPRs")]
    pub total_prs: u64,
    pub total_commits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    pub contributors: Vec<ContributorPoints>,
    pub stats: LeaderboardStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    One,
    Two,
    Three,
}

impl Level {
    fn points(self) -> u32 {
        match self {
            Level::Three => 10,
            Level::Two => 5,
            Level::One => 3,
        }
    }
}

fn highest_level(labels: &[Label]) -> Option<Level> {
    let has = |name: &str| labels.iter().any(|l| l.name == name);
    if has("level-3") {
        Some(Level::Three)
    } else if has("level-2") {
        Some(Level::Two)
    } else if has("level-1") {
        Some(Level::One)
    } else {
        None
    }
}

/// Points for a PR's labels (highest level only)
pub fn points_for(labels: &[Label]) -> u32 {
    highest_level(labels).map(Level::points).unwrap_or(0)
}

/// Whether any label mentions the programme, ignoring case
pub fn has_programme_label(labels: &[Label]) -> bool {
    labels
        .iter()
        .any(|l| l.name.to_lowercase().contains(PROGRAMME_LABEL))
}

/// Scores merged programme PRs per author, highest points first
///
/// Ties keep the order in which authors first appear.
pub fn aggregate(pull_requests: &[PullRequest]) -> Vec<ContributorPoints> {
    let mut order: Vec<String> = Vec::new();
    let mut by_login: HashMap<String, ContributorPoints> = HashMap::new();

    for pr in pull_requests {
        if pr.merged_at.is_none() || !has_programme_label(&pr.labels) {
            continue;
        }
        let Some(level) = highest_level(&pr.labels) else {
            continue;
        };

        let entry = by_login.entry(pr.user.login.clone()).or_insert_with(|| {
            order.push(pr.user.login.clone());
            ContributorPoints {
                login: pr.user.login.clone(),
                html_url: pr.user.html_url.clone(),
                avatar_url: pr.user.avatar_url.clone(),
                contributions: 0,
                points: 0,
                pr_count: 0,
                level_breakdown: LevelBreakdown::default(),
            }
        });

        entry.points += level.points();
        entry.pr_count += 1;
        match level {
            Level::Three => entry.level_breakdown.level3 += 1,
            Level::Two => entry.level_breakdown.level2 += 1,
            Level::One => entry.level_breakdown.level1 += 1,
        }
    }

    let mut contributors: Vec<ContributorPoints> = order
        .into_iter()
        .filter_map(|login| by_login.remove(&login))
        .collect();
    contributors.sort_by(|a, b| b.points.cmp(&a.points));
    contributors
}

/// Fills `contributions` from the commit stats; unknown logins get 0
pub fn apply_commit_counts(contributors: &mut [ContributorPoints], stats: &[CommitStats]) {
    let commits: HashMap<&str, u64> = stats
        .iter()
        .filter_map(|s| s.author.as_ref().map(|a| (a.login.as_str(), s.total)))
        .collect();

    for contributor in contributors.iter_mut() {
        contributor.contributions = commits.get(contributor.login.as_str()).copied().unwrap_or(0);
    }
}

impl Leaderboard {
    pub fn new(contributors: Vec<ContributorPoints>) -> Self {
        let stats = LeaderboardStats {
            total_contributors: contributors.len(),
            total_points: contributors.iter().map(|c| c.points as u64).sum(),
            total_prs: contributors.iter().map(|c| c.pr_count as u64).sum(),
            total_commits: contributors.iter().map(|c| c.contributions).sum(),
        };
        Self {
            contributors,
            stats,
        }
    }
}

fn github_get(http: &reqwest::Client, repo: &GithubRepo, url: String) -> reqwest::RequestBuilder {
    let request = http
        .get(url)
        .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
        .header(reqwest::header::USER_AGENT, USER_AGENT);
    match &repo.token {
        Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("token {token}")),
        None => request,
    }
}

/// Pages through closed PRs until an empty page or the page cap
pub async fn fetch_closed_pull_requests(
    http: &reqwest::Client,
    repo: &GithubRepo,
) -> Result<Vec<PullRequest>, LeaderboardError> {
    let mut all = Vec::new();

    for page in 1..=MAX_PAGES {
        let url = format!(
            "{GITHUB_API}/repos/{}/{}/pulls?state=closed&per_page={PER_PAGE}&page={page}",
            repo.owner, repo.name
        );
        let response = github_get(http, repo, url).send().await?;
        if !response.status().is_success() {
            return Err(LeaderboardError::Status(response.status().as_u16()));
        }

        let prs: Vec<PullRequest> = response.json().await?;
        if prs.is_empty() {
            break;
        }
        all.extend(prs);
    }

    Ok(all)
}

async fn fetch_commit_stats(
    http: &reqwest::Client,
    repo: &GithubRepo,
) -> Result<Vec<CommitStats>, LeaderboardError> {
    let url = format!(
        "{GITHUB_API}/repos/{}/{}/stats/contributors",
        repo.owner, repo.name
    );
    let response = github_get(http, repo, url).send().await?;
    // 202 means GitHub is still computing the stats
    if response.status() == reqwest::StatusCode::ACCEPTED {
        return Ok(Vec::new());
    }
    if !response.status().is_success() {
        return Err(LeaderboardError::Status(response.status().as_u16()));
    }
    Ok(response.json().await?)
}

/// Builds the leaderboard from GitHub
///
/// Missing commit stats are logged and leave `contributions` at 0.
pub async fn fetch_leaderboard(
    http: &reqwest::Client,
    repo: &GithubRepo,
) -> Result<Leaderboard, LeaderboardError> {
    let prs = fetch_closed_pull_requests(http, repo).await?;
    let mut contributors = aggregate(&prs);

    tracing::info!(
        total_prs = prs.len(),
        contributors = contributors.len(),
        "Scored pull requests"
    );

    match fetch_commit_stats(http, repo).await {
        Ok(stats) => apply_commit_counts(&mut contributors, &stats),
        Err(e) => tracing::warn!(error = %e, "Failed to fetch commit stats"),
    }

    Ok(Leaderboard::new(contributors))
}

/// Leaderboard kept in memory for a fixed time
///
/// At most one refresh runs at a time. A failed refresh falls back to the
/// expired entry when there is one.
#[derive(Debug)]
pub struct LeaderboardCache {
    ttl: Duration,
    entry: RwLock<Option<(Instant, Leaderboard)>>,
    refresh: Mutex<()>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Cached leaderboard if still fresh
    pub async fn get(&self) -> Option<Leaderboard> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|(at, _)| at.elapsed() < self.ttl)
            .map(|(_, board)| board.clone())
    }

    pub async fn put(&self, board: Leaderboard) {
        *self.entry.write().await = Some((Instant::now(), board));
    }

    async fn stale(&self) -> Option<Leaderboard> {
        self.entry.read().await.as_ref().map(|(_, board)| board.clone())
    }

    /// Cached value, or a fresh fetch from GitHub that is then cached
    pub async fn get_or_fetch(
        &self,
        http: &reqwest::Client,
        repo: &GithubRepo,
    ) -> Result<Leaderboard, LeaderboardError> {
        self.get_or_refresh(|| fetch_leaderboard(http, repo)).await
    }

    /// Cached value, or the result of `fetch`
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<Leaderboard, LeaderboardError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Leaderboard, LeaderboardError>>,
    {
        if let Some(board) = self.get().await {
            return Ok(board);
        }

        let _refreshing = self.refresh.lock().await;

        // filled by whoever held the lock before us
        if let Some(board) = self.get().await {
            return Ok(board);
        }

        match fetch().await {
            Ok(board) => {
                self.put(board.clone()).await;
                Ok(board)
            }
            Err(e) => match self.stale().await {
                Some(board) => {
                    tracing::warn!(error = %e, "Leaderboard refresh failed; serving expired entry");
                    Ok(board)
                }
                None => Err(e),
            },
        }
    }
}
