//! Streaks, solved counters and the badge table
//!
//! Everything here is pure: callers load a [`Progress`] row, apply an update
//! with an explicit `now`, persist it and then award whatever
//! [`eligible_badges`] reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::badge::Badge;
use crate::models::progress::{Progress, TopicProgress};

/// Questions needed to complete a topic when no total is recorded
pub const DEFAULT_TOPIC_TOTAL: i32 = 5;

/// Question difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses a difficulty name, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// One solve/un-solve event from the practice sheet
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub question_difficulty: Option<Difficulty>,
    pub question_id: Option<String>,
    pub is_solved: bool,
    pub topic_name: Option<String>,
    pub topic_completed: Option<String>,
}

/// Streak after a visit at `now`
///
/// Compares UTC calendar dates: the next day extends the streak, a gap
/// resets it to 1, the same day leaves it unchanged and a first visit
/// starts at 1.
pub fn next_streak(current: i32, last_visited: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i32 {
    let Some(last) = last_visited else {
        return 1;
    };

    let diff = (now.date_naive() - last.date_naive()).num_days();
    match diff {
        1 => current + 1,
        d if d > 1 => 1,
        // same day, or a clock that went backwards
        _ => current.max(1),
    }
}

fn counter_mut(progress: &mut Progress, difficulty: Difficulty) -> &mut i32 {
    match difficulty {
        Difficulty::Easy => &mut progress.easy_solved,
        Difficulty::Medium => &mut progress.medium_solved,
        Difficulty::Hard => &mut progress.hard_solved,
    }
}

fn apply_difficulty(progress: &mut Progress, update: &ProgressUpdate) {
    let Some(difficulty) = update.question_difficulty else {
        return;
    };

    match update.question_id.as_deref() {
        Some(id) => {
            let held = progress.solved_questions.iter().position(|q| q == id);
            match (update.is_solved, held) {
                (true, None) => {
                    *counter_mut(progress, difficulty) += 1;
                    progress.solved_questions.push(id.to_string());
                }
                (false, Some(index)) => {
                    let counter = counter_mut(progress, difficulty);
                    *counter = (*counter - 1).max(0);
                    progress.solved_questions.swap_remove(index);
                }
                _ => {}
            }
        }
        None => {
            let counter = counter_mut(progress, difficulty);
            *counter = if update.is_solved {
                *counter + 1
            } else {
                (*counter - 1).max(0)
            };
        }
    }
}

fn apply_topic(progress: &mut Progress, update: &ProgressUpdate) {
    let Some(topic_name) = update.topic_name.as_deref() else {
        return;
    };

    let topics = &mut progress.topics_progress.0;
    match topics.iter_mut().find(|t| t.topic_name == topic_name) {
        Some(topic) if update.is_solved => topic.solved_count += 1,
        Some(topic) => topic.solved_count = (topic.solved_count - 1).max(0),
        None if update.is_solved => topics.push(TopicProgress {
            topic_name: topic_name.to_string(),
            solved_count: 1,
            total_questions: DEFAULT_TOPIC_TOTAL,
            marked_for_revision: 0,
        }),
        None => {}
    }
}

fn complete_topics(progress: &mut Progress, update: &ProgressUpdate) {
    if let Some(name) = update.topic_completed.as_deref() {
        if !name.is_empty() && !progress.topics_completed.iter().any(|t| t == name) {
            progress.topics_completed.push(name.to_string());
        }
    }

    for topic in &progress.topics_progress.0 {
        let total = if topic.total_questions > 0 {
            topic.total_questions
        } else {
            DEFAULT_TOPIC_TOTAL
        };
        if topic.solved_count >= total
            && !progress.topics_completed.iter().any(|t| t == &topic.topic_name)
        {
            progress.topics_completed.push(topic.topic_name.clone());
        }
    }
}

/// Applies a practice-sheet event to `progress` in place
///
/// Order: streak, difficulty counters (idempotent per question id), totals,
/// per-topic counters, topic completion.
pub fn apply_progress_update(progress: &mut Progress, update: &ProgressUpdate, now: DateTime<Utc>) {
    progress.streak_count = next_streak(progress.streak_count, progress.last_visited, now);
    progress.last_visited = Some(now);

    apply_difficulty(progress, update);
    progress.total_solved = progress.easy_solved + progress.medium_solved + progress.hard_solved;

    apply_topic(progress, update);
    complete_topics(progress, update);
}

/// Every badge name the progress qualifies for, in award order
pub fn eligible_badges(progress: &Progress) -> Vec<String> {
    let mut names: Vec<String> = progress.topics_completed.clone();

    let thresholds = [
        ("Consistency_7", progress.streak_count >= 7),
        ("Consistency_14", progress.streak_count >= 14),
        ("Consistency_30", progress.streak_count >= 30),
        ("Hard_Hitter", progress.hard_solved >= 10),
        ("50_Questions_Done", progress.total_solved >= 50),
        ("Daily_Devotee", progress.streak_count >= 10),
    ];

    names.extend(
        thresholds
            .iter()
            .filter(|(_, earned)| *earned)
            .map(|(name, _)| name.to_string()),
    );
    names
}

/// Candidates not already held (and not repeated), stamped with `now`
pub fn new_badges(
    held: &[Badge],
    candidates: impl IntoIterator<Item = String>,
    now: DateTime<Utc>,
) -> Vec<Badge> {
    let mut fresh: Vec<Badge> = Vec::new();
    for name in candidates {
        if name.is_empty()
            || held.iter().any(|b| b.name == name)
            || fresh.iter().any(|b| b.name == name)
        {
            continue;
        }
        fresh.push(Badge {
            name,
            claimed_at: now,
        });
    }
    fresh
}
