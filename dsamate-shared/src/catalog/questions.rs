/// Practice-sheet question catalog
///
/// Question ids are only unique within their topic.
///
/// # Example
///
/// ```
/// use dsamate_shared::catalog::questions::{QuestionCatalog, QuestionFilter};
///
/// let catalog = QuestionCatalog::bundled().unwrap();
/// let easy = catalog.filter(&QuestionFilter {
///     difficulty: Some("easy".to_string()),
///     ..Default::default()
/// });
/// assert!(easy.iter().flat_map(|t| &t.questions).all(|q| q.difficulty.as_str() == "easy"));
/// ```

use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::gamification::Difficulty;

const BUNDLED_QUESTIONS: &str = include_str!("../../../data/questions.json");

/// External practice links; only the platforms a question is on are set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leetcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gfg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hackerrank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ninja: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl QuestionLinks {
    /// First available link, preferring the big judges
    pub fn primary(&self) -> Option<&str> {
        [
            &self.leetcode,
            &self.gfg,
            &self.hackerrank,
            &self.spoj,
            &self.ninja,
            &self.code,
            &self.custom,
        ]
        .into_iter()
        .find_map(|link| link.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub links: QuestionLinks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_link: Option<String>,
    #[serde(default)]
    pub companies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: u32,
    pub name: String,
    pub questions: Vec<Question>,
}

/// Query-string filter for `GET /api/questions`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFilter {
    pub topic_id: Option<u32>,
    pub difficulty: Option<String>,
    pub company: Option<String>,
}

/// Parsed practice sheet
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    topics: Vec<Topic>,
}

impl QuestionCatalog {
    /// Parses the catalog compiled into the binary
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_QUESTIONS)
    }

    /// Parses a catalog from JSON text
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let topics: Vec<Topic> = serde_json::from_str(json).map_err(|source| CatalogError::Parse {
            name: "questions",
            source,
        })?;

        if topics.iter().all(|t| t.questions.is_empty()) {
            return Err(CatalogError::Invalid {
                name: "questions",
                reason: "no questions".to_string(),
            });
        }

        Ok(Self { topics })
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, id: u32) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// All questions in sheet order
    pub fn all_questions(&self) -> Vec<&Question> {
        self.topics.iter().flat_map(|t| &t.questions).collect()
    }

    /// Topics (one when `topic_id` is set) with questions narrowed by
    /// difficulty and company; topics are kept even when no question matches
    pub fn filter(&self, filter: &QuestionFilter) -> Vec<Topic> {
        let difficulty = filter.difficulty.as_deref().filter(|d| !d.is_empty());
        let company = filter.company.as_deref().filter(|c| !c.is_empty());

        self.topics
            .iter()
            .filter(|t| filter.topic_id.map_or(true, |id| t.id == id))
            .map(|topic| Topic {
                id: topic.id,
                name: topic.name.clone(),
                questions: topic
                    .questions
                    .iter()
                    .filter(|q| difficulty.map_or(true, |d| q.difficulty.as_str() == d))
                    .filter(|q| company.map_or(true, |c| q.companies.iter().any(|qc| qc == c)))
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = QuestionCatalog::bundled().unwrap();
        assert_eq!(catalog.topics().len(), 19);
        assert_eq!(catalog.all_questions().len(), 104);
        assert_eq!(catalog.topic(1).unwrap().name, "Basics of Programming");
    }

    #[test]
    fn test_filter_by_topic_and_difficulty() {
        let catalog = QuestionCatalog::bundled().unwrap();
        let topics = catalog.filter(&QuestionFilter {
            topic_id: Some(1),
            difficulty: Some("easy".to_string()),
            company: None,
        });
        assert_eq!(topics.len(), 1);
        assert!(!topics[0].questions.is_empty());
        assert!(topics[0]
            .questions
            .iter()
            .all(|q| q.difficulty == Difficulty::Easy));
    }

    #[test]
    fn test_filter_unknown_topic() {
        let catalog = QuestionCatalog::bundled().unwrap();
        assert!(catalog
            .filter(&QuestionFilter {
                topic_id: Some(999),
                ..Default::default()
            })
            .is_empty());
    }

    #[test]
    fn test_filter_by_company() {
        let json = r#"[{"id":1,"name":"Arrays","questions":[
            {"id":1,"title":"Two Sum","difficulty":"easy","links":{"leetcode":"https://leetcode.com/problems/two-sum/"},"companies":["Google"]},
            {"id":2,"title":"3Sum","difficulty":"medium","links":{},"companies":[]}
        ]}]"#;
        let catalog = QuestionCatalog::from_json(json).unwrap();
        let topics = catalog.filter(&QuestionFilter {
            company: Some("Google".to_string()),
            ..Default::default()
        });
        assert_eq!(topics[0].questions.len(), 1);
        assert_eq!(topics[0].questions[0].title, "Two Sum");
        assert_eq!(
            topics[0].questions[0].links.primary(),
            Some("https://leetcode.com/problems/two-sum/")
        );
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(
            QuestionCatalog::from_json("[]"),
            Err(CatalogError::Invalid { .. })
        ));
        assert!(matches!(
            QuestionCatalog::from_json("{"),
            Err(CatalogError::Parse { .. })
        ));
    }
}
