/// Learning-path curriculum
///
/// A roadmap is an ordered list of levels, each an ordered list of topics.
/// Topic ids are unique within a roadmap.

use serde::{Deserialize, Serialize};

use super::CatalogError;

const BUNDLED_ROADMAPS: &str = include_str!("../../../data/roadmaps.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapTopic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub estimated_hours: u32,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub related_questions: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapLevel {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub estimated_weeks: u32,
    pub topics: Vec<RoadmapTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub total_estimated_weeks: u32,
    pub levels: Vec<RoadmapLevel>,
}

impl Roadmap {
    /// Number of topics across all levels
    pub fn total_topics(&self) -> usize {
        self.levels.iter().map(|l| l.topics.len()).sum()
    }

    /// Level owning `topic_id`
    pub fn level_of(&self, topic_id: &str) -> Option<&RoadmapLevel> {
        self.levels
            .iter()
            .find(|l| l.topics.iter().any(|t| t.id == topic_id))
    }

    pub fn first_level(&self) -> Option<&RoadmapLevel> {
        self.levels.first()
    }
}

/// Parsed roadmap catalog
#[derive(Debug, Clone)]
pub struct RoadmapCatalog {
    roadmaps: Vec<Roadmap>,
}

impl RoadmapCatalog {
    /// Parses the catalog compiled into the binary
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_ROADMAPS)
    }

    /// Parses a catalog from JSON text
    ///
    /// Every roadmap must have at least one level and every level at least
    /// one topic.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let roadmaps: Vec<Roadmap> =
            serde_json::from_str(json).map_err(|source| CatalogError::Parse {
                name: "roadmaps",
                source,
            })?;

        for roadmap in &roadmaps {
            if roadmap.levels.is_empty() || roadmap.levels.iter().any(|l| l.topics.is_empty()) {
                return Err(CatalogError::Invalid {
                    name: "roadmaps",
                    reason: format!("roadmap {} has an empty level", roadmap.id),
                });
            }
        }

        Ok(Self { roadmaps })
    }

    pub fn all(&self) -> &[Roadmap] {
        &self.roadmaps
    }

    pub fn get(&self, id: &str) -> Option<&Roadmap> {
        self.roadmaps.iter().find(|r| r.id == id)
    }
}
