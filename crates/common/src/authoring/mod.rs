//! Authoring service client
//!
//! Read-only port onto the authoring service that owns stories, chapters,
//! scenes, beats, and prose blocks. Ingestion fetches source entities through
//! this trait; [`MockAuthoringClient`] backs the tests.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Uuid,
    pub story_id: Uuid,
    pub number: i32,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: Uuid,
    pub story_id: Uuid,
    /// Scenes can exist outside any chapter
    pub chapter_id: Option<Uuid>,
    pub number: i32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    pub id: Uuid,
    pub scene_id: Uuid,
    pub number: i32,
    pub beat_type: String,
    pub intent: String,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProseBlock {
    pub id: Uuid,
    pub chapter_id: Option<Uuid>,
    pub number: i32,
    /// text, image, video, audio, embed, link
    pub block_type: String,
    pub content: String,
}

impl ProseBlock {
    pub fn is_text(&self) -> bool {
        self.block_type == "text"
    }
}

/// Read-only client onto the authoring service
#[async_trait]
pub trait AuthoringClient: Send + Sync {
    async fn get_story(&self, id: Uuid) -> Result<Story>;
    async fn list_chapters_by_story(&self, story_id: Uuid) -> Result<Vec<Chapter>>;
    async fn get_chapter(&self, id: Uuid) -> Result<Chapter>;
    async fn list_prose_blocks_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<ProseBlock>>;
    async fn get_scene(&self, id: Uuid) -> Result<Scene>;
    async fn list_beats_by_scene(&self, scene_id: Uuid) -> Result<Vec<Beat>>;
    async fn get_beat(&self, id: Uuid) -> Result<Beat>;
    async fn get_prose_block(&self, id: Uuid) -> Result<ProseBlock>;
}

/// HTTP adapter against the authoring service REST API
pub struct HttpAuthoringClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthoringClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        resource_type: &str,
        id: Uuid,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch {
                message: format!("GET {path} failed: {e}"),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(AppError::UpstreamFetch {
                message: format!("GET {path} returned {}", response.status()),
            });
        }

        response.json().await.map_err(|e| AppError::UpstreamFetch {
            message: format!("GET {path} body: {e}"),
        })
    }
}

#[async_trait]
impl AuthoringClient for HttpAuthoringClient {
    async fn get_story(&self, id: Uuid) -> Result<Story> {
        self.get_json(&format!("/api/v1/stories/{id}"), "story", id)
            .await
    }

    async fn list_chapters_by_story(&self, story_id: Uuid) -> Result<Vec<Chapter>> {
        self.get_json(
            &format!("/api/v1/stories/{story_id}/chapters"),
            "story",
            story_id,
        )
        .await
    }

    async fn get_chapter(&self, id: Uuid) -> Result<Chapter> {
        self.get_json(&format!("/api/v1/chapters/{id}"), "chapter", id)
            .await
    }

    async fn list_prose_blocks_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<ProseBlock>> {
        self.get_json(
            &format!("/api/v1/chapters/{chapter_id}/prose-blocks"),
            "chapter",
            chapter_id,
        )
        .await
    }

    async fn get_scene(&self, id: Uuid) -> Result<Scene> {
        self.get_json(&format!("/api/v1/scenes/{id}"), "scene", id)
            .await
    }

    async fn list_beats_by_scene(&self, scene_id: Uuid) -> Result<Vec<Beat>> {
        self.get_json(&format!("/api/v1/scenes/{scene_id}/beats"), "scene", scene_id)
            .await
    }

    async fn get_beat(&self, id: Uuid) -> Result<Beat> {
        self.get_json(&format!("/api/v1/beats/{id}"), "beat", id)
            .await
    }

    async fn get_prose_block(&self, id: Uuid) -> Result<ProseBlock> {
        self.get_json(&format!("/api/v1/prose-blocks/{id}"), "prose_block", id)
            .await
    }
}

/// In-memory fixture store implementing [`AuthoringClient`] for tests
#[derive(Default)]
pub struct MockAuthoringClient {
    inner: Mutex<MockData>,
}

#[derive(Default)]
struct MockData {
    stories: HashMap<Uuid, Story>,
    chapters: HashMap<Uuid, Chapter>,
    scenes: HashMap<Uuid, Scene>,
    beats: HashMap<Uuid, Beat>,
    prose_blocks: HashMap<Uuid, ProseBlock>,
}

impl MockAuthoringClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_story(&self, story: Story) {
        self.inner.lock().unwrap().stories.insert(story.id, story);
    }

    pub fn put_chapter(&self, chapter: Chapter) {
        self.inner
            .lock()
            .unwrap()
            .chapters
            .insert(chapter.id, chapter);
    }

    pub fn put_scene(&self, scene: Scene) {
        self.inner.lock().unwrap().scenes.insert(scene.id, scene);
    }

    pub fn put_beat(&self, beat: Beat) {
        self.inner.lock().unwrap().beats.insert(beat.id, beat);
    }

    pub fn put_prose_block(&self, block: ProseBlock) {
        self.inner
            .lock()
            .unwrap()
            .prose_blocks
            .insert(block.id, block);
    }

    pub fn remove_chapter(&self, id: Uuid) {
        self.inner.lock().unwrap().chapters.remove(&id);
    }
}

fn not_found<T>(resource_type: &str, id: Uuid) -> Result<T> {
    Err(AppError::NotFound {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    })
}

#[async_trait]
impl AuthoringClient for MockAuthoringClient {
    async fn get_story(&self, id: Uuid) -> Result<Story> {
        match self.inner.lock().unwrap().stories.get(&id) {
            Some(s) => Ok(s.clone()),
            None => not_found("story", id),
        }
    }

    async fn list_chapters_by_story(&self, story_id: Uuid) -> Result<Vec<Chapter>> {
        let mut chapters: Vec<Chapter> = self
            .inner
            .lock()
            .unwrap()
            .chapters
            .values()
            .filter(|c| c.story_id == story_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }

    async fn get_chapter(&self, id: Uuid) -> Result<Chapter> {
        match self.inner.lock().unwrap().chapters.get(&id) {
            Some(c) => Ok(c.clone()),
            None => not_found("chapter", id),
        }
    }

    async fn list_prose_blocks_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<ProseBlock>> {
        let mut blocks: Vec<ProseBlock> = self
            .inner
            .lock()
            .unwrap()
            .prose_blocks
            .values()
            .filter(|b| b.chapter_id == Some(chapter_id))
            .cloned()
            .collect();
        blocks.sort_by_key(|b| b.number);
        Ok(blocks)
    }

    async fn get_scene(&self, id: Uuid) -> Result<Scene> {
        match self.inner.lock().unwrap().scenes.get(&id) {
            Some(s) => Ok(s.clone()),
            None => not_found("scene", id),
        }
    }

    async fn list_beats_by_scene(&self, scene_id: Uuid) -> Result<Vec<Beat>> {
        let mut beats: Vec<Beat> = self
            .inner
            .lock()
            .unwrap()
            .beats
            .values()
            .filter(|b| b.scene_id == scene_id)
            .cloned()
            .collect();
        beats.sort_by_key(|b| b.number);
        Ok(beats)
    }

    async fn get_beat(&self, id: Uuid) -> Result<Beat> {
        match self.inner.lock().unwrap().beats.get(&id) {
            Some(b) => Ok(b.clone()),
            None => not_found("beat", id),
        }
    }

    async fn get_prose_block(&self, id: Uuid) -> Result<ProseBlock> {
        match self.inner.lock().unwrap().prose_blocks.get(&id) {
            Some(b) => Ok(b.clone()),
            None => not_found("prose_block", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_not_found() {
        let client = MockAuthoringClient::new();
        let err = client.get_chapter(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mock_lists_ordered_by_number() {
        let client = MockAuthoringClient::new();
        let story_id = Uuid::new_v4();

        for number in [3, 1, 2] {
            client.put_chapter(Chapter {
                id: Uuid::new_v4(),
                story_id,
                number,
                title: format!("Chapter {number}"),
                status: "draft".into(),
            });
        }

        let chapters = client.list_chapters_by_story(story_id).await.unwrap();
        let numbers: Vec<i32> = chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_mock_filters_blocks_by_chapter() {
        let client = MockAuthoringClient::new();
        let chapter_id = Uuid::new_v4();

        client.put_prose_block(ProseBlock {
            id: Uuid::new_v4(),
            chapter_id: Some(chapter_id),
            number: 0,
            block_type: "text".into(),
            content: "Hello.".into(),
        });
        client.put_prose_block(ProseBlock {
            id: Uuid::new_v4(),
            chapter_id: None,
            number: 0,
            block_type: "text".into(),
            content: "Orphan.".into(),
        });

        let blocks = client.list_prose_blocks_by_chapter(chapter_id).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "Hello.");
    }
}
