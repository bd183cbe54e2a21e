use crate::models::VideoRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video {0} not found")]
    NotFound(Uuid),

    #[error("video store error: {0}")]
    Backend(String),
}

/// Metadata record store. Updates replace the whole record; there is no
/// compare-and-swap, so concurrent commits for one video are last-writer-wins.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create(&self, video: VideoRecord) -> Result<VideoRecord, StoreError>;

    async fn get(&self, id: Uuid) -> Result<VideoRecord, StoreError>;

    async fn update(&self, video: &VideoRecord) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryVideoStore {
    videos: RwLock<HashMap<Uuid, VideoRecord>>,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn create(&self, video: VideoRecord) -> Result<VideoRecord, StoreError> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.id) {
            return Err(StoreError::Backend(format!(
                "video {} already exists",
                video.id
            )));
        }
        videos.insert(video.id, video.clone());
        Ok(video)
    }

    async fn get(&self, id: Uuid) -> Result<VideoRecord, StoreError> {
        self.videos
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, video: &VideoRecord) -> Result<(), StoreError> {
        let mut videos = self.videos.write().await;
        match videos.get_mut(&video.id) {
            Some(existing) => {
                *existing = video.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(video.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_get_update() {
        let store = InMemoryVideoStore::new();
        let video = store
            .create(VideoRecord::new(Uuid::new_v4(), "boots", ""))
            .await
            .unwrap();

        let mut fetched = store.get(video.id).await.unwrap();
        assert_eq!(fetched, video);

        fetched.video_url = Some("https://example.com/landscape/x.mp4".to_string());
        store.update(&fetched).await.unwrap();
        assert_eq!(
            store.get(video.id).await.unwrap().video_url.as_deref(),
            Some("https://example.com/landscape/x.mp4")
        );
    }

    #[tokio::test]
    async fn missing_records() {
        let store = InMemoryVideoStore::new();
        let video = VideoRecord::new(Uuid::new_v4(), "ghost", "");

        assert!(matches!(
            store.get(video.id).await,
            Err(StoreError::NotFound(id)) if id == video.id
        ));
        assert!(matches!(
            store.update(&video).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemoryVideoStore::new();
        let video = VideoRecord::new(Uuid::new_v4(), "twice", "");
        store.create(video.clone()).await.unwrap();
        assert!(store.create(video).await.is_err());
    }
}
