//! Shared idea board.

use super::CollectionApi;
use crate::errors::StoreError;
use crate::models::{new_id, Idea, NewIdea};

impl CollectionApi {
    /// Post an idea authored by the logged-in user.
    pub async fn share_idea(&self, request: NewIdea) -> Result<Idea, StoreError> {
        let author = self.require_current_user().await?;

        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Validation("Idea title is required".to_string()));
        }

        self.append_record(Idea {
            id: new_id(),
            title,
            description: request.description,
            author: author.username,
            date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            tags: request.tags,
            likes: 0,
            comments: 0,
        })
        .await
    }

    pub async fn like_idea(&self, idea_id: &str) -> Result<Idea, StoreError> {
        self.require_current_user().await?;
        self.update_record::<Idea, _>(idea_id, |i| {
            let mut i = i.clone();
            i.likes = i.likes.saturating_add(1);
            Ok(i)
        })
        .await
    }

    pub async fn comment_on_idea(&self, idea_id: &str) -> Result<Idea, StoreError> {
        self.require_current_user().await?;
        self.update_record::<Idea, _>(idea_id, |i| {
            let mut i = i.clone();
            i.comments = i.comments.saturating_add(1);
            Ok(i)
        })
        .await
    }

    /// Most liked ideas first.
    pub async fn popular_ideas(&self, limit: usize) -> Result<Vec<Idea>, StoreError> {
        let mut ideas = self.list::<Idea>().await?;
        ideas.sort_by(|a, b| b.likes.cmp(&a.likes));
        ideas.truncate(limit);
        Ok(ideas)
    }
}
