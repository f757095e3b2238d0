//! Authorization rules for community content.
//!
//! Every operation starts from the account id carried by the caller's token
//! and resolves it to a profile. Mutations of a post are allowed only for the
//! profile that created it.

use crate::community::repository::{DynCommunityStore, LikeToggle};
use crate::db::models::{AccountId, CommentId, CommentView, FeedPost, PostId, Profile, ProfileId};
use crate::error::{AppError, AppResult};
use crate::profiles::DynProfileStore;

pub struct SocialService {
    profiles: DynProfileStore,
    community: DynCommunityStore,
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".into())
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl SocialService {
    pub fn new(profiles: DynProfileStore, community: DynCommunityStore) -> Self {
        Self {
            profiles,
            community,
        }
    }

    /// The caller's profile, or `ProfileNotFound` for an account that
    /// registration left without one.
    pub async fn resolve_profile(&self, account: AccountId) -> AppResult<Profile> {
        self.profiles
            .find_by_account(account)
            .await?
            .ok_or(AppError::ProfileNotFound)
    }

    async fn viewer(&self, account: AccountId) -> AppResult<Option<ProfileId>> {
        Ok(self
            .profiles
            .find_by_account(account)
            .await?
            .map(|p| p.profile_id))
    }

    async fn require_post(&self, post: PostId) -> AppResult<ProfileId> {
        self.community
            .post_owner(post)
            .await?
            .ok_or_else(post_not_found)
    }

    async fn require_owner(&self, account: AccountId, post: PostId) -> AppResult<()> {
        let profile = self.resolve_profile(account).await?;
        let owner = self.require_post(post).await?;
        if owner != profile.profile_id {
            tracing::info!(
                "Profile {} denied mutation of post {} owned by {}",
                profile.profile_id,
                post,
                owner
            );
            return Err(AppError::Forbidden(
                "Not allowed to modify this post".into(),
            ));
        }
        Ok(())
    }

    pub async fn create_post(
        &self,
        account: AccountId,
        content: Option<&str>,
        image: Option<&str>,
    ) -> AppResult<PostId> {
        let profile = self.resolve_profile(account).await?;
        let content = trimmed(content);
        let image = trimmed(image);
        if content.is_none() && image.is_none() {
            return Err(AppError::InvalidInput(
                "Post needs content or an image".into(),
            ));
        }

        let post = self
            .community
            .create_post(profile.profile_id, content.unwrap_or_default(), image)
            .await?;
        tracing::debug!("Profile {} created post {}", profile.profile_id, post);
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        account: AccountId,
        post: PostId,
        content: Option<&str>,
    ) -> AppResult<()> {
        self.require_owner(account, post).await?;
        let content =
            trimmed(content).ok_or_else(|| AppError::InvalidInput("Content is required".into()))?;

        if !self.community.update_post_content(post, content).await? {
            return Err(post_not_found());
        }
        Ok(())
    }

    pub async fn delete_post(&self, account: AccountId, post: PostId) -> AppResult<()> {
        self.require_owner(account, post).await?;
        if !self.community.delete_post(post).await? {
            return Err(post_not_found());
        }
        tracing::debug!("Deleted post {}", post);
        Ok(())
    }

    pub async fn get_post(&self, account: AccountId, post: PostId) -> AppResult<FeedPost> {
        let viewer = self.viewer(account).await?;
        self.community
            .get_post(post, viewer)
            .await?
            .ok_or_else(post_not_found)
    }

    pub async fn add_comment(
        &self,
        account: AccountId,
        post: PostId,
        text: Option<&str>,
    ) -> AppResult<CommentId> {
        let profile = self.resolve_profile(account).await?;
        self.require_post(post).await?;
        let text =
            trimmed(text).ok_or_else(|| AppError::InvalidInput("Comment is required".into()))?;

        Ok(self
            .community
            .add_comment(post, profile.profile_id, text)
            .await?)
    }

    pub async fn list_comments(&self, post: PostId) -> AppResult<Vec<CommentView>> {
        self.require_post(post).await?;
        Ok(self.community.list_comments(post).await?)
    }

    pub async fn toggle_like(&self, account: AccountId, post: PostId) -> AppResult<LikeToggle> {
        let profile = self.resolve_profile(account).await?;
        self.require_post(post).await?;
        Ok(self.community.toggle_like(post, profile.profile_id).await?)
    }

    /// Newest first, with `liked_by_me` computed for the caller. A caller
    /// without a profile sees every post as not liked.
    pub async fn feed(&self, account: AccountId) -> AppResult<Vec<FeedPost>> {
        let viewer = self.viewer(account).await?;
        Ok(self.community.list_posts(viewer).await?)
    }
}
