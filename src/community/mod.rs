pub mod repository;
pub mod service;

pub use repository::{CommunityStore, DynCommunityStore, LikeToggle, SqliteCommunityStore};
pub use service::SocialService;
