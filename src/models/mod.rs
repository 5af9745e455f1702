//! Domain rows, provider DTOs and request inputs shared by services and routes.

pub mod anime;
pub mod friendship;
pub mod user;

pub use anime::{
    validate_rating, AddAnimeInput, Aired, AnimeImages, AnimeMetadata, ImageSet, JikanAnime,
    ListComparison, ListOptions, SortBy, SortOrder, Tag, UpdateAnimeInput, UserAnimeDetails,
    UserAnimeEntry, MAX_RATING, MIN_RATING,
};
pub use friendship::{
    FriendListItem, FriendWithStats, Friendship, FriendshipStatus, FriendshipStatusInfo,
};
pub use user::{round_one_decimal, PublicProfile, UpdateProfileInput, User, UserStats};
