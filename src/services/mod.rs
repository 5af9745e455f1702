pub mod anime;
pub mod comparison;
pub mod friends;
pub mod providers;
pub mod rate_limit;
pub mod users;

pub use anime::AnimeService;
pub use friends::FriendService;
pub use providers::{AnimeProvider, JikanProvider};
pub use rate_limit::SearchThrottle;
pub use users::UserService;
