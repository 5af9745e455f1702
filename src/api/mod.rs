pub mod auth;
pub mod extract;
pub mod response;
pub mod state;

pub use auth::{AuthUser, Claims, JwtVerifier};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::{ApiMeta, ApiResponse};
pub use state::AppState;
