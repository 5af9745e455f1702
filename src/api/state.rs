use std::sync::Arc;

use crate::{
    api::auth::JwtVerifier,
    db::{AnimeRepository, FriendshipRepository, UserRepository},
    services::{AnimeProvider, AnimeService, FriendService, SearchThrottle, UserService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub animes: Arc<AnimeService>,
    pub friends: Arc<FriendService>,
    pub users: Arc<UserService>,
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    /// Wires every service onto one store that backs all three repositories
    pub fn new<S>(
        store: Arc<S>,
        provider: Arc<dyn AnimeProvider>,
        throttle: Arc<SearchThrottle>,
        metadata_ttl: chrono::Duration,
        jwt: JwtVerifier,
    ) -> Self
    where
        S: AnimeRepository + FriendshipRepository + UserRepository + 'static,
    {
        Self {
            animes: Arc::new(AnimeService::new(
                store.clone(),
                provider,
                throttle,
                metadata_ttl,
            )),
            friends: Arc::new(FriendService::new(
                store.clone(),
                store.clone(),
                store.clone(),
            )),
            users: Arc::new(UserService::new(store.clone(), store.clone(), store)),
            jwt: Arc::new(jwt),
        }
    }
}
