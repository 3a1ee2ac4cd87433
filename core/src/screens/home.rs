use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{redirect_for, FetchState, Navigation, ScreenScope};
use crate::api::ApiClient;
use crate::types::Community;

/// Community directory, the landing screen after login.
pub struct HomeScreen {
    api: ApiClient,
    scope: ScreenScope,
    pub communities: FetchState<Vec<Community>>,
}

impl HomeScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            scope: ScreenScope::new(),
            communities: FetchState::Loading,
        }
    }

    pub async fn load(&mut self) -> Navigation {
        let ticket = self.scope.begin();
        self.communities = FetchState::Loading;
        let result = self.api.list_communities(ticket.token()).await;
        if self.scope.discards(&ticket, &result) {
            return Navigation::Stay;
        }
        let navigation = redirect_for(&result);
        self.communities = FetchState::from_collection(result);
        debug!(state = self.communities.phase(), "communities settled");
        navigation
    }

    pub fn open_community(&self, community_id: &str) -> Navigation {
        Navigation::CommunityPosts(community_id.to_string())
    }

    /// Profile of the logged-in user, or login when no user id is stored.
    pub fn open_profile(&self) -> Navigation {
        match self.api.current_user_id() {
            Ok(id) => Navigation::User(id),
            Err(e) => {
                debug!(error = %e, "no user id for profile");
                Navigation::Login
            }
        }
    }

    /// Token that unmounts this screen when cancelled, usable from another task.
    pub fn mount_handle(&self) -> CancellationToken {
        self.scope.handle()
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{anonymous_api, documents, signed_in_api};

    #[tokio::test]
    async fn unmount_during_load_leaves_state_untouched() {
        let (api, transport, _session) = signed_in_api();
        transport.stall();
        let mut screen = HomeScreen::new(api);
        let handle = screen.mount_handle();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.cancel();
        });

        assert_eq!(screen.load().await, Navigation::Stay);
        assert!(screen.communities.is_loading());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn ready_when_communities_exist() {
        let (api, transport, _session) = signed_in_api();
        transport.respond(
            200,
            documents(vec![json!({ "_id": "c1", "name": "rust", "description": "" })]),
        );
        let mut screen = HomeScreen::new(api);

        assert_eq!(screen.load().await, Navigation::Stay);
        let communities = screen.communities.items();
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].description_or_placeholder(), "No description available");
    }

    #[tokio::test]
    async fn empty_and_error_phases() {
        let (api, transport, _session) = signed_in_api();
        transport.respond(200, documents(vec![]));
        transport.respond(500, json!({ "message": "down" }));
        let mut screen = HomeScreen::new(api);

        screen.load().await;
        assert_eq!(screen.communities, FetchState::Empty);

        screen.load().await;
        assert!(matches!(screen.communities, FetchState::Error(_)));
    }

    #[tokio::test]
    async fn malformed_envelope_is_an_error() {
        let (api, transport, _session) = signed_in_api();
        transport.respond(200, json!({ "data": [] }));
        let mut screen = HomeScreen::new(api);

        screen.load().await;
        assert!(matches!(&screen.communities, FetchState::Error(msg) if msg.starts_with("malformed")));
    }

    #[tokio::test]
    async fn missing_session_redirects() {
        let (api, transport, _session) = anonymous_api();
        let mut screen = HomeScreen::new(api);

        assert_eq!(screen.load().await, Navigation::Login);
        assert_eq!(screen.open_profile(), Navigation::Login);
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn profile_uses_stored_user_id() {
        let (api, _transport, _session) = signed_in_api();
        let screen = HomeScreen::new(api);
        assert_eq!(screen.open_profile(), Navigation::User("u1".to_string()));
        assert_eq!(
            screen.open_community("c1"),
            Navigation::CommunityPosts("c1".to_string())
        );
    }
}
