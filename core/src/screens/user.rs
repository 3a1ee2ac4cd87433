use tracing::{debug, warn};

use super::{redirect_for, FetchState, Navigation, Notice, ScreenScope};
use crate::api::ApiClient;
use crate::error::{ApiError, Result};
use crate::types::User;

/// Profile of the logged-in user.
pub struct UserScreen {
    api: ApiClient,
    scope: ScreenScope,
    pub user: FetchState<User>,
    pub notice: Option<Notice>,
}

impl UserScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            scope: ScreenScope::new(),
            user: FetchState::Loading,
            notice: None,
        }
    }

    pub async fn load(&mut self) -> Navigation {
        let user_id = match self.api.current_user_id() {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "no user id for profile");
                self.notice = Some(Notice::error("User ID is missing!"));
                return Navigation::Login;
            }
        };

        let ticket = self.scope.begin();
        self.user = FetchState::Loading;
        let result = self.api.get_user(&user_id, ticket.token()).await;
        if self.scope.discards(&ticket, &result) {
            return Navigation::Stay;
        }
        let navigation = match &result {
            Err(ApiError::NotFound) => {
                self.notice = Some(Notice::error("User not found!"));
                Navigation::Login
            }
            other => redirect_for(other),
        };
        self.user = FetchState::from_entity(result);
        debug!(user_id = %user_id, state = self.user.phase(), "profile settled");
        navigation
    }

    /// Forget the session and return to login.
    pub fn logout(&mut self) -> Result<Navigation> {
        self.scope.unmount();
        if let Err(e) = self.api.sign_out() {
            warn!(error = %e, "failed to clear session");
            self.notice = Some(Notice::error("Could not log out."));
            return Err(e);
        }
        Ok(Navigation::Login)
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}
