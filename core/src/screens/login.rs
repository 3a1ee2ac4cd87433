use tracing::debug;

use super::{action_failed, InFlight, Navigation, Notice, ScreenScope};
use crate::api::ApiClient;
use crate::error::Result;
use crate::types::Credentials;

/// Email/password sign-in form.
pub struct LoginScreen {
    api: ApiClient,
    scope: ScreenScope,
    pub email: String,
    pub password: String,
    pub submitting: bool,
    pub notice: Option<Notice>,
}

impl LoginScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            scope: ScreenScope::new(),
            email: String::new(),
            password: String::new(),
            submitting: false,
            notice: None,
        }
    }

    /// An existing session skips the form entirely.
    pub fn mount(&self) -> Navigation {
        if self.api.session().is_authenticated() {
            debug!("session present, skipping login");
            Navigation::Home
        } else {
            Navigation::Stay
        }
    }

    pub async fn submit(&mut self) -> Result<Navigation> {
        if self.email.is_empty() || self.password.is_empty() {
            self.notice = Some(Notice::error("Please enter both email and password."));
            return Ok(Navigation::Stay);
        }

        let credentials = Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        };
        let outcome = {
            let _in_flight = InFlight::start(&mut self.submitting);
            self.api.sign_in(&credentials, &self.scope.action_token()).await
        };

        match outcome {
            Ok(_) => {
                self.password.clear();
                self.notice = Some(Notice::success("Login successful!"));
                Ok(Navigation::Home)
            }
            // A rejected sign-in is a credentials problem, not a stale session.
            Err(e) if e.requires_login() => {
                self.notice = Some(Notice::error("Invalid credentials. Try again."));
                Ok(Navigation::Stay)
            }
            Err(e) => action_failed(&mut self.notice, "Invalid credentials. Try again.", e),
        }
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::screens::NoticeKind;
    use crate::session::{SessionKey, SessionStore};
    use crate::test_support::{anonymous_api, signed_in_api};

    #[test]
    fn mount_with_session_goes_home() {
        let (api, _transport, _session) = signed_in_api();
        assert_eq!(LoginScreen::new(api).mount(), Navigation::Home);

        let (api, _transport, _session) = anonymous_api();
        assert_eq!(LoginScreen::new(api).mount(), Navigation::Stay);
    }

    #[tokio::test]
    async fn blank_fields_never_reach_the_network() {
        let (api, transport, _session) = anonymous_api();
        let mut screen = LoginScreen::new(api);
        screen.email = "ann@example.com".to_string();

        assert_eq!(screen.submit().await.unwrap(), Navigation::Stay);
        assert_eq!(
            screen.notice,
            Some(Notice::error("Please enter both email and password."))
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn successful_login_stores_session_and_goes_home() {
        let (api, transport, session) = anonymous_api();
        transport.respond(
            200,
            json!({ "token": "tok", "data": { "user": { "_id": "u1", "username": "ann" } } }),
        );
        let mut screen = LoginScreen::new(api);
        screen.email = "ann@example.com".to_string();
        screen.password = "pw".to_string();

        assert_eq!(screen.submit().await.unwrap(), Navigation::Home);
        assert_eq!(screen.notice.as_ref().unwrap().kind, NoticeKind::Success);
        assert!(screen.password.is_empty());
        assert!(!screen.submitting);
        assert_eq!(session.require(SessionKey::UserId).unwrap(), "u1");
    }

    #[tokio::test]
    async fn rejected_credentials_stay_on_form() {
        let (api, transport, _session) = anonymous_api();
        transport.respond(401, json!({ "message": "nope" }));
        let mut screen = LoginScreen::new(api);
        screen.email = "ann@example.com".to_string();
        screen.password = "wrong".to_string();

        assert_eq!(screen.submit().await.unwrap(), Navigation::Stay);
        assert_eq!(screen.notice, Some(Notice::error("Invalid credentials. Try again.")));
    }
}
