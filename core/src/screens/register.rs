use super::{action_failed, InFlight, Navigation, Notice, ScreenScope};
use crate::api::ApiClient;
use crate::error::Result;
use crate::types::NewUser;

/// Account creation form. A successful sign-up logs the user in.
pub struct RegisterScreen {
    api: ApiClient,
    scope: ScreenScope,
    pub username: String,
    pub email: String,
    pub password: String,
    pub submitting: bool,
    pub notice: Option<Notice>,
}

impl RegisterScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            scope: ScreenScope::new(),
            username: String::new(),
            email: String::new(),
            password: String::new(),
            submitting: false,
            notice: None,
        }
    }

    pub async fn submit(&mut self) -> Result<Navigation> {
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            self.notice = Some(Notice::error("All fields are required!"));
            return Ok(Navigation::Stay);
        }

        let user = NewUser {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        };
        let outcome = {
            let _in_flight = InFlight::start(&mut self.submitting);
            self.api.sign_up(&user, &self.scope.action_token()).await
        };

        match outcome {
            Ok(_) => {
                self.password.clear();
                self.notice = Some(Notice::success("Registration successful!"));
                Ok(Navigation::Home)
            }
            Err(e) => action_failed(
                &mut self.notice,
                "Registration failed. Please try again.",
                e,
            ),
        }
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}
