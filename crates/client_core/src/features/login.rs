use shared::{
    domain::Session,
    error::{ErrorException, UiMessage},
};

use crate::{
    api::ReportsApi,
    controller::{Effects, Feature},
    error::catalogs::{PASSWORD_EMPTY, USERNAME_EMPTY},
    events_bus::{GlobalEvent, Route},
};

use super::{notify_unplaced, surface_failure};

const PASSWORD_MASK: char = '•';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginState {
    pub username: String,
    pub password: String,
    pub password_visible: bool,
    pub username_error: Option<UiMessage>,
    pub password_error: Option<UiMessage>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginUiEvent {
    UsernameChanged(String),
    PasswordChanged(String),
    ShowPasswordClicked,
    LoginClicked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginEvent {
    Ui(LoginUiEvent),
    LoginSucceeded(Session),
    LoginFailed(ErrorException),
}

impl From<LoginUiEvent> for LoginEvent {
    fn from(value: LoginUiEvent) -> Self {
        Self::Ui(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginUiState {
    pub username: String,
    pub password: String,
    pub password_visible: bool,
    pub username_error: Option<UiMessage>,
    pub password_error: Option<UiMessage>,
    pub loading: bool,
    pub login_enabled: bool,
}

pub struct LoginFeature {
    api: ReportsApi,
}

impl LoginFeature {
    pub fn new(api: ReportsApi) -> Self {
        Self { api }
    }
}

impl Feature for LoginFeature {
    type State = LoginState;
    type Event = LoginEvent;
    type UiEvent = LoginUiEvent;
    type UiState = LoginUiState;

    fn name(&self) -> &'static str {
        "login"
    }

    fn fold(
        &self,
        state: &LoginState,
        event: LoginEvent,
        effects: &mut Effects<LoginEvent>,
    ) -> LoginState {
        let mut next = state.clone();
        match event {
            LoginEvent::Ui(LoginUiEvent::UsernameChanged(username)) => {
                next.username = username;
                next.username_error = None;
            }
            LoginEvent::Ui(LoginUiEvent::PasswordChanged(password)) => {
                next.password = password;
                next.password_error = None;
            }
            LoginEvent::Ui(LoginUiEvent::ShowPasswordClicked) => {
                next.password_visible = !state.password_visible;
            }
            LoginEvent::Ui(LoginUiEvent::LoginClicked) => {
                if state.submitting {
                    return next;
                }
                next.submitting = true;
                let api = self.api.clone();
                let username = state.username.clone();
                let password = state.password.clone();
                effects.spawn(async move {
                    match api.login(&username, &password).await {
                        Ok(session) => LoginEvent::LoginSucceeded(session),
                        Err(error) => LoginEvent::LoginFailed(error),
                    }
                });
            }
            LoginEvent::LoginSucceeded(_) => {
                next.submitting = false;
                next.password.clear();
                effects.post_global(GlobalEvent::LoginCompleted);
                effects.navigate_to(Route::Reports);
            }
            LoginEvent::LoginFailed(error) => {
                next.submitting = false;
                for error in surface_failure(&error, effects) {
                    match error.code.as_str() {
                        USERNAME_EMPTY => next.username_error = Some(error.message),
                        PASSWORD_EMPTY => next.password_error = Some(error.message),
                        _ => notify_unplaced(error, effects),
                    }
                }
            }
        }
        next
    }

    fn map_to_ui_state(&self, state: &LoginState) -> LoginUiState {
        let password = if state.password_visible {
            state.password.clone()
        } else {
            std::iter::repeat(PASSWORD_MASK)
                .take(state.password.chars().count())
                .collect()
        };
        LoginUiState {
            username: state.username.clone(),
            password,
            password_visible: state.password_visible,
            username_error: state.username_error,
            password_error: state.password_error,
            loading: state.submitting,
            login_enabled: !state.submitting,
        }
    }
}
