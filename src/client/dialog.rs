use tracing::debug;

use super::notice::{self, Notice};
use crate::identity::IdentityProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
    Reset,
}

/// State of the credentials prompt.
///
/// Closing or completing it never resubmits the question that opened it.
#[derive(Debug, Clone)]
pub struct AuthDialog {
    mode: AuthMode,
    open: bool,
    pub email: String,
    pub password: String,
}

impl AuthDialog {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            open: true,
            email: String::new(),
            password: String::new(),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
        self.password.clear();
    }

    /// Run the action of the current mode.
    ///
    /// - sign-in success closes the dialog
    /// - sign-up success switches to sign-in, keeping the email
    /// - reset success clears the email
    ///
    /// Failures leave the dialog as it was.
    pub async fn submit<P: IdentityProvider>(&mut self, identity: &P) -> Notice {
        debug!(mode = ?self.mode, "auth dialog submit");
        match self.mode {
            AuthMode::SignIn => match identity.sign_in(&self.email, &self.password).await {
                Ok(_) => {
                    self.close();
                    Notice::success(notice::SIGNED_IN)
                }
                Err(e) => Notice::failure(notice::SIGN_IN_FAILED, &e),
            },
            AuthMode::SignUp => match identity.sign_up(&self.email, &self.password).await {
                Ok(_) => {
                    self.password.clear();
                    self.mode = AuthMode::SignIn;
                    Notice::success(notice::SIGNED_UP)
                }
                Err(e) => Notice::failure(notice::SIGN_UP_FAILED, &e),
            },
            AuthMode::Reset => match identity.reset_password(&self.email).await {
                Ok(()) => {
                    self.email.clear();
                    Notice::success(notice::RESET_SENT)
                }
                Err(e) => Notice::failure(notice::RESET_FAILED, &e),
            },
        }
    }
}

/// Sign out and describe the result.
pub async fn sign_out<P: IdentityProvider>(identity: &P) -> Notice {
    match identity.sign_out().await {
        Ok(()) => Notice::success(notice::SIGNED_OUT),
        Err(e) => Notice::failure(notice::SIGN_OUT_FAILED, &e),
    }
}
