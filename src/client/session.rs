use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::RwLock;
use zeroize::Zeroizing;

use super::errors::ClientError;

/// Bearer credentials of the signed-in operator.
///
/// An expired session wipes the token and raises `login_required`, which the
/// admin shell turns into a redirect to its login screen.
#[derive(Default)]
pub struct AdminSession {
    token: RwLock<Option<Zeroizing<String>>>,
    login_required: AtomicBool,
}

impl AdminSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(token);
        session
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        *self.token.write() = Some(Zeroizing::new(token.into()));
        self.login_required.store(false, Ordering::SeqCst);
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| t.to_string())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn sign_out(&self) {
        self.token.write().take();
    }

    pub fn login_required(&self) -> bool {
        self.login_required.load(Ordering::SeqCst)
    }

    /// Reacts to a failed request; returns true when the session was ended.
    pub fn observe(&self, err: &ClientError) -> bool {
        if !matches!(err, ClientError::AuthExpired) {
            return false;
        }
        self.sign_out();
        self.login_required.store(true, Ordering::SeqCst);
        tracing::warn!("Admin session expired, login required");
        true
    }
}

impl fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSession")
            .field("token", &self.is_authenticated().then_some("[REDACTED]"))
            .field("login_required", &self.login_required())
            .finish()
    }
}
