use common::UserId;
use secrecy::SecretString;

/// Authentication state as seen by the cart.
///
/// `merged` is the one-shot login merge latch. It is only reset by
/// replacing the session (sign-out).
#[derive(Debug, Default)]
pub struct Session {
    pub user: Option<UserId>,
    pub credential: Option<SecretString>,
    pub merged: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Signed in with a credential the backend will accept.
    pub fn can_sync(&self) -> bool {
        self.user.is_some() && self.credential.is_some()
    }
}
