use async_trait::async_trait;
use backend::CartApi;
use cart::{CartError, CartStore};
use common::UserId;
use domain::Cart;
use storage::StateStore;

/// What checkout needs from the cart.
#[async_trait]
pub trait CartAccess: Send + Sync {
    /// Current cart contents.
    async fn snapshot(&self) -> Cart;

    /// The signed-in user, if any.
    async fn user(&self) -> Option<UserId>;

    /// Empties the cart once the order is placed.
    async fn clear(&self) -> Result<(), CartError>;
}

#[async_trait]
impl<S, A> CartAccess for CartStore<S, A>
where
    S: StateStore + 'static,
    A: CartApi + 'static,
{
    async fn snapshot(&self) -> Cart {
        self.cart().await
    }

    async fn user(&self) -> Option<UserId> {
        CartStore::user(self).await
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.clear_cart().await
    }
}
