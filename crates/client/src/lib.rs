pub mod collections;
pub mod identity;
pub mod logging;
pub mod manager;
pub mod read_model;
pub mod session;

pub use collections::Collections;
pub use identity::{
    establish_session, AuthError, AuthSession, AuthState, IdentityProvider, LocalIdentityProvider,
};
pub use logging::init_logging;
pub use manager::{LifecycleManager, AWARD_CONFIRMATION_PHRASE};
pub use read_model::ReadModel;
pub use session::{ChatChannel, ClientSession};
