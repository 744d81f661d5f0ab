pub mod codes;
pub mod session;
pub mod store;
pub mod tokens;

pub use codes::{ActivatedSession, CodeLifecycle};
pub use session::{SessionStatus, SessionValidator};
pub use store::CodeStore;
pub use tokens::TokenIssuer;
