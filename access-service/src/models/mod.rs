pub mod access_log;
pub mod code;
pub mod session;

pub use access_log::NewAccessLog;
pub use code::Code;
pub use session::{ClientInfo, SessionIdentity};
