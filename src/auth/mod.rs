mod codec;
mod middleware;
mod password;
mod session;

pub use codec::{Claims, TokenCodec, TokenKind};
pub use middleware::{AuthError, RequireIdentity, cookie_value};
pub use password::Hasher;
pub use session::{NewIdentity, RotatedPair, SessionManager, SessionPair};
