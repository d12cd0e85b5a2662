mod acl;
mod session_auth;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use session_auth::{bearer_token, AccessToken, SessionAuthFactory, SessionAuthService};
