//! Authentication and authorization module

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod verifier;

pub use jwt::{Claims, IssuedToken, JwtService, TokenError};
pub use middleware::{
    authenticate, extract_token, get_auth_context, jwt_auth_middleware, require_admin_middleware,
    Access, AuthContext,
};
pub use password::PasswordHasher;
pub use verifier::{CredentialVerifier, Credentials, PasswordCredentialVerifier};
