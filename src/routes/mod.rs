/// Router Module Index
///
/// One router per resource family. Access control is not applied at this level: every
/// handler resolves the caller through the `AuthUser` extractor (when it needs one) and asks
/// the capability policy in `permissions` for a decision. `create_router` nests all of these
/// under `/api/v1`.

/// Signup and token exchange. Open to anonymous clients.
pub mod auth;

/// Categories and genres.
pub mod catalog;

/// Titles plus their nested reviews and comments.
pub mod titles;

/// User administration and the caller's own profile.
pub mod users;
