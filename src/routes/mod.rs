/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.

/// Routes accessible to all callers. Data-serving handlers here must go
/// through the approved-only listing projection for anonymous requests.
pub mod public;

/// Routes protected by the `AuthSession` extractor middleware; handlers and
/// services additionally authorize the moderator role.
pub mod moderator;
