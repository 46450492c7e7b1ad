/// Router Module Index
///
/// Organizes the application's routing logic into role-segregated modules,
/// enforcing a Defense-in-Depth strategy. Access control is applied
/// explicitly at the module level (via Axum layers), preventing accidental
/// exposure of protected endpoints.
///
/// The three modules map directly to the defined access roles.

/// Routes accessible to all clients (health, registration, login).
pub mod public;

/// Routes requiring a valid token with the `Reader` or `Writer` role.
pub mod reader;

/// Routes requiring a valid token with the `Writer` role.
pub mod writer;
