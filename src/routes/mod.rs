/// Router Module Index
///
/// Splits the HTTP surface by access level. Access control is attached per module
/// (via Axum layers), so a route cannot be exposed without its guard by accident.

/// Routes open to every caller, signed in or not.
pub mod public;

/// Routes behind the admin gate.
pub mod admin;
