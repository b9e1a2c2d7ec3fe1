/// Router Module Index
///
/// Routes are grouped by who may reach them. The route guard in front of the whole
/// router enforces the grouping; handlers still check what they need themselves.

/// Open to everyone: landing and policy pages, sign-in, registration, logout, health.
pub mod public;

/// `/dashboard/*`: any signed-in member.
pub mod member;

/// `/admin/*`: admins only.
pub mod admin;
