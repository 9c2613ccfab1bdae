//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Authentication
// =============================================================================

/// Default token lifetime when no TTL is configured
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Minimum signing secret length (security requirement)
pub const MIN_AUTH_SECRET_LENGTH: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// Token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// =============================================================================
// Import
// =============================================================================

/// Separators accepted between skill tags in tabular imports
pub const SKILL_SEPARATORS: &[char] = &[';', ','];
