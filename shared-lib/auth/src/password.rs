//! Password hashing (bcrypt).

use error::AppError;

pub use bcrypt::DEFAULT_COST;

/// Hash a password with the default bcrypt cost.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

/// Hash a password with an explicit bcrypt cost (4..=31).
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(password, cost).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::Internal("password hashing failed".to_string())
    })
}

/// Check a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    bcrypt::verify(password, hashed_password).unwrap_or_else(|e| {
        tracing::warn!("Stored password hash is unreadable: {}", e);
        false
    })
}
