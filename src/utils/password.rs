use crate::error::{AppError, AppResult};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Password policy: 8-128 chars with upper, lower and digit.
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::ValidationError(
            "Parola trebuie să aibă între 8 și 128 de caractere".to_string(),
        ));
    }

    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_lowercase || !has_uppercase || !has_digit {
        return Err(AppError::ValidationError(
            "Parola trebuie să conțină litere mari, litere mici și cifre".to_string(),
        ));
    }

    Ok(())
}

pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    verify(password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_accepts_mixed_password() {
        assert!(validate_password("Parola123").is_ok());
    }

    #[test]
    fn policy_rejects_short_or_uniform() {
        assert!(validate_password("Ab1").is_err());
        assert!(validate_password("onlylowercase1").is_err());
        assert!(validate_password("ONLYUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
    }

    #[test]
    fn hash_verify_roundtrip() {
        let hashed = hash_password("Parola123").unwrap();
        assert!(verify_password("Parola123", &hashed).unwrap());
        assert!(!verify_password("AltaParola1", &hashed).unwrap());
    }
}
