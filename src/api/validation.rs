use super::ApiError;

pub fn validate_user_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid user ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_package_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid package ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

/// 3 to 20 characters of `[A-Za-z0-9._]`; `.` and `_` may appear only
/// between alphanumerics and never next to each other.
pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let count = username.chars().count();
    if !(3..=20).contains(&count) {
        return Err(ApiError::validation(
            "Username must be between 3 and 20 characters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, dots, and underscores",
        ));
    }

    let is_separator = |c: char| c == '.' || c == '_';
    if username.starts_with(is_separator) || username.ends_with(is_separator) {
        return Err(ApiError::validation(
            "Username cannot start or end with a dot or underscore",
        ));
    }

    let mut chars = username.chars().peekable();
    while let Some(c) = chars.next() {
        if is_separator(c)
            && let Some(&next) = chars.peek()
            && is_separator(next)
        {
            return Err(ApiError::validation(
                "Username cannot contain consecutive dots or underscores",
            ));
        }
    }

    Ok(username)
}

/// 8 to 50 alphanumeric characters with at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    let count = password.chars().count();
    if !(8..=50).contains(&count) {
        return Err(ApiError::validation(
            "Password must be between 8 and 50 characters",
        ));
    }

    if !password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::validation(
            "Password can only contain letters and numbers",
        ));
    }

    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(ApiError::validation(
            "Password must contain at least one letter and one digit",
        ));
    }

    Ok(password)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(ApiError::validation("Invalid email address"));
    }

    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
        });
    if !valid {
        return Err(ApiError::validation("Invalid email address"));
    }

    Ok(email)
}
