use validator::{ValidationError, ValidationErrors};

/// Flattens field-level validation messages into a single `; `-separated string.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Accepts Discord snowflake ids: 17 to 20 ASCII digits.
pub fn validate_snowflake(id: &str) -> Result<(), ValidationError> {
    let ok = (17..=20).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("snowflake").with_message("discord_id must be a Discord user id".into()))
    }
}
