//! Attendance estimation: capacity cleaning, monthly nights estimation, and the
//! allocation of department nights to communes and employment-zone clusters.

pub mod allocator;
pub mod capacity;
pub mod error;
pub mod nights;

use crate::attendance::error::AttendanceError;

/// Returns the code after the last `-` of an INSEE geography code
/// (`"2025-COM-01004"` gives `"01004"`, `"2025-DEP-2A"` gives `"2A"`).
pub(crate) fn trailing_code(geography_code: &str) -> Result<String, AttendanceError> {
    let code = geography_code.rsplit('-').next().unwrap_or_default().trim();
    if code.is_empty() {
        return Err(AttendanceError::MalformedGeography(
            geography_code.to_string(),
        ));
    }
    Ok(code.to_string())
}

/// Department of a commune: the first two characters of its code.
pub(crate) fn department_of(commune_id: &str) -> Result<String, AttendanceError> {
    match commune_id.get(..2) {
        Some(prefix) if commune_id.len() > 2 => Ok(prefix.to_string()),
        _ => Err(AttendanceError::MalformedGeography(commune_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_code_takes_text_after_last_separator() {
        assert_eq!(trailing_code("2025-COM-01004").unwrap(), "01004");
        assert_eq!(trailing_code("2025-DEP-2A").unwrap(), "2A");
        assert_eq!(trailing_code("75056").unwrap(), "75056");
        assert!(trailing_code("2025-COM-").is_err());
    }

    #[test]
    fn department_is_two_character_prefix() {
        assert_eq!(department_of("01004").unwrap(), "01");
        assert_eq!(department_of("2B033").unwrap(), "2B");
        assert!(department_of("01").is_err());
    }
}
