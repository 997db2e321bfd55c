//! Physical table naming
//!
//! Derives the tenant-scoped physical table name from (project, logical
//! name). This is the sole tenant-isolation mechanism at the storage layer:
//! two projects never collide because the project segment cannot contain the
//! separator, so the first `_` in a physical name always delimits the
//! project.

use crate::{Error, Result};

/// Separator between the project and the logical table name
pub const SEPARATOR: char = '_';

/// Derive the physical table name for a (project, logical name) pair
///
/// Injective for distinct pairs: the project must not contain the separator,
/// so `{project}_{logical}` splits back unambiguously at the first `_`.
/// Logical names may contain `_` freely (e.g. `driver_stats`).
///
/// # Examples
///
/// ```
/// use featuregate_core::naming::physical_table_name;
///
/// let name = physical_table_name("demo", "driver_stats").unwrap();
/// assert_eq!(name, "demo_driver_stats");
/// ```
pub fn physical_table_name(project: &str, logical_name: &str) -> Result<String> {
    validate_project(project)?;
    validate_identifier(logical_name)?;
    Ok(format!("{project}{SEPARATOR}{logical_name}"))
}

/// Validate a project name
///
/// Projects must be non-empty, alphanumeric, must not lead with a digit,
/// and must not contain the separator.
pub fn validate_project(project: &str) -> Result<()> {
    if project.is_empty() {
        return Err(Error::validation("project name is empty"));
    }
    if project.contains(SEPARATOR) {
        return Err(Error::validation(format!(
            "project name '{project}' must not contain '{SEPARATOR}'"
        )));
    }
    if project.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "project name '{project}' must not start with a digit"
        )));
    }
    if !project.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::validation(format!(
            "project name '{project}' contains characters outside [a-zA-Z0-9]"
        )));
    }
    Ok(())
}

/// Validate a table identifier
///
/// Table names are interpolated into SQL statements, so only
/// `[a-zA-Z0-9_]` is allowed and the first character must not be a digit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("table name is empty"));
    }
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "table name '{name}' must not start with a digit"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == SEPARATOR)
    {
        return Err(Error::validation(format!(
            "table name '{name}' contains characters outside [a-zA-Z0-9_]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_name() {
        assert_eq!(
            physical_table_name("demo", "driver_stats").unwrap(),
            "demo_driver_stats"
        );
    }

    #[test]
    fn test_distinct_projects_never_collide() {
        let p1 = physical_table_name("alpha", "driver_stats").unwrap();
        let p2 = physical_table_name("beta", "driver_stats").unwrap();
        assert_ne!(p1, p2);
    }

    #[test]
    fn test_ambiguous_pairs_stay_distinct() {
        // ("ab", "c_d") vs ("a", "bc_d") would collide if projects could
        // contain the separator; the validation rule forbids that.
        let n1 = physical_table_name("ab", "cd").unwrap();
        let n2 = physical_table_name("a", "bcd").unwrap();
        assert_ne!(n1, n2);
        assert!(physical_table_name("a_b", "cd").is_err());
    }

    #[test]
    fn test_project_with_separator_rejected() {
        assert!(physical_table_name("my_project", "stats").is_err());
        assert!(physical_table_name("1project", "stats").is_err());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(physical_table_name("", "stats").is_err());
        assert!(physical_table_name("demo", "").is_err());
    }

    #[test]
    fn test_identifier_charset_enforced() {
        assert!(validate_identifier("demo_driver_stats").is_ok());
        assert!(validate_identifier("drop table; --").is_err());
        assert!(validate_identifier("1stats").is_err());
    }
}
