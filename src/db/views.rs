//! Packaged view templates and placeholder substitution.
//!
//! Templates refer to hashed user id columns through placeholders such as
//! `[partner_user_id]` because the real column name depends on the partner
//! (e.g. `stanford_user_id`). Placeholders are resolved by looking for a
//! column ending in `_user_id` in the placeholder's source table. Resolution
//! is best effort: anything that cannot be resolved is left untouched.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::accessor::{validate_identifier, RelationAccessor};
use crate::config::{HASHED_USER_ID_COLUMN_TO_SOURCE_TABLE, PARTNER_SHORT_NAME_PLACEHOLDER};
use crate::error_handling::DatabaseError;

const USER_ID_SUFFIX: &str = "_user_id";

/// A view template shipped with the binary.
#[derive(Debug, Clone, Copy)]
pub struct PackagedView {
    pub name: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
}

pub const PACKAGED_VIEWS: &[PackagedView] = &[
    PackagedView {
        name: "course_membership_summary",
        description: "Learner counts per course and membership role",
        sql: include_str!("../../sql/course_membership_summary.sql"),
    },
    PackagedView {
        name: "learner_grades",
        description: "Final course grades joined with learner profile fields",
        sql: include_str!("../../sql/learner_grades.sql"),
    },
    PackagedView {
        name: "demographic_answers",
        description: "Demographic survey answers with question and choice text",
        sql: include_str!("../../sql/demographic_answers.sql"),
    },
];

pub fn packaged_view(name: &str) -> Result<&'static PackagedView, DatabaseError> {
    PACKAGED_VIEWS
        .iter()
        .find(|view| view.name == name)
        .ok_or_else(|| DatabaseError::UnknownView(name.to_string()))
}

/// The view name for a SQL file is its file stem.
pub fn view_name_from_file(path: &Path) -> Result<String, DatabaseError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    validate_identifier(&stem).map(str::to_string)
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    pub partner_short_name: Option<String>,
    /// `(placeholder, column)` pairs, e.g. `("[partner_user_id]", "stanford_user_id")`
    pub user_id_columns: Vec<(String, String)>,
}

/// Replaces every known placeholder in `sql`.
pub fn apply_placeholders(sql: &str, values: &Placeholders) -> String {
    let mut text = sql.to_string();
    if let Some(name) = &values.partner_short_name {
        text = text.replace(PARTNER_SHORT_NAME_PLACEHOLDER, name);
    }
    for (placeholder, column) in &values.user_id_columns {
        text = text.replace(placeholder.as_str(), column);
    }
    text
}

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[[a-z][a-z0-9_]*\]").ok());

/// Placeholders still present after substitution.
pub fn unresolved_placeholders(sql: &str) -> Vec<String> {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return Vec::new();
    };
    let mut found: Vec<String> = re.find_iter(sql).map(|m| m.as_str().to_string()).collect();
    found.sort();
    found.dedup();
    found
}

fn user_id_column(columns: &[String]) -> Option<&String> {
    columns.iter().find(|c| c.ends_with(USER_ID_SUFFIX))
}

impl RelationAccessor {
    /// Resolves placeholders from the database schema. Lookups that fail or
    /// find nothing are skipped.
    pub async fn infer_placeholders(&self, partner_short_name: Option<String>) -> Placeholders {
        let mut values = Placeholders {
            partner_short_name,
            user_id_columns: Vec::new(),
        };

        for (placeholder, table) in HASHED_USER_ID_COLUMN_TO_SOURCE_TABLE {
            let columns = match self.columns(table).await {
                Ok(columns) => columns,
                Err(e) => {
                    log::debug!("Could not read columns of {}: {}", table, e);
                    continue;
                }
            };
            let Some(column) = user_id_column(&columns) else {
                log::debug!("No user id column in {} for {}", table, placeholder);
                continue;
            };

            if *placeholder == "[partner_user_id]" && values.partner_short_name.is_none() {
                let prefix = column.trim_end_matches(USER_ID_SUFFIX);
                if !prefix.is_empty() {
                    values.partner_short_name = Some(prefix.to_string());
                }
            }
            values
                .user_id_columns
                .push((placeholder.to_string(), column.clone()));
        }
        values
    }

    /// Substitutes placeholders in `template` and creates the view.
    pub async fn create_view_from_template(
        &self,
        name: &str,
        template: &str,
        partner_short_name: Option<String>,
    ) -> Result<(), DatabaseError> {
        let values = self.infer_placeholders(partner_short_name).await;
        let sql = apply_placeholders(template, &values);
        let unresolved = unresolved_placeholders(&sql);
        if !unresolved.is_empty() {
            log::warn!(
                "View {} still contains unresolved placeholders: {}",
                name,
                unresolved.join(", ")
            );
        }
        self.create_view(name, &sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_packaged_views_are_valid_names() {
        for view in PACKAGED_VIEWS {
            assert!(validate_identifier(view.name).is_ok(), "{}", view.name);
            assert!(!view.sql.trim().is_empty());
        }
        assert!(packaged_view("learner_grades").is_ok());
        assert!(matches!(
            packaged_view("nope"),
            Err(DatabaseError::UnknownView(_))
        ));
    }

    #[test]
    fn test_view_name_from_file() {
        assert_eq!(
            view_name_from_file(&PathBuf::from("/tmp/queries/active_learners.sql")).unwrap(),
            "active_learners"
        );
        assert!(view_name_from_file(&PathBuf::from("/tmp/bad name.sql")).is_err());
    }

    #[test]
    fn test_apply_placeholders() {
        let values = Placeholders {
            partner_short_name: Some("stanford".to_string()),
            user_id_columns: vec![(
                "[partner_user_id]".to_string(),
                "stanford_user_id".to_string(),
            )],
        };
        let sql = "SELECT [partner_user_id], '[partner_short_name]' FROM users";
        assert_eq!(
            apply_placeholders(sql, &values),
            "SELECT stanford_user_id, 'stanford' FROM users"
        );
    }

    #[test]
    fn test_missing_values_leave_text_untouched() {
        let sql = "SELECT [feedback_user_id] FROM feedback_course_ratings";
        assert_eq!(apply_placeholders(sql, &Placeholders::default()), sql);
        assert_eq!(unresolved_placeholders(sql), ["[feedback_user_id]"]);
    }

    #[test]
    fn test_packaged_templates_only_use_known_placeholders() {
        let known: Vec<&str> = HASHED_USER_ID_COLUMN_TO_SOURCE_TABLE
            .iter()
            .map(|(placeholder, _)| *placeholder)
            .chain(std::iter::once(PARTNER_SHORT_NAME_PLACEHOLDER))
            .collect();
        for view in PACKAGED_VIEWS {
            for placeholder in unresolved_placeholders(view.sql) {
                assert!(known.contains(&placeholder.as_str()), "{}", placeholder);
            }
        }
    }

    #[test]
    fn test_user_id_column() {
        let columns = vec![
            "country_cd".to_string(),
            "stanford_user_id".to_string(),
        ];
        assert_eq!(
            user_id_column(&columns).map(String::as_str),
            Some("stanford_user_id")
        );
        assert_eq!(user_id_column(&[]), None);
    }
}
