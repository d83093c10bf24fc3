//! Scope selection as given on the command line.

use crate::error_handling::ApiError;

/// One scope identifier as supplied by the user. Slugs and short names still
/// need a lookup before they become a wire [`Scope`](super::Scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeSelector {
    CourseId(String),
    CourseSlug(String),
    PartnerId(i64),
    PartnerShortName(String),
    GroupId(String),
}

impl ScopeSelector {
    /// Builds a selector from the optional identifiers, rejecting anything but
    /// exactly one.
    pub fn from_parts(
        course_id: Option<String>,
        course_slug: Option<String>,
        partner_id: Option<i64>,
        partner_short_name: Option<String>,
        group_id: Option<String>,
    ) -> Result<Self, ApiError> {
        let mut selected = Vec::with_capacity(1);
        if let Some(id) = course_id {
            selected.push(ScopeSelector::CourseId(id));
        }
        if let Some(slug) = course_slug {
            selected.push(ScopeSelector::CourseSlug(slug));
        }
        if let Some(id) = partner_id {
            selected.push(ScopeSelector::PartnerId(id));
        }
        if let Some(name) = partner_short_name {
            selected.push(ScopeSelector::PartnerShortName(name));
        }
        if let Some(id) = group_id {
            selected.push(ScopeSelector::GroupId(id));
        }

        if selected.len() != 1 {
            return Err(ApiError::InvalidScope(selected.len()));
        }
        Ok(selected.remove(0))
    }

    /// Human readable name when it is already known without a lookup.
    pub fn known_name(&self) -> Option<&str> {
        match self {
            ScopeSelector::CourseSlug(slug) => Some(slug),
            ScopeSelector::PartnerShortName(name) => Some(name),
            _ => None,
        }
    }
}
