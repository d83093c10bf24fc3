//! Access to a provisioned export database.
//!
//! - [`RelationAccessor`]: list tables and views, create views, unload to CSV
//! - packaged view templates and placeholder substitution

mod accessor;
mod views;

pub use accessor::{connection_url, validate_identifier, RelationAccessor};
pub use views::{
    apply_placeholders, packaged_view, unresolved_placeholders, view_name_from_file,
    PackagedView, Placeholders, PACKAGED_VIEWS,
};
