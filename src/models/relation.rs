use strum_macros::Display;

/// Whether a relation is a base table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RelationKind {
    Table,
    View,
}

/// A table or view found by introspecting the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub name: String,
    pub kind: RelationKind,
}
