//! Data model: export requests and jobs, containers and relations.

mod clickstream;
mod container;
mod export_job;
mod export_request;
mod relation;
mod scope;

pub use clickstream::ClickstreamLinksRequest;
pub use container::{ContainerRecord, ContainerStatus};
pub use export_job::{sort_by_created, ExportJob, ExportJobMetadata, JobStatus};
pub use export_request::{
    AnonymityLevel, ExportKind, ExportRequest, Interval, PartnerId, SchemaName, Scope,
    UserIdHashing,
};
pub use relation::{RelationDescriptor, RelationKind};
pub use scope::ScopeSelector;
