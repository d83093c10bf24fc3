//! Export API access and archive retrieval.
//!
//! - [`ExportClient`]: create, get and list export jobs, plus course/partner
//!   lookups and clickstream download links
//! - [`ArchiveFetcher`]: download a completed export's archive
//! - [`extract`]: unpack a downloaded archive

mod api;
mod archive;
mod download;
mod lookup;

pub use api::{ApiEndpoints, ExportClient};
pub use archive::{extract, staging_dir};
pub use download::{archive_file_name, check_downloadable, ArchiveFetcher};
