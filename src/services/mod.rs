pub mod archive_builder;
pub mod credential_store;
pub mod csv_exporter;
pub mod paginator;

pub use archive_builder::ArchiveBuilder;
pub use credential_store::{CredentialStore, FileCredentialStore};
pub use csv_exporter::CsvExporter;
pub use paginator::{PageErrorPolicy, PaginationPlan, Paginator};
