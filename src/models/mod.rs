pub mod loaders;
pub mod outcome;
pub mod page;
pub mod query;
pub mod session;

pub use loaders::load_queries;
pub use outcome::{BatchItemOutcome, BatchReport, PreviewOutcome};
pub use page::{FetchOutcome, PageFailure, PageResult, Record, ResultSet, SearchResponse};
pub use query::{ApiKey, FieldList, Query};
pub use session::{ArtifactLocation, ExportDestination, Session};
