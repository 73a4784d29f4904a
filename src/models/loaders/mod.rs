pub mod query_loader;

pub use query_loader::load_queries;
