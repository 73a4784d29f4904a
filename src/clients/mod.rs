pub mod fofa_client;

pub use fofa_client::{FofaClient, SearchApi};
