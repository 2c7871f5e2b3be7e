pub mod http_source;
pub mod memory_source;

pub use http_source::HttpCatalogSource;
pub use memory_source::{CatalogRequest, MemoryCatalog};
