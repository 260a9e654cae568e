pub mod catalog;
pub mod graph;
pub mod model;
pub mod render;
pub mod requests;
pub mod shared;
pub mod transit;

pub use catalog::TransportCatalog;
pub use requests::{InputDocument, StatRequest, process_all, process_document};
