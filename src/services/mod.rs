pub mod backend;
pub mod content_extractor;
pub mod cordis_api;
pub mod result_filter;
pub mod result_manager;
pub mod search_engine;
pub mod text_processor;

pub use backend::{BackendFactory, DefaultBackendFactory, SearchBackend};
pub use content_extractor::{ContentExtractor, PageContent};
pub use cordis_api::CordisApiBackend;
pub use result_filter::{FilterDecision, ResultFilter};
pub use result_manager::{ResultManager, ResultSink};
pub use search_engine::BrowserSearchEngine;
