// Adapters layer: concrete implementations of the domain ports (browser, http, storage)

pub mod chrome;
pub mod http;
pub mod storage;

pub use chrome::ChromeSession;
pub use http::ExportFetcher;
pub use storage::LocalStorage;
