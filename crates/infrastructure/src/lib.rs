//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod directory_download_sink;
mod file_session_store;
mod in_memory_session_store;
mod reqwest_transport;

pub use directory_download_sink::DirectoryDownloadSink;
pub use file_session_store::FileSessionStore;
pub use in_memory_session_store::InMemorySessionStore;
pub use reqwest_transport::ReqwestTransport;
