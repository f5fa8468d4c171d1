// lpad-net/src/lib.rs
pub mod download;
pub mod http;
pub mod source;

pub use download::{CancelHandle, CompletedDownload, DownloadEvent, DownloadHandle, Downloader};
pub use http::build_http_client;
pub use source::{ConfiguredSource, ReleaseApiSource, RemoteVersionSource, VersionFileSource};
