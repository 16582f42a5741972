mod client;
mod orchestrator;

pub use client::{Downloader, FetchOutcome};
pub use orchestrator::{
    ArtifactFailure, CategoryReport, DownloadOrchestrator, DownloadReport, ExtractionJob,
};
