// ─── Conduit Core ───
// Provisioning and launch backend for a Minecraft launcher.
//
// Architecture:
//   core/
//     config/     — Launcher settings + directory layout
//     version/    — Version index, manifests, OS/feature rules
//     maven/      — Coordinate parsing and repository paths
//     artifact/   — Artifact model, per-category queues, hash validation
//     downloader/ — Streaming fetches + bounded-concurrency orchestrator
//     assets/     — Asset index → content-addressed objects
//     libraries/  — Library resolution, natives included
//     java/       — Runtime discovery, validation and provisioning
//     launch/     — Validation passes, classpath, natives, process
//     worker/     — Task/result envelope worker

pub mod archive;
pub mod artifact;
pub mod assets;
pub mod auth;
pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod java;
pub mod launch;
pub mod libraries;
pub mod maven;
pub mod platform;
pub mod version;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;
