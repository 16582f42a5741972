pub mod discovery;
pub mod paths;
pub mod provision;
pub mod validate;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use discovery::{discovery_for, JavaDiscovery, LinuxDiscovery, MacDiscovery, WindowsDiscovery};
pub use provision::{
    AdoptiumSource, CorrettoSource, JavaProvisioner, ProvisionHandle, RuntimeRelease, RuntimeSource,
};
pub use validate::{validate_executable, validate_root, JavaCandidate};
pub use version::JavaVersion;
