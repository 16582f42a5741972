mod coordinate;

pub use coordinate::MavenCoordinate;

/// Repository serving Mojang-published libraries.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
