mod asset_index;

pub use asset_index::{AssetIndex, AssetIndexResolver, AssetObject, RESOURCES_URL};
