use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    /// A splat, avatar or clip could not be loaded. The corresponding node stays absent for the session.
    #[error("Failed to load {asset} from {path:?}: {reason}")]
    AssetLoad {
        asset: String,
        path: PathBuf,
        reason: String,
    },

    /// The splat bounds could not be used to frame the camera.
    #[error("Auto-frame unavailable: {0}")]
    AutoFrameUnavailable(String),
}

impl ViewerError {
    pub fn asset_load(asset: impl Into<String>, path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        ViewerError::AssetLoad {
            asset: asset.into(),
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }
}

/// Problems reading a splat point cloud.
#[derive(Error, Debug, PartialEq)]
pub enum SplatError {
    #[error("Not a PLY file")]
    NotPly,

    #[error("Malformed PLY header: {0}")]
    Header(String),

    #[error("Unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    #[error("PLY has no vertex element with x, y and z properties")]
    MissingPositions,

    #[error("PLY body ended after {read} of {expected} vertices")]
    Truncated { read: usize, expected: usize },

    #[error("Invalid value in PLY body: {0}")]
    InvalidValue(String),
}

/// Problems turning a skeletal model or clip into scene data.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("glTF import failed: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Model has no scene")]
    NoScene,

    #[error("Clip file contains no animation")]
    NoAnimation,
}
