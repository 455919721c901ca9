#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod manifest;
pub mod trail;
pub mod walker;

pub use error::WalkError;
pub use manifest::{DirProbe, FsDirProbe, FsManifestSource, Manifest, ManifestSource};
pub use trail::Trail;
pub use walker::{PackageMeta, WalkEvent, WalkOptions, Walker};
