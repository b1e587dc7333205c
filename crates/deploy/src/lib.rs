//! Upload orchestration and the build-then-deploy pipeline.
//!
//! # Pipeline
//!
//! 1. **Validate**: destination settings and credentials are complete
//! 2. **Gate**: the bundle version is newer than the last upload
//! 3. **Build**: runs first when the gate bumped the version
//! 4. **Enumerate**: every file under the artifact root
//! 5. **Upload**: connect, prepare the remote root, send files in order

pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod preflight;
pub mod transport;

pub use error::DeployError;
pub use orchestrator::{FileFailure, UploadOrchestrator, UploadOutcome, UploadReport, UploadRequest};
pub use pipeline::{DeployPipeline, default_remote_dir};
pub use preflight::validate_destination;
pub use transport::backend_for;
