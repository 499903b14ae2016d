pub mod model_artifact_service;
pub mod model_version_service;
pub mod payloads;
pub mod registered_model_service;
pub mod validation;

pub use model_artifact_service::*;
pub use model_version_service::ModelVersionService;
pub use registered_model_service::*;
pub use validation::*;
