pub mod health;
pub mod model_artifacts;
pub mod model_versions;
pub mod registered_models;
