use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state shared by registered models and versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelState {
    Active,
    Archived,
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Active => "ACTIVE",
            ModelState::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for ModelState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ModelState::Active),
            "ARCHIVED" => Ok(ModelState::Archived),
            other => Err(format!(
                "invalid state '{}': expected ACTIVE or ARCHIVED",
                other
            )),
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness of a model version, driven by downstream processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionStatus {
    Pending,
    Ready,
    Failed,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Pending => "PENDING",
            VersionStatus::Ready => "READY",
            VersionStatus::Failed => "FAILED",
        }
    }

    /// Whether a version may move from `self` to `next`.
    ///
    /// Staying put is always allowed; nothing returns to PENDING.
    pub fn can_transition_to(&self, next: VersionStatus) -> bool {
        use VersionStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Pending, Ready) | (Pending, Failed) => true,
            (Ready, Failed) | (Failed, Ready) => true,
            _ => false,
        }
    }
}

impl FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VersionStatus::Pending),
            "READY" => Ok(VersionStatus::Ready),
            "FAILED" => Ok(VersionStatus::Failed),
            other => Err(format!(
                "invalid status '{}': expected PENDING, READY or FAILED",
                other
            )),
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized artifact encodings. Anything other than `Model` places the
/// version in the artifact projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Model,
    Onnx,
    Tensorrt,
    Torchscript,
    Savedmodel,
    Gguf,
    Safetensors,
    Other,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 8] = [
        ArtifactType::Model,
        ArtifactType::Onnx,
        ArtifactType::Tensorrt,
        ArtifactType::Torchscript,
        ArtifactType::Savedmodel,
        ArtifactType::Gguf,
        ArtifactType::Safetensors,
        ArtifactType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Model => "model",
            ArtifactType::Onnx => "onnx",
            ArtifactType::Tensorrt => "tensorrt",
            ArtifactType::Torchscript => "torchscript",
            ArtifactType::Savedmodel => "savedmodel",
            ArtifactType::Gguf => "gguf",
            ArtifactType::Safetensors => "safetensors",
            ArtifactType::Other => "other",
        }
    }

    pub fn is_artifact(&self) -> bool {
        !matches!(self, ArtifactType::Model)
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    /// Parses the normalized (trimmed, lower-case) form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ArtifactType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = ArtifactType::ALL.iter().map(|t| t.as_str()).collect();
                format!(
                    "unknown artifact_type '{}': expected one of {}",
                    s,
                    known.join(", ")
                )
            })
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_str() {
        assert_eq!("ARCHIVED".parse::<ModelState>().unwrap(), ModelState::Archived);
        assert_eq!(ModelState::Active.to_string(), "ACTIVE");
        assert!("READY".parse::<ModelState>().is_err());
        assert!("active".parse::<ModelState>().is_err());
    }

    #[test]
    fn test_status_rejects_state_values() {
        assert!("ARCHIVED".parse::<VersionStatus>().is_err());
        assert_eq!("READY".parse::<VersionStatus>().unwrap(), VersionStatus::Ready);
    }

    #[test]
    fn test_status_transitions() {
        use VersionStatus::*;
        assert!(Pending.can_transition_to(Ready));
        assert!(Pending.can_transition_to(Failed));
        assert!(Ready.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Ready));
        assert!(Pending.can_transition_to(Pending));
        assert!(!Ready.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Pending));
    }

    #[test]
    fn test_artifact_type_is_normalized() {
        assert_eq!(" ONNX ".parse::<ArtifactType>().unwrap(), ArtifactType::Onnx);
        assert_eq!("SafeTensors".parse::<ArtifactType>().unwrap(), ArtifactType::Safetensors);
        assert!("pickle".parse::<ArtifactType>().is_err());
    }

    #[test]
    fn test_only_model_is_outside_projection() {
        for t in ArtifactType::ALL {
            assert_eq!(t.is_artifact(), t != ArtifactType::Model);
        }
    }
}
