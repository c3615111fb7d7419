/// Lifecycle and lineage events recorded for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunEvent {
    Started,
    UsedArtifact,
    LoggedArtifact,
    Finished,
    Failed,
}

impl RunEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEvent::Started => "started",
            RunEvent::UsedArtifact => "used_artifact",
            RunEvent::LoggedArtifact => "logged_artifact",
            RunEvent::Finished => "finished",
            RunEvent::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "started" => Some(RunEvent::Started),
            "used_artifact" => Some(RunEvent::UsedArtifact),
            "logged_artifact" => Some(RunEvent::LoggedArtifact),
            "finished" => Some(RunEvent::Finished),
            "failed" => Some(RunEvent::Failed),
            _ => None,
        }
    }
}
