/// Ambient session identity, injected by the host instead of read from
/// global storage so the unauthenticated path is testable.
pub trait AuthContext: Send + Sync {
    /// The signed-in student's opaque identifier, if any.
    fn current_student_id(&self) -> Option<String>;
}

/// Fixed identity, convenient for hosts that resolve the student once at
/// startup and for tests.
pub struct StaticAuth {
    student_id: Option<String>,
}

impl StaticAuth {
    pub fn signed_in(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { student_id: None }
    }
}

impl AuthContext for StaticAuth {
    fn current_student_id(&self) -> Option<String> {
        self.student_id.clone()
    }
}
