/// Features of the drawing backend that the stream depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderCapabilities {
    /// Whether indexed draws accept 32-bit indices over their full range.
    pub index_u32: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("backend `{backend}` does not support 32-bit indices")]
    MissingIndexU32 { backend: String },
}

impl RenderCapabilities {
    pub fn all() -> Self {
        Self { index_u32: true }
    }

    /// Fail unless 32-bit indices are available.
    pub fn require_index_u32(&self, backend: &str) -> Result<(), CapabilityError> {
        if self.index_u32 {
            Ok(())
        } else {
            tracing::error!(backend, "32-bit index draws unsupported");
            Err(CapabilityError::MissingIndexU32 {
                backend: backend.to_owned(),
            })
        }
    }
}
