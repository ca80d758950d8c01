use ash::vk;

#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("no loader link info in the create info chain")]
    MissingLinkInfo,

    #[error("loader link info carries no next-layer proc addr")]
    MissingNextProcAddr,

    #[error("next layer does not provide {0}")]
    UnresolvedCommand(&'static str),

    #[error("no {0} dispatch registered for handle")]
    UnknownHandle(&'static str),
}

impl LayerError {
    /// The status reported to the caller when this error ends an entry point.
    pub fn to_vk_result(&self) -> vk::Result {
        match self {
            LayerError::MissingLinkInfo
            | LayerError::MissingNextProcAddr
            | LayerError::UnresolvedCommand(_)
            | LayerError::UnknownHandle(_) => vk::Result::ERROR_INITIALIZATION_FAILED,
        }
    }
}

impl From<LayerError> for vk::Result {
    fn from(err: LayerError) -> Self {
        err.to_vk_result()
    }
}
