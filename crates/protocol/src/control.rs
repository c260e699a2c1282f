//! Short ASCII text messages exchanged alongside the binary stream.

/// Scene-selection requests sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneRequest {
    Cube,
    Tetra,
}

impl SceneRequest {
    pub fn as_str(self) -> &'static str {
        match self {
            SceneRequest::Cube => "cube",
            SceneRequest::Tetra => "tetra",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "cube" => Some(SceneRequest::Cube),
            "tetra" => Some(SceneRequest::Tetra),
            _ => None,
        }
    }
}

/// Acknowledgements the client sends after applying a mesh update.
///
/// The server treats these as flow control: it does not send the next mesh
/// update of the same kind until the previous one is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ack {
    /// Sent after a full mesh replacement.
    Got,
    /// Sent after a region patch.
    GotRegion,
}

impl Ack {
    pub fn as_str(self) -> &'static str {
        match self {
            Ack::Got => "got",
            Ack::GotRegion => "gotregion",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "got" => Some(Ack::Got),
            "gotregion" => Some(Ack::GotRegion),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_strings() {
        assert_eq!(SceneRequest::Cube.as_str(), "cube");
        assert_eq!(SceneRequest::parse("tetra"), Some(SceneRequest::Tetra));
        assert_eq!(SceneRequest::parse("sphere"), None);
        assert_eq!(Ack::Got.as_str(), "got");
        assert_eq!(Ack::GotRegion.as_str(), "gotregion");
        assert_eq!(Ack::parse("gotregion"), Some(Ack::GotRegion));
    }
}
