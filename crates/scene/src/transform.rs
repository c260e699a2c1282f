use glam::Mat4;

/// Current view and projection matrices as last sent by the server.
///
/// Each setter replaces the whole matrix at once, so a reader never sees a
/// half-updated matrix. No validation is performed: any 16 floats are accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformStore {
    view: Mat4,
    projection: Mat4,
    revision: u64,
}

impl Default for TransformStore {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            revision: 0,
        }
    }
}

impl TransformStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the view matrix. Elements are column-major, in received order.
    pub fn set_view(&mut self, elements: [f32; 16]) {
        self.view = Mat4::from_cols_array(&elements);
        self.revision += 1;
    }

    /// Replace the projection matrix. Elements are column-major, in received order.
    pub fn set_projection(&mut self, elements: [f32; 16]) {
        self.projection = Mat4::from_cols_array(&elements);
        self.revision += 1;
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence() -> [f32; 16] {
        let mut m = [0.0; 16];
        for (i, v) in m.iter_mut().enumerate() {
            *v = i as f32;
        }
        m
    }

    #[test]
    fn defaults_to_identity() {
        let store = TransformStore::new();
        assert_eq!(store.view(), Mat4::IDENTITY);
        assert_eq!(store.projection(), Mat4::IDENTITY);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn set_view_preserves_element_order() {
        let mut store = TransformStore::new();
        store.set_view(sequence());
        assert_eq!(store.view().to_cols_array(), sequence());
        assert_eq!(store.projection(), Mat4::IDENTITY);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn set_projection_accepts_degenerate_matrices() {
        let mut store = TransformStore::new();
        store.set_projection([0.0; 16]);
        assert_eq!(store.projection(), Mat4::ZERO);
        store.set_projection([f32::NAN; 16]);
        assert!(store.projection().to_cols_array().iter().all(|v| v.is_nan()));
        assert_eq!(store.revision(), 2);
    }
}
