use eframe::egui::Vec2;
use serde::{Deserialize, Serialize};

use super::camera::Camera;

pub const POSITIONS_KEY: &str = "site-graph/positions";
pub const CAMERA_KEY: &str = "site-graph/camera";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale: f32,
}

/// Raw persisted records, captured while the storage handle is available
/// (datasets load on a background thread, after the handle is gone).
/// Decoding is best-effort: anything missing, corrupt, or mismatched simply
/// yields `None` and the caller falls back.
#[derive(Clone, Debug, Default)]
pub struct StoredView {
    positions: Option<String>,
    camera: Option<String>,
}

impl StoredView {
    pub fn capture(storage: &dyn eframe::Storage) -> Self {
        Self {
            positions: storage.get_string(POSITIONS_KEY),
            camera: storage.get_string(CAMERA_KEY),
        }
    }

    /// Decodes the stored layout if its length matches `node_count * 2`.
    pub fn positions(&self, node_count: usize) -> Option<Vec<f32>> {
        let raw = self.positions.as_ref()?;
        let stored = serde_json::from_str::<Vec<i32>>(raw).ok()?;
        if stored.len() != node_count * 2 {
            return None;
        }
        Some(stored.into_iter().map(|value| value as f32).collect())
    }

    pub fn camera(&self) -> Option<CameraRecord> {
        let raw = self.camera.as_ref()?;
        let record = serde_json::from_str::<CameraRecord>(raw).ok()?;
        record.scale.is_finite().then_some(record)
    }
}

/// Overwrites both records under their stable keys. Positions are rounded to
/// integers to keep the stored payload small.
pub fn save_view_state(storage: &mut dyn eframe::Storage, positions: &[Vec2], camera: &Camera) {
    let rounded = positions
        .iter()
        .flat_map(|position| [position.x.round() as i32, position.y.round() as i32])
        .collect::<Vec<_>>();
    if let Ok(encoded) = serde_json::to_string(&rounded) {
        storage.set_string(POSITIONS_KEY, encoded);
    }

    let record = CameraRecord {
        offset_x: camera.offset.x,
        offset_y: camera.offset.y,
        scale: camera.scale,
    };
    if let Ok(encoded) = serde_json::to_string(&record) {
        storage.set_string(CAMERA_KEY, encoded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;
    use eframe::Storage;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStorage(HashMap<String, String>);

    impl eframe::Storage for MemStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.0.insert(key.to_owned(), value);
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn positions_and_camera_round_trip() {
        let mut storage = MemStorage::default();
        let mut camera = Camera::new(800.0, 600.0);
        camera.offset = vec2(120.5, -44.0);
        camera.scale = 2.25;

        let positions = [vec2(10.0, -4.0), vec2(33.0, 91.0)];
        save_view_state(&mut storage, &positions, &camera);

        let stored = StoredView::capture(&storage);
        assert_eq!(
            stored.positions(2).expect("stored positions"),
            vec![10.0, -4.0, 33.0, 91.0]
        );

        let record = stored.camera().expect("stored camera");
        assert_eq!(record.offset_x, 120.5);
        assert_eq!(record.offset_y, -44.0);
        assert_eq!(record.scale, 2.25);
    }

    #[test]
    fn fractional_positions_are_stored_rounded() {
        let mut storage = MemStorage::default();
        let camera = Camera::new(800.0, 600.0);
        save_view_state(&mut storage, &[vec2(10.4, -3.6)], &camera);

        let stored = StoredView::capture(&storage);
        assert_eq!(stored.positions(1).expect("stored"), vec![10.0, -4.0]);
    }

    #[test]
    fn node_count_mismatch_discards_the_record() {
        let mut storage = MemStorage::default();
        let camera = Camera::new(800.0, 600.0);
        save_view_state(&mut storage, &[vec2(1.0, 2.0), vec2(3.0, 4.0)], &camera);

        let stored = StoredView::capture(&storage);
        assert!(stored.positions(3).is_none());
        assert!(stored.positions(2).is_some());
    }

    #[test]
    fn missing_or_corrupt_records_yield_none() {
        let stored = StoredView::default();
        assert!(stored.positions(2).is_none());
        assert!(stored.camera().is_none());

        let mut storage = MemStorage::default();
        storage.set_string(POSITIONS_KEY, "not json".to_owned());
        storage.set_string(CAMERA_KEY, "{\"nope\":1}".to_owned());
        let stored = StoredView::capture(&storage);
        assert!(stored.positions(2).is_none());
        assert!(stored.camera().is_none());
    }
}
