use image::DynamicImage;
use std::collections::HashMap;

use super::placeholder::{ImageFetchError, PhotoRecord};

/// One listed photo with its lazily fetched image.
#[derive(Debug)]
pub struct AlbumEntry {
    pub album_id: u32,
    pub id: u32,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
    pub image: Option<DynamicImage>,
}

impl AlbumEntry {
    pub fn image_loaded(&self) -> bool {
        self.image.is_some()
    }
}

impl From<PhotoRecord> for AlbumEntry {
    fn from(record: PhotoRecord) -> Self {
        AlbumEntry {
            album_id: record.album_id,
            id: record.id,
            title: record.title,
            url: record.url,
            thumbnail_url: record.thumbnail_url,
            image: None,
        }
    }
}

/// At most one image fetch is outstanding; `generation` ties a completion
/// back to the request that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Loading { entry_id: u32, generation: u64 },
}

/// Handed to the caller when `select` decides a fetch is needed. The caller
/// spawns the request and reports back through `complete_fetch` with the
/// same generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub entry_id: u32,
    pub url: String,
    pub generation: u64,
}

/// Selection and fetch coordination for the album list. Pure state — all
/// I/O lives with the caller, which makes the transitions testable without
/// a network.
pub struct AlbumController {
    entries: Vec<AlbumEntry>,
    index: HashMap<u32, usize>,
    selected: Option<u32>,
    fetch: FetchState,
    generation: u64,
}

impl AlbumController {
    pub fn new() -> Self {
        AlbumController {
            entries: Vec::new(),
            index: HashMap::new(),
            selected: None,
            fetch: FetchState::Idle,
            generation: 0,
        }
    }

    /// Replaces the entry collection with freshly parsed catalog records,
    /// keeping their order and rebuilding the id index.
    pub fn populate(&mut self, records: Vec<PhotoRecord>) {
        self.entries = records.into_iter().map(AlbumEntry::from).collect();
        self.rebuild_index();
        self.selected = None;
        self.fetch = FetchState::Idle;
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.id, pos))
            .collect();
    }

    pub fn entries(&self) -> &[AlbumEntry] {
        &self.entries
    }

    pub fn entry(&self, id: u32) -> Option<&AlbumEntry> {
        self.index.get(&id).map(|&pos| &self.entries[pos])
    }

    pub fn selected_id(&self) -> Option<u32> {
        self.selected
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetch
    }

    /// True while `id`'s image fetch is outstanding.
    pub fn is_loading(&self, id: u32) -> bool {
        matches!(self.fetch, FetchState::Loading { entry_id, .. } if entry_id == id)
    }

    /// Handles a click on entry `id`. Dropped entirely while a fetch is in
    /// flight (latest click loses), and when `id` is already selected with
    /// its image present. Otherwise moves the selection; returns the request
    /// to spawn when the image still needs fetching.
    pub fn select(&mut self, id: u32) -> Option<ImageRequest> {
        if self.fetch != FetchState::Idle {
            return None;
        }
        if self.selected == Some(id) && self.entry(id).is_some_and(|e| e.image_loaded()) {
            return None;
        }

        let entry = match self.index.get(&id) {
            Some(&pos) => &self.entries[pos],
            None => return None,
        };

        self.selected = Some(id);

        if entry.image_loaded() {
            return None;
        }

        self.generation += 1;
        self.fetch = FetchState::Loading {
            entry_id: id,
            generation: self.generation,
        };
        Some(ImageRequest {
            entry_id: id,
            url: entry.url.clone(),
            generation: self.generation,
        })
    }

    /// Applies a finished image fetch. Results whose generation does not
    /// match the live `Loading` state come from a cancelled or superseded
    /// request and are dropped without touching anything.
    pub fn complete_fetch(&mut self, generation: u64, result: Result<DynamicImage, ImageFetchError>) {
        let entry_id = match self.fetch {
            FetchState::Loading { entry_id, generation: live } if live == generation => entry_id,
            _ => return,
        };

        self.fetch = FetchState::Idle;

        match result {
            Ok(image) => {
                if let Some(&pos) = self.index.get(&entry_id) {
                    self.entries[pos].image = Some(image);
                }
            }
            Err(err) => {
                // Selection stays put; reselecting retries.
                log::error!("image fetch for entry {} failed: {}", entry_id, err);
            }
        }
    }

    /// Removes the selected entry, cancelling its fetch if one is running.
    /// Returns the removed id so the caller can abort the task handle.
    pub fn delete_selected(&mut self) -> Option<u32> {
        let id = self.selected.take()?;
        self.cancel_fetch();

        if let Some(pos) = self.index.remove(&id) {
            self.entries.remove(pos);
            self.rebuild_index();
        }
        Some(id)
    }

    /// Drops any in-flight fetch; a no-op when idle. The orphaned
    /// completion, if its task already sent, dies in `complete_fetch`.
    pub fn cancel_fetch(&mut self) {
        self.fetch = FetchState::Idle;
    }
}

impl Default for AlbumController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32) -> PhotoRecord {
        PhotoRecord {
            album_id: 1,
            id,
            title: format!("photo {}", id),
            url: format!("https://via.placeholder.com/600/{}", id),
            thumbnail_url: format!("https://via.placeholder.com/150/{}", id),
        }
    }

    fn controller_with(ids: &[u32]) -> AlbumController {
        let mut controller = AlbumController::new();
        controller.populate(ids.iter().copied().map(record).collect());
        controller
    }

    fn test_image() -> DynamicImage {
        DynamicImage::new_rgb8(1, 1)
    }

    #[test]
    fn populate_preserves_order_and_indexes_by_id() {
        let controller = controller_with(&[7, 3, 5]);

        let ids: Vec<u32> = controller.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
        assert_eq!(controller.entry(3).unwrap().title, "photo 3");
        assert!(controller.entry(99).is_none());
    }

    #[test]
    fn select_unloaded_entry_starts_fetch() {
        let mut controller = controller_with(&[1, 2, 3]);

        let request = controller.select(2).unwrap();
        assert_eq!(request.entry_id, 2);
        assert_eq!(request.url, "https://via.placeholder.com/600/2");
        assert_eq!(controller.selected_id(), Some(2));
        assert!(controller.is_loading(2));
    }

    #[test]
    fn no_second_fetch_while_one_is_in_flight() {
        let mut controller = controller_with(&[1, 2, 3]);

        let first = controller.select(1).unwrap();

        // Any select while loading is dropped, including re-selecting the
        // loading entry itself.
        assert!(controller.select(3).is_none());
        assert!(controller.select(2).is_none());
        assert!(controller.select(1).is_none());
        assert_eq!(controller.selected_id(), Some(1));
        assert!(controller.is_loading(1));

        controller.complete_fetch(first.generation, Ok(test_image()));
        assert_eq!(controller.fetch_state(), FetchState::Idle);
        assert_eq!(controller.selected_id(), Some(1));
        assert!(controller.entry(1).unwrap().image_loaded());
    }

    #[test]
    fn reselecting_loaded_entry_is_a_noop() {
        let mut controller = controller_with(&[1, 2, 3]);

        let request = controller.select(2).unwrap();
        controller.complete_fetch(request.generation, Ok(test_image()));
        assert!(controller.entry(2).unwrap().image_loaded());

        assert!(controller.select(2).is_none());
        assert_eq!(controller.fetch_state(), FetchState::Idle);
    }

    #[test]
    fn selecting_loaded_entry_moves_selection_without_request() {
        let mut controller = controller_with(&[1, 2]);

        let request = controller.select(1).unwrap();
        controller.complete_fetch(request.generation, Ok(test_image()));

        let request = controller.select(2).unwrap();
        controller.complete_fetch(request.generation, Ok(test_image()));

        // Back to an already-loaded, non-selected entry: selection moves,
        // no fetch starts.
        assert!(controller.select(1).is_none());
        assert_eq!(controller.selected_id(), Some(1));
        assert_eq!(controller.fetch_state(), FetchState::Idle);
    }

    #[test]
    fn selecting_unknown_id_changes_nothing() {
        let mut controller = controller_with(&[1]);

        assert!(controller.select(42).is_none());
        assert_eq!(controller.selected_id(), None);
        assert_eq!(controller.fetch_state(), FetchState::Idle);
    }

    #[test]
    fn failed_fetch_returns_to_idle_and_keeps_selection() {
        let mut controller = controller_with(&[1, 2]);

        let request = controller.select(1).unwrap();
        controller.complete_fetch(
            request.generation,
            Err(ImageFetchError::Decode(image::ImageError::Unsupported(
                image::error::UnsupportedError::from_format_and_kind(
                    image::error::ImageFormatHint::Unknown,
                    image::error::UnsupportedErrorKind::Format(
                        image::error::ImageFormatHint::Unknown,
                    ),
                ),
            ))),
        );

        assert_eq!(controller.fetch_state(), FetchState::Idle);
        assert_eq!(controller.selected_id(), Some(1));
        assert!(!controller.entry(1).unwrap().image_loaded());

        // Reselecting retries with a fresh generation.
        let retry = controller.select(1).unwrap();
        assert!(retry.generation > request.generation);
    }

    #[test]
    fn delete_selected_removes_entry_and_clears_selection() {
        let mut controller = controller_with(&[1, 2, 3]);

        let request = controller.select(2).unwrap();
        assert_eq!(controller.delete_selected(), Some(2));

        assert_eq!(controller.selected_id(), None);
        assert_eq!(controller.fetch_state(), FetchState::Idle);
        assert!(controller.entry(2).is_none());
        let ids: Vec<u32> = controller.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);

        // The aborted fetch's completion lands on dead state.
        controller.complete_fetch(request.generation, Ok(test_image()));
        assert_eq!(controller.fetch_state(), FetchState::Idle);
        assert_eq!(controller.selected_id(), None);
    }

    #[test]
    fn delete_with_no_selection_is_a_noop() {
        let mut controller = controller_with(&[1, 2]);

        assert_eq!(controller.delete_selected(), None);
        assert_eq!(controller.entries().len(), 2);
    }

    #[test]
    fn cancel_orphans_the_inflight_completion() {
        let mut controller = controller_with(&[1, 2]);

        let request = controller.select(1).unwrap();
        controller.cancel_fetch();
        assert_eq!(controller.fetch_state(), FetchState::Idle);

        controller.complete_fetch(request.generation, Ok(test_image()));
        assert!(!controller.entry(1).unwrap().image_loaded());
        assert_eq!(controller.selected_id(), Some(1));
    }

    #[test]
    fn cancel_when_idle_is_safe() {
        let mut controller = controller_with(&[1]);
        controller.cancel_fetch();
        assert_eq!(controller.fetch_state(), FetchState::Idle);
    }

    #[test]
    fn stale_generation_cannot_satisfy_a_newer_fetch() {
        let mut controller = controller_with(&[1, 2]);

        let first = controller.select(1).unwrap();
        controller.cancel_fetch();
        let second = controller.select(2).unwrap();
        assert_ne!(first.generation, second.generation);

        // The cancelled request's late completion must not resolve the new
        // one or attach an image anywhere.
        controller.complete_fetch(first.generation, Ok(test_image()));
        assert!(controller.is_loading(2));
        assert!(!controller.entry(1).unwrap().image_loaded());
        assert!(!controller.entry(2).unwrap().image_loaded());

        controller.complete_fetch(second.generation, Ok(test_image()));
        assert!(controller.entry(2).unwrap().image_loaded());
    }

    #[test]
    fn scenario_select_load_reselect() {
        let mut controller = controller_with(&[1, 2, 3]);

        let request = controller.select(2).unwrap();
        assert_eq!(
            controller.fetch_state(),
            FetchState::Loading {
                entry_id: 2,
                generation: request.generation
            }
        );

        controller.complete_fetch(request.generation, Ok(test_image()));
        assert_eq!(controller.fetch_state(), FetchState::Idle);
        assert!(controller.entry(2).unwrap().image_loaded());

        assert!(controller.select(2).is_none());
    }

    #[test]
    fn scenario_select_while_loading_is_dropped() {
        let mut controller = controller_with(&[1, 2, 3]);

        let request = controller.select(1).unwrap();
        assert!(controller.select(3).is_none());
        assert!(controller.is_loading(1));

        controller.complete_fetch(request.generation, Ok(test_image()));
        assert_eq!(controller.fetch_state(), FetchState::Idle);
        assert_eq!(controller.selected_id(), Some(1));
        assert!(controller.entry(1).unwrap().image_loaded());
        assert!(!controller.entry(3).unwrap().image_loaded());
    }
}
