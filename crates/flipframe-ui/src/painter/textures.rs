use std::collections::HashSet;

use egui::TextureId;
use egui::epaint::ImageDelta;

/// Texture ids a renderer currently holds.
///
/// egui-wgpu panics on a partial update of a texture it never allocated.
/// Deltas recorded before a device loss can reach the rebuilt renderer, so
/// uploads are filtered against what the renderer has actually seen.
#[derive(Debug, Default)]
pub(crate) struct TextureLedger {
    live: HashSet<TextureId>,
}

impl TextureLedger {
    /// Uploads the renderer can apply, in delta order.
    ///
    /// Full uploads allocate; partial uploads of unknown textures are dropped.
    pub fn uploads<'a>(&mut self, set: &'a [(TextureId, ImageDelta)]) -> Vec<(TextureId, &'a ImageDelta)> {
        let mut out = Vec::with_capacity(set.len());
        for (id, delta) in set {
            if delta.pos.is_none() {
                self.live.insert(*id);
            } else if !self.live.contains(id) {
                log::warn!("dropping partial update of unallocated texture {id:?}");
                continue;
            }
            out.push((*id, delta));
        }
        out
    }

    /// Frees that refer to held textures. Run after the frame is drawn.
    pub fn frees(&mut self, free: &[TextureId]) -> Vec<TextureId> {
        free.iter().copied().filter(|id| self.live.remove(id)).collect()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }

    #[cfg(test)]
    pub fn contains(&self, id: TextureId) -> bool {
        self.live.contains(&id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use egui::epaint::{ColorImage, ImageDelta};
    use egui::TextureOptions;

    use super::*;

    fn image() -> ColorImage {
        ColorImage::from_rgba_unmultiplied([1, 1], &[255, 255, 255, 255])
    }

    fn full(id: u64) -> (TextureId, ImageDelta) {
        (TextureId::Managed(id), ImageDelta::full(image(), TextureOptions::LINEAR))
    }

    fn partial(id: u64) -> (TextureId, ImageDelta) {
        (TextureId::Managed(id), ImageDelta::partial([0, 0], image(), TextureOptions::LINEAR))
    }

    fn ids(uploads: &[(TextureId, &ImageDelta)]) -> Vec<TextureId> {
        uploads.iter().map(|(id, _)| *id).collect()
    }

    #[test]
    fn full_upload_allocates_and_partial_follows() {
        let mut ledger = TextureLedger::default();
        let set = vec![full(0), partial(0)];

        let uploads = ledger.uploads(&set);
        assert_eq!(ids(&uploads), vec![TextureId::Managed(0), TextureId::Managed(0)]);
        assert!(uploads[0].1.is_whole());
        assert!(!uploads[1].1.is_whole());
        assert!(ledger.contains(TextureId::Managed(0)));
    }

    #[test]
    fn partial_update_of_unknown_texture_is_dropped() {
        let mut ledger = TextureLedger::default();
        let set = vec![partial(3), full(4)];

        assert_eq!(ids(&ledger.uploads(&set)), vec![TextureId::Managed(4)]);
        assert!(!ledger.contains(TextureId::Managed(3)));
    }

    #[test]
    fn texture_set_and_freed_in_one_delta_is_uploaded_then_released() {
        let mut ledger = TextureLedger::default();
        let set = vec![full(1), full(2)];
        let free = vec![TextureId::Managed(1)];

        assert_eq!(ledger.uploads(&set).len(), 2);
        assert_eq!(ledger.frees(&free), vec![TextureId::Managed(1)]);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(TextureId::Managed(2)));

        // freed twice: nothing left to release
        assert!(ledger.frees(&free).is_empty());
    }

    #[test]
    fn cleared_ledger_waits_for_full_reupload() {
        let mut ledger = TextureLedger::default();
        ledger.uploads(&[full(0)]);
        ledger.clear();

        // stale partial update from before the device was lost
        assert!(ledger.uploads(&[partial(0)]).is_empty());
        assert_eq!(ledger.uploads(&[full(0), partial(0)]).len(), 2);
    }

    #[test]
    fn font_atlas_from_first_pass_is_allocated() {
        let ctx = egui::Context::default();
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| ui.label("atlas"));
        });

        let mut ledger = TextureLedger::default();
        let uploads = ledger.uploads(&output.textures_delta.set);
        assert!(!uploads.is_empty());
        assert!(ledger.contains(TextureId::default()));
    }
}
