use crate::backend::Backend;
use crate::error::{Error, Resource, Result};
use crate::limits::MAX_TEXTURES;

/// Per-material texture bindings plus the bind group built from them.
///
/// Slots `[0, len)` hold attached textures; the rest resolve to the backend's
/// placeholder. Every change rebuilds the whole group.
pub struct TextureSet<B: Backend> {
    sampler: B::Sampler,
    textures: Vec<(B::Texture, B::TextureView)>,
    bind_group: B::BindGroup,
}

impl<B: Backend> TextureSet<B> {
    /// Creates an empty set whose group binds the placeholder everywhere.
    pub fn new(backend: &B, label: &str) -> Result<Self> {
        let sampler = backend.create_sampler(label)?;
        let bind_group = build_group(backend, &sampler, &[])?;
        Ok(Self {
            sampler,
            textures: Vec::with_capacity(MAX_TEXTURES),
            bind_group,
        })
    }

    /// Stores the texture in the next slot and rebuilds the group.
    ///
    /// Nothing changes if the set is full or the rebuild fails.
    pub fn attach(
        &mut self,
        backend: &B,
        texture: B::Texture,
        view: B::TextureView,
    ) -> Result<usize> {
        if self.is_full() {
            return Err(Error::CapacityExceeded { resource: Resource::TextureSlot });
        }

        self.textures.push((texture, view));
        match build_group(backend, &self.sampler, &self.textures) {
            Ok(group) => {
                self.bind_group = group;
                Ok(self.textures.len() - 1)
            }
            Err(e) => {
                self.textures.pop();
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.textures.len() >= MAX_TEXTURES
    }

    pub fn bind_group(&self) -> &B::BindGroup {
        &self.bind_group
    }

    pub fn sampler(&self) -> &B::Sampler {
        &self.sampler
    }

    pub fn view(&self, slot: usize) -> Option<&B::TextureView> {
        self.textures.get(slot).map(|(_, v)| v)
    }
}

fn build_group<B: Backend>(
    backend: &B,
    sampler: &B::Sampler,
    textures: &[(B::Texture, B::TextureView)],
) -> Result<B::BindGroup> {
    let placeholder = backend.default_texture_view();
    let views = std::array::from_fn(|i| textures.get(i).map_or(placeholder, |(_, v)| v));
    backend.create_texture_bind_group(sampler, views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Binding, FailPoint, RecordingBackend, TextureRef, ViewRef};
    use crate::backend::TextureDesc;

    fn upload(b: &RecordingBackend, n: u8) -> (TextureRef, ViewRef) {
        b.create_texture(&TextureDesc { label: "t", width: 1, height: 1 }, &[n; 4])
            .unwrap()
    }

    #[test]
    fn new_set_binds_placeholder_everywhere() {
        let b = RecordingBackend::new();
        let set = TextureSet::new(&b, "m").unwrap();
        let group = b.bind_group(*set.bind_group());

        assert_eq!(group.entries.len(), MAX_TEXTURES + 1);
        assert_eq!(group.entries[0], Binding::Sampler(*set.sampler()));
        for e in &group.entries[1..] {
            assert_eq!(*e, Binding::View(*b.default_texture_view()));
        }
    }

    #[test]
    fn attach_fills_slots_in_order_then_fails() {
        let b = RecordingBackend::new();
        let mut set = TextureSet::new(&b, "m").unwrap();

        for i in 0..MAX_TEXTURES {
            let (t, v) = upload(&b, i as u8);
            assert_eq!(set.attach(&b, t, v).unwrap(), i);

            let group = b.bind_group(*set.bind_group());
            assert_eq!(group.entries.len(), MAX_TEXTURES + 1);
            for slot in 0..MAX_TEXTURES {
                let expected = if slot <= i {
                    *set.view(slot).unwrap()
                } else {
                    *b.default_texture_view()
                };
                assert_eq!(group.entries[slot + 1], Binding::View(expected));
            }
        }

        let (t, v) = upload(&b, 9);
        assert_eq!(
            set.attach(&b, t, v).unwrap_err(),
            Error::CapacityExceeded { resource: Resource::TextureSlot }
        );
        assert_eq!(set.len(), MAX_TEXTURES);
    }

    #[test]
    fn failed_rebuild_keeps_previous_group() {
        let b = RecordingBackend::new();
        let mut set = TextureSet::new(&b, "m").unwrap();
        let before = *set.bind_group();

        let (t, v) = upload(&b, 1);
        b.fail_next(FailPoint::BindGroup);
        assert!(set.attach(&b, t, v).is_err());
        assert!(set.is_empty());
        assert_eq!(*set.bind_group(), before);
    }
}
