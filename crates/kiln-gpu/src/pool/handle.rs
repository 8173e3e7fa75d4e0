use crate::error::Resource;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub const KIND: Resource = $kind;

            /// Slot index inside the owning pool.
            #[inline]
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", Self::KIND, self.0)
            }
        }
    };
}

handle!(
    /// Handle to a pipeline slot.
    PipelineId,
    Resource::Pipeline
);

handle!(
    /// Handle to a material slot. Valid across all pipelines.
    MaterialId,
    Resource::Material
);

handle!(
    /// Handle to a mesh slot.
    MeshId,
    Resource::Mesh
);
