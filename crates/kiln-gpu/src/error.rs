use std::fmt;

/// Resource families that can run out of room.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Resource {
    Pipeline,
    Material,
    Mesh,
    TextureSlot,
    GlobalUniforms,
    MaterialUniforms,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Pipeline => "pipeline",
            Resource::Material => "material",
            Resource::Mesh => "mesh",
            Resource::TextureSlot => "texture slot",
            Resource::GlobalUniforms => "global uniform arena",
            Resource::MaterialUniforms => "material uniform arena",
        };
        f.write_str(name)
    }
}

/// Errors produced by the resource manager and its building blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A pool, arena or texture set is full.
    #[error("{resource} capacity exceeded")]
    CapacityExceeded { resource: Resource },

    /// The handle is out of range or refers to an unused slot.
    #[error("invalid {kind} handle {index}")]
    InvalidHandle { kind: Resource, index: u32 },

    /// The GPU backend rejected object creation.
    #[error("backend error: {0}")]
    Backend(String),

    /// A uniform access fell outside the allocated range `[0, cursor)`.
    #[error("uniform access at {offset}+{len} exceeds allocated range ({cursor} bytes)")]
    OutOfBoundsWrite {
        offset: usize,
        len: usize,
        cursor: usize,
    },

    /// Host data does not match the expected shape.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn backend(msg: impl fmt::Display) -> Self {
        Error::Backend(msg.to_string())
    }

    pub fn invalid_data(msg: impl fmt::Display) -> Self {
        Error::InvalidData(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_resource() {
        let e = Error::CapacityExceeded { resource: Resource::TextureSlot };
        assert_eq!(e.to_string(), "texture slot capacity exceeded");

        let e = Error::InvalidHandle { kind: Resource::Material, index: 7 };
        assert_eq!(e.to_string(), "invalid material handle 7");
    }

    #[test]
    fn out_of_bounds_reports_range() {
        let e = Error::OutOfBoundsWrite { offset: 1000, len: 8, cursor: 4 };
        assert!(e.to_string().contains("1000+8"));
        assert!(e.to_string().contains("4 bytes"));
    }
}
