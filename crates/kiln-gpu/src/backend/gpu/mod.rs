//! wgpu device + surface backend.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue and configuring the surface
//! - owning the bind group layouts, placeholder texture and depth target
//! - recording each frame into a single render pass

mod backend;
mod init;
mod layouts;
mod pass;
mod surface;

pub use backend::WgpuBackend;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;

#[cfg(test)]
mod tests {
    use super::surface::{choose_alpha_mode, choose_surface_format};

    fn caps(
        formats: Vec<wgpu::TextureFormat>,
        alpha_modes: Vec<wgpu::CompositeAlphaMode>,
    ) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            alpha_modes,
            ..Default::default()
        }
    }

    #[test]
    fn srgb_format_preferred_when_offered() {
        let c = caps(
            vec![wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8UnormSrgb],
            vec![],
        );
        assert_eq!(choose_surface_format(&c, true), Some(wgpu::TextureFormat::Rgba8UnormSrgb));
        assert_eq!(choose_surface_format(&c, false), Some(wgpu::TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn no_formats_means_no_surface() {
        assert_eq!(choose_surface_format(&caps(vec![], vec![]), true), None);
    }

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let c = caps(vec![], vec![wgpu::CompositeAlphaMode::Opaque]);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
        assert_eq!(
            choose_alpha_mode(&caps(vec![], vec![]), None),
            wgpu::CompositeAlphaMode::Auto
        );
    }
}
