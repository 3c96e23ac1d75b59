// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Format table and texture-description helpers for wgpu.
//!
//! wgpu validates textures itself, so this module only has to produce the right descriptor
//! fields: format, dimension, extent and usages.

use super::{Dimensionality, ImageExtent, ImageFormat};
use crate::memory_flags::MemoryFlags;
use wgpu::{AstcBlock, AstcChannel, TextureFormat};

static TABLE: &[(ImageFormat, TextureFormat)] = &[
    (ImageFormat::R8, TextureFormat::R8Unorm),
    (ImageFormat::R8_SNORM, TextureFormat::R8Snorm),
    (ImageFormat::R8UI, TextureFormat::R8Uint),
    (ImageFormat::R8I, TextureFormat::R8Sint),
    (ImageFormat::R16, TextureFormat::R16Unorm),
    (ImageFormat::R16_SNORM, TextureFormat::R16Snorm),
    (ImageFormat::R16UI, TextureFormat::R16Uint),
    (ImageFormat::R16I, TextureFormat::R16Sint),
    (ImageFormat::R16F, TextureFormat::R16Float),
    (ImageFormat::RG8, TextureFormat::Rg8Unorm),
    (ImageFormat::RG8_SNORM, TextureFormat::Rg8Snorm),
    (ImageFormat::RG8UI, TextureFormat::Rg8Uint),
    (ImageFormat::RG8I, TextureFormat::Rg8Sint),
    (ImageFormat::R32UI, TextureFormat::R32Uint),
    (ImageFormat::R32I, TextureFormat::R32Sint),
    (ImageFormat::R32F, TextureFormat::R32Float),
    (ImageFormat::RG16, TextureFormat::Rg16Unorm),
    (ImageFormat::RG16_SNORM, TextureFormat::Rg16Snorm),
    (ImageFormat::RG16UI, TextureFormat::Rg16Uint),
    (ImageFormat::RG16I, TextureFormat::Rg16Sint),
    (ImageFormat::RG16F, TextureFormat::Rg16Float),
    (ImageFormat::RGBA8, TextureFormat::Rgba8Unorm),
    (ImageFormat::RGBA8_SRGB, TextureFormat::Rgba8UnormSrgb),
    (ImageFormat::RGBA8_SNORM, TextureFormat::Rgba8Snorm),
    (ImageFormat::RGBA8UI, TextureFormat::Rgba8Uint),
    (ImageFormat::RGBA8I, TextureFormat::Rgba8Sint),
    (ImageFormat::BGRA8, TextureFormat::Bgra8Unorm),
    (ImageFormat::BGRA8_SRGB, TextureFormat::Bgra8UnormSrgb),
    (ImageFormat::RGB9E5F, TextureFormat::Rgb9e5Ufloat),
    (ImageFormat::RGB10A2UI, TextureFormat::Rgb10a2Uint),
    (ImageFormat::RGB10A2, TextureFormat::Rgb10a2Unorm),
    (ImageFormat::RG32UI, TextureFormat::Rg32Uint),
    (ImageFormat::RG32I, TextureFormat::Rg32Sint),
    (ImageFormat::RG32F, TextureFormat::Rg32Float),
    (ImageFormat::RGBA16UI, TextureFormat::Rgba16Uint),
    (ImageFormat::RGBA16I, TextureFormat::Rgba16Sint),
    (ImageFormat::RGBA16, TextureFormat::Rgba16Unorm),
    (ImageFormat::RGBA16_SNORM, TextureFormat::Rgba16Snorm),
    (ImageFormat::RGBA16F, TextureFormat::Rgba16Float),
    (ImageFormat::RGBA32UI, TextureFormat::Rgba32Uint),
    (ImageFormat::RGBA32I, TextureFormat::Rgba32Sint),
    (ImageFormat::RGBA32F, TextureFormat::Rgba32Float),
    (ImageFormat::D16, TextureFormat::Depth16Unorm),
    (ImageFormat::D24, TextureFormat::Depth24Plus),
    (ImageFormat::D32F, TextureFormat::Depth32Float),
    (ImageFormat::DS24_8, TextureFormat::Depth24PlusStencil8),
    (ImageFormat::DS32F_8, TextureFormat::Depth32FloatStencil8),
    (ImageFormat::BC1_RGBA, TextureFormat::Bc1RgbaUnorm),
    (ImageFormat::BC1_RGBA_SRGB, TextureFormat::Bc1RgbaUnormSrgb),
    (ImageFormat::BC2_RGBA, TextureFormat::Bc2RgbaUnorm),
    (ImageFormat::BC2_RGBA_SRGB, TextureFormat::Bc2RgbaUnormSrgb),
    (ImageFormat::BC3_RGBA, TextureFormat::Bc3RgbaUnorm),
    (ImageFormat::BC3_RGBA_SRGB, TextureFormat::Bc3RgbaUnormSrgb),
    (ImageFormat::BC4_R, TextureFormat::Bc4RUnorm),
    (ImageFormat::BC4_R_SNORM, TextureFormat::Bc4RSnorm),
    (ImageFormat::BC5_RG, TextureFormat::Bc5RgUnorm),
    (ImageFormat::BC5_RG_SNORM, TextureFormat::Bc5RgSnorm),
    (ImageFormat::BC6H_RGBF, TextureFormat::Bc6hRgbFloat),
    (ImageFormat::BC7_RGBA, TextureFormat::Bc7RgbaUnorm),
    (ImageFormat::BC7_RGBA_SRGB, TextureFormat::Bc7RgbaUnormSrgb),
    (ImageFormat::ETC2_RGB8, TextureFormat::Etc2Rgb8Unorm),
    (ImageFormat::ETC2_RGB8_SRGB, TextureFormat::Etc2Rgb8UnormSrgb),
    (ImageFormat::ETC2_RGBA8, TextureFormat::Etc2Rgba8Unorm),
    (ImageFormat::ETC2_RGBA8_SRGB, TextureFormat::Etc2Rgba8UnormSrgb),
    (ImageFormat::EAC_R11, TextureFormat::EacR11Unorm),
    (ImageFormat::EAC_R11_SNORM, TextureFormat::EacR11Snorm),
    (ImageFormat::EAC_RG11, TextureFormat::EacRg11Unorm),
    (ImageFormat::EAC_RG11_SNORM, TextureFormat::EacRg11Snorm),
    (
        ImageFormat::ASTC_4X4_RGBA,
        TextureFormat::Astc {
            block: AstcBlock::B4x4,
            channel: AstcChannel::Unorm,
        },
    ),
    (
        ImageFormat::ASTC_4X4_RGBA_SRGB,
        TextureFormat::Astc {
            block: AstcBlock::B4x4,
            channel: AstcChannel::UnormSrgb,
        },
    ),
];

pub fn entries() -> &'static [(ImageFormat, TextureFormat)] {
    TABLE
}

pub fn native_from_format(format: ImageFormat) -> Option<TextureFormat> {
    super::native_in(TABLE, format)
}

pub fn format_from_native(native: TextureFormat) -> Option<ImageFormat> {
    super::format_in(TABLE, native)
}

/// The wgpu dimension for `format`; cube maps and arrays are 2D textures with layers.
pub fn texture_dimension(format: ImageFormat) -> Option<wgpu::TextureDimension> {
    match format.dimensionality()? {
        Dimensionality::D1 => Some(wgpu::TextureDimension::D1),
        Dimensionality::D2 => Some(wgpu::TextureDimension::D2),
        Dimensionality::D3 => Some(wgpu::TextureDimension::D3),
    }
}

/// Folds layers and cube faces into `depth_or_array_layers`.
pub fn extent(format: ImageFormat, extent: ImageExtent) -> wgpu::Extent3d {
    let depth_or_array_layers = match format.dimensionality() {
        Some(Dimensionality::D3) => extent.depth,
        _ => format.layer_count(extent),
    };
    wgpu::Extent3d {
        width: extent.width,
        height: if format.dimension_count() >= 2 {
            extent.height
        } else {
            1
        },
        depth_or_array_layers,
    }
}

/// Texture usages implied by the memory flags and shape of an image.
pub fn texture_usages(format: ImageFormat, flags: MemoryFlags) -> wgpu::TextureUsages {
    let mut usages = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
    if flags.contains(MemoryFlags::READ) {
        usages |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if flags.contains(MemoryFlags::WRITE) || flags.contains(MemoryFlags::GENERATE_MIP_MAPS) {
        usages |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if format.has_render_target() {
        usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    usages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for (format, native) in entries() {
            assert_eq!(native_from_format(*format), Some(*native));
            assert_eq!(
                format_from_native(*native).map(|f| f.table_key()),
                Some(format.table_key())
            );
        }
    }

    #[test]
    fn cube_extent_counts_faces() {
        let format = ImageFormat::IMAGE_CUBE_ARRAY | ImageFormat::RGBA8;
        let e = extent(format, ImageExtent::new_2d(32, 32).with_layers(2));
        assert_eq!(e.depth_or_array_layers, 12);
        assert_eq!(texture_dimension(format), Some(wgpu::TextureDimension::D2));
    }

    #[test]
    fn usages_follow_flags() {
        let format = ImageFormat::IMAGE_2D | ImageFormat::RGBA8;
        let usages = texture_usages(format, MemoryFlags::READ);
        assert!(usages.contains(wgpu::TextureUsages::TEXTURE_BINDING));
        assert!(!usages.contains(wgpu::TextureUsages::STORAGE_BINDING));
        let usages = texture_usages(format.union(ImageFormat::IMAGE_2D), MemoryFlags::READ_WRITE);
        assert!(usages.contains(wgpu::TextureUsages::STORAGE_BINDING));
    }
}
