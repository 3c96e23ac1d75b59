// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Format table for the explicit (Vulkan-class) backend.
//!
//! Three-channel 8/16/32-bit formats are deliberately absent: storage-image support for them is
//! spotty across drivers, so images requesting them are stored as their 4-channel variant
//! (see [`crate::pixel_formats::resolve_storage`]).

use super::ImageFormat;

/// A raw `VkFormat` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct VkFormat(pub i32);

impl VkFormat {
    pub const UNDEFINED: VkFormat = VkFormat(0);
    pub const R5G6B5_UNORM_PACK16: VkFormat = VkFormat(4);
    pub const B5G6R5_UNORM_PACK16: VkFormat = VkFormat(5);
    pub const R5G5B5A1_UNORM_PACK16: VkFormat = VkFormat(6);
    pub const R8_UNORM: VkFormat = VkFormat(9);
    pub const R8_SNORM: VkFormat = VkFormat(10);
    pub const R8_UINT: VkFormat = VkFormat(13);
    pub const R8_SINT: VkFormat = VkFormat(14);
    pub const R8G8_UNORM: VkFormat = VkFormat(16);
    pub const R8G8_SNORM: VkFormat = VkFormat(17);
    pub const R8G8_UINT: VkFormat = VkFormat(20);
    pub const R8G8_SINT: VkFormat = VkFormat(21);
    pub const R8G8B8A8_UNORM: VkFormat = VkFormat(37);
    pub const R8G8B8A8_SNORM: VkFormat = VkFormat(38);
    pub const R8G8B8A8_UINT: VkFormat = VkFormat(41);
    pub const R8G8B8A8_SINT: VkFormat = VkFormat(42);
    pub const R8G8B8A8_SRGB: VkFormat = VkFormat(43);
    pub const B8G8R8A8_UNORM: VkFormat = VkFormat(44);
    pub const B8G8R8A8_SRGB: VkFormat = VkFormat(50);
    pub const A2R10G10B10_UNORM_PACK32: VkFormat = VkFormat(58);
    pub const A2B10G10R10_UNORM_PACK32: VkFormat = VkFormat(64);
    pub const A2B10G10R10_UINT_PACK32: VkFormat = VkFormat(68);
    pub const R16_UNORM: VkFormat = VkFormat(70);
    pub const R16_SNORM: VkFormat = VkFormat(71);
    pub const R16_UINT: VkFormat = VkFormat(74);
    pub const R16_SINT: VkFormat = VkFormat(75);
    pub const R16_SFLOAT: VkFormat = VkFormat(76);
    pub const R16G16_UNORM: VkFormat = VkFormat(77);
    pub const R16G16_SNORM: VkFormat = VkFormat(78);
    pub const R16G16_UINT: VkFormat = VkFormat(81);
    pub const R16G16_SINT: VkFormat = VkFormat(82);
    pub const R16G16_SFLOAT: VkFormat = VkFormat(83);
    pub const R16G16B16A16_UNORM: VkFormat = VkFormat(91);
    pub const R16G16B16A16_SNORM: VkFormat = VkFormat(92);
    pub const R16G16B16A16_UINT: VkFormat = VkFormat(95);
    pub const R16G16B16A16_SINT: VkFormat = VkFormat(96);
    pub const R16G16B16A16_SFLOAT: VkFormat = VkFormat(97);
    pub const R32_UINT: VkFormat = VkFormat(98);
    pub const R32_SINT: VkFormat = VkFormat(99);
    pub const R32_SFLOAT: VkFormat = VkFormat(100);
    pub const R32G32_UINT: VkFormat = VkFormat(101);
    pub const R32G32_SINT: VkFormat = VkFormat(102);
    pub const R32G32_SFLOAT: VkFormat = VkFormat(103);
    pub const R32G32B32A32_UINT: VkFormat = VkFormat(107);
    pub const R32G32B32A32_SINT: VkFormat = VkFormat(108);
    pub const R32G32B32A32_SFLOAT: VkFormat = VkFormat(109);
    pub const R64_SFLOAT: VkFormat = VkFormat(112);
    pub const B10G11R11_UFLOAT_PACK32: VkFormat = VkFormat(122);
    pub const E5B9G9R9_UFLOAT_PACK32: VkFormat = VkFormat(123);
    pub const D16_UNORM: VkFormat = VkFormat(124);
    pub const X8_D24_UNORM_PACK32: VkFormat = VkFormat(125);
    pub const D32_SFLOAT: VkFormat = VkFormat(126);
    pub const D16_UNORM_S8_UINT: VkFormat = VkFormat(128);
    pub const D24_UNORM_S8_UINT: VkFormat = VkFormat(129);
    pub const D32_SFLOAT_S8_UINT: VkFormat = VkFormat(130);
    pub const BC1_RGB_UNORM_BLOCK: VkFormat = VkFormat(131);
    pub const BC1_RGB_SRGB_BLOCK: VkFormat = VkFormat(132);
    pub const BC1_RGBA_UNORM_BLOCK: VkFormat = VkFormat(133);
    pub const BC1_RGBA_SRGB_BLOCK: VkFormat = VkFormat(134);
    pub const BC2_UNORM_BLOCK: VkFormat = VkFormat(135);
    pub const BC2_SRGB_BLOCK: VkFormat = VkFormat(136);
    pub const BC3_UNORM_BLOCK: VkFormat = VkFormat(137);
    pub const BC3_SRGB_BLOCK: VkFormat = VkFormat(138);
    pub const BC4_UNORM_BLOCK: VkFormat = VkFormat(139);
    pub const BC4_SNORM_BLOCK: VkFormat = VkFormat(140);
    pub const BC5_UNORM_BLOCK: VkFormat = VkFormat(141);
    pub const BC5_SNORM_BLOCK: VkFormat = VkFormat(142);
    pub const BC6H_SFLOAT_BLOCK: VkFormat = VkFormat(144);
    pub const BC7_UNORM_BLOCK: VkFormat = VkFormat(145);
    pub const BC7_SRGB_BLOCK: VkFormat = VkFormat(146);
    pub const ETC2_R8G8B8_UNORM_BLOCK: VkFormat = VkFormat(147);
    pub const ETC2_R8G8B8_SRGB_BLOCK: VkFormat = VkFormat(148);
    pub const ETC2_R8G8B8A8_UNORM_BLOCK: VkFormat = VkFormat(151);
    pub const ETC2_R8G8B8A8_SRGB_BLOCK: VkFormat = VkFormat(152);
    pub const EAC_R11_UNORM_BLOCK: VkFormat = VkFormat(153);
    pub const EAC_R11_SNORM_BLOCK: VkFormat = VkFormat(154);
    pub const EAC_R11G11_UNORM_BLOCK: VkFormat = VkFormat(155);
    pub const EAC_R11G11_SNORM_BLOCK: VkFormat = VkFormat(156);
    pub const ASTC_4X4_UNORM_BLOCK: VkFormat = VkFormat(157);
    pub const ASTC_4X4_SRGB_BLOCK: VkFormat = VkFormat(158);
    pub const PVRTC1_2BPP_UNORM_BLOCK_IMG: VkFormat = VkFormat(1000054000);
    pub const PVRTC1_4BPP_UNORM_BLOCK_IMG: VkFormat = VkFormat(1000054001);
    pub const PVRTC1_2BPP_SRGB_BLOCK_IMG: VkFormat = VkFormat(1000054004);
    pub const PVRTC1_4BPP_SRGB_BLOCK_IMG: VkFormat = VkFormat(1000054005);
}

static TABLE: &[(ImageFormat, VkFormat)] = &[
    (ImageFormat::R8, VkFormat::R8_UNORM),
    (ImageFormat::RG8, VkFormat::R8G8_UNORM),
    (ImageFormat::RGBA8, VkFormat::R8G8B8A8_UNORM),
    (ImageFormat::RGBA8_SRGB, VkFormat::R8G8B8A8_SRGB),
    (ImageFormat::BGRA8, VkFormat::B8G8R8A8_UNORM),
    (ImageFormat::BGRA8_SRGB, VkFormat::B8G8R8A8_SRGB),
    (ImageFormat::R16, VkFormat::R16_UNORM),
    (ImageFormat::RG16, VkFormat::R16G16_UNORM),
    (ImageFormat::RGBA16, VkFormat::R16G16B16A16_UNORM),
    (ImageFormat::R8_SNORM, VkFormat::R8_SNORM),
    (ImageFormat::RG8_SNORM, VkFormat::R8G8_SNORM),
    (ImageFormat::RGBA8_SNORM, VkFormat::R8G8B8A8_SNORM),
    (ImageFormat::R16_SNORM, VkFormat::R16_SNORM),
    (ImageFormat::RG16_SNORM, VkFormat::R16G16_SNORM),
    (ImageFormat::RGBA16_SNORM, VkFormat::R16G16B16A16_SNORM),
    (ImageFormat::R8UI, VkFormat::R8_UINT),
    (ImageFormat::RG8UI, VkFormat::R8G8_UINT),
    (ImageFormat::RGBA8UI, VkFormat::R8G8B8A8_UINT),
    (ImageFormat::R16UI, VkFormat::R16_UINT),
    (ImageFormat::RG16UI, VkFormat::R16G16_UINT),
    (ImageFormat::RGBA16UI, VkFormat::R16G16B16A16_UINT),
    (ImageFormat::R32UI, VkFormat::R32_UINT),
    (ImageFormat::RG32UI, VkFormat::R32G32_UINT),
    (ImageFormat::RGBA32UI, VkFormat::R32G32B32A32_UINT),
    (ImageFormat::R8I, VkFormat::R8_SINT),
    (ImageFormat::RG8I, VkFormat::R8G8_SINT),
    (ImageFormat::RGBA8I, VkFormat::R8G8B8A8_SINT),
    (ImageFormat::R16I, VkFormat::R16_SINT),
    (ImageFormat::RG16I, VkFormat::R16G16_SINT),
    (ImageFormat::RGBA16I, VkFormat::R16G16B16A16_SINT),
    (ImageFormat::R32I, VkFormat::R32_SINT),
    (ImageFormat::RG32I, VkFormat::R32G32_SINT),
    (ImageFormat::RGBA32I, VkFormat::R32G32B32A32_SINT),
    (ImageFormat::R16F, VkFormat::R16_SFLOAT),
    (ImageFormat::RG16F, VkFormat::R16G16_SFLOAT),
    (ImageFormat::RGBA16F, VkFormat::R16G16B16A16_SFLOAT),
    (ImageFormat::R32F, VkFormat::R32_SFLOAT),
    (ImageFormat::RG32F, VkFormat::R32G32_SFLOAT),
    (ImageFormat::RGBA32F, VkFormat::R32G32B32A32_SFLOAT),
    (ImageFormat::R64F, VkFormat::R64_SFLOAT),
    (ImageFormat::R5G6B5, VkFormat::R5G6B5_UNORM_PACK16),
    (ImageFormat::B5G6R5, VkFormat::B5G6R5_UNORM_PACK16),
    (ImageFormat::RGB5A1, VkFormat::R5G5B5A1_UNORM_PACK16),
    (ImageFormat::RGB10A2, VkFormat::A2B10G10R10_UNORM_PACK32),
    (ImageFormat::BGR10A2, VkFormat::A2R10G10B10_UNORM_PACK32),
    (ImageFormat::RGB10A2UI, VkFormat::A2B10G10R10_UINT_PACK32),
    (ImageFormat::RG11B10F, VkFormat::B10G11R11_UFLOAT_PACK32),
    (ImageFormat::RGB9E5F, VkFormat::E5B9G9R9_UFLOAT_PACK32),
    (ImageFormat::D16, VkFormat::D16_UNORM),
    (ImageFormat::D24, VkFormat::X8_D24_UNORM_PACK32),
    (ImageFormat::D32F, VkFormat::D32_SFLOAT),
    (ImageFormat::DS16_8, VkFormat::D16_UNORM_S8_UINT),
    (ImageFormat::DS24_8, VkFormat::D24_UNORM_S8_UINT),
    (ImageFormat::DS32F_8, VkFormat::D32_SFLOAT_S8_UINT),
    (ImageFormat::BC1_RGB, VkFormat::BC1_RGB_UNORM_BLOCK),
    (ImageFormat::BC1_RGB_SRGB, VkFormat::BC1_RGB_SRGB_BLOCK),
    (ImageFormat::BC1_RGBA, VkFormat::BC1_RGBA_UNORM_BLOCK),
    (ImageFormat::BC1_RGBA_SRGB, VkFormat::BC1_RGBA_SRGB_BLOCK),
    (ImageFormat::BC2_RGBA, VkFormat::BC2_UNORM_BLOCK),
    (ImageFormat::BC2_RGBA_SRGB, VkFormat::BC2_SRGB_BLOCK),
    (ImageFormat::BC3_RGBA, VkFormat::BC3_UNORM_BLOCK),
    (ImageFormat::BC3_RGBA_SRGB, VkFormat::BC3_SRGB_BLOCK),
    (ImageFormat::BC4_R, VkFormat::BC4_UNORM_BLOCK),
    (ImageFormat::BC4_R_SNORM, VkFormat::BC4_SNORM_BLOCK),
    (ImageFormat::BC5_RG, VkFormat::BC5_UNORM_BLOCK),
    (ImageFormat::BC5_RG_SNORM, VkFormat::BC5_SNORM_BLOCK),
    (ImageFormat::BC6H_RGBF, VkFormat::BC6H_SFLOAT_BLOCK),
    (ImageFormat::BC7_RGBA, VkFormat::BC7_UNORM_BLOCK),
    (ImageFormat::BC7_RGBA_SRGB, VkFormat::BC7_SRGB_BLOCK),
    (ImageFormat::ETC2_RGB8, VkFormat::ETC2_R8G8B8_UNORM_BLOCK),
    (ImageFormat::ETC2_RGB8_SRGB, VkFormat::ETC2_R8G8B8_SRGB_BLOCK),
    (ImageFormat::ETC2_RGBA8, VkFormat::ETC2_R8G8B8A8_UNORM_BLOCK),
    (ImageFormat::ETC2_RGBA8_SRGB, VkFormat::ETC2_R8G8B8A8_SRGB_BLOCK),
    (ImageFormat::EAC_R11, VkFormat::EAC_R11_UNORM_BLOCK),
    (ImageFormat::EAC_R11_SNORM, VkFormat::EAC_R11_SNORM_BLOCK),
    (ImageFormat::EAC_RG11, VkFormat::EAC_R11G11_UNORM_BLOCK),
    (ImageFormat::EAC_RG11_SNORM, VkFormat::EAC_R11G11_SNORM_BLOCK),
    (ImageFormat::ASTC_4X4_RGBA, VkFormat::ASTC_4X4_UNORM_BLOCK),
    (ImageFormat::ASTC_4X4_RGBA_SRGB, VkFormat::ASTC_4X4_SRGB_BLOCK),
    (ImageFormat::PVRTC_RGBA2, VkFormat::PVRTC1_2BPP_UNORM_BLOCK_IMG),
    (ImageFormat::PVRTC_RGBA4, VkFormat::PVRTC1_4BPP_UNORM_BLOCK_IMG),
    (ImageFormat::PVRTC_RGBA2_SRGB, VkFormat::PVRTC1_2BPP_SRGB_BLOCK_IMG),
    (ImageFormat::PVRTC_RGBA4_SRGB, VkFormat::PVRTC1_4BPP_SRGB_BLOCK_IMG),
];

/// Every (descriptor, native) pair known to this backend.
pub fn entries() -> &'static [(ImageFormat, VkFormat)] {
    TABLE
}

pub fn native_from_format(format: ImageFormat) -> Option<VkFormat> {
    super::native_in(TABLE, format)
}

/// The table-key fields of the descriptor for `native`, or `None` for formats this crate
/// does not know about.
pub fn format_from_native(native: VkFormat) -> Option<ImageFormat> {
    super::format_in(TABLE, native)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_formats::resolve_storage;

    #[test]
    fn round_trip() {
        for (format, native) in entries() {
            assert_eq!(native_from_format(*format), Some(*native), "{}", format);
            let back = format_from_native(*native).expect("known native");
            assert_eq!(back.table_key(), format.table_key());
        }
    }

    #[test]
    fn unknown_native_is_rejected() {
        assert_eq!(format_from_native(VkFormat::UNDEFINED), None);
        assert_eq!(format_from_native(VkFormat(23)), None);
    }

    #[test]
    fn rgb_uses_rgba_storage() {
        let format = ImageFormat::IMAGE_2D | ImageFormat::RGB8;
        assert_eq!(native_from_format(format), None);
        let (storage, native) = resolve_storage(format, native_from_format).unwrap();
        assert_eq!(native, VkFormat::R8G8B8A8_UNORM);
        assert_eq!(storage, ImageFormat::IMAGE_2D | ImageFormat::RGBA8);
        //packed 3-channel formats exist natively
        let format = ImageFormat::IMAGE_2D | ImageFormat::R5G6B5;
        let (storage, _) = resolve_storage(format, native_from_format).unwrap();
        assert_eq!(storage, format);
    }
}
