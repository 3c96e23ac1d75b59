// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Format table for the Metal-class backend.

use super::ImageFormat;

/// A raw `MTLPixelFormat` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MtlPixelFormat(pub u64);

impl MtlPixelFormat {
    pub const INVALID: MtlPixelFormat = MtlPixelFormat(0);
    pub const R8_UNORM: MtlPixelFormat = MtlPixelFormat(10);
    pub const R8_SNORM: MtlPixelFormat = MtlPixelFormat(12);
    pub const R8_UINT: MtlPixelFormat = MtlPixelFormat(13);
    pub const R8_SINT: MtlPixelFormat = MtlPixelFormat(14);
    pub const R16_UNORM: MtlPixelFormat = MtlPixelFormat(20);
    pub const R16_SNORM: MtlPixelFormat = MtlPixelFormat(22);
    pub const R16_UINT: MtlPixelFormat = MtlPixelFormat(23);
    pub const R16_SINT: MtlPixelFormat = MtlPixelFormat(24);
    pub const R16_FLOAT: MtlPixelFormat = MtlPixelFormat(25);
    pub const RG8_UNORM: MtlPixelFormat = MtlPixelFormat(30);
    pub const RG8_SNORM: MtlPixelFormat = MtlPixelFormat(32);
    pub const RG8_UINT: MtlPixelFormat = MtlPixelFormat(33);
    pub const RG8_SINT: MtlPixelFormat = MtlPixelFormat(34);
    pub const B5G6R5_UNORM: MtlPixelFormat = MtlPixelFormat(40);
    pub const BGR5A1_UNORM: MtlPixelFormat = MtlPixelFormat(43);
    pub const R32_UINT: MtlPixelFormat = MtlPixelFormat(53);
    pub const R32_SINT: MtlPixelFormat = MtlPixelFormat(54);
    pub const R32_FLOAT: MtlPixelFormat = MtlPixelFormat(55);
    pub const RG16_UNORM: MtlPixelFormat = MtlPixelFormat(60);
    pub const RG16_SNORM: MtlPixelFormat = MtlPixelFormat(62);
    pub const RG16_UINT: MtlPixelFormat = MtlPixelFormat(63);
    pub const RG16_SINT: MtlPixelFormat = MtlPixelFormat(64);
    pub const RG16_FLOAT: MtlPixelFormat = MtlPixelFormat(65);
    pub const RGBA8_UNORM: MtlPixelFormat = MtlPixelFormat(70);
    pub const RGBA8_UNORM_SRGB: MtlPixelFormat = MtlPixelFormat(71);
    pub const RGBA8_SNORM: MtlPixelFormat = MtlPixelFormat(72);
    pub const RGBA8_UINT: MtlPixelFormat = MtlPixelFormat(73);
    pub const RGBA8_SINT: MtlPixelFormat = MtlPixelFormat(74);
    pub const BGRA8_UNORM: MtlPixelFormat = MtlPixelFormat(80);
    pub const BGRA8_UNORM_SRGB: MtlPixelFormat = MtlPixelFormat(81);
    pub const RGB10A2_UNORM: MtlPixelFormat = MtlPixelFormat(90);
    pub const RGB10A2_UINT: MtlPixelFormat = MtlPixelFormat(91);
    pub const RG11B10_FLOAT: MtlPixelFormat = MtlPixelFormat(92);
    pub const RGB9E5_FLOAT: MtlPixelFormat = MtlPixelFormat(93);
    pub const BGR10A2_UNORM: MtlPixelFormat = MtlPixelFormat(94);
    pub const RG32_UINT: MtlPixelFormat = MtlPixelFormat(103);
    pub const RG32_SINT: MtlPixelFormat = MtlPixelFormat(104);
    pub const RG32_FLOAT: MtlPixelFormat = MtlPixelFormat(105);
    pub const RGBA16_UNORM: MtlPixelFormat = MtlPixelFormat(110);
    pub const RGBA16_SNORM: MtlPixelFormat = MtlPixelFormat(112);
    pub const RGBA16_UINT: MtlPixelFormat = MtlPixelFormat(113);
    pub const RGBA16_SINT: MtlPixelFormat = MtlPixelFormat(114);
    pub const RGBA16_FLOAT: MtlPixelFormat = MtlPixelFormat(115);
    pub const RGBA32_UINT: MtlPixelFormat = MtlPixelFormat(123);
    pub const RGBA32_SINT: MtlPixelFormat = MtlPixelFormat(124);
    pub const RGBA32_FLOAT: MtlPixelFormat = MtlPixelFormat(125);
    pub const BC1_RGBA: MtlPixelFormat = MtlPixelFormat(130);
    pub const BC1_RGBA_SRGB: MtlPixelFormat = MtlPixelFormat(131);
    pub const BC2_RGBA: MtlPixelFormat = MtlPixelFormat(132);
    pub const BC2_RGBA_SRGB: MtlPixelFormat = MtlPixelFormat(133);
    pub const BC3_RGBA: MtlPixelFormat = MtlPixelFormat(134);
    pub const BC3_RGBA_SRGB: MtlPixelFormat = MtlPixelFormat(135);
    pub const BC4_R_UNORM: MtlPixelFormat = MtlPixelFormat(140);
    pub const BC4_R_SNORM: MtlPixelFormat = MtlPixelFormat(141);
    pub const BC5_RG_UNORM: MtlPixelFormat = MtlPixelFormat(142);
    pub const BC5_RG_SNORM: MtlPixelFormat = MtlPixelFormat(143);
    pub const BC6H_RGB_FLOAT: MtlPixelFormat = MtlPixelFormat(150);
    pub const BC7_RGBA_UNORM: MtlPixelFormat = MtlPixelFormat(152);
    pub const BC7_RGBA_UNORM_SRGB: MtlPixelFormat = MtlPixelFormat(153);
    pub const PVRTC_RGB_2BPP: MtlPixelFormat = MtlPixelFormat(160);
    pub const PVRTC_RGB_4BPP: MtlPixelFormat = MtlPixelFormat(162);
    pub const PVRTC_RGBA_2BPP: MtlPixelFormat = MtlPixelFormat(164);
    pub const PVRTC_RGBA_2BPP_SRGB: MtlPixelFormat = MtlPixelFormat(165);
    pub const PVRTC_RGBA_4BPP: MtlPixelFormat = MtlPixelFormat(166);
    pub const PVRTC_RGBA_4BPP_SRGB: MtlPixelFormat = MtlPixelFormat(167);
    pub const EAC_R11_UNORM: MtlPixelFormat = MtlPixelFormat(170);
    pub const EAC_R11_SNORM: MtlPixelFormat = MtlPixelFormat(172);
    pub const EAC_RG11_UNORM: MtlPixelFormat = MtlPixelFormat(174);
    pub const EAC_RG11_SNORM: MtlPixelFormat = MtlPixelFormat(176);
    pub const EAC_RGBA8: MtlPixelFormat = MtlPixelFormat(178);
    pub const EAC_RGBA8_SRGB: MtlPixelFormat = MtlPixelFormat(179);
    pub const ETC2_RGB8: MtlPixelFormat = MtlPixelFormat(180);
    pub const ETC2_RGB8_SRGB: MtlPixelFormat = MtlPixelFormat(181);
    pub const ASTC_4X4_SRGB: MtlPixelFormat = MtlPixelFormat(186);
    pub const ASTC_4X4_LDR: MtlPixelFormat = MtlPixelFormat(204);
    pub const DEPTH16_UNORM: MtlPixelFormat = MtlPixelFormat(250);
    pub const DEPTH32_FLOAT: MtlPixelFormat = MtlPixelFormat(252);
    pub const DEPTH24_UNORM_STENCIL8: MtlPixelFormat = MtlPixelFormat(255);
    pub const DEPTH32_FLOAT_STENCIL8: MtlPixelFormat = MtlPixelFormat(260);
}

static TABLE: &[(ImageFormat, MtlPixelFormat)] = &[
    (ImageFormat::R8, MtlPixelFormat::R8_UNORM),
    (ImageFormat::R8_SNORM, MtlPixelFormat::R8_SNORM),
    (ImageFormat::R8UI, MtlPixelFormat::R8_UINT),
    (ImageFormat::R8I, MtlPixelFormat::R8_SINT),
    (ImageFormat::R16, MtlPixelFormat::R16_UNORM),
    (ImageFormat::R16_SNORM, MtlPixelFormat::R16_SNORM),
    (ImageFormat::R16UI, MtlPixelFormat::R16_UINT),
    (ImageFormat::R16I, MtlPixelFormat::R16_SINT),
    (ImageFormat::R16F, MtlPixelFormat::R16_FLOAT),
    (ImageFormat::RG8, MtlPixelFormat::RG8_UNORM),
    (ImageFormat::RG8_SNORM, MtlPixelFormat::RG8_SNORM),
    (ImageFormat::RG8UI, MtlPixelFormat::RG8_UINT),
    (ImageFormat::RG8I, MtlPixelFormat::RG8_SINT),
    (ImageFormat::B5G6R5, MtlPixelFormat::B5G6R5_UNORM),
    (ImageFormat::RGB5A1.with(super::ImageFlags::REVERSE), MtlPixelFormat::BGR5A1_UNORM),
    (ImageFormat::R32UI, MtlPixelFormat::R32_UINT),
    (ImageFormat::R32I, MtlPixelFormat::R32_SINT),
    (ImageFormat::R32F, MtlPixelFormat::R32_FLOAT),
    (ImageFormat::RG16, MtlPixelFormat::RG16_UNORM),
    (ImageFormat::RG16_SNORM, MtlPixelFormat::RG16_SNORM),
    (ImageFormat::RG16UI, MtlPixelFormat::RG16_UINT),
    (ImageFormat::RG16I, MtlPixelFormat::RG16_SINT),
    (ImageFormat::RG16F, MtlPixelFormat::RG16_FLOAT),
    (ImageFormat::RGBA8, MtlPixelFormat::RGBA8_UNORM),
    (ImageFormat::RGBA8_SRGB, MtlPixelFormat::RGBA8_UNORM_SRGB),
    (ImageFormat::RGBA8_SNORM, MtlPixelFormat::RGBA8_SNORM),
    (ImageFormat::RGBA8UI, MtlPixelFormat::RGBA8_UINT),
    (ImageFormat::RGBA8I, MtlPixelFormat::RGBA8_SINT),
    (ImageFormat::BGRA8, MtlPixelFormat::BGRA8_UNORM),
    (ImageFormat::BGRA8_SRGB, MtlPixelFormat::BGRA8_UNORM_SRGB),
    (ImageFormat::RGB10A2, MtlPixelFormat::RGB10A2_UNORM),
    (ImageFormat::RGB10A2UI, MtlPixelFormat::RGB10A2_UINT),
    (ImageFormat::RG11B10F, MtlPixelFormat::RG11B10_FLOAT),
    (ImageFormat::RGB9E5F, MtlPixelFormat::RGB9E5_FLOAT),
    (ImageFormat::BGR10A2, MtlPixelFormat::BGR10A2_UNORM),
    (ImageFormat::RG32UI, MtlPixelFormat::RG32_UINT),
    (ImageFormat::RG32I, MtlPixelFormat::RG32_SINT),
    (ImageFormat::RG32F, MtlPixelFormat::RG32_FLOAT),
    (ImageFormat::RGBA16, MtlPixelFormat::RGBA16_UNORM),
    (ImageFormat::RGBA16_SNORM, MtlPixelFormat::RGBA16_SNORM),
    (ImageFormat::RGBA16UI, MtlPixelFormat::RGBA16_UINT),
    (ImageFormat::RGBA16I, MtlPixelFormat::RGBA16_SINT),
    (ImageFormat::RGBA16F, MtlPixelFormat::RGBA16_FLOAT),
    (ImageFormat::RGBA32UI, MtlPixelFormat::RGBA32_UINT),
    (ImageFormat::RGBA32I, MtlPixelFormat::RGBA32_SINT),
    (ImageFormat::RGBA32F, MtlPixelFormat::RGBA32_FLOAT),
    (ImageFormat::BC1_RGBA, MtlPixelFormat::BC1_RGBA),
    (ImageFormat::BC1_RGBA_SRGB, MtlPixelFormat::BC1_RGBA_SRGB),
    (ImageFormat::BC2_RGBA, MtlPixelFormat::BC2_RGBA),
    (ImageFormat::BC2_RGBA_SRGB, MtlPixelFormat::BC2_RGBA_SRGB),
    (ImageFormat::BC3_RGBA, MtlPixelFormat::BC3_RGBA),
    (ImageFormat::BC3_RGBA_SRGB, MtlPixelFormat::BC3_RGBA_SRGB),
    (ImageFormat::BC4_R, MtlPixelFormat::BC4_R_UNORM),
    (ImageFormat::BC4_R_SNORM, MtlPixelFormat::BC4_R_SNORM),
    (ImageFormat::BC5_RG, MtlPixelFormat::BC5_RG_UNORM),
    (ImageFormat::BC5_RG_SNORM, MtlPixelFormat::BC5_RG_SNORM),
    (ImageFormat::BC6H_RGBF, MtlPixelFormat::BC6H_RGB_FLOAT),
    (ImageFormat::BC7_RGBA, MtlPixelFormat::BC7_RGBA_UNORM),
    (ImageFormat::BC7_RGBA_SRGB, MtlPixelFormat::BC7_RGBA_UNORM_SRGB),
    (ImageFormat::PVRTC_RGB2, MtlPixelFormat::PVRTC_RGB_2BPP),
    (ImageFormat::PVRTC_RGB4, MtlPixelFormat::PVRTC_RGB_4BPP),
    (ImageFormat::PVRTC_RGBA2, MtlPixelFormat::PVRTC_RGBA_2BPP),
    (ImageFormat::PVRTC_RGBA2_SRGB, MtlPixelFormat::PVRTC_RGBA_2BPP_SRGB),
    (ImageFormat::PVRTC_RGBA4, MtlPixelFormat::PVRTC_RGBA_4BPP),
    (ImageFormat::PVRTC_RGBA4_SRGB, MtlPixelFormat::PVRTC_RGBA_4BPP_SRGB),
    (ImageFormat::EAC_R11, MtlPixelFormat::EAC_R11_UNORM),
    (ImageFormat::EAC_R11_SNORM, MtlPixelFormat::EAC_R11_SNORM),
    (ImageFormat::EAC_RG11, MtlPixelFormat::EAC_RG11_UNORM),
    (ImageFormat::EAC_RG11_SNORM, MtlPixelFormat::EAC_RG11_SNORM),
    (ImageFormat::ETC2_RGBA8, MtlPixelFormat::EAC_RGBA8),
    (ImageFormat::ETC2_RGBA8_SRGB, MtlPixelFormat::EAC_RGBA8_SRGB),
    (ImageFormat::ETC2_RGB8, MtlPixelFormat::ETC2_RGB8),
    (ImageFormat::ETC2_RGB8_SRGB, MtlPixelFormat::ETC2_RGB8_SRGB),
    (ImageFormat::ASTC_4X4_RGBA, MtlPixelFormat::ASTC_4X4_LDR),
    (ImageFormat::ASTC_4X4_RGBA_SRGB, MtlPixelFormat::ASTC_4X4_SRGB),
    (ImageFormat::D16, MtlPixelFormat::DEPTH16_UNORM),
    (ImageFormat::D32F, MtlPixelFormat::DEPTH32_FLOAT),
    (ImageFormat::DS24_8, MtlPixelFormat::DEPTH24_UNORM_STENCIL8),
    (ImageFormat::DS32F_8, MtlPixelFormat::DEPTH32_FLOAT_STENCIL8),
];

pub fn entries() -> &'static [(ImageFormat, MtlPixelFormat)] {
    TABLE
}

pub fn native_from_format(format: ImageFormat) -> Option<MtlPixelFormat> {
    super::native_in(TABLE, format)
}

pub fn format_from_native(native: MtlPixelFormat) -> Option<ImageFormat> {
    super::format_in(TABLE, native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for (format, native) in entries() {
            assert_eq!(native_from_format(*format), Some(*native), "{}", format);
            assert_eq!(
                format_from_native(*native).map(|f| f.table_key()),
                Some(format.table_key())
            );
        }
        assert_eq!(format_from_native(MtlPixelFormat::INVALID), None);
    }

    #[test]
    fn no_three_channel_8_bit() {
        assert_eq!(native_from_format(ImageFormat::IMAGE_2D | ImageFormat::RGB8), None);
        assert_eq!(native_from_format(ImageFormat::IMAGE_2D | ImageFormat::RGB32F), None);
    }
}
