// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Format table for the CUDA-class backend.
//!
//! CUDA arrays describe a format as an element type plus a channel count of 1, 2 or 4.
//! Normalization uses the `*_INT8X*`/`*_INT16X*` element types, which fold the channel count into
//! the type. sRGB, reversed channel order and depth are not expressible.

use super::ImageFormat;

/// A raw `CUarray_format` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CuArrayFormat(pub u32);

impl CuArrayFormat {
    pub const UNSIGNED_INT8: CuArrayFormat = CuArrayFormat(0x01);
    pub const UNSIGNED_INT16: CuArrayFormat = CuArrayFormat(0x02);
    pub const UNSIGNED_INT32: CuArrayFormat = CuArrayFormat(0x03);
    pub const SIGNED_INT8: CuArrayFormat = CuArrayFormat(0x08);
    pub const SIGNED_INT16: CuArrayFormat = CuArrayFormat(0x09);
    pub const SIGNED_INT32: CuArrayFormat = CuArrayFormat(0x0a);
    pub const HALF: CuArrayFormat = CuArrayFormat(0x10);
    pub const FLOAT: CuArrayFormat = CuArrayFormat(0x20);
    pub const UNORM_INT8X1: CuArrayFormat = CuArrayFormat(0x40);
    pub const UNORM_INT8X2: CuArrayFormat = CuArrayFormat(0x41);
    pub const UNORM_INT8X4: CuArrayFormat = CuArrayFormat(0x42);
    pub const UNORM_INT16X1: CuArrayFormat = CuArrayFormat(0x43);
    pub const UNORM_INT16X2: CuArrayFormat = CuArrayFormat(0x44);
    pub const UNORM_INT16X4: CuArrayFormat = CuArrayFormat(0x45);
    pub const SNORM_INT8X1: CuArrayFormat = CuArrayFormat(0x46);
    pub const SNORM_INT8X2: CuArrayFormat = CuArrayFormat(0x47);
    pub const SNORM_INT8X4: CuArrayFormat = CuArrayFormat(0x48);
    pub const SNORM_INT16X1: CuArrayFormat = CuArrayFormat(0x49);
    pub const SNORM_INT16X2: CuArrayFormat = CuArrayFormat(0x4a);
    pub const SNORM_INT16X4: CuArrayFormat = CuArrayFormat(0x4b);
    pub const BC1_UNORM: CuArrayFormat = CuArrayFormat(0x91);
    pub const BC1_UNORM_SRGB: CuArrayFormat = CuArrayFormat(0x92);
    pub const BC2_UNORM: CuArrayFormat = CuArrayFormat(0x93);
    pub const BC2_UNORM_SRGB: CuArrayFormat = CuArrayFormat(0x94);
    pub const BC3_UNORM: CuArrayFormat = CuArrayFormat(0x95);
    pub const BC3_UNORM_SRGB: CuArrayFormat = CuArrayFormat(0x96);
    pub const BC4_UNORM: CuArrayFormat = CuArrayFormat(0x97);
    pub const BC4_SNORM: CuArrayFormat = CuArrayFormat(0x98);
    pub const BC5_UNORM: CuArrayFormat = CuArrayFormat(0x99);
    pub const BC5_SNORM: CuArrayFormat = CuArrayFormat(0x9a);
    pub const BC6H_SF16: CuArrayFormat = CuArrayFormat(0x9c);
    pub const BC7_UNORM: CuArrayFormat = CuArrayFormat(0x9d);
    pub const BC7_UNORM_SRGB: CuArrayFormat = CuArrayFormat(0x9e);
}

/// A CUDA array format: element type plus channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CudaFormat {
    pub array_format: CuArrayFormat,
    pub channels: u32,
}

const fn cu(array_format: CuArrayFormat, channels: u32) -> CudaFormat {
    CudaFormat {
        array_format,
        channels,
    }
}

static TABLE: &[(ImageFormat, CudaFormat)] = &[
    (ImageFormat::R8UI, cu(CuArrayFormat::UNSIGNED_INT8, 1)),
    (ImageFormat::RG8UI, cu(CuArrayFormat::UNSIGNED_INT8, 2)),
    (ImageFormat::RGBA8UI, cu(CuArrayFormat::UNSIGNED_INT8, 4)),
    (ImageFormat::R16UI, cu(CuArrayFormat::UNSIGNED_INT16, 1)),
    (ImageFormat::RG16UI, cu(CuArrayFormat::UNSIGNED_INT16, 2)),
    (ImageFormat::RGBA16UI, cu(CuArrayFormat::UNSIGNED_INT16, 4)),
    (ImageFormat::R32UI, cu(CuArrayFormat::UNSIGNED_INT32, 1)),
    (ImageFormat::RG32UI, cu(CuArrayFormat::UNSIGNED_INT32, 2)),
    (ImageFormat::RGBA32UI, cu(CuArrayFormat::UNSIGNED_INT32, 4)),
    (ImageFormat::R8I, cu(CuArrayFormat::SIGNED_INT8, 1)),
    (ImageFormat::RG8I, cu(CuArrayFormat::SIGNED_INT8, 2)),
    (ImageFormat::RGBA8I, cu(CuArrayFormat::SIGNED_INT8, 4)),
    (ImageFormat::R16I, cu(CuArrayFormat::SIGNED_INT16, 1)),
    (ImageFormat::RG16I, cu(CuArrayFormat::SIGNED_INT16, 2)),
    (ImageFormat::RGBA16I, cu(CuArrayFormat::SIGNED_INT16, 4)),
    (ImageFormat::R32I, cu(CuArrayFormat::SIGNED_INT32, 1)),
    (ImageFormat::RG32I, cu(CuArrayFormat::SIGNED_INT32, 2)),
    (ImageFormat::RGBA32I, cu(CuArrayFormat::SIGNED_INT32, 4)),
    (ImageFormat::R16F, cu(CuArrayFormat::HALF, 1)),
    (ImageFormat::RG16F, cu(CuArrayFormat::HALF, 2)),
    (ImageFormat::RGBA16F, cu(CuArrayFormat::HALF, 4)),
    (ImageFormat::R32F, cu(CuArrayFormat::FLOAT, 1)),
    (ImageFormat::RG32F, cu(CuArrayFormat::FLOAT, 2)),
    (ImageFormat::RGBA32F, cu(CuArrayFormat::FLOAT, 4)),
    (ImageFormat::R8, cu(CuArrayFormat::UNORM_INT8X1, 1)),
    (ImageFormat::RG8, cu(CuArrayFormat::UNORM_INT8X2, 2)),
    (ImageFormat::RGBA8, cu(CuArrayFormat::UNORM_INT8X4, 4)),
    (ImageFormat::R16, cu(CuArrayFormat::UNORM_INT16X1, 1)),
    (ImageFormat::RG16, cu(CuArrayFormat::UNORM_INT16X2, 2)),
    (ImageFormat::RGBA16, cu(CuArrayFormat::UNORM_INT16X4, 4)),
    (ImageFormat::R8_SNORM, cu(CuArrayFormat::SNORM_INT8X1, 1)),
    (ImageFormat::RG8_SNORM, cu(CuArrayFormat::SNORM_INT8X2, 2)),
    (ImageFormat::RGBA8_SNORM, cu(CuArrayFormat::SNORM_INT8X4, 4)),
    (ImageFormat::R16_SNORM, cu(CuArrayFormat::SNORM_INT16X1, 1)),
    (ImageFormat::RG16_SNORM, cu(CuArrayFormat::SNORM_INT16X2, 2)),
    (ImageFormat::RGBA16_SNORM, cu(CuArrayFormat::SNORM_INT16X4, 4)),
    (ImageFormat::BC1_RGBA, cu(CuArrayFormat::BC1_UNORM, 4)),
    (ImageFormat::BC1_RGBA_SRGB, cu(CuArrayFormat::BC1_UNORM_SRGB, 4)),
    (ImageFormat::BC2_RGBA, cu(CuArrayFormat::BC2_UNORM, 4)),
    (ImageFormat::BC2_RGBA_SRGB, cu(CuArrayFormat::BC2_UNORM_SRGB, 4)),
    (ImageFormat::BC3_RGBA, cu(CuArrayFormat::BC3_UNORM, 4)),
    (ImageFormat::BC3_RGBA_SRGB, cu(CuArrayFormat::BC3_UNORM_SRGB, 4)),
    (ImageFormat::BC4_R, cu(CuArrayFormat::BC4_UNORM, 1)),
    (ImageFormat::BC4_R_SNORM, cu(CuArrayFormat::BC4_SNORM, 1)),
    (ImageFormat::BC5_RG, cu(CuArrayFormat::BC5_UNORM, 2)),
    (ImageFormat::BC5_RG_SNORM, cu(CuArrayFormat::BC5_SNORM, 2)),
    (ImageFormat::BC6H_RGBF, cu(CuArrayFormat::BC6H_SF16, 3)),
    (ImageFormat::BC7_RGBA, cu(CuArrayFormat::BC7_UNORM, 4)),
    (ImageFormat::BC7_RGBA_SRGB, cu(CuArrayFormat::BC7_UNORM_SRGB, 4)),
];

pub fn entries() -> &'static [(ImageFormat, CudaFormat)] {
    TABLE
}

pub fn native_from_format(format: ImageFormat) -> Option<CudaFormat> {
    super::native_in(TABLE, format)
}

pub fn format_from_native(native: CudaFormat) -> Option<ImageFormat> {
    super::format_in(TABLE, native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for (format, native) in entries() {
            assert_eq!(native_from_format(*format), Some(*native));
            let back = format_from_native(*native).unwrap();
            assert_eq!(back.table_key(), format.table_key(), "{}", format);
        }
    }

    #[test]
    fn srgb_is_not_representable() {
        assert_eq!(native_from_format(ImageFormat::RGBA8_SRGB), None);
        assert_eq!(native_from_format(ImageFormat::BGRA8), None);
        //depth arrays are created from the scalar format by the caller
        assert_eq!(native_from_format(ImageFormat::D32F), None);
    }
}
