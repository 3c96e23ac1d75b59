// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Format table for the OpenCL-class backend.
//!
//! An OpenCL image format is a (channel order, channel data type) pair. There are no compressed
//! formats, and 3-channel orders only exist for packed data types.

use super::ImageFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ClChannelOrder(pub u32);

impl ClChannelOrder {
    pub const R: ClChannelOrder = ClChannelOrder(0x10B0);
    pub const RG: ClChannelOrder = ClChannelOrder(0x10B2);
    pub const RGB: ClChannelOrder = ClChannelOrder(0x10B4);
    pub const RGBA: ClChannelOrder = ClChannelOrder(0x10B5);
    pub const BGRA: ClChannelOrder = ClChannelOrder(0x10B6);
    pub const DEPTH: ClChannelOrder = ClChannelOrder(0x10BD);
    pub const DEPTH_STENCIL: ClChannelOrder = ClChannelOrder(0x10BE);
    pub const SRGBA: ClChannelOrder = ClChannelOrder(0x10C1);
    pub const SBGRA: ClChannelOrder = ClChannelOrder(0x10C2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ClChannelType(pub u32);

impl ClChannelType {
    pub const SNORM_INT8: ClChannelType = ClChannelType(0x10D0);
    pub const SNORM_INT16: ClChannelType = ClChannelType(0x10D1);
    pub const UNORM_INT8: ClChannelType = ClChannelType(0x10D2);
    pub const UNORM_INT16: ClChannelType = ClChannelType(0x10D3);
    pub const UNORM_SHORT_565: ClChannelType = ClChannelType(0x10D4);
    pub const UNORM_SHORT_555: ClChannelType = ClChannelType(0x10D5);
    pub const UNORM_INT_101010: ClChannelType = ClChannelType(0x10D6);
    pub const SIGNED_INT8: ClChannelType = ClChannelType(0x10D7);
    pub const SIGNED_INT16: ClChannelType = ClChannelType(0x10D8);
    pub const SIGNED_INT32: ClChannelType = ClChannelType(0x10D9);
    pub const UNSIGNED_INT8: ClChannelType = ClChannelType(0x10DA);
    pub const UNSIGNED_INT16: ClChannelType = ClChannelType(0x10DB);
    pub const UNSIGNED_INT32: ClChannelType = ClChannelType(0x10DC);
    pub const HALF_FLOAT: ClChannelType = ClChannelType(0x10DD);
    pub const FLOAT: ClChannelType = ClChannelType(0x10DE);
    pub const UNORM_INT24: ClChannelType = ClChannelType(0x10DF);
    pub const UNORM_INT_101010_2: ClChannelType = ClChannelType(0x10E0);
}

/// `cl_image_format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClImageFormat {
    pub order: ClChannelOrder,
    pub data_type: ClChannelType,
}

const fn cl(order: ClChannelOrder, data_type: ClChannelType) -> ClImageFormat {
    ClImageFormat { order, data_type }
}

use ClChannelOrder as O;
use ClChannelType as T;

static TABLE: &[(ImageFormat, ClImageFormat)] = &[
    (ImageFormat::R8, cl(O::R, T::UNORM_INT8)),
    (ImageFormat::RG8, cl(O::RG, T::UNORM_INT8)),
    (ImageFormat::RGBA8, cl(O::RGBA, T::UNORM_INT8)),
    (ImageFormat::BGRA8, cl(O::BGRA, T::UNORM_INT8)),
    (ImageFormat::RGBA8_SRGB, cl(O::SRGBA, T::UNORM_INT8)),
    (ImageFormat::BGRA8_SRGB, cl(O::SBGRA, T::UNORM_INT8)),
    (ImageFormat::R16, cl(O::R, T::UNORM_INT16)),
    (ImageFormat::RG16, cl(O::RG, T::UNORM_INT16)),
    (ImageFormat::RGBA16, cl(O::RGBA, T::UNORM_INT16)),
    (ImageFormat::R8_SNORM, cl(O::R, T::SNORM_INT8)),
    (ImageFormat::RG8_SNORM, cl(O::RG, T::SNORM_INT8)),
    (ImageFormat::RGBA8_SNORM, cl(O::RGBA, T::SNORM_INT8)),
    (ImageFormat::R16_SNORM, cl(O::R, T::SNORM_INT16)),
    (ImageFormat::RG16_SNORM, cl(O::RG, T::SNORM_INT16)),
    (ImageFormat::RGBA16_SNORM, cl(O::RGBA, T::SNORM_INT16)),
    (ImageFormat::R8UI, cl(O::R, T::UNSIGNED_INT8)),
    (ImageFormat::RG8UI, cl(O::RG, T::UNSIGNED_INT8)),
    (ImageFormat::RGBA8UI, cl(O::RGBA, T::UNSIGNED_INT8)),
    (ImageFormat::R16UI, cl(O::R, T::UNSIGNED_INT16)),
    (ImageFormat::RG16UI, cl(O::RG, T::UNSIGNED_INT16)),
    (ImageFormat::RGBA16UI, cl(O::RGBA, T::UNSIGNED_INT16)),
    (ImageFormat::R32UI, cl(O::R, T::UNSIGNED_INT32)),
    (ImageFormat::RG32UI, cl(O::RG, T::UNSIGNED_INT32)),
    (ImageFormat::RGBA32UI, cl(O::RGBA, T::UNSIGNED_INT32)),
    (ImageFormat::R8I, cl(O::R, T::SIGNED_INT8)),
    (ImageFormat::RG8I, cl(O::RG, T::SIGNED_INT8)),
    (ImageFormat::RGBA8I, cl(O::RGBA, T::SIGNED_INT8)),
    (ImageFormat::R16I, cl(O::R, T::SIGNED_INT16)),
    (ImageFormat::RG16I, cl(O::RG, T::SIGNED_INT16)),
    (ImageFormat::RGBA16I, cl(O::RGBA, T::SIGNED_INT16)),
    (ImageFormat::R32I, cl(O::R, T::SIGNED_INT32)),
    (ImageFormat::RG32I, cl(O::RG, T::SIGNED_INT32)),
    (ImageFormat::RGBA32I, cl(O::RGBA, T::SIGNED_INT32)),
    (ImageFormat::R16F, cl(O::R, T::HALF_FLOAT)),
    (ImageFormat::RG16F, cl(O::RG, T::HALF_FLOAT)),
    (ImageFormat::RGBA16F, cl(O::RGBA, T::HALF_FLOAT)),
    (ImageFormat::R32F, cl(O::R, T::FLOAT)),
    (ImageFormat::RG32F, cl(O::RG, T::FLOAT)),
    (ImageFormat::RGBA32F, cl(O::RGBA, T::FLOAT)),
    (ImageFormat::R5G6B5, cl(O::RGB, T::UNORM_SHORT_565)),
    (ImageFormat::RGB5, cl(O::RGB, T::UNORM_SHORT_555)),
    (ImageFormat::RGB10, cl(O::RGB, T::UNORM_INT_101010)),
    (ImageFormat::RGB10A2, cl(O::RGBA, T::UNORM_INT_101010_2)),
    (ImageFormat::D16, cl(O::DEPTH, T::UNORM_INT16)),
    (ImageFormat::D24, cl(O::DEPTH, T::UNORM_INT24)),
    (ImageFormat::D32F, cl(O::DEPTH, T::FLOAT)),
    (ImageFormat::DS24_8, cl(O::DEPTH_STENCIL, T::UNORM_INT24)),
    (ImageFormat::DS32F_8, cl(O::DEPTH_STENCIL, T::FLOAT)),
];

pub fn entries() -> &'static [(ImageFormat, ClImageFormat)] {
    TABLE
}

pub fn native_from_format(format: ImageFormat) -> Option<ClImageFormat> {
    super::native_in(TABLE, format)
}

pub fn format_from_native(native: ClImageFormat) -> Option<ImageFormat> {
    super::format_in(TABLE, native)
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
                Some(format.table_key()),
                "{}",
                format
            );
        }
    }

    #[test]
    fn compressed_is_unsupported() {
        assert_eq!(native_from_format(ImageFormat::BC1_RGBA), None);
        assert_eq!(
            format_from_native(cl(O::RGB, T::UNORM_INT8)),
            None,
            "plain 8-bit RGB is not a valid OpenCL format"
        );
    }
}
