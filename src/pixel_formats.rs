// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Bit-packed image format descriptors.
//!
//! Every image in kernels_and_images is described by a single [`ImageFormat`]: a 32-bit value
//! partitioned into non-overlapping sub-fields. The descriptor encodes:
//!
//! - Dimensionality (1D, 2D, 3D)
//! - Shape flags (array, buffer, multisample, cube, depth, stencil, mip-mapped, render target, ...)
//! - Channel count (1-4)
//! - Data class (signed integer, unsigned integer, float)
//! - Access qualifier (read, write, read-write)
//! - Compression family
//! - Format code, selecting the bit layout within a pixel
//!
//! All derived quantities (bits per pixel, per-channel widths, byte sizes for given extents)
//! are computed from the descriptor by `const fn`s. None of them are cached.
//!
//! # Layout
//!
//! | bits  | field          |
//! |-------|----------------|
//! | 0-5   | format code    |
//! | 6-9   | compression    |
//! | 10-11 | access         |
//! | 12-13 | data type      |
//! | 14-15 | channels - 1   |
//! | 16-17 | dimensionality |
//! | 18-31 | flags          |
//!
//! The layout is an ABI: the native format tables in [`vulkan`], [`metal`], [`cuda`], [`opencl`]
//! (and `wgpu`, behind the `backend_wgpu` feature) are keyed on it.
//!
//! # Examples
//!
//! ```
//! use kernels_and_images::pixel_formats::ImageFormat;
//!
//! let format = ImageFormat::IMAGE_2D | ImageFormat::RGBA8;
//! assert!(format.is_valid());
//! assert_eq!(format.bits_per_pixel(), 32);
//! assert_eq!(format.bytes_per_pixel(), 4);
//! ```
//!
//! ```
//! use kernels_and_images::pixel_formats::{ImageExtent, ImageFormat, ImageFlags};
//!
//! // six faces of 4 layers of 16x16 RGBA32F
//! let format = ImageFormat::IMAGE_CUBE_ARRAY | ImageFormat::RGBA32F;
//! let extent = ImageExtent::new_2d(16, 16).with_layers(4);
//! assert_eq!(format.total_byte_size(extent, 1), 16 * 16 * 16 * 4 * 6);
//! assert!(format.flags().contains(ImageFlags::CUBE | ImageFlags::ARRAY));
//! ```

/*
Quick note on type design.  The descriptor could be a struct of enums:

```rust
struct ImageFormat { dim: Dimensionality, channels: u8, data_type: DataType, /* ... */ }
```

That is nicer to read but it is not what the backends consume.  The native tables, the kernel
toolchain and serialized image headers all agree on one u32, so the u32 is the source of truth and
the enums are views onto it.  Raw arithmetic on the bits stays inside this module.
 */

pub mod cuda;
pub mod metal;
pub mod opencl;
pub mod vulkan;
#[cfg(feature = "backend_wgpu")]
pub mod wgpu;
pub(crate) mod convert;

pub use half::f16;

use std::fmt::{Debug, Display};
use std::ops::{BitOr, BitOrAssign};

const FORMAT_SHIFT: u32 = 0;
const FORMAT_MASK: u32 = 0x3F << FORMAT_SHIFT;
const COMPRESSION_SHIFT: u32 = 6;
const COMPRESSION_MASK: u32 = 0xF << COMPRESSION_SHIFT;
const ACCESS_SHIFT: u32 = 10;
const ACCESS_MASK: u32 = 0x3 << ACCESS_SHIFT;
const DATA_TYPE_SHIFT: u32 = 12;
const DATA_TYPE_MASK: u32 = 0x3 << DATA_TYPE_SHIFT;
const CHANNELS_SHIFT: u32 = 14;
const CHANNELS_MASK: u32 = 0x3 << CHANNELS_SHIFT;
const DIM_SHIFT: u32 = 16;
const DIM_MASK: u32 = 0x3 << DIM_SHIFT;

bitflags::bitflags! {
    /// Orthogonal shape flags stored in the upper bits of an [`ImageFormat`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageFlags: u32 {
        /// The image has array layers.
        const ARRAY = 1 << 18;
        /// Texel buffer rather than an image.
        const BUFFER = 1 << 19;
        /// Multisampled.
        const MSAA = 1 << 20;
        /// Cube map (6 faces per layer).
        const CUBE = 1 << 21;
        /// Depth format.
        const DEPTH = 1 << 22;
        /// Stencil format, always combined with [`ImageFlags::DEPTH`].
        const STENCIL = 1 << 23;
        /// Used as a color or depth attachment of a render pass.
        const RENDER_TARGET = 1 << 24;
        /// Carries a full mip chain.
        const MIPMAPPED = 1 << 25;
        /// Must not be bound with a sampler.
        const NO_SAMPLER = 1 << 27;
        /// Sampled with gather operations.
        const GATHER = 1 << 28;
        /// Integer channels are normalized to [0, 1] (unsigned) or [-1, 1] (signed).
        const NORMALIZED = 1 << 29;
        /// Channels are stored in reverse order (BGRA instead of RGBA).
        const REVERSE = 1 << 30;
        /// Color channels are sRGB encoded.
        const SRGB = 1 << 31;
    }
}

/// Number of spatial dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Dimensionality {
    D1 = 1,
    D2 = 2,
    D3 = 3,
}

/// Data class of each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DataType {
    Int = 1,
    UInt = 2,
    Float = 3,
}

/// Access qualifier of a kernel image parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Access {
    Read = 1,
    Write = 2,
    ReadWrite = 3,
}

/// Block-compression family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Compression {
    None = 0,
    Bc1 = 1,
    Bc2 = 2,
    Bc3 = 3,
    /// BC4/BC5
    Rgtc = 4,
    /// BC6H/BC7
    Bptc = 5,
    Pvrtc = 6,
    Pvrtc2 = 7,
    /// EAC and ETC1
    Eac = 8,
    Etc2 = 9,
    Astc = 10,
}

/// Bit layout of the channels within one pixel.
///
/// `BitsN` formats store every channel with N bits; the packed formats have hand-enumerated
/// per-channel widths (see [`ImageFormat::bits_of_channel`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FormatCode {
    Bits1 = 1,
    Bits2 = 2,
    Packed332 = 3,
    Bits4 = 4,
    Yuv420 = 5,
    Yuv411 = 6,
    Yuv422 = 7,
    Packed555 = 8,
    Packed5551 = 9,
    Packed565 = 10,
    Bits8 = 11,
    /// Shared-exponent RGB9E5
    Packed9995 = 12,
    Bits10 = 13,
    Packed1010102 = 14,
    Packed111110 = 15,
    Packed121212 = 16,
    Packed12121212 = 17,
    Bits16 = 18,
    Bits24 = 19,
    Packed248 = 20,
    Bits32 = 21,
    Packed328 = 22,
    Bits64 = 23,
    Packed168 = 24,
}

impl Dimensionality {
    const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Dimensionality::D1),
            2 => Some(Dimensionality::D2),
            3 => Some(Dimensionality::D3),
            _ => None,
        }
    }
}

impl DataType {
    const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(DataType::Int),
            2 => Some(DataType::UInt),
            3 => Some(DataType::Float),
            _ => None,
        }
    }
}

impl Access {
    const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Access::Read),
            2 => Some(Access::Write),
            3 => Some(Access::ReadWrite),
            _ => None,
        }
    }
    /// Whether kernels may read through this qualifier.
    pub const fn reads(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }
    /// Whether kernels may write through this qualifier.
    pub const fn writes(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

impl Compression {
    const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Compression::None),
            1 => Some(Compression::Bc1),
            2 => Some(Compression::Bc2),
            3 => Some(Compression::Bc3),
            4 => Some(Compression::Rgtc),
            5 => Some(Compression::Bptc),
            6 => Some(Compression::Pvrtc),
            7 => Some(Compression::Pvrtc2),
            8 => Some(Compression::Eac),
            9 => Some(Compression::Etc2),
            10 => Some(Compression::Astc),
            _ => None,
        }
    }
}

impl FormatCode {
    const fn from_bits(bits: u32) -> Option<Self> {
        use FormatCode::*;
        match bits {
            1 => Some(Bits1),
            2 => Some(Bits2),
            3 => Some(Packed332),
            4 => Some(Bits4),
            5 => Some(Yuv420),
            6 => Some(Yuv411),
            7 => Some(Yuv422),
            8 => Some(Packed555),
            9 => Some(Packed5551),
            10 => Some(Packed565),
            11 => Some(Bits8),
            12 => Some(Packed9995),
            13 => Some(Bits10),
            14 => Some(Packed1010102),
            15 => Some(Packed111110),
            16 => Some(Packed121212),
            17 => Some(Packed12121212),
            18 => Some(Bits16),
            19 => Some(Bits24),
            20 => Some(Packed248),
            21 => Some(Bits32),
            22 => Some(Packed328),
            23 => Some(Bits64),
            24 => Some(Packed168),
            _ => None,
        }
    }

    /// The channel count this code is restricted to, if any.
    pub const fn required_channels(self) -> Option<u32> {
        use FormatCode::*;
        match self {
            Packed332 | Packed555 | Packed565 | Packed9995 | Bits10 | Packed111110
            | Packed121212 => Some(3),
            Packed5551 | Packed1010102 | Packed12121212 => Some(4),
            Bits24 => Some(1),
            Packed248 | Packed328 | Packed168 => Some(2),
            _ => None,
        }
    }
}

/// Extents of an image along up to four independent axes.
///
/// `height` is ignored by 1D descriptors, `depth` by anything that is not 3D, and `layers`
/// by descriptors without [`ImageFlags::ARRAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageExtent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layers: u32,
}

impl ImageExtent {
    pub const fn new_1d(width: u32) -> Self {
        ImageExtent {
            width,
            height: 1,
            depth: 1,
            layers: 1,
        }
    }
    pub const fn new_2d(width: u32, height: u32) -> Self {
        ImageExtent {
            width,
            height,
            depth: 1,
            layers: 1,
        }
    }
    pub const fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        ImageExtent {
            width,
            height,
            depth,
            layers: 1,
        }
    }
    pub const fn with_layers(self, layers: u32) -> Self {
        ImageExtent { layers, ..self }
    }
}

/**
A bit-packed image format descriptor.

Descriptors are built by OR-ing a shape constant (such as [`ImageFormat::IMAGE_2D`]) with a
format constant (such as [`ImageFormat::RGBA8`]) and optionally extra [`ImageFlags`]:

```
use kernels_and_images::pixel_formats::{ImageFormat, ImageFlags, DataType};

let format = ImageFormat::IMAGE_2D | ImageFormat::R16F | ImageFlags::MIPMAPPED;
assert_eq!(format.data_type(), Some(DataType::Float));
assert_eq!(format.channel_count(), 1);
assert!(format.has_mipmaps());
```

A descriptor is only meaningful when [`ImageFormat::is_valid`] holds. Invalid descriptors are
representable so that they can be reported rather than rejected at construction.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ImageFormat(u32);

impl ImageFormat {
    /// The empty descriptor.
    pub const NONE: ImageFormat = ImageFormat(0);

    /// Fields compared by the native format tables: the format code, compression, data type,
    /// channel count, and the channel-interpretation flags.
    pub const TABLE_KEY_MASK: u32 = FORMAT_MASK
        | COMPRESSION_MASK
        | DATA_TYPE_MASK
        | CHANNELS_MASK
        | ImageFlags::NORMALIZED.bits()
        | ImageFlags::REVERSE.bits()
        | ImageFlags::SRGB.bits()
        | ImageFlags::DEPTH.bits()
        | ImageFlags::STENCIL.bits();

    pub const fn from_bits(bits: u32) -> Self {
        ImageFormat(bits)
    }
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds a descriptor from its principal fields. `channels` is clamped to 1..=4.
    pub const fn new(
        dimensionality: Dimensionality,
        channels: u32,
        data_type: DataType,
        format: FormatCode,
    ) -> Self {
        ImageFormat(
            ((dimensionality as u32) << DIM_SHIFT)
                | (channels_bits(channels) << CHANNELS_SHIFT)
                | ((data_type as u32) << DATA_TYPE_SHIFT)
                | ((format as u32) << FORMAT_SHIFT),
        )
    }

    const fn channel_format(channels: u32, data_type: DataType, format: FormatCode) -> Self {
        ImageFormat(
            (channels_bits(channels) << CHANNELS_SHIFT)
                | ((data_type as u32) << DATA_TYPE_SHIFT)
                | ((format as u32) << FORMAT_SHIFT),
        )
    }

    pub const fn union(self, other: ImageFormat) -> Self {
        ImageFormat(self.0 | other.0)
    }
    pub const fn with(self, flags: ImageFlags) -> Self {
        ImageFormat(self.0 | flags.bits())
    }
    pub const fn without(self, flags: ImageFlags) -> Self {
        ImageFormat(self.0 & !flags.bits())
    }
    pub const fn with_channels(self, channels: u32) -> Self {
        ImageFormat((self.0 & !CHANNELS_MASK) | (channels_bits(channels) << CHANNELS_SHIFT))
    }
    pub const fn with_dimensionality(self, dimensionality: Dimensionality) -> Self {
        ImageFormat((self.0 & !DIM_MASK) | ((dimensionality as u32) << DIM_SHIFT))
    }
    pub const fn with_data_type(self, data_type: DataType) -> Self {
        ImageFormat((self.0 & !DATA_TYPE_MASK) | ((data_type as u32) << DATA_TYPE_SHIFT))
    }
    pub const fn with_access(self, access: Access) -> Self {
        ImageFormat((self.0 & !ACCESS_MASK) | ((access as u32) << ACCESS_SHIFT))
    }
    pub const fn without_access(self) -> Self {
        ImageFormat(self.0 & !ACCESS_MASK)
    }
    pub const fn with_compression(self, compression: Compression) -> Self {
        ImageFormat((self.0 & !COMPRESSION_MASK) | ((compression as u32) << COMPRESSION_SHIFT))
    }
    pub const fn with_format_code(self, format: FormatCode) -> Self {
        ImageFormat((self.0 & !FORMAT_MASK) | ((format as u32) << FORMAT_SHIFT))
    }

    /// The descriptor restricted to [`ImageFormat::TABLE_KEY_MASK`].
    pub const fn table_key(self) -> Self {
        ImageFormat(self.0 & Self::TABLE_KEY_MASK)
    }
    /// The descriptor with the table-key fields replaced by those of `key`.
    pub const fn with_table_key(self, key: ImageFormat) -> Self {
        ImageFormat((self.0 & !Self::TABLE_KEY_MASK) | (key.0 & Self::TABLE_KEY_MASK))
    }

    pub const fn flags(self) -> ImageFlags {
        ImageFlags::from_bits_truncate(self.0)
    }
    pub const fn dimensionality(self) -> Option<Dimensionality> {
        Dimensionality::from_bits((self.0 & DIM_MASK) >> DIM_SHIFT)
    }
    pub const fn data_type(self) -> Option<DataType> {
        DataType::from_bits((self.0 & DATA_TYPE_MASK) >> DATA_TYPE_SHIFT)
    }
    pub const fn access(self) -> Option<Access> {
        Access::from_bits((self.0 & ACCESS_MASK) >> ACCESS_SHIFT)
    }
    pub const fn compression(self) -> Option<Compression> {
        Compression::from_bits((self.0 & COMPRESSION_MASK) >> COMPRESSION_SHIFT)
    }
    pub const fn format_code(self) -> Option<FormatCode> {
        FormatCode::from_bits((self.0 & FORMAT_MASK) >> FORMAT_SHIFT)
    }

    const fn has(self, flag: ImageFlags) -> bool {
        self.0 & flag.bits() != 0
    }
    pub const fn has_array(self) -> bool {
        self.has(ImageFlags::ARRAY)
    }
    pub const fn has_buffer(self) -> bool {
        self.has(ImageFlags::BUFFER)
    }
    pub const fn has_msaa(self) -> bool {
        self.has(ImageFlags::MSAA)
    }
    pub const fn has_cube(self) -> bool {
        self.has(ImageFlags::CUBE)
    }
    pub const fn has_depth(self) -> bool {
        self.has(ImageFlags::DEPTH)
    }
    pub const fn has_stencil(self) -> bool {
        self.has(ImageFlags::STENCIL)
    }
    pub const fn has_render_target(self) -> bool {
        self.has(ImageFlags::RENDER_TARGET)
    }
    pub const fn has_mipmaps(self) -> bool {
        self.has(ImageFlags::MIPMAPPED)
    }
    pub const fn has_no_sampler(self) -> bool {
        self.has(ImageFlags::NO_SAMPLER)
    }
    pub const fn has_gather(self) -> bool {
        self.has(ImageFlags::GATHER)
    }
    pub const fn is_normalized(self) -> bool {
        self.has(ImageFlags::NORMALIZED)
    }
    pub const fn is_reversed(self) -> bool {
        self.has(ImageFlags::REVERSE)
    }
    pub const fn is_srgb(self) -> bool {
        self.has(ImageFlags::SRGB)
    }

    /// Number of spatial dimensions (0 when unset).
    pub const fn dimension_count(self) -> u32 {
        (self.0 & DIM_MASK) >> DIM_SHIFT
    }

    /// Dimension count plus one for arrays and cube maps, i.e. the dimensionality of the
    /// underlying storage.
    pub const fn storage_dimension_count(self) -> u32 {
        self.dimension_count() + if self.has_array() || self.has_cube() { 1 } else { 0 }
    }

    pub const fn channel_count(self) -> u32 {
        ((self.0 & CHANNELS_MASK) >> CHANNELS_SHIFT) + 1
    }

    /// Number of components in a coordinate addressing this image from a kernel.
    ///
    /// Cube arrays need both the face direction and the layer index, so they get one more.
    pub const fn coordinate_width(self) -> u32 {
        self.storage_dimension_count() + if self.has_array() && self.has_cube() { 1 } else { 0 }
    }

    pub const fn is_compressed(self) -> bool {
        self.0 & COMPRESSION_MASK != 0
    }

    /// Whether dimensionality, format code and channel count are mutually consistent.
    pub const fn is_valid(self) -> bool {
        if self.dimension_count() == 0 {
            return false;
        }
        match self.format_code() {
            Some(code) => match code.required_channels() {
                Some(channels) => channels == self.channel_count(),
                None => true,
            },
            None => true,
        }
    }

    /// Bits occupied by one pixel.
    ///
    /// Depth+stencil formats report the combined width. For compressed formats this is a
    /// representative per-texel average of the family's 4x4 block (for example 4 for BC1 and
    /// 8 for BC3), not byte-exact block accounting.
    pub const fn bits_per_pixel(self) -> u32 {
        if self.is_compressed() {
            return compressed_bits_per_pixel(self);
        }
        let channels = self.channel_count();
        use FormatCode::*;
        match self.format_code() {
            Some(Bits1) => channels,
            Some(Bits2) => 2 * channels,
            Some(Bits4) => 4 * channels,
            Some(Bits8) => 8 * channels,
            Some(Bits16) => 16 * channels,
            Some(Bits32) => 32 * channels,
            Some(Bits64) => 64 * channels,
            Some(Packed332) => 8,
            Some(Packed555) => 15,
            Some(Packed5551) => 16,
            Some(Packed565) => 16,
            Some(Packed9995) => 32,
            Some(Bits10) => 30,
            Some(Packed1010102) => 32,
            Some(Packed111110) => 32,
            Some(Packed121212) => 36,
            Some(Packed12121212) => 48,
            Some(Bits24) => 24,
            Some(Packed248) => 32,
            Some(Packed328) => 40,
            Some(Packed168) => 24,
            Some(Yuv420) => 12,
            Some(Yuv411) => 12,
            Some(Yuv422) => 16,
            None => 1,
        }
    }

    /// `ceil(bits_per_pixel / 8)`
    pub const fn bytes_per_pixel(self) -> u32 {
        self.bits_per_pixel().div_ceil(8)
    }

    /// Bits of channel `channel`, or 0 when the channel does not exist or the format is
    /// compressed.
    pub const fn bits_of_channel(self, channel: u32) -> u32 {
        if channel >= self.channel_count() || self.is_compressed() {
            return 0;
        }
        use FormatCode::*;
        match self.format_code() {
            Some(Bits1) => 1,
            Some(Bits2) => 2,
            Some(Bits4) => 4,
            Some(Bits8) => 8,
            Some(Bits16) => 16,
            Some(Bits32) => 32,
            Some(Bits64) => 64,
            Some(Packed332) => {
                if channel <= 1 {
                    3
                } else {
                    2
                }
            }
            Some(Packed555) => 5,
            Some(Packed5551) => {
                if channel <= 2 {
                    5
                } else {
                    1
                }
            }
            Some(Packed565) => {
                if channel == 1 {
                    6
                } else {
                    5
                }
            }
            //mantissa plus the shared exponent
            Some(Packed9995) => 14,
            Some(Bits10) => 10,
            Some(Packed1010102) => {
                if channel <= 2 {
                    10
                } else {
                    2
                }
            }
            Some(Packed111110) => {
                if channel <= 1 {
                    11
                } else {
                    10
                }
            }
            Some(Packed121212) | Some(Packed12121212) => 12,
            Some(Bits24) => 24,
            Some(Packed248) => {
                if channel == 0 {
                    24
                } else {
                    8
                }
            }
            Some(Packed328) => {
                if channel == 0 {
                    32
                } else {
                    8
                }
            }
            Some(Packed168) => {
                if channel == 0 {
                    16
                } else {
                    8
                }
            }
            Some(Yuv420) | Some(Yuv411) | Some(Yuv422) | None => 0,
        }
    }

    /// Bytes in one slice (one layer, one face, one mip level) of the given extents.
    ///
    /// Multisampled images multiply by `sample_count`. Partial trailing bytes round up.
    pub const fn slice_byte_size(self, extent: ImageExtent, sample_count: u32) -> u64 {
        let dims = self.dimension_count();
        let mut texels = extent.width as u64;
        if dims >= 2 {
            texels *= extent.height as u64;
        }
        if dims == 3 {
            texels *= extent.depth as u64;
        }
        if self.has_msaa() {
            texels *= sample_count as u64;
        }
        (texels * self.bits_per_pixel() as u64).div_ceil(8)
    }

    /// Bytes in all layers and faces of one mip level of the given extents.
    pub const fn total_byte_size(self, extent: ImageExtent, sample_count: u32) -> u64 {
        self.slice_byte_size(extent, sample_count) * self.layer_count(extent) as u64
    }

    /// Number of native layers: the array layer count (if [`ImageFlags::ARRAY`]) times 6 (if
    /// [`ImageFlags::CUBE`]).
    pub const fn layer_count(self, extent: ImageExtent) -> u32 {
        let mut layers = 1;
        if self.has_array() {
            layers = if extent.layers == 0 { 1 } else { extent.layers };
        }
        if self.has_cube() {
            layers *= 6;
        }
        layers
    }

    /// Length of the full mip chain for the given extents, or 1 when not mip-mapped.
    pub const fn mip_level_count(self, extent: ImageExtent) -> u32 {
        if !self.has_mipmaps() {
            return 1;
        }
        let dims = self.dimension_count();
        let mut largest = extent.width;
        if dims >= 2 && extent.height > largest {
            largest = extent.height;
        }
        if dims == 3 && extent.depth > largest {
            largest = extent.depth;
        }
        if largest == 0 {
            return 1;
        }
        largest.ilog2() + 1
    }

    /// Extents of mip level `level`. Array layers are unchanged.
    pub const fn level_extent(self, extent: ImageExtent, level: u32) -> ImageExtent {
        let dims = self.dimension_count();
        ImageExtent {
            width: shrink(extent.width, level),
            height: if dims >= 2 {
                shrink(extent.height, level)
            } else {
                extent.height
            },
            depth: if dims == 3 {
                shrink(extent.depth, level)
            } else {
                extent.depth
            },
            layers: extent.layers,
        }
    }

    /// The 4-channel descriptor used to store a 3-channel image on backends that lack
    /// 3-channel formats. Returns `self` for every other channel count.
    pub const fn four_channel_storage(self) -> Self {
        if self.channel_count() == 3 {
            self.with_channels(4)
        } else {
            self
        }
    }
}

const fn channels_bits(channels: u32) -> u32 {
    let clamped = if channels == 0 {
        1
    } else if channels > 4 {
        4
    } else {
        channels
    };
    (clamped - 1) & 0x3
}

const fn shrink(value: u32, level: u32) -> u32 {
    let shifted = if level >= 32 { 0 } else { value >> level };
    if shifted == 0 { 1 } else { shifted }
}

const fn compressed_bits_per_pixel(format: ImageFormat) -> u32 {
    let channels = format.channel_count();
    let two_bit = matches!(format.format_code(), Some(FormatCode::Bits2));
    match format.compression() {
        Some(Compression::Bc1) => 4,
        Some(Compression::Bc2) | Some(Compression::Bc3) => 8,
        Some(Compression::Rgtc) => {
            if channels == 1 {
                4
            } else {
                8
            }
        }
        Some(Compression::Bptc) => 8,
        Some(Compression::Pvrtc) | Some(Compression::Pvrtc2) => {
            if two_bit {
                2
            } else {
                4
            }
        }
        Some(Compression::Eac) => 4 * if channels >= 2 { 2 } else { 1 },
        Some(Compression::Etc2) => {
            if channels == 4 {
                8
            } else {
                4
            }
        }
        Some(Compression::Astc) => 8,
        Some(Compression::None) | None => 1,
    }
}

//named descriptors
impl ImageFormat {
    pub const IMAGE_1D: ImageFormat = ImageFormat((Dimensionality::D1 as u32) << DIM_SHIFT);
    pub const IMAGE_1D_ARRAY: ImageFormat = Self::IMAGE_1D.with(ImageFlags::ARRAY);
    pub const IMAGE_1D_BUFFER: ImageFormat = Self::IMAGE_1D.with(ImageFlags::BUFFER);
    pub const IMAGE_2D: ImageFormat = ImageFormat((Dimensionality::D2 as u32) << DIM_SHIFT);
    pub const IMAGE_2D_ARRAY: ImageFormat = Self::IMAGE_2D.with(ImageFlags::ARRAY);
    pub const IMAGE_2D_MSAA: ImageFormat = Self::IMAGE_2D.with(ImageFlags::MSAA);
    pub const IMAGE_2D_MSAA_ARRAY: ImageFormat = Self::IMAGE_2D_MSAA.with(ImageFlags::ARRAY);
    pub const IMAGE_3D: ImageFormat = ImageFormat((Dimensionality::D3 as u32) << DIM_SHIFT);
    pub const IMAGE_CUBE: ImageFormat = Self::IMAGE_2D.with(ImageFlags::CUBE);
    pub const IMAGE_CUBE_ARRAY: ImageFormat = Self::IMAGE_CUBE.with(ImageFlags::ARRAY);
    pub const IMAGE_DEPTH: ImageFormat = Self::IMAGE_2D
        .with(ImageFlags::DEPTH)
        .with_channels(1);
    pub const IMAGE_DEPTH_STENCIL: ImageFormat = Self::IMAGE_2D
        .with(ImageFlags::DEPTH.union(ImageFlags::STENCIL))
        .with_channels(2);

    //unsigned normalized
    pub const R8: ImageFormat = Self::unorm(1, FormatCode::Bits8);
    pub const RG8: ImageFormat = Self::unorm(2, FormatCode::Bits8);
    pub const RGB8: ImageFormat = Self::unorm(3, FormatCode::Bits8);
    pub const RGBA8: ImageFormat = Self::unorm(4, FormatCode::Bits8);
    pub const BGR8: ImageFormat = Self::RGB8.with(ImageFlags::REVERSE);
    pub const BGRA8: ImageFormat = Self::RGBA8.with(ImageFlags::REVERSE);
    pub const RGBA8_SRGB: ImageFormat = Self::RGBA8.with(ImageFlags::SRGB);
    pub const BGRA8_SRGB: ImageFormat = Self::BGRA8.with(ImageFlags::SRGB);
    pub const R16: ImageFormat = Self::unorm(1, FormatCode::Bits16);
    pub const RG16: ImageFormat = Self::unorm(2, FormatCode::Bits16);
    pub const RGB16: ImageFormat = Self::unorm(3, FormatCode::Bits16);
    pub const RGBA16: ImageFormat = Self::unorm(4, FormatCode::Bits16);

    //signed normalized
    pub const R8_SNORM: ImageFormat = Self::snorm(1, FormatCode::Bits8);
    pub const RG8_SNORM: ImageFormat = Self::snorm(2, FormatCode::Bits8);
    pub const RGB8_SNORM: ImageFormat = Self::snorm(3, FormatCode::Bits8);
    pub const RGBA8_SNORM: ImageFormat = Self::snorm(4, FormatCode::Bits8);
    pub const R16_SNORM: ImageFormat = Self::snorm(1, FormatCode::Bits16);
    pub const RG16_SNORM: ImageFormat = Self::snorm(2, FormatCode::Bits16);
    pub const RGB16_SNORM: ImageFormat = Self::snorm(3, FormatCode::Bits16);
    pub const RGBA16_SNORM: ImageFormat = Self::snorm(4, FormatCode::Bits16);

    //unsigned integer
    pub const R8UI: ImageFormat = Self::channel_format(1, DataType::UInt, FormatCode::Bits8);
    pub const RG8UI: ImageFormat = Self::channel_format(2, DataType::UInt, FormatCode::Bits8);
    pub const RGB8UI: ImageFormat = Self::channel_format(3, DataType::UInt, FormatCode::Bits8);
    pub const RGBA8UI: ImageFormat = Self::channel_format(4, DataType::UInt, FormatCode::Bits8);
    pub const R16UI: ImageFormat = Self::channel_format(1, DataType::UInt, FormatCode::Bits16);
    pub const RG16UI: ImageFormat = Self::channel_format(2, DataType::UInt, FormatCode::Bits16);
    pub const RGB16UI: ImageFormat = Self::channel_format(3, DataType::UInt, FormatCode::Bits16);
    pub const RGBA16UI: ImageFormat =
        Self::channel_format(4, DataType::UInt, FormatCode::Bits16);
    pub const R32UI: ImageFormat = Self::channel_format(1, DataType::UInt, FormatCode::Bits32);
    pub const RG32UI: ImageFormat = Self::channel_format(2, DataType::UInt, FormatCode::Bits32);
    pub const RGB32UI: ImageFormat = Self::channel_format(3, DataType::UInt, FormatCode::Bits32);
    pub const RGBA32UI: ImageFormat =
        Self::channel_format(4, DataType::UInt, FormatCode::Bits32);

    //signed integer
    pub const R8I: ImageFormat = Self::channel_format(1, DataType::Int, FormatCode::Bits8);
    pub const RG8I: ImageFormat = Self::channel_format(2, DataType::Int, FormatCode::Bits8);
    pub const RGB8I: ImageFormat = Self::channel_format(3, DataType::Int, FormatCode::Bits8);
    pub const RGBA8I: ImageFormat = Self::channel_format(4, DataType::Int, FormatCode::Bits8);
    pub const R16I: ImageFormat = Self::channel_format(1, DataType::Int, FormatCode::Bits16);
    pub const RG16I: ImageFormat = Self::channel_format(2, DataType::Int, FormatCode::Bits16);
    pub const RGB16I: ImageFormat = Self::channel_format(3, DataType::Int, FormatCode::Bits16);
    pub const RGBA16I: ImageFormat = Self::channel_format(4, DataType::Int, FormatCode::Bits16);
    pub const R32I: ImageFormat = Self::channel_format(1, DataType::Int, FormatCode::Bits32);
    pub const RG32I: ImageFormat = Self::channel_format(2, DataType::Int, FormatCode::Bits32);
    pub const RGB32I: ImageFormat = Self::channel_format(3, DataType::Int, FormatCode::Bits32);
    pub const RGBA32I: ImageFormat = Self::channel_format(4, DataType::Int, FormatCode::Bits32);

    //float
    pub const R16F: ImageFormat = Self::channel_format(1, DataType::Float, FormatCode::Bits16);
    pub const RG16F: ImageFormat = Self::channel_format(2, DataType::Float, FormatCode::Bits16);
    pub const RGB16F: ImageFormat = Self::channel_format(3, DataType::Float, FormatCode::Bits16);
    pub const RGBA16F: ImageFormat =
        Self::channel_format(4, DataType::Float, FormatCode::Bits16);
    pub const R32F: ImageFormat = Self::channel_format(1, DataType::Float, FormatCode::Bits32);
    pub const RG32F: ImageFormat = Self::channel_format(2, DataType::Float, FormatCode::Bits32);
    pub const RGB32F: ImageFormat = Self::channel_format(3, DataType::Float, FormatCode::Bits32);
    pub const RGBA32F: ImageFormat =
        Self::channel_format(4, DataType::Float, FormatCode::Bits32);
    pub const R64F: ImageFormat = Self::channel_format(1, DataType::Float, FormatCode::Bits64);

    //packed
    pub const R5G6B5: ImageFormat = Self::unorm(3, FormatCode::Packed565);
    pub const B5G6R5: ImageFormat = Self::R5G6B5.with(ImageFlags::REVERSE);
    pub const RGB5: ImageFormat = Self::unorm(3, FormatCode::Packed555);
    pub const RGB5A1: ImageFormat = Self::unorm(4, FormatCode::Packed5551);
    pub const RGB10: ImageFormat = Self::unorm(3, FormatCode::Bits10);
    pub const RGB10A2: ImageFormat = Self::unorm(4, FormatCode::Packed1010102);
    pub const BGR10A2: ImageFormat = Self::RGB10A2.with(ImageFlags::REVERSE);
    pub const RGB10A2UI: ImageFormat =
        Self::channel_format(4, DataType::UInt, FormatCode::Packed1010102);
    pub const RG11B10F: ImageFormat =
        Self::channel_format(3, DataType::Float, FormatCode::Packed111110);
    pub const RGB9E5F: ImageFormat =
        Self::channel_format(3, DataType::Float, FormatCode::Packed9995);

    //depth and stencil
    pub const D16: ImageFormat = Self::depth(1, DataType::UInt, FormatCode::Bits16);
    pub const D24: ImageFormat = Self::depth(1, DataType::UInt, FormatCode::Bits24);
    pub const D32: ImageFormat = Self::depth(1, DataType::UInt, FormatCode::Bits32);
    pub const D32F: ImageFormat = Self::depth(1, DataType::Float, FormatCode::Bits32);
    pub const DS16_8: ImageFormat =
        Self::depth(2, DataType::UInt, FormatCode::Packed168).with(ImageFlags::STENCIL);
    pub const DS24_8: ImageFormat =
        Self::depth(2, DataType::UInt, FormatCode::Packed248).with(ImageFlags::STENCIL);
    pub const DS32F_8: ImageFormat =
        Self::depth(2, DataType::Float, FormatCode::Packed328).with(ImageFlags::STENCIL);

    //compressed
    pub const BC1_RGB: ImageFormat = Self::compressed(Compression::Bc1, 3, DataType::UInt);
    pub const BC1_RGB_SRGB: ImageFormat = Self::BC1_RGB.with(ImageFlags::SRGB);
    pub const BC1_RGBA: ImageFormat = Self::compressed(Compression::Bc1, 4, DataType::UInt);
    pub const BC1_RGBA_SRGB: ImageFormat = Self::BC1_RGBA.with(ImageFlags::SRGB);
    pub const BC2_RGBA: ImageFormat = Self::compressed(Compression::Bc2, 4, DataType::UInt);
    pub const BC2_RGBA_SRGB: ImageFormat = Self::BC2_RGBA.with(ImageFlags::SRGB);
    pub const BC3_RGBA: ImageFormat = Self::compressed(Compression::Bc3, 4, DataType::UInt);
    pub const BC3_RGBA_SRGB: ImageFormat = Self::BC3_RGBA.with(ImageFlags::SRGB);
    pub const BC4_R: ImageFormat = Self::compressed(Compression::Rgtc, 1, DataType::UInt);
    pub const BC4_R_SNORM: ImageFormat = Self::compressed(Compression::Rgtc, 1, DataType::Int);
    pub const BC5_RG: ImageFormat = Self::compressed(Compression::Rgtc, 2, DataType::UInt);
    pub const BC5_RG_SNORM: ImageFormat = Self::compressed(Compression::Rgtc, 2, DataType::Int);
    pub const BC6H_RGBF: ImageFormat = ImageFormat(
        (Compression::Bptc as u32) << COMPRESSION_SHIFT
            | channels_bits(3) << CHANNELS_SHIFT
            | (DataType::Float as u32) << DATA_TYPE_SHIFT,
    );
    pub const BC7_RGBA: ImageFormat = Self::compressed(Compression::Bptc, 4, DataType::UInt);
    pub const BC7_RGBA_SRGB: ImageFormat = Self::BC7_RGBA.with(ImageFlags::SRGB);
    pub const PVRTC_RGB2: ImageFormat = Self::compressed(Compression::Pvrtc, 3, DataType::UInt)
        .with_format_code(FormatCode::Bits2);
    pub const PVRTC_RGB4: ImageFormat = Self::compressed(Compression::Pvrtc, 3, DataType::UInt)
        .with_format_code(FormatCode::Bits4);
    pub const PVRTC_RGBA2: ImageFormat = Self::compressed(Compression::Pvrtc, 4, DataType::UInt)
        .with_format_code(FormatCode::Bits2);
    pub const PVRTC_RGBA4: ImageFormat = Self::compressed(Compression::Pvrtc, 4, DataType::UInt)
        .with_format_code(FormatCode::Bits4);
    pub const PVRTC_RGBA2_SRGB: ImageFormat = Self::PVRTC_RGBA2.with(ImageFlags::SRGB);
    pub const PVRTC_RGBA4_SRGB: ImageFormat = Self::PVRTC_RGBA4.with(ImageFlags::SRGB);
    pub const EAC_R11: ImageFormat = Self::compressed(Compression::Eac, 1, DataType::UInt);
    pub const EAC_R11_SNORM: ImageFormat = Self::compressed(Compression::Eac, 1, DataType::Int);
    pub const EAC_RG11: ImageFormat = Self::compressed(Compression::Eac, 2, DataType::UInt);
    pub const EAC_RG11_SNORM: ImageFormat = Self::compressed(Compression::Eac, 2, DataType::Int);
    pub const ETC2_RGB8: ImageFormat = Self::compressed(Compression::Etc2, 3, DataType::UInt);
    pub const ETC2_RGB8_SRGB: ImageFormat = Self::ETC2_RGB8.with(ImageFlags::SRGB);
    pub const ETC2_RGBA8: ImageFormat = Self::compressed(Compression::Etc2, 4, DataType::UInt);
    pub const ETC2_RGBA8_SRGB: ImageFormat = Self::ETC2_RGBA8.with(ImageFlags::SRGB);
    pub const ASTC_4X4_RGBA: ImageFormat = Self::compressed(Compression::Astc, 4, DataType::UInt);
    pub const ASTC_4X4_RGBA_SRGB: ImageFormat = Self::ASTC_4X4_RGBA.with(ImageFlags::SRGB);

    const fn unorm(channels: u32, format: FormatCode) -> Self {
        Self::channel_format(channels, DataType::UInt, format).with(ImageFlags::NORMALIZED)
    }
    const fn snorm(channels: u32, format: FormatCode) -> Self {
        Self::channel_format(channels, DataType::Int, format).with(ImageFlags::NORMALIZED)
    }
    const fn depth(channels: u32, data_type: DataType, format: FormatCode) -> Self {
        Self::channel_format(channels, data_type, format).with(ImageFlags::DEPTH)
    }
    const fn compressed(compression: Compression, channels: u32, data_type: DataType) -> Self {
        ImageFormat(
            ((compression as u32) << COMPRESSION_SHIFT)
                | (channels_bits(channels) << CHANNELS_SHIFT)
                | ((data_type as u32) << DATA_TYPE_SHIFT),
        )
        .with(ImageFlags::NORMALIZED)
    }
}

/// Looks up the native format for `format` in a backend table, comparing table keys.
pub(crate) fn native_in<N: Copy>(table: &[(ImageFormat, N)], format: ImageFormat) -> Option<N> {
    let key = format.table_key();
    table
        .iter()
        .find(|(entry, _)| entry.table_key() == key)
        .map(|(_, native)| *native)
}

/// Looks up the descriptor for `native` in a backend table.
pub(crate) fn format_in<N: Copy + PartialEq>(
    table: &[(ImageFormat, N)],
    native: N,
) -> Option<ImageFormat> {
    table
        .iter()
        .find(|(_, entry)| *entry == native)
        .map(|(format, _)| *format)
}

/// Resolves the storage descriptor and native format for `format`.
///
/// When the backend has no native format for an uncompressed 3-channel descriptor, the
/// 4-channel variant is tried instead. The returned descriptor is the one the device stores,
/// which differs from `format` exactly when a shim is needed.
pub fn resolve_storage<N>(
    format: ImageFormat,
    lookup: impl Fn(ImageFormat) -> Option<N>,
) -> Option<(ImageFormat, N)> {
    if let Some(native) = lookup(format) {
        return Some((format, native));
    }
    if format.channel_count() == 3 && !format.is_compressed() {
        let storage = format.four_channel_storage();
        if let Some(native) = lookup(storage) {
            return Some((storage, native));
        }
    }
    None
}

impl BitOr for ImageFormat {
    type Output = ImageFormat;
    fn bitor(self, rhs: ImageFormat) -> ImageFormat {
        self.union(rhs)
    }
}

impl BitOr<ImageFlags> for ImageFormat {
    type Output = ImageFormat;
    fn bitor(self, rhs: ImageFlags) -> ImageFormat {
        self.with(rhs)
    }
}

impl BitOrAssign for ImageFormat {
    fn bitor_assign(&mut self, rhs: ImageFormat) {
        *self = self.union(rhs);
    }
}

impl BitOrAssign<ImageFlags> for ImageFormat {
    fn bitor_assign(&mut self, rhs: ImageFlags) {
        *self = self.with(rhs);
    }
}

impl Debug for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImageFormat({:#010x}: {})", self.0, self)
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.dimensionality() {
            Some(Dimensionality::D1) => write!(f, "1D")?,
            Some(Dimensionality::D2) => write!(f, "2D")?,
            Some(Dimensionality::D3) => write!(f, "3D")?,
            None => write!(f, "?D")?,
        }
        write!(f, " {}ch", self.channel_count())?;
        match self.data_type() {
            Some(data_type) => write!(f, " {:?}", data_type)?,
            None => write!(f, " ?type")?,
        }
        if let Some(code) = self.format_code() {
            write!(f, " {:?}", code)?;
        }
        match self.compression() {
            Some(Compression::None) => {}
            Some(compression) => write!(f, " {:?}", compression)?,
            None => write!(f, " ?compression")?,
        }
        if let Some(access) = self.access() {
            write!(f, " {:?}", access)?;
        }
        for (name, _) in self.flags().iter_names() {
            write!(f, " {}", name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_bits_per_pixel() {
        assert_eq!((ImageFormat::IMAGE_2D | ImageFormat::R8).bits_per_pixel(), 8);
        assert_eq!((ImageFormat::IMAGE_2D | ImageFormat::RGBA32F).bits_per_pixel(), 128);
        assert_eq!(ImageFormat::IMAGE_DEPTH.union(ImageFormat::D32F).bits_per_pixel(), 32);
        assert_eq!(
            ImageFormat::IMAGE_DEPTH_STENCIL
                .union(ImageFormat::DS24_8)
                .bits_per_pixel(),
            32
        );
        assert_eq!((ImageFormat::IMAGE_2D | ImageFormat::RGB16F).bits_per_pixel(), 48);
    }

    #[test]
    fn bytes_round_up() {
        let formats = [
            ImageFormat::R8,
            ImageFormat::RGB8,
            ImageFormat::R5G6B5,
            ImageFormat::RGB9E5F,
            ImageFormat::RG11B10F,
            ImageFormat::DS32F_8,
            ImageFormat::BC1_RGBA,
            ImageFormat::PVRTC_RGB2,
            ImageFormat::RGBA32F,
        ];
        for format in formats {
            let format = ImageFormat::IMAGE_2D | format;
            assert!(format.is_valid(), "{}", format);
            assert_eq!(format.bytes_per_pixel(), format.bits_per_pixel().div_ceil(8));
        }
        //15 bits needs 2 bytes
        let rgb555 = ImageFormat::IMAGE_2D
            .union(ImageFormat::RGB8)
            .with_format_code(FormatCode::Packed555);
        assert_eq!(rgb555.bits_per_pixel(), 15);
        assert_eq!(rgb555.bytes_per_pixel(), 2);
    }

    #[test]
    fn three_channel_only_codes() {
        let two_channel = ImageFormat::IMAGE_2D
            .union(ImageFormat::RG8)
            .with_format_code(FormatCode::Packed565);
        assert!(!two_channel.is_valid());
        let three_channel = two_channel.with_channels(3);
        assert!(three_channel.is_valid());
        //no dimensionality
        assert!(!ImageFormat::RGBA8.is_valid());
        assert!(!(ImageFormat::IMAGE_2D | ImageFormat::R8).with_format_code(FormatCode::Packed248).is_valid());
    }

    #[test]
    fn irregular_channels() {
        let f = ImageFormat::IMAGE_2D | ImageFormat::R5G6B5;
        assert_eq!(
            (0..4).map(|c| f.bits_of_channel(c)).collect::<Vec<_>>(),
            vec![5, 6, 5, 0]
        );
        let f = ImageFormat::IMAGE_2D | ImageFormat::RGB10A2;
        assert_eq!(f.bits_of_channel(2), 10);
        assert_eq!(f.bits_of_channel(3), 2);
        let f = ImageFormat::IMAGE_2D | ImageFormat::RG11B10F;
        assert_eq!(f.bits_of_channel(1), 11);
        assert_eq!(f.bits_of_channel(2), 10);
        let f = ImageFormat::IMAGE_DEPTH_STENCIL | ImageFormat::DS24_8;
        assert_eq!(f.bits_of_channel(0), 24);
        assert_eq!(f.bits_of_channel(1), 8);
        let f = ImageFormat::IMAGE_2D | ImageFormat::RGB5A1;
        assert_eq!(f.bits_of_channel(3), 1);
        //compressed formats have no per-channel width
        assert_eq!((ImageFormat::IMAGE_2D | ImageFormat::BC3_RGBA).bits_of_channel(0), 0);
    }

    #[test]
    fn storage_and_coordinates() {
        let f = ImageFormat::IMAGE_2D | ImageFormat::RGBA8;
        assert_eq!(f.dimension_count(), 2);
        assert_eq!(f.storage_dimension_count(), 2);
        assert_eq!(f.coordinate_width(), 2);
        let f = ImageFormat::IMAGE_2D_ARRAY | ImageFormat::RGBA8;
        assert_eq!(f.storage_dimension_count(), 3);
        assert_eq!(f.coordinate_width(), 3);
        let f = ImageFormat::IMAGE_CUBE_ARRAY | ImageFormat::RGBA8;
        assert_eq!(f.storage_dimension_count(), 3);
        assert_eq!(f.coordinate_width(), 4);
    }

    #[test]
    fn partial_trailing_bytes_round_up() {
        let nibbles = ImageFormat::IMAGE_2D | ImageFormat::unorm(1, FormatCode::Bits4);
        assert_eq!(nibbles.slice_byte_size(ImageExtent::new_2d(3, 3), 1), 5);
        assert_eq!(nibbles.slice_byte_size(ImageExtent::new_2d(4, 4), 1), 8);
        let bits = ImageFormat::IMAGE_1D | ImageFormat::unorm(1, FormatCode::Bits1);
        assert_eq!(bits.slice_byte_size(ImageExtent::new_1d(3), 1), 1);
        assert_eq!(bits.slice_byte_size(ImageExtent::new_1d(17), 1), 3);
    }

    #[test]
    fn total_size_multiplies_layers_and_faces() {
        let extent = ImageExtent::new_2d(8, 8).with_layers(3);
        let plain = ImageFormat::IMAGE_2D | ImageFormat::RGBA8;
        assert_eq!(plain.total_byte_size(extent, 1), 256);
        let array = ImageFormat::IMAGE_2D_ARRAY | ImageFormat::RGBA8;
        assert_eq!(array.total_byte_size(extent, 1), 256 * 3);
        let cube = ImageFormat::IMAGE_CUBE | ImageFormat::RGBA8;
        assert_eq!(cube.total_byte_size(extent, 1), 256 * 6);
        let cube_array = ImageFormat::IMAGE_CUBE_ARRAY | ImageFormat::RGBA8;
        assert_eq!(cube_array.total_byte_size(extent, 1), 256 * 18);
        let msaa = ImageFormat::IMAGE_2D_MSAA | ImageFormat::RGBA8;
        assert_eq!(msaa.total_byte_size(extent, 4), 1024);
        let volume = ImageFormat::IMAGE_3D | ImageFormat::R8;
        assert_eq!(volume.total_byte_size(ImageExtent::new_3d(4, 4, 4), 1), 64);
    }

    #[test]
    fn mip_levels() {
        let f = ImageFormat::IMAGE_2D | ImageFormat::RGBA8 | ImageFlags::MIPMAPPED;
        let extent = ImageExtent::new_2d(256, 64);
        assert_eq!(f.mip_level_count(extent), 9);
        assert_eq!(f.level_extent(extent, 8), ImageExtent::new_2d(1, 1));
        assert_eq!(f.level_extent(extent, 3), ImageExtent::new_2d(32, 8));
        assert_eq!(f.without(ImageFlags::MIPMAPPED).mip_level_count(extent), 1);
    }

    #[test]
    fn fields_decode() {
        let f = (ImageFormat::IMAGE_2D | ImageFormat::BGRA8_SRGB).with_access(Access::ReadWrite);
        assert_eq!(f.dimensionality(), Some(Dimensionality::D2));
        assert_eq!(f.data_type(), Some(DataType::UInt));
        assert_eq!(f.format_code(), Some(FormatCode::Bits8));
        assert_eq!(f.compression(), Some(Compression::None));
        assert_eq!(f.access(), Some(Access::ReadWrite));
        assert!(f.is_reversed() && f.is_srgb() && f.is_normalized());
        assert!(!f.has_array());
        assert_eq!(f.table_key(), ImageFormat::BGRA8_SRGB);
        assert_eq!(f.without_access().access(), None);
    }

    #[test]
    fn shim_storage() {
        let f = ImageFormat::IMAGE_2D | ImageFormat::RGB8;
        assert_eq!(f.four_channel_storage(), ImageFormat::IMAGE_2D | ImageFormat::RGBA8);
        let f = ImageFormat::IMAGE_2D | ImageFormat::RG8;
        assert_eq!(f.four_channel_storage(), f);
    }
}
