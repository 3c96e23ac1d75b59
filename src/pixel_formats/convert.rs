// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Texel-level conversions shared by the backends: 3-to-4 channel widening for shimmed
//! storage, and box-filter averaging for mip generation.

use super::{DataType, ImageExtent, ImageFormat};
use half::f16;

/// Byte width of one channel, for formats with a uniform power-of-two channel width.
fn uniform_channel_bytes(format: ImageFormat) -> Option<usize> {
    if format.is_compressed() {
        return None;
    }
    let bits = format.bits_of_channel(0);
    let uniform = (0..format.channel_count()).all(|c| format.bits_of_channel(c) == bits);
    match bits {
        8 | 16 | 32 | 64 if uniform => Some(bits as usize / 8),
        _ => None,
    }
}

/// Encoded "one" for a channel of `format`: the max value for normalized or integer channels,
/// 1.0 for floats.
fn one(format: ImageFormat, channel_bytes: usize) -> Vec<u8> {
    let normalized = format.is_normalized();
    match (format.data_type(), channel_bytes) {
        (Some(DataType::Float), 2) => f16::ONE.to_le_bytes().to_vec(),
        (Some(DataType::Float), 4) => 1.0f32.to_le_bytes().to_vec(),
        (Some(DataType::Float), 8) => 1.0f64.to_le_bytes().to_vec(),
        (Some(DataType::Int), n) if normalized => {
            //largest positive value
            let mut bytes = vec![0xFF; n];
            bytes[n - 1] = 0x7F;
            bytes
        }
        (Some(DataType::Int), n) => {
            let mut bytes = vec![0; n];
            bytes[0] = 1;
            bytes
        }
        (Some(DataType::UInt), n) if normalized => vec![0xFF; n],
        (_, n) => {
            let mut bytes = vec![0; n];
            if n > 0 {
                bytes[0] = 1;
            }
            bytes
        }
    }
}

/**
Widens tightly packed 3-channel texels of `format` to 4 channels, filling the new channel with
the format's "one".

Returns `None` when `format` is not a 3-channel format with uniform channel widths.
*/
pub(crate) fn widen_to_four_channels(format: ImageFormat, data: &[u8]) -> Option<Vec<u8>> {
    if format.channel_count() != 3 {
        return None;
    }
    let channel = uniform_channel_bytes(format)?;
    let src_texel = channel * 3;
    let alpha = one(format, channel);
    let texels = data.len() / src_texel;
    let mut out = Vec::with_capacity(texels * channel * 4);
    for texel in data.chunks_exact(src_texel) {
        out.extend_from_slice(texel);
        out.extend_from_slice(&alpha);
    }
    Some(out)
}

fn read_channel(format: ImageFormat, bytes: &[u8]) -> f64 {
    match (format.data_type(), bytes.len()) {
        (Some(DataType::Float), 2) => f16::from_le_bytes([bytes[0], bytes[1]]).to_f64(),
        (Some(DataType::Float), 4) => {
            f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        (Some(DataType::Float), 8) => {
            let mut b = [0; 8];
            b.copy_from_slice(bytes);
            f64::from_le_bytes(b)
        }
        (Some(DataType::Int), n) => {
            let mut b = [0; 8];
            b[..n].copy_from_slice(bytes);
            //sign extend
            let shift = 64 - 8 * n as u32;
            ((i64::from_le_bytes(b) << shift) >> shift) as f64
        }
        (_, n) => {
            let mut b = [0; 8];
            b[..n].copy_from_slice(bytes);
            u64::from_le_bytes(b) as f64
        }
    }
}

fn write_channel(format: ImageFormat, value: f64, out: &mut [u8]) {
    let n = out.len();
    match (format.data_type(), n) {
        (Some(DataType::Float), 2) => out.copy_from_slice(&f16::from_f64(value).to_le_bytes()),
        (Some(DataType::Float), 4) => out.copy_from_slice(&(value as f32).to_le_bytes()),
        (Some(DataType::Float), 8) => out.copy_from_slice(&value.to_le_bytes()),
        (Some(DataType::Int), _) => {
            let rounded = value.round() as i64;
            out.copy_from_slice(&rounded.to_le_bytes()[..n]);
        }
        _ => {
            let rounded = value.round().max(0.0) as u64;
            out.copy_from_slice(&rounded.to_le_bytes()[..n]);
        }
    }
}

/**
Computes mip level `dst_extent` from the level above it by averaging each 2x2 (2x2x2 for 3D)
footprint.

`src` and the returned data hold every native layer of the level, layer after layer. Formats
without uniform channel widths fall back to point sampling the footprint's first texel.
*/
pub(crate) fn downsample(
    format: ImageFormat,
    src: &[u8],
    src_extent: ImageExtent,
    dst_extent: ImageExtent,
) -> Vec<u8> {
    let texel = format.bytes_per_pixel() as usize;
    let layers = format.layer_count(src_extent) as usize;
    let dims = format.dimension_count();
    let (sw, sh, sd) = spatial(dims, src_extent);
    let (dw, dh, dd) = spatial(dims, dst_extent);
    let src_layer = sw * sh * sd * texel;
    let dst_layer = dw * dh * dd * texel;
    let mut out = vec![0u8; dst_layer * layers];
    if texel == 0 || src.len() < src_layer * layers {
        return out;
    }
    let channel = uniform_channel_bytes(format);
    let channels = format.channel_count() as usize;
    let mut sums = vec![0f64; channels];
    for layer in 0..layers {
        let src = &src[layer * src_layer..(layer + 1) * src_layer];
        let dst = &mut out[layer * dst_layer..(layer + 1) * dst_layer];
        for z in 0..dd {
            for y in 0..dh {
                for x in 0..dw {
                    let dst_offset = ((z * dh + y) * dw + x) * texel;
                    let footprint = footprint(x, y, z, sw, sh, sd);
                    match channel {
                        Some(channel_bytes) => {
                            sums.iter_mut().for_each(|s| *s = 0.0);
                            let mut count = 0.0;
                            for (fx, fy, fz) in footprint {
                                let offset = ((fz * sh + fy) * sw + fx) * texel;
                                for (c, sum) in sums.iter_mut().enumerate() {
                                    let start = offset + c * channel_bytes;
                                    *sum +=
                                        read_channel(format, &src[start..start + channel_bytes]);
                                }
                                count += 1.0;
                            }
                            for (c, sum) in sums.iter().enumerate() {
                                let start = dst_offset + c * channel_bytes;
                                write_channel(
                                    format,
                                    sum / count,
                                    &mut dst[start..start + channel_bytes],
                                );
                            }
                        }
                        None => {
                            let (fx, fy, fz) = footprint[0];
                            let offset = ((fz * sh + fy) * sw + fx) * texel;
                            dst[dst_offset..dst_offset + texel]
                                .copy_from_slice(&src[offset..offset + texel]);
                        }
                    }
                }
            }
        }
    }
    out
}

fn spatial(dims: u32, extent: ImageExtent) -> (usize, usize, usize) {
    let w = extent.width.max(1) as usize;
    let h = if dims >= 2 { extent.height.max(1) as usize } else { 1 };
    let d = if dims == 3 { extent.depth.max(1) as usize } else { 1 };
    (w, h, d)
}

fn footprint(
    x: usize,
    y: usize,
    z: usize,
    sw: usize,
    sh: usize,
    sd: usize,
) -> Vec<(usize, usize, usize)> {
    let mut texels = Vec::with_capacity(8);
    for fz in [z * 2, z * 2 + 1] {
        if fz >= sd {
            continue;
        }
        for fy in [y * 2, y * 2 + 1] {
            if fy >= sh {
                continue;
            }
            for fx in [x * 2, x * 2 + 1] {
                if fx < sw {
                    texels.push((fx, fy, fz));
                }
            }
        }
    }
    if texels.is_empty() {
        texels.push((x.min(sw - 1), y.min(sh - 1), z.min(sd - 1)));
    }
    texels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_unorm8() {
        let format = ImageFormat::IMAGE_2D | ImageFormat::RGB8;
        let widened = widen_to_four_channels(format, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(widened, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn widen_half_float() {
        let format = ImageFormat::IMAGE_2D | ImageFormat::RGB16F;
        let texel: Vec<u8> = [0.5f32, 0.25, 0.125]
            .iter()
            .flat_map(|v| f16::from_f32(*v).to_le_bytes())
            .collect();
        let widened = widen_to_four_channels(format, &texel).unwrap();
        assert_eq!(widened.len(), 8);
        assert_eq!(f16::from_le_bytes([widened[6], widened[7]]), f16::ONE);
    }

    #[test]
    fn widen_rejects_packed() {
        let format = ImageFormat::IMAGE_2D | ImageFormat::R5G6B5;
        assert!(widen_to_four_channels(format, &[0, 0]).is_none());
    }

    #[test]
    fn box_filter_rgba8() {
        let format = ImageFormat::IMAGE_2D | ImageFormat::RGBA8;
        #[rustfmt::skip]
        let src = [
            0, 0, 0, 0,   2, 2, 2, 2,
            4, 4, 4, 4,   6, 6, 6, 6,
        ];
        let out = downsample(
            format,
            &src,
            ImageExtent::new_2d(2, 2),
            ImageExtent::new_2d(1, 1),
        );
        assert_eq!(out, vec![3, 3, 3, 3]);
    }

    #[test]
    fn box_filter_float_layers() {
        let format = ImageFormat::IMAGE_2D_ARRAY | ImageFormat::R32F;
        let values = [1.0f32, 2.0, 3.0, 4.0, 10.0, 10.0, 20.0, 20.0];
        let src: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let extent = ImageExtent::new_2d(2, 2).with_layers(2);
        let out = downsample(format, &src, extent, ImageExtent::new_2d(1, 1).with_layers(2));
        assert_eq!(f32::from_le_bytes([out[0], out[1], out[2], out[3]]), 2.5);
        assert_eq!(f32::from_le_bytes([out[4], out[5], out[6], out[7]]), 15.0);
    }

    #[test]
    fn signed_average() {
        let format = ImageFormat::IMAGE_1D | ImageFormat::R8I;
        let out = downsample(
            format,
            &[(-4i8) as u8, (-2i8) as u8],
            ImageExtent::new_1d(2),
            ImageExtent::new_1d(1),
        );
        assert_eq!(out, vec![(-3i8) as u8]);
    }
}
