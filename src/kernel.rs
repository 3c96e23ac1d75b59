// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Kernels and their argument contract.

A kernel argument is one of: a plain value ([`ReprC`]), a buffer, an image, or an argument
buffer. Anything else is rejected at compile time. In particular raw pointers and null can't be
marshaled into a binding slot, so they don't implement [`KernelArg`]:

```
use kernels_and_images::kernel::KernelArgs;
fn check<A: KernelArgs>(_: A) {}
check((1u32, 2.0f32, [0u8; 4]));
```

```compile_fail
use kernels_and_images::kernel::KernelArgs;
fn check<A: KernelArgs>(_: A) {}
check((std::ptr::null::<f32>(),));
```

```compile_fail
use kernels_and_images::kernel::KernelArgs;
fn check<A: KernelArgs>(_: A) {}
let value = 3.0f32;
check((&value as *const f32, 1u32));
```

Argument *kinds* are checked again at dispatch against the kernel's [`KernelDesc`], since which
slot takes what is only known once a kernel is loaded.
*/

use crate::buffer::{ArgumentBuffer, Buffer};
use crate::device::{Device, DeviceId};
use crate::error::ExecuteError;
use crate::image::{Image, ImageInfo};
use crate::imp::KernelEntryImp;
use crate::pixel_formats::Access;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::ops::Range;
use std::sync::{Arc, MutexGuard};

/**
Types that can be passed to a kernel by value.

# Safety

Implementors must have no padding bytes, and every bit pattern of their size must be a valid
value. Kernel arguments are copied out as bytes, and host kernels read them back from bytes.
*/
pub unsafe trait ReprC: Copy + Send + Sync + 'static {}

unsafe impl ReprC for u8 {}
unsafe impl ReprC for i8 {}
unsafe impl ReprC for u16 {}
unsafe impl ReprC for i16 {}
unsafe impl ReprC for u32 {}
unsafe impl ReprC for i32 {}
unsafe impl ReprC for u64 {}
unsafe impl ReprC for i64 {}
unsafe impl ReprC for f32 {}
unsafe impl ReprC for f64 {}
unsafe impl ReprC for half::f16 {}
unsafe impl<T: ReprC, const N: usize> ReprC for [T; N] {}

pub(crate) fn bytes_of<T: ReprC>(value: &T) -> &[u8] {
    //safe because ReprC types have no padding
    unsafe { std::slice::from_raw_parts(value as *const T as *const u8, std::mem::size_of::<T>()) }
}

pub(crate) fn from_bytes<T: ReprC>(bytes: &[u8]) -> Option<T> {
    if bytes.len() < std::mem::size_of::<T>() {
        return None;
    }
    //safe because any bit pattern is a valid ReprC value
    Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

/// A marshaled kernel argument.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Scalar(Vec<u8>),
    Buffer(Arc<Buffer>),
    Image(Arc<Image>),
    ArgumentBuffer(Arc<ArgumentBuffer>),
}

impl ArgValue {
    fn kind_name(&self) -> String {
        match self {
            ArgValue::Scalar(bytes) => format!("a {}-byte value", bytes.len()),
            ArgValue::Buffer(_) => "a buffer".to_string(),
            ArgValue::Image(_) => "an image".to_string(),
            ArgValue::ArgumentBuffer(_) => "an argument buffer".to_string(),
        }
    }
}

#[diagnostic::on_unimplemented(
    message = "`{Self}` can't be passed to a kernel",
    label = "not a kernel argument",
    note = "kernel arguments are ReprC values, buffers, images or argument buffers; raw pointers and null have no binding slot"
)]
pub trait KernelArg {
    fn into_arg(self) -> ArgValue;
}

impl<T: ReprC> KernelArg for T {
    fn into_arg(self) -> ArgValue {
        ArgValue::Scalar(bytes_of(&self).to_vec())
    }
}

impl KernelArg for Arc<Buffer> {
    fn into_arg(self) -> ArgValue {
        ArgValue::Buffer(self)
    }
}
impl KernelArg for &Arc<Buffer> {
    fn into_arg(self) -> ArgValue {
        ArgValue::Buffer(self.clone())
    }
}
impl KernelArg for Arc<Image> {
    fn into_arg(self) -> ArgValue {
        ArgValue::Image(self)
    }
}
impl KernelArg for &Arc<Image> {
    fn into_arg(self) -> ArgValue {
        ArgValue::Image(self.clone())
    }
}
impl KernelArg for Arc<ArgumentBuffer> {
    fn into_arg(self) -> ArgValue {
        ArgValue::ArgumentBuffer(self)
    }
}
impl KernelArg for &Arc<ArgumentBuffer> {
    fn into_arg(self) -> ArgValue {
        ArgValue::ArgumentBuffer(self.clone())
    }
}

/// A complete argument list: a tuple of up to 12 [`KernelArg`]s.
pub trait KernelArgs {
    fn into_args(self) -> Vec<ArgValue>;
}

impl KernelArgs for () {
    fn into_args(self) -> Vec<ArgValue> {
        Vec::new()
    }
}

macro_rules! kernel_args {
    ($($name:ident),+) => {
        impl<$($name: KernelArg),+> KernelArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<ArgValue> {
                let ($($name,)+) = self;
                vec![$($name.into_arg()),+]
            }
        }
    };
}

kernel_args!(A);
kernel_args!(A, B);
kernel_args!(A, B, C);
kernel_args!(A, B, C, D);
kernel_args!(A, B, C, D, E);
kernel_args!(A, B, C, D, E, F);
kernel_args!(A, B, C, D, E, F, G);
kernel_args!(A, B, C, D, E, F, G, H);
kernel_args!(A, B, C, D, E, F, G, H, I);
kernel_args!(A, B, C, D, E, F, G, H, I, J);
kernel_args!(A, B, C, D, E, F, G, H, I, J, K);
kernel_args!(A, B, C, D, E, F, G, H, I, J, K, L);

/// What a kernel parameter slot takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgSpec {
    Scalar { size: usize },
    Buffer,
    /// An image, made readable and/or writable according to `access` before the dispatch.
    Image { access: Access },
    ArgumentBuffer,
}

impl ArgSpec {
    pub const fn scalar<T: ReprC>() -> Self {
        ArgSpec::Scalar {
            size: std::mem::size_of::<T>(),
        }
    }

    fn accepts(&self, value: &ArgValue) -> bool {
        match (self, value) {
            (ArgSpec::Scalar { size }, ArgValue::Scalar(bytes)) => bytes.len() == *size,
            (ArgSpec::Buffer, ArgValue::Buffer(_)) => true,
            (ArgSpec::Image { .. }, ArgValue::Image(_)) => true,
            (ArgSpec::ArgumentBuffer, ArgValue::ArgumentBuffer(_)) => true,
            _ => false,
        }
    }
}

impl Display for ArgSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgSpec::Scalar { size } => write!(f, "a {size}-byte value"),
            ArgSpec::Buffer => write!(f, "a buffer"),
            ArgSpec::Image { access } => write!(f, "an image ({access:?})"),
            ArgSpec::ArgumentBuffer => write!(f, "an argument buffer"),
        }
    }
}

/// The signature of a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDesc {
    pub name: String,
    pub args: Vec<ArgSpec>,
    /// Largest `x * y * z` work-group size the kernel was built for, if it is smaller than the
    /// device's.
    pub max_total_local_size: Option<u32>,
}

impl KernelDesc {
    pub fn new(name: impl Into<String>) -> Self {
        KernelDesc {
            name: name.into(),
            args: Vec::new(),
            max_total_local_size: None,
        }
    }
    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }
    pub fn max_total_local_size(mut self, size: u32) -> Self {
        self.max_total_local_size = Some(size);
        self
    }

    pub(crate) fn validate_args(&self, args: &[ArgValue]) -> Result<(), ExecuteError> {
        if args.len() != self.args.len() {
            return Err(ExecuteError::ArgumentCount {
                kernel: self.name.clone(),
                expected: self.args.len(),
                actual: args.len(),
            });
        }
        for (index, (spec, value)) in self.args.iter().zip(args).enumerate() {
            if !spec.accepts(value) {
                return Err(ExecuteError::ArgumentKind {
                    kernel: self.name.clone(),
                    index,
                    expected: spec.to_string(),
                    actual: value.kind_name(),
                });
            }
        }
        Ok(())
    }

    /// Checks a work-group size against the kernel's and the device's limit.
    pub(crate) fn validate_local_size(
        &self,
        local_size: [u32; 3],
        device_max: Option<u32>,
    ) -> Result<(), ExecuteError> {
        if local_size.contains(&0) {
            return Err(ExecuteError::ZeroLocalSize);
        }
        let total = local_size
            .iter()
            .fold(1u64, |total, size| total * *size as u64);
        let max = match (self.max_total_local_size, device_max) {
            (Some(kernel), Some(device)) => Some(kernel.min(device)),
            (kernel, device) => kernel.or(device),
        };
        if let Some(max) = max
            && total > max as u64
        {
            return Err(ExecuteError::LocalSizeTooLarge {
                size: total.min(u32::MAX as u64) as u32,
                max,
            });
        }
        Ok(())
    }
}

/// Position of one work-item in a host dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub global_id: [u32; 3],
    pub local_id: [u32; 3],
    pub group_id: [u32; 3],
    pub global_size: [u32; 3],
    pub local_size: [u32; 3],
}

/// A kernel for the host backend, called once per work-item.
pub type HostKernelFn = Arc<dyn Fn(&WorkItem, &mut HostArgs<'_>) + Send + Sync>;

/// The code of a kernel. Each backend loads the kind it can run.
#[derive(Clone)]
pub enum KernelProgram {
    /// A compiled module for explicit devices, with the entry point named by [`KernelDesc::name`].
    Binary(Vec<u8>),
    Host(HostKernelFn),
}

impl KernelProgram {
    pub fn host(f: impl Fn(&WorkItem, &mut HostArgs<'_>) + Send + Sync + 'static) -> Self {
        KernelProgram::Host(Arc::new(f))
    }
}

impl Debug for KernelProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelProgram::Binary(code) => write!(f, "KernelProgram::Binary({} bytes)", code.len()),
            KernelProgram::Host(_) => write!(f, "KernelProgram::Host(..)"),
        }
    }
}

pub(crate) enum HostSlot<'a> {
    Scalar(&'a [u8]),
    Memory(MutexGuard<'a, Vec<u8>>),
    Image(MutexGuard<'a, Vec<u8>>, ImageInfo),
}

/**
Arguments as seen by a host kernel, by slot index.

Buffers and images are locked for the whole dispatch. Images expose their storage bytes: every
level, each level holding all of its layers.
*/
pub struct HostArgs<'a> {
    pub(crate) slots: Vec<HostSlot<'a>>,
}

impl HostArgs<'_> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn scalar<T: ReprC>(&self, index: usize) -> Option<T> {
        match self.slots.get(index)? {
            HostSlot::Scalar(bytes) if bytes.len() == std::mem::size_of::<T>() => from_bytes(bytes),
            _ => None,
        }
    }

    pub fn bytes(&self, index: usize) -> Option<&[u8]> {
        match self.slots.get(index)? {
            HostSlot::Scalar(bytes) => Some(&bytes[..]),
            HostSlot::Memory(memory) | HostSlot::Image(memory, _) => Some(&memory[..]),
        }
    }

    /// Writable bytes of a buffer or image slot.
    pub fn bytes_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        match self.slots.get_mut(index)? {
            HostSlot::Scalar(_) => None,
            HostSlot::Memory(memory) | HostSlot::Image(memory, _) => Some(&mut memory[..]),
        }
    }

    /// Element `element` of a buffer viewed as an array of `T`.
    pub fn read<T: ReprC>(&self, index: usize, element: usize) -> Option<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.bytes(index)?;
        from_bytes(bytes.get(element_range(element, size)?)?)
    }

    /// Stores `value` as element `element`. Returns `false` when out of bounds.
    pub fn write<T: ReprC>(&mut self, index: usize, element: usize, value: T) -> bool {
        let size = std::mem::size_of::<T>();
        let Some(range) = element_range(element, size) else {
            return false;
        };
        match self.bytes_mut(index).and_then(|bytes| bytes.get_mut(range)) {
            Some(slot) => {
                slot.copy_from_slice(bytes_of(&value));
                true
            }
            None => false,
        }
    }

    pub fn image_info(&self, index: usize) -> Option<ImageInfo> {
        match self.slots.get(index)? {
            HostSlot::Image(_, info) => Some(*info),
            _ => None,
        }
    }

    /// Storage bytes of the level 0 texel at `coord`. For arrays and cube maps the coordinate
    /// after the spatial ones selects the layer.
    pub fn texel(&self, index: usize, coord: [u32; 3]) -> Option<&[u8]> {
        match self.slots.get(index)? {
            HostSlot::Image(memory, info) => {
                let range = info.texel_range(coord)?;
                memory.get(range)
            }
            _ => None,
        }
    }

    pub fn texel_mut(&mut self, index: usize, coord: [u32; 3]) -> Option<&mut [u8]> {
        match self.slots.get_mut(index)? {
            HostSlot::Image(memory, info) => {
                let range = info.texel_range(coord)?;
                memory.get_mut(range)
            }
            _ => None,
        }
    }
}

fn element_range(element: usize, size: usize) -> Option<Range<usize>> {
    let start = element.checked_mul(size)?;
    Some(start..start.checked_add(size)?)
}

/// A loaded kernel: its signature, and one entry per device that can run it.
#[derive(Debug)]
pub struct Kernel {
    desc: KernelDesc,
    entries: HashMap<DeviceId, KernelEntryImp>,
}

impl Kernel {
    pub(crate) fn new(desc: KernelDesc, entries: HashMap<DeviceId, KernelEntryImp>) -> Self {
        Kernel { desc, entries }
    }
    pub fn name(&self) -> &str {
        &self.desc.name
    }
    pub fn desc(&self) -> &KernelDesc {
        &self.desc
    }
    pub fn has_entry(&self, device: &Device) -> bool {
        self.entries.contains_key(&device.id())
    }
    pub(crate) fn entry(&self, device: DeviceId) -> Result<&KernelEntryImp, ExecuteError> {
        self.entries
            .get(&device)
            .ok_or_else(|| ExecuteError::NoEntry(self.desc.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_marshal_as_bytes() {
        let args = (1u32, [2u16, 3u16], half::f16::from_f32(1.0)).into_args();
        assert_eq!(args.len(), 3);
        match &args[1] {
            ArgValue::Scalar(bytes) => assert_eq!(bytes, &[2, 0, 3, 0]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn huge_element_indices_are_out_of_bounds() {
        let memory = std::sync::Mutex::new(vec![0u8; 16]);
        let mut args = HostArgs {
            slots: vec![HostSlot::Memory(memory.lock().unwrap())],
        };
        assert!(args.write(0, 3, 9u32));
        assert_eq!(args.read::<u32>(0, 3), Some(9));
        assert_eq!(args.read::<u32>(0, 4), None);
        assert_eq!(args.read::<u32>(0, usize::MAX / 2), None);
        assert!(!args.write(0, usize::MAX / 4 + 1, 1u32));
        assert!(!args.write(0, usize::MAX, 1u32));
    }

    #[test]
    fn argument_kinds_are_checked() {
        let desc = KernelDesc::new("scale")
            .arg(ArgSpec::scalar::<f32>())
            .arg(ArgSpec::scalar::<u32>());
        assert!(desc.validate_args(&(1.0f32, 2u32).into_args()).is_ok());
        assert!(matches!(
            desc.validate_args(&(1.0f32,).into_args()),
            Err(ExecuteError::ArgumentCount {
                expected: 2,
                actual: 1,
                ..
            })
        ));
        assert!(matches!(
            desc.validate_args(&(1.0f32, 2u64).into_args()),
            Err(ExecuteError::ArgumentKind { index: 1, .. })
        ));
    }

    #[test]
    fn local_size_limits() {
        let desc = KernelDesc::new("k").max_total_local_size(64);
        assert_eq!(
            desc.validate_local_size([0, 1, 1], None),
            Err(ExecuteError::ZeroLocalSize)
        );
        assert!(desc.validate_local_size([8, 8, 1], Some(1024)).is_ok());
        assert_eq!(
            desc.validate_local_size([16, 8, 1], Some(1024)),
            Err(ExecuteError::LocalSizeTooLarge { size: 128, max: 64 })
        );
        let unlimited = KernelDesc::new("k");
        assert_eq!(
            unlimited.validate_local_size([32, 32, 2], Some(1024)),
            Err(ExecuteError::LocalSizeTooLarge {
                size: 2048,
                max: 1024
            })
        );
    }

    #[test]
    fn byte_views_round_trip() {
        let value = [1.5f32, -2.0];
        let bytes = bytes_of(&value).to_vec();
        assert_eq!(from_bytes::<[f32; 2]>(&bytes), Some(value));
        assert_eq!(from_bytes::<u64>(&bytes[..4]), None);
    }
}
