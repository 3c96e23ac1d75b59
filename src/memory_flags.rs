// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Memory flags and their normalization policy.
//!
//! Every buffer and image is created with a [`MemoryFlags`] set. Before the set is stored it goes
//! through [`MemoryFlags::normalize`], which fills in defaults and resolves contradictions.
//! Normalization never fails: each violation is logged and corrected, and the corrections are
//! returned so callers (and tests) can see what happened.

use std::fmt::Display;

bitflags::bitflags! {
    /// Access and placement flags of a memory object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryFlags: u32 {
        /// Kernels may read the object.
        const READ = 1 << 0;
        /// Kernels may write the object.
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        /// The host may read the object.
        const HOST_READ = 1 << 2;
        /// The host may write the object.
        const HOST_WRITE = 1 << 3;
        const HOST_READ_WRITE = Self::HOST_READ.bits() | Self::HOST_WRITE.bits();
        /// The device aliases the caller's host allocation instead of owning a copy.
        const USE_HOST_MEMORY = 1 << 4;
        /// The object's memory is shared with a foreign graphics API or the OS.
        const SHARING = 1 << 5;
        /// Array layers are bound to individual native images sharing one allocation.
        const ALIASING = 1 << 6;
        /// Initial host data is not copied to the device at creation.
        const NO_INITIAL_COPY = 1 << 7;
        /// Mip levels are regenerated from level 0 after every host write.
        const GENERATE_MIP_MAPS = 1 << 8;
    }
}

impl Default for MemoryFlags {
    fn default() -> Self {
        MemoryFlags::READ_WRITE
    }
}

/// The foreign API a shared object is exchanged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ForeignKind {
    OpenGl,
    Vulkan,
    Metal,
    /// POSIX file descriptor
    OpaqueFd,
    /// Windows NT handle
    OpaqueWin32,
}

/// A correction applied by [`MemoryFlags::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Sharing was requested without saying what to share with.
    MissingForeignKind,
    /// Host memory use and sharing were both set; host memory use was dropped.
    HostMemoryDroppedForSharing,
    /// Neither device read nor write was set; both were set.
    DeviceAccessDefaulted,
    /// Host memory use was set without host access; host read-write was set.
    HostAccessForced,
}

impl Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Correction::MissingForeignKind => write!(f, "sharing requested without a foreign API"),
            Correction::HostMemoryDroppedForSharing => {
                write!(f, "host memory use is incompatible with sharing and was dropped")
            }
            Correction::DeviceAccessDefaulted => {
                write!(f, "no device access specified, defaulting to read-write")
            }
            Correction::HostAccessForced => write!(
                f,
                "host memory use requires host access, defaulting to host read-write"
            ),
        }
    }
}

/// Result of [`MemoryFlags::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub flags: MemoryFlags,
    pub corrections: Vec<Correction>,
}

impl MemoryFlags {
    /**
    Applies the normalization policy.

    The checks run in a fixed order:

    1. Sharing: a missing `foreign_kind` is reported, and [`MemoryFlags::USE_HOST_MEMORY`] is
       cleared if it was also set.
    2. Device access: if neither [`MemoryFlags::READ`] nor [`MemoryFlags::WRITE`] is set, both are.
    3. Host access: if [`MemoryFlags::USE_HOST_MEMORY`] is set without any host access,
       [`MemoryFlags::HOST_READ_WRITE`] is set.

    ```
    use kernels_and_images::memory_flags::{Correction, MemoryFlags};

    let n = MemoryFlags::USE_HOST_MEMORY.normalize(None);
    assert!(n.flags.contains(MemoryFlags::READ_WRITE | MemoryFlags::HOST_READ_WRITE));
    assert_eq!(
        n.corrections,
        vec![Correction::DeviceAccessDefaulted, Correction::HostAccessForced]
    );
    ```
    */
    pub fn normalize(self, foreign_kind: Option<ForeignKind>) -> Normalized {
        let mut flags = self;
        let mut corrections = Vec::new();
        if flags.contains(MemoryFlags::SHARING) {
            if foreign_kind.is_none() {
                logwise::error_sync!("memory sharing requested without a foreign API kind");
                corrections.push(Correction::MissingForeignKind);
            }
            if flags.contains(MemoryFlags::USE_HOST_MEMORY) {
                logwise::warn_sync!("host memory use dropped in favor of sharing");
                flags.remove(MemoryFlags::USE_HOST_MEMORY);
                corrections.push(Correction::HostMemoryDroppedForSharing);
            }
        }
        if !flags.intersects(MemoryFlags::READ_WRITE) {
            flags.insert(MemoryFlags::READ_WRITE);
            corrections.push(Correction::DeviceAccessDefaulted);
        }
        if flags.contains(MemoryFlags::USE_HOST_MEMORY)
            && !flags.intersects(MemoryFlags::HOST_READ_WRITE)
        {
            logwise::error_sync!(
                "host memory use requires host read or write access, using host read-write"
            );
            flags.insert(MemoryFlags::HOST_READ_WRITE);
            corrections.push(Correction::HostAccessForced);
        }
        Normalized { flags, corrections }
    }

    pub fn device_reads(self) -> bool {
        self.contains(MemoryFlags::READ)
    }
    pub fn device_writes(self) -> bool {
        self.contains(MemoryFlags::WRITE)
    }
    pub fn is_read_only(self) -> bool {
        self.device_reads() && !self.device_writes()
    }
    pub fn host_access(self) -> bool {
        self.intersects(MemoryFlags::HOST_READ_WRITE)
    }
}

bitflags::bitflags! {
    /// How a host mapping of a memory object is used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        /// The mapping is read; the current device contents are copied in.
        const READ = 1 << 0;
        /// The mapping is written back on unmap.
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        /// The whole object is overwritten, so current contents are not copied in.
        const WRITE_INVALIDATE = 1 << 2;
        /// Wait for outstanding work before mapping.
        const BLOCK = 1 << 3;
    }
}

impl MapFlags {
    pub fn writes(self) -> bool {
        self.intersects(MapFlags::WRITE | MapFlags::WRITE_INVALIDATE)
    }
    pub fn needs_download(self) -> bool {
        !self.contains(MapFlags::WRITE_INVALIDATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_access_defaults() {
        let n = MemoryFlags::empty().normalize(None);
        assert!(n.flags.contains(MemoryFlags::READ_WRITE));
        assert_eq!(n.corrections, vec![Correction::DeviceAccessDefaulted]);
        //explicit access is untouched
        let n = MemoryFlags::READ.normalize(None);
        assert_eq!(n.flags, MemoryFlags::READ);
        assert!(n.corrections.is_empty());
    }

    #[test]
    fn host_access_forced() {
        let n = (MemoryFlags::READ | MemoryFlags::USE_HOST_MEMORY).normalize(None);
        assert!(n.flags.contains(MemoryFlags::HOST_READ_WRITE));
        assert_eq!(n.corrections, vec![Correction::HostAccessForced]);
        //existing host access is kept
        let n = (MemoryFlags::READ | MemoryFlags::USE_HOST_MEMORY | MemoryFlags::HOST_READ)
            .normalize(None);
        assert!(!n.flags.contains(MemoryFlags::HOST_WRITE));
    }

    #[test]
    fn sharing_wins_over_host_memory() {
        let all = MemoryFlags::all();
        for bits in 0..=all.bits() {
            let flags = MemoryFlags::from_bits_truncate(bits);
            for kind in [None, Some(ForeignKind::Vulkan)] {
                let n = flags.normalize(kind);
                assert!(
                    !(n.flags.contains(MemoryFlags::USE_HOST_MEMORY)
                        && n.flags.contains(MemoryFlags::SHARING))
                );
                assert!(n.flags.intersects(MemoryFlags::READ_WRITE));
            }
        }
    }

    #[test]
    fn sharing_checks_run_first() {
        //host memory is dropped before the host-access check, so host access is not forced
        let n = (MemoryFlags::USE_HOST_MEMORY | MemoryFlags::SHARING)
            .normalize(Some(ForeignKind::OpaqueFd));
        assert!(!n.flags.intersects(MemoryFlags::HOST_READ_WRITE));
        assert_eq!(
            n.corrections,
            vec![
                Correction::HostMemoryDroppedForSharing,
                Correction::DeviceAccessDefaulted
            ]
        );
        let n = MemoryFlags::SHARING.normalize(None);
        assert_eq!(n.corrections[0], Correction::MissingForeignKind);
    }

    #[test]
    fn map_flags() {
        assert!(MapFlags::WRITE_INVALIDATE.writes());
        assert!(!MapFlags::WRITE_INVALIDATE.needs_download());
        assert!(MapFlags::READ.needs_download());
        assert!(!MapFlags::READ.writes());
    }
}
