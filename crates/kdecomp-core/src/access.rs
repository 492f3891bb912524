//! JVM access flags.
//!
//! The JVM reuses several bits with a different meaning depending on what
//! they are attached to (`0x0040` is `volatile` on a field and `bridge` on a
//! method). Both names are kept so call sites read naturally; the modifier
//! model in [`crate::modifier`] decides which interpretation applies to a
//! given declaration.

use bitflags::bitflags;

bitflags! {
    /// Raw JVM access flags as stored in class, field, method and
    /// inner-class records.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        /// Same bit as `SYNCHRONIZED`; set on classes by modern compilers.
        const SUPER = 0x0020;
        const VOLATILE = 0x0040;
        /// Same bit as `VOLATILE`; method-only meaning.
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        /// Same bit as `TRANSIENT`; method-only meaning.
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl AccessFlags {
    /// The three visibility bits.
    pub const ACCESSIBILITY: AccessFlags = AccessFlags::PUBLIC
        .union(AccessFlags::PROTECTED)
        .union(AccessFlags::PRIVATE);

    /// Bits that survive on a local class.
    pub const LOCAL_CLASS_MASK: AccessFlags = AccessFlags::ABSTRACT.union(AccessFlags::FINAL);

    /// Just the visibility part of these flags.
    pub fn accessibility(self) -> AccessFlags {
        self & AccessFlags::ACCESSIBILITY
    }

    /// True if any of the synthetic markers is present.
    pub fn is_synthetic(self) -> bool {
        self.contains(AccessFlags::SYNTHETIC)
    }
}

/// Serde adapter storing [`AccessFlags`] as the raw `u16` the class file uses.
///
/// Unknown bits are preserved so a round trip never loses information.
pub mod serde_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::AccessFlags;

    pub fn serialize<S: Serializer>(flags: &AccessFlags, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(flags.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AccessFlags, D::Error> {
        let bits = u16::deserialize(deserializer)?;
        Ok(AccessFlags::from_bits_retain(bits))
    }
}
