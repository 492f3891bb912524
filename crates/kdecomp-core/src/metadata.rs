//! Kotlin compiler metadata.
//!
//! Kotlin classes carry a `@kotlin.Metadata` annotation whose payload
//! describes declarations in Kotlin terms: visibility such as `internal`,
//! modality such as `open` or `sealed`, and property traits such as `var`
//! or `const` that the JVM access flags cannot express. The payload arrives
//! here already decoded; this module only models it.
//!
//! # Flag layout
//!
//! | Bits    | Meaning                                                       |
//! |---------|---------------------------------------------------------------|
//! | 0       | has annotations                                               |
//! | 1..=3   | visibility (internal, private, protected, public, private-to-this, local) |
//! | 4..=5   | modality (final, open, abstract, sealed)                      |
//! | 6..=8   | class kind, or member kind for functions and properties       |
//! | 9..     | declaration-specific bits (see the constants below)           |
//!
//! Value parameters use a shorter layout: bit 0 annotations, bit 6 declares
//! a default value, bit 7 crossinline, bit 8 noinline.

use serde::{Deserialize, Serialize};

// ============================================================================
// Flag Words
// ============================================================================

/// A raw Kotlin metadata flag word.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFlags(pub u32);

impl MetadataFlags {
    /// Read a multi-bit field.
    pub fn field(self, field: FlagField) -> u32 {
        field.extract(self.0)
    }

    /// Evaluate a single bit-test against this word.
    pub fn test(self, test: FlagTest) -> bool {
        test.matches(self)
    }
}

/// A contiguous group of bits inside a flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagField {
    pub shift: u8,
    pub width: u8,
}

impl FlagField {
    pub const fn new(shift: u8, width: u8) -> Self {
        FlagField { shift, width }
    }

    const fn mask(self) -> u32 {
        (1u32 << self.width) - 1
    }

    pub const fn extract(self, word: u32) -> u32 {
        (word >> self.shift) & self.mask()
    }
}

/// One bit-test: `(flags >> shift) & mask == value`.
///
/// A single-bit flag is a one-wide field compared against 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagTest {
    pub field: FlagField,
    pub value: u32,
}

impl FlagTest {
    pub const fn bit(index: u8) -> Self {
        FlagTest {
            field: FlagField::new(index, 1),
            value: 1,
        }
    }

    pub const fn equals(field: FlagField, value: u32) -> Self {
        FlagTest { field, value }
    }

    pub fn matches(self, flags: MetadataFlags) -> bool {
        self.field.extract(flags.0) == self.value
    }

    /// The flag word in which exactly this test holds (used by tests and
    /// fixture builders).
    pub const fn to_flags(self) -> MetadataFlags {
        MetadataFlags(self.value << self.field.shift)
    }
}

// ============================================================================
// Common Fields
// ============================================================================

pub const HAS_ANNOTATIONS: FlagTest = FlagTest::bit(0);
pub const VISIBILITY: FlagField = FlagField::new(1, 3);
pub const MODALITY: FlagField = FlagField::new(4, 2);
pub const KIND: FlagField = FlagField::new(6, 3);

pub const VISIBILITY_INTERNAL: u32 = 0;
pub const VISIBILITY_PRIVATE: u32 = 1;
pub const VISIBILITY_PROTECTED: u32 = 2;
pub const VISIBILITY_PUBLIC: u32 = 3;
pub const VISIBILITY_PRIVATE_TO_THIS: u32 = 4;
pub const VISIBILITY_LOCAL: u32 = 5;

pub const MODALITY_FINAL: u32 = 0;
pub const MODALITY_OPEN: u32 = 1;
pub const MODALITY_ABSTRACT: u32 = 2;
pub const MODALITY_SEALED: u32 = 3;

/// Class-specific bits.
pub mod class {
    use super::FlagTest;

    pub const IS_INNER: FlagTest = FlagTest::bit(9);
    pub const IS_DATA: FlagTest = FlagTest::bit(10);
    pub const IS_EXTERNAL: FlagTest = FlagTest::bit(11);
    pub const IS_EXPECT: FlagTest = FlagTest::bit(12);
    pub const IS_INLINE: FlagTest = FlagTest::bit(13);
    pub const IS_FUN: FlagTest = FlagTest::bit(14);
}

/// Function-specific bits.
pub mod function {
    use super::FlagTest;

    pub const IS_OPERATOR: FlagTest = FlagTest::bit(9);
    pub const IS_INFIX: FlagTest = FlagTest::bit(10);
    pub const IS_INLINE: FlagTest = FlagTest::bit(11);
    pub const IS_TAILREC: FlagTest = FlagTest::bit(12);
    pub const IS_EXTERNAL: FlagTest = FlagTest::bit(13);
    pub const IS_SUSPEND: FlagTest = FlagTest::bit(14);
    pub const IS_EXPECT: FlagTest = FlagTest::bit(15);
}

/// Property-specific bits.
pub mod property {
    use super::FlagTest;

    pub const IS_VAR: FlagTest = FlagTest::bit(9);
    pub const HAS_GETTER: FlagTest = FlagTest::bit(10);
    pub const HAS_SETTER: FlagTest = FlagTest::bit(11);
    pub const IS_CONST: FlagTest = FlagTest::bit(12);
    pub const IS_LATEINIT: FlagTest = FlagTest::bit(13);
    pub const HAS_CONSTANT: FlagTest = FlagTest::bit(14);
    pub const IS_EXTERNAL: FlagTest = FlagTest::bit(15);
    pub const IS_DELEGATED: FlagTest = FlagTest::bit(16);
    pub const IS_EXPECT: FlagTest = FlagTest::bit(17);
}

/// Value-parameter bits.
pub mod parameter {
    use super::FlagTest;

    pub const DECLARES_DEFAULT_VALUE: FlagTest = FlagTest::bit(6);
    pub const IS_CROSSINLINE: FlagTest = FlagTest::bit(7);
    pub const IS_NOINLINE: FlagTest = FlagTest::bit(8);
}

/// Kotlin's notion of what a class is, from the kind field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmClassKind {
    Class,
    Interface,
    EnumClass,
    EnumEntry,
    AnnotationClass,
    Object,
    CompanionObject,
}

impl KmClassKind {
    pub fn from_flags(flags: MetadataFlags) -> Option<Self> {
        match flags.field(KIND) {
            0 => Some(KmClassKind::Class),
            1 => Some(KmClassKind::Interface),
            2 => Some(KmClassKind::EnumClass),
            3 => Some(KmClassKind::EnumEntry),
            4 => Some(KmClassKind::AnnotationClass),
            5 => Some(KmClassKind::Object),
            6 => Some(KmClassKind::CompanionObject),
            _ => None,
        }
    }
}

// ============================================================================
// Metadata Payload
// ============================================================================

/// The `k` field of the metadata annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    Class,
    FileFacade,
    SyntheticClass,
    MultiFileClassFacade,
    MultiFileClassPart,
}

/// A property declared in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmProperty {
    pub name: String,
    #[serde(default)]
    pub flags: MetadataFlags,
    /// Name of the backing field when it differs from the property name.
    #[serde(default)]
    pub field_name: Option<String>,
}

impl KmProperty {
    pub fn backing_field(&self) -> &str {
        self.field_name.as_deref().unwrap_or(&self.name)
    }
}

/// A function declared in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmFunction {
    pub name: String,
    #[serde(default)]
    pub flags: MetadataFlags,
    /// JVM descriptor of the compiled method, used to pair with a method record.
    #[serde(default)]
    pub jvm_descriptor: Option<String>,
    /// Internal name of the receiver type for extension functions.
    #[serde(default)]
    pub receiver: Option<String>,
}

/// Decoded Kotlin metadata attached to a class record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KotlinMetadata {
    pub kind: MetadataKind,
    #[serde(default)]
    pub flags: MetadataFlags,
    #[serde(default)]
    pub properties: Vec<KmProperty>,
    #[serde(default)]
    pub functions: Vec<KmFunction>,
}

impl KotlinMetadata {
    pub fn new(kind: MetadataKind) -> Self {
        KotlinMetadata {
            kind,
            flags: MetadataFlags::default(),
            properties: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// File facades hold top-level declarations and have no class syntax.
    pub fn is_file_facade(&self) -> bool {
        self.kind == MetadataKind::FileFacade
    }

    pub fn class_kind(&self) -> Option<KmClassKind> {
        match self.kind {
            MetadataKind::Class => KmClassKind::from_flags(self.flags),
            _ => None,
        }
    }

    /// The property backed by the given JVM field.
    pub fn property_for_field(&self, field_name: &str) -> Option<&KmProperty> {
        self.properties
            .iter()
            .find(|p| p.backing_field() == field_name)
    }

    /// The function compiled to the given JVM method.
    ///
    /// Matches on the descriptor when metadata recorded one, otherwise on name
    /// alone when it is unambiguous.
    pub fn function_for_method(&self, name: &str, descriptor: &str) -> Option<&KmFunction> {
        let exact = self
            .functions
            .iter()
            .find(|f| f.name == name && f.jvm_descriptor.as_deref() == Some(descriptor));
        if exact.is_some() {
            return exact;
        }
        let mut by_name = self
            .functions
            .iter()
            .filter(|f| f.name == name && f.jvm_descriptor.is_none());
        match (by_name.next(), by_name.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}
