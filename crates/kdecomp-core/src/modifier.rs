//! The unified modifier model.
//!
//! Two flag universes feed one vocabulary: raw JVM access flags and, for
//! Kotlin classes, the flag words carried in compiler metadata. Every
//! [`Modifier`] is described by one row of [`MODIFIERS`], which names the
//! single bit-test that detects it (a [`FlagSource`]), the keyword it renders
//! as (if any), and the [`OwnerType`] that may display it.
//!
//! Detection and rendering are both filtered by ownership. The JVM reuses
//! bits for unrelated meanings (`0x0040` is `volatile` on fields and `bridge`
//! on methods), and metadata bit 9 means `inner` on a class, `operator` on a
//! function and `var` on a property. Reading flags through an owner type
//! keeps those meanings from leaking into the wrong declaration.
//!
//! [`ModifierSet`] is an immutable bit-set value. Callers adjust it with
//! [`ModifierSet::with`] and [`ModifierSet::without`] before rendering; the
//! underlying record is never touched.

use std::fmt;

use crate::access::AccessFlags;
use crate::metadata::{
    self, class, function, parameter, property, FlagTest, MetadataFlags, MODALITY, VISIBILITY,
};

// ============================================================================
// Ownership Lattice
// ============================================================================

/// Which kinds of declaration a modifier belongs to.
///
/// The first four variants are bit-groups rather than declarations. A
/// declaration type owns a group when the group is reachable through
/// [`OwnerType::supertypes`]; ownership is the reflexive transitive closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerType {
    HasAnnotations,
    Visibility,
    Modality,
    /// Anything declared inside a class body or at top level.
    Member,
    Class,
    Constructor,
    Function,
    Property,
    PropertyAccessor,
    ValueParameter,
    TypeParameter,
    TypeAlias,
    Type,
}

impl OwnerType {
    /// Direct supertypes in the lattice.
    pub fn supertypes(self) -> &'static [OwnerType] {
        use OwnerType::*;
        match self {
            HasAnnotations | Visibility | Modality | TypeParameter | Type => &[],
            Member => &[HasAnnotations, Visibility],
            Class | Function | Property | PropertyAccessor => &[Member, Modality],
            Constructor => &[Member],
            ValueParameter => &[HasAnnotations],
            TypeAlias => &[HasAnnotations, Visibility],
        }
    }

    /// True if `other` is in the transitive closure of `self`.
    pub fn owns(self, other: OwnerType) -> bool {
        self == other || self.supertypes().iter().any(|s| s.owns(other))
    }
}

// ============================================================================
// Modifier Vocabulary
// ============================================================================

/// Every modifier the emitter knows about, in render order.
///
/// The declaration order of the variants is the order keywords appear in
/// output. Variants after [`Modifier::Noinline`] are structural: they carry
/// information but have no keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Internal,
    Expect,
    Final,
    Open,
    Abstract,
    Sealed,
    Const,
    External,
    Lateinit,
    Tailrec,
    Suspend,
    Inner,
    Data,
    Inline,
    Infix,
    Operator,
    Crossinline,
    Noinline,
    Static,
    Synthetic,
    Bridge,
    Varargs,
    Var,
    HasAnnotations,
}

impl Modifier {
    pub const COUNT: usize = 27;

    /// All modifiers in declaration order.
    pub fn all() -> impl Iterator<Item = Modifier> {
        MODIFIERS.iter().map(|d| d.modifier)
    }

    pub fn descriptor(self) -> &'static ModifierDescriptor {
        &MODIFIERS[self as usize]
    }

    pub fn keyword(self) -> Option<&'static str> {
        self.descriptor().keyword
    }

    pub fn owner(self) -> OwnerType {
        self.descriptor().owner
    }

    fn bit(self) -> u32 {
        1u32 << (self as u32)
    }
}

/// Where a modifier's bit lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSource {
    /// A JVM access-flag bit.
    Access(AccessFlags),
    /// A Kotlin metadata bit-test.
    Metadata(FlagTest),
}

/// One row of the modifier table.
#[derive(Debug, Clone, Copy)]
pub struct ModifierDescriptor {
    pub modifier: Modifier,
    pub keyword: Option<&'static str>,
    pub source: FlagSource,
    pub owner: OwnerType,
}

const fn row(
    modifier: Modifier,
    keyword: Option<&'static str>,
    source: FlagSource,
    owner: OwnerType,
) -> ModifierDescriptor {
    ModifierDescriptor {
        modifier,
        keyword,
        source,
        owner,
    }
}

const fn jvm(flags: AccessFlags) -> FlagSource {
    FlagSource::Access(flags)
}

const fn meta(test: FlagTest) -> FlagSource {
    FlagSource::Metadata(test)
}

/// The modifier table, indexed by `Modifier as usize`.
///
/// `public` is structural: it is the default visibility and never printed,
/// but accessibility comparisons still read it.
pub static MODIFIERS: [ModifierDescriptor; Modifier::COUNT] = {
    use Modifier as M;
    use OwnerType as O;
    [
        row(M::Public, None, jvm(AccessFlags::PUBLIC), O::Visibility),
        row(M::Protected, Some("protected"), jvm(AccessFlags::PROTECTED), O::Visibility),
        row(M::Private, Some("private"), jvm(AccessFlags::PRIVATE), O::Visibility),
        row(
            M::Internal,
            Some("internal"),
            meta(FlagTest::equals(VISIBILITY, metadata::VISIBILITY_INTERNAL)),
            O::Visibility,
        ),
        row(M::Expect, Some("expect"), meta(class::IS_EXPECT), O::Class),
        row(M::Final, Some("final"), jvm(AccessFlags::FINAL), O::Modality),
        row(
            M::Open,
            Some("open"),
            meta(FlagTest::equals(MODALITY, metadata::MODALITY_OPEN)),
            O::Modality,
        ),
        row(M::Abstract, Some("abstract"), jvm(AccessFlags::ABSTRACT), O::Modality),
        row(
            M::Sealed,
            Some("sealed"),
            meta(FlagTest::equals(MODALITY, metadata::MODALITY_SEALED)),
            O::Modality,
        ),
        row(M::Const, Some("const"), meta(property::IS_CONST), O::Property),
        row(M::External, Some("external"), jvm(AccessFlags::NATIVE), O::Member),
        row(M::Lateinit, Some("lateinit"), meta(property::IS_LATEINIT), O::Property),
        row(M::Tailrec, Some("tailrec"), meta(function::IS_TAILREC), O::Function),
        row(M::Suspend, Some("suspend"), meta(function::IS_SUSPEND), O::Function),
        row(M::Inner, Some("inner"), meta(class::IS_INNER), O::Class),
        row(M::Data, Some("data"), meta(class::IS_DATA), O::Class),
        row(M::Inline, Some("inline"), meta(function::IS_INLINE), O::Function),
        row(M::Infix, Some("infix"), meta(function::IS_INFIX), O::Function),
        row(M::Operator, Some("operator"), meta(function::IS_OPERATOR), O::Function),
        row(
            M::Crossinline,
            Some("crossinline"),
            meta(parameter::IS_CROSSINLINE),
            O::ValueParameter,
        ),
        row(M::Noinline, Some("noinline"), meta(parameter::IS_NOINLINE), O::ValueParameter),
        row(M::Static, None, jvm(AccessFlags::STATIC), O::Member),
        row(M::Synthetic, None, jvm(AccessFlags::SYNTHETIC), O::Member),
        row(M::Bridge, None, jvm(AccessFlags::BRIDGE), O::Function),
        row(M::Varargs, None, jvm(AccessFlags::VARARGS), O::Function),
        row(M::Var, None, meta(property::IS_VAR), O::Property),
        row(M::HasAnnotations, None, meta(metadata::HAS_ANNOTATIONS), O::HasAnnotations),
    ]
};

// ============================================================================
// Modifier Set
// ============================================================================

/// An immutable set of modifiers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierSet(u32);

impl ModifierSet {
    pub const EMPTY: ModifierSet = ModifierSet(0);

    /// Detect modifiers from JVM access flags for a declaration of type `owner`.
    pub fn from_access(flags: AccessFlags, owner: OwnerType) -> Self {
        Self::detect(owner, |source| match source {
            FlagSource::Access(bit) => flags.contains(bit),
            FlagSource::Metadata(_) => false,
        })
    }

    /// Detect modifiers from a metadata flag word for a declaration of type `owner`.
    pub fn from_metadata(flags: MetadataFlags, owner: OwnerType) -> Self {
        Self::detect(owner, |source| match source {
            FlagSource::Access(_) => false,
            FlagSource::Metadata(test) => flags.test(test),
        })
    }

    fn detect(owner: OwnerType, is_set: impl Fn(FlagSource) -> bool) -> Self {
        MODIFIERS
            .iter()
            .filter(|d| owner.owns(d.owner) && is_set(d.source))
            .map(|d| d.modifier)
            .collect()
    }

    #[must_use]
    pub fn with(self, modifier: Modifier) -> Self {
        ModifierSet(self.0 | modifier.bit())
    }

    #[must_use]
    pub fn without(self, modifier: Modifier) -> Self {
        ModifierSet(self.0 & !modifier.bit())
    }

    /// Add or remove `modifier` depending on `present`.
    #[must_use]
    pub fn with_if(self, modifier: Modifier, present: bool) -> Self {
        if present {
            self.with(modifier)
        } else {
            self.without(modifier)
        }
    }

    #[must_use]
    pub fn union(self, other: ModifierSet) -> Self {
        ModifierSet(self.0 | other.0)
    }

    pub fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Modifiers in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::all().filter(move |m| self.contains(*m))
    }

    /// Keywords a declaration of type `owner` displays, in declaration order.
    pub fn keywords(self, owner: OwnerType) -> impl Iterator<Item = &'static str> {
        self.iter()
            .filter(move |m| owner.owns(m.owner()))
            .filter_map(Modifier::keyword)
    }

    /// Render as space-separated keywords with no trailing space.
    pub fn render(self, owner: OwnerType) -> String {
        self.keywords(owner).collect::<Vec<_>>().join(" ")
    }

    /// Render with a trailing space when non-empty, ready to prefix a declaration.
    pub fn render_prefix(self, owner: OwnerType) -> String {
        let mut out = String::new();
        for keyword in self.keywords(owner) {
            out.push_str(keyword);
            out.push(' ');
        }
        out
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        iter.into_iter().fold(ModifierSet::EMPTY, ModifierSet::with)
    }
}

impl fmt::Debug for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
