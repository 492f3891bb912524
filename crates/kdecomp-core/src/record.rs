//! Parsed class-file records.
//!
//! These are the immutable inputs of the reconstruction layer: one
//! [`ClassRecord`] per class file, already decoded from the constant pool and
//! attribute tables. Records are shared process-wide behind `Arc` and are
//! never mutated once loaded.
//!
//! All record types derive serde traits so a class set can be loaded from a
//! JSON dump produced by an external class-file parser.

use serde::{Deserialize, Serialize};

use crate::access::{serde_bits, AccessFlags};
use crate::metadata::KotlinMetadata;
use crate::signature::{self, ClassSignature, MethodDescriptor, SignatureError};
use crate::types::{self, VarType};

/// Name of instance constructors.
pub const INIT: &str = "<init>";
/// Name of static initializers.
pub const CLINIT: &str = "<clinit>";

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Attributes
// ============================================================================

/// One entry of an `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerClassEntry {
    /// Qualified name of the nested class.
    pub inner_name: String,
    /// Qualified name of the enclosing class, absent for local and anonymous classes.
    #[serde(default)]
    pub outer_name: Option<String>,
    /// Simple source name, absent for anonymous classes.
    #[serde(default)]
    pub simple_name: Option<String>,
    #[serde(with = "serde_bits", default)]
    pub access: AccessFlags,
}

/// The `EnclosingMethod` attribute of a local or anonymous class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosingMethod {
    pub class: String,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub descriptor: Option<String>,
}

/// One component of a `Record` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordComponent {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub signature: Option<String>,
}

/// A `ConstantValue` attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl ConstantValue {
    /// Source literal for this constant. `char` and `boolean` fields store
    /// their value as an int, so the field type picks the spelling.
    pub fn literal(&self, field_type: Option<&VarType>) -> String {
        use crate::types::{Primitive, TypeKind};
        match self {
            ConstantValue::Int(v) => match field_type.map(|t| &t.kind) {
                Some(TypeKind::Primitive(Primitive::Boolean)) => (*v != 0).to_string(),
                Some(TypeKind::Primitive(Primitive::Char)) => char::from_u32(*v as u32)
                    .filter(|c| !c.is_control())
                    .map_or_else(|| format!("'\\u{:04x}'", v), |c| format!("'{}'", c)),
                _ => v.to_string(),
            },
            ConstantValue::Long(v) => format!("{}L", v),
            ConstantValue::Float(v) => format!("{:?}f", v),
            ConstantValue::Double(v) => format!("{:?}", v),
            ConstantValue::String(s) => format!("{:?}", s),
        }
    }
}

/// `LineNumberTable` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineNumber {
    pub start_pc: u32,
    pub line: u32,
}

// ============================================================================
// Instructions
// ============================================================================

/// Opcodes the structural layer inspects. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    CheckCast,
    InstanceOf,
    New,
    ANewArray,
    MultiANewArray,
    GetStatic,
    PutStatic,
    GetField,
    PutField,
    InvokeVirtual,
    InvokeSpecial,
    InvokeStatic,
    InvokeInterface,
    InvokeDynamic,
    Return,
    #[serde(other)]
    Other,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    #[serde(default)]
    pub offset: u32,
    /// Class operand: the type for `new`/`checkcast`/`instanceof`/array
    /// allocation, or the owning class for field and method instructions.
    #[serde(default)]
    pub class: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode, class: impl Into<String>) -> Self {
        Instruction {
            opcode,
            offset: 0,
            class: Some(class.into()),
        }
    }
}

// ============================================================================
// Members
// ============================================================================

/// A parsed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub descriptor: String,
    #[serde(with = "serde_bits", default)]
    pub access: AccessFlags,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub constant_value: Option<ConstantValue>,
    /// `Synthetic` attribute present.
    #[serde(default, skip_serializing_if = "is_false")]
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    /// Annotations already rendered to source text.
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl FieldRecord {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, access: AccessFlags) -> Self {
        FieldRecord {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            signature: None,
            constant_value: None,
            synthetic: false,
            deprecated: false,
            annotations: Vec::new(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic || self.access.is_synthetic()
    }

    pub fn field_type(&self) -> Result<VarType, SignatureError> {
        signature::parse_field_type(&self.descriptor)
    }

    /// Generic type when a signature is present and parses, else the erased type.
    pub fn generic_type(&self) -> Result<VarType, SignatureError> {
        match self.signature.as_deref().map(signature::parse_field_type) {
            Some(Ok(t)) => Ok(t),
            _ => self.field_type(),
        }
    }
}

/// A parsed method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    pub descriptor: String,
    #[serde(with = "serde_bits", default)]
    pub access: AccessFlags,
    #[serde(default)]
    pub signature: Option<String>,
    /// Internal names from the `Exceptions` attribute.
    #[serde(default)]
    pub exceptions: Vec<String>,
    /// Decoded bytecode, absent for abstract and native methods.
    #[serde(default)]
    pub code: Option<Vec<Instruction>>,
    #[serde(default)]
    pub line_numbers: Vec<LineNumber>,
    /// Names from the `MethodParameters` attribute.
    #[serde(default)]
    pub parameter_names: Option<Vec<String>>,
    /// `AnnotationDefault` rendered to source text.
    #[serde(default)]
    pub annotation_default: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl MethodRecord {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, access: AccessFlags) -> Self {
        MethodRecord {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            signature: None,
            exceptions: Vec::new(),
            code: None,
            line_numbers: Vec::new(),
            parameter_names: None,
            annotation_default: None,
            synthetic: false,
            deprecated: false,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: Vec<Instruction>) -> Self {
        self.code = Some(code);
        self
    }

    /// `name descriptor`, the key used for mappings and hidden-member sets.
    pub fn key(&self) -> String {
        method_key(&self.name, &self.descriptor)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == INIT
    }

    pub fn is_static_init(&self) -> bool {
        self.name == CLINIT
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic || self.access.is_synthetic()
    }

    pub fn parsed_descriptor(&self) -> Result<MethodDescriptor, SignatureError> {
        signature::parse_method_descriptor(&self.descriptor)
    }
}

/// Join a method name and descriptor into a lookup key.
pub fn method_key(name: &str, descriptor: &str) -> String {
    format!("{} {}", name, descriptor)
}

// ============================================================================
// Module Descriptor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRequire {
    pub module: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub transitive: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub static_phase: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePackages {
    pub package: String,
    #[serde(default)]
    pub to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProvide {
    pub service: String,
    pub with: Vec<String>,
}

/// The `Module` attribute of a `module-info` class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub open: bool,
    #[serde(default)]
    pub requires: Vec<ModuleRequire>,
    #[serde(default)]
    pub exports: Vec<ModulePackages>,
    #[serde(default)]
    pub opens: Vec<ModulePackages>,
    #[serde(default)]
    pub uses: Vec<String>,
    #[serde(default)]
    pub provides: Vec<ModuleProvide>,
}

// ============================================================================
// Class Record
// ============================================================================

/// One parsed class file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Qualified internal name, e.g. `a/b/Outer$Inner`.
    pub name: String,
    #[serde(with = "serde_bits", default)]
    pub access: AccessFlags,
    #[serde(default)]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
    #[serde(default)]
    pub methods: Vec<MethodRecord>,
    /// The `InnerClasses` attribute, if the class has one.
    #[serde(default)]
    pub inner_classes: Option<Vec<InnerClassEntry>>,
    #[serde(default)]
    pub enclosing_method: Option<EnclosingMethod>,
    #[serde(default)]
    pub signature: Option<String>,
    /// Components when this class is a record.
    #[serde(default)]
    pub record_components: Option<Vec<RecordComponent>>,
    #[serde(default)]
    pub module: Option<ModuleDescriptor>,
    #[serde(default)]
    pub kotlin: Option<KotlinMetadata>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default)]
    pub annotations: Vec<String>,
    /// False for library classes loaded only for hierarchy lookups.
    #[serde(default = "default_true")]
    pub own: bool,
}

impl ClassRecord {
    pub fn new(name: impl Into<String>, access: AccessFlags) -> Self {
        ClassRecord {
            name: name.into(),
            access,
            super_class: Some(types::OBJECT.to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: None,
            enclosing_method: None,
            signature: None,
            record_components: None,
            module: None,
            kotlin: None,
            synthetic: false,
            deprecated: false,
            annotations: Vec::new(),
            own: true,
        }
    }

    pub fn simple_name(&self) -> &str {
        types::simple_name(&self.name)
    }

    pub fn package(&self) -> &str {
        types::package_name(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE)
    }

    pub fn is_annotation(&self) -> bool {
        self.access.contains(AccessFlags::ANNOTATION)
    }

    pub fn is_enum(&self) -> bool {
        self.access.contains(AccessFlags::ENUM)
    }

    pub fn is_module(&self) -> bool {
        self.access.contains(AccessFlags::MODULE)
    }

    pub fn is_record(&self) -> bool {
        self.record_components.is_some()
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic || self.access.is_synthetic()
    }

    pub fn is_package_info(&self) -> bool {
        self.simple_name() == "package-info"
    }

    /// Superclass unless it is `java/lang/Object`.
    pub fn nontrivial_super(&self) -> Option<&str> {
        self.super_class
            .as_deref()
            .filter(|s| *s != types::OBJECT)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodRecord> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn field(&self, name: &str, descriptor: &str) -> Option<&FieldRecord> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.descriptor == descriptor)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodRecord> {
        self.methods.iter().filter(|m| m.is_constructor())
    }

    pub fn record_component(&self, name: &str) -> Option<&RecordComponent> {
        self.record_components
            .as_ref()?
            .iter()
            .find(|c| c.name == name)
    }

    /// Parsed generic class signature. `None` when the class has none.
    pub fn class_signature(&self) -> Option<Result<ClassSignature, SignatureError>> {
        self.signature
            .as_deref()
            .map(signature::parse_class_signature)
    }
}
