//! Descriptor and generic signature parsing.
//!
//! Parses the JVM's type grammars into [`VarType`]s:
//!
//! - field descriptors and field signatures: `I`, `[Ljava/lang/String;`,
//!   `Ljava/util/List<TT;>;`
//! - method descriptors and signatures: `(ILjava/lang/String;)V`,
//!   `<T:Ljava/lang/Object;>(TT;)TT;^Ljava/io/IOException;`
//! - class signatures: `<T:Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;Ljava/util/List<TT;>;`
//!
//! Descriptors are a subset of the signature grammar, so one set of
//! parsers handles both. Inner class types written as `LOuter<TA;>.Inner<TB;>;`
//! flatten to `Outer$Inner` carrying the innermost arguments.

use thiserror::Error;
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{any, take_while};
use winnow::ModalResult;

use crate::types::{Primitive, TypeArg, TypeKind, VarType, OBJECT};

/// Error type for descriptor and signature parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("invalid {what} '{input}': {message}")]
    Invalid {
        what: &'static str,
        input: String,
        message: String,
    },
}

// ============================================================================
// Parsed Forms
// ============================================================================

/// A declared type parameter with its bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    /// Class bound first (if any), then interface bounds.
    pub bounds: Vec<VarType>,
}

impl TypeParameter {
    /// Bounds worth printing: a lone `Object` bound is implicit.
    pub fn visible_bounds(&self) -> &[VarType] {
        match self.bounds.as_slice() {
            [only] if only.is_object() => &[],
            all => all,
        }
    }
}

/// A parsed class signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_params: Vec<TypeParameter>,
    pub superclass: VarType,
    pub interfaces: Vec<VarType>,
}

impl ClassSignature {
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.type_params.iter().map(|p| p.name.as_str())
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<VarType>,
    pub ret: VarType,
}

impl MethodDescriptor {
    /// Local variable slots the parameters occupy (long and double take two).
    pub fn param_slots(&self) -> usize {
        self.params.iter().map(slot_width).sum()
    }
}

/// A parsed method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<VarType>,
    pub ret: VarType,
    pub throws: Vec<VarType>,
}

/// Local variable slots a value of this type occupies.
pub fn slot_width(t: &VarType) -> usize {
    match t.kind {
        TypeKind::Primitive(Primitive::Long | Primitive::Double) if t.array_dim == 0 => 2,
        _ => 1,
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Parse a field descriptor or field signature.
pub fn parse_field_type(input: &str) -> Result<VarType, SignatureError> {
    run("field type", input, parse_java_type)
}

/// Parse an erased method descriptor.
pub fn parse_method_descriptor(input: &str) -> Result<MethodDescriptor, SignatureError> {
    run("method descriptor", input, |i: &mut &str| {
        let (params, ret) = parse_method_body(i)?;
        Ok(MethodDescriptor { params, ret })
    })
}

/// Parse a generic method signature.
pub fn parse_method_signature(input: &str) -> Result<MethodSignature, SignatureError> {
    run("method signature", input, |i: &mut &str| {
        let type_params = opt(parse_type_params).parse_next(i)?.unwrap_or_default();
        let (params, ret) = parse_method_body(i)?;
        let throws: Vec<VarType> = repeat(0.., preceded('^', parse_reference_type)).parse_next(i)?;
        Ok(MethodSignature {
            type_params,
            params,
            ret,
            throws,
        })
    })
}

/// Parse a generic class signature.
pub fn parse_class_signature(input: &str) -> Result<ClassSignature, SignatureError> {
    run("class signature", input, |i: &mut &str| {
        let type_params = opt(parse_type_params).parse_next(i)?.unwrap_or_default();
        let superclass = parse_class_type(i)?;
        let interfaces: Vec<VarType> = repeat(0.., parse_class_type).parse_next(i)?;
        Ok(ClassSignature {
            type_params,
            superclass,
            interfaces,
        })
    })
}

fn run<T>(
    what: &'static str,
    input: &str,
    mut parser: impl FnMut(&mut &str) -> ModalResult<T>,
) -> Result<T, SignatureError> {
    let mut rest = input;
    let value = parser(&mut rest).map_err(|e| SignatureError::Invalid {
        what,
        input: input.to_string(),
        message: format!("{:?}", e),
    })?;
    if !rest.is_empty() {
        return Err(SignatureError::Invalid {
            what,
            input: input.to_string(),
            message: format!("trailing input '{}'", rest),
        });
    }
    Ok(value)
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

/// `(` params `)` return
fn parse_method_body(input: &mut &str) -> ModalResult<(Vec<VarType>, VarType)> {
    let params: Vec<VarType> =
        delimited('(', repeat(0.., parse_java_type), ')').parse_next(input)?;
    let ret = alt((parse_void, parse_java_type)).parse_next(input)?;
    Ok((params, ret))
}

fn parse_void(input: &mut &str) -> ModalResult<VarType> {
    'V'.map(|_| VarType::primitive(Primitive::Void))
        .parse_next(input)
}

/// Any non-void type.
fn parse_java_type(input: &mut &str) -> ModalResult<VarType> {
    alt((parse_primitive, parse_reference_type)).parse_next(input)
}

fn parse_primitive(input: &mut &str) -> ModalResult<VarType> {
    any.verify_map(|c: char| {
        Primitive::from_descriptor(c)
            .filter(|p| *p != Primitive::Void)
            .map(VarType::primitive)
    })
    .parse_next(input)
}

fn parse_reference_type(input: &mut &str) -> ModalResult<VarType> {
    alt((parse_class_type, parse_type_variable, parse_array_type)).parse_next(input)
}

fn parse_array_type(input: &mut &str) -> ModalResult<VarType> {
    preceded('[', parse_java_type)
        .map(|t| t.array_of(1))
        .parse_next(input)
}

fn parse_type_variable(input: &mut &str) -> ModalResult<VarType> {
    delimited('T', parse_identifier, ';')
        .map(VarType::variable)
        .parse_next(input)
}

/// `L` pkg/Name [args] { `.` Inner [args] } `;`
fn parse_class_type(input: &mut &str) -> ModalResult<VarType> {
    let _ = 'L'.parse_next(input)?;
    let head: &str =
        take_while(1.., |c: char| !matches!(c, '<' | '.' | ';')).parse_next(input)?;
    let mut name = head.to_string();
    let mut args = opt(parse_type_args).parse_next(input)?.unwrap_or_default();

    let inners: Vec<(String, Option<Vec<TypeArg>>)> =
        repeat(0.., preceded('.', (parse_identifier, opt(parse_type_args)))).parse_next(input)?;
    for (inner, inner_args) in inners {
        name.push('$');
        name.push_str(&inner);
        args = inner_args.unwrap_or_default();
    }

    let _ = ';'.parse_next(input)?;
    Ok(VarType::generic(name, args))
}

fn parse_type_args(input: &mut &str) -> ModalResult<Vec<TypeArg>> {
    delimited('<', repeat(1.., parse_type_arg), '>').parse_next(input)
}

fn parse_type_arg(input: &mut &str) -> ModalResult<TypeArg> {
    alt((
        '*'.map(|_| TypeArg::Wildcard),
        preceded('+', parse_reference_type).map(TypeArg::Extends),
        preceded('-', parse_reference_type).map(TypeArg::Super),
        parse_reference_type.map(TypeArg::Exact),
    ))
    .parse_next(input)
}

/// `<` T `:` [classBound] { `:` ifaceBound } ... `>`
fn parse_type_params(input: &mut &str) -> ModalResult<Vec<TypeParameter>> {
    delimited('<', repeat(1.., parse_type_param), '>').parse_next(input)
}

fn parse_type_param(input: &mut &str) -> ModalResult<TypeParameter> {
    let name = parse_identifier(input)?;
    let _ = ':'.parse_next(input)?;
    let class_bound = opt(parse_reference_type).parse_next(input)?;
    let iface_bounds: Vec<VarType> =
        repeat(0.., preceded(':', parse_reference_type)).parse_next(input)?;

    let mut bounds: Vec<VarType> = class_bound.into_iter().collect();
    bounds.extend(iface_bounds);
    if bounds.is_empty() {
        bounds.push(VarType::class(OBJECT));
    }
    Ok(TypeParameter { name, bounds })
}

fn parse_identifier(input: &mut &str) -> ModalResult<String> {
    let ident: &str = take_while(0.., |c: char| {
        !matches!(c, '.' | ';' | '[' | '/' | '<' | '>' | ':')
    })
    .parse_next(input)?;
    if ident.is_empty() {
        return Err(ErrMode::from_input(input));
    }
    Ok(ident.to_string())
}
