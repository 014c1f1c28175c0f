//! The standard-library model.
//!
//! `Base` indexes the classes of `pkl:base` that the algebra treats
//! specially (`Any`, `Null`, `String`, the `FunctionN` family, ...) and
//! builds the corresponding types. It is constructed once per workspace and
//! shared through `TypeContext::base`.

use std::fmt;
use std::sync::Arc;

use pkl_syntax::{NodeRef, SyntaxTree};

use crate::types::{ClassType, Constraints, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseError {
    /// A class the analyzers rely on is not declared in the base module.
    MissingClass(&'static str),
    /// The tree handed in is not the base module.
    NotBaseModule(String),
}

impl fmt::Display for BaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseError::MissingClass(name) => {
                write!(f, "base module does not declare class `{name}`")
            }
            BaseError::NotBaseModule(uri) => write!(f, "`{uri}` is not the base module"),
        }
    }
}

impl std::error::Error for BaseError {}

#[derive(Debug)]
pub struct Base {
    tree: Arc<SyntaxTree>,
    pub any: NodeRef,
    pub null: NodeRef,
    pub boolean: NodeRef,
    pub number: NodeRef,
    pub int: NodeRef,
    pub float: NodeRef,
    pub string: NodeRef,
    pub duration: NodeRef,
    pub data_size: NodeRef,
    pub object: NodeRef,
    pub dynamic: NodeRef,
    pub typed: NodeRef,
    pub module: NodeRef,
    pub listing: NodeRef,
    pub mapping: NodeRef,
    pub collection: NodeRef,
    pub list: NodeRef,
    pub set: NodeRef,
    pub map: NodeRef,
    pub function: NodeRef,
    /// `Function0` through `Function5`, indexed by arity.
    pub functions: [NodeRef; 6],
    pub pair: NodeRef,
    pub regex: NodeRef,
    pub int_seq: NodeRef,
    pub class: NodeRef,
    pub type_alias: NodeRef,
}

impl Base {
    pub fn new(tree: Arc<SyntaxTree>) -> Result<Self, BaseError> {
        if tree.uri() != pkl_syntax::stdlib::BASE_MODULE_URI {
            return Err(BaseError::NotBaseModule(tree.uri().to_string()));
        }
        let class = |name: &'static str| -> Result<NodeRef, BaseError> {
            tree.find_type_decl(name)
                .filter(|&idx| {
                    matches!(tree.data(idx), Some(pkl_syntax::NodeData::Class { .. }))
                })
                .map(|idx| tree.node_ref(idx))
                .ok_or(BaseError::MissingClass(name))
        };
        let base = Base {
            any: class("Any")?,
            null: class("Null")?,
            boolean: class("Boolean")?,
            number: class("Number")?,
            int: class("Int")?,
            float: class("Float")?,
            string: class("String")?,
            duration: class("Duration")?,
            data_size: class("DataSize")?,
            object: class("Object")?,
            dynamic: class("Dynamic")?,
            typed: class("Typed")?,
            module: class("Module")?,
            listing: class("Listing")?,
            mapping: class("Mapping")?,
            collection: class("Collection")?,
            list: class("List")?,
            set: class("Set")?,
            map: class("Map")?,
            function: class("Function")?,
            functions: [
                class("Function0")?,
                class("Function1")?,
                class("Function2")?,
                class("Function3")?,
                class("Function4")?,
                class("Function5")?,
            ],
            pair: class("Pair")?,
            regex: class("Regex")?,
            int_seq: class("IntSeq")?,
            class: class("Class")?,
            type_alias: class("TypeAlias")?,
            tree: tree.clone(),
        };
        Ok(base)
    }

    pub fn tree(&self) -> &Arc<SyntaxTree> {
        &self.tree
    }

    fn simple(decl: NodeRef) -> Type {
        Type::Class(ClassType {
            decl,
            type_args: Arc::from(Vec::new()),
            constraints: Constraints::NONE,
        })
    }

    fn generic(decl: NodeRef, args: Vec<Type>) -> Type {
        Type::Class(ClassType {
            decl,
            type_args: args.into(),
            constraints: Constraints::NONE,
        })
    }

    pub fn any_type(&self) -> Type {
        Self::simple(self.any)
    }

    pub fn null_type(&self) -> Type {
        Self::simple(self.null)
    }

    pub fn boolean_type(&self) -> Type {
        Self::simple(self.boolean)
    }

    pub fn number_type(&self) -> Type {
        Self::simple(self.number)
    }

    pub fn int_type(&self) -> Type {
        Self::simple(self.int)
    }

    pub fn float_type(&self) -> Type {
        Self::simple(self.float)
    }

    pub fn string_type(&self) -> Type {
        Self::simple(self.string)
    }

    pub fn duration_type(&self) -> Type {
        Self::simple(self.duration)
    }

    pub fn data_size_type(&self) -> Type {
        Self::simple(self.data_size)
    }

    pub fn dynamic_type(&self) -> Type {
        Self::simple(self.dynamic)
    }

    pub fn typed_type(&self) -> Type {
        Self::simple(self.typed)
    }

    pub fn module_class_type(&self) -> Type {
        Self::simple(self.module)
    }

    pub fn regex_type(&self) -> Type {
        Self::simple(self.regex)
    }

    pub fn int_seq_type(&self) -> Type {
        Self::simple(self.int_seq)
    }

    pub fn listing_type(&self, element: Type) -> Type {
        Self::generic(self.listing, vec![element])
    }

    pub fn mapping_type(&self, key: Type, value: Type) -> Type {
        Self::generic(self.mapping, vec![key, value])
    }

    pub fn list_type(&self, element: Type) -> Type {
        Self::generic(self.list, vec![element])
    }

    pub fn set_type(&self, element: Type) -> Type {
        Self::generic(self.set, vec![element])
    }

    pub fn map_type(&self, key: Type, value: Type) -> Type {
        Self::generic(self.map, vec![key, value])
    }

    pub fn pair_type(&self, first: Type, second: Type) -> Type {
        Self::generic(self.pair, vec![first, second])
    }

    pub fn class_type(&self, of: Type) -> Type {
        Self::generic(self.class, vec![of])
    }

    /// `(params) -> result` as `FunctionN<params..., result>`. Arity above
    /// five falls back to the untyped `Function<result>`.
    pub fn function_type(&self, params: Vec<Type>, result: Type) -> Type {
        match self.functions.get(params.len()) {
            Some(&decl) => {
                let mut args = params;
                args.push(result);
                Self::generic(decl, args)
            }
            None => Self::generic(self.function, vec![result]),
        }
    }

    /// Arity of a `FunctionN` class.
    pub fn function_arity(&self, decl: NodeRef) -> Option<usize> {
        self.functions.iter().position(|&f| f == decl)
    }

    pub fn is_function_class(&self, decl: NodeRef) -> bool {
        decl == self.function || self.function_arity(decl).is_some()
    }

    pub fn is_string_class(&self, ty: &Type) -> bool {
        matches!(ty, Type::Class(c) if c.decl == self.string)
    }

    pub fn is_null_class(&self, ty: &Type) -> bool {
        matches!(ty, Type::Class(c) if c.decl == self.null)
    }
}
