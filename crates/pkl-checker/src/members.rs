//! Declaration types, `this` types and expected types.

use pkl_solver::{ClassType, InFlightKey, Type, TypeContext, TypeParameterBindings, project_to};
use pkl_syntax::{Modifiers, NodeData, NodeRef};
use rustc_hash::FxHashMap;

use crate::context::CheckerContext;
use crate::resolve::{ResolveMode, resolve_qualified_access, resolve_unqualified_access};
use crate::visitors::{CallSite, FirstMatch, Resolved};

impl<'a> CheckerContext<'a> {
    // =========================================================================
    // Declarations
    // =========================================================================

    /// Type of a declaration when referenced by name, with `bindings`
    /// applied. For a method this is its return type.
    pub fn type_of_declaration(&self, decl: NodeRef, bindings: &TypeParameterBindings) -> Type {
        let member_types = &self.member_types;
        let declared = self.memoized(member_types, decl, || {
            self.in_flight()
                .scope(InFlightKey::MemberType(decl), Type::Unknown, || {
                    self.compute_declaration_type(decl)
                })
        });
        declared.bind(bindings)
    }

    fn compute_declaration_type(&self, decl: NodeRef) -> Type {
        let Some(tree) = self.tree(decl.module) else {
            return Type::Unknown;
        };
        let Some(data) = tree.data(decl.node) else {
            return Type::Unknown;
        };
        let empty = TypeParameterBindings::new();
        let base = self.base();
        match data {
            NodeData::Property { value, bodies, .. } => {
                let declared = self.property_type(decl);
                if !declared.is_unknown() {
                    return declared;
                }
                match value {
                    Some(value) => self.type_of_expr(decl.with_node(*value), &empty),
                    None if !bodies.is_empty() => base.dynamic_type(),
                    None => Type::Unknown,
                }
            }
            NodeData::Method { .. } => self.method_return_type(decl, &empty),
            NodeData::Parameter { .. } => self.parameter_type(decl),
            NodeData::Class { .. } => base.class_type(Type::class(decl, Vec::new(), self)),
            NodeData::TypeAlias { .. } => Type::class(base.type_alias, Vec::new(), self),
            NodeData::TypeParameter { .. } => Type::variable(decl),
            NodeData::Import { .. } => match self.imported_module(decl) {
                Some(module) => Type::module(module, data.name(), self),
                None => Type::Unknown,
            },
            NodeData::Module { name, .. } => Type::module(decl.module, name.as_deref(), self),
            _ => Type::Unknown,
        }
    }

    /// Declared return type of a method, or the type of its body.
    pub fn method_return_type(&self, method: NodeRef, bindings: &TypeParameterBindings) -> Type {
        let Some(tree) = self.tree(method.module) else {
            return Type::Unknown;
        };
        match tree.data(method.node) {
            Some(NodeData::Method {
                return_type: Some(ret),
                ..
            }) => self.type_of_type_node(method.with_node(*ret), bindings),
            Some(NodeData::Method {
                body: Some(body), ..
            }) => self.type_of_expr(method.with_node(*body), bindings),
            _ => Type::Unknown,
        }
    }

    /// `outer` extended with the method's own type parameters, inferred
    /// from the call's arguments.
    pub fn call_bindings(
        &self,
        method: NodeRef,
        outer: &TypeParameterBindings,
        call: CallSite<'_>,
    ) -> TypeParameterBindings {
        let Some(tree) = self.tree(method.module) else {
            return outer.clone();
        };
        let Some(NodeData::Method {
            type_params,
            params,
            ..
        }) = tree.data(method.node)
        else {
            return outer.clone();
        };
        if type_params.is_empty() {
            return outer.clone();
        }
        let type_params: Vec<NodeRef> = type_params.iter().map(|&p| method.with_node(p)).collect();
        let mut inferred = FxHashMap::default();
        let empty = TypeParameterBindings::new();
        for (&param, &arg) in params.iter().zip(call.args) {
            let Some(NodeData::Parameter {
                type_annotation: Some(annotation),
                ..
            }) = tree.data(param)
            else {
                continue;
            };
            let expected = self.type_of_type_node(method.with_node(*annotation), outer);
            let actual = self.type_of_expr(NodeRef::new(call.module, arg), &empty);
            self.unify(&expected, &actual, &type_params, &mut inferred);
        }
        outer.extended(type_params.iter().map(|&param| {
            let ty = inferred.remove(&param).unwrap_or(Type::Unknown);
            (param, ty)
        }))
    }

    /// Match `actual` against `expected`, recording what each of `params`
    /// must be for the two to line up.
    fn unify(
        &self,
        expected: &Type,
        actual: &Type,
        params: &[NodeRef],
        out: &mut FxHashMap<NodeRef, Type>,
    ) {
        if actual.is_unknown() {
            return;
        }
        match expected {
            Type::Variable(var) if params.contains(&var.param) => {
                let merged = match out.remove(&var.param) {
                    Some(existing) => Type::union(existing, actual.clone(), self),
                    None => actual.clone(),
                };
                out.insert(var.param, merged);
            }
            Type::Class(expected_class) => {
                let Type::Class(actual_class) = actual.fully_unaliased(self) else {
                    return;
                };
                if let Some(projected) = project_to(&actual_class, expected_class.decl, self) {
                    for (e, a) in expected_class.type_args.iter().zip(projected.type_args.iter()) {
                        self.unify(e, a, params, out);
                    }
                }
            }
            Type::Alias(_) => self.unify(&expected.unaliased(self), actual, params, out),
            _ => {}
        }
    }

    fn parameter_type(&self, param: NodeRef) -> Type {
        let Some(tree) = self.tree(param.module) else {
            return Type::Unknown;
        };
        let empty = TypeParameterBindings::new();
        if let Some(NodeData::Parameter {
            type_annotation: Some(annotation),
            ..
        }) = tree.data(param.node)
        {
            return self.type_of_type_node(param.with_node(*annotation), &empty);
        }
        let Some(owner) = tree.parent(param.node) else {
            return Type::Unknown;
        };
        match tree.data(owner) {
            Some(NodeData::Let { value, .. }) => self.type_of_expr(param.with_node(*value), &empty),
            Some(NodeData::Lambda { params, .. }) => {
                let position = params.iter().position(|&p| p == param.node);
                let types = self.lambda_parameter_types(param.with_node(owner));
                position
                    .and_then(|i| types.get(i).cloned())
                    .unwrap_or(Type::Unknown)
            }
            Some(NodeData::ForGenerator { key, iterable, .. }) => {
                let iterable = self.type_of_expr(param.with_node(*iterable), &empty);
                let (key_type, value_type) = self.iteration_types(&iterable);
                if *key == Some(param.node) {
                    key_type
                } else {
                    value_type
                }
            }
            _ => Type::Unknown,
        }
    }

    /// Parameter types of a lambda: annotations where written, otherwise
    /// taken from the function type the lambda is expected to have.
    pub fn lambda_parameter_types(&self, lambda: NodeRef) -> Vec<Type> {
        let Some(tree) = self.tree(lambda.module) else {
            return Vec::new();
        };
        let Some(NodeData::Lambda { params, .. }) = tree.data(lambda.node) else {
            return Vec::new();
        };
        let expected = self.expected_type_of(lambda).non_null(self).fully_unaliased(self);
        let base = self.base();
        let expected_params: &[Type] = match &expected {
            Type::Class(class) if base.function_arity(class.decl) == Some(params.len()) => {
                &class.type_args[..params.len()]
            }
            _ => &[],
        };
        let empty = TypeParameterBindings::new();
        params
            .iter()
            .enumerate()
            .map(|(i, &param)| match tree.data(param) {
                Some(NodeData::Parameter {
                    type_annotation: Some(annotation),
                    ..
                }) => self.type_of_type_node(lambda.with_node(*annotation), &empty),
                _ => expected_params.get(i).cloned().unwrap_or(Type::Unknown),
            })
            .collect()
    }

    /// Key and value types produced by iterating over `iterable` in a `for`
    /// generator.
    pub fn iteration_types(&self, iterable: &Type) -> (Type, Type) {
        let base = self.base();
        let Type::Class(class) = iterable.non_null(self).fully_unaliased(self) else {
            return (Type::Unknown, Type::Unknown);
        };
        if class.decl == base.int_seq {
            return (base.int_type(), base.int_type());
        }
        for container in [base.listing, base.collection] {
            if let Some(projected) = project_to(&class, container, self) {
                return (base.int_type(), arg(&projected, 0));
            }
        }
        for container in [base.mapping, base.map] {
            if let Some(projected) = project_to(&class, container, self) {
                return (arg(&projected, 0), arg(&projected, 1));
            }
        }
        (Type::Unknown, Type::Unknown)
    }

    // =========================================================================
    // `this`
    // =========================================================================

    /// Type of `this` at `site`: the innermost object body's type, else the
    /// enclosing class, else the module. Inside a type constraint `this` is
    /// the constrained value.
    pub fn this_type(&self, site: NodeRef) -> Type {
        let Some(tree) = self.tree(site.module) else {
            return Type::Unknown;
        };
        let mut prev = site.node;
        for node in std::iter::once(site.node).chain(tree.ancestors(site.node)) {
            match tree.data(node) {
                Some(NodeData::ObjectBody { .. }) => return self.body_this_type(site.with_node(node)),
                Some(NodeData::Class { type_params, .. }) => {
                    let args = type_params
                        .iter()
                        .map(|&param| Type::variable(site.with_node(param)))
                        .collect();
                    return Type::class(site.with_node(node), args, self);
                }
                Some(NodeData::Module { .. }) => return Type::module(site.module, None, self),
                Some(NodeData::ConstrainedType { inner, constraints })
                    if constraints.contains(&prev) =>
                {
                    return self
                        .type_of_type_node(site.with_node(*inner), &TypeParameterBindings::new());
                }
                _ => {}
            }
            prev = node;
        }
        Type::Unknown
    }

    fn body_this_type(&self, body: NodeRef) -> Type {
        self.in_flight()
            .scope(InFlightKey::ThisType(body), Type::Unknown, || {
                let Some(tree) = self.tree(body.module) else {
                    return Type::Unknown;
                };
                let Some(parent) = tree.parent(body.node) else {
                    return Type::Unknown;
                };
                let owner = body.with_node(parent);
                let empty = TypeParameterBindings::new();
                match tree.data(parent) {
                    Some(NodeData::New { .. } | NodeData::Amend { .. }) => {
                        self.type_of_expr(owner, &empty)
                    }
                    Some(NodeData::Property { .. }) => {
                        let declared = self.property_type(owner);
                        if declared.is_unknown() {
                            self.base().dynamic_type()
                        } else {
                            declared.non_null(self).amending(self)
                        }
                    }
                    Some(NodeData::Entry { .. }) => {
                        let container = self.this_type(owner);
                        self.entry_types(&container).1.non_null(self).amending(self)
                    }
                    Some(NodeData::ForGenerator { .. } | NodeData::WhenGenerator { .. }) => {
                        self.this_type(owner)
                    }
                    _ => Type::Unknown,
                }
            })
    }

    // =========================================================================
    // Expected types
    // =========================================================================

    /// Type a property's value must conform to: its own annotation, else the
    /// type of the property it overrides (in a superclass, the supermodule,
    /// or the enclosing object's `this` type).
    pub fn property_type(&self, property: NodeRef) -> Type {
        self.in_flight()
            .scope(InFlightKey::ExpectedType(property), Type::Unknown, || {
                let Some(tree) = self.tree(property.module) else {
                    return Type::Unknown;
                };
                if let Some(NodeData::Property {
                    type_annotation: Some(annotation),
                    ..
                }) = tree.data(property.node)
                {
                    return self.type_of_type_node(
                        property.with_node(*annotation),
                        &TypeParameterBindings::new(),
                    );
                }
                match self.overridden_property(property) {
                    Some(overridden) => self.property_type(overridden.decl).bind(&overridden.bindings),
                    None => Type::Unknown,
                }
            })
    }

    /// The declaration `property` overrides or amends, if any.
    pub fn overridden_property(&self, property: NodeRef) -> Option<Resolved> {
        let tree = self.tree(property.module)?;
        let name = tree.name(property.node)?;
        let container = tree.parent(property.node)?;
        let receiver = match tree.data(container)? {
            NodeData::Class { .. } => self.supertype(property.with_node(container))?,
            NodeData::Module { .. } => {
                Type::module(self.supermodule(property.module)?, None, self)
            }
            NodeData::ObjectBody { .. } => self.this_type(property.with_node(container)),
            _ => return None,
        };
        let mut visitor = FirstMatch::new(name);
        resolve_qualified_access(&receiver, ResolveMode::Property, self, &mut visitor);
        visitor.into_result().filter(|found| found.decl != property)
    }

    /// Type an expression is expected to have from its position: a property
    /// value, a listing element, a mapping entry, a method body, a call
    /// argument, or a branch of any of those.
    pub fn expected_type_of(&self, expr: NodeRef) -> Type {
        self.in_flight()
            .scope(InFlightKey::ExpectedType(expr), Type::Unknown, || {
                self.compute_expected_type(expr)
            })
    }

    fn compute_expected_type(&self, expr: NodeRef) -> Type {
        let Some(tree) = self.tree(expr.module) else {
            return Type::Unknown;
        };
        let Some(parent) = tree.parent(expr.node) else {
            return Type::Unknown;
        };
        let owner = expr.with_node(parent);
        let empty = TypeParameterBindings::new();
        match tree.data(parent) {
            Some(NodeData::Property { value: Some(value), .. }) if *value == expr.node => {
                self.property_type(owner)
            }
            Some(NodeData::Element { value }) if *value == expr.node => {
                let container = self.this_type(owner);
                self.element_type(&container)
            }
            Some(NodeData::Entry { key, value, .. }) => {
                let container = self.this_type(owner);
                let (key_type, value_type) = self.entry_types(&container);
                if *key == expr.node {
                    key_type
                } else if *value == Some(expr.node) {
                    value_type
                } else {
                    Type::Unknown
                }
            }
            Some(NodeData::Method {
                body: Some(body),
                return_type: Some(ret),
                ..
            }) if *body == expr.node => self.type_of_type_node(owner.with_node(*ret), &empty),
            Some(NodeData::Parenthesized { .. }) => self.expected_type_of(owner),
            Some(NodeData::If {
                then_branch,
                else_branch,
                ..
            }) if *then_branch == expr.node || *else_branch == expr.node => {
                self.expected_type_of(owner)
            }
            Some(NodeData::Let { body, .. }) if *body == expr.node => self.expected_type_of(owner),
            Some(NodeData::Lambda { body, .. }) if *body == expr.node => {
                match self.expected_type_of(owner).non_null(self).fully_unaliased(self) {
                    Type::Class(class) if self.base().is_function_class(class.decl) => {
                        class.type_args.last().cloned().unwrap_or(Type::Unknown)
                    }
                    _ => Type::Unknown,
                }
            }
            Some(
                NodeData::UnqualifiedAccess { args: Some(args), .. }
                | NodeData::QualifiedAccess { args: Some(args), .. },
            ) => match args.iter().position(|&arg| arg == expr.node) {
                Some(position) => self.argument_type(owner, position),
                None => Type::Unknown,
            },
            _ => Type::Unknown,
        }
    }

    /// Declared type of parameter `position` of the method `call` invokes.
    /// The method's own type parameters are left open (`Unknown`).
    pub fn argument_type(&self, call: NodeRef, position: usize) -> Type {
        let Some(resolved) = self.resolve_access(call) else {
            return Type::Unknown;
        };
        let Some(tree) = self.tree(resolved.decl.module) else {
            return Type::Unknown;
        };
        let Some(NodeData::Method {
            type_params,
            params,
            ..
        }) = tree.data(resolved.decl.node)
        else {
            return Type::Unknown;
        };
        let Some(&param) = params.get(position) else {
            return Type::Unknown;
        };
        let Some(NodeData::Parameter {
            type_annotation: Some(annotation),
            ..
        }) = tree.data(param)
        else {
            return Type::Unknown;
        };
        let bindings = resolved.bindings.extended(
            type_params
                .iter()
                .map(|&p| (resolved.decl.with_node(p), Type::Unknown)),
        );
        self.type_of_type_node(resolved.decl.with_node(*annotation), &bindings)
    }

    /// The declaration a call or property access resolves to.
    pub fn resolve_access(&self, access: NodeRef) -> Option<Resolved> {
        let tree = self.tree(access.module)?;
        match tree.data(access.node)? {
            NodeData::UnqualifiedAccess { name, args } => {
                let mode = ResolveMode::for_access(args.as_ref());
                let this_type = self.this_type(access);
                let mut visitor = FirstMatch::new(name);
                resolve_unqualified_access(access, &this_type, mode, self, &mut visitor);
                visitor.into_result()
            }
            NodeData::QualifiedAccess {
                receiver,
                name,
                args,
                ..
            } => {
                let mode = ResolveMode::for_access(args.as_ref());
                let receiver = self
                    .type_of_expr(access.with_node(*receiver), &TypeParameterBindings::new())
                    .non_null(self);
                let mut visitor = FirstMatch::new(name);
                resolve_qualified_access(&receiver, mode, self, &mut visitor);
                visitor.into_result()
            }
            _ => None,
        }
    }

    // =========================================================================
    // Object members
    // =========================================================================

    /// Type of the elements of an object with type `container`.
    pub fn element_type(&self, container: &Type) -> Type {
        let Type::Class(class) = container.fully_unaliased(self) else {
            return Type::Unknown;
        };
        match project_to(&class, self.base().listing, self) {
            Some(listing) => arg(&listing, 0),
            None => Type::Unknown,
        }
    }

    /// Key and value types of the entries of an object with type
    /// `container`.
    pub fn entry_types(&self, container: &Type) -> (Type, Type) {
        let base = self.base();
        let Type::Class(class) = container.fully_unaliased(self) else {
            return (Type::Unknown, Type::Unknown);
        };
        if let Some(mapping) = project_to(&class, base.mapping, self) {
            return (arg(&mapping, 0), arg(&mapping, 1));
        }
        if let Some(listing) = project_to(&class, base.listing, self) {
            return (base.int_type(), arg(&listing, 0));
        }
        (Type::Unknown, Type::Unknown)
    }

    /// Whether the class or module behind `ty` may gain members in a
    /// subtype (`open` or `abstract`).
    pub fn is_open_type(&self, ty: &Type) -> bool {
        let open = Modifiers::OPEN | Modifiers::ABSTRACT;
        match ty.fully_unaliased(self) {
            Type::Class(class) => self
                .tree(class.decl.module)
                .is_some_and(|tree| tree.modifiers(class.decl.node).intersects(open)),
            Type::Module(module) => self
                .tree(module.module)
                .is_some_and(|tree| tree.modifiers(tree.root()).intersects(open)),
            Type::Union(union) => self.is_open_type(&union.left) || self.is_open_type(&union.right),
            _ => false,
        }
    }
}

fn arg(class: &ClassType, position: usize) -> Type {
    class.type_args.get(position).cloned().unwrap_or(Type::Unknown)
}
