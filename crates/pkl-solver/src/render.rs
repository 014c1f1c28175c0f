//! Rendering types back to Pkl syntax.
//!
//! The caller picks how declarations are named: fully qualified
//! (`base#String`) for logs and tests, or by simple name for hovers and
//! diagnostics.

use pkl_syntax::node::import_name;
use pkl_syntax::{ModuleId, NodeRef, print_node};

use crate::context::{TypeContext, decl_name};
use crate::types::{Constraints, Type};

pub trait NameRenderer {
    fn render_declaration(&self, decl: NodeRef, ctx: &dyn TypeContext, out: &mut String);

    fn render_module(
        &self,
        module: ModuleId,
        reference_name: Option<&str>,
        ctx: &dyn TypeContext,
        out: &mut String,
    );
}

/// `moduleName#Decl`; modules by their declared name, or URI.
pub struct FullNameRenderer;

/// Bare declaration names; modules by the name they were referenced with.
pub struct SimpleNameRenderer;

fn module_label(module: ModuleId, ctx: &dyn TypeContext) -> String {
    match ctx.tree(module) {
        Some(tree) => match tree.module_name() {
            Some(name) => name.to_string(),
            None => tree.uri().to_string(),
        },
        None => format!("<module {}>", module.0),
    }
}

impl NameRenderer for FullNameRenderer {
    fn render_declaration(&self, decl: NodeRef, ctx: &dyn TypeContext, out: &mut String) {
        out.push_str(&module_label(decl.module, ctx));
        out.push('#');
        out.push_str(decl_name(ctx, decl).as_deref().unwrap_or("?"));
    }

    fn render_module(
        &self,
        module: ModuleId,
        _reference_name: Option<&str>,
        ctx: &dyn TypeContext,
        out: &mut String,
    ) {
        out.push_str(&module_label(module, ctx));
    }
}

impl NameRenderer for SimpleNameRenderer {
    fn render_declaration(&self, decl: NodeRef, ctx: &dyn TypeContext, out: &mut String) {
        out.push_str(decl_name(ctx, decl).as_deref().unwrap_or("?"));
    }

    fn render_module(
        &self,
        module: ModuleId,
        reference_name: Option<&str>,
        ctx: &dyn TypeContext,
        out: &mut String,
    ) {
        if let Some(name) = reference_name {
            out.push_str(name);
            return;
        }
        match ctx.tree(module) {
            Some(tree) => match tree.module_name() {
                Some(name) => out.push_str(name.rsplit('.').next().unwrap_or(name)),
                None => out.push_str(import_name(tree.uri())),
            },
            None => out.push_str("module"),
        }
    }
}

impl Type {
    pub fn render(&self, names: &dyn NameRenderer, ctx: &dyn TypeContext) -> String {
        let mut out = String::new();
        render_into(self, names, ctx, &mut out);
        out
    }

    /// Hover/diagnostic rendering with simple names.
    pub fn display(&self, ctx: &dyn TypeContext) -> String {
        self.render(&SimpleNameRenderer, ctx)
    }
}

fn render_into(ty: &Type, names: &dyn NameRenderer, ctx: &dyn TypeContext, out: &mut String) {
    if ty.has_constraints() {
        let bare = ty.without_constraints();
        render_operand(&bare, names, ctx, out);
        render_constraints(ty.constraints(), ctx, out);
        return;
    }
    let base = ctx.base();
    match ty {
        Type::Unknown => out.push_str("unknown"),
        Type::Nothing => out.push_str("nothing"),
        Type::Variable(v) => out.push_str(decl_name(ctx, v.param).as_deref().unwrap_or("?")),
        Type::StringLiteral(s) => quote(&s.value, out),
        Type::Module(m) => names.render_module(m.module, m.reference_name.as_deref(), ctx, out),
        Type::Class(c) if is_function_type(ty, ctx) => {
            let Some((result, params)) = c.type_args.split_last() else {
                return;
            };
            out.push('(');
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(param, names, ctx, out);
            }
            out.push_str(") -> ");
            render_into(result, names, ctx, out);
        }
        Type::Class(c) => {
            names.render_declaration(c.decl, ctx, out);
            render_args(&c.type_args, names, ctx, out);
        }
        Type::Alias(a) => {
            names.render_declaration(a.decl, ctx, out);
            render_args(&a.type_args, names, ctx, out);
        }
        Type::Union(u) => {
            let (left_null, right_null) = (base.is_null_class(&u.left), base.is_null_class(&u.right));
            if left_null != right_null {
                let other = if left_null { &u.right } else { &u.left };
                render_operand(other, names, ctx, out);
                out.push('?');
                return;
            }
            render_union_side(&u.left, names, ctx, out);
            out.push('|');
            render_union_side(&u.right, names, ctx, out);
        }
    }
}

fn render_args(args: &[Type], names: &dyn NameRenderer, ctx: &dyn TypeContext, out: &mut String) {
    if args.is_empty() {
        return;
    }
    out.push('<');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_into(arg, names, ctx, out);
    }
    out.push('>');
}

fn is_function_type(ty: &Type, ctx: &dyn TypeContext) -> bool {
    matches!(ty, Type::Class(c) if ctx.base().function_arity(c.decl).is_some() && !c.type_args.is_empty())
}

/// A type followed by a postfix (`?` or a constraint list).
fn render_operand(ty: &Type, names: &dyn NameRenderer, ctx: &dyn TypeContext, out: &mut String) {
    let wrap = matches!(ty, Type::Union(_)) || is_function_type(ty, ctx);
    if wrap {
        out.push('(');
    }
    render_into(ty, names, ctx, out);
    if wrap {
        out.push(')');
    }
}

fn render_union_side(ty: &Type, names: &dyn NameRenderer, ctx: &dyn TypeContext, out: &mut String) {
    if is_function_type(ty, ctx) && !ty.has_constraints() {
        out.push('(');
        render_into(ty, names, ctx, out);
        out.push(')');
    } else {
        render_into(ty, names, ctx, out);
    }
}

fn render_constraints(constraints: &Constraints, ctx: &dyn TypeContext, out: &mut String) {
    out.push('(');
    for (i, expr) in constraints.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match ctx.tree(expr.module) {
            Some(tree) => out.push_str(&print_node(&tree, expr.node)),
            None => out.push('?'),
        }
    }
    out.push(')');
}

fn quote(value: &str, out: &mut String) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}
