//! The bundled `pkl:base` module.
//!
//! The standard library's base module is modelled as a declaration-only
//! syntax tree: classes, type aliases, properties and method signatures, no
//! bodies. Signatures are written as compact strings and expanded into nodes
//! by a small signature reader, so the table below reads like the real
//! module.

use tracing::warn;

use crate::builder::TreeBuilder;
use crate::node::{Modifier, ModuleId, NodeIndex, Variance};
use crate::tree::SyntaxTree;

pub const BASE_MODULE_URI: &str = "pkl:base";

struct ClassDecl {
    modifiers: &'static [Modifier],
    name: &'static str,
    type_params: &'static [(&'static str, Variance)],
    extends: Option<&'static str>,
    members: &'static [&'static str],
}

const ABSTRACT: &[Modifier] = &[Modifier::Abstract, Modifier::External];
const EXTERNAL: &[Modifier] = &[Modifier::External];
const OPEN: &[Modifier] = &[Modifier::Open, Modifier::External];
const OUT_ELEMENT: &[(&str, Variance)] = &[("Element", Variance::Out)];
const OUT_KEY_VALUE: &[(&str, Variance)] = &[("Key", Variance::Out), ("Value", Variance::Out)];

const NUMBER_MEMBERS: &[&str] = &[
    "isPositive: Boolean",
    "isNonZero: Boolean",
    "isFinite: Boolean",
    "isInfinite: Boolean",
    "isNaN: Boolean",
    "abs: Number",
    "sign: Number",
    "function isBetween(start: Number, inclusiveEnd: Number): Boolean",
    "function toInt(): Int",
    "function toFloat(): Float",
    "function toString(): String",
];

const STRING_MEMBERS: &[&str] = &[
    "length: Int",
    "isEmpty: Boolean",
    "isBlank: Boolean",
    "isRegex: Boolean",
    "chars: List<String>",
    "function startsWith(pattern: String): Boolean",
    "function endsWith(pattern: String): Boolean",
    "function contains(pattern: String): Boolean",
    "function matches(regex: Regex): Boolean",
    "function toUpperCase(): String",
    "function toLowerCase(): String",
    "function trim(): String",
    "function reverse(): String",
    "function repeat(count: Int): String",
    "function split(pattern: String): List<String>",
    "function replaceAll(pattern: String, replacement: String): String",
    "function toInt(): Int",
    "function toIntOrNull(): Int?",
];

const COLLECTION_MEMBERS: &[&str] = &[
    "length: Int",
    "isEmpty: Boolean",
    "first: Element",
    "firstOrNull: Element?",
    "last: Element",
    "function contains(element: Any): Boolean",
    "function map<Result>(transform: (Element) -> Result): Collection<Result>",
    "function filter(predicate: (Element) -> Boolean): Collection<Element>",
    "function fold<Result>(initial: Result, operator: (Result, Element) -> Result): Result",
    "function any(predicate: (Element) -> Boolean): Boolean",
    "function every(predicate: (Element) -> Boolean): Boolean",
    "function join(separator: String): String",
    "function toList(): List<Element>",
    "function toSet(): Set<Element>",
    "function toListing(): Listing<Element>",
];

const MAP_MEMBERS: &[&str] = &[
    "length: Int",
    "isEmpty: Boolean",
    "keys: Set<Key>",
    "values: List<Value>",
    "function containsKey(key: Any): Boolean",
    "function getOrNull(key: Any): Value?",
    "function fold<Result>(initial: Result, operator: (Result, Key, Value) -> Result): Result",
    "function filter(predicate: (Key, Value) -> Boolean): Map<Key, Value>",
    "function map<NewKey, NewValue>(transform: (Key, Value) -> Pair<NewKey, NewValue>): Map<NewKey, NewValue>",
    "function toMapping(): Mapping<Key, Value>",
];

const CLASSES: &[ClassDecl] = &[
    ClassDecl {
        modifiers: ABSTRACT,
        name: "Any",
        type_params: &[],
        extends: None,
        members: &["function getClass(): Class", "function toString(): String"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Null",
        type_params: &[],
        extends: Some("Any"),
        members: &[],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Boolean",
        type_params: &[],
        extends: Some("Any"),
        members: &[
            "function xor(other: Boolean): Boolean",
            "function implies(other: Boolean): Boolean",
        ],
    },
    ClassDecl {
        modifiers: ABSTRACT,
        name: "Number",
        type_params: &[],
        extends: Some("Any"),
        members: NUMBER_MEMBERS,
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Int",
        type_params: &[],
        extends: Some("Number"),
        members: &["isEven: Boolean", "isOdd: Boolean", "abs: Int", "sign: Int", "function toChar(): String"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Float",
        type_params: &[],
        extends: Some("Number"),
        members: &["abs: Float", "sign: Float", "function round(): Float"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "String",
        type_params: &[],
        extends: Some("Any"),
        members: STRING_MEMBERS,
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Duration",
        type_params: &[],
        extends: Some("Any"),
        members: &["value: Number", "unit: String", "isPositive: Boolean"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "DataSize",
        type_params: &[],
        extends: Some("Any"),
        members: &["value: Number", "unit: String", "isPositive: Boolean"],
    },
    ClassDecl {
        modifiers: ABSTRACT,
        name: "Object",
        type_params: &[],
        extends: Some("Any"),
        members: &[],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Dynamic",
        type_params: &[],
        extends: Some("Object"),
        members: &[
            "function hasProperty(name: String): Boolean",
            "function getProperty(name: String): unknown",
            "function getPropertyOrNull(name: String): unknown",
            "function toMap(): Map<unknown, unknown>",
            "function toList(): List<unknown>",
        ],
    },
    ClassDecl {
        modifiers: ABSTRACT,
        name: "Typed",
        type_params: &[],
        extends: Some("Object"),
        members: &[
            "function hasProperty(name: String): Boolean",
            "function toDynamic(): Dynamic",
            "function toMap(): Map<String, unknown>",
        ],
    },
    ClassDecl {
        modifiers: ABSTRACT,
        name: "Module",
        type_params: &[],
        extends: Some("Typed"),
        members: &["function relativePathTo(other: Module): List<String>"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Listing",
        type_params: OUT_ELEMENT,
        extends: Some("Object"),
        members: &[
            "length: Int",
            "isEmpty: Boolean",
            "isDistinct: Boolean",
            "default: (Int) -> Element",
            "function toList(): List<Element>",
            "function toSet(): Set<Element>",
            "function join(separator: String): String",
        ],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Mapping",
        type_params: OUT_KEY_VALUE,
        extends: Some("Object"),
        members: &[
            "length: Int",
            "isEmpty: Boolean",
            "keys: Set<Key>",
            "default: (Key) -> Value",
            "function containsKey(key: Any): Boolean",
            "function getOrNull(key: Any): Value?",
            "function fold<Result>(initial: Result, operator: (Result, Key, Value) -> Result): Result",
            "function toMap(): Map<Key, Value>",
        ],
    },
    ClassDecl {
        modifiers: ABSTRACT,
        name: "Collection",
        type_params: OUT_ELEMENT,
        extends: Some("Any"),
        members: COLLECTION_MEMBERS,
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "List",
        type_params: OUT_ELEMENT,
        extends: Some("Collection<Element>"),
        members: &[
            "function map<Result>(transform: (Element) -> Result): List<Result>",
            "function filter(predicate: (Element) -> Boolean): List<Element>",
            "function sortWith(comparator: (Element, Element) -> Boolean): List<Element>",
            "function getOrNull(index: Int): Element?",
        ],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Set",
        type_params: OUT_ELEMENT,
        extends: Some("Collection<Element>"),
        members: &[
            "function map<Result>(transform: (Element) -> Result): Set<Result>",
            "function filter(predicate: (Element) -> Boolean): Set<Element>",
        ],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Map",
        type_params: OUT_KEY_VALUE,
        extends: Some("Any"),
        members: MAP_MEMBERS,
    },
    ClassDecl {
        modifiers: ABSTRACT,
        name: "Function",
        type_params: &[("Result", Variance::Out)],
        extends: Some("Any"),
        members: &[],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Function0",
        type_params: &[("Result", Variance::Out)],
        extends: Some("Function<Result>"),
        members: &["function apply(): Result"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Function1",
        type_params: &[("A1", Variance::In), ("Result", Variance::Out)],
        extends: Some("Function<Result>"),
        members: &["function apply(p1: A1): Result"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Function2",
        type_params: &[
            ("A1", Variance::In),
            ("A2", Variance::In),
            ("Result", Variance::Out),
        ],
        extends: Some("Function<Result>"),
        members: &["function apply(p1: A1, p2: A2): Result"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Function3",
        type_params: &[
            ("A1", Variance::In),
            ("A2", Variance::In),
            ("A3", Variance::In),
            ("Result", Variance::Out),
        ],
        extends: Some("Function<Result>"),
        members: &["function apply(p1: A1, p2: A2, p3: A3): Result"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Function4",
        type_params: &[
            ("A1", Variance::In),
            ("A2", Variance::In),
            ("A3", Variance::In),
            ("A4", Variance::In),
            ("Result", Variance::Out),
        ],
        extends: Some("Function<Result>"),
        members: &["function apply(p1: A1, p2: A2, p3: A3, p4: A4): Result"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Function5",
        type_params: &[
            ("A1", Variance::In),
            ("A2", Variance::In),
            ("A3", Variance::In),
            ("A4", Variance::In),
            ("A5", Variance::In),
            ("Result", Variance::Out),
        ],
        extends: Some("Function<Result>"),
        members: &["function apply(p1: A1, p2: A2, p3: A3, p4: A4, p5: A5): Result"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Pair",
        type_params: &[("First", Variance::Out), ("Second", Variance::Out)],
        extends: Some("Any"),
        members: &["first: First", "second: Second", "key: First", "value: Second"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Regex",
        type_params: &[],
        extends: Some("Any"),
        members: &["pattern: String", "function findMatchesIn(input: String): List<String>"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "IntSeq",
        type_params: &[],
        extends: Some("Any"),
        members: &["start: Int", "end: Int", "step: Int", "function toList(): List<Int>"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "Class",
        type_params: &[("Type", Variance::Out)],
        extends: Some("Any"),
        members: &["simpleName: String"],
    },
    ClassDecl {
        modifiers: EXTERNAL,
        name: "TypeAlias",
        type_params: &[],
        extends: Some("Any"),
        members: &[],
    },
    ClassDecl {
        modifiers: OPEN,
        name: "ModuleOutput",
        type_params: &[],
        extends: Some("Typed"),
        members: &["text: String", "value: Any"],
    },
];

const MODULE_MEMBERS: &[&str] = &[
    "NaN: Float",
    "Infinity: Float",
    "function Regex(pattern: String): Regex",
    "function Pair<First, Second>(first: First, second: Second): Pair<First, Second>",
    "function IntSeq(start: Int, end: Int): IntSeq",
    "function List<Element>(element: Element): List<Element>",
    "function Set<Element>(element: Element): Set<Element>",
    "function Map<Key, Value>(key: Key, value: Value): Map<Key, Value>",
];

/// `(name, min, max)` of the integer range aliases (`Int(isBetween(min, max))`).
const INT_RANGE_ALIASES: &[(&str, i64, i64)] = &[
    ("Int8", -128, 127),
    ("Int16", -32_768, 32_767),
    ("Int32", -2_147_483_648, 2_147_483_647),
    ("UInt8", 0, 255),
    ("UInt16", 0, 65_535),
    ("UInt32", 0, 4_294_967_295),
];

/// Build the declaration tree of `pkl:base`.
pub fn base_module_tree() -> SyntaxTree {
    let (tree, malformed) = build_base();
    for sig in malformed {
        warn!(signature = sig, "malformed signature in the bundled base module");
    }
    tree
}

/// The base tree plus every signature the reader could not consume in full.
fn build_base() -> (SyntaxTree, Vec<&'static str>) {
    let mut base = BaseBuilder {
        b: TreeBuilder::new(BASE_MODULE_URI, ModuleId::BASE),
        malformed: Vec::new(),
    };
    let mut members = Vec::new();

    for decl in CLASSES {
        members.push(base.class(decl));
    }
    for &(name, min, max) in INT_RANGE_ALIASES {
        let int = base.b.declared_type("Int", Vec::new());
        let min = base.b.int(min);
        let max = base.b.int(max);
        let constraint = base.b.call("isBetween", vec![min, max]);
        let constrained = base.b.constrained_type(int, vec![constraint]);
        members.push(base.b.type_alias(&[], name, Vec::new(), constrained));
    }
    {
        let int = base.b.declared_type("Int", Vec::new());
        let positive = base.b.ident("isPositive");
        let constrained = base.b.constrained_type(int, vec![positive]);
        members.push(base.b.type_alias(&[], "UInt", Vec::new(), constrained));
    }
    let comparable = base.signature_type("String|Number|Duration|DataSize");
    members.push(base.b.type_alias(&[], "Comparable", Vec::new(), comparable));
    {
        let param = base.b.type_param("Type", Variance::Invariant);
        let aliased = base.signature_type("(Type) -> Type");
        members.push(base.b.type_alias(&[], "Mixin", vec![param], aliased));
    }
    for &sig in MODULE_MEMBERS {
        members.push(base.member(sig));
    }

    let root = base.b.module(Some("base"), None, Vec::new(), members);
    (base.b.finish(root), base.malformed)
}

// =============================================================================
// Signature reader
// =============================================================================

struct BaseBuilder {
    b: TreeBuilder,
    malformed: Vec<&'static str>,
}

impl BaseBuilder {
    fn class(&mut self, decl: &ClassDecl) -> NodeIndex {
        let type_params = decl
            .type_params
            .iter()
            .map(|&(name, variance)| self.b.type_param(name, variance))
            .collect();
        let extends = decl.extends.map(|sig| self.signature_type(sig));
        let members = decl.members.iter().map(|&sig| self.member(sig)).collect();
        self.b
            .class(decl.modifiers, decl.name, type_params, extends, members)
    }

    fn signature_type(&mut self, sig: &'static str) -> NodeIndex {
        let mut cursor = Cursor::new(sig);
        let ty = self.union(&mut cursor);
        self.finish(cursor);
        ty
    }

    fn finish(&mut self, mut cursor: Cursor<'static>) {
        if cursor.malformed || !cursor.at_end() {
            self.malformed.push(cursor.src);
        }
    }

    /// `name: Type` or `function name<T>(p: P, ...): R`.
    fn member(&mut self, sig: &'static str) -> NodeIndex {
        let mut cursor = Cursor::new(sig);
        let member = self.member_at(&mut cursor);
        self.finish(cursor);
        member
    }

    fn member_at(&mut self, cursor: &mut Cursor<'static>) -> NodeIndex {
        if cursor.eat_word("function") {
            let name = cursor.ident();
            let mut type_params = Vec::new();
            if cursor.eat('<') {
                loop {
                    let param = cursor.ident();
                    type_params.push(self.b.type_param(param, Variance::Invariant));
                    if !cursor.eat(',') {
                        break;
                    }
                }
                cursor.expect('>');
            }
            cursor.expect('(');
            let mut params = Vec::new();
            if !cursor.eat(')') {
                loop {
                    let param = cursor.ident();
                    cursor.expect(':');
                    let ty = self.union(cursor);
                    params.push(self.b.param(param, Some(ty)));
                    if !cursor.eat(',') {
                        break;
                    }
                }
                cursor.expect(')');
            }
            cursor.expect(':');
            let ret = self.union(cursor);
            self.b
                .method(&[Modifier::External], name, type_params, params, Some(ret), None)
        } else {
            let name = cursor.ident();
            cursor.expect(':');
            let ty = self.union(cursor);
            self.b.property(&[], name, Some(ty), None)
        }
    }

    fn union(&mut self, cursor: &mut Cursor<'_>) -> NodeIndex {
        let mut left = self.postfix(cursor);
        while cursor.eat('|') {
            let right = self.postfix(cursor);
            left = self.b.union_type(left, right);
        }
        left
    }

    fn postfix(&mut self, cursor: &mut Cursor<'_>) -> NodeIndex {
        let mut ty = self.primary(cursor);
        while cursor.eat('?') {
            ty = self.b.nullable_type(ty);
        }
        ty
    }

    fn primary(&mut self, cursor: &mut Cursor<'_>) -> NodeIndex {
        if cursor.eat('(') {
            let mut params = Vec::new();
            if !cursor.eat(')') {
                loop {
                    params.push(self.union(cursor));
                    if !cursor.eat(',') {
                        break;
                    }
                }
                cursor.expect(')');
            }
            cursor.expect('-');
            cursor.expect('>');
            let ret = self.union(cursor);
            return self.b.function_type(params, ret);
        }
        match cursor.ident() {
            "unknown" => self.b.unknown_type(),
            "nothing" => self.b.nothing_type(),
            name => {
                let mut args = Vec::new();
                if cursor.eat('<') {
                    loop {
                        args.push(self.union(cursor));
                        if !cursor.eat(',') {
                            break;
                        }
                    }
                    cursor.expect('>');
                }
                self.b.declared_type(name, args)
            }
        }
    }
}

struct Cursor<'s> {
    src: &'s str,
    pos: usize,
    /// Set by a failed `expect` or an empty identifier.
    malformed: bool,
}

impl<'s> Cursor<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            pos: 0,
            malformed: false,
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.src.len()
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.src[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) {
        if !self.eat(c) {
            self.malformed = true;
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        self.skip_whitespace();
        let rest = &self.src[self.pos..];
        if rest.starts_with(word) && rest[word.len()..].starts_with(char::is_whitespace) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> &'s str {
        self.skip_whitespace();
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        if len == 0 {
            self.malformed = true;
        }
        &rest[..len]
    }
}

#[cfg(test)]
#[path = "../tests/stdlib_tests.rs"]
mod tests;
