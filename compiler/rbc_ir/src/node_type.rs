//! Fieldless node-type tags.

use std::fmt;

/// Tag identifying a node's type, independent of its payload.
///
/// Preprocessors are keyed by this tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Block,
    Nil,
    True,
    False,
    SelfRef,
    Lit,
    Str,
    Dstr,
    Array,
    Hash,
    Lvar,
    Lasgn,
    Dvar,
    Dasgn,
    DasgnCurr,
    Gvar,
    Gasgn,
    Ivar,
    Iasgn,
    Const,
    Colon2,
    Colon3,
    Cdecl,
    Call,
    Fcall,
    Vcall,
    CachedCall,
    Iter,
    Yield,
    If,
    While,
    Until,
    And,
    Or,
    Not,
    Case,
    Return,
    Break,
    Next,
    Ensure,
    Rescue,
    Defn,
    Defs,
    Class,
    Module,
}

impl NodeType {
    /// The wire name of this tag (the JSON `"type"` value).
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::Block => "block",
            NodeType::Nil => "nil",
            NodeType::True => "true",
            NodeType::False => "false",
            NodeType::SelfRef => "self",
            NodeType::Lit => "lit",
            NodeType::Str => "str",
            NodeType::Dstr => "dstr",
            NodeType::Array => "array",
            NodeType::Hash => "hash",
            NodeType::Lvar => "lvar",
            NodeType::Lasgn => "lasgn",
            NodeType::Dvar => "dvar",
            NodeType::Dasgn => "dasgn",
            NodeType::DasgnCurr => "dasgn_curr",
            NodeType::Gvar => "gvar",
            NodeType::Gasgn => "gasgn",
            NodeType::Ivar => "ivar",
            NodeType::Iasgn => "iasgn",
            NodeType::Const => "const",
            NodeType::Colon2 => "colon2",
            NodeType::Colon3 => "colon3",
            NodeType::Cdecl => "cdecl",
            NodeType::Call => "call",
            NodeType::Fcall => "fcall",
            NodeType::Vcall => "vcall",
            NodeType::CachedCall => "cached_call",
            NodeType::Iter => "iter",
            NodeType::Yield => "yield",
            NodeType::If => "if",
            NodeType::While => "while",
            NodeType::Until => "until",
            NodeType::And => "and",
            NodeType::Or => "or",
            NodeType::Not => "not",
            NodeType::Case => "case",
            NodeType::Return => "return",
            NodeType::Break => "break",
            NodeType::Next => "next",
            NodeType::Ensure => "ensure",
            NodeType::Rescue => "rescue",
            NodeType::Defn => "defn",
            NodeType::Defs => "defs",
            NodeType::Class => "class",
            NodeType::Module => "module",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
