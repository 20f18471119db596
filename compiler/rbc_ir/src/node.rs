//! Parse-tree nodes.
//!
//! The external parser hands over one tree per region, serialized as JSON:
//! every node is an object tagged by `"type"`, carrying its children inline
//! and an optional `"line"`. The code generator never mutates a tree;
//! preprocessors that want a different shape build a new node instead.

use serde::{Deserialize, Serialize};

use crate::NodeType;

/// A parse-tree node with its source line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Source line (0 when unknown, e.g. for synthesized nodes).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: u32,
}

#[allow(
    clippy::trivially_copy_pass_by_ref,
    reason = "serde skip_serializing_if passes by reference"
)]
fn is_zero(line: &u32) -> bool {
    *line == 0
}

impl Node {
    /// Create a node without line information.
    pub fn new(kind: NodeKind) -> Self {
        Node { kind, line: 0 }
    }

    /// Create a node at `line`.
    pub fn at(kind: NodeKind, line: u32) -> Self {
        Node { kind, line }
    }

    /// The tag preprocessors are registered against.
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// The statements of a `block` node, or the node itself.
    pub fn statements(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Block { stmts } => stmts,
            _ => std::slice::from_ref(self),
        }
    }

    /// This call, dispatched through the per-site cache `site`.
    pub fn cached(&self, site: String) -> Node {
        Node::at(
            NodeKind::CachedCall {
                site,
                call: Box::new(self.clone()),
            },
            self.line,
        )
    }

    /// The plain call behind a call-site cache annotation, if any.
    ///
    /// Plugins that run after call-site caching see calls wrapped in
    /// [`NodeKind::CachedCall`]; this gives them the underlying call either way.
    pub fn call_target(&self) -> &Node {
        match &self.kind {
            NodeKind::CachedCall { call, .. } => call,
            _ => self,
        }
    }
}

/// A literal value (`lit` node payload).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    /// Integer literal too large for `i64`, kept as decimal digits.
    Bignum(String),
    Float(f64),
    Sym(String),
}

/// Target path of a `class` or `module` definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cpath {
    /// Explicit outer scope (`A::B`); `None` means the lexical cbase.
    #[serde(default)]
    pub scope: Option<Box<Node>>,
    pub name: String,
}

/// One `when` clause of a `case`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct When {
    pub values: Vec<Node>,
    #[serde(default)]
    pub body: Option<Box<Node>>,
}

/// Node payloads, one variant per node type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    // Sequencing
    Block {
        stmts: Vec<Node>,
    },

    // Literals
    Nil,
    True,
    False,
    #[serde(rename = "self")]
    SelfRef,
    Lit {
        lit: Literal,
    },
    Str {
        value: String,
    },
    /// String interpolation: parts are converted with `to_s` and joined.
    Dstr {
        parts: Vec<Node>,
    },
    Array {
        #[serde(default)]
        elems: Vec<Node>,
    },
    Hash {
        #[serde(default)]
        pairs: Vec<(Node, Node)>,
    },

    // Variables
    Lvar {
        name: String,
    },
    Lasgn {
        name: String,
        value: Box<Node>,
    },
    Dvar {
        name: String,
    },
    /// Assignment to a block variable that may live in an outer block.
    Dasgn {
        name: String,
        value: Box<Node>,
    },
    /// Assignment that declares a variable in the current block.
    DasgnCurr {
        name: String,
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    Gvar {
        name: String,
    },
    Gasgn {
        name: String,
        value: Box<Node>,
    },
    Ivar {
        name: String,
    },
    Iasgn {
        name: String,
        value: Box<Node>,
    },
    Const {
        name: String,
    },
    Colon2 {
        scope: Box<Node>,
        name: String,
    },
    Colon3 {
        name: String,
    },
    Cdecl {
        name: String,
        value: Box<Node>,
    },

    // Calls
    Call {
        recv: Box<Node>,
        method: String,
        #[serde(default)]
        args: Vec<Node>,
    },
    Fcall {
        method: String,
        #[serde(default)]
        args: Vec<Node>,
    },
    Vcall {
        method: String,
    },
    /// A call dispatched through the per-site cache named `site`.
    ///
    /// Never produced by the parser; the call-site caching plugin rewrites
    /// `call`/`fcall`/`vcall` nodes into this form.
    CachedCall {
        site: String,
        call: Box<Node>,
    },
    Iter {
        call: Box<Node>,
        #[serde(default)]
        params: Vec<String>,
        #[serde(default)]
        body: Option<Box<Node>>,
    },
    Yield {
        #[serde(default)]
        args: Vec<Node>,
    },

    // Control flow
    If {
        cond: Box<Node>,
        #[serde(default)]
        then: Option<Box<Node>>,
        #[serde(default, rename = "else")]
        else_body: Option<Box<Node>>,
    },
    While {
        cond: Box<Node>,
        #[serde(default)]
        body: Option<Box<Node>>,
        #[serde(default)]
        do_while: bool,
    },
    Until {
        cond: Box<Node>,
        #[serde(default)]
        body: Option<Box<Node>>,
        #[serde(default)]
        do_while: bool,
    },
    And {
        left: Box<Node>,
        right: Box<Node>,
    },
    Or {
        left: Box<Node>,
        right: Box<Node>,
    },
    Not {
        value: Box<Node>,
    },
    Case {
        subject: Box<Node>,
        whens: Vec<When>,
        #[serde(default, rename = "else")]
        else_body: Option<Box<Node>>,
    },
    Return {
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    Break {
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    Next {
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    Ensure {
        #[serde(default)]
        body: Option<Box<Node>>,
        #[serde(default)]
        ensure: Option<Box<Node>>,
    },
    Rescue {
        #[serde(default)]
        body: Option<Box<Node>>,
        #[serde(default)]
        rescue: Option<Box<Node>>,
    },

    // Definitions
    Defn {
        name: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        body: Option<Box<Node>>,
    },
    Defs {
        recv: Box<Node>,
        name: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        body: Option<Box<Node>>,
    },
    Class {
        cpath: Cpath,
        #[serde(default)]
        superclass: Option<Box<Node>>,
        #[serde(default)]
        body: Option<Box<Node>>,
    },
    Module {
        cpath: Cpath,
        #[serde(default)]
        body: Option<Box<Node>>,
    },
}

impl NodeKind {
    /// The fieldless tag of this payload.
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Block { .. } => NodeType::Block,
            NodeKind::Nil => NodeType::Nil,
            NodeKind::True => NodeType::True,
            NodeKind::False => NodeType::False,
            NodeKind::SelfRef => NodeType::SelfRef,
            NodeKind::Lit { .. } => NodeType::Lit,
            NodeKind::Str { .. } => NodeType::Str,
            NodeKind::Dstr { .. } => NodeType::Dstr,
            NodeKind::Array { .. } => NodeType::Array,
            NodeKind::Hash { .. } => NodeType::Hash,
            NodeKind::Lvar { .. } => NodeType::Lvar,
            NodeKind::Lasgn { .. } => NodeType::Lasgn,
            NodeKind::Dvar { .. } => NodeType::Dvar,
            NodeKind::Dasgn { .. } => NodeType::Dasgn,
            NodeKind::DasgnCurr { .. } => NodeType::DasgnCurr,
            NodeKind::Gvar { .. } => NodeType::Gvar,
            NodeKind::Gasgn { .. } => NodeType::Gasgn,
            NodeKind::Ivar { .. } => NodeType::Ivar,
            NodeKind::Iasgn { .. } => NodeType::Iasgn,
            NodeKind::Const { .. } => NodeType::Const,
            NodeKind::Colon2 { .. } => NodeType::Colon2,
            NodeKind::Colon3 { .. } => NodeType::Colon3,
            NodeKind::Cdecl { .. } => NodeType::Cdecl,
            NodeKind::Call { .. } => NodeType::Call,
            NodeKind::Fcall { .. } => NodeType::Fcall,
            NodeKind::Vcall { .. } => NodeType::Vcall,
            NodeKind::CachedCall { .. } => NodeType::CachedCall,
            NodeKind::Iter { .. } => NodeType::Iter,
            NodeKind::Yield { .. } => NodeType::Yield,
            NodeKind::If { .. } => NodeType::If,
            NodeKind::While { .. } => NodeType::While,
            NodeKind::Until { .. } => NodeType::Until,
            NodeKind::And { .. } => NodeType::And,
            NodeKind::Or { .. } => NodeType::Or,
            NodeKind::Not { .. } => NodeType::Not,
            NodeKind::Case { .. } => NodeType::Case,
            NodeKind::Return { .. } => NodeType::Return,
            NodeKind::Break { .. } => NodeType::Break,
            NodeKind::Next { .. } => NodeType::Next,
            NodeKind::Ensure { .. } => NodeType::Ensure,
            NodeKind::Rescue { .. } => NodeType::Rescue,
            NodeKind::Defn { .. } => NodeType::Defn,
            NodeKind::Defs { .. } => NodeType::Defs,
            NodeKind::Class { .. } => NodeType::Class,
            NodeKind::Module { .. } => NodeType::Module,
        }
    }
}

/// A parsed source file as delivered by the external parser.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub file_name: String,
    /// `BEGIN { ... }` preamble, run before the main tree.
    #[serde(default)]
    pub begin: Option<Node>,
    #[serde(default)]
    pub tree: Option<Node>,
}
