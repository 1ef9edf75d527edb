//! Kinds of the tree class, their schema, retag edges and syntactic
//! categories, plus the integer encodings stored in sub-kind, class and
//! flag items.

use crate::TREE_TAG;
use loom_object::{define_kinds, ItemId, Kind, ObjectClass, UnitKey};
use std::ops::BitOr;

define_kinds! {
    /// Every construct of the syntax tree.
    #[allow(missing_docs)]
    pub enum TreeKind {
        Entity = "T_ENTITY" [Ident | Ports | Generics | Context | Decls | Stmts],
        Arch = "T_ARCH" [Ident | Ident2 | Decls | Stmts | Context | Primary],
        PortDecl = "T_PORT_DECL" [Ident | Value | Type | Subkind | Class | Flags],
        Fcall = "T_FCALL" [Ident | Params | Type | Ref | Flags],
        Literal = "T_LITERAL" [Subkind | Type | Ival | Dval | Chars | Flags | Ident | Ref],
        SignalDecl = "T_SIGNAL_DECL" [Ident | Value | Type | Flags | Ident2],
        VarDecl = "T_VAR_DECL" [Ident | Value | Type | Flags | Ident2],
        Process = "T_PROCESS" [Ident | Decls | Stmts | Triggers | Flags],
        Ref = "T_REF" [Ident | Type | Ref | Flags],
        Wait = "T_WAIT" [Ident | Value | Delay | Triggers | Flags],
        TypeDecl = "T_TYPE_DECL" [Ident | Type],
        VarAssign = "T_VAR_ASSIGN" [Ident | Value | Target],
        Package = "T_PACKAGE" [Ident | Decls | Context],
        SignalAssign = "T_SIGNAL_ASSIGN" [Ident | Target | Waves | Reject],
        Qualified = "T_QUALIFIED" [Ident | Value | Type],
        EnumLit = "T_ENUM_LIT" [Ident | Type | Pos],
        ConstDecl = "T_CONST_DECL" [Ident | Value | Type | Flags | Ident2],
        FuncDecl = "T_FUNC_DECL" [Ident | Ports | Type | Flags | Ident2 | Subkind],
        Elab = "T_ELAB" [Ident | Decls | Stmts | Context | Eopt],
        Aggregate = "T_AGGREGATE" [Type | Assocs | Flags],
        Assert = "T_ASSERT" [Ident | Value | Severity | Message],
        AttrRef = "T_ATTR_REF" [Name | Value | Ident | Params | Type | Subkind],
        ArrayRef = "T_ARRAY_REF" [Value | Params | Type | Flags],
        ArraySlice = "T_ARRAY_SLICE" [Value | Type | Ranges],
        Instance = "T_INSTANCE" [Ident | Ident2 | Params | Genmaps | Ref | Class | Spec],
        If = "T_IF" [Ident | Value | Stmts | Elses],
        Null = "T_NULL" [Ident],
        PackBody = "T_PACK_BODY" [Ident | Decls | Context | Primary],
        FuncBody = "T_FUNC_BODY" [Ident | Decls | Stmts | Ports | Type | Flags | Ident2 | Subkind],
        Return = "T_RETURN" [Ident | Value],
        Cassign = "T_CASSIGN" [Ident | Target | Conds | Guard],
        While = "T_WHILE" [Ident | Value | Stmts],
        Waveform = "T_WAVEFORM" [Value | Delay],
        Alias = "T_ALIAS" [Ident | Value | Type | Ident2],
        For = "T_FOR" [Ident | Stmts | Ranges | Decls],
        AttrDecl = "T_ATTR_DECL" [Ident | Type],
        AttrSpec = "T_ATTR_SPEC" [Ident | Value | Ident2 | Class | Ref],
        ProcDecl = "T_PROC_DECL" [Ident | Ports | Type | Flags | Ident2 | Subkind],
        ProcBody = "T_PROC_BODY" [Ident | Decls | Stmts | Ports | Type | Flags | Ident2 | Subkind],
        Exit = "T_EXIT" [Ident | Value | Ident2],
        Pcall = "T_PCALL" [Ident | Ident2 | Params | Ref],
        Case = "T_CASE" [Ident | Value | Assocs],
        Block = "T_BLOCK" [Ident | Decls | Stmts | Ports | Generics | Params | Genmaps],
        Cond = "T_COND" [Value | Waves | Reject],
        TypeConv = "T_TYPE_CONV" [Value | Type | Flags],
        Select = "T_SELECT" [Ident | Value | Assocs | Guard],
        Component = "T_COMPONENT" [Ident | Ports | Generics],
        IfGenerate = "T_IF_GENERATE" [Ident | Value | Decls | Stmts],
        ForGenerate = "T_FOR_GENERATE" [Ident | Decls | Stmts | Ranges],
        FileDecl = "T_FILE_DECL" [Ident | Value | Type | FileMode | Ident2],
        Open = "T_OPEN" [Type],
        FieldDecl = "T_FIELD_DECL" [Ident | Type | Pos],
        RecordRef = "T_RECORD_REF" [Ident | Value | Type | Ref],
        All = "T_ALL" [Value | Type],
        New = "T_NEW" [Value | Type],
        Cassert = "T_CASSERT" [Ident | Value | Severity | Message | Flags],
        Cpcall = "T_CPCALL" [Ident | Ident2 | Params | Ref],
        UnitDecl = "T_UNIT_DECL" [Ident | Value | Type],
        Next = "T_NEXT" [Ident | Value | Ident2],
        Genvar = "T_GENVAR" [Ident | Type | Flags],
        Param = "T_PARAM" [Value | Pos | Subkind | Name],
        Assoc = "T_ASSOC" [Value | Pos | Name | Ranges | Subkind],
        Use = "T_USE" [Ident | Ident2 | Ref],
        Hier = "T_HIER" [Ident | Subkind | Ident2],
        Spec = "T_SPEC" [Ident | Ident2 | Value | Ref | Decls],
        Binding = "T_BINDING" [Params | Genmaps | Ident | Ident2 | Class | Ref],
        Library = "T_LIBRARY" [Ident | Ident2],
        DesignUnit = "T_DESIGN_UNIT" [Context],
        Configuration = "T_CONFIGURATION" [Ident | Ident2 | Decls | Primary],
        ProtBody = "T_PROT_BODY" [Ident | Type | Decls],
        Context = "T_CONTEXT" [Context | Ident],
        Ctxref = "T_CTXREF" [Ident | Ref],
        Constraint = "T_CONSTRAINT" [Subkind | Ranges],
        BlockConfig = "T_BLOCK_CONFIG" [Decls | Ident | Value | Ranges | Ref],
        ProtFcall = "T_PROT_FCALL" [Ident | Params | Type | Ref | Flags | Name],
        ProtPcall = "T_PROT_PCALL" [Ident | Ident2 | Params | Ref | Name],
        Range = "T_RANGE" [Subkind | Value | Left | Right | Type],
        ImplicitSignal = "T_IMPLICIT_SIGNAL" [Ident | Type | Subkind | Value | Flags],
        Disconnect = "T_DISCONNECT" [Ident | Ref | Type | Delay],
        GroupTemplate = "T_GROUP_TEMPLATE" [Ident],
        Group = "T_GROUP" [Ident | Ref],
        SubtypeDecl = "T_SUBTYPE_DECL" [Ident | Type],
    }
}

const STMT_KINDS: &[TreeKind] = &[
    TreeKind::Process,
    TreeKind::Wait,
    TreeKind::VarAssign,
    TreeKind::SignalAssign,
    TreeKind::Assert,
    TreeKind::Instance,
    TreeKind::If,
    TreeKind::Null,
    TreeKind::Return,
    TreeKind::Cassign,
    TreeKind::While,
    TreeKind::For,
    TreeKind::Exit,
    TreeKind::Pcall,
    TreeKind::Case,
    TreeKind::Block,
    TreeKind::Select,
    TreeKind::IfGenerate,
    TreeKind::ForGenerate,
    TreeKind::Cpcall,
    TreeKind::Cassert,
    TreeKind::Next,
    TreeKind::ProtPcall,
];

const EXPR_KINDS: &[TreeKind] = &[
    TreeKind::Fcall,
    TreeKind::Literal,
    TreeKind::Ref,
    TreeKind::Qualified,
    TreeKind::Aggregate,
    TreeKind::AttrRef,
    TreeKind::ArrayRef,
    TreeKind::ArraySlice,
    TreeKind::TypeConv,
    TreeKind::Open,
    TreeKind::RecordRef,
    TreeKind::All,
    TreeKind::New,
    TreeKind::ProtFcall,
];

const DECL_KINDS: &[TreeKind] = &[
    TreeKind::PortDecl,
    TreeKind::SignalDecl,
    TreeKind::VarDecl,
    TreeKind::TypeDecl,
    TreeKind::ConstDecl,
    TreeKind::FuncDecl,
    TreeKind::FuncBody,
    TreeKind::Alias,
    TreeKind::AttrDecl,
    TreeKind::AttrSpec,
    TreeKind::ProcDecl,
    TreeKind::ProcBody,
    TreeKind::Component,
    TreeKind::FileDecl,
    TreeKind::FieldDecl,
    TreeKind::UnitDecl,
    TreeKind::Genvar,
    TreeKind::Hier,
    TreeKind::Spec,
    TreeKind::Binding,
    TreeKind::Use,
    TreeKind::ProtBody,
    TreeKind::BlockConfig,
    TreeKind::ImplicitSignal,
    TreeKind::Disconnect,
    TreeKind::GroupTemplate,
    TreeKind::Group,
    TreeKind::SubtypeDecl,
];

impl TreeKind {
    /// Returns `true` for sequential and concurrent statements.
    pub fn is_stmt(self) -> bool {
        STMT_KINDS.contains(&self)
    }

    /// Returns `true` for expressions.
    pub fn is_expr(self) -> bool {
        EXPR_KINDS.contains(&self)
    }

    /// Returns `true` for declarations.
    pub fn is_decl(self) -> bool {
        DECL_KINDS.contains(&self)
    }

    /// Returns `true` for items that may appear in a context clause.
    pub fn is_context_item(self) -> bool {
        matches!(self, TreeKind::Use | TreeKind::Library | TreeKind::Ctxref)
    }
}

const fn edge(from: TreeKind, to: TreeKind) -> (Kind, Kind) {
    (from.as_raw(), to.as_raw())
}

const TREE_RETAGS: &[(Kind, Kind)] = &[
    edge(TreeKind::Ref, TreeKind::Fcall),
    edge(TreeKind::Ref, TreeKind::Pcall),
    edge(TreeKind::ArrayRef, TreeKind::Fcall),
    edge(TreeKind::Fcall, TreeKind::ArrayRef),
    edge(TreeKind::Fcall, TreeKind::Pcall),
    edge(TreeKind::Fcall, TreeKind::TypeConv),
    edge(TreeKind::Ref, TreeKind::TypeConv),
    edge(TreeKind::Ref, TreeKind::RecordRef),
    edge(TreeKind::Ref, TreeKind::Qualified),
    edge(TreeKind::ArrayRef, TreeKind::ArraySlice),
    edge(TreeKind::Assert, TreeKind::Cassert),
    edge(TreeKind::DesignUnit, TreeKind::Entity),
    edge(TreeKind::DesignUnit, TreeKind::Package),
    edge(TreeKind::DesignUnit, TreeKind::PackBody),
    edge(TreeKind::DesignUnit, TreeKind::Arch),
    edge(TreeKind::DesignUnit, TreeKind::Configuration),
    edge(TreeKind::DesignUnit, TreeKind::Context),
    edge(TreeKind::FuncDecl, TreeKind::FuncBody),
    edge(TreeKind::ProcDecl, TreeKind::ProcBody),
    edge(TreeKind::Ref, TreeKind::ArraySlice),
    edge(TreeKind::Fcall, TreeKind::Cpcall),
    edge(TreeKind::Pcall, TreeKind::Cpcall),
    edge(TreeKind::Ref, TreeKind::Cpcall),
    edge(TreeKind::AttrRef, TreeKind::ArrayRef),
    edge(TreeKind::ProtFcall, TreeKind::ProtPcall),
    edge(TreeKind::Fcall, TreeKind::ProtFcall),
    edge(TreeKind::Pcall, TreeKind::ProtPcall),
];

const TREE_ROOTS: &[Kind] = &[
    TreeKind::Arch.as_raw(),
    TreeKind::Entity.as_raw(),
    TreeKind::Package.as_raw(),
    TreeKind::Elab.as_raw(),
    TreeKind::PackBody.as_raw(),
    TreeKind::Context.as_raw(),
    TreeKind::Configuration.as_raw(),
    TreeKind::DesignUnit.as_raw(),
];

const TREE_UNIT_KEYS: &[UnitKey] = &[
    UnitKey {
        kind: TreeKind::Arch.as_raw(),
        qualifier: Some(ItemId::Ident2),
        suffix: None,
    },
    UnitKey {
        kind: TreeKind::PackBody.as_raw(),
        qualifier: None,
        suffix: Some("body"),
    },
    UnitKey {
        kind: TreeKind::Elab.as_raw(),
        qualifier: None,
        suffix: Some("elab"),
    },
];

/// The tree class description.
pub static TREE_CLASS: ObjectClass = ObjectClass {
    name: "tree",
    tag: TREE_TAG,
    has_map: TreeKind::HAS_MAP,
    kind_names: TreeKind::NAMES,
    change_allowed: TREE_RETAGS,
    gc_roots: TREE_ROOTS,
    optional: ItemId::Value.bit()
        | ItemId::Type.bit()
        | ItemId::Primary.bit()
        | ItemId::Ref.bit()
        | ItemId::Spec.bit()
        | ItemId::Delay.bit()
        | ItemId::Message.bit()
        | ItemId::Reject.bit()
        | ItemId::Guard.bit()
        | ItemId::Name.bit()
        | ItemId::FileMode.bit(),
    unit_keys: TREE_UNIT_KEYS,
};

macro_rules! define_subkind {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $raw:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// Decodes the stored integer.
            pub fn from_raw(raw: i64) -> Option<Self> {
                match raw {
                    $($raw => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Returns the stored integer.
            pub fn as_raw(self) -> i64 {
                match self {
                    $(Self::$variant => $raw,)*
                }
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> i64 {
                value.as_raw()
            }
        }
    };
}

define_subkind! {
    /// Sub-kind of a [`TreeKind::Literal`].
    LiteralKind {
        /// Integer literal, value in `ival`.
        Int = 0,
        /// Real literal, value in `dval`.
        Real = 1,
        /// The `null` literal.
        Null = 2,
        /// String literal, characters in `chars`.
        String = 3,
    }
}

define_subkind! {
    /// Mode of a port or subprogram parameter declaration.
    PortMode {
        /// No explicit mode.
        None = 0,
        /// `in`
        In = 1,
        /// `out`
        Out = 2,
        /// `inout`
        Inout = 3,
        /// `buffer`
        Buffer = 4,
        /// `linkage`
        Linkage = 5,
    }
}

define_subkind! {
    /// Sub-kind of a [`TreeKind::Param`].
    ParamKind {
        /// Positional association.
        Pos = 0,
        /// Named association.
        Named = 1,
    }
}

define_subkind! {
    /// Sub-kind of a [`TreeKind::Assoc`].
    AssocKind {
        /// Positional choice.
        Pos = 0,
        /// Named choice.
        Named = 1,
        /// Range choice.
        Range = 2,
        /// `others`
        Others = 3,
    }
}

define_subkind! {
    /// Direction of a [`TreeKind::Range`].
    RangeKind {
        /// Ascending.
        To = 0,
        /// Descending.
        Downto = 1,
        /// A range given by an attribute or other expression.
        Expr = 2,
    }
}

define_subkind! {
    /// Entity class stored in `I_CLASS`.
    EntityClass {
        /// No class given.
        Default = 0,
        /// Entity.
        Entity = 1,
        /// Component.
        Component = 2,
        /// Architecture.
        Architecture = 3,
        /// Package.
        Package = 4,
        /// Configuration.
        Configuration = 5,
        /// Type.
        Type = 6,
        /// Subtype.
        Subtype = 7,
        /// Constant.
        Constant = 8,
        /// Signal.
        Signal = 9,
        /// Variable.
        Variable = 10,
        /// File.
        File = 11,
        /// Function.
        Function = 12,
        /// Procedure.
        Procedure = 13,
        /// Label.
        Label = 14,
        /// Literal.
        Literal = 15,
        /// Units.
        Units = 16,
        /// Group.
        Group = 17,
    }
}

/// Bits stored in `I_FLAGS`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TreeFlags(i64);

impl TreeFlags {
    /// No flags.
    pub const NONE: TreeFlags = TreeFlags(0);
    /// Declared without an index constraint.
    pub const UNCONSTRAINED: TreeFlags = TreeFlags(1 << 0);
    /// Impure function.
    pub const IMPURE: TreeFlags = TreeFlags(1 << 1);
    /// Call or reference used as a conversion function.
    pub const CONVERSION: TreeFlags = TreeFlags(1 << 2);
    /// Postponed process or concurrent statement.
    pub const POSTPONED: TreeFlags = TreeFlags(1 << 3);
    /// Shared variable.
    pub const SHARED: TreeFlags = TreeFlags(1 << 4);
    /// Guarded signal or assignment.
    pub const GUARDED: TreeFlags = TreeFlags(1 << 5);
    /// Locally static expression.
    pub const LOCALLY_STATIC: TreeFlags = TreeFlags(1 << 6);
    /// Globally static expression.
    pub const GLOBALLY_STATIC: TreeFlags = TreeFlags(1 << 7);

    /// Wraps raw bits.
    pub const fn from_bits(bits: i64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> i64 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub const fn contains(self, other: TreeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TreeFlags {
    type Output = TreeFlags;

    fn bitor(self, rhs: TreeFlags) -> TreeFlags {
        TreeFlags(self.0 | rhs.0)
    }
}
