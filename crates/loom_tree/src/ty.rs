//! The type class: kinds, schema and the [`Type`] façade.

use crate::handle::define_handle;
use crate::tree::Tree;
use crate::TYPE_TAG;
use loom_common::Ident;
use loom_object::{define_kinds, ItemId, Kind, ObjectClass, Store};

define_kinds! {
    /// Every kind of type.
    #[allow(missing_docs)]
    pub enum TypeKind {
        Unresolved = "T_UNRESOLVED" [Ident],
        Subtype = "T_SUBTYPE" [Ident | Base | Resolution | Dims],
        Integer = "T_INTEGER" [Ident | Dims],
        Real = "T_REAL" [Ident | Dims],
        Enum = "T_ENUM" [Ident | Literals],
        Physical = "T_PHYSICAL" [Ident | Units | Dims],
        Carray = "T_CARRAY" [Ident | Elem | Dims],
        Uarray = "T_UARRAY" [Ident | Elem | IndexCon],
        Record = "T_RECORD" [Ident | Fields],
        File = "T_FILE" [Ident | Designated],
        Access = "T_ACCESS" [Ident | Designated],
        Func = "T_FUNC" [Ident | Ptypes | Result],
        Incomplete = "T_INCOMPLETE" [Ident],
        Proc = "T_PROC" [Ident | Ptypes],
        None = "T_NONE" [Ident],
        Protected = "T_PROTECTED" [Ident | Decls],
    }
}

const fn edge(to: TypeKind) -> (Kind, Kind) {
    (TypeKind::Incomplete.as_raw(), to.as_raw())
}

const TYPE_RETAGS: &[(Kind, Kind)] = &[
    edge(TypeKind::Record),
    edge(TypeKind::Access),
    edge(TypeKind::File),
    edge(TypeKind::Protected),
    edge(TypeKind::Integer),
    edge(TypeKind::Real),
    edge(TypeKind::Enum),
    edge(TypeKind::Physical),
    edge(TypeKind::Carray),
    edge(TypeKind::Uarray),
];

/// The type class description.
pub static TYPE_CLASS: ObjectClass = ObjectClass {
    name: "type",
    tag: TYPE_TAG,
    has_map: TypeKind::HAS_MAP,
    kind_names: TypeKind::NAMES,
    change_allowed: TYPE_RETAGS,
    gc_roots: &[],
    optional: ItemId::Resolution.bit(),
    unit_keys: &[],
};

define_handle!(
    /// A type.
    Type(TypeKind, TYPE_TAG)
);

impl Type {
    fn ty(self, store: &Store, item: ItemId) -> Type {
        Type(store.get_object(self.0, item))
    }

    fn push(self, store: &mut Store, item: ItemId, element: impl Into<loom_object::ObjectId>) {
        store.push_array(self.0, item, element.into());
    }

    /// Returns the type name.
    pub fn ident(self, store: &Store) -> Ident {
        store.get_ident(self.0, ItemId::Ident)
    }

    /// Returns `true` if the type is named.
    pub fn has_ident(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Ident)
    }

    /// Sets the type name.
    pub fn set_ident(self, store: &mut Store, ident: Ident) {
        store.set_ident(self.0, ItemId::Ident, ident);
    }

    /// Returns the number of range constraints.
    pub fn dim_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::Dims)
    }

    /// Returns range constraint `n`.
    pub fn dim(self, store: &Store, n: usize) -> Tree {
        Tree(store.array_nth(self.0, ItemId::Dims, n))
    }

    /// Appends a range constraint.
    pub fn add_dim(self, store: &mut Store, range: Tree) {
        self.push(store, ItemId::Dims, range);
    }

    /// Returns the element type of an array.
    pub fn elem(self, store: &Store) -> Type {
        self.ty(store, ItemId::Elem)
    }

    /// Sets the element type.
    pub fn set_elem(self, store: &mut Store, elem: Type) {
        store.set_object(self.0, ItemId::Elem, Some(elem.0));
    }

    /// Returns the base type of a subtype.
    pub fn base(self, store: &Store) -> Type {
        self.ty(store, ItemId::Base)
    }

    /// Sets the base type.
    pub fn set_base(self, store: &mut Store, base: Type) {
        store.set_object(self.0, ItemId::Base, Some(base.0));
    }

    /// Returns the resolution function name of a subtype.
    pub fn resolution(self, store: &Store) -> Tree {
        Tree(store.get_object(self.0, ItemId::Resolution))
    }

    /// Returns `true` if the subtype is resolved.
    pub fn has_resolution(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Resolution)
    }

    /// Sets or clears the resolution function name.
    pub fn set_resolution(self, store: &mut Store, name: Option<Tree>) {
        store.set_object(self.0, ItemId::Resolution, name.map(Tree::id));
    }

    /// Returns the number of enumeration literals.
    pub fn enum_literal_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::Literals)
    }

    /// Returns enumeration literal `n`.
    pub fn enum_literal(self, store: &Store, n: usize) -> Tree {
        Tree(store.array_nth(self.0, ItemId::Literals, n))
    }

    /// Appends an enumeration literal.
    pub fn add_enum_literal(self, store: &mut Store, literal: Tree) {
        self.push(store, ItemId::Literals, literal);
    }

    /// Returns the number of record fields.
    pub fn field_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::Fields)
    }

    /// Returns record field `n`.
    pub fn field(self, store: &Store, n: usize) -> Tree {
        Tree(store.array_nth(self.0, ItemId::Fields, n))
    }

    /// Appends a record field.
    pub fn add_field(self, store: &mut Store, field: Tree) {
        self.push(store, ItemId::Fields, field);
    }

    /// Returns the number of physical units.
    pub fn unit_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::Units)
    }

    /// Returns physical unit `n`.
    pub fn unit(self, store: &Store, n: usize) -> Tree {
        Tree(store.array_nth(self.0, ItemId::Units, n))
    }

    /// Appends a physical unit.
    pub fn add_unit(self, store: &mut Store, unit: Tree) {
        self.push(store, ItemId::Units, unit);
    }

    /// Returns the number of parameter types of a subprogram type.
    pub fn param_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::Ptypes)
    }

    /// Returns parameter type `n`.
    pub fn param(self, store: &Store, n: usize) -> Type {
        Type(store.array_nth(self.0, ItemId::Ptypes, n))
    }

    /// Appends a parameter type.
    pub fn add_param(self, store: &mut Store, ty: Type) {
        self.push(store, ItemId::Ptypes, ty);
    }

    /// Returns the result type of a function type.
    pub fn result(self, store: &Store) -> Type {
        self.ty(store, ItemId::Result)
    }

    /// Sets the result type.
    pub fn set_result(self, store: &mut Store, result: Type) {
        store.set_object(self.0, ItemId::Result, Some(result.0));
    }

    /// Returns the number of index subtypes of an unconstrained array.
    pub fn index_con_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::IndexCon)
    }

    /// Returns index subtype `n`.
    pub fn index_con(self, store: &Store, n: usize) -> Type {
        Type(store.array_nth(self.0, ItemId::IndexCon, n))
    }

    /// Appends an index subtype.
    pub fn add_index_con(self, store: &mut Store, ty: Type) {
        self.push(store, ItemId::IndexCon, ty);
    }

    /// Returns the designated type of an access or file type.
    pub fn designated(self, store: &Store) -> Type {
        self.ty(store, ItemId::Designated)
    }

    /// Sets the designated type.
    pub fn set_designated(self, store: &mut Store, ty: Type) {
        store.set_object(self.0, ItemId::Designated, Some(ty.0));
    }

    /// Returns the number of declarations of a protected type.
    pub fn decl_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::Decls)
    }

    /// Returns declaration `n` of a protected type.
    pub fn decl(self, store: &Store, n: usize) -> Tree {
        Tree(store.array_nth(self.0, ItemId::Decls, n))
    }

    /// Appends a declaration to a protected type.
    pub fn add_decl(self, store: &mut Store, decl: Tree) {
        self.push(store, ItemId::Decls, decl);
    }

    /// Follows subtype links down to the base type.
    pub fn base_recur(self, store: &Store) -> Type {
        let mut ty = self;
        while ty.kind(store) == TypeKind::Subtype {
            ty = ty.base(store);
        }
        ty
    }

    /// Returns `true` for constrained and unconstrained arrays, looking
    /// through subtypes.
    pub fn is_array(self, store: &Store) -> bool {
        matches!(self.base_recur(store).kind(store), TypeKind::Carray | TypeKind::Uarray)
    }

    /// Returns `true` for scalar types, looking through subtypes.
    pub fn is_scalar(self, store: &Store) -> bool {
        matches!(
            self.base_recur(store).kind(store),
            TypeKind::Integer | TypeKind::Real | TypeKind::Enum | TypeKind::Physical
        )
    }
}
