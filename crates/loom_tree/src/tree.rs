//! The typed tree façade.
//!
//! [`Tree`] is a `Copy` handle; every accessor takes the [`Store`] that owns
//! the node. Setters that link a node into a structurally significant item
//! check that the linked node belongs to the right syntactic category, and
//! the store checks every access against the kind's schema.

use crate::enode::ENode;
use crate::handle::define_handle;
use crate::tree_kind::{EntityClass, LiteralKind, TreeFlags, TreeKind};
use crate::ty::Type;
use crate::{TREE_TAG, TYPE_TAG};
use loom_common::Ident;
use loom_object::{
    codec, CodecError, DeepCopy, DependencyResolver, FnVisitor, ItemId, ObjectId, Rewrite, Store, Visit,
};
use std::io::{Read, Write};

define_handle!(
    /// A node of the syntax tree.
    Tree(TreeKind, TREE_TAG)
);

macro_rules! tree_array {
    ($(#[$meta:meta])* $item:ident: $count:ident, $nth:ident, $iter:ident, $add:ident $(, $check:ident)?) => {
        $(#[$meta])*
        pub fn $count(self, store: &Store) -> usize {
            store.array_len(self.0, ItemId::$item)
        }

        #[doc = concat!("Returns element `n` of `", stringify!($item), "`.")]
        pub fn $nth(self, store: &Store, n: usize) -> Tree {
            Tree(store.array_nth(self.0, ItemId::$item, n))
        }

        #[doc = concat!("Iterates over `", stringify!($item), "` in order.")]
        pub fn $iter<'s>(self, store: &'s Store) -> impl Iterator<Item = Tree> + 's {
            store.get_array(self.0, ItemId::$item).iter().map(|&id| Tree(id))
        }

        #[doc = concat!("Appends to `", stringify!($item), "`.")]
        pub fn $add(self, store: &mut Store, element: Tree) {
            $(element.$check(store);)?
            store.push_array(self.0, ItemId::$item, element.0);
        }
    };
}

impl Tree {
    fn tree(self, store: &Store, item: ItemId) -> Tree {
        Tree(store.get_object(self.0, item))
    }

    fn set_tree(self, store: &mut Store, item: ItemId, value: Option<Tree>) {
        store.set_object(self.0, item, value.map(Tree::id));
    }

    fn category_error(self, store: &Store, expected: &str) -> ! {
        let kind = self.kind(store);
        store.fail(format_args!("tree {} of kind {kind} is not {expected}", self.0))
    }

    fn expect_stmt(self, store: &Store) {
        if !self.kind(store).is_stmt() {
            self.category_error(store, "a statement");
        }
    }

    fn expect_expr(self, store: &Store) {
        if !self.kind(store).is_expr() {
            self.category_error(store, "an expression");
        }
    }

    fn expect_decl(self, store: &Store) {
        if !self.kind(store).is_decl() {
            self.category_error(store, "a declaration");
        }
    }

    fn expect_kind(self, store: &Store, kind: TreeKind) {
        if self.kind(store) != kind {
            self.category_error(store, kind.name());
        }
    }

    fn expect_waveform(self, store: &Store) {
        self.expect_kind(store, TreeKind::Waveform);
    }

    fn expect_cond(self, store: &Store) {
        self.expect_kind(store, TreeKind::Cond);
    }

    fn expect_assoc(self, store: &Store) {
        self.expect_kind(store, TreeKind::Assoc);
    }

    fn expect_param(self, store: &Store) {
        self.expect_kind(store, TreeKind::Param);
        self.value(store).expect_expr(store);
    }

    fn expect_genmap(self, store: &Store) {
        self.value(store).expect_expr(store);
    }

    fn expect_context_item(self, store: &Store) {
        if !self.kind(store).is_context_item() {
            self.category_error(store, "a context item");
        }
    }

    fn expect_string_literal(self, store: &Store) {
        let is_string = self.kind(store) == TreeKind::Literal
            && store.get_int(self.0, ItemId::Subkind) == LiteralKind::String.as_raw();
        if !is_string {
            self.category_error(store, "a string literal");
        }
    }

    // Identifiers

    /// Returns the primary identifier.
    pub fn ident(self, store: &Store) -> Ident {
        store.get_ident(self.0, ItemId::Ident)
    }

    /// Returns `true` if the primary identifier is set.
    pub fn has_ident(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Ident)
    }

    /// Sets the primary identifier.
    pub fn set_ident(self, store: &mut Store, ident: Ident) {
        store.set_ident(self.0, ItemId::Ident, ident);
    }

    /// Returns the secondary identifier.
    pub fn ident2(self, store: &Store) -> Ident {
        store.get_ident(self.0, ItemId::Ident2)
    }

    /// Returns `true` if the secondary identifier is set.
    pub fn has_ident2(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Ident2)
    }

    /// Sets the secondary identifier.
    pub fn set_ident2(self, store: &mut Store, ident: Ident) {
        store.set_ident(self.0, ItemId::Ident2, ident);
    }

    // Sequences

    tree_array!(
        /// Returns the number of port declarations.
        Ports: port_count, port, ports, add_port, expect_decl
    );
    tree_array!(
        /// Returns the number of generic declarations.
        Generics: generic_count, generic, generics, add_generic, expect_decl
    );
    tree_array!(
        /// Returns the number of declarations.
        Decls: decl_count, decl, decls, add_decl, expect_decl
    );
    tree_array!(
        /// Returns the number of statements.
        Stmts: stmt_count, stmt, stmts, add_stmt, expect_stmt
    );
    tree_array!(
        /// Returns the number of else-branch statements.
        Elses: else_stmt_count, else_stmt, else_stmts, add_else_stmt, expect_stmt
    );
    tree_array!(
        /// Returns the number of waveform elements.
        Waves: waveform_count, waveform, waveforms, add_waveform, expect_waveform
    );
    tree_array!(
        /// Returns the number of conditional waveforms.
        Conds: cond_count, cond, conds, add_cond, expect_cond
    );
    tree_array!(
        /// Returns the number of signals in the sensitivity list.
        Triggers: trigger_count, trigger, triggers, add_trigger, expect_expr
    );
    tree_array!(
        /// Returns the number of associations.
        Assocs: assoc_count, assoc, assocs, add_assoc, expect_assoc
    );
    tree_array!(
        /// Returns the number of context clause items.
        Context: context_count, context, contexts, add_context, expect_context_item
    );
    tree_array!(
        /// Returns the number of parameters.
        Params: param_count, param, params, add_param, expect_param
    );
    tree_array!(
        /// Returns the number of generic map entries.
        Genmaps: genmap_count, genmap, genmaps, add_genmap, expect_genmap
    );
    tree_array!(
        /// Returns the number of ranges.
        Ranges: range_count, range, ranges, add_range
    );

    /// Inserts a declaration at `pos`, shifting later declarations along.
    pub fn insert_decl(self, store: &mut Store, pos: usize, decl: Tree) {
        decl.expect_decl(store);
        store.insert_array(self.0, ItemId::Decls, pos, decl.0);
    }

    /// Drops every declaration from position `len` onwards.
    pub fn trim_decls(self, store: &mut Store, len: usize) {
        store.truncate_array(self.0, ItemId::Decls, len);
    }

    /// Returns the number of characters of a string literal.
    pub fn char_count(self, store: &Store) -> usize {
        self.expect_string_literal(store);
        store.array_len(self.0, ItemId::Chars)
    }

    /// Returns character `n` of a string literal.
    pub fn char(self, store: &Store, n: usize) -> Tree {
        self.expect_string_literal(store);
        Tree(store.array_nth(self.0, ItemId::Chars, n))
    }

    /// Iterates over the characters of a string literal.
    pub fn chars<'s>(self, store: &'s Store) -> impl Iterator<Item = Tree> + 's {
        self.expect_string_literal(store);
        store.get_array(self.0, ItemId::Chars).iter().map(|&id| Tree(id))
    }

    /// Appends a character reference to a string literal.
    pub fn add_char(self, store: &mut Store, ch: Tree) {
        self.expect_string_literal(store);
        store.push_array(self.0, ItemId::Chars, ch.0);
    }

    // Single links

    /// Returns the type.
    pub fn ty(self, store: &Store) -> Type {
        let id = store.get_object(self.0, ItemId::Type);
        match Type::from_id(store, id) {
            Some(ty) => ty,
            None => store.fail(format_args!("tree {} has a non-type object {id} as its type", self.0)),
        }
    }

    /// Returns `true` if the type is set.
    pub fn has_type(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Type)
    }

    /// Sets or clears the type.
    pub fn set_type(self, store: &mut Store, ty: Option<Type>) {
        store.set_object(self.0, ItemId::Type, ty.map(Type::id));
    }

    /// Returns the value expression.
    pub fn value(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Value)
    }

    /// Returns `true` if the value is set.
    pub fn has_value(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Value)
    }

    /// Sets or clears the value. Except on associations and configuration
    /// specifications the value must be an expression.
    pub fn set_value(self, store: &mut Store, value: Option<Tree>) {
        if let Some(v) = value {
            if !matches!(self.kind(store), TreeKind::Assoc | TreeKind::Spec) {
                v.expect_expr(store);
            }
        }
        self.set_tree(store, ItemId::Value, value);
    }

    /// Returns the delay expression.
    pub fn delay(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Delay)
    }

    /// Returns `true` if the delay is set.
    pub fn has_delay(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Delay)
    }

    /// Sets or clears the delay expression.
    pub fn set_delay(self, store: &mut Store, delay: Option<Tree>) {
        if let Some(d) = delay {
            d.expect_expr(store);
        }
        self.set_tree(store, ItemId::Delay, delay);
    }

    /// Returns the assignment target.
    pub fn target(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Target)
    }

    /// Sets the assignment target.
    pub fn set_target(self, store: &mut Store, target: Tree) {
        self.set_tree(store, ItemId::Target, Some(target));
    }

    /// Returns the declaration this node refers to.
    pub fn reference(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Ref)
    }

    /// Returns `true` if the reference is resolved.
    pub fn has_reference(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Ref)
    }

    /// Sets or clears the referenced declaration.
    pub fn set_reference(self, store: &mut Store, decl: Option<Tree>) {
        self.set_tree(store, ItemId::Ref, decl);
    }

    /// Returns the primary unit of a secondary unit.
    pub fn primary(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Primary)
    }

    /// Returns `true` if the primary unit is set.
    pub fn has_primary(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Primary)
    }

    /// Sets or clears the primary unit.
    pub fn set_primary(self, store: &mut Store, unit: Option<Tree>) {
        self.set_tree(store, ItemId::Primary, unit);
    }

    /// Returns the configuration specification of an instance.
    pub fn spec(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Spec)
    }

    /// Returns `true` if a configuration specification is attached.
    pub fn has_spec(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Spec)
    }

    /// Sets or clears the configuration specification.
    pub fn set_spec(self, store: &mut Store, spec: Option<Tree>) {
        self.set_tree(store, ItemId::Spec, spec);
    }

    /// Returns the severity expression of an assertion.
    pub fn severity(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Severity)
    }

    /// Sets the severity expression.
    pub fn set_severity(self, store: &mut Store, severity: Tree) {
        severity.expect_expr(store);
        self.set_tree(store, ItemId::Severity, Some(severity));
    }

    /// Returns the report message of an assertion.
    pub fn message(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Message)
    }

    /// Returns `true` if a report message is set.
    pub fn has_message(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Message)
    }

    /// Sets or clears the report message.
    pub fn set_message(self, store: &mut Store, message: Option<Tree>) {
        if let Some(m) = message {
            m.expect_expr(store);
        }
        self.set_tree(store, ItemId::Message, message);
    }

    /// Returns the reject limit of an inertial assignment.
    pub fn reject(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Reject)
    }

    /// Returns `true` if a reject limit is set.
    pub fn has_reject(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Reject)
    }

    /// Sets or clears the reject limit.
    pub fn set_reject(self, store: &mut Store, reject: Option<Tree>) {
        if let Some(r) = reject {
            r.expect_expr(store);
        }
        self.set_tree(store, ItemId::Reject, reject);
    }

    /// Returns the guard signal reference.
    pub fn guard(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Guard)
    }

    /// Returns `true` if the statement is guarded.
    pub fn has_guard(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Guard)
    }

    /// Sets or clears the guard; a guard is always a [`TreeKind::Ref`].
    pub fn set_guard(self, store: &mut Store, guard: Option<Tree>) {
        if let Some(g) = guard {
            g.expect_kind(store, TreeKind::Ref);
        }
        self.set_tree(store, ItemId::Guard, guard);
    }

    /// Returns the name expression.
    pub fn name(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Name)
    }

    /// Returns `true` if the name is set.
    pub fn has_name(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Name)
    }

    /// Sets or clears the name expression.
    pub fn set_name(self, store: &mut Store, name: Option<Tree>) {
        if let Some(n) = name {
            n.expect_expr(store);
        }
        self.set_tree(store, ItemId::Name, name);
    }

    /// Returns the left bound of a range.
    pub fn left(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Left)
    }

    /// Sets the left bound.
    pub fn set_left(self, store: &mut Store, left: Tree) {
        left.expect_expr(store);
        self.set_tree(store, ItemId::Left, Some(left));
    }

    /// Returns the right bound of a range.
    pub fn right(self, store: &Store) -> Tree {
        self.tree(store, ItemId::Right)
    }

    /// Sets the right bound.
    pub fn set_right(self, store: &mut Store, right: Tree) {
        right.expect_expr(store);
        self.set_tree(store, ItemId::Right, Some(right));
    }

    /// Returns the open mode of a file declaration, if one was given.
    pub fn file_mode(self, store: &Store) -> Option<Tree> {
        store.get_object_opt(self.0, ItemId::FileMode).map(Tree)
    }

    /// Sets or clears the open mode.
    pub fn set_file_mode(self, store: &mut Store, mode: Option<Tree>) {
        self.set_tree(store, ItemId::FileMode, mode);
    }

    /// Returns the elaboration node of an elaborated design.
    pub fn eopt(self, store: &Store) -> ENode {
        let id = store.get_object(self.0, ItemId::Eopt);
        match ENode::from_id(store, id) {
            Some(node) => node,
            None => store.fail(format_args!("tree {} links a non-elaboration object {id}", self.0)),
        }
    }

    /// Sets the elaboration node.
    pub fn set_eopt(self, store: &mut Store, node: ENode) {
        store.set_object(self.0, ItemId::Eopt, Some(node.id()));
    }

    // Scalars

    /// Returns the raw sub-kind.
    pub fn subkind(self, store: &Store) -> i64 {
        store.get_int(self.0, ItemId::Subkind)
    }

    /// Sets the sub-kind.
    pub fn set_subkind(self, store: &mut Store, subkind: impl Into<i64>) {
        store.set_int(self.0, ItemId::Subkind, subkind.into());
    }

    /// Returns the value of an integer literal.
    pub fn ival(self, store: &Store) -> i64 {
        store.get_int(self.0, ItemId::Ival)
    }

    /// Sets the value of an integer literal.
    pub fn set_ival(self, store: &mut Store, value: i64) {
        store.set_int(self.0, ItemId::Ival, value);
    }

    /// Returns the value of a real literal.
    pub fn dval(self, store: &Store) -> f64 {
        store.get_double(self.0, ItemId::Dval)
    }

    /// Sets the value of a real literal.
    pub fn set_dval(self, store: &mut Store, value: f64) {
        store.set_double(self.0, ItemId::Dval, value);
    }

    /// Returns the position within the parent list.
    pub fn pos(self, store: &Store) -> u32 {
        let raw = store.get_int(self.0, ItemId::Pos);
        match u32::try_from(raw) {
            Ok(pos) => pos,
            Err(_) => store.fail(format_args!("tree {} has invalid position {raw}", self.0)),
        }
    }

    /// Sets the position within the parent list.
    pub fn set_pos(self, store: &mut Store, pos: u32) {
        store.set_int(self.0, ItemId::Pos, i64::from(pos));
    }

    /// Returns the entity class.
    pub fn class(self, store: &Store) -> EntityClass {
        let raw = store.get_int(self.0, ItemId::Class);
        match EntityClass::from_raw(raw) {
            Some(class) => class,
            None => store.fail(format_args!("tree {} has invalid entity class {raw}", self.0)),
        }
    }

    /// Sets the entity class.
    pub fn set_class(self, store: &mut Store, class: EntityClass) {
        store.set_int(self.0, ItemId::Class, class.as_raw());
    }

    /// Returns the flag bits; unset flags read as empty.
    pub fn flags(self, store: &Store) -> TreeFlags {
        TreeFlags::from_bits(store.get_int(self.0, ItemId::Flags))
    }

    /// Sets every bit of `flags`.
    pub fn set_flag(self, store: &mut Store, flags: TreeFlags) {
        let bits = self.flags(store) | flags;
        store.set_int(self.0, ItemId::Flags, bits.bits());
    }

    /// Clears every bit of `flags`.
    pub fn clear_flag(self, store: &mut Store, flags: TreeFlags) {
        let bits = self.flags(store).bits() & !flags.bits();
        store.set_int(self.0, ItemId::Flags, bits);
    }

    // Traversal

    /// Calls `f` on every tree reachable from this one in postorder and
    /// returns the number of calls. `ref` and `type` links are not followed.
    pub fn visit(self, store: &Store, mut f: impl FnMut(&Store, Tree)) -> usize {
        Visit::new(store)
            .only(TREE_TAG, None)
            .run(self.0, &mut |s: &Store, id: ObjectId| f(s, Tree(id)))
    }

    /// Like [`visit`](Self::visit), but only calls `f` on trees of `kind`.
    pub fn visit_only(self, store: &Store, kind: TreeKind, mut f: impl FnMut(&Store, Tree)) -> usize {
        Visit::new(store)
            .only(TREE_TAG, Some(kind.as_raw()))
            .run(self.0, &mut |s: &Store, id: ObjectId| f(s, Tree(id)))
    }

    /// Like [`visit`](Self::visit), but also follows `ref` and `type` links.
    pub fn visit_deep(self, store: &Store, mut f: impl FnMut(&Store, Tree)) -> usize {
        Visit::new(store)
            .only(TREE_TAG, None)
            .deep()
            .run(self.0, &mut |s: &Store, id: ObjectId| f(s, Tree(id)))
    }

    /// Visits with a pre-order callback that may decline to descend into a
    /// node by returning `false`.
    pub fn visit_pruned(
        self,
        store: &Store,
        mut pre: impl FnMut(&Store, Tree) -> bool,
        mut post: impl FnMut(&Store, Tree),
    ) -> usize {
        let mut visitor = FnVisitor {
            pre: |s: &Store, id: ObjectId| pre(s, Tree(id)),
            post: |s: &Store, id: ObjectId| post(s, Tree(id)),
        };
        Visit::new(store).only(TREE_TAG, None).run(self.0, &mut visitor)
    }

    /// Rewrites the trees below this one bottom-up. `f` returns the node
    /// itself, a replacement, or `None` to delete it.
    pub fn rewrite(self, store: &mut Store, f: impl FnMut(&mut Store, Tree) -> Option<Tree>) -> Option<Tree> {
        self.rewrite_with(store, |_, t| Some(t), f)
    }

    /// Rewrites with both a pre-order and a post-order transform. A `pre`
    /// result other than the node itself is used without descending.
    pub fn rewrite_with(
        self,
        store: &mut Store,
        mut pre: impl FnMut(&mut Store, Tree) -> Option<Tree>,
        mut post: impl FnMut(&mut Store, Tree) -> Option<Tree>,
    ) -> Option<Tree> {
        Rewrite::new(TREE_TAG)
            .pre(|s: &mut Store, id: ObjectId| pre(s, Tree(id)).map(Tree::id))
            .post(|s: &mut Store, id: ObjectId| post(s, Tree(id)).map(Tree::id))
            .run(store, self.0)
            .map(Tree)
    }

    /// Deep-copies the graph below this tree, cloning the trees selected by
    /// `pred` and everything that leads to them. `tree_copied` and
    /// `type_copied` receive each `(original, clone)` pair.
    pub fn copy(
        self,
        store: &mut Store,
        mut pred: impl FnMut(&Store, Tree) -> bool,
        mut tree_copied: impl FnMut(&mut Store, Tree, Tree),
        mut type_copied: impl FnMut(&mut Store, Type, Type),
    ) -> Tree {
        let root = DeepCopy::new()
            .clone_if(TREE_TAG, |s: &Store, id: ObjectId| pred(s, Tree(id)))
            .on_copy(TREE_TAG, |s: &mut Store, from: ObjectId, to: ObjectId| {
                tree_copied(s, Tree(from), Tree(to))
            })
            .on_copy(TYPE_TAG, |s: &mut Store, from: ObjectId, to: ObjectId| {
                type_copied(s, Type(from), Type(to))
            })
            .run(store, self.0);
        Tree(root)
    }

    // Persistence

    /// Freezes this tree's arena and writes it as a unit.
    pub fn write<W: Write + ?Sized>(self, store: &mut Store, sink: &mut W) -> Result<(), CodecError> {
        codec::write(store, self.0, sink)
    }

    /// Reads a unit whose root must be a tree.
    pub fn read<R: Read + ?Sized>(
        store: &mut Store,
        source: &mut R,
        resolver: &mut dyn DependencyResolver,
    ) -> Result<Tree, CodecError> {
        let id = codec::read(store, source, resolver)?;
        Tree::from_id(store, id).ok_or_else(|| CodecError::TagMismatch {
            expected: "tree".to_string(),
            actual: store.class(store.tag(id)).name.to_string(),
        })
    }

    /// Calls `f` with the key of every unit this tree's arena depends on.
    pub fn walk_deps(self, store: &Store, f: impl FnMut(&str)) {
        store.walk_deps(self.0.arena, f);
    }
}
