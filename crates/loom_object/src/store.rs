//! The allocation context: arenas, the open/freeze lifecycle, schema-checked
//! item access, write barriers and the reachability sweep.
//!
//! A [`Store`] replaces process-wide "current arena" state with an explicit
//! value. At most one arena is open at a time; opening another freezes the
//! previous one. Every item access is checked against the class schema of the
//! object's *current* kind, and every mutation is checked against the arena
//! lifecycle. Violations are contract defects and abort through
//! [`contract_violation`](crate::fatal::contract_violation).

use crate::arena::Arena;
use crate::class::{ClassRegistry, Kind, ObjectClass};
use crate::fatal::contract_violation;
use crate::ids::{ArenaId, ClassTag, Generation, ObjectId};
use crate::item::{Item, ItemId, Storage};
use crate::object::Object;
use crate::trace::TraceRing;
use loom_common::{ContentHash, Ident, Interner, Loc};
use loom_config::LoomConfig;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Key prefix of arenas that have no named root.
const ANONYMOUS_KEY: &str = "anon";

/// Tunables for a [`Store`], normally taken from `loom.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Object slots reserved when an arena is opened.
    pub capacity_hint: usize,
    /// Run [`Store::collect`] when an arena is frozen.
    pub sweep_on_freeze: bool,
    /// Verify payload checksums when reading units.
    pub verify_checksums: bool,
    /// Number of recently touched objects named in contract violations.
    pub trace_depth: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from(&LoomConfig::default())
    }
}

impl From<&LoomConfig> for StoreOptions {
    fn from(config: &LoomConfig) -> Self {
        Self {
            capacity_hint: config.arena.capacity_hint,
            sweep_on_freeze: config.gc.sweep_on_freeze,
            verify_checksums: config.codec.verify_checksums,
            trace_depth: config.trace.depth,
        }
    }
}

/// Owns every arena and object, plus the identifier interner.
pub struct Store {
    registry: ClassRegistry,
    arenas: Vec<Arena>,
    current: Option<ArenaId>,
    generation: Cell<Generation>,
    interner: Interner,
    trace: TraceRing,
    options: StoreOptions,
}

impl Store {
    /// Creates a store over `registry` with default options.
    pub fn new(registry: ClassRegistry) -> Self {
        Self::with_options(registry, StoreOptions::default())
    }

    /// Creates a store configured from a loaded `loom.toml`.
    pub fn with_config(registry: ClassRegistry, config: &LoomConfig) -> Self {
        Self::with_options(registry, StoreOptions::from(config))
    }

    /// Creates a store with explicit options.
    pub fn with_options(registry: ClassRegistry, options: StoreOptions) -> Self {
        Self {
            registry,
            arenas: Vec::new(),
            current: None,
            generation: Cell::new(Generation::from_raw(0)),
            interner: Interner::new(),
            trace: TraceRing::new(options.trace_depth),
            options,
        }
    }

    /// Returns the options this store was created with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Returns the class registry.
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Returns the class registered under `tag`.
    pub fn class(&self, tag: ClassTag) -> &'static ObjectClass {
        match self.registry.get(tag) {
            Some(class) => class,
            None => self.fail(format_args!("unknown class tag {}", tag.as_raw())),
        }
    }

    /// Returns the identifier interner.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Interns `name`.
    pub fn intern(&self, name: &str) -> Ident {
        self.interner.get_or_intern(name)
    }

    /// Resolves an identifier produced by this store.
    pub fn ident_str(&self, ident: Ident) -> &str {
        self.interner.resolve(ident)
    }

    // -- arena lifecycle --------------------------------------------------

    /// Opens a new arena for allocation, freezing the current one first.
    pub fn open_arena(&mut self) -> ArenaId {
        self.open_arena_with_capacity(self.options.capacity_hint)
    }

    /// Like [`open_arena`](Self::open_arena) with an explicit capacity hint.
    pub fn open_arena_with_capacity(&mut self, capacity: usize) -> ArenaId {
        if let Some(previous) = self.current {
            self.freeze(previous);
        }
        let id = self.next_arena_id();
        self.arenas.push(Arena::new(id, capacity));
        self.current = Some(id);
        id
    }

    /// Returns the arena currently open for allocation.
    pub fn current_arena(&self) -> Option<ArenaId> {
        self.current
    }

    /// Makes `arena` immutable. Freezing a frozen arena does nothing.
    ///
    /// If `sweep_on_freeze` is set, unreachable objects are reclaimed first.
    /// The survivors are then numbered and the arena is keyed by its first
    /// root object, as refined by the class's unit key rules. An arena
    /// without a named root is keyed by the hash of its contents.
    pub fn freeze(&mut self, arena: ArenaId) {
        if self.arena(arena).is_frozen() {
            return;
        }
        if self.options.sweep_on_freeze {
            self.collect(arena);
        }
        let root = self.first_root(arena);
        let key = root.and_then(|index| self.unit_key(ObjectId::new(arena, index)));
        match key {
            Some(key) => self.arena_mut(arena).seal(key, root),
            None => {
                self.arena_mut(arena).seal(ANONYMOUS_KEY.to_string(), root);
                let hash = match crate::codec::encode_payload(self, arena) {
                    Ok(payload) => ContentHash::from_bytes(&payload),
                    Err(err) => self.fail(format_args!("cannot key arena {arena}: {err}")),
                };
                self.arena_mut(arena).rekey(format!("{ANONYMOUS_KEY}-{hash}"));
            }
        }
        if self.current == Some(arena) {
            self.current = None;
        }
    }

    /// Names the unit rooted at `root`: its identifier, prefixed by the
    /// rule's qualifier and followed by the rule's suffix.
    fn unit_key(&self, root: ObjectId) -> Option<String> {
        let object = self.arena(root.arena).get(root.index)?;
        let name = |item: ItemId| match object.item(item) {
            Some(Item::Ident(Some(ident))) => Some(self.ident_str(*ident)),
            _ => None,
        };
        let mut key = name(ItemId::Ident)?.to_string();
        if let Some(rule) = self.class(object.tag()).unit_key(object.kind()) {
            if let Some(primary) = rule.qualifier.and_then(name) {
                key = format!("{primary}-{key}");
            }
            if let Some(suffix) = rule.suffix {
                key.push('-');
                key.push_str(suffix);
            }
        }
        Some(key)
    }

    /// Returns the arena `id`.
    pub fn arena(&self, id: ArenaId) -> &Arena {
        match self.arenas.get(id.as_raw() as usize) {
            Some(arena) => arena,
            None => self.fail(format_args!("arena {id} does not exist")),
        }
    }

    pub(crate) fn arena_mut(&mut self, id: ArenaId) -> &mut Arena {
        if self.arenas.len() <= id.as_raw() as usize {
            self.fail(format_args!("arena {id} does not exist"));
        }
        &mut self.arenas[id.as_raw() as usize]
    }

    /// Iterates over every arena, oldest first.
    pub fn arenas(&self) -> impl Iterator<Item = &Arena> {
        self.arenas.iter()
    }

    /// Returns `true` if `arena` has been frozen.
    pub fn is_frozen(&self, arena: ArenaId) -> bool {
        self.arena(arena).is_frozen()
    }

    /// Returns `true` if `id` names an object that exists and was not
    /// reclaimed.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.arenas
            .get(id.arena.as_raw() as usize)
            .and_then(|arena| arena.get(id.index))
            .is_some()
    }

    /// Finds the most recent frozen arena keyed `key`.
    pub fn arena_by_key(&self, key: &str) -> Option<ArenaId> {
        self.arenas
            .iter()
            .rev()
            .find(|arena| arena.key() == Some(key))
            .map(Arena::id)
    }

    pub(crate) fn next_arena_id(&self) -> ArenaId {
        match u32::try_from(self.arenas.len()) {
            Ok(raw) => ArenaId::from_raw(raw),
            Err(_) => self.fail(format_args!("too many arenas")),
        }
    }

    /// Installs an arena built outside the allocation context (by the codec).
    pub(crate) fn adopt_arena(&mut self, arena: Arena) -> ArenaId {
        let id = arena.id();
        debug_assert_eq!(id, self.next_arena_id());
        self.arenas.push(arena);
        id
    }

    // -- allocation and identity -------------------------------------------

    /// Allocates an object of `kind` in the open arena.
    pub fn alloc(&mut self, tag: ClassTag, kind: Kind) -> ObjectId {
        let class = self.class(tag);
        if !class.is_valid_kind(kind) {
            self.fail(format_args!("{} kind {kind} is out of range", class.name));
        }
        self.alloc_object(Object::new(tag, kind))
    }

    pub(crate) fn alloc_object(&mut self, object: Object) -> ObjectId {
        let Some(arena) = self.current else {
            self.fail(format_args!(
                "cannot allocate {}: no arena is open",
                self.class(object.tag()).kind_name(object.kind())
            ));
        };
        let (tag, kind) = (object.tag(), object.kind());
        let index = self.arena_mut(arena).push(object);
        let id = ObjectId::new(arena, index);
        self.trace.record(id, tag, kind);
        id
    }

    /// Returns the object `id`.
    pub fn get(&self, id: ObjectId) -> &Object {
        match self
            .arenas
            .get(id.arena.as_raw() as usize)
            .and_then(|arena| arena.get(id.index))
        {
            Some(object) => object,
            None => self.fail(format_args!("object {id} does not exist or was reclaimed")),
        }
    }

    /// Returns the class tag of `id`.
    pub fn tag(&self, id: ObjectId) -> ClassTag {
        self.get(id).tag()
    }

    /// Returns the current kind of `id`.
    pub fn kind(&self, id: ObjectId) -> Kind {
        self.get(id).kind()
    }

    /// Returns the display name of the current kind of `id`.
    pub fn kind_name(&self, id: ObjectId) -> &'static str {
        let object = self.get(id);
        self.class(object.tag()).kind_name(object.kind())
    }

    /// Returns the source location of `id`.
    pub fn loc(&self, id: ObjectId) -> Loc {
        *self.get(id).loc()
    }

    /// Sets the source location of `id`.
    pub fn set_loc(&mut self, id: ObjectId, loc: Loc) {
        self.object_mut(id).set_loc(loc);
    }

    /// Changes the kind of `id` in place.
    ///
    /// The `(from, to)` pair must be declared in the class retag table.
    /// Items outside the new kind's schema are dropped; items new to it are
    /// unset until written. Identity is preserved, so every existing
    /// reference observes the new kind.
    pub fn change_kind(&mut self, id: ObjectId, kind: Kind) {
        let object = self.get(id);
        let class = self.class(object.tag());
        let from = object.kind();
        if from == kind {
            return;
        }
        if !class.retag_allowed(from, kind) {
            self.fail(format_args!(
                "cannot change {} kind {} to {}",
                class.name,
                class.kind_name(from),
                class.kind_name(kind)
            ));
        }
        let object = self.object_mut(id);
        object.set_kind(kind);
        object.retain(class.slots_for(kind));
    }

    // -- item access -------------------------------------------------------

    /// Returns `true` if `item` is in the schema of `id` and holds a value:
    /// a set identifier or reference, a written scalar, or a non-empty array.
    pub fn has(&self, id: ObjectId, item: ItemId) -> bool {
        match self.slot(id, item, item.storage()) {
            None => false,
            Some(Item::Ident(ident)) => ident.is_some(),
            Some(Item::Object(object)) => object.is_some(),
            Some(Item::Array(array)) => !array.is_empty(),
            Some(Item::Int(_) | Item::Double(_)) => true,
        }
    }

    /// Returns the identifier in `item`, which must be set.
    pub fn get_ident(&self, id: ObjectId, item: ItemId) -> Ident {
        match self.get_ident_opt(id, item) {
            Some(ident) => ident,
            None => self.fail(format_args!(
                "{} {id} item {} is not set",
                self.kind_name(id),
                item.name()
            )),
        }
    }

    /// Returns the identifier in `item`, if set.
    pub fn get_ident_opt(&self, id: ObjectId, item: ItemId) -> Option<Ident> {
        match self.slot(id, item, Storage::Ident) {
            Some(Item::Ident(ident)) => *ident,
            _ => None,
        }
    }

    /// Writes an identifier item.
    pub fn set_ident(&mut self, id: ObjectId, item: ItemId, ident: Ident) {
        *self.slot_mut(id, item, Storage::Ident) = Item::Ident(Some(ident));
    }

    /// Returns an integer item, zero if never written.
    pub fn get_int(&self, id: ObjectId, item: ItemId) -> i64 {
        match self.slot(id, item, Storage::Int) {
            Some(Item::Int(value)) => *value,
            _ => 0,
        }
    }

    /// Writes an integer item.
    pub fn set_int(&mut self, id: ObjectId, item: ItemId, value: i64) {
        *self.slot_mut(id, item, Storage::Int) = Item::Int(value);
    }

    /// Returns a double item, zero if never written.
    pub fn get_double(&self, id: ObjectId, item: ItemId) -> f64 {
        match self.slot(id, item, Storage::Double) {
            Some(Item::Double(value)) => *value,
            _ => 0.0,
        }
    }

    /// Writes a double item.
    pub fn set_double(&mut self, id: ObjectId, item: ItemId, value: f64) {
        *self.slot_mut(id, item, Storage::Double) = Item::Double(value);
    }

    /// Returns the object referenced by `item`, which must be set.
    ///
    /// Reading an unset mandatory item means construction of `id` is
    /// incomplete; reading an unset optional item means the caller skipped
    /// the [`has`](Self::has) probe. Both are contract violations, reported
    /// differently.
    pub fn get_object(&self, id: ObjectId, item: ItemId) -> ObjectId {
        match self.get_object_opt(id, item) {
            Some(target) => target,
            None => {
                let object = self.get(id);
                let class = self.class(object.tag());
                let kind = class.kind_name(object.kind());
                if class.is_optional(item) {
                    self.fail(format_args!(
                        "optional item {} of {kind} {id} is absent",
                        item.name()
                    ))
                } else {
                    self.fail(format_args!(
                        "mandatory item {} of {kind} {id} is unset",
                        item.name()
                    ))
                }
            }
        }
    }

    /// Returns the object referenced by `item`, if set.
    pub fn get_object_opt(&self, id: ObjectId, item: ItemId) -> Option<ObjectId> {
        match self.slot(id, item, Storage::Object) {
            Some(Item::Object(target)) => *target,
            _ => None,
        }
    }

    /// Writes or clears a reference item, recording the dependency if the
    /// target lives in another arena.
    pub fn set_object(&mut self, id: ObjectId, item: ItemId, target: Option<ObjectId>) {
        if let Some(target) = target {
            self.get(target);
        }
        *self.slot_mut(id, item, Storage::Object) = Item::Object(target);
        if let Some(target) = target {
            self.write_barrier(id, target);
        }
    }

    /// Returns the elements of an array item; empty if never written.
    pub fn get_array(&self, id: ObjectId, item: ItemId) -> &[ObjectId] {
        match self.slot(id, item, Storage::Array) {
            Some(Item::Array(array)) => array,
            _ => &[],
        }
    }

    /// Returns the number of elements in an array item.
    pub fn array_len(&self, id: ObjectId, item: ItemId) -> usize {
        self.get_array(id, item).len()
    }

    /// Returns element `n` of an array item.
    pub fn array_nth(&self, id: ObjectId, item: ItemId, n: usize) -> ObjectId {
        let array = self.get_array(id, item);
        match array.get(n) {
            Some(target) => *target,
            None => self.fail(format_args!(
                "index {n} out of range for {} of {} {id} with {} elements",
                item.name(),
                self.kind_name(id),
                array.len()
            )),
        }
    }

    /// Appends to an array item.
    pub fn push_array(&mut self, id: ObjectId, item: ItemId, target: ObjectId) {
        self.get(target);
        if let Item::Array(array) = self.slot_mut(id, item, Storage::Array) {
            array.push(target);
        }
        self.write_barrier(id, target);
    }

    /// Inserts into an array item at `pos`, shifting later elements up.
    pub fn insert_array(&mut self, id: ObjectId, item: ItemId, pos: usize, target: ObjectId) {
        self.get(target);
        let len = self.array_len(id, item);
        if pos > len {
            self.fail(format_args!(
                "cannot insert at {pos} into {} of {} {id} with {len} elements",
                item.name(),
                self.kind_name(id)
            ));
        }
        if let Item::Array(array) = self.slot_mut(id, item, Storage::Array) {
            array.insert(pos, target);
        }
        self.write_barrier(id, target);
    }

    /// Keeps only the first `len` elements of an array item.
    pub fn truncate_array(&mut self, id: ObjectId, item: ItemId, len: usize) {
        if let Item::Array(array) = self.slot_mut(id, item, Storage::Array) {
            array.truncate(len);
        }
    }

    /// Replaces an array item wholesale.
    pub(crate) fn replace_array(&mut self, id: ObjectId, item: ItemId, targets: Vec<ObjectId>) {
        let foreign: Vec<ObjectId> = targets
            .iter()
            .copied()
            .filter(|t| t.arena != id.arena)
            .collect();
        *self.slot_mut(id, item, Storage::Array) = Item::Array(targets);
        for target in foreign {
            self.write_barrier(id, target);
        }
    }

    /// Rewrites every reference held by `id` through `map`, recording
    /// dependencies on any arenas the new targets live in.
    pub(crate) fn relink(&mut self, id: ObjectId, map: impl FnMut(ObjectId) -> ObjectId) {
        let object = self.object_mut(id);
        object.remap_links(map);
        let foreign: BTreeSet<ArenaId> = object
            .links(0)
            .map(|(_, link)| link.arena)
            .filter(|arena| *arena != id.arena)
            .collect();
        let arena = self.arena_mut(id.arena);
        for dep in foreign {
            arena.add_dep(dep);
        }
    }

    fn slot(&self, id: ObjectId, item: ItemId, storage: Storage) -> Option<&Item> {
        let object = self.get(id);
        self.check_schema(object, item, storage);
        object.item(item)
    }

    fn slot_mut(&mut self, id: ObjectId, item: ItemId, storage: Storage) -> &mut Item {
        self.check_schema(self.get(id), item, storage);
        self.object_mut(id).item_mut(item)
    }

    fn check_schema(&self, object: &Object, item: ItemId, storage: Storage) {
        let class = self.class(object.tag());
        if !class.has_item(object.kind(), item) {
            self.fail(format_args!(
                "{} does not have item {}",
                class.kind_name(object.kind()),
                item.name()
            ));
        }
        if item.storage() != storage {
            self.fail(format_args!(
                "item {} stores {:?} values, accessed as {:?}",
                item.name(),
                item.storage(),
                storage
            ));
        }
    }

    /// Returns `id` for mutation after checking its arena is open.
    fn object_mut(&mut self, id: ObjectId) -> &mut Object {
        let object = self.get(id);
        let (tag, kind) = (object.tag(), object.kind());
        if self.arena(id.arena).is_frozen() {
            self.fail(format_args!(
                "cannot modify {} {id}: arena {} is frozen",
                self.class(tag).kind_name(kind),
                id.arena
            ));
        }
        self.trace.record(id, tag, kind);
        match self.arenas[id.arena.as_raw() as usize].get_mut(id.index) {
            Some(object) => object,
            None => unreachable!("object {id} was checked above"),
        }
    }

    /// Records that the arena of `owner` depends on the arena of `target`.
    fn write_barrier(&mut self, owner: ObjectId, target: ObjectId) {
        if owner.arena != target.arena {
            self.arena_mut(owner.arena).add_dep(target.arena);
        }
    }

    // -- reachability ------------------------------------------------------

    fn first_root(&self, arena: ArenaId) -> Option<u32> {
        self.arena(arena)
            .iter()
            .find(|(_, object)| self.class(object.tag()).is_root(object.kind()))
            .map(|(index, _)| index)
    }

    /// Reclaims every object of the open `arena` that is not reachable from
    /// one of its root-kind objects, then recomputes the arena's
    /// dependencies from the survivors. Returns the number reclaimed.
    ///
    /// An arena with no root-kind object is left untouched.
    pub fn collect(&mut self, arena: ArenaId) -> usize {
        let target = self.arena(arena);
        if target.is_frozen() {
            self.fail(format_args!("cannot sweep frozen arena {arena}"));
        }

        let mut pending: Vec<u32> = target
            .iter()
            .filter(|(_, object)| self.class(object.tag()).is_root(object.kind()))
            .map(|(index, _)| index)
            .collect();
        if pending.is_empty() {
            return 0;
        }

        let mut live = vec![false; target.len()];
        while let Some(index) = pending.pop() {
            if std::mem::replace(&mut live[index as usize], true) {
                continue;
            }
            if let Some(object) = target.get(index) {
                for (_, link) in object.links(0) {
                    if link.arena == arena && !live[link.index as usize] {
                        pending.push(link.index);
                    }
                }
            }
        }

        let mut deps = BTreeSet::new();
        for (index, object) in target.iter() {
            if live[index as usize] {
                deps.extend(
                    object
                        .links(0)
                        .map(|(_, link)| link.arena)
                        .filter(|dep| *dep != arena),
                );
            }
        }

        let target = self.arena_mut(arena);
        let reclaimed = target.reclaim(&live);
        target.set_deps(deps);
        reclaimed
    }

    /// Calls `f` with the key of every arena `arena` depends on.
    pub fn walk_deps(&self, arena: ArenaId, mut f: impl FnMut(&str)) {
        for dep in self.arena(arena).deps() {
            if let Some(key) = self.arena(dep).key() {
                f(key);
            }
        }
    }

    /// Returns the object that stands for a frozen arena as a unit: its
    /// designated root, or its first live object if it has none.
    pub fn unit_root(&self, arena: ArenaId) -> Option<ObjectId> {
        let unit = self.arena(arena);
        let index = unit.root().or_else(|| unit.iter().next().map(|(index, _)| index))?;
        Some(ObjectId::new(arena, index))
    }

    /// Returns `arena` and everything it transitively depends on, with every
    /// arena listed after all of its dependencies.
    pub fn dependency_order(&self, arena: ArenaId) -> Vec<ArenaId> {
        let mut graph: DiGraph<ArenaId, ()> = DiGraph::new();
        let mut nodes: HashMap<ArenaId, NodeIndex> = HashMap::new();
        let mut pending = vec![arena];
        nodes.insert(arena, graph.add_node(arena));
        while let Some(current) = pending.pop() {
            let from = nodes[&current];
            for dep in self.arena(current).deps() {
                let to = *nodes.entry(dep).or_insert_with(|| {
                    pending.push(dep);
                    graph.add_node(dep)
                });
                graph.add_edge(to, from, ());
            }
        }
        match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|node| graph[node]).collect(),
            Err(cycle) => self.fail(format_args!(
                "arena dependency cycle through {}",
                graph[cycle.node_id()]
            )),
        }
    }

    // -- traversal support and diagnostics ---------------------------------

    /// Hands out a fresh generation stamp for one traversal call.
    ///
    /// Each visit, rewrite and copy takes one stamp, so callbacks can tell
    /// calls apart through [`generation`](Self::generation). The
    /// visited-once bookkeeping of a traversal is a table local to the call
    /// and never consults the stamp.
    pub fn next_generation(&self) -> Generation {
        let next = self.generation.get().next();
        self.generation.set(next);
        next
    }

    /// Returns the most recently issued generation stamp.
    pub fn generation(&self) -> Generation {
        self.generation.get()
    }

    /// Returns the most recently allocated or mutated objects, oldest first.
    pub fn recent_objects(&self) -> Vec<ObjectId> {
        self.trace.objects()
    }

    /// Raises a contract violation carrying the recent-object trace.
    pub fn fail(&self, message: fmt::Arguments<'_>) -> ! {
        contract_violation(message, &self.trace.render(&self.registry))
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("arenas", &self.arenas.len())
            .field("current", &self.current)
            .field("generation", &self.generation.get())
            .field("interner", &self.interner)
            .finish()
    }
}
