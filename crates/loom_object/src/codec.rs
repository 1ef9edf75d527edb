//! Reading and writing units.
//!
//! Writing freezes the open arena and serializes the whole frozen arena that
//! owns the root: every live object once, in ordinal order. References into
//! other arenas become `(dependency, ordinal)` pairs, and each dependency is
//! recorded with the checksum of its own payload. Reading validates the
//! frame, resolves the dependencies through a [`DependencyResolver`], checks
//! every object against the class schemas and only then installs the unit
//! as a new frozen arena.

use crate::arena::Arena;
use crate::error::CodecError;
use crate::ids::{ArenaId, ClassTag, ObjectId};
use crate::image::{
    DepRecord, UnitHeader, UnitImage, WireItem, WireLoc, WireObject, WireRef, WireTarget, UNIT_MAGIC,
};
use crate::item::{Item, ItemId, Storage};
use crate::object::Object;
use crate::resolve::DependencyResolver;
use crate::store::Store;
use loom_common::{ContentHash, Ident, Loc};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Current unit format version. Increment on breaking changes to the header
/// or payload format.
pub const FORMAT_VERSION: u32 = 1;

fn config() -> bincode::config::Configuration {
    bincode::config::standard()
}

fn serialization(e: impl std::fmt::Display) -> CodecError {
    CodecError::Serialization {
        reason: e.to_string(),
    }
}

/// Writes the unit containing `root` to `sink`.
///
/// The open arena is frozen first, and so is the root's arena. Writing a
/// root that the freeze-time sweep reclaimed is a contract violation.
pub fn write<W: Write + ?Sized>(store: &mut Store, root: ObjectId, sink: &mut W) -> Result<(), CodecError> {
    if let Some(current) = store.current_arena() {
        store.freeze(current);
    }
    store.freeze(root.arena);

    let Some(root_ordinal) = store.arena(root.arena).ordinal(root.index) else {
        store.fail(format_args!(
            "cannot write {root}: it was reclaimed when arena {} was frozen",
            root.arena
        ));
    };

    let payload = encode_payload(store, root.arena)?;
    let checksum = ContentHash::from_bytes(&payload);
    let _ = store.arena(root.arena).checksum_cell().set(checksum);

    let header = UnitHeader {
        magic: UNIT_MAGIC,
        format_version: FORMAT_VERSION,
        root: root_ordinal,
        checksum,
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, config()).map_err(serialization)?;

    // 4-byte header length (little-endian) + header + payload
    let header_len = header_bytes.len() as u32;
    sink.write_all(&header_len.to_le_bytes())
        .map_err(CodecError::stream)?;
    sink.write_all(&header_bytes).map_err(CodecError::stream)?;
    sink.write_all(&payload).map_err(CodecError::stream)
}

/// Reads a unit from `source` into a new frozen arena and returns its root.
///
/// The arena currently open for allocation, if any, stays open.
pub fn read<R: Read + ?Sized>(
    store: &mut Store,
    source: &mut R,
    resolver: &mut dyn DependencyResolver,
) -> Result<ObjectId, CodecError> {
    let mut raw = Vec::new();
    source.read_to_end(&mut raw).map_err(CodecError::stream)?;
    let (header, payload) = split_frame(&raw)?;

    let checksum = if store.options().verify_checksums {
        let actual = ContentHash::from_bytes(payload);
        if actual != header.checksum {
            return Err(CodecError::ChecksumMismatch {
                expected: header.checksum.to_string(),
                actual: actual.to_string(),
            });
        }
        actual
    } else {
        header.checksum
    };

    let (image, _): (UnitImage, usize) =
        bincode::serde::decode_from_slice(payload, config()).map_err(serialization)?;
    install(store, image, header.root, checksum, resolver)
}

/// Returns the payload checksum of a frozen arena, encoding it if it was
/// built in this process and never written.
pub fn arena_checksum(store: &Store, arena: ArenaId) -> Result<ContentHash, CodecError> {
    if let Some(checksum) = store.arena(arena).checksum_cell().get() {
        return Ok(*checksum);
    }
    let checksum = ContentHash::from_bytes(&encode_payload(store, arena)?);
    let _ = store.arena(arena).checksum_cell().set(checksum);
    Ok(checksum)
}

fn split_frame(raw: &[u8]) -> Result<(UnitHeader, &[u8]), CodecError> {
    let invalid = |reason: &str| CodecError::InvalidHeader {
        reason: reason.to_string(),
    };
    if raw.len() < 4 {
        return Err(invalid("unit is shorter than its length prefix"));
    }
    let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    if raw.len() - 4 < header_len {
        return Err(invalid("unit is shorter than its header"));
    }
    let (header, _): (UnitHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], config())
            .map_err(|e| invalid(&e.to_string()))?;
    if header.magic != UNIT_MAGIC {
        return Err(invalid("missing magic bytes"));
    }
    if header.format_version != FORMAT_VERSION {
        return Err(CodecError::VersionMismatch {
            expected: FORMAT_VERSION,
            actual: header.format_version,
        });
    }
    Ok((header, &raw[4 + header_len..]))
}

// -- encoding ---------------------------------------------------------------

pub(crate) fn encode_payload(store: &Store, arena: ArenaId) -> Result<Vec<u8>, CodecError> {
    let source = store.arena(arena);
    let Some(key) = source.key() else {
        store.fail(format_args!("cannot encode arena {arena} before it is frozen"));
    };
    let mut encoder = Encoder {
        store,
        arena,
        idents: Vec::new(),
        ident_index: HashMap::new(),
        deps: Vec::new(),
        dep_index: HashMap::new(),
    };
    let objects = source
        .iter()
        .map(|(_, object)| encoder.object(object))
        .collect::<Result<Vec<_>, _>>()?;
    let image = UnitImage {
        key: key.to_string(),
        idents: encoder.idents,
        deps: encoder.deps,
        objects,
    };
    bincode::serde::encode_to_vec(&image, config()).map_err(serialization)
}

struct Encoder<'s> {
    store: &'s Store,
    arena: ArenaId,
    idents: Vec<String>,
    ident_index: HashMap<Ident, u32>,
    deps: Vec<DepRecord>,
    dep_index: HashMap<ArenaId, u32>,
}

impl Encoder<'_> {
    fn ident(&mut self, ident: Ident) -> u32 {
        if let Some(index) = self.ident_index.get(&ident) {
            return *index;
        }
        let index = self.idents.len() as u32;
        self.idents.push(self.store.ident_str(ident).to_string());
        self.ident_index.insert(ident, index);
        index
    }

    fn reference(&mut self, target: ObjectId) -> Result<WireRef, CodecError> {
        let tag = self.store.tag(target).as_raw();
        let owner = self.store.arena(target.arena);
        let Some(ordinal) = owner.ordinal(target.index) else {
            self.store.fail(format_args!(
                "cannot encode reference to {target}: arena {} is not frozen",
                target.arena
            ));
        };
        if target.arena == self.arena {
            return Ok(WireRef {
                tag,
                target: WireTarget::Local(ordinal),
            });
        }
        let dep = match self.dep_index.get(&target.arena) {
            Some(dep) => *dep,
            None => {
                let dep = self.deps.len() as u32;
                self.deps.push(DepRecord {
                    key: owner.key().unwrap_or_default().to_string(),
                    checksum: arena_checksum(self.store, target.arena)?,
                });
                self.dep_index.insert(target.arena, dep);
                dep
            }
        };
        Ok(WireRef {
            tag,
            target: WireTarget::External { dep, ordinal },
        })
    }

    fn object(&mut self, object: &Object) -> Result<WireObject, CodecError> {
        let mut items = Vec::with_capacity(object.present().count_ones() as usize);
        for (id, item) in object.items() {
            let wire = match item {
                Item::Ident(ident) => WireItem::Ident(ident.map(|i| self.ident(i))),
                Item::Int(value) => WireItem::Int(*value),
                Item::Double(value) => WireItem::Double(*value),
                Item::Object(target) => {
                    WireItem::Object(target.map(|t| self.reference(t)).transpose()?)
                }
                Item::Array(targets) => WireItem::Array(
                    targets
                        .iter()
                        .map(|t| self.reference(*t))
                        .collect::<Result<_, _>>()?,
                ),
            };
            items.push((id.as_raw(), wire));
        }
        let loc = object.loc();
        Ok(WireObject {
            tag: object.tag().as_raw(),
            kind: object.kind(),
            loc: WireLoc {
                file: loc.file.map(|f| self.ident(f)),
                first_line: loc.first_line,
                first_column: loc.first_column,
                last_line: loc.last_line,
                last_column: loc.last_column,
            },
            items,
        })
    }
}

// -- decoding ---------------------------------------------------------------

fn install(
    store: &mut Store,
    image: UnitImage,
    root: u32,
    checksum: ContentHash,
    resolver: &mut dyn DependencyResolver,
) -> Result<ObjectId, CodecError> {
    let mut deps = Vec::with_capacity(image.deps.len());
    for dep in &image.deps {
        let arena = resolver.resolve(store, &dep.key)?;
        if !store.is_frozen(arena) {
            return Err(CodecError::UnresolvedDependency {
                key: dep.key.clone(),
                reason: "resolved to an arena that is still open".to_string(),
            });
        }
        let actual = arena_checksum(store, arena)?;
        if actual != dep.checksum {
            return Err(CodecError::DependencyChecksum {
                key: dep.key.clone(),
                expected: dep.checksum.to_string(),
                actual: actual.to_string(),
            });
        }
        deps.push(arena);
    }

    let count = image.objects.len();
    if root as usize >= count {
        return Err(CodecError::malformed(
            &image.key,
            format!("root ordinal {root} out of range for {count} objects"),
        ));
    }

    let idents: Vec<Ident> = image.idents.iter().map(|s| store.intern(s)).collect();
    let id = store.next_arena_id();
    let decoder = Decoder {
        store,
        image: &image,
        idents: &idents,
        deps: &deps,
        arena: id,
    };
    let mut arena = Arena::new(id, count);
    for (ordinal, wire) in image.objects.iter().enumerate() {
        arena.push(decoder.object(ordinal, wire)?);
    }
    arena.set_deps(deps.iter().copied().collect());
    arena.seal(image.key.clone(), Some(root));
    let _ = arena.checksum_cell().set(checksum);
    store.adopt_arena(arena);
    Ok(ObjectId::new(id, root))
}

struct Decoder<'a> {
    store: &'a Store,
    image: &'a UnitImage,
    idents: &'a [Ident],
    deps: &'a [ArenaId],
    arena: ArenaId,
}

impl Decoder<'_> {
    fn malformed(&self, reason: String) -> CodecError {
        CodecError::malformed(&self.image.key, reason)
    }

    fn class_name(&self, tag: u8) -> String {
        self.store
            .registry()
            .get(ClassTag::from_raw(tag))
            .map_or_else(|| format!("tag {tag}"), |class| class.name.to_string())
    }

    fn ident(&self, index: u32) -> Result<Ident, CodecError> {
        self.idents
            .get(index as usize)
            .copied()
            .ok_or_else(|| self.malformed(format!("identifier {index} out of range")))
    }

    fn reference(&self, wire: &WireRef) -> Result<ObjectId, CodecError> {
        let (target, actual) = match wire.target {
            WireTarget::Local(ordinal) => {
                let Some(object) = self.image.objects.get(ordinal as usize) else {
                    return Err(self.malformed(format!("reference to missing object {ordinal}")));
                };
                (ObjectId::new(self.arena, ordinal), object.tag)
            }
            WireTarget::External { dep, ordinal } => {
                let Some(arena) = self.deps.get(dep as usize).copied() else {
                    return Err(self.malformed(format!("reference to missing dependency {dep}")));
                };
                let Some(index) = self.store.arena(arena).index_of_ordinal(ordinal) else {
                    return Err(self.malformed(format!(
                        "reference to missing object {ordinal} of {}",
                        self.image.deps[dep as usize].key
                    )));
                };
                let target = ObjectId::new(arena, index);
                (target, self.store.tag(target).as_raw())
            }
        };
        if actual != wire.tag {
            return Err(CodecError::TagMismatch {
                expected: self.class_name(wire.tag),
                actual: self.class_name(actual),
            });
        }
        Ok(target)
    }

    fn object(&self, ordinal: usize, wire: &WireObject) -> Result<Object, CodecError> {
        let Some(class) = self.store.registry().get(ClassTag::from_raw(wire.tag)) else {
            return Err(self.malformed(format!(
                "object {ordinal} has unknown class tag {}",
                wire.tag
            )));
        };
        if !class.is_valid_kind(wire.kind) {
            return Err(self.malformed(format!(
                "object {ordinal} has unknown {} kind {}",
                class.name, wire.kind
            )));
        }
        let schema = class.slots_for(wire.kind);
        let kind_name = class.kind_name(wire.kind);

        let mut items = Vec::with_capacity(wire.items.len());
        let mut previous: Option<u8> = None;
        for (raw, value) in &wire.items {
            let Some(item) = ItemId::from_raw(*raw) else {
                return Err(self.malformed(format!("object {ordinal} has unknown item {raw}")));
            };
            if previous.is_some_and(|p| p >= *raw) {
                return Err(self.malformed(format!(
                    "object {ordinal} lists {} out of order",
                    item.name()
                )));
            }
            previous = Some(*raw);
            if schema & item.bit() == 0 {
                return Err(self.malformed(format!(
                    "object {ordinal}: {kind_name} does not have item {}",
                    item.name()
                )));
            }
            let decoded = match (item.storage(), value) {
                (Storage::Ident, WireItem::Ident(index)) => {
                    Item::Ident(index.map(|i| self.ident(i)).transpose()?)
                }
                (Storage::Int, WireItem::Int(v)) => Item::Int(*v),
                (Storage::Double, WireItem::Double(v)) => Item::Double(*v),
                (Storage::Object, WireItem::Object(r)) => {
                    Item::Object(r.as_ref().map(|r| self.reference(r)).transpose()?)
                }
                (Storage::Array, WireItem::Array(rs)) => Item::Array(
                    rs.iter()
                        .map(|r| self.reference(r))
                        .collect::<Result<_, _>>()?,
                ),
                (storage, _) => {
                    return Err(self.malformed(format!(
                        "object {ordinal}: item {} must hold {storage:?}",
                        item.name()
                    )))
                }
            };
            items.push((item, decoded));
        }

        let loc = Loc {
            file: wire.loc.file.map(|f| self.ident(f)).transpose()?,
            first_line: wire.loc.first_line,
            first_column: wire.loc.first_column,
            last_line: wire.loc.last_line,
            last_column: wire.loc.last_column,
        };
        Ok(Object::from_parts(
            ClassTag::from_raw(wire.tag),
            wire.kind,
            loc,
            items,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::tests::{registry, NodeKind, ShapeKind, NODE_TAG, SHAPE_TAG};
    use crate::resolve::LoadedOnly;
    use crate::store::StoreOptions;
    use std::fmt::Write as _;

    fn node(store: &mut Store, kind: NodeKind) -> ObjectId {
        store.alloc(NODE_TAG, kind.as_raw())
    }

    fn named_unit(store: &mut Store, name: &str) -> ObjectId {
        let unit = node(store, NodeKind::Unit);
        let ident = store.intern(name);
        store.set_ident(unit, ItemId::Ident, ident);
        unit
    }

    /// Renders the graph below `root` with objects numbered by first
    /// visit, so two isomorphic graphs render identically.
    fn render(store: &Store, root: ObjectId) -> String {
        fn go(store: &Store, id: ObjectId, seen: &mut HashMap<ObjectId, usize>, out: &mut String) {
            if let Some(n) = seen.get(&id) {
                let _ = write!(out, "#{n}");
                return;
            }
            let n = seen.len();
            seen.insert(id, n);
            let object = store.get(id);
            let _ = write!(out, "{}#{n}(", store.kind_name(id));
            for (item, value) in object.items() {
                let _ = write!(out, "{}=", item.name());
                match value {
                    Item::Ident(i) => {
                        let _ = write!(out, "{:?}", i.map(|i| store.ident_str(i).to_string()));
                    }
                    Item::Int(v) => {
                        let _ = write!(out, "{v}");
                    }
                    Item::Double(v) => {
                        let _ = write!(out, "{v}");
                    }
                    Item::Object(None) => out.push('-'),
                    Item::Object(Some(t)) => go(store, *t, seen, out),
                    Item::Array(ts) => {
                        out.push('[');
                        for t in ts {
                            go(store, *t, seen, out);
                            out.push(',');
                        }
                        out.push(']');
                    }
                }
                out.push(' ');
            }
            out.push(')');
        }
        let mut out = String::new();
        go(store, root, &mut HashMap::new(), &mut out);
        out
    }

    fn sample(store: &mut Store) -> ObjectId {
        store.open_arena();
        let unit = named_unit(store, "top");
        let file = store.intern("top.vhd");
        store.set_loc(unit, Loc::new(file, 1, 1, 9, 4));
        let a = node(store, NodeKind::Decl);
        let b = node(store, NodeKind::Decl);
        let x = node(store, NodeKind::Lit);
        let shape = store.alloc(SHAPE_TAG, ShapeKind::Scalar.as_raw());
        store.set_int(x, ItemId::Ival, 7);
        store.set_double(x, ItemId::Dval, 0.5);
        store.push_array(unit, ItemId::Decls, a);
        store.push_array(unit, ItemId::Decls, b);
        store.set_object(a, ItemId::Value, Some(x));
        store.set_object(b, ItemId::Value, Some(x));
        store.set_object(a, ItemId::Type, Some(shape));
        unit
    }

    fn frame(header: &UnitHeader, payload: &[u8]) -> Vec<u8> {
        let header_bytes = bincode::serde::encode_to_vec(header, config()).unwrap();
        let mut out = (header_bytes.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn roundtrip_preserves_structure_and_sharing() {
        let mut store = Store::new(registry());
        let root = sample(&mut store);
        let mut bytes = Vec::new();
        write(&mut store, root, &mut bytes).unwrap();

        let mut fresh = Store::new(registry());
        let loaded = read(&mut fresh, &mut bytes.as_slice(), &mut LoadedOnly).unwrap();
        assert_eq!(render(&store, root), render(&fresh, loaded));
        assert!(fresh.is_frozen(loaded.arena));
        assert_eq!(fresh.arena(loaded.arena).key(), Some("top"));

        let decls = fresh.get_array(loaded, ItemId::Decls);
        let xa = fresh.get_object(decls[0], ItemId::Value);
        let xb = fresh.get_object(decls[1], ItemId::Value);
        assert_eq!(xa, xb);
        let loc = fresh.loc(loaded);
        assert_eq!(loc.last_line, 9);
        assert_eq!(fresh.ident_str(loc.file.unwrap()), "top.vhd");
    }

    #[test]
    fn write_freezes_current_arena() {
        let mut store = Store::new(registry());
        let root = sample(&mut store);
        write(&mut store, root, &mut Vec::new()).unwrap();
        assert!(store.is_frozen(root.arena));
        assert_eq!(store.current_arena(), None);
    }

    #[test]
    fn read_leaves_open_arena_alone() {
        let mut store = Store::new(registry());
        let root = sample(&mut store);
        let mut bytes = Vec::new();
        write(&mut store, root, &mut bytes).unwrap();
        let work = store.open_arena();
        let loaded = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap();
        assert_ne!(loaded.arena, work);
        assert_eq!(store.current_arena(), Some(work));
    }

    #[test]
    fn external_references_resolve_through_dependencies() {
        let mut store = Store::new(registry());
        store.open_arena();
        let pkg = named_unit(&mut store, "pkg");
        let decl = node(&mut store, NodeKind::Decl);
        store.push_array(pkg, ItemId::Decls, decl);
        store.open_arena();
        let top = named_unit(&mut store, "top");
        let name = node(&mut store, NodeKind::Name);
        store.set_object(name, ItemId::Ref, Some(decl));
        let local = node(&mut store, NodeKind::Decl);
        store.push_array(top, ItemId::Decls, local);
        store.set_object(local, ItemId::Value, Some(name));

        let (mut pkg_bytes, mut top_bytes) = (Vec::new(), Vec::new());
        write(&mut store, pkg, &mut pkg_bytes).unwrap();
        write(&mut store, top, &mut top_bytes).unwrap();

        let mut fresh = Store::new(registry());
        let mut asked = Vec::new();
        let mut resolver = |store: &mut Store, key: &str| -> Result<ArenaId, CodecError> {
            asked.push(key.to_string());
            let root = read(store, &mut pkg_bytes.as_slice(), &mut LoadedOnly)?;
            Ok(root.arena)
        };
        let loaded = read(&mut fresh, &mut top_bytes.as_slice(), &mut resolver).unwrap();
        assert_eq!(asked, vec!["pkg".to_string()]);

        let pkg_arena = fresh.arena_by_key("pkg").unwrap();
        let local = fresh.array_nth(loaded, ItemId::Decls, 0);
        let name = fresh.get_object(local, ItemId::Value);
        let target = fresh.get_object(name, ItemId::Ref);
        assert_eq!(target.arena, pkg_arena);
        assert_eq!(fresh.kind(target), NodeKind::Decl.as_raw());
        assert_eq!(fresh.arena(loaded.arena).deps().collect::<Vec<_>>(), vec![pkg_arena]);
    }

    #[test]
    fn unresolved_dependency_is_an_error() {
        let mut store = Store::new(registry());
        store.open_arena();
        let pkg = named_unit(&mut store, "pkg");
        store.open_arena();
        let top = named_unit(&mut store, "top");
        store.push_array(top, ItemId::Decls, pkg);
        let mut bytes = Vec::new();
        write(&mut store, top, &mut bytes).unwrap();

        let mut fresh = Store::new(registry());
        let err = read(&mut fresh, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(matches!(err, CodecError::UnresolvedDependency { ref key, .. } if key == "pkg"));
    }

    #[test]
    fn changed_dependency_is_detected() {
        let build_pkg = |store: &mut Store, value: i64| {
            store.open_arena();
            let pkg = named_unit(store, "pkg");
            let decl = node(store, NodeKind::Decl);
            let lit = node(store, NodeKind::Lit);
            store.set_int(lit, ItemId::Ival, value);
            store.set_object(decl, ItemId::Value, Some(lit));
            store.push_array(pkg, ItemId::Decls, decl);
            pkg
        };

        let mut store = Store::new(registry());
        let pkg = build_pkg(&mut store, 1);
        store.open_arena();
        let top = named_unit(&mut store, "top");
        store.push_array(top, ItemId::Decls, pkg);
        let mut bytes = Vec::new();
        write(&mut store, top, &mut bytes).unwrap();

        let mut fresh = Store::new(registry());
        let other = build_pkg(&mut fresh, 2);
        fresh.freeze(other.arena);
        let err = read(&mut fresh, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(matches!(err, CodecError::DependencyChecksum { .. }), "{err}");
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut store = Store::new(registry());
        let root = sample(&mut store);
        let mut bytes = Vec::new();
        write(&mut store, root, &mut bytes).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(matches!(err, CodecError::ChecksumMismatch { .. }));
    }

    #[test]
    fn checksum_verification_can_be_disabled() {
        let mut store = Store::new(registry());
        let root = sample(&mut store);
        let mut bytes = Vec::new();
        write(&mut store, root, &mut bytes).unwrap();

        // Same payload under a header with a bogus checksum.
        let (header, payload) = split_frame(&bytes).unwrap();
        let tampered = frame(
            &UnitHeader {
                checksum: ContentHash::from_bytes(b"bogus"),
                ..header
            },
            payload,
        );
        let options = StoreOptions {
            verify_checksums: false,
            ..StoreOptions::default()
        };
        let mut lax = Store::with_options(registry(), options);
        assert!(read(&mut lax, &mut tampered.as_slice(), &mut LoadedOnly).is_ok());
        let mut strict = Store::new(registry());
        assert!(read(&mut strict, &mut tampered.as_slice(), &mut LoadedOnly).is_err());
    }

    #[test]
    fn bad_frames_are_rejected() {
        let mut store = Store::new(registry());
        let err = read(&mut store, &mut [1u8, 0].as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(matches!(err, CodecError::InvalidHeader { .. }));

        let err = read(&mut store, &mut [200u8, 0, 0, 0, 1].as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(matches!(err, CodecError::InvalidHeader { .. }));

        let header = UnitHeader {
            magic: *b"NOPE",
            format_version: FORMAT_VERSION,
            root: 0,
            checksum: ContentHash::from_bytes(b""),
        };
        let err = read(&mut store, &mut frame(&header, b"").as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(err.to_string().contains("missing magic bytes"));

        let header = UnitHeader {
            magic: UNIT_MAGIC,
            format_version: FORMAT_VERSION + 1,
            ..header
        };
        let err = read(&mut store, &mut frame(&header, b"").as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(matches!(err, CodecError::VersionMismatch { actual, .. } if actual == FORMAT_VERSION + 1));
    }

    fn image_with(objects: Vec<WireObject>) -> Vec<u8> {
        let image = UnitImage {
            key: "bad".to_string(),
            idents: vec!["x".to_string()],
            deps: Vec::new(),
            objects,
        };
        let payload = bincode::serde::encode_to_vec(&image, config()).unwrap();
        let header = UnitHeader {
            magic: UNIT_MAGIC,
            format_version: FORMAT_VERSION,
            root: 0,
            checksum: ContentHash::from_bytes(&payload),
        };
        frame(&header, &payload)
    }

    fn wire(tag: u8, kind: u16, items: Vec<(u8, WireItem)>) -> WireObject {
        WireObject {
            tag,
            kind,
            loc: WireLoc {
                file: None,
                first_line: 0,
                first_column: 0,
                last_line: 0,
                last_column: 0,
            },
            items,
        }
    }

    #[test]
    fn schema_violations_in_stream_are_malformed() {
        let mut store = Store::new(registry());
        let name = NodeKind::Name.as_raw();

        let bytes = image_with(vec![wire(0, name, vec![(ItemId::Value.as_raw(), WireItem::Object(None))])]);
        let err = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(err.to_string().contains("N_NAME does not have item I_VALUE"), "{err}");

        let bytes = image_with(vec![wire(0, name, vec![(ItemId::Ident.as_raw(), WireItem::Int(3))])]);
        let err = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(err.to_string().contains("must hold Ident"), "{err}");

        let bytes = image_with(vec![wire(0, 999, Vec::new())]);
        let err = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(err.to_string().contains("unknown node kind 999"), "{err}");

        let bytes = image_with(vec![wire(9, 0, Vec::new())]);
        let err = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(err.to_string().contains("unknown class tag 9"), "{err}");

        let dangling = WireRef {
            tag: 0,
            target: WireTarget::Local(5),
        };
        let bytes = image_with(vec![wire(0, name, vec![(ItemId::Ref.as_raw(), WireItem::Object(Some(dangling)))])]);
        let err = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(err.to_string().contains("missing object 5"), "{err}");

        assert_eq!(store.arenas().count(), 0);
    }

    #[test]
    fn reference_class_tags_are_checked() {
        let mut store = Store::new(registry());
        let lying = WireRef {
            tag: SHAPE_TAG.as_raw(),
            target: WireTarget::Local(1),
        };
        let bytes = image_with(vec![
            wire(0, NodeKind::Name.as_raw(), vec![(ItemId::Ref.as_raw(), WireItem::Object(Some(lying)))]),
            wire(0, NodeKind::Decl.as_raw(), Vec::new()),
        ]);
        let err = read(&mut store, &mut bytes.as_slice(), &mut LoadedOnly).unwrap_err();
        assert!(matches!(err, CodecError::TagMismatch { ref expected, ref actual }
            if expected == "shape" && actual == "node"));
    }
}
