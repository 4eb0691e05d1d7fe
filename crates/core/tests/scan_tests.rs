//! Scanner behaviour over small declared type families: root bindings, role
//! dispatch, resolution and fallback, cycles, and failure propagation.

use std::sync::Arc;

use weave_core::{
    assemble_as, BindingError, BuildError, Buildable, BuilderDiscovery, ElementBuilder, Event,
    Factory, MemberDecl, ParsingInfo, QualifiedName, Registry, Resolved, RootDecl, ScalarBuilder,
    Scanner, SubBinding, TableRef, TypeKey,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn qn(local: &str) -> QualifiedName {
    QualifiedName::local(local)
}

// ── Document / Item ───────────────────────────────────────────────────

struct Document {
    id: String,
    items: Vec<Item>,
    body: String,
}

#[derive(Default)]
struct DocumentBuilder {
    id: String,
    items: Vec<Item>,
    body: String,
}

impl ElementBuilder for DocumentBuilder {
    type Output = Document;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::text("set_id", |b: &mut DocumentBuilder, v| b.id = v.to_string())
                .attribute("", "id"),
            MemberDecl::element("add_item", |b: &mut DocumentBuilder, item: Item| {
                b.items.push(item)
            })
            .child("", "item"),
            MemberDecl::text("set_body", |b: &mut DocumentBuilder, v| b.body = v.to_string())
                .content(),
        ]
    }

    fn finish(self) -> Result<Document, BuildError> {
        Ok(Document {
            id: self.id,
            items: self.items,
            body: self.body,
        })
    }
}

struct Item {
    qty: u32,
}

#[derive(Default)]
struct ItemBuilder {
    qty: u32,
}

impl ElementBuilder for ItemBuilder {
    type Output = Item;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::parsed("set_qty", |b: &mut ItemBuilder, v: u32| b.qty = v)
                .attribute("", "qty"),
        ]
    }

    fn finish(self) -> Result<Item, BuildError> {
        Ok(Item { qty: self.qty })
    }
}

impl Buildable for Item {
    type Builder = ItemBuilder;
}

fn document_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_builder::<DocumentBuilder>()
        .register_buildable::<Item>()
        .declare_root::<Document, DocumentBuilder>("", "doc");
    registry
}

#[test]
fn document_scenario() {
    init_logging();
    let registry = document_registry();
    let tables = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Document>()])
        .unwrap();

    assert_eq!(tables.len(), 1);
    let info = tables.get(&qn("doc")).unwrap();
    assert_eq!(info.builder_type(), TypeKey::of::<DocumentBuilder>());
    assert_eq!(info.attribute(&qn("id")).unwrap().member(), "set_id");

    let item = info.element(&qn("item")).unwrap();
    let sub = item.info.compiled().unwrap();
    assert_eq!(sub.builder_type(), TypeKey::of::<ItemBuilder>());
    assert!(sub.attribute(&qn("qty")).is_some());

    assert!(info.content_invoker().is_some());
    assert!(info.any_attribute().is_none());
    assert!(info.any_element().is_none());
    assert!(info.comment_invoker().is_none());
    assert!(info.qualified_name_invoker().is_none());

    let mut builder = info.builder_factory().new_instance();
    info.attribute(&qn("id"))
        .unwrap()
        .invoke(&mut *builder, &qn("id"), "d1")
        .unwrap();
    let doc = builder.build().unwrap().downcast::<Document>().unwrap();
    assert_eq!(doc.id, "d1");
    assert!(doc.items.is_empty());
    assert!(doc.body.is_empty());
}

#[test]
fn scanning_twice_yields_equivalent_tables() {
    let registry = document_registry();
    let scanner = Scanner::new(&registry);
    let first = scanner.scan(&[TypeKey::of::<Document>()]).unwrap();
    let second = scanner.scan(&[TypeKey::of::<Document>()]).unwrap();
    assert_eq!(first.summaries(), second.summaries());
}

#[test]
fn empty_root_list_is_invalid() {
    let registry = document_registry();
    let err = Scanner::new(&registry).scan(&[]).unwrap_err();
    assert!(matches!(err, BindingError::InvalidArgument(_)));
}

#[test]
fn types_without_root_bindings_contribute_nothing() {
    let registry = document_registry();
    let tables = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Item>(), TypeKey::of::<String>()])
        .unwrap();
    assert!(tables.is_empty());
}

// ── Root binding order ────────────────────────────────────────────────

struct Catalog;
struct Archive;

#[test]
fn group_bindings_precede_singular_and_later_roots_overwrite() {
    let mut registry = document_registry();
    registry
        .declare_root_group::<Catalog>([
            RootDecl::new::<DocumentBuilder>("urn:c", "doc"),
            RootDecl::new::<ItemBuilder>("", "entry"),
        ])
        .declare_root::<Catalog, ItemBuilder>("", "doc")
        .declare_root::<Archive, DocumentBuilder>("", "entry");

    let tables = Scanner::new(&registry)
        .scan(&[
            TypeKey::of::<Document>(),
            TypeKey::of::<Catalog>(),
            TypeKey::of::<Archive>(),
        ])
        .unwrap();

    let names: Vec<String> = tables.names().map(|n| n.to_string()).collect();
    assert_eq!(names, vec!["doc", "{urn:c}doc", "entry"]);

    // `doc` first compiled for Document, then replaced by Catalog's singular root.
    assert_eq!(
        tables.get(&qn("doc")).unwrap().builder_type(),
        TypeKey::of::<ItemBuilder>()
    );
    assert_eq!(
        tables.get(&qn("entry")).unwrap().builder_type(),
        TypeKey::of::<DocumentBuilder>()
    );
}

// ── Cycles ────────────────────────────────────────────────────────────

struct Folder;

#[derive(Default)]
struct FolderBuilder;

impl ElementBuilder for FolderBuilder {
    type Output = Folder;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::element("add_folder", |_: &mut FolderBuilder, _: Folder| {})
                .child("", "folder"),
            MemberDecl::element("add_file", |_: &mut FolderBuilder, _: File| {})
                .child("", "file"),
        ]
    }

    fn finish(self) -> Result<Folder, BuildError> {
        Ok(Folder)
    }
}

impl Buildable for Folder {
    type Builder = FolderBuilder;
}

struct File;

#[derive(Default)]
struct FileBuilder;

impl ElementBuilder for FileBuilder {
    type Output = File;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::element("add_attachment", |_: &mut FileBuilder, _: Folder| {})
                .child("", "attachment"),
        ]
    }

    fn finish(self) -> Result<File, BuildError> {
        Ok(File)
    }
}

impl Buildable for File {
    type Builder = FileBuilder;
}

#[test]
fn direct_and_indirect_cycles_terminate() {
    init_logging();
    let mut registry = Registry::new();
    registry
        .register_buildable::<Folder>()
        .register_buildable::<File>()
        .declare_root::<Folder, FolderBuilder>("", "folder");

    let tables = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Folder>()])
        .unwrap();
    let folder = tables.get(&qn("folder")).unwrap();

    assert!(folder.element(&qn("folder")).unwrap().info.is_self());

    let file = folder.element(&qn("file")).unwrap().info.compiled().unwrap();
    assert_eq!(file.builder_type(), TypeKey::of::<FileBuilder>());
    assert!(matches!(
        file.element(&qn("attachment")).unwrap().info,
        SubBinding::Ancestor(1)
    ));

    let summary = folder.summary();
    let file_summary = summary.elements["file"].table.as_table().unwrap();
    assert_eq!(
        file_summary.elements["attachment"].table,
        TableRef::Cycle("ancestor:1".to_string())
    );
    assert_eq!(
        summary.elements["folder"].table,
        TableRef::Cycle("self".to_string())
    );
}

// ── Role errors ───────────────────────────────────────────────────────

struct Bad;

#[derive(Default)]
struct AmbiguousBuilder;

impl ElementBuilder for AmbiguousBuilder {
    type Output = Bad;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::text("fine", |_: &mut AmbiguousBuilder, _| {}).attribute("", "ok"),
            MemberDecl::text("both", |_: &mut AmbiguousBuilder, _| {})
                .attribute("", "x")
                .child("", "x"),
        ]
    }

    fn finish(self) -> Result<Bad, BuildError> {
        Ok(Bad)
    }
}

#[derive(Default)]
struct MixedBuilder;

impl ElementBuilder for MixedBuilder {
    type Output = Bad;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::text("set_id", |_: &mut MixedBuilder, _| {}).attribute("", "id"),
            MemberDecl::text("set_text", |_: &mut MixedBuilder, _| {}).mixed_content(),
        ]
    }

    fn finish(self) -> Result<Bad, BuildError> {
        Ok(Bad)
    }
}

#[derive(Default)]
struct ArityBuilder;

impl ElementBuilder for ArityBuilder {
    type Output = Bad;

    fn members() -> Vec<MemberDecl> {
        vec![MemberDecl::opaque(
            "add_pair",
            vec![TypeKey::of::<Item>(), TypeKey::of::<Item>()],
        )
        .child("", "pair")]
    }

    fn finish(self) -> Result<Bad, BuildError> {
        Ok(Bad)
    }
}

/// Holds a member with the given faulty builder nested one level down.
#[derive(Default)]
struct OuterBuilder;

impl ElementBuilder for OuterBuilder {
    type Output = ();

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::element("add_bad", |_: &mut OuterBuilder, _: Bad| {})
                .child("", "bad"),
        ]
    }

    fn finish(self) -> Result<(), BuildError> {
        Ok(())
    }
}

fn scan_bad<B: ElementBuilder>() -> Result<(), BindingError> {
    let mut registry = Registry::new();
    registry.register_builder::<B>().declare_root::<Bad, B>("", "bad");
    Scanner::new(&registry)
        .scan(&[TypeKey::of::<Bad>()])
        .map(|_| ())
}

#[test]
fn member_with_two_roles_is_ambiguous() {
    let err = scan_bad::<AmbiguousBuilder>().unwrap_err();
    assert_eq!(
        err,
        BindingError::AmbiguousBinding {
            builder: "AmbiguousBuilder".to_string(),
            member: "both".to_string(),
            roles: "attribute, element".to_string(),
        }
    );
    assert!(scan_bad::<ItemBuilder>().is_ok());
}

#[test]
fn mixed_content_is_unsupported() {
    let err = scan_bad::<MixedBuilder>().unwrap_err();
    assert!(matches!(err, BindingError::Unsupported { ref member, .. } if member == "set_text"));
}

#[test]
fn element_members_need_exactly_one_parameter() {
    let err = scan_bad::<ArityBuilder>().unwrap_err();
    assert_eq!(
        err,
        BindingError::WrongSignature {
            builder: "ArityBuilder".to_string(),
            member: "add_pair".to_string(),
            reason: "expected exactly one parameter, found 2".to_string(),
        }
    );
}

#[test]
fn nested_failures_abort_the_whole_scan() {
    let mut registry = Registry::new();
    registry
        .register_builder::<OuterBuilder>()
        .declare_builder::<Bad, MixedBuilder>()
        .declare_root::<Archive, OuterBuilder>("", "outer");
    let err = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Archive>()])
        .unwrap_err();
    assert!(matches!(err, BindingError::Unsupported { .. }));
}

// ── Resolution and fallback ───────────────────────────────────────────

/// A type nobody declares a builder for.
struct Opaque;

#[derive(Default)]
struct HolderBuilder;

impl ElementBuilder for HolderBuilder {
    type Output = ();

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::element("set_opaque", |_: &mut HolderBuilder, _: Opaque| {})
                .child("", "opaque"),
            MemberDecl::element("set_year", |_: &mut HolderBuilder, _: u16| {})
                .child("", "year"),
            MemberDecl::element("set_item", |_: &mut HolderBuilder, _: Item| {})
                .child("", "item")
                .with_builder::<ItemBuilder>(),
        ]
    }

    fn finish(self) -> Result<(), BuildError> {
        Ok(())
    }
}

#[test]
fn element_path_falls_back_to_scalar_builder() {
    let mut registry = Registry::new();
    registry
        .register_builder::<HolderBuilder>()
        .register_builder::<ItemBuilder>()
        .declare_root::<Catalog, HolderBuilder>("", "holder");
    let tables = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Catalog>()])
        .unwrap();
    let holder = tables.get(&qn("holder")).unwrap();

    for name in ["opaque", "year"] {
        let sub = holder.element(&qn(name)).unwrap().info.compiled().unwrap();
        assert_eq!(sub.builder_type(), TypeKey::of::<ScalarBuilder>());
    }

    // The scalar builder for an undecodable type still compiles, and fails
    // only when an instance is built.
    let opaque = holder.element(&qn("opaque")).unwrap().info.compiled().unwrap();
    let err = opaque.builder_factory().new_instance().build().unwrap_err();
    assert_eq!(err, BuildError::NoDecoder("Opaque".to_string()));

    // Member-level declaration resolves without conventional discovery.
    let item = holder.element(&qn("item")).unwrap().info.compiled().unwrap();
    assert_eq!(item.builder_type(), TypeKey::of::<ItemBuilder>());
}

#[test]
fn root_path_does_not_fall_back() {
    let mut registry = Registry::new();
    registry.declare_root::<Catalog, Opaque>("", "opaque");
    let err = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Catalog>()])
        .unwrap_err();
    assert!(matches!(err, BindingError::ResolutionFailure { ref target, .. } if target == "Opaque"));
}

/// Builds an `Item` from its text content instead of a `qty` attribute.
#[derive(Default)]
struct TextItemBuilder {
    text: String,
}

impl ElementBuilder for TextItemBuilder {
    type Output = Item;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::text("set_text", |b: &mut TextItemBuilder, v| b.text = v.to_string())
                .content(),
        ]
    }

    fn finish(self) -> Result<Item, BuildError> {
        let qty = self
            .text
            .trim()
            .parse()
            .map_err(|_| BuildError::Missing("qty"))?;
        Ok(Item { qty })
    }
}

/// Discovery that only knows `Item`, and maps it to a builder the registry
/// would never pick on its own.
struct TextItems;

impl BuilderDiscovery for TextItems {
    fn discover(&self, target: TypeKey) -> Result<Resolved, BindingError> {
        if target.is::<Item>() {
            Ok(Resolved {
                builder_type: TypeKey::of::<TextItemBuilder>(),
                factory: Factory::of::<TextItemBuilder>(),
            })
        } else {
            Err(BindingError::ResolutionFailure {
                target: target.to_string(),
                reason: "unknown to TextItems".to_string(),
            })
        }
    }
}

#[test]
fn discovery_is_pluggable() {
    let mut registry = document_registry();
    registry.register_builder::<TextItemBuilder>();
    let discovery = TextItems;
    let tables = Scanner::with_discovery(&registry, &discovery)
        .scan(&[TypeKey::of::<Document>()])
        .unwrap();
    let item = tables
        .get(&qn("doc"))
        .unwrap()
        .element(&qn("item"))
        .unwrap()
        .info
        .compiled()
        .unwrap();
    assert_eq!(item.builder_type(), TypeKey::of::<TextItemBuilder>());
    assert!(item.content_invoker().is_some());
    assert!(item.attribute(&qn("qty")).is_none());

    let doc: Document = assemble_as(
        &tables,
        vec![
            Event::start(qn("doc")),
            Event::start(qn("item")),
            Event::text(" 12 "),
            Event::End,
            Event::End,
        ],
    )
    .unwrap();
    assert_eq!(doc.items[0].qty, 12);
}

/// Hands out a builder type that was never registered.
struct Unlisted;

impl BuilderDiscovery for Unlisted {
    fn discover(&self, _target: TypeKey) -> Result<Resolved, BindingError> {
        Ok(Resolved {
            builder_type: TypeKey::of::<TextItemBuilder>(),
            factory: Factory::of::<TextItemBuilder>(),
        })
    }
}

#[test]
fn unregistered_discovered_builder_takes_the_scalar_fallback() {
    let registry = document_registry();
    let discovery = Unlisted;
    let info = Scanner::with_discovery(&registry, &discovery)
        .scan_builder(TypeKey::of::<DocumentBuilder>())
        .unwrap();
    let item = info.element(&qn("item")).unwrap().info.compiled().unwrap();
    assert_eq!(item.builder_type(), TypeKey::of::<ScalarBuilder>());
}

// ── Sharing ───────────────────────────────────────────────────────────

struct Shipment;

#[derive(Default)]
struct ShipmentBuilder;

impl ElementBuilder for ShipmentBuilder {
    type Output = Shipment;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::element("set_from", |_: &mut ShipmentBuilder, _: Address| {})
                .child("", "from"),
            MemberDecl::element("set_to", |_: &mut ShipmentBuilder, _: Address| {})
                .child("", "to"),
            MemberDecl::element("add_note", |_: &mut ShipmentBuilder, _: String| {})
                .child("", "note"),
            MemberDecl::element("set_weight", |_: &mut ShipmentBuilder, _: u32| {})
                .child("", "weight"),
        ]
    }

    fn finish(self) -> Result<Shipment, BuildError> {
        Ok(Shipment)
    }
}

struct Address;

#[derive(Default)]
struct AddressBuilder;

impl ElementBuilder for AddressBuilder {
    type Output = Address;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::element("set_street", |_: &mut AddressBuilder, _: String| {})
                .child("", "street"),
            MemberDecl::element("set_city", |_: &mut AddressBuilder, _: String| {})
                .child("", "city"),
        ]
    }

    fn finish(self) -> Result<Address, BuildError> {
        Ok(Address)
    }
}

impl Buildable for Address {
    type Builder = AddressBuilder;
}

fn compiled<'a>(info: &'a ParsingInfo, name: &str) -> &'a Arc<ParsingInfo> {
    info.element(&qn(name)).unwrap().info.compiled().unwrap()
}

#[test]
fn members_of_the_same_child_type_share_one_table() {
    let mut registry = Registry::new();
    registry
        .register_builder::<ShipmentBuilder>()
        .register_buildable::<Address>()
        .declare_root::<Shipment, ShipmentBuilder>("", "shipment");
    let tables = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Shipment>()])
        .unwrap();
    let shipment = tables.get(&qn("shipment")).unwrap();

    let from = compiled(shipment, "from");
    let to = compiled(shipment, "to");
    assert!(Arc::ptr_eq(from, to));

    // Scalar tables are shared per target type, across tables.
    let street = compiled(from, "street");
    assert!(Arc::ptr_eq(street, compiled(from, "city")));
    assert!(Arc::ptr_eq(street, compiled(shipment, "note")));

    // Same scalar builder type, different target: separate tables.
    let weight = compiled(shipment, "weight");
    assert_eq!(weight.builder_type(), street.builder_type());
    assert!(!Arc::ptr_eq(street, weight));
}

#[test]
fn back_references_follow_each_compilation_context() {
    init_logging();
    let mut registry = Registry::new();
    registry
        .register_buildable::<Folder>()
        .register_buildable::<File>()
        .declare_root::<Folder, FolderBuilder>("", "folder")
        .declare_root_group::<Archive>([RootDecl::new::<FileBuilder>("", "file")]);
    let tables = Scanner::new(&registry)
        .scan(&[TypeKey::of::<Folder>(), TypeKey::of::<Archive>()])
        .unwrap();

    // Under a folder root, a file's attachment points back at the folder.
    let file = compiled(tables.get(&qn("folder")).unwrap(), "file");
    assert!(matches!(
        file.element(&qn("attachment")).unwrap().info,
        SubBinding::Ancestor(1)
    ));

    // Under a file root, the attachment is a compiled folder whose files
    // point back at the root.
    let attachment = compiled(tables.get(&qn("file")).unwrap(), "attachment");
    assert_eq!(attachment.builder_type(), TypeKey::of::<FolderBuilder>());
    assert!(matches!(
        attachment.element(&qn("file")).unwrap().info,
        SubBinding::Ancestor(1)
    ));
}

/// Two element members per level, each pointing at the next level. Without
/// sharing the table count doubles with every level.
macro_rules! level {
    ($builder:ident, $next:ty) => {
        #[derive(Default)]
        struct $builder;

        impl ElementBuilder for $builder {
            type Output = $builder;

            fn members() -> Vec<MemberDecl> {
                vec![
                    MemberDecl::element("left", |_: &mut $builder, _: $next| {})
                        .child("", "left"),
                    MemberDecl::element("right", |_: &mut $builder, _: $next| {})
                        .child("", "right"),
                ]
            }

            fn finish(self) -> Result<$builder, BuildError> {
                Ok($builder)
            }
        }
    };
}

level!(Level1, Level2);
level!(Level2, Level3);
level!(Level3, Level4);
level!(Level4, String);

#[test]
fn shared_subtables_keep_compilation_linear() {
    let mut registry = Registry::new();
    registry
        .register_builder::<Level1>()
        .register_builder::<Level2>()
        .register_builder::<Level3>()
        .register_builder::<Level4>();
    let info = Scanner::new(&registry)
        .scan_builder(TypeKey::of::<Level1>())
        .unwrap();

    let mut left = compiled(&info, "left");
    let mut right = compiled(&info, "right");
    loop {
        assert!(Arc::ptr_eq(left, right));
        if left.builder_type() == TypeKey::of::<ScalarBuilder>() {
            break;
        }
        left = compiled(left, "left");
        right = compiled(right, "right");
    }
}

// ── Multiplicity ──────────────────────────────────────────────────────

#[derive(Default)]
struct RepeatBuilder;

impl ElementBuilder for RepeatBuilder {
    type Output = ();

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::text("first_text", |_: &mut RepeatBuilder, _| {}).content(),
            MemberDecl::text("second_text", |_: &mut RepeatBuilder, _| {}).content(),
            MemberDecl::text("first_id", |_: &mut RepeatBuilder, _| {}).attribute("", "id"),
            MemberDecl::text("second_id", |_: &mut RepeatBuilder, _| {}).attribute("", "id"),
            MemberDecl::name("first_name", |_: &mut RepeatBuilder, _| {}).qualified_name(),
            MemberDecl::name("second_name", |_: &mut RepeatBuilder, _| {}).qualified_name(),
        ]
    }

    fn finish(self) -> Result<(), BuildError> {
        Ok(())
    }
}

#[test]
fn repeated_declarations_keep_the_last() {
    let mut registry = Registry::new();
    registry.register_builder::<RepeatBuilder>();
    let info = Scanner::new(&registry)
        .scan_builder(TypeKey::of::<RepeatBuilder>())
        .unwrap();
    assert_eq!(info.content_invoker().unwrap().member(), "second_text");
    assert_eq!(info.attribute(&qn("id")).unwrap().member(), "second_id");
    assert_eq!(info.qualified_name_invoker().unwrap().member(), "second_name");
}
