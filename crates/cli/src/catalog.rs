//! The bundled demo catalog: a small library model declared statically.
//!
//! ```text
//! <library name="..." any:attr="...">       Library
//!   <!-- comment -->                        collected
//!   <book isbn="...">                       Book
//!     <title>..</title> <year>..</year>     scalar fallback (String, u16)
//!     <section heading="...">               Section, records its own name
//!       <para>..</para>                     scalar fallback (String)
//!       <section>..</section>               self reference
//!     </section>
//!     <anything>..</anything>               Meta via the wildcard
//!   </book>
//! </library>
//! ```

use std::any::Any;
use std::collections::BTreeMap;

use serde::Serialize;
use weave_core::{
    BindingError, BuildError, Buildable, ElementBuilder, MemberDecl, QualifiedName, Registry,
    RootDecl, RootTables, Scanner, TypeKey,
};

#[derive(Debug, Default, Serialize)]
pub struct Library {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    pub books: Vec<Book>,
}

#[derive(Debug, Default, Serialize)]
pub struct Book {
    pub isbn: String,
    pub title: Option<String>,
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<Meta>,
}

#[derive(Debug, Default, Serialize)]
pub struct Section {
    pub element: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paras: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

#[derive(Debug, Default, Serialize)]
pub struct Meta {
    pub name: String,
    pub value: String,
}

// ── Builders ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct LibraryBuilder(Library);

impl ElementBuilder for LibraryBuilder {
    type Output = Library;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::text("set_name", |b: &mut LibraryBuilder, v| {
                b.0.name = v.to_string()
            })
            .attribute("", "name"),
            MemberDecl::named_text(
                "put_attribute",
                |b: &mut LibraryBuilder, n: &QualifiedName, v: &str| {
                    b.0.attributes.insert(n.to_string(), v.to_string());
                },
            )
            .any_attribute(),
            MemberDecl::text("add_comment", |b: &mut LibraryBuilder, v| {
                b.0.comments.push(v.trim().to_string())
            })
            .comment(),
            MemberDecl::element("add_book", |b: &mut LibraryBuilder, book: Book| {
                b.0.books.push(book)
            })
            .child("", "book"),
        ]
    }

    fn finish(self) -> Result<Library, BuildError> {
        if self.0.name.is_empty() {
            return Err(BuildError::Missing("name"));
        }
        Ok(self.0)
    }
}

#[derive(Default)]
pub struct BookBuilder(Book);

impl ElementBuilder for BookBuilder {
    type Output = Book;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::text("set_isbn", |b: &mut BookBuilder, v| b.0.isbn = v.to_string())
                .attribute("", "isbn"),
            MemberDecl::element("set_title", |b: &mut BookBuilder, title: String| {
                b.0.title = Some(title)
            })
            .child("", "title"),
            MemberDecl::element("set_year", |b: &mut BookBuilder, year: u16| {
                b.0.year = Some(year)
            })
            .child("", "year"),
            MemberDecl::element("add_section", |b: &mut BookBuilder, section: Section| {
                b.0.sections.push(section)
            })
            .child("", "section"),
            MemberDecl::element("add_meta", |b: &mut BookBuilder, meta: Meta| {
                b.0.meta.push(meta)
            })
            .any_element(),
        ]
    }

    fn finish(self) -> Result<Book, BuildError> {
        if self.0.isbn.is_empty() {
            return Err(BuildError::Missing("isbn"));
        }
        Ok(self.0)
    }
}

#[derive(Default)]
pub struct SectionBuilder(Section);

impl ElementBuilder for SectionBuilder {
    type Output = Section;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::name("set_element", |b: &mut SectionBuilder, n| {
                b.0.element = n.to_string()
            })
            .qualified_name(),
            MemberDecl::text("set_heading", |b: &mut SectionBuilder, v| {
                b.0.heading = Some(v.to_string())
            })
            .attribute("", "heading"),
            MemberDecl::element("add_para", |b: &mut SectionBuilder, para: String| {
                b.0.paras.push(para)
            })
            .child("", "para"),
            MemberDecl::element("add_section", |b: &mut SectionBuilder, section: Section| {
                b.0.sections.push(section)
            })
            .child("", "section"),
        ]
    }

    fn finish(self) -> Result<Section, BuildError> {
        Ok(self.0)
    }
}

#[derive(Default)]
pub struct MetaBuilder(Meta);

impl ElementBuilder for MetaBuilder {
    type Output = Meta;

    fn members() -> Vec<MemberDecl> {
        vec![
            MemberDecl::name("set_name", |b: &mut MetaBuilder, n| b.0.name = n.to_string())
                .qualified_name(),
            MemberDecl::text("set_value", |b: &mut MetaBuilder, v| {
                b.0.value = v.trim().to_string()
            })
            .content(),
        ]
    }

    fn finish(self) -> Result<Meta, BuildError> {
        Ok(self.0)
    }
}

impl Buildable for Book {
    type Builder = BookBuilder;
}

impl Buildable for Section {
    type Builder = SectionBuilder;
}

impl Buildable for Meta {
    type Builder = MetaBuilder;
}

// ── Registry and tables ───────────────────────────────────────────────

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_builder::<LibraryBuilder>()
        .register_buildable::<Book>()
        .register_buildable::<Section>()
        .register_buildable::<Meta>()
        .declare_root::<Library, LibraryBuilder>("", "library")
        .declare_root_group::<Book>([RootDecl::new::<BookBuilder>("", "book")]);
    registry
}

/// Root types in scan order.
pub fn roots() -> Vec<TypeKey> {
    vec![TypeKey::of::<Library>(), TypeKey::of::<Book>()]
}

pub fn tables() -> Result<RootTables, BindingError> {
    let registry = registry();
    Scanner::new(&registry).scan(&roots())
}

/// Serialize an assembled root value. `None` if it is not a catalog type.
pub fn to_json(value: Box<dyn Any>) -> Option<serde_json::Value> {
    let value = match value.downcast::<Library>() {
        Ok(library) => return serde_json::to_value(*library).ok(),
        Err(value) => value,
    };
    value
        .downcast::<Book>()
        .ok()
        .and_then(|book| serde_json::to_value(*book).ok())
}
