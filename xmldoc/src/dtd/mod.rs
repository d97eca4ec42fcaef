//! DTD declaration tables.
//!
//! The tokenizer collects every notation, entity, element and attribute-list
//! declaration it reads from a DOCTYPE (internal subset first, then the
//! external subset) into a [`DtdDecls`]. The reader hands the tables to the
//! document so the writer can regenerate normalized DTD text later.

mod parser;

pub use parser::{parse_declarations, parse_doctype, DoctypeDecl, DtdError};

use rustc_hash::FxHashMap;

/// A notation declaration from `<!NOTATION name ...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotationDecl {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

/// An entity declaration from `<!ENTITY [%] name ...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    pub name: String,
    /// True for parameter entities (`<!ENTITY % name ...>`).
    pub parameter: bool,
    pub kind: EntityKind,
}

/// Where an entity's replacement text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// Literal value, kept exactly as written between the quotes.
    Internal(String),
    /// External entity. A notation marks it as unparsed (`NDATA`).
    External {
        public_id: Option<String>,
        system_id: String,
        notation: Option<String>,
    },
}

/// Content type of a declared element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Only attributes were declared for this element.
    Undeclared,
    Empty,
    Any,
    /// `(#PCDATA ...)` content.
    Mixed,
    /// Element-only content.
    Elements,
}

/// An element declaration, together with its declared attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    pub name: String,
    pub content_type: ContentType,
    /// Whitespace-free content model for `Mixed` and `Elements` content.
    pub content_model: Option<String>,
    pub attributes: Vec<AttributeDecl>,
}

impl ElementDecl {
    /// Returns the content specification as it appears in `<!ELEMENT>`.
    pub fn content_spec(&self) -> Option<&str> {
        match self.content_type {
            ContentType::Undeclared => None,
            ContentType::Empty => Some("EMPTY"),
            ContentType::Any => Some("ANY"),
            ContentType::Mixed | ContentType::Elements => self.content_model.as_deref(),
        }
    }

    /// Returns the declaration of one attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// One attribute definition from `<!ATTLIST>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub attribute_type: AttributeType,
    pub default: AttributeDefault,
}

/// Declared attribute type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    CData,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    /// `(a|b|c)`
    Enumerated(Vec<String>),
    /// `NOTATION (a|b)`
    Notation(Vec<String>),
}

impl AttributeType {
    /// Returns the type as written in an `<!ATTLIST>` declaration.
    pub fn keyword(&self) -> String {
        match self {
            AttributeType::CData => "CDATA".to_string(),
            AttributeType::Id => "ID".to_string(),
            AttributeType::IdRef => "IDREF".to_string(),
            AttributeType::IdRefs => "IDREFS".to_string(),
            AttributeType::Entity => "ENTITY".to_string(),
            AttributeType::Entities => "ENTITIES".to_string(),
            AttributeType::NmToken => "NMTOKEN".to_string(),
            AttributeType::NmTokens => "NMTOKENS".to_string(),
            AttributeType::Enumerated(values) => format!("({})", values.join("|")),
            AttributeType::Notation(values) => format!("NOTATION ({})", values.join("|")),
        }
    }

    /// Parses one of the keyword types. Enumerations are not keywords.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "CDATA" => AttributeType::CData,
            "ID" => AttributeType::Id,
            "IDREF" => AttributeType::IdRef,
            "IDREFS" => AttributeType::IdRefs,
            "ENTITY" => AttributeType::Entity,
            "ENTITIES" => AttributeType::Entities,
            "NMTOKEN" => AttributeType::NmToken,
            "NMTOKENS" => AttributeType::NmTokens,
            _ => return None,
        })
    }
}

/// Declared default for an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeDefault {
    Implied,
    Required,
    Fixed(String),
    Default(String),
}

impl AttributeDefault {
    /// Returns the `#` keyword, or `None` for a plain default literal.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            AttributeDefault::Implied => Some("#IMPLIED"),
            AttributeDefault::Required => Some("#REQUIRED"),
            AttributeDefault::Fixed(_) => Some("#FIXED"),
            AttributeDefault::Default(_) => None,
        }
    }

    /// Returns the default value, raw as declared.
    pub fn value(&self) -> Option<&str> {
        match self {
            AttributeDefault::Fixed(v) | AttributeDefault::Default(v) => Some(v),
            AttributeDefault::Implied | AttributeDefault::Required => None,
        }
    }
}

/// Declarations collected from a DOCTYPE, in declaration order.
///
/// The first declaration of a notation, entity or attribute binds; later ones
/// are ignored.
#[derive(Debug, Clone, Default)]
pub struct DtdDecls {
    notations: Vec<NotationDecl>,
    entities: Vec<EntityDecl>,
    elements: Vec<ElementDecl>,
    notation_index: FxHashMap<String, usize>,
    entity_index: FxHashMap<String, usize>,
    parameter_index: FxHashMap<String, usize>,
    element_index: FxHashMap<String, usize>,
}

impl DtdDecls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.notations.is_empty() && self.entities.is_empty() && self.elements.is_empty()
    }

    pub fn notations(&self) -> &[NotationDecl] {
        &self.notations
    }

    /// Returns general and parameter entities.
    pub fn entities(&self) -> &[EntityDecl] {
        &self.entities
    }

    pub fn elements(&self) -> &[ElementDecl] {
        &self.elements
    }

    pub fn notation(&self, name: &str) -> Option<&NotationDecl> {
        self.notation_index.get(name).map(|&i| &self.notations[i])
    }

    /// Looks up a general entity.
    pub fn entity(&self, name: &str) -> Option<&EntityDecl> {
        self.entity_index.get(name).map(|&i| &self.entities[i])
    }

    pub fn parameter_entity(&self, name: &str) -> Option<&EntityDecl> {
        self.parameter_index.get(name).map(|&i| &self.entities[i])
    }

    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.element_index.get(name).map(|&i| &self.elements[i])
    }

    /// Records a notation. Returns false if the name was already declared.
    pub fn add_notation(&mut self, decl: NotationDecl) -> bool {
        if self.notation_index.contains_key(&decl.name) {
            return false;
        }
        self.notation_index
            .insert(decl.name.clone(), self.notations.len());
        self.notations.push(decl);
        true
    }

    /// Records an entity. Returns false if the name was already declared.
    pub fn add_entity(&mut self, decl: EntityDecl) -> bool {
        let index = if decl.parameter {
            &mut self.parameter_index
        } else {
            &mut self.entity_index
        };
        if index.contains_key(&decl.name) {
            return false;
        }
        index.insert(decl.name.clone(), self.entities.len());
        self.entities.push(decl);
        true
    }

    /// Records an element's content specification. Returns false if the
    /// element already had one.
    pub fn add_element(
        &mut self,
        name: &str,
        content_type: ContentType,
        content_model: Option<String>,
    ) -> bool {
        let decl = self.element_entry(name);
        if decl.content_type != ContentType::Undeclared {
            return false;
        }
        decl.content_type = content_type;
        decl.content_model = content_model;
        true
    }

    /// Records an attribute of `element`. Returns false if it was already
    /// declared.
    pub fn add_attribute(&mut self, element: &str, decl: AttributeDecl) -> bool {
        let entry = self.element_entry(element);
        if entry.attribute(&decl.name).is_some() {
            return false;
        }
        entry.attributes.push(decl);
        true
    }

    fn element_entry(&mut self, name: &str) -> &mut ElementDecl {
        let index = match self.element_index.get(name) {
            Some(&index) => index,
            None => {
                self.element_index
                    .insert(name.to_string(), self.elements.len());
                self.elements.push(ElementDecl {
                    name: name.to_string(),
                    content_type: ContentType::Undeclared,
                    content_model: None,
                    attributes: Vec::new(),
                });
                self.elements.len() - 1
            }
        };
        &mut self.elements[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_entity_declaration_wins() {
        let mut decls = DtdDecls::new();
        let entity = |value: &str| EntityDecl {
            name: "e".to_string(),
            parameter: false,
            kind: EntityKind::Internal(value.to_string()),
        };
        assert!(decls.add_entity(entity("first")));
        assert!(!decls.add_entity(entity("second")));
        assert_eq!(
            decls.entity("e").unwrap().kind,
            EntityKind::Internal("first".to_string())
        );
    }

    #[test]
    fn test_parameter_entities_have_own_namespace() {
        let mut decls = DtdDecls::new();
        for parameter in [false, true] {
            assert!(decls.add_entity(EntityDecl {
                name: "x".to_string(),
                parameter,
                kind: EntityKind::Internal(String::new()),
            }));
        }
        assert!(!decls.entity("x").unwrap().parameter);
        assert!(decls.parameter_entity("x").unwrap().parameter);
        assert_eq!(decls.entities().len(), 2);
    }

    #[test]
    fn test_attlist_before_element() {
        let mut decls = DtdDecls::new();
        decls.add_attribute(
            "item",
            AttributeDecl {
                name: "id".to_string(),
                attribute_type: AttributeType::Id,
                default: AttributeDefault::Required,
            },
        );
        assert_eq!(
            decls.element("item").unwrap().content_type,
            ContentType::Undeclared
        );

        assert!(decls.add_element("item", ContentType::Empty, None));
        assert!(!decls.add_element("item", ContentType::Any, None));
        let item = decls.element("item").unwrap();
        assert_eq!(item.content_spec(), Some("EMPTY"));
        assert_eq!(item.attributes.len(), 1);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(AttributeType::IdRefs.keyword(), "IDREFS");
        assert_eq!(
            AttributeType::Enumerated(vec!["a".into(), "b".into()]).keyword(),
            "(a|b)"
        );
        assert_eq!(
            AttributeType::Notation(vec!["gif".into()]).keyword(),
            "NOTATION (gif)"
        );
        assert_eq!(AttributeType::from_keyword("NMTOKENS"), Some(AttributeType::NmTokens));
        assert_eq!(AttributeType::from_keyword("cdata"), None);
        assert_eq!(AttributeDefault::Fixed("v".into()).keyword(), Some("#FIXED"));
        assert_eq!(AttributeDefault::Default("v".into()).keyword(), None);
    }
}
