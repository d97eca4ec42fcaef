//! Scanner for DOCTYPE declarations and DTD markup declarations.
//!
//! Non-validating: declarations are recorded, never checked against the
//! document. Internal parameter entity references are expanded, both between
//! declarations and inside them. A declaration that refers to an external
//! parameter entity is skipped, since its text is never read. Conditional
//! sections are honored: `INCLUDE` bodies are scanned, `IGNORE` bodies are
//! not.

use std::borrow::Cow;
use std::fmt;

use super::{
    AttributeDecl, AttributeDefault, AttributeType, ContentType, DtdDecls, EntityDecl, EntityKind,
    NotationDecl,
};

/// Bound on nested parameter entity expansion.
const MAX_PE_DEPTH: usize = 8;

/// Characters that end a name.
const NAME_DELIMITERS: &str = "<>()[]|,?*+\"'%;=";

/// A malformed declaration, with the byte offset where scanning stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtdError {
    pub message: String,
    pub offset: usize,
}

impl fmt::Display for DtdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl std::error::Error for DtdError {}

type Result<T> = std::result::Result<T, DtdError>;

/// The parts of a `<!DOCTYPE ...>` declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctypeDecl {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    /// Text between `[` and `]`, if present.
    pub internal_subset: Option<String>,
}

/// Parses the content of a DOCTYPE declaration: everything between
/// `<!DOCTYPE` and the closing `>`.
pub fn parse_doctype(content: &str) -> Result<DoctypeDecl> {
    let mut scanner = Scanner::new(content);
    scanner.skip_ws();
    let name = scanner.name()?;
    scanner.skip_ws();
    let (public_id, system_id) = if scanner.looking_at("PUBLIC") || scanner.looking_at("SYSTEM") {
        scanner.external_id(true)?
    } else {
        (None, None)
    };
    scanner.skip_ws();

    let mut internal_subset = None;
    if scanner.eat("[") {
        let rest = scanner.rest();
        let end = rest
            .rfind(']')
            .ok_or_else(|| scanner.error("unterminated internal subset"))?;
        internal_subset = Some(rest[..end].to_string());
        scanner.pos += end + 1;
        scanner.skip_ws();
    }
    if !scanner.at_end() {
        return Err(scanner.error("unexpected text in DOCTYPE"));
    }

    Ok(DoctypeDecl {
        name,
        public_id,
        system_id,
        internal_subset,
    })
}

/// Scans markup declarations from `input` into `decls`.
pub fn parse_declarations(input: &str, decls: &mut DtdDecls) -> Result<()> {
    parse_nested(input, decls, 0)
}

fn parse_nested(input: &str, decls: &mut DtdDecls, depth: usize) -> Result<()> {
    let mut scanner = Scanner::new(input);
    loop {
        scanner.skip_ws();
        if scanner.at_end() {
            return Ok(());
        }
        if scanner.eat("<!--") {
            scanner.skip_past("-->")?;
        } else if scanner.eat("<?") {
            scanner.skip_past("?>")?;
        } else if scanner.looking_at("<![") {
            scanner.conditional_section(decls, depth)?;
        } else if scanner.looking_at("<!") {
            scanner.markup_decl(decls)?;
        } else if scanner.eat("%") {
            let name = scanner.name()?;
            scanner.expect(";")?;
            let replacement = match decls.parameter_entity(&name) {
                Some(EntityDecl {
                    kind: EntityKind::Internal(value),
                    ..
                }) => Some(value.clone()),
                _ => None,
            };
            if let Some(value) = replacement {
                if depth >= MAX_PE_DEPTH {
                    return Err(scanner.error(format!("parameter entity %{}; nests too deep", name)));
                }
                parse_nested(&value, decls, depth + 1).map_err(|e| DtdError {
                    message: format!("in %{};: {}", name, e.message),
                    offset: scanner.pos,
                })?;
            }
        } else {
            return Err(scanner.error("expected a markup declaration"));
        }
    }
}

/// Length of the declaration at the start of `text`, up to and including
/// the first `>` outside a quoted literal.
fn declaration_len(text: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Length of a conditional section body starting just after its `[`, up to
/// the matching `]]>`. Nested sections are skipped whole.
fn conditional_len(text: &str) -> Option<usize> {
    let mut open = 1;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with("<![") {
            open += 1;
            i += 3;
        } else if rest.starts_with("]]>") {
            open -= 1;
            if open == 0 {
                return Some(i);
            }
            i += 3;
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && !s.contains(|c: char| c.is_whitespace() || NAME_DELIMITERS.contains(c))
}

/// Replaces `%name;` outside quoted literals with the entity's replacement
/// text padded by one space on each side. `Ok(None)` means a reference
/// named an external parameter entity, whose text is not available here.
fn expand_parameter_refs<'t>(
    text: &'t str,
    decls: &DtdDecls,
    depth: usize,
) -> std::result::Result<Option<Cow<'t, str>>, String> {
    if !text.contains('%') {
        return Ok(Some(Cow::Borrowed(text)));
    }
    let mut out = String::with_capacity(text.len());
    let mut quote = None;
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '%') => {
                let after = &text[i + 1..];
                if let Some(name) = after.find(';').map(|end| &after[..end]).filter(|n| is_name(n)) {
                    let value = match decls.parameter_entity(name) {
                        Some(EntityDecl {
                            kind: EntityKind::Internal(value),
                            ..
                        }) => value,
                        Some(_) => return Ok(None),
                        None => return Err(format!("undeclared parameter entity %{};", name)),
                    };
                    if depth >= MAX_PE_DEPTH {
                        return Err(format!("parameter entity %{}; nests too deep", name));
                    }
                    let Some(value) = expand_parameter_refs(value, decls, depth + 1)? else {
                        return Ok(None);
                    };
                    out.push(' ');
                    out.push_str(&value);
                    out.push(' ');
                    i += name.len() + 2;
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
        i += c.len_utf8();
    }
    Ok(Some(Cow::Owned(out)))
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn looking_at(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.looking_at(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str) -> Result<()> {
        if self.eat(s) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", s)))
        }
    }

    fn skip_ws(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
        self.pos += rest.len() - trimmed.len();
        rest.len() != trimmed.len()
    }

    fn require_ws(&mut self) -> Result<()> {
        if self.skip_ws() {
            Ok(())
        } else {
            Err(self.error("expected whitespace"))
        }
    }

    fn skip_past(&mut self, terminator: &str) -> Result<()> {
        match self.rest().find(terminator) {
            Some(i) => {
                self.pos += i + terminator.len();
                Ok(())
            }
            None => Err(self.error(format!("missing `{}`", terminator))),
        }
    }

    fn name(&mut self) -> Result<String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || NAME_DELIMITERS.contains(c))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn quoted(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        self.pos += 1;
        let rest = self.rest();
        let end = rest
            .find(quote)
            .ok_or_else(|| self.error("unterminated literal"))?;
        self.pos += end + 1;
        Ok(rest[..end].to_string())
    }

    /// `PUBLIC "pid" ["sid"]` or `SYSTEM "sid"`.
    fn external_id(&mut self, system_optional: bool) -> Result<(Option<String>, Option<String>)> {
        if self.eat("PUBLIC") {
            self.require_ws()?;
            let public_id = self.quoted()?;
            let had_ws = self.skip_ws();
            let system_id = match self.peek() {
                Some('"' | '\'') if had_ws => Some(self.quoted()?),
                _ if system_optional => None,
                _ => return Err(self.error("expected a system literal")),
            };
            Ok((Some(public_id), system_id))
        } else if self.eat("SYSTEM") {
            self.require_ws()?;
            Ok((None, Some(self.quoted()?)))
        } else {
            Err(self.error("expected PUBLIC or SYSTEM"))
        }
    }

    /// Scans one `<!...>` declaration, expanding parameter entity
    /// references inside it first.
    fn markup_decl(&mut self, decls: &mut DtdDecls) -> Result<()> {
        let start = self.pos;
        let len = declaration_len(self.rest())
            .ok_or_else(|| self.error("unterminated markup declaration"))?;
        let text = &self.input[start..start + len];
        self.pos += len;

        let expanded = expand_parameter_refs(text, decls, 0)
            .map_err(|message| DtdError { message, offset: start })?;
        let Some(expanded) = expanded else {
            return Ok(());
        };
        let exact = matches!(expanded, Cow::Borrowed(_));
        let mut inner = Scanner::new(&expanded);
        inner.declaration(decls).map_err(|e| DtdError {
            message: e.message,
            offset: if exact { start + e.offset } else { start },
        })
    }

    fn declaration(&mut self, decls: &mut DtdDecls) -> Result<()> {
        if self.eat("<!ELEMENT") {
            self.element_decl(decls)?;
        } else if self.eat("<!ATTLIST") {
            self.attlist_decl(decls)?;
        } else if self.eat("<!ENTITY") {
            self.entity_decl(decls)?;
        } else if self.eat("<!NOTATION") {
            self.notation_decl(decls)?;
        } else {
            return Err(self.error("expected a markup declaration"));
        }
        if !self.at_end() {
            return Err(self.error("unexpected text after declaration"));
        }
        Ok(())
    }

    /// `<![ INCLUDE [ ... ]]>` or `<![ IGNORE [ ... ]]>`. The keyword may
    /// come from a parameter entity.
    fn conditional_section(&mut self, decls: &mut DtdDecls, depth: usize) -> Result<()> {
        let start = self.pos;
        self.expect("<![")?;
        self.skip_ws();
        let keyword = if self.eat("%") {
            let name = self.name()?;
            self.expect(";")?;
            match decls.parameter_entity(&name) {
                Some(EntityDecl {
                    kind: EntityKind::Internal(value),
                    ..
                }) => value.trim().to_string(),
                _ => {
                    return Err(self.error(format!(
                        "conditional section keyword %{}; is not an internal parameter entity",
                        name
                    )))
                }
            }
        } else {
            self.name()?
        };
        self.skip_ws();
        self.expect("[")?;

        let body_start = self.pos;
        let body_len = conditional_len(self.rest()).ok_or_else(|| DtdError {
            message: "unterminated conditional section".to_string(),
            offset: start,
        })?;
        self.pos += body_len + 3;

        match keyword.as_str() {
            "INCLUDE" => {
                let body = &self.input[body_start..body_start + body_len];
                parse_nested(body, decls, depth).map_err(|e| DtdError {
                    message: e.message,
                    offset: body_start + e.offset,
                })
            }
            "IGNORE" => Ok(()),
            other => Err(DtdError {
                message: format!("unknown conditional section keyword `{}`", other),
                offset: start,
            }),
        }
    }

    fn element_decl(&mut self, decls: &mut DtdDecls) -> Result<()> {
        self.require_ws()?;
        let name = self.name()?;
        self.require_ws()?;

        let (content_type, model) = if self.eat("EMPTY") {
            (ContentType::Empty, None)
        } else if self.eat("ANY") {
            (ContentType::Any, None)
        } else if self.looking_at("(") {
            let rest = self.rest();
            let end = rest
                .find('>')
                .ok_or_else(|| self.error("unterminated element declaration"))?;
            let model: String = rest[..end].chars().filter(|c| !c.is_whitespace()).collect();
            if model.matches('(').count() != model.matches(')').count() {
                return Err(self.error(format!("unbalanced content model for <{}>", name)));
            }
            self.pos += end;
            let content_type = if model.starts_with("(#PCDATA") {
                ContentType::Mixed
            } else {
                ContentType::Elements
            };
            (content_type, Some(model))
        } else {
            return Err(self.error(format!("bad content specification for <{}>", name)));
        };

        self.skip_ws();
        self.expect(">")?;
        decls.add_element(&name, content_type, model);
        Ok(())
    }

    fn attlist_decl(&mut self, decls: &mut DtdDecls) -> Result<()> {
        self.require_ws()?;
        let element = self.name()?;
        loop {
            self.skip_ws();
            if self.eat(">") {
                return Ok(());
            }
            let name = self.name()?;
            self.require_ws()?;
            let attribute_type = self.attribute_type()?;
            self.require_ws()?;
            let default = self.attribute_default()?;
            decls.add_attribute(
                &element,
                AttributeDecl {
                    name,
                    attribute_type,
                    default,
                },
            );
        }
    }

    fn attribute_type(&mut self) -> Result<AttributeType> {
        if self.looking_at("(") {
            return Ok(AttributeType::Enumerated(self.enumeration()?));
        }
        let keyword = self.name()?;
        if keyword == "NOTATION" {
            self.require_ws()?;
            return Ok(AttributeType::Notation(self.enumeration()?));
        }
        AttributeType::from_keyword(&keyword)
            .ok_or_else(|| self.error(format!("unknown attribute type {}", keyword)))
    }

    fn enumeration(&mut self) -> Result<Vec<String>> {
        self.expect("(")?;
        let mut values = Vec::new();
        loop {
            self.skip_ws();
            values.push(self.name()?);
            self.skip_ws();
            if self.eat("|") {
                continue;
            }
            self.expect(")")?;
            return Ok(values);
        }
    }

    fn attribute_default(&mut self) -> Result<AttributeDefault> {
        if self.eat("#REQUIRED") {
            Ok(AttributeDefault::Required)
        } else if self.eat("#IMPLIED") {
            Ok(AttributeDefault::Implied)
        } else if self.eat("#FIXED") {
            self.require_ws()?;
            Ok(AttributeDefault::Fixed(self.quoted()?))
        } else {
            Ok(AttributeDefault::Default(self.quoted()?))
        }
    }

    fn entity_decl(&mut self, decls: &mut DtdDecls) -> Result<()> {
        self.require_ws()?;
        let parameter = self.eat("%");
        if parameter {
            self.require_ws()?;
        }
        let name = self.name()?;
        self.require_ws()?;

        let kind = if matches!(self.peek(), Some('"' | '\'')) {
            EntityKind::Internal(self.quoted()?)
        } else {
            let (public_id, system_id) = self.external_id(false)?;
            let had_ws = self.skip_ws();
            let notation = if !parameter && had_ws && self.eat("NDATA") {
                self.require_ws()?;
                Some(self.name()?)
            } else {
                None
            };
            EntityKind::External {
                public_id,
                system_id: system_id.unwrap_or_default(),
                notation,
            }
        };

        self.skip_ws();
        self.expect(">")?;
        decls.add_entity(EntityDecl {
            name,
            parameter,
            kind,
        });
        Ok(())
    }

    fn notation_decl(&mut self, decls: &mut DtdDecls) -> Result<()> {
        self.require_ws()?;
        let name = self.name()?;
        self.require_ws()?;
        let (public_id, system_id) = self.external_id(true)?;
        self.skip_ws();
        self.expect(">")?;
        decls.add_notation(NotationDecl {
            name,
            public_id,
            system_id,
        });
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> DtdError {
        DtdError {
            message: message.into(),
            offset: self.pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> DtdDecls {
        let mut decls = DtdDecls::new();
        parse_declarations(input, &mut decls).unwrap();
        decls
    }

    #[test]
    fn test_parse_doctype_public() {
        let doctype =
            parse_doctype(r#" model PUBLIC "-//Acme//DTD model 1//EN" "model.dtd""#).unwrap();
        assert_eq!(doctype.name, "model");
        assert_eq!(doctype.public_id.as_deref(), Some("-//Acme//DTD model 1//EN"));
        assert_eq!(doctype.system_id.as_deref(), Some("model.dtd"));
        assert!(doctype.internal_subset.is_none());
    }

    #[test]
    fn test_parse_doctype_internal_subset() {
        let doctype = parse_doctype(" root [ <!ELEMENT root ANY> <!ENTITY e \"]\"> ] ").unwrap();
        assert_eq!(doctype.name, "root");
        assert_eq!(doctype.public_id, None);
        assert_eq!(
            doctype.internal_subset.as_deref(),
            Some(" <!ELEMENT root ANY> <!ENTITY e \"]\"> ")
        );
    }

    #[test]
    fn test_parse_doctype_rejects_garbage() {
        assert!(parse_doctype(" root JUNK").is_err());
        assert!(parse_doctype("").is_err());
    }

    #[test]
    fn test_element_declarations() {
        let decls = parse(
            "<!ELEMENT a EMPTY>\n<!ELEMENT b ANY>\n<!ELEMENT c (#PCDATA | a)* >\n<!ELEMENT d ( a , b+ )?>",
        );
        let spec = |name: &str| decls.element(name).unwrap().content_spec().unwrap().to_string();
        assert_eq!(spec("a"), "EMPTY");
        assert_eq!(spec("b"), "ANY");
        assert_eq!(spec("c"), "(#PCDATA|a)*");
        assert_eq!(decls.element("c").unwrap().content_type, ContentType::Mixed);
        assert_eq!(spec("d"), "(a,b+)?");
        assert_eq!(decls.element("d").unwrap().content_type, ContentType::Elements);
    }

    #[test]
    fn test_attlist_declarations() {
        let decls = parse(
            r#"<!ATTLIST port
                 name CDATA #REQUIRED
                 kind (input|output) "input"
                 id ID #IMPLIED
                 version CDATA #FIXED '1.0'
                 format NOTATION (gif | png) #IMPLIED>"#,
        );
        let port = decls.element("port").unwrap();
        assert_eq!(port.attributes.len(), 5);
        assert_eq!(port.attribute("name").unwrap().default, AttributeDefault::Required);
        assert_eq!(
            port.attribute("kind").unwrap().attribute_type,
            AttributeType::Enumerated(vec!["input".into(), "output".into()])
        );
        assert_eq!(
            port.attribute("kind").unwrap().default,
            AttributeDefault::Default("input".into())
        );
        assert_eq!(
            port.attribute("version").unwrap().default,
            AttributeDefault::Fixed("1.0".into())
        );
        assert_eq!(
            port.attribute("format").unwrap().attribute_type,
            AttributeType::Notation(vec!["gif".into(), "png".into()])
        );
    }

    #[test]
    fn test_entity_and_notation_declarations() {
        let decls = parse(
            r#"<!NOTATION gif SYSTEM "image/gif">
               <!ENTITY author "Jane &amp; co">
               <!ENTITY chapter SYSTEM "chapter.xml">
               <!ENTITY logo PUBLIC "-//Acme//logo" "logo.gif" NDATA gif>
               <!ENTITY % common "<!ELEMENT shared EMPTY>">
               %common;"#,
        );
        assert_eq!(decls.notation("gif").unwrap().system_id.as_deref(), Some("image/gif"));
        assert_eq!(
            decls.entity("author").unwrap().kind,
            EntityKind::Internal("Jane &amp; co".into())
        );
        assert_eq!(
            decls.entity("logo").unwrap().kind,
            EntityKind::External {
                public_id: Some("-//Acme//logo".into()),
                system_id: "logo.gif".into(),
                notation: Some("gif".into()),
            }
        );
        assert!(decls.parameter_entity("common").is_some());
        // The parameter entity reference was expanded.
        assert_eq!(decls.element("shared").unwrap().content_type, ContentType::Empty);
    }

    #[test]
    fn test_comments_and_pis_are_skipped() {
        let decls = parse("<!-- <!ELEMENT ghost ANY> --><?pi stuff?><!ELEMENT real ANY>");
        assert!(decls.element("ghost").is_none());
        assert!(decls.element("real").is_some());
    }

    #[test]
    fn test_errors_carry_offset() {
        let mut decls = DtdDecls::new();
        let err = parse_declarations("<!ELEMENT a EMPTY>\n<!BOGUS>", &mut decls).unwrap_err();
        assert_eq!(err.offset, 19);
        // Declarations before the error are kept.
        assert!(decls.element("a").is_some());
    }

    #[test]
    fn test_parameter_entity_inside_attlist() {
        let decls = parse(
            r#"<!ENTITY % common "id ID #IMPLIED kind CDATA 'x'">
               <!ENTITY % kinds "(in|out)">
               <!ELEMENT a EMPTY>
               <!ATTLIST a %common;>
               <!ATTLIST b dir %kinds; "in">"#,
        );
        let a = decls.element("a").unwrap();
        assert_eq!(a.attributes.len(), 2);
        assert_eq!(a.attribute("id").unwrap().attribute_type, AttributeType::Id);
        assert_eq!(
            a.attribute("kind").unwrap().default,
            AttributeDefault::Default("x".into())
        );
        assert_eq!(
            decls.element("b").unwrap().attribute("dir").unwrap().attribute_type,
            AttributeType::Enumerated(vec!["in".into(), "out".into()])
        );
    }

    #[test]
    fn test_parameter_entity_inside_content_model_and_literal() {
        let decls = parse(
            r#"<!ENTITY % inline "em | code">
               <!ENTITY % mixed "(#PCDATA | %inline;)*">
               <!ELEMENT p %mixed;>
               <!ENTITY note "100%inline; sure">"#,
        );
        assert_eq!(decls.element("p").unwrap().content_spec(), Some("(#PCDATA|em|code)*"));
        // References inside quoted literals stay as written.
        assert_eq!(
            decls.entity("note").unwrap().kind,
            EntityKind::Internal("100%inline; sure".into())
        );
    }

    #[test]
    fn test_parameter_entity_reference_errors() {
        let mut decls = DtdDecls::new();
        let err = parse_declarations("<!ELEMENT a EMPTY>\n<!ATTLIST a %missing;>", &mut decls)
            .unwrap_err();
        assert!(err.message.contains("%missing;"), "{}", err);
        assert_eq!(err.offset, 19);

        // A declaration built from an external parameter entity is skipped.
        let decls = parse(
            r#"<!ENTITY % ext SYSTEM "ext.ent">
               <!ATTLIST a %ext;>
               <!ELEMENT b ANY>"#,
        );
        assert!(decls.element("a").is_none());
        assert!(decls.element("b").is_some());
    }

    #[test]
    fn test_conditional_sections() {
        let decls = parse(
            r#"<!ENTITY % draft "IGNORE">
               <![ INCLUDE [
                 <!ELEMENT kept ANY>
                 <![ IGNORE [ <!ELEMENT nested-ignored ANY> <![ INCLUDE [ ]]> ]]>
               ]]>
               <![IGNORE[ <!ELEMENT dropped ANY> ]]>
               <![ %draft; [ <!ELEMENT draft-only ANY> ]]>
               <!ELEMENT after ANY>"#,
        );
        assert!(decls.element("kept").is_some());
        assert!(decls.element("nested-ignored").is_none());
        assert!(decls.element("dropped").is_none());
        assert!(decls.element("draft-only").is_none());
        assert!(decls.element("after").is_some());
    }

    #[test]
    fn test_conditional_section_errors() {
        let mut decls = DtdDecls::new();
        assert!(parse_declarations("<![ INCLUDE [ <!ELEMENT a ANY>", &mut decls).is_err());
        let err = parse_declarations("<![ MAYBE [ ]]>", &mut decls).unwrap_err();
        assert!(err.message.contains("MAYBE"));
        assert_eq!(err.offset, 0);
    }
}
