//! Constants shared by the tree, the writer and the builder framework.

/// Tag given to elements created without one.
pub const UNKNOWN_TAG: &str = "UNKNOWN";

/// Number of spaces per nesting level in serialized output.
pub const INDENT_WIDTH: usize = 4;

/// XML declaration emitted at the top of written documents.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" standalone="no"?>"#;

/// Public ID of the builder declarations DTD.
pub const BUILDER_DECLS_PUBLIC_ID: &str = "-//UC Berkeley//DTD builder 1//EN";

/// The builder declarations DTD, resolved locally through its public ID.
pub const BUILDER_DECLS_DTD: &str = "<!ELEMENT builderDecls (builder*)>\n\
<!ATTLIST builderDecls ref CDATA #IMPLIED>\n\
<!ATTLIST builder name CDATA #REQUIRED class CDATA #REQUIRED builder CDATA #REQUIRED>\n";

/// Root tag of a builder declarations document.
pub const BUILDER_DECLS_TAG: &str = "builderDecls";

/// Tag of one declaration inside a builder declarations document.
pub const BUILDER_TAG: &str = "builder";

/// Default bound on nested entity expansion.
pub const MAX_ENTITY_DEPTH: usize = 16;
