//! XML reading and writing.
//!
//! [`Tokenizer`] turns text into [`Handler`] callbacks, [`XmlReader`] is the
//! handler that builds an element tree into an
//! [`XmlDocument`](crate::XmlDocument), and [`XmlWriter`] serializes a
//! document back out, DTD included.

mod handler;
mod reader;
mod tokenizer;
mod writer;

pub use handler::{EntitySource, Handler, MapResourceBundle, ResourceBundle};
pub use reader::{ParseMessage, ParseState, XmlReader, XmlReaderOptions};
pub use tokenizer::{Base, Tokenizer};
pub use writer::{write_to_string, XmlWriter, XmlWriterOptions};

use std::path::PathBuf;

use crate::document::XmlDocument;
use crate::error::{Error, Result};

/// Returns the local path a document reads from and writes to, or `None` if
/// it has no location. Only `file:` URLs name a local path.
pub(crate) fn local_path(document: &XmlDocument) -> Result<Option<PathBuf>> {
    if let Some(url) = document.url() {
        if url.scheme() != "file" {
            return Err(Error::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                url: url.to_string(),
            });
        }
        return url
            .to_file_path()
            .map(Some)
            .map_err(|()| Error::InputResolution(format!("{} does not name a local file", url)));
    }
    Ok(document.file().map(|path| path.to_path_buf()))
}
