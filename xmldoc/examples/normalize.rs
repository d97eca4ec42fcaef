//! Example: Read an XML document and write it back out normalized
//!
//! Parse errors and warnings go to stderr; the rewritten document, with its
//! DTD rebuilt inline when it has no external one, goes to stdout.
//!
//! Usage: cargo run --example normalize <document.xml>

use std::env;
use std::io;

use xmldoc::{XmlDocument, XmlReader, XmlWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <document.xml>", args[0]);
        std::process::exit(1);
    }

    let mut document = XmlDocument::from_file(&args[1]);
    let mut reader = XmlReader::new();

    eprintln!("Parsing: {}", args[1]);
    reader.parse(&mut document)?;

    for warning in reader.warnings() {
        eprintln!("warning: {}", warning);
    }
    for error in reader.errors() {
        eprintln!("error: {}", error);
    }
    if document.root().is_none() {
        eprintln!("No root element found");
        std::process::exit(1);
    }

    XmlWriter::new().write(&document, &mut io::stdout())?;

    if reader.error_count() > 0 {
        std::process::exit(2);
    }
    Ok(())
}
