//! Material description library
//!
//! Holds the raw `{ ... }` block of every material found in description
//! files, keyed by name (case-insensitive). The registry parses a block the
//! first time its name is resolved.

use std::collections::HashMap;

use log::{debug, error};

use super::lexer::Lexer;

/// Name to description-block map
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    sources: HashMap<String, String>,
}

impl MaterialLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from a single description file
    pub fn parse(text: &str) -> Self {
        let mut library = Self::new();
        library.add_source(text);
        library
    }

    /// Scan a description file holding any number of `name { ... }` blocks.
    ///
    /// A block without an opening brace, or one missing its closing brace,
    /// stops the scan; blocks found before it are kept. Later definitions of
    /// a name replace earlier ones. Returns the number of blocks added.
    pub fn add_source(&mut self, text: &str) -> usize {
        let mut lexer = Lexer::new(text);
        let mut added = 0;

        while let Some(token) = lexer.next_token() {
            if token.starts_with('#') {
                lexer.skip_line();
                continue;
            }

            let name = token;
            let line = lexer.line();
            if lexer.next_token() != Some("{") {
                error!("Material '{}' without brace section on line {}, aborting scan", name, line);
                break;
            }
            let start = lexer.position() - 1;
            if !lexer.skip_braced_section() {
                error!("Material '{}' seems to be missing its closing brace, aborting scan", name);
                break;
            }

            let block = lexer.slice(start, lexer.position());
            if self.sources.insert(name.to_ascii_lowercase(), block.to_string()).is_some() {
                debug!("Material '{}' redefined", name);
            }
            added += 1;
        }

        added
    }

    /// Merge another library into this one; its definitions win
    pub fn merge(&mut self, other: MaterialLibrary) {
        self.sources.extend(other.sources);
    }

    /// Description block for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether `name` has a description
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of described materials
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "
// world surfaces
textures/base/floor
{
    {
        map textures/base/floor.tga
    }
}

# editor comment
Textures/Base/Light { { map light.tga blendFunc GL_ONE GL_ONE } }
";

    #[test]
    fn test_scan_blocks() {
        let library = MaterialLibrary::parse(FILE);
        assert_eq!(library.len(), 2);
        let floor = library.get("textures/base/floor").unwrap();
        assert!(floor.starts_with('{') && floor.ends_with('}'));
        assert!(floor.contains("floor.tga"));
        assert!(library.contains("textures/base/light"));
    }

    #[test]
    fn test_scan_stops_at_missing_brace() {
        let library = MaterialLibrary::parse("good { { map a } }\nbroken map b\nlater { }");
        assert_eq!(library.len(), 1);
        assert!(library.contains("good"));
        assert!(!library.contains("later"));

        let unclosed = MaterialLibrary::parse("first { }\nsecond { { map a }");
        assert_eq!(unclosed.len(), 1);
    }

    #[test]
    fn test_later_definition_wins() {
        let mut library = MaterialLibrary::parse("x { { map a } }");
        library.merge(MaterialLibrary::parse("X { { map b } }"));
        assert_eq!(library.len(), 1);
        assert!(library.get("x").unwrap().contains("map b"));
    }
}
