//! Static import scan of Python sources.
//!
//! Parses a file with the tree-sitter Python grammar and collects the root
//! module name of every absolute `import` / `from ... import` statement,
//! wherever it appears (module level, inside functions, under `if`/`try`).
//! A file that cannot be read or does not parse yields an empty set.

use std::{collections::BTreeSet, fs, path::Path};

use tracing::warn;
use tree_sitter::{Node, Parser};

/// Distinct root module names referenced by one source file.
pub type ImportSet = BTreeSet<String>;

/// Extract the imports of the file at `path`. Never fails; problems are logged.
pub fn extract_imports(path: &Path) -> ImportSet {
    match fs::read_to_string(path) {
        Ok(source) => match parse_imports(&source) {
            Ok(set) => set,
            Err(reason) => {
                warn!("import scan of {} failed: {}", path.display(), reason);
                ImportSet::new()
            }
        },
        Err(e) => {
            warn!("cannot read {} for import scan: {}", path.display(), e);
            ImportSet::new()
        }
    }
}

/// Same as [`extract_imports`] over an in-memory source string.
pub fn extract_imports_from_source(source: &str) -> ImportSet {
    parse_imports(source).unwrap_or_else(|reason| {
        warn!("import scan failed: {}", reason);
        ImportSet::new()
    })
}

fn parse_imports(source: &str) -> Result<ImportSet, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| format!("failed to load python grammar: {e}"))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser returned no tree".to_string())?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(format!("syntax error near line {}", first_error_line(root)));
    }
    if let Some(line) = python2_statement_line(root) {
        return Err(format!("python 2 statement near line {}", line));
    }

    let bytes = source.as_bytes();
    let mut imports = ImportSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.named_children(&mut cursor) {
                    if let Some(module) = imported_module(name, bytes) {
                        imports.insert(module);
                    }
                }
                continue;
            }
            "import_from_statement" => {
                // `relative_import` module names point at local files.
                if let Some(module) = node
                    .child_by_field_name("module_name")
                    .filter(|m| m.kind() == "dotted_name")
                    .and_then(|m| root_segment(m, bytes))
                {
                    imports.insert(module);
                }
                continue;
            }
            "future_import_statement" => {
                imports.insert("__future__".to_string());
                continue;
            }
            _ => {}
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    Ok(imports)
}

/// `import a.b` and `import a.b as c` both name module `a`.
fn imported_module(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "dotted_name" => root_segment(node, source),
        "aliased_import" => node
            .child_by_field_name("name")
            .and_then(|name| root_segment(name, source)),
        _ => None,
    }
}

fn root_segment(dotted: Node<'_>, source: &[u8]) -> Option<String> {
    let text = dotted.utf8_text(source).ok()?;
    let root = text.split('.').next()?.trim();
    (!root.is_empty()).then(|| root.to_string())
}

/// The grammar still accepts `print x` and `exec code`, which Python 3 rejects.
fn python2_statement_line(root: Node<'_>) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "print_statement" | "exec_statement") {
            return Some(node.start_position().row + 1);
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    None
}

fn first_error_line(root: Node<'_>) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    root.start_position().row + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(set: &ImportSet) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn plain_and_from_imports_reduce_to_root() {
        let src = "import os\nimport a.b.c\nfrom x.y import z\nfrom q import (r, s)\n";
        assert_eq!(names(&extract_imports_from_source(src)), vec!["a", "os", "q", "x"]);
    }

    #[test]
    fn multiple_names_and_aliases() {
        let src = "import numpy as np, pandas.core as pc, requests\n";
        assert_eq!(
            names(&extract_imports_from_source(src)),
            vec!["numpy", "pandas", "requests"]
        );
    }

    #[test]
    fn nested_and_conditional_imports_count() {
        let src = r#"
def f():
    import yaml
    return yaml

class K:
    def m(self):
        from bs4 import BeautifulSoup

if True:
    import toml
try:
    import ujson as json
except ImportError:
    import json
"#;
        assert_eq!(
            names(&extract_imports_from_source(src)),
            vec!["bs4", "json", "toml", "ujson", "yaml"]
        );
    }

    #[test]
    fn duplicates_collapse() {
        let src = "import a\nimport a.b\nfrom a.c import d\nfrom a import e\n";
        assert_eq!(names(&extract_imports_from_source(src)), vec!["a"]);
    }

    #[test]
    fn relative_imports_are_skipped() {
        let src = "from . import sibling\nfrom .pkg import thing\nfrom ..up import x\nimport real\n";
        assert_eq!(names(&extract_imports_from_source(src)), vec!["real"]);
    }

    #[test]
    fn future_import_is_reported() {
        let src = "from __future__ import annotations\nimport attr\n";
        assert_eq!(names(&extract_imports_from_source(src)), vec!["__future__", "attr"]);
    }

    #[test]
    fn syntax_error_yields_empty_set() {
        let src = "import requests\ndef broken(:\n    pass\n";
        assert!(extract_imports_from_source(src).is_empty());
    }

    #[test]
    fn python2_statements_yield_empty_set() {
        assert!(extract_imports_from_source("import requests\nprint 'hi'\n").is_empty());
        assert!(extract_imports_from_source("import numpy\nexec 'x = 1'\n").is_empty());
        assert_eq!(
            extract_imports_from_source("import requests\nprint('hi')\n"),
            ImportSet::from(["requests".to_string()])
        );
    }

    #[test]
    fn no_imports_yields_empty_set() {
        assert!(extract_imports_from_source("print(\"hi\")\n").is_empty());
    }

    #[test]
    fn unreadable_file_yields_empty_set() {
        assert!(extract_imports(Path::new("/nonexistent/dir/script.py")).is_empty());
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "import flask\nfrom django.db import models").unwrap();
        assert_eq!(names(&extract_imports(file.path())), vec!["django", "flask"]);
    }
}
