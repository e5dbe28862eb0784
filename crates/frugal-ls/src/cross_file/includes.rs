//
// cross_file/includes.rs
//
// Include directive extraction
//

use crate::symbols::unquote;
use crate::syntax::{NodeKind, SyntaxTree};

/// An `include "path"` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    /// Include target with the quote characters stripped
    pub target: String,
    /// 0-based line of the directive
    pub line: u32,
}

/// Collect the include targets of a document in source order.
///
/// `cpp_include` directives name C++ headers, not IDL documents, and are
/// not dependencies. Includes without a (non-empty) path are skipped.
pub fn extract_includes(tree: &SyntaxTree, text: &str) -> Vec<IncludeDirective> {
    tree.children_of_kind(tree.root(), NodeKind::Include)
        .filter_map(|include| {
            let literal = tree.child_of_kind(include, NodeKind::StringLiteral)?;
            let target = unquote(tree.text(literal, text));
            if target.is_empty() {
                return None;
            }
            Some(IncludeDirective {
                target: target.to_string(),
                line: tree.start(include).line,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn targets(text: &str) -> Vec<(String, u32)> {
        let out = parse(text);
        extract_includes(&out.tree, text)
            .into_iter()
            .map(|d| (d.target, d.line))
            .collect()
    }

    #[test]
    fn test_extract_includes() {
        let text = "include \"base.frugal\"\n# comment\ninclude 'shared/common.thrift'\nstruct A {}\n";
        assert_eq!(
            targets(text),
            vec![
                ("base.frugal".to_string(), 0),
                ("shared/common.thrift".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_cpp_include_and_empty_paths_are_skipped() {
        let text = "cpp_include \"foo.h\"\ninclude \"\"\ninclude\nstruct A {}";
        assert!(targets(text).is_empty());
    }
}
