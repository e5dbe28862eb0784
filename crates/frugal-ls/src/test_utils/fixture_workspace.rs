//! Deterministic fixture workspace generator for benchmarks and tests.
//!
//! Generates synthetic Frugal workspaces with controlled characteristics:
//! file count, structs per file and include chains. Files live under a
//! virtual `/fixture` root and are opened straight into a `WorldState`,
//! nothing touches the filesystem.
//!
//! All output is deterministic so benchmarks are reproducible.

use std::fmt::Write;

use tower_lsp::lsp_types::Url;

use crate::state::WorldState;

/// Configuration for generating a fixture workspace.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub file_count: usize,
    pub structs_per_file: usize,
    pub include_chain_depth: usize,
}

impl FixtureConfig {
    /// Small workspace: 10 files, 5 structs each, include chain depth 3.
    pub fn small() -> Self {
        Self {
            file_count: 10,
            structs_per_file: 5,
            include_chain_depth: 3,
        }
    }

    /// Medium workspace: 50 files, 10 structs each, include chain depth 10.
    pub fn medium() -> Self {
        Self {
            file_count: 50,
            structs_per_file: 10,
            include_chain_depth: 10,
        }
    }

    /// Large workspace: 200 files, 20 structs each, include chain depth 15.
    pub fn large() -> Self {
        Self {
            file_count: 200,
            structs_per_file: 20,
            include_chain_depth: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixtureFile {
    pub uri: Url,
    pub text: String,
}

pub fn fixture_uri(index: usize) -> Url {
    // Url::parse on a literal file URL cannot fail
    Url::parse(&format!("file:///fixture/file_{}.frugal", index)).unwrap()
}

/// Generate the content of a single Frugal file deterministically.
///
/// File `i` includes file `i + 1` while `i` is within the include chain.
pub fn generate_frugal_file_content(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();

    if index < config.include_chain_depth && index + 1 < config.file_count {
        writeln!(content, "include \"file_{}.frugal\"", index + 1).unwrap();
        content.push('\n');
    }

    writeln!(content, "namespace go fixture_{}", index).unwrap();
    writeln!(content, "const i32 LIMIT_{} = {}", index, index + 10).unwrap();
    content.push('\n');

    writeln!(content, "enum Status_{} {{", index).unwrap();
    writeln!(content, "    ACTIVE = 1,").unwrap();
    writeln!(content, "    INACTIVE").unwrap();
    writeln!(content, "}}").unwrap();
    content.push('\n');

    writeln!(content, "exception Error_{} {{", index).unwrap();
    writeln!(content, "    1: string message").unwrap();
    writeln!(content, "}}").unwrap();
    content.push('\n');

    for struct_i in 0..config.structs_per_file {
        writeln!(content, "struct Item_{}_{} {{", index, struct_i).unwrap();
        writeln!(content, "    1: required string name,").unwrap();
        writeln!(content, "    2: optional i64 id = {}", struct_i).unwrap();
        writeln!(content, "}}").unwrap();
        content.push('\n');
    }

    writeln!(content, "service Service_{} {{", index).unwrap();
    for struct_i in 0..config.structs_per_file {
        writeln!(
            content,
            "    Item_{0}_{1} get_{0}_{1}(1: i64 id) throws (1: Error_{0} err)",
            index, struct_i
        )
        .unwrap();
    }
    writeln!(content, "}}").unwrap();
    content.push('\n');

    writeln!(content, "scope Events_{} {{", index).unwrap();
    writeln!(content, "    Created_{}: Item_{}_0", index, index).unwrap();
    writeln!(content, "}}").unwrap();

    content
}

/// Number of symbols the index holds for file `index`
pub fn expected_symbol_count(index: usize, config: &FixtureConfig) -> usize {
    let include = usize::from(index < config.include_chain_depth && index + 1 < config.file_count);
    // namespace, const, enum + 2 values, exception + field, service, scope + event
    let fixed = 10;
    // each struct has 2 fields and a service method
    include + fixed + config.structs_per_file * 4
}

pub fn generate_fixture_workspace(config: &FixtureConfig) -> Vec<FixtureFile> {
    (0..config.file_count)
        .map(|i| FixtureFile {
            uri: fixture_uri(i),
            text: generate_frugal_file_content(i, config),
        })
        .collect()
}

/// Open every fixture file in `state` at version 1.
pub fn open_fixture_workspace(state: &WorldState, config: &FixtureConfig) -> Vec<Url> {
    generate_fixture_workspace(config)
        .into_iter()
        .map(|file| {
            state
                .open_document(file.uri.clone(), &file.text, 1)
                .unwrap_or_else(|e| panic!("Failed to open fixture file {}: {}", file.uri, e));
            file.uri
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_small_preset_values() {
        let config = FixtureConfig::small();
        assert_eq!(config.file_count, 10);
        assert_eq!(config.structs_per_file, 5);
        assert_eq!(config.include_chain_depth, 3);
    }

    #[test]
    fn test_deterministic_output() {
        let config = FixtureConfig::small();
        let first = generate_fixture_workspace(&config);
        let second = generate_fixture_workspace(&config);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.uri, b.uri);
            assert_eq!(a.text, b.text, "{} should be identical across runs", a.uri);
        }
    }

    #[test]
    fn test_include_chain_structure() {
        let config = FixtureConfig {
            file_count: 5,
            structs_per_file: 1,
            include_chain_depth: 3,
        };
        let files = generate_fixture_workspace(&config);
        assert!(files[0].text.contains("include \"file_1.frugal\""));
        assert!(files[2].text.contains("include \"file_3.frugal\""));
        assert!(!files[3].text.contains("include"));
        assert!(!files[4].text.contains("include"));
    }

    #[test]
    fn test_generated_files_parse_without_errors() {
        for file in generate_fixture_workspace(&FixtureConfig::small()) {
            let out = parse(&file.text);
            assert!(
                out.errors.is_empty(),
                "{} should parse without errors: {:?}\n{}",
                file.uri,
                out.errors,
                file.text
            );
        }
    }

    #[test]
    fn test_open_fixture_workspace_indexes_everything() {
        let config = FixtureConfig::small();
        let state = WorldState::default();
        let uris = open_fixture_workspace(&state, &config);

        assert_eq!(uris.len(), config.file_count);
        for (i, uri) in uris.iter().enumerate() {
            assert_eq!(
                state.document_symbols(uri).len(),
                expected_symbol_count(i, &config),
                "symbol count of {}",
                uri
            );
        }
        assert_eq!(
            state.dependency_graph.get_dependencies(&uris[0]),
            vec![uris[1].clone()]
        );
    }
}
