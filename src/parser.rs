use crate::route::{MetadataResolver, Route};
use crate::rules::RuleSet;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use syn::{Attribute, Expr, ExprLit, ImplItem, Item, Lit, Meta, Type};
use walkdir::WalkDir;

/// AST (Abstract Syntax Tree) parser for Rust source files.
///
/// The `AstParser` uses the `syn` crate to parse handler source files so that
/// their doc comments can be attached to the operations they serve.
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses a single Rust source file into an AST.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let syntax_tree = syn::parse_file(&content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses every `.rs` file below `root`, skipping `target` and hidden
    /// directories. Files that fail to read or parse are logged and left out.
    pub fn parse_directory(root: &Path) -> Vec<ParsedFile> {
        let mut parsed = Vec::new();
        let mut failures = 0;

        let entries = WalkDir::new(root).into_iter().filter_entry(|e| {
            if e.path() == root {
                return true;
            }
            let file_name = e.file_name().to_string_lossy();
            !file_name.starts_with('.') && file_name != "target"
        });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to access path: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            match Self::parse_file(path) {
                Ok(file) => parsed.push(file),
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    failures += 1;
                }
            }
        }

        debug!(
            "Parsing complete: {} succeeded, {} failed",
            parsed.len(),
            failures
        );
        parsed
    }
}

/// Doc comments of the functions and methods in a set of parsed files.
///
/// Free functions are registered as `name` and `module::name`, where the
/// module is the enclosing inline `mod` or the file stem. Methods are
/// registered as `Type::method` and `method`. When two items share a key the
/// first one wins.
#[derive(Debug, Default)]
pub struct DocIndex {
    docs: HashMap<String, String>,
}

impl DocIndex {
    pub fn from_files(files: &[ParsedFile]) -> Self {
        let mut index = Self::default();
        for file in files {
            let module = module_name(&file.path);
            index.add_items(&file.syntax_tree.items, module.as_deref());
        }
        debug!("Indexed {} documented handlers", index.docs.len());
        index
    }

    pub fn from_directory(root: &Path) -> Self {
        Self::from_files(&AstParser::parse_directory(root))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn add_items(&mut self, items: &[Item], module: Option<&str>) {
        for item in items {
            match item {
                Item::Fn(function) => {
                    let name = function.sig.ident.to_string();
                    if let Some(doc) = doc_text(&function.attrs) {
                        if let Some(module) = module {
                            self.insert(format!("{}::{}", module, name), doc.clone());
                        }
                        self.insert(name, doc);
                    }
                }
                Item::Impl(implementation) => {
                    let Some(type_name) = type_name(&implementation.self_ty) else {
                        continue;
                    };
                    for impl_item in &implementation.items {
                        if let ImplItem::Fn(method) = impl_item {
                            if let Some(doc) = doc_text(&method.attrs) {
                                let name = method.sig.ident.to_string();
                                self.insert(format!("{}::{}", type_name, name), doc.clone());
                                self.insert(name, doc);
                            }
                        }
                    }
                }
                Item::Mod(inline) => {
                    if let Some((_, items)) = &inline.content {
                        let name = inline.ident.to_string();
                        self.add_items(items, Some(&name));
                    }
                }
                _ => {}
            }
        }
    }

    fn insert(&mut self, key: String, doc: String) {
        if self.docs.contains_key(&key) {
            debug!("Keeping first doc comment registered for {}", key);
            return;
        }
        self.docs.insert(key, doc);
    }

    /// Doc comment for a handler reference such as `UserController@show`,
    /// `App\Http\UserController@show` or `handlers::users::show`.
    pub fn lookup(&self, handler: &str) -> Option<&str> {
        let normalized = handler.replace('@', "::");
        let segments: Vec<&str> = normalized
            .split("::")
            .map(|s| s.rsplit('\\').next().unwrap_or(s).trim())
            .filter(|s| !s.is_empty())
            .collect();

        let (name, owner) = match segments.as_slice() {
            [] => return None,
            [name] => (*name, None),
            [.., owner, name] => (*name, Some(*owner)),
        };

        owner
            .and_then(|owner| self.docs.get(&format!("{}::{}", owner, name)))
            .or_else(|| self.docs.get(name))
            .map(String::as_str)
    }
}

fn module_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if matches!(stem, "mod" | "lib" | "main") {
        return path
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string);
    }
    Some(stem.to_string())
}

fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Joined `#[doc = "..."]` attributes, with the single leading space of
/// `/// text` removed
fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(name_value) => match &name_value.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(text),
                    ..
                }) => Some(text.value()),
                _ => None,
            },
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').unwrap_or(&line).to_string())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Metadata resolver that falls back to source doc comments.
///
/// Rules always come from the wrapped resolver; doc comments come from it when
/// present, otherwise from the [`DocIndex`] entry matching the route's action.
pub struct SourceMetadataResolver<'a> {
    inner: &'a dyn MetadataResolver,
    index: DocIndex,
}

impl<'a> SourceMetadataResolver<'a> {
    pub fn new(inner: &'a dyn MetadataResolver, index: DocIndex) -> Self {
        Self { inner, index }
    }
}

impl MetadataResolver for SourceMetadataResolver<'_> {
    fn doc_comment_for(&self, route: &Route) -> Option<String> {
        self.inner.doc_comment_for(route).or_else(|| {
            route
                .action
                .as_deref()
                .and_then(|action| self.index.lookup(action))
                .map(str::to_string)
        })
    }

    fn validation_rules_for(&self, route: &Route) -> RuleSet {
        self.inner.validation_rules_for(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::HttpMethod;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    fn parsed(path: &str, code: &str) -> ParsedFile {
        ParsedFile {
            path: PathBuf::from(path),
            syntax_tree: syn::parse_file(code).unwrap(),
        }
    }

    const HANDLERS: &str = r#"
        /// List users
        ///
        /// Paginated.
        pub async fn index() {}

        pub struct UserController;

        impl UserController {
            /// Show a user
            pub fn show(&self) {}

            pub fn undocumented(&self) {}
        }

        pub mod admin {
            /// Admin dashboard
            pub fn index() {}
        }
    "#;

    #[test]
    fn test_parse_invalid_rust_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "invalid.rs", "fn broken( {");
        let result = AstParser::parse_file(&file_path);

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to parse Rust syntax"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = AstParser::parse_file(Path::new("/nonexistent/file.rs"));

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_parse_directory_skips_broken_and_hidden_files() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_file(&temp_dir, "src/users.rs", "/// Ok\npub fn ok() {}");
        create_temp_file(&temp_dir, "src/broken.rs", "pub fn broken( {");
        create_temp_file(&temp_dir, "target/debug/build.rs", "pub fn built() {}");
        create_temp_file(&temp_dir, ".git/hook.rs", "pub fn hook() {}");
        create_temp_file(&temp_dir, "README.md", "# not rust");

        let files = AstParser::parse_directory(temp_dir.path());

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("src/users.rs"));
    }

    #[test]
    fn test_doc_index_keys() {
        let index = DocIndex::from_files(&[parsed("src/handlers/users.rs", HANDLERS)]);

        assert_eq!(index.lookup("index"), Some("List users\n\nPaginated."));
        assert_eq!(index.lookup("handlers::users::index"), Some("List users\n\nPaginated."));
        assert_eq!(index.lookup("admin::index"), Some("Admin dashboard"));
        assert_eq!(index.lookup("UserController@show"), Some("Show a user"));
        assert_eq!(
            index.lookup("App\\Http\\Controllers\\UserController@show"),
            Some("Show a user")
        );
        assert_eq!(index.lookup("UserController@undocumented"), None);
        assert_eq!(index.lookup(""), None);
    }

    #[test]
    fn test_module_name_for_mod_files() {
        assert_eq!(module_name(Path::new("src/orders/mod.rs")).as_deref(), Some("orders"));
        assert_eq!(module_name(Path::new("src/orders.rs")).as_deref(), Some("orders"));
    }

    struct RulesOnly;

    impl MetadataResolver for RulesOnly {
        fn doc_comment_for(&self, route: &Route) -> Option<String> {
            (route.uri == "/documented").then(|| "From manifest".to_string())
        }

        fn validation_rules_for(&self, _route: &Route) -> RuleSet {
            [("page", "integer")].into_iter().collect()
        }
    }

    #[test]
    fn test_source_resolver_falls_back_to_index() {
        let index = DocIndex::from_files(&[parsed("src/users.rs", HANDLERS)]);
        let resolver = SourceMetadataResolver::new(&RulesOnly, index);

        let from_source = Route::new("/users", vec![HttpMethod::Get]).with_action("users::index");
        let from_manifest =
            Route::new("/documented", vec![HttpMethod::Get]).with_action("users::index");
        let unresolved = Route::new("/other", vec![HttpMethod::Get]).with_action("missing");

        assert_eq!(
            resolver.doc_comment_for(&from_source).as_deref(),
            Some("List users\n\nPaginated.")
        );
        assert_eq!(
            resolver.doc_comment_for(&from_manifest).as_deref(),
            Some("From manifest")
        );
        assert!(resolver.doc_comment_for(&unresolved).is_none());
        assert_eq!(resolver.validation_rules_for(&unresolved).len(), 1);
    }
}
