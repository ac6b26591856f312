//! Python import statement extraction

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::dependency::normalize_name;

lazy_static! {
    static ref IMPORT_RE: Regex =
        Regex::new(r"^import\s+(.+)$").expect("valid import regex");

    static ref FROM_RE: Regex =
        Regex::new(r"^from\s+([A-Za-z_][\w.]*)\s+import\s+(.+)$").expect("valid from-import regex");

    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_]\w*$").expect("valid identifier regex");
}

/// Distribution names whose import name differs from the project name
/// (keys in normalized form)
const IMPORT_ALIASES: &[(&str, &[&str])] = &[
    ("beautifulsoup4", &["bs4"]),
    ("pillow", &["PIL"]),
    ("scikit-learn", &["sklearn"]),
    ("scikit-image", &["skimage"]),
    ("opencv-python", &["cv2"]),
    ("opencv-python-headless", &["cv2"]),
    ("opencv-contrib-python", &["cv2"]),
    ("pyyaml", &["yaml"]),
    ("python-dateutil", &["dateutil"]),
    ("python-dotenv", &["dotenv"]),
    ("pytorch", &["torch"]),
    ("torch", &["torch"]),
    ("psycopg2-binary", &["psycopg2"]),
    ("protobuf", &["google.protobuf"]),
    ("pyjwt", &["jwt"]),
    ("attrs", &["attr", "attrs"]),
    ("pyopenssl", &["OpenSSL"]),
    ("pycryptodome", &["Crypto"]),
    ("pyserial", &["serial"]),
    ("pyzmq", &["zmq"]),
    ("msgpack-python", &["msgpack"]),
    ("kafka-python", &["kafka"]),
    ("django-rest-framework", &["rest_framework"]),
    ("djangorestframework", &["rest_framework"]),
    ("apache-airflow", &["airflow"]),
    ("google-cloud-storage", &["google.cloud.storage"]),
    ("azure-storage-blob", &["azure.storage.blob"]),
    ("grpcio", &["grpc"]),
    ("setuptools", &["setuptools", "pkg_resources"]),
];

/// Candidate import names for a distribution, most specific first
pub fn import_names_for(distribution: &str) -> Vec<String> {
    let normalized = normalize_name(distribution);
    let mut names: Vec<String> = IMPORT_ALIASES
        .iter()
        .find(|(dist, _)| *dist == normalized)
        .map(|(_, modules)| modules.iter().map(|m| m.to_string()).collect())
        .unwrap_or_default();

    let default = normalized.replace('-', "_");
    if !names.contains(&default) {
        names.push(default);
    }

    // Namespace packages such as zope.interface
    let dotted = distribution.trim().to_lowercase();
    if dotted.contains('.') && !names.contains(&dotted) {
        names.push(dotted);
    }

    names
}

/// One import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Full dotted module path
    pub module: String,
    /// Names imported with `from ... import`
    pub names: Vec<String>,
    /// Local names bound by the statement
    pub bindings: Vec<String>,
}

impl Import {
    /// First component of the module path
    pub fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or(&self.module)
    }
}

/// Extract absolute imports from Python source
///
/// Relative imports are skipped. Parenthesised and backslash-continued
/// statements are joined first.
pub fn parse_imports(source: &str) -> Vec<Import> {
    let mut imports = Vec::new();

    for statement in import_statements(source) {
        if let Some(caps) = FROM_RE.captures(&statement) {
            let module = caps[1].to_string();
            let mut names = Vec::new();
            let mut bindings = Vec::new();

            for item in caps[2].trim_matches(|c| c == '(' || c == ')' || c == ' ').split(',') {
                let (name, alias) = split_alias(item);
                if name == "*" || !IDENT_RE.is_match(name) {
                    continue;
                }
                names.push(name.to_string());
                bindings.push(alias.unwrap_or(name).to_string());
            }

            imports.push(Import { module, names, bindings });
        } else if let Some(caps) = IMPORT_RE.captures(&statement) {
            for item in caps[1].split(',') {
                let (module, alias) = split_alias(item);
                if module.is_empty() || module.starts_with('.') {
                    continue;
                }
                let binding = alias
                    .unwrap_or_else(|| module.split('.').next().unwrap_or(module))
                    .to_string();
                imports.push(Import {
                    module: module.to_string(),
                    names: Vec::new(),
                    bindings: vec![binding],
                });
            }
        }
    }

    imports
}

/// Attribute names accessed as `binding.attr`
pub fn attribute_accesses(source: &str, bindings: &[String]) -> Vec<(String, String)> {
    let valid: Vec<String> = bindings
        .iter()
        .filter(|b| IDENT_RE.is_match(b))
        .map(|b| regex::escape(b))
        .collect();
    if valid.is_empty() {
        return Vec::new();
    }

    let pattern = format!(r"\b({})\.([A-Za-z_]\w*)", valid.join("|"));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!("Skipping attribute scan: {}", e);
            return Vec::new();
        }
    };

    re.captures_iter(source)
        .filter(|caps| {
            // Not part of a longer dotted name such as `x.np.array`
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            !source[..start].ends_with('.')
        })
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

fn split_alias(item: &str) -> (&str, Option<&str>) {
    let item = item.trim();
    match item.split_once(" as ") {
        Some((name, alias)) => (name.trim(), Some(alias.trim())),
        None => (item, None),
    }
}

/// Logical `import` / `from` statements with comments removed
fn import_statements(source: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer = String::new();
    let mut depth: i32 = 0;

    for raw in source.lines() {
        let line = match raw.find('#') {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let line = line.trim();

        if buffer.is_empty() && !(line.starts_with("import ") || line.starts_with("from ")) {
            continue;
        }

        let (content, continued) = match line.strip_suffix('\\') {
            Some(rest) => (rest.trim_end(), true),
            None => (line, false),
        };

        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(content);
        depth += content.matches('(').count() as i32 - content.matches(')').count() as i32;

        if depth <= 0 && !continued {
            let statement = buffer.split_whitespace().collect::<Vec<_>>().join(" ");
            statements.push(statement.replace("( ", "(").replace(" )", ")"));
            buffer.clear();
            depth = 0;
        }
    }

    statements
}
