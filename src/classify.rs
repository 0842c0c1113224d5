//! binary detection and syntax classification for viewer entries
//!
//! the extension/magic-number blacklist comes from the external package
//! validator; the viewer's own allow-list exceptions for shell scripts are
//! applied on top without touching the validator's data.

/// how a file should be treated by the viewer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileCategory {
    /// displayable text
    Text,
    /// not viewable online
    Binary,
    /// binary, but an image the viewer can render
    BinaryImage,
}

impl FileCategory {
    /// binary in the "not textually diffable" sense
    pub fn is_binary(&self) -> bool {
        matches!(self, FileCategory::Binary | FileCategory::BinaryImage)
    }
}

/// extension and magic-number blacklist supplied by the package validator
#[derive(Clone, Debug)]
pub struct Blacklist {
    extensions: Vec<String>,
    magic_numbers: Vec<Vec<u8>>,
}

/// shebang prefix
const SHEBANG: &[u8] = &[0x23, 0x21];

/// extensions the viewer allows through even when the validator
/// blacklists them; the shebang magic number is exempted only for these
const ALLOWED_EXTENSIONS: &[&str] = &["sh"];

impl Blacklist {
    /// build from the validator's raw lists
    pub fn new(extensions: Vec<String>, magic_numbers: Vec<Vec<u8>>) -> Self {
        Self {
            extensions,
            magic_numbers,
        }
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    pub fn matches_magic(&self, prefix: &[u8]) -> bool {
        self.magic_numbers
            .iter()
            .any(|m| prefix.len() >= m.len() && &prefix[..m.len()] == m.as_slice())
    }
}

impl Default for Blacklist {
    /// the validator's stock lists
    fn default() -> Self {
        let extensions = ["dll", "exe", "dylib", "so", "sh", "class", "swf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let magic_numbers = vec![
            vec![0x4d, 0x5a],             // windows/dos executable
            vec![0x5a, 0x4d],             // alternate byte order
            vec![0x7f, 0x45, 0x4c, 0x46], // elf
            SHEBANG.to_vec(),
            vec![0xca, 0xfe, 0xba, 0xbe], // java class / fat mach-o
            vec![0xfe, 0xed, 0xfa, 0xce], // mach-o
            vec![0xce, 0xfa, 0xed, 0xfe], // mach-o reverse
            vec![0x43, 0x57, 0x53],       // compressed flash
            vec![0x46, 0x57, 0x53],       // uncompressed flash
        ];
        Self::new(extensions, magic_numbers)
    }
}

/// lowercase extension without the dot
fn extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// decide whether a file can be shown as text
///
/// rules in order: blacklisted extension, blacklisted magic number, image
/// mimetype, otherwise text. allow-listed extensions pass the extension
/// check, and for them alone the shebang magic number is exempt too, so a
/// shebang under any other extension stays binary.
pub fn classify(
    blacklist: &Blacklist,
    filename: &str,
    mimetype: &str,
    prefix: &[u8],
) -> FileCategory {
    let ext = extension(filename);
    let ext_allowed = ALLOWED_EXTENSIONS.contains(&ext.as_str());

    if !ext.is_empty() && blacklist.has_extension(&ext) && !ext_allowed {
        return FileCategory::Binary;
    }

    if blacklist.matches_magic(prefix) && !(prefix.starts_with(SHEBANG) && ext_allowed) {
        return FileCategory::Binary;
    }

    if mimetype.split('/').next() == Some("image") {
        return FileCategory::BinaryImage;
    }

    FileCategory::Text
}

/// syntaxes the highlighter ships brushes for
const KNOWN_SYNTAXES: &[&str] = &[
    "actionscript3", "as3", "bash", "shell", "cpp", "c", "c#", "c-sharp", "csharp", "css",
    "diff", "html", "java", "javascript", "js", "jscript", "patch", "pas", "php", "plain",
    "py", "python", "sass", "scss", "text", "sql", "vb", "vbnet", "xml", "xhtml", "xslt",
];

/// map a filename to a syntax-highlighter label
///
/// a few mozilla-specific extensions are remapped to the closest brush;
/// everything unknown falls back to "plain".
pub fn syntax_for(filename: &str) -> &'static str {
    let ext = extension(filename);
    let short = match ext.as_str() {
        "xul" | "rdf" => "xml",
        "jsm" | "json" => "js",
        other => other,
    };
    KNOWN_SYNTAXES
        .iter()
        .find(|known| **known == short)
        .copied()
        .unwrap_or("plain")
}

/// extension to mimetype table for the formats the registry serves
const MIME_TYPES: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("gif", "image/gif"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("jsm", "application/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("png", "image/png"),
    ("rdf", "application/rdf+xml"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("webp", "image/webp"),
    ("xhtml", "application/xhtml+xml"),
    ("xml", "application/xml"),
    ("xul", "application/vnd.mozilla.xul+xml"),
];

/// guess a mimetype from the filename, octet-stream when unknown
pub fn mime_for(filename: &str) -> &'static str {
    let ext = extension(filename);
    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, m)| *m)
        .unwrap_or("application/octet-stream")
}
