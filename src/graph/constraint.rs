//! Build constraints: which `.go` files take part in a build.
//!
//! A file is excluded when its name carries a `_GOOS`, `_GOARCH` or
//! `_GOOS_GOARCH` suffix for another platform, or when the `//go:build`
//! expression (or, failing that, the `// +build` lines) in its header does
//! not hold. Tags other than the platform, `cgo`, `gc`, `unix` and `go1.N`
//! release tags are false, so `ignore` and `appengine` never match.

use regex::Regex;
use std::sync::LazyLock;

static CONSTRAINT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^//(?:go:build\s+(?P<expr>.+)|\s*\+build\s+(?P<opts>.+))$")
        .expect("valid constraint line regex")
});

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Target platform files are selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: &'static str,
    pub goarch: &'static str,
    pub cgo: bool,
}

impl BuildContext {
    /// The platform gvend itself runs on, named the way Go names it.
    pub const HOST: BuildContext = BuildContext {
        goos: host_goos(),
        goarch: host_goarch(),
        cgo: true,
    };

    pub const fn new(goos: &'static str, goarch: &'static str) -> Self {
        Self {
            goos,
            goarch,
            cgo: true,
        }
    }

    pub fn matches_tag(&self, tag: &str) -> bool {
        match tag {
            t if t == self.goos || t == self.goarch => true,
            "cgo" => self.cgo,
            "gc" => true,
            "unix" => UNIX_OS.contains(&self.goos),
            "linux" => self.goos == "android",
            "darwin" => self.goos == "ios",
            "solaris" => self.goos == "illumos",
            t => t
                .strip_prefix("go1.")
                .is_some_and(|minor| minor.parse::<u32>().is_ok()),
        }
    }

    /// Whether the `_GOOS` / `_GOARCH` suffixes of `name` fit this context.
    pub fn matches_file_name(&self, name: &str) -> bool {
        let stem = name.split('.').next().unwrap_or(name);
        let Some(idx) = stem.find('_') else {
            return true;
        };
        let mut parts: Vec<&str> = stem[idx..].split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }

        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches_tag(parts[n - 2]) && self.matches_tag(parts[n - 1]);
        }
        match parts.last() {
            Some(last) if KNOWN_OS.contains(last) || KNOWN_ARCH.contains(last) => {
                self.matches_tag(last)
            }
            _ => true,
        }
    }

    /// Evaluates the constraints in the comment header of `src`.
    ///
    /// A `//go:build` line takes precedence over `// +build` lines. A
    /// malformed expression excludes the file.
    pub fn matches_source(&self, src: &str) -> bool {
        let mut plus_build = Vec::new();
        for line in header_comments(src) {
            let Some(caps) = CONSTRAINT_LINE.captures(line) else {
                continue;
            };
            if let Some(expr) = caps.name("expr") {
                return self.eval(expr.as_str()).unwrap_or(false);
            }
            if let Some(opts) = caps.name("opts") {
                plus_build.push(opts.as_str());
            }
        }
        plus_build.iter().all(|opts| self.eval_plus_build(opts))
    }

    /// `// +build` syntax: space-separated alternatives of comma-separated
    /// terms, each optionally negated with `!`.
    fn eval_plus_build(&self, opts: &str) -> bool {
        opts.split_whitespace().any(|alt| {
            alt.split(',').all(|term| match term.strip_prefix('!') {
                Some(tag) => !tag.is_empty() && !tag.starts_with('!') && !self.matches_tag(tag),
                None => !term.is_empty() && self.matches_tag(term),
            })
        })
    }

    fn eval(&self, expr: &str) -> Option<bool> {
        let tokens = tokenize(expr)?;
        let mut parser = ExprParser {
            ctx: self,
            tokens: &tokens,
            pos: 0,
        };
        let value = parser.or()?;
        (parser.pos == tokens.len()).then_some(value)
    }
}

const fn host_goos() -> &'static str {
    if cfg!(target_os = "macos") {
        "darwin"
    } else {
        std::env::consts::OS
    }
}

const fn host_goarch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "amd64"
    } else if cfg!(target_arch = "x86") {
        "386"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "loongarch64") {
        "loong64"
    } else if cfg!(target_arch = "wasm32") {
        "wasm"
    } else if cfg!(all(target_arch = "powerpc64", target_endian = "little")) {
        "ppc64le"
    } else if cfg!(target_arch = "powerpc64") {
        "ppc64"
    } else if cfg!(target_arch = "powerpc") {
        "ppc"
    } else if cfg!(all(target_arch = "mips", target_endian = "little")) {
        "mipsle"
    } else if cfg!(all(target_arch = "mips64", target_endian = "little")) {
        "mips64le"
    } else {
        std::env::consts::ARCH
    }
}

/// Line comments before the package clause, trimmed. Block comments are
/// skipped over.
fn header_comments(src: &str) -> Vec<&str> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let mut lines = Vec::new();
    let mut in_block = false;
    for line in src.lines() {
        let line = line.trim();
        if in_block {
            in_block = !line.contains("*/");
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if line.starts_with("//") {
            lines.push(line);
        } else if line.starts_with("/*") {
            in_block = !line.contains("*/");
        } else {
            break;
        }
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Not,
    And,
    Or,
    Open,
    Close,
    Tag(&'a str),
}

fn tokenize(expr: &str) -> Option<Vec<Token<'_>>> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let token = match b {
            b' ' | b'\t' => {
                i += 1;
                continue;
            }
            b'!' => Token::Not,
            b'(' => Token::Open,
            b')' => Token::Close,
            b'&' if bytes.get(i + 1) == Some(&b'&') => {
                i += 1;
                Token::And
            }
            b'|' if bytes.get(i + 1) == Some(&b'|') => {
                i += 1;
                Token::Or
            }
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                tokens.push(Token::Tag(&expr[start..i]));
                continue;
            }
            _ => return None,
        };
        tokens.push(token);
        i += 1;
    }
    Some(tokens)
}

/// Recursive descent over `||`, `&&`, `!` and parentheses.
struct ExprParser<'t, 'a> {
    ctx: &'t BuildContext,
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'a> ExprParser<'_, 'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn or(&mut self) -> Option<bool> {
        let mut value = self.and()?;
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            value |= self.and()?;
        }
        Some(value)
    }

    fn and(&mut self) -> Option<bool> {
        let mut value = self.not()?;
        while self.peek() == Some(Token::And) {
            self.pos += 1;
            value &= self.not()?;
        }
        Some(value)
    }

    fn not(&mut self) -> Option<bool> {
        let token = self.peek()?;
        self.pos += 1;
        match token {
            Token::Not => self.not().map(|v| !v),
            Token::Open => {
                let value = self.or()?;
                (self.peek() == Some(Token::Close)).then(|| {
                    self.pos += 1;
                    value
                })
            }
            Token::Tag(tag) => Some(self.ctx.matches_tag(tag)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX: BuildContext = BuildContext::new("linux", "amd64");
    const WINDOWS: BuildContext = BuildContext::new("windows", "arm64");

    #[test]
    fn test_file_name_suffixes() {
        assert!(LINUX.matches_file_name("sys.go"));
        assert!(LINUX.matches_file_name("sys_linux.go"));
        assert!(LINUX.matches_file_name("sys_amd64.go"));
        assert!(LINUX.matches_file_name("sys_linux_amd64.go"));
        assert!(LINUX.matches_file_name("sys_unix.go"));
        assert!(LINUX.matches_file_name("zerrors_linux_test.go"));
        assert!(!LINUX.matches_file_name("sys_windows.go"));
        assert!(!LINUX.matches_file_name("sys_arm64.go"));
        assert!(!LINUX.matches_file_name("sys_linux_arm64.go"));
        assert!(!LINUX.matches_file_name("sys_windows_test.go"));
        assert!(WINDOWS.matches_file_name("sys_windows.go"));
        assert!(!WINDOWS.matches_file_name("sys_windows_amd64.go"));
    }

    #[test]
    fn test_platform_aliases() {
        let android = BuildContext::new("android", "arm64");
        assert!(android.matches_file_name("x_linux.go"));
        assert!(android.matches_tag("unix"));
        assert!(!WINDOWS.matches_tag("unix"));
        assert!(LINUX.matches_tag("go1.21"));
        assert!(!LINUX.matches_tag("go2"));
        assert!(!LINUX.matches_tag("appengine"));
        assert!(!LINUX.matches_tag("ignore"));
    }

    #[test]
    fn test_go_build_expressions() {
        let src = |expr: &str| format!("//go:build {}\n\npackage p\n", expr);
        assert!(LINUX.matches_source(&src("linux")));
        assert!(LINUX.matches_source(&src("linux && (amd64 || arm64)")));
        assert!(LINUX.matches_source(&src("!windows && cgo")));
        assert!(LINUX.matches_source(&src("unix && !appengine")));
        assert!(!LINUX.matches_source(&src("ignore")));
        assert!(!LINUX.matches_source(&src("appengine")));
        assert!(!LINUX.matches_source(&src("linux && !amd64")));
        assert!(!LINUX.matches_source(&src("linux &&")));
        assert!(!LINUX.matches_source(&src("(linux")));
    }

    #[test]
    fn test_plus_build_lines() {
        assert!(!LINUX.matches_source("// +build appengine\n\npackage mysql\n"));
        assert!(LINUX.matches_source("// +build !appengine\n\npackage mysql\n"));
        assert!(LINUX.matches_source("// +build windows linux,amd64\n\npackage p\n"));
        assert!(!LINUX.matches_source("// +build linux\n// +build arm64\n\npackage p\n"));
        assert!(!LINUX.matches_source("// +build ignore\n\npackage main\n"));
    }

    #[test]
    fn test_go_build_wins_over_plus_build() {
        let src = "//go:build linux\n// +build windows\n\npackage p\n";
        assert!(LINUX.matches_source(src));
    }

    #[test]
    fn test_only_header_counts() {
        let src = "// Copyright 2020.\n/*\nlicense\n*/\n\n// +build windows\n\npackage p\n";
        assert!(!LINUX.matches_source(src));
        assert!(LINUX.matches_source("package p\n\n// +build windows\n"));
        assert!(!LINUX.matches_source("\u{feff}//go:build windows\n\npackage p\n"));
    }
}
