//! Extraction of import declarations from Go source files.
//!
//! Only the file header is examined: the package clause followed by any
//! number of import declarations. Scanning stops at the first other
//! top-level declaration.

/// Returns the import paths declared by a Go source file, in order of
/// appearance. Duplicates are preserved.
pub fn parse_imports(src: &str) -> Vec<String> {
    let mut s = Scanner::new(src);
    let mut imports = Vec::new();

    if s.ident().as_deref() != Some("package") || s.ident().is_none() {
        return imports;
    }

    loop {
        s.skip_space(true);
        if s.ident().as_deref() != Some("import") {
            break;
        }
        s.skip_space(false);
        if s.eat(b'(') {
            loop {
                s.skip_space(true);
                if s.eat(b')') || s.at_end() {
                    break;
                }
                match s.import_spec() {
                    Some(path) => imports.push(path),
                    None => return imports,
                }
            }
        } else {
            match s.import_spec() {
                Some(path) => imports.push(path),
                None => return imports,
            }
        }
    }
    imports
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skips whitespace and comments, and also `;` when `semis` is set.
    fn skip_space(&mut self, semis: bool) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b';' if semis => self.pos += 1,
                b'/' if self.src.get(self.pos + 1) == Some(&b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'/' if self.src.get(self.pos + 1) == Some(&b'*') => {
                    self.pos += 2;
                    while !self.at_end() && !self.src[self.pos..].starts_with(b"*/") {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.src.len());
                }
                _ => break,
            }
        }
    }

    fn ident(&mut self) -> Option<String> {
        self.skip_space(false);
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80 {
                self.pos += 1;
            } else {
                break;
            }
        }
        (self.pos > start).then(|| String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        if quote != b'"' && quote != b'`' {
            return None;
        }
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let lit = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                self.pos += 1;
                return Some(lit);
            }
            if b == b'\\' && quote == b'"' {
                self.pos += 1;
            }
            if b == b'\n' && quote == b'"' {
                return None;
            }
            self.pos += 1;
        }
        None
    }

    /// `[name | "." | "_"] "path"`
    fn import_spec(&mut self) -> Option<String> {
        self.skip_space(false);
        if !self.eat(b'.') {
            self.ident();
        }
        self.skip_space(false);
        self.string()
    }
}
