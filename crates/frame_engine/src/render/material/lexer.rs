//! Line-aware tokenizer for material descriptions
//!
//! Tokens are whitespace separated words, quoted strings, and the single
//! character tokens `{ } ( )`. `//` and `/* */` comments are skipped.
//! Directives are line oriented, so the lexer can be asked for the next token
//! on the current line only.

/// Tokenizer over a material description
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    /// Start at the beginning of `src`
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    /// Current 1-based line number
    pub fn line(&self) -> usize {
        self.line
    }

    /// Byte offset of the cursor
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Source text between two byte offsets
    pub fn slice(&self, from: usize, to: usize) -> &'a str {
        &self.src[from..to]
    }

    /// Next token anywhere ahead, `None` at end of input
    pub fn next_token(&mut self) -> Option<&'a str> {
        if self.skip_space(true) {
            Some(self.read_token())
        } else {
            None
        }
    }

    /// Next token on the current line, `None` at end of line
    pub fn next_on_line(&mut self) -> Option<&'a str> {
        if self.skip_space(false) {
            Some(self.read_token())
        } else {
            None
        }
    }

    /// Next directive argument: a token on the current line that is not a
    /// brace. A brace is left unread so a one-line block still closes.
    pub fn next_arg(&mut self) -> Option<&'a str> {
        let (pos, line) = (self.pos, self.line);
        match self.next_on_line() {
            Some("{") | Some("}") => {
                self.pos = pos;
                self.line = line;
                None
            }
            other => other,
        }
    }

    /// Collect the remaining arguments on the current line
    pub fn rest_of_line(&mut self) -> Vec<&'a str> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_arg() {
            tokens.push(token);
        }
        tokens
    }

    /// Discard the rest of the current line
    pub fn skip_line(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    /// After an opening brace, skip to just past the matching closing brace.
    /// Returns `false` if input ends first.
    pub fn skip_braced_section(&mut self) -> bool {
        let mut depth = 1usize;
        while let Some(token) = self.next_token() {
            match token {
                "{" => depth += 1,
                "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    // Leaves the cursor on the first byte of a token. Returns false at end of
    // input, or at a line break when `cross_lines` is false.
    fn skip_space(&mut self, cross_lines: bool) -> bool {
        let bytes = self.src.as_bytes();
        loop {
            let Some(&byte) = bytes.get(self.pos) else {
                return false;
            };
            match byte {
                b'\n' => {
                    if !cross_lines {
                        return false;
                    }
                    self.line += 1;
                    self.pos += 1;
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => self.skip_line(),
                b'/' if bytes.get(self.pos + 1) == Some(&b'*') => {
                    self.pos += 2;
                    while self.pos < bytes.len()
                        && !(bytes[self.pos] == b'*' && bytes.get(self.pos + 1) == Some(&b'/'))
                    {
                        if bytes[self.pos] == b'\n' {
                            self.line += 1;
                        }
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(bytes.len());
                }
                _ => return true,
            }
        }
    }

    fn read_token(&mut self) -> &'a str {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        match bytes[start] {
            b'{' | b'}' | b'(' | b')' => {
                self.pos += 1;
                &self.src[start..self.pos]
            }
            b'"' => {
                self.pos += 1;
                let inner = self.pos;
                while self.pos < bytes.len() && bytes[self.pos] != b'"' && bytes[self.pos] != b'\n' {
                    self.pos += 1;
                }
                let token = &self.src[inner..self.pos];
                if bytes.get(self.pos) == Some(&b'"') {
                    self.pos += 1;
                }
                token
            }
            _ => {
                while self.pos < bytes.len() {
                    let b = bytes[self.pos];
                    if b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b'(' | b')') {
                        break;
                    }
                    self.pos += 1;
                }
                &self.src[start..self.pos]
            }
        }
    }
}
