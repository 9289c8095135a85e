// Argument Parser
// Tokenizes the text after a backslash command

use super::MetaError;

/// Reads arguments one token at a time.
///
/// Tokens are separated by unquoted whitespace. Single-quoted text is
/// unquoted (`''` and backslash escapes inside it are honoured); double-quoted
/// text keeps its quotes so identifier patterns survive intact.
#[derive(Debug, Clone)]
pub struct ArgParser {
    chars: Vec<char>,
    pos: usize,
}

impl ArgParser {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn token(&mut self) -> Result<Option<String>, MetaError> {
        self.skip_whitespace();
        if self.pos >= self.chars.len() {
            return Ok(None);
        }

        let mut out = String::new();
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_whitespace() {
                break;
            }
            self.pos += 1;
            match c {
                '\'' => self.single_quoted(&mut out)?,
                '"' => self.double_quoted(&mut out)?,
                c => out.push(c),
            }
        }
        Ok(Some(out))
    }

    fn single_quoted(&mut self, out: &mut String) -> Result<(), MetaError> {
        loop {
            let c = *self.chars.get(self.pos).ok_or(MetaError::UnterminatedQuote)?;
            self.pos += 1;
            match c {
                '\'' if self.chars.get(self.pos) == Some(&'\'') => {
                    self.pos += 1;
                    out.push('\'');
                }
                '\'' => return Ok(()),
                '\\' => {
                    let e = *self.chars.get(self.pos).ok_or(MetaError::UnterminatedQuote)?;
                    self.pos += 1;
                    out.push(match e {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                c => out.push(c),
            }
        }
    }

    fn double_quoted(&mut self, out: &mut String) -> Result<(), MetaError> {
        out.push('"');
        loop {
            let c = *self.chars.get(self.pos).ok_or(MetaError::UnterminatedQuote)?;
            self.pos += 1;
            out.push(c);
            if c == '"' {
                // "" is an escaped quote, keep scanning
                if self.chars.get(self.pos) == Some(&'"') {
                    self.pos += 1;
                    out.push('"');
                    continue;
                }
                return Ok(());
            }
        }
    }

    /// Next token; an empty string once the input is exhausted
    pub fn next(&mut self) -> Result<String, MetaError> {
        Ok(self.token()?.unwrap_or_default())
    }

    /// Next token, `None` when absent. `''` yields `Some("")`.
    pub fn next_ok(&mut self) -> Result<Option<String>, MetaError> {
        self.token()
    }

    /// Consume the next token only if it is a `-flag`, returning the flag name
    pub fn next_opt(&mut self) -> Result<Option<String>, MetaError> {
        self.skip_whitespace();
        if self.chars.get(self.pos) != Some(&'-') {
            return Ok(None);
        }
        let token = self.next()?;
        Ok(Some(token[1..].to_string()))
    }

    /// Whether any token remains, without consuming it
    pub fn has_more(&self) -> bool {
        self.chars[self.pos.min(self.chars.len())..]
            .iter()
            .any(|c| !c.is_whitespace())
    }

    /// The rest of the line, untokenized
    pub fn raw(&mut self) -> String {
        let rest: String = self.chars[self.pos.min(self.chars.len())..].iter().collect();
        self.pos = self.chars.len();
        rest.trim().to_string()
    }
}
