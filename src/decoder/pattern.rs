use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern length must be 8, got {0}")]
    BadLength(usize),
    #[error("variable '{0}' reopened after its field closed")]
    DuplicateField(char),
}

/// A named, contiguous run of bits inside a template. `msb` is the highest
/// bit position the field occupies; extraction right-justifies the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarField {
    pub name: char,
    pub msb: u8,
    pub width: u8,
    pub mask: u8,
}

impl VarField {
    pub fn extract(&self, value: u8) -> u8 {
        (value & self.mask) >> (self.msb + 1 - self.width)
    }
}

/// An 8-bit opcode template: constant bits (`0`/`1`) plus named variable
/// fields (`a`..`z`). Written most-significant-bit first, e.g. `"00dd0001"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePattern {
    const_mask: u8,
    const_val: u8,
    text: String,
    vars: Vec<VarField>,
    is_constant: bool,
}

impl BytePattern {
    pub fn parse(text: &str) -> Result<BytePattern, PatternError> {
        if text.chars().count() != 8 {
            return Err(PatternError::BadLength(text.chars().count()));
        }

        let mut const_mask = 0u8;
        let mut const_val = 0u8;
        let mut vars: Vec<VarField> = Vec::new();
        let mut open: Option<char> = None;

        for (i, ch) in text.chars().enumerate() {
            let bit = 7 - i as u8;
            match ch {
                '0' => {
                    const_mask |= 1 << bit;
                    open = None;
                }
                '1' => {
                    const_mask |= 1 << bit;
                    const_val |= 1 << bit;
                    open = None;
                }
                'a'..='z' if open == Some(ch) => {
                    // Extends the currently open field by one bit.
                    if let Some(field) = vars.last_mut() {
                        field.width += 1;
                        field.mask |= 1 << bit;
                    }
                }
                'a'..='z' => {
                    if vars.iter().any(|v| v.name == ch) {
                        return Err(PatternError::DuplicateField(ch));
                    }
                    vars.push(VarField {
                        name: ch,
                        msb: bit,
                        width: 1,
                        mask: 1 << bit,
                    });
                    open = Some(ch);
                }
                // Anything else closes the open field and fixes nothing.
                _ => open = None,
            }
        }

        Ok(BytePattern {
            const_mask,
            const_val,
            text: text.to_string(),
            vars,
            is_constant: const_mask == 0xFF,
        })
    }

    pub fn test(&self, value: u8) -> bool {
        (value & self.const_mask) == self.const_val
    }

    pub fn const_mask(&self) -> u8 {
        self.const_mask
    }

    pub fn const_val(&self) -> u8 {
        self.const_val
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    pub fn var(&self, name: char) -> Option<&VarField> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Extracts the named field from a concrete byte. Every handler is
    /// registered together with its template, so a missing name is a
    /// construction bug, not a runtime input.
    pub fn extract(&self, name: char, value: u8) -> u8 {
        match self.var(name) {
            Some(field) => field.extract(value),
            None => unreachable!("pattern \"{}\" has no field '{}'", self.text, name),
        }
    }
}
