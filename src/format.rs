//! printf-style templates for ASCII chunks, and C-style lenient number parsing.
//!
//! A template holds literal text around exactly one conversion:
//!
//! ```text
//! %[flags][width][.precision][length]conversion
//! ```
//!
//! - flags: `-` `+` space `#` `0`
//! - length modifiers (`h`, `l`, `ll`, `L`, `q`, `j`, `z`, `t`) are accepted and ignored
//! - conversions: `d i u x X o c` (integer), `f F e E g G` (floating), `s` (text)
//! - `%%` is a literal percent sign
//!
//! `%n`, `*` and positional (`%1$d`) arguments are rejected, as are widths or
//! precisions above [`MAX_FIELD_WIDTH`].

use std::iter::Peekable;
use std::str::Chars;

/// Largest width or precision a template may request.
pub const MAX_FIELD_WIDTH: usize = 512;

/// Argument class a conversion consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionClass {
    Integer,
    Floating,
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    alt: bool,
    zero: bool,
}

/// A parsed and sanitised template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    prefix: String,
    suffix: String,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("no conversion in {0:?}")]
    MissingConversion(String),
    #[error("more than one conversion in {0:?}")]
    MultipleConversions(String),
    #[error("conversion '%{conversion}' not allowed in {format:?}")]
    Unsupported { conversion: char, format: String },
    #[error("'*' width or precision not allowed in {0:?}")]
    StarArgument(String),
    #[error("positional argument not allowed in {0:?}")]
    Positional(String),
    #[error("field width or precision above {MAX_FIELD_WIDTH} in {0:?}")]
    TooWide(String),
    #[error("truncated conversion at end of {0:?}")]
    Truncated(String),
}

impl FormatSpec {
    /// Parse and sanitise a template.
    pub fn parse(format: &str) -> Result<Self, FormatError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut found: Option<(Flags, Option<usize>, Option<usize>, char)> = None;
        let mut chars = format.chars().peekable();

        while let Some(c) = chars.next() {
            let literal = if found.is_some() { &mut suffix } else { &mut prefix };
            if c != '%' {
                literal.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                literal.push('%');
                continue;
            }
            if found.is_some() {
                return Err(FormatError::MultipleConversions(format.to_string()));
            }

            let mut flags = Flags::default();
            while let Some(&f) = chars.peek() {
                match f {
                    '-' => flags.left = true,
                    '+' => flags.plus = true,
                    ' ' => flags.space = true,
                    '#' => flags.alt = true,
                    '0' => flags.zero = true,
                    _ => break,
                }
                chars.next();
            }
            if chars.peek() == Some(&'*') {
                return Err(FormatError::StarArgument(format.to_string()));
            }
            let width = read_number(&mut chars);
            if chars.peek() == Some(&'$') {
                return Err(FormatError::Positional(format.to_string()));
            }
            let mut precision = None;
            if chars.peek() == Some(&'.') {
                chars.next();
                if chars.peek() == Some(&'*') {
                    return Err(FormatError::StarArgument(format.to_string()));
                }
                precision = Some(read_number(&mut chars).unwrap_or(0));
            }
            if width.unwrap_or(0) > MAX_FIELD_WIDTH || precision.unwrap_or(0) > MAX_FIELD_WIDTH {
                return Err(FormatError::TooWide(format.to_string()));
            }
            while let Some(&m) = chars.peek() {
                if matches!(m, 'h' | 'l' | 'L' | 'q' | 'j' | 'z' | 't') {
                    chars.next();
                } else {
                    break;
                }
            }
            let conversion = chars
                .next()
                .ok_or_else(|| FormatError::Truncated(format.to_string()))?;
            match conversion {
                'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'c' | 'f' | 'F' | 'e' | 'E' | 'g' | 'G'
                | 's' => {}
                other => {
                    return Err(FormatError::Unsupported {
                        conversion: other,
                        format: format.to_string(),
                    })
                }
            }
            found = Some((flags, width, precision, conversion));
        }

        let (flags, width, precision, conversion) =
            found.ok_or_else(|| FormatError::MissingConversion(format.to_string()))?;
        Ok(FormatSpec {
            prefix,
            suffix,
            flags,
            width,
            precision,
            conversion,
        })
    }

    pub fn class(&self) -> ConversionClass {
        match self.conversion {
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => ConversionClass::Floating,
            's' => ConversionClass::Text,
            _ => ConversionClass::Integer,
        }
    }

    pub fn render_int(&self, v: i64) -> String {
        match self.class() {
            ConversionClass::Floating => return self.render_float(v as f64),
            ConversionClass::Text => return self.render_str(&v.to_string()),
            ConversionClass::Integer => {}
        }
        if self.conversion == 'c' {
            let c = (v as u8) as char;
            return self.finish(String::new(), String::new(), c.to_string(), false);
        }

        let (sign, mut digits, mut alt_prefix) = match self.conversion {
            'd' | 'i' => (self.sign_for(v < 0), v.unsigned_abs().to_string(), ""),
            'u' => (String::new(), (v as u32).to_string(), ""),
            'x' => (String::new(), format!("{:x}", v as u32), "0x"),
            'X' => (String::new(), format!("{:X}", v as u32), "0X"),
            _ => (String::new(), format!("{:o}", v as u32), ""),
        };
        if !self.flags.alt || v == 0 {
            alt_prefix = "";
        }
        if let Some(p) = self.precision {
            if p == 0 && v == 0 {
                digits.clear();
            } else if digits.len() < p {
                digits = format!("{}{}", "0".repeat(p - digits.len()), digits);
            }
        }
        if self.conversion == 'o' && self.flags.alt && !digits.starts_with('0') {
            digits.insert(0, '0');
        }
        let zero_pad = self.precision.is_none();
        self.finish(sign, alt_prefix.to_string(), digits, zero_pad)
    }

    pub fn render_float(&self, v: f64) -> String {
        match self.class() {
            ConversionClass::Integer => return self.render_int(v as i64),
            ConversionClass::Text => return self.render_str(&v.to_string()),
            ConversionClass::Floating => {}
        }
        let upper = self.conversion.is_ascii_uppercase();
        let sign = self.sign_for(v.is_sign_negative() && !v.is_nan());
        if !v.is_finite() {
            let body = match (v.is_nan(), upper) {
                (true, false) => "nan",
                (true, true) => "NAN",
                (false, false) => "inf",
                (false, true) => "INF",
            };
            return self.finish(sign, String::new(), body.to_string(), false);
        }

        let abs = v.abs();
        let precision = self.precision.unwrap_or(6);
        let body = match self.conversion {
            'f' | 'F' => fixed_notation(abs, precision, self.flags.alt),
            'e' | 'E' => exp_notation(abs, precision, self.flags.alt),
            _ => general_notation(abs, precision, self.flags.alt),
        };
        let body = if upper { body.to_ascii_uppercase() } else { body };
        self.finish(sign, String::new(), body, true)
    }

    pub fn render_str(&self, v: &str) -> String {
        if self.class() != ConversionClass::Text {
            let t = v.trim();
            return match self.class() {
                ConversionClass::Integer => self.render_int(parse_leading_int(t)),
                _ => self.render_float(parse_leading_float(t)),
            };
        }
        let body: String = match self.precision {
            Some(p) => v.chars().take(p).collect(),
            None => v.to_string(),
        };
        self.finish(String::new(), String::new(), body, false)
    }

    fn sign_for(&self, negative: bool) -> String {
        if negative {
            "-".to_string()
        } else if self.flags.plus {
            "+".to_string()
        } else if self.flags.space {
            " ".to_string()
        } else {
            String::new()
        }
    }

    /// Apply width padding and wrap the conversion in its literal text.
    fn finish(&self, sign: String, alt_prefix: String, body: String, zero_pad: bool) -> String {
        let len = sign.len() + alt_prefix.len() + body.chars().count();
        let width = self.width.unwrap_or(0);
        let field = if len >= width {
            format!("{}{}{}", sign, alt_prefix, body)
        } else if self.flags.left {
            format!("{}{}{}{}", sign, alt_prefix, body, " ".repeat(width - len))
        } else if self.flags.zero && zero_pad {
            format!("{}{}{}{}", sign, alt_prefix, "0".repeat(width - len), body)
        } else {
            format!("{}{}{}{}", " ".repeat(width - len), sign, alt_prefix, body)
        };
        format!("{}{}{}", self.prefix, field, self.suffix)
    }
}

fn read_number(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(&c) = chars.peek() {
        let Some(d) = c.to_digit(10) else { break };
        n = Some(n.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    n
}

fn fixed_notation(abs: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{:.*}", precision, abs);
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

/// Split Rust's `{:e}` output into mantissa and decimal exponent.
fn split_exp(abs: f64, precision: usize) -> (String, i32) {
    let s = format!("{:.*e}", precision, abs);
    match s.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn exp_notation(abs: f64, precision: usize, alt: bool) -> String {
    let (mut mantissa, exp) = split_exp(abs, precision);
    if alt && precision == 0 {
        mantissa.push('.');
    }
    format!("{}e{}{:02}", mantissa, if exp < 0 { '-' } else { '+' }, exp.unsigned_abs())
}

fn general_notation(abs: f64, precision: usize, alt: bool) -> String {
    let p = precision.max(1);
    let exp = if abs == 0.0 { 0 } else { split_exp(abs, p - 1).1 };
    if exp < p as i32 && exp >= -4 {
        let s = fixed_notation(abs, (p as i32 - 1 - exp) as usize, alt);
        if alt {
            s
        } else {
            strip_fraction_zeros(&s)
        }
    } else {
        let s = exp_notation(abs, p - 1, alt);
        if alt {
            return s;
        }
        match s.split_once('e') {
            Some((m, e)) => format!("{}e{}", strip_fraction_zeros(m), e),
            None => s,
        }
    }
}

fn strip_fraction_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Leading decimal integer of `s`, `atoi`-style: leading whitespace and an optional
/// sign are accepted, parsing stops at the first non-digit, no digits yields 0.
pub fn parse_leading_int(s: &str) -> i64 {
    let b = s.trim_start().as_bytes();
    let mut i = 0;
    let mut negative = false;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        negative = b[i] == b'-';
        i += 1;
    }
    let mut v: i64 = 0;
    while i < b.len() && b[i].is_ascii_digit() {
        v = v.saturating_mul(10).saturating_add((b[i] - b'0') as i64);
        i += 1;
    }
    if negative {
        -v
    } else {
        v
    }
}

/// Leading floating-point number of `s`, `strtod`-style. Trailing garbage is
/// ignored; no number yields 0.0.
pub fn parse_leading_float(s: &str) -> f64 {
    let t = s.trim_start();
    let b = t.as_bytes();
    let mut end = 0;
    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let rest = t[end..].to_ascii_lowercase();
    if rest.starts_with("inf") || rest.starts_with("nan") {
        let special: f64 = if rest.starts_with("inf") { f64::INFINITY } else { f64::NAN };
        return if t.starts_with('-') { -special } else { special };
    }

    let mut digits = 0;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < b.len() && b[end] == b'.' {
        end += 1;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if end < b.len() && (b[end] == b'e' || b[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < b.len() && (b[exp_end] == b'+' || b[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < b.len() && b[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    t[..end].parse().unwrap_or(0.0)
}
