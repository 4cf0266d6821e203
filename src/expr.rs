// Arithmetic expressions of the tiling language: numbers, + - * / ^, unary minus,
// parentheses, named variables and a handful of functions. The parser also acts
// as the byte cursor for the directive loader.
use crate::error::{ParseError, SourcePos};
use crate::geometry::limits::MAX_EXPR_DEPTH;
use crate::geometry::math::Space;
use std::collections::BTreeMap;
use std::f64::consts::PI;

pub struct ExprParser<'a> {
    bytes: &'a [u8],
    pub at: usize,
    pub vars: BTreeMap<String, f64>,
    /// Geometry used by the polygon helper functions.
    pub space: Space,
    depth: usize,
}

#[inline]
fn is_ident_start(c: u8) -> bool { c.is_ascii_alphabetic() || c == b'_' }

#[inline]
fn is_ident(c: u8) -> bool { c.is_ascii_alphanumeric() || c == b'_' }

impl<'a> ExprParser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { bytes: src.as_bytes(), at: 0, vars: BTreeMap::new(), space: Space::Hyperbolic, depth: 0 }
    }

    pub fn position(&self) -> SourcePos {
        let upto = &self.bytes[..self.at.min(self.bytes.len())];
        let line = upto.iter().filter(|&&c| c == b'\n').count() + 1;
        let column = upto.iter().rev().take_while(|&&c| c != b'\n').count() + 1;
        SourcePos { offset: self.at, line, column }
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError { message: message.into(), position: self.position() }
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> { self.bytes.get(self.at).copied() }

    pub fn skip_white(&mut self) {
        while let Some(c) = self.peek() {
            if c == b' ' || c == b'\t' || c == b'\n' || c == b'\r' {
                self.at += 1;
            } else {
                break;
            }
        }
    }

    pub fn at_end(&mut self) -> bool {
        self.skip_white();
        self.at >= self.bytes.len()
    }

    /// Consume `s` (after whitespace) if it comes next.
    pub fn eat(&mut self, s: &str) -> bool {
        self.skip_white();
        if self.bytes[self.at..].starts_with(s.as_bytes()) {
            self.at += s.len();
            true
        } else {
            false
        }
    }

    pub fn force_eat(&mut self, s: &str) -> Result<(), ParseError> {
        if self.eat(s) { Ok(()) } else { Err(self.error(format!("expecting '{s}'"))) }
    }

    /// Raw byte, no whitespace skipping.
    pub fn take_char(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.at += 1;
        Some(c)
    }

    /// Identifier at the cursor, possibly empty.
    pub fn next_token(&mut self) -> String {
        self.skip_white();
        let start = self.at;
        if self.peek().is_some_and(is_ident_start) {
            while self.peek().is_some_and(is_ident) {
                self.at += 1;
            }
        }
        String::from_utf8_lossy(&self.bytes[start..self.at]).into_owned()
    }

    /// Rest of the current line, up to the first control character.
    pub fn take_line(&mut self) -> String {
        let start = self.at;
        while self.peek().is_some_and(|c| c >= 32) {
            self.at += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.at]).into_owned()
    }

    /// Bytes up to (not including) `stop`; the stop byte is not consumed.
    pub fn take_until(&mut self, stop: u8) -> Result<String, ParseError> {
        let start = self.at;
        while let Some(c) = self.peek() {
            if c == stop {
                return Ok(String::from_utf8_lossy(&self.bytes[start..self.at]).into_owned());
            }
            self.at += 1;
        }
        Err(self.error(format!("unterminated text, expecting '{}'", stop as char)))
    }

    /// Source text between two byte offsets.
    pub fn text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.bytes.len());
        String::from_utf8_lossy(&self.bytes[start.min(end)..end]).into_owned()
    }

    pub fn validate_real(&self, x: f64) -> Result<f64, ParseError> {
        if x.is_finite() { Ok(x) } else { Err(self.error(format!("not a finite number: {x}"))) }
    }

    /// Full expression; may evaluate to infinity.
    pub fn parse(&mut self) -> Result<f64, ParseError> { self.sum() }

    /// Finite real expression.
    pub fn rparse(&mut self) -> Result<f64, ParseError> {
        let v = self.parse()?;
        self.validate_real(v)
    }

    /// Integer expression, rounded to nearest.
    pub fn iparse(&mut self) -> Result<i64, ParseError> {
        let v = self.rparse()?;
        Ok((v + 0.5).floor() as i64)
    }

    /// Non-negative integer expression, for indices.
    pub fn uparse(&mut self) -> Result<usize, ParseError> {
        let v = self.iparse()?;
        usize::try_from(v).map_err(|_| self.error(format!("bad index: {v}")))
    }

    /// Expression followed by a closing parenthesis.
    pub fn parse_par(&mut self) -> Result<f64, ParseError> {
        let v = self.rparse()?;
        self.force_eat(")")?;
        Ok(v)
    }

    fn sum(&mut self) -> Result<f64, ParseError> {
        let mut v = self.product()?;
        loop {
            if self.eat("+") {
                v += self.product()?;
            } else if self.eat("-") {
                v -= self.product()?;
            } else {
                return Ok(v);
            }
        }
    }

    fn product(&mut self) -> Result<f64, ParseError> {
        let mut v = self.unary()?;
        loop {
            if self.eat("*") {
                v *= self.unary()?;
            } else if self.eat("/") {
                v /= self.unary()?;
            } else {
                return Ok(v);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, ParseError> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let v = self.unary_inner();
        self.depth -= 1;
        v
    }

    fn unary_inner(&mut self) -> Result<f64, ParseError> {
        if self.eat("-") {
            return Ok(-self.unary()?);
        }
        if self.eat("+") {
            return self.unary();
        }
        let base = self.primary()?;
        if self.eat("^") {
            // right associative, binds tighter than unary minus on its left
            let e = self.unary()?;
            return Ok(base.powf(e));
        }
        Ok(base)
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let start = self.at;
        let digits = |p: &mut Self| {
            while p.peek().is_some_and(|c| c.is_ascii_digit()) {
                p.at += 1;
            }
        };
        digits(self);
        if self.peek() == Some(b'.') {
            self.at += 1;
            digits(self);
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let save = self.at;
            self.at += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.at += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                digits(self);
            } else {
                self.at = save;
            }
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.at]);
        text.parse::<f64>().map_err(|_| ParseError {
            message: format!("malformed number '{text}'"),
            position: SourcePos { offset: start, ..self.position() },
        })
    }

    fn primary(&mut self) -> Result<f64, ParseError> {
        self.skip_white();
        match self.peek() {
            Some(b'(') => {
                self.at += 1;
                let v = self.parse()?;
                self.force_eat(")")?;
                Ok(v)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) if is_ident_start(c) => {
                let name = self.next_token();
                if self.eat("(") {
                    let mut args = Vec::new();
                    if !self.eat(")") {
                        loop {
                            args.push(self.parse()?);
                            if self.eat(")") {
                                break;
                            }
                            self.force_eat(",")?;
                        }
                    }
                    self.call(&name, &args)
                } else {
                    self.constant(&name)
                }
            }
            _ => Err(self.error("expecting expression")),
        }
    }

    fn constant(&self, name: &str) -> Result<f64, ParseError> {
        if let Some(v) = self.vars.get(name) {
            return Ok(*v);
        }
        match name {
            "pi" => Ok(PI),
            "deg" => Ok(PI / 180.0),
            "inf" => Ok(f64::INFINITY),
            _ => Err(self.error(format!("unknown identifier '{name}'"))),
        }
    }

    fn call(&self, name: &str, args: &[f64]) -> Result<f64, ParseError> {
        let arity = |n: usize| -> Result<(), ParseError> {
            if args.len() == n {
                Ok(())
            } else {
                Err(self.error(format!("{name} takes {n} argument(s), got {}", args.len())))
            }
        };
        let unary: Option<fn(f64) -> f64> = match name {
            "sin" => Some(f64::sin),
            "cos" => Some(f64::cos),
            "tan" => Some(f64::tan),
            "asin" => Some(f64::asin),
            "acos" => Some(f64::acos),
            "atan" => Some(f64::atan),
            "sqrt" => Some(f64::sqrt),
            "exp" => Some(f64::exp),
            "log" => Some(f64::ln),
            "abs" => Some(f64::abs),
            "sinh" => Some(f64::sinh),
            "cosh" => Some(f64::cosh),
            "tanh" => Some(f64::tanh),
            "asinh" => Some(f64::asinh),
            "acosh" => Some(f64::acosh),
            "atanh" => Some(f64::atanh),
            "floor" => Some(f64::floor),
            "ceil" => Some(f64::ceil),
            _ => None,
        };
        if let Some(f) = unary {
            arity(1)?;
            return Ok(f(args[0]));
        }
        match name {
            "atan2" => {
                arity(2)?;
                Ok(args[0].atan2(args[1]))
            }
            "min" | "max" if !args.is_empty() => {
                let it = args.iter().copied();
                Ok(if name == "min" { it.fold(f64::INFINITY, f64::min) } else { it.fold(f64::NEG_INFINITY, f64::max) })
            }
            "ideal_edge" | "ideal_angle" => {
                if args.is_empty() || args.len() > 2 {
                    return Err(self.error(format!("{name} takes 1 or 2 arguments")));
                }
                let u = args.get(1).copied().unwrap_or(1.0);
                let (len, angle) = self.space.regular_ideal(args[0], u);
                Ok(if name == "ideal_edge" { len } else { angle })
            }
            _ => Err(self.error(format!("unknown function '{name}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> f64 { ExprParser::new(s).parse().unwrap() }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval("-2 ^ 2"), -4.0);
        assert_eq!(eval("10 / 4 - 1"), 1.5);
        assert_eq!(eval("1e2 + .5"), 100.5);
    }

    #[test]
    fn functions_and_constants() {
        assert!((eval("cos(60*deg)") - 0.5).abs() < 1e-12);
        assert!((eval("2*acosh(cos(pi/4)/sin(36*deg))") - 1.2537).abs() < 1e-3);
        assert_eq!(eval("max(1, 5, 3)"), 5.0);
        assert!(eval("inf").is_infinite());
    }

    #[test]
    fn variables() {
        let mut p = ExprParser::new("a * b");
        p.vars.insert("a".into(), 3.0);
        p.vars.insert("b".into(), 4.0);
        assert_eq!(p.parse().unwrap(), 12.0);
    }

    #[test]
    fn errors_carry_position() {
        let mut p = ExprParser::new("1 +\n  foo");
        let err = p.parse().unwrap_err();
        assert!(err.message.contains("foo"));
        assert_eq!(err.position.line, 2);
        let mut p = ExprParser::new("1/0");
        assert!(p.rparse().is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(MAX_EXPR_DEPTH), ")".repeat(MAX_EXPR_DEPTH));
        assert!(ExprParser::new(&deep).parse().is_err());
        let ok = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(ExprParser::new(&ok).parse().unwrap(), 1.0);
    }

    #[test]
    fn iparse_rounds() {
        assert_eq!(ExprParser::new("2.6").iparse().unwrap(), 3);
        assert_eq!(ExprParser::new("7/2").iparse().unwrap(), 4);
    }
}
