//! Text rendering shared by the built-in types.

use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::app::Application;
use crate::error::ValueError;
use crate::value::{Scalar, ValueRef};

impl Application {
    /// Render a value to a fresh string.
    ///
    /// The plain form is for humans; the quoted form is JSON-safe and is
    /// what containers use for their elements.
    pub fn render(&self, value: ValueRef, quoted: bool) -> Result<String, ValueError> {
        let mut out = String::new();
        self.render_into(value, quoted, &mut out)?;
        Ok(out)
    }

    /// Append the rendering of `value` to `out`.
    pub fn render_into(
        &self,
        value: ValueRef,
        quoted: bool,
        out: &mut String,
    ) -> Result<(), ValueError> {
        let tag = self.tag_of(value)?;
        let ty = self
            .registry
            .get(tag)
            .ok_or(ValueError::UnregisteredTag(tag))?;
        let body = self.body(value)?;
        if quoted {
            ty.render_quoted(self, value, body, out)
        } else {
            ty.render(self, value, body, out)
        }
    }
}

pub(crate) fn scalar(out: &mut String, s: Scalar, quoted: bool) -> Result<(), ValueError> {
    match s {
        Scalar::U8(v) => write!(out, "{v}")?,
        Scalar::U16(v) => write!(out, "{v}")?,
        Scalar::U32(v) => write!(out, "{v}")?,
        Scalar::U64(v) => write!(out, "{v}")?,
        Scalar::I8(v) => write!(out, "{v}")?,
        Scalar::I16(v) => write!(out, "{v}")?,
        Scalar::I32(v) => write!(out, "{v}")?,
        Scalar::I64(v) => write!(out, "{v}")?,
        Scalar::F32(v) if quoted && !v.is_finite() => out.push_str("null"),
        Scalar::F64(v) if quoted && !v.is_finite() => out.push_str("null"),
        Scalar::F32(v) => write!(out, "{v}")?,
        Scalar::F64(v) => write!(out, "{v}")?,
        Scalar::Bool(v) => out.push_str(if v { "true" } else { "false" }),
    }
    Ok(())
}

pub(crate) fn hex(out: &mut String, bytes: &[u8]) -> Result<(), ValueError> {
    out.reserve(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02X}")?;
    }
    Ok(())
}

pub(crate) fn base64_quoted(out: &mut String, bytes: &[u8]) {
    out.push('"');
    STANDARD.encode_string(bytes, out);
    out.push('"');
}

pub(crate) fn json_string(out: &mut String, s: &str) -> Result<(), ValueError> {
    let escaped = serde_json::to_string(s).map_err(|_| std::fmt::Error)?;
    out.push_str(&escaped);
    Ok(())
}
