//! Placeholder resolution: turns a compiled [`Template`] plus event fields
//! into concrete text.
//!
//! A conditional span is dropped entirely when any placeholder directly
//! inside it is unresolved. A span holding no placeholders of its own but
//! wrapping other spans is dropped when all of those spans were dropped.

use alarmist_core::{FieldValue, Fields};

use crate::template::{Placeholder, Segment, Template};
use crate::vocabulary::FieldFormat;

/// A field value that cannot be formatted the way its placeholder declares.
///
/// Never aborts rendering: the placeholder renders empty and counts as
/// unresolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("value '{value}' for <{name}> is incompatible with format {format}")]
    IncompatibleValue {
        name: String,
        format: FieldFormat,
        value: String,
    },
}

/// Bookkeeping for one nesting level.
#[derive(Default)]
struct Scope {
    placeholders: usize,
    unresolved: usize,
    nested: usize,
    nested_kept: usize,
}

impl Scope {
    fn collapses(&self) -> bool {
        self.unresolved > 0 || (self.placeholders == 0 && self.nested > 0 && self.nested_kept == 0)
    }
}

/// Render `template` against `fields`. Deterministic and infallible.
pub fn render(template: &Template, fields: &Fields) -> String {
    let mut out = String::new();
    // Unresolved top-level placeholders simply render empty.
    render_into(template.segments(), fields, &mut out);
    out
}

fn render_into(segments: &[Segment], fields: &Fields, out: &mut String) -> Scope {
    let mut scope = Scope::default();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(placeholder) => {
                scope.placeholders += 1;
                match resolve(placeholder, fields) {
                    Some(text) => out.push_str(&text),
                    None => scope.unresolved += 1,
                }
            }
            Segment::Conditional(inner) => {
                scope.nested += 1;
                let mut buffer = String::new();
                let inner_scope = render_into(inner, fields, &mut buffer);
                if !inner_scope.collapses() {
                    scope.nested_kept += 1;
                    out.push_str(&buffer);
                }
            }
        }
    }
    scope
}

/// Value for one placeholder, or `None` when it is missing, empty or
/// cannot be formatted.
fn resolve(placeholder: &Placeholder, fields: &Fields) -> Option<String> {
    let value = fields.get(&placeholder.name).filter(|v| !v.is_empty())?;
    match format_value(&placeholder.name, placeholder.format, value) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(placeholder = %placeholder.name, error = %e, "placeholder left unresolved");
            None
        }
    }
}

/// Format a single value according to `format`. Text is passed through as-is.
pub fn format_value(name: &str, format: FieldFormat, value: &FieldValue) -> Result<String, RenderError> {
    let incompatible = || RenderError::IncompatibleValue {
        name: name.to_string(),
        format,
        value: value.to_string(),
    };

    match (value, format) {
        (FieldValue::Text(s), _) => Ok(s.clone()),
        (FieldValue::Null, _) => Ok(String::new()),
        (_, FieldFormat::Verbatim) => Ok(value.to_string()),
        (FieldValue::Boolean(_), _) => Err(incompatible()),

        (FieldValue::Integer(i), FieldFormat::Fixed(n)) => Ok(format!("{:.*}", n as usize, *i as f64)),
        (FieldValue::Integer(i), FieldFormat::ZeroPad(n)) => Ok(format!("{:0width$}", i, width = n as usize)),
        (FieldValue::Integer(i), FieldFormat::Percent) => Ok(format!("{}%", i)),

        (FieldValue::Float(f), _) if !f.is_finite() => Err(incompatible()),
        (FieldValue::Float(f), FieldFormat::Fixed(n)) => Ok(format!("{:.*}", n as usize, f)),
        (FieldValue::Float(f), FieldFormat::ZeroPad(n)) => {
            if f.fract() != 0.0 {
                return Err(incompatible());
            }
            Ok(format!("{:0width$}", *f as i64, width = n as usize))
        }
        (FieldValue::Float(f), FieldFormat::Percent) => Ok(format!("{}%", f.round() as i64)),
    }
}
