//! Duration templates such as `"{inthours}h {intminutes}m"`.
//!
//! A template mixes literal text with placeholders for one of four views of
//! a duration in hours. A placeholder may carry a format spec of the form
//! `[0][width][.precision]`; precision is only valid on the float fields.
//! `{{` and `}}` produce literal braces.

use std::str::FromStr;

use thiserror::Error;

/// Errors from parsing a duration template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{name}}} in duration template {template:?}")]
    UnknownPlaceholder { template: String, name: String },

    #[error("unclosed '{{' at byte {position} in duration template {template:?}")]
    Unclosed { template: String, position: usize },

    #[error("single '}}' at byte {position} in duration template {template:?}")]
    StrayClose { template: String, position: usize },

    #[error("invalid format spec {spec:?} for {{{name}}} in duration template {template:?}")]
    BadSpec {
        template: String,
        name: String,
        spec: String,
    },
}

/// A duration broken down the ways a template can show it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationParts {
    pub raw_hours: f64,
    pub int_hours: i64,
    pub int_minutes: i64,
    pub rounded_hours: f64,
}

impl DurationParts {
    /// Splits `raw_hours`, rounding to the nearest multiple of `increment`
    /// (ties to even).
    #[expect(
        clippy::cast_possible_truncation,
        reason = "hour counts are far below i64::MAX"
    )]
    pub fn from_hours(raw_hours: f64, increment: f64) -> Self {
        let whole = raw_hours.trunc();
        let minutes = ((raw_hours - whole) * 60.0).trunc();
        Self {
            raw_hours,
            int_hours: whole as i64,
            int_minutes: minutes as i64,
            rounded_hours: (raw_hours / increment).round_ties_even() * increment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    RawHours,
    IntHours,
    IntMinutes,
    RoundedHours,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "rawhours" => Some(Self::RawHours),
            "inthours" => Some(Self::IntHours),
            "intminutes" => Some(Self::IntMinutes),
            "roundedhours" => Some(Self::RoundedHours),
            _ => None,
        }
    }

    const fn is_float(self) -> bool {
        matches!(self, Self::RawHours | Self::RoundedHours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Spec {
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field, Spec),
}

/// A parsed duration template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationTemplate {
    segments: Vec<Segment>,
}

impl FromStr for DurationTemplate {
    type Err = TemplateError;

    fn from_str(template: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(TemplateError::StrayClose {
                        template: template.to_string(),
                        position,
                    });
                }
                '{' => {
                    let rest = &template[position + 1..];
                    let close = rest.find('}').ok_or_else(|| TemplateError::Unclosed {
                        template: template.to_string(),
                        position,
                    })?;
                    let body = &rest[..close];
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(template, body)?);
                    while chars.next_if(|&(i, _)| i <= position + close + 1).is_some() {}
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }
}

fn parse_placeholder(template: &str, body: &str) -> Result<Segment, TemplateError> {
    let (name, spec) = body.split_once(':').unwrap_or((body, ""));
    let field = Field::parse(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
        template: template.to_string(),
        name: name.to_string(),
    })?;
    let bad_spec = || TemplateError::BadSpec {
        template: template.to_string(),
        name: name.to_string(),
        spec: spec.to_string(),
    };

    let (width_part, precision_part) = match spec.split_once('.') {
        Some((w, p)) => (w, Some(p)),
        None => (spec, None),
    };
    let zero_pad = width_part.starts_with('0');
    let width = if width_part.is_empty() {
        0
    } else {
        width_part.parse().map_err(|_| bad_spec())?
    };
    let precision = match precision_part {
        Some(p) if field.is_float() => Some(p.parse().map_err(|_| bad_spec())?),
        Some(_) => return Err(bad_spec()),
        None => None,
    };

    Ok(Segment::Field(
        field,
        Spec {
            zero_pad,
            width,
            precision,
        },
    ))
}

impl DurationTemplate {
    pub fn render(&self, parts: &DurationParts) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field, spec) => {
                    let text = match field {
                        Field::RawHours => format_float(parts.raw_hours, spec.precision),
                        Field::RoundedHours => format_float(parts.rounded_hours, spec.precision),
                        Field::IntHours => parts.int_hours.to_string(),
                        Field::IntMinutes => parts.int_minutes.to_string(),
                    };
                    let fill = if spec.zero_pad { '0' } else { ' ' };
                    for _ in text.chars().count()..spec.width {
                        out.push(fill);
                    }
                    out.push_str(&text);
                }
            }
        }
        out
    }
}

/// Fixed precision when given, otherwise the shortest round-trip form with a
/// trailing `.0` on whole numbers (`2.0`, `1.25`).
fn format_float(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(precision) => format!("{value:.precision$}"),
        None => format!("{value:?}"),
    }
}
