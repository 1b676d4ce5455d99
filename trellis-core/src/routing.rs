// Path patterns and captured route parameters

use crate::Error;

/// Parameters captured from the request path, in pattern declaration order.
///
/// A parameter whose segment was empty (or an optional one that was not
/// supplied) is absent rather than an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: Vec<(String, Option<String>)>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a named parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Value at a position
    pub fn value(&self, index: usize) -> Option<&str> {
        self.entries
            .get(index)
            .and_then(|(_, value)| value.as_deref())
    }

    /// All values, positionally
    pub fn values(&self) -> Vec<Option<&str>> {
        self.entries
            .iter()
            .map(|(_, value)| value.as_deref())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: &str, value: Option<&str>) {
        self.entries.push((name.to_string(), value.map(str::to_string)));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, optional: bool },
}

/// A compiled route path such as `/users/:id` or `/files/:name?`.
///
/// Literal segments match exactly; `:name` captures one whole segment and
/// `:name?` may be left off the end of the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    required: usize,
}

impl PathPattern {
    pub fn parse(path: &str) -> Result<Self, Error> {
        let raw = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let mut segments = Vec::new();
        let mut required = 0;
        let mut seen_optional = false;

        for part in raw[1..].split('/') {
            let segment = match part.strip_prefix(':') {
                Some(spec) => {
                    let (name, optional) = match spec.strip_suffix('?') {
                        Some(name) => (name, true),
                        None => (spec, false),
                    };

                    if name.is_empty() {
                        return Err(Error::InvalidRoute(format!("{}: empty parameter name", raw)));
                    }
                    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(Error::InvalidRoute(format!(
                            "{}: invalid parameter name '{}'",
                            raw, name
                        )));
                    }
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param { name: existing, .. } if existing == name))
                    {
                        return Err(Error::InvalidRoute(format!(
                            "{}: duplicate parameter '{}'",
                            raw, name
                        )));
                    }

                    Segment::Param {
                        name: name.to_string(),
                        optional,
                    }
                }
                None => Segment::Literal(part.to_string()),
            };

            let optional = matches!(segment, Segment::Param { optional: true, .. });
            if seen_optional && !optional {
                return Err(Error::InvalidRoute(format!(
                    "{}: optional parameters must come last",
                    raw
                )));
            }
            seen_optional |= optional;
            if !optional {
                required += 1;
            }

            segments.push(segment);
        }

        Ok(Self {
            raw,
            segments,
            required,
        })
    }

    /// The pattern as registered (with a leading `/`)
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of the parameters, in declaration order
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Test a request path, returning the captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = path.strip_prefix('/')?.split('/').collect();

        if parts.len() < self.required || parts.len() > self.segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (index, segment) in self.segments.iter().enumerate() {
            let part = parts.get(index).copied();
            match segment {
                Segment::Literal(literal) => {
                    if part != Some(literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param { name, .. } => {
                    params.push(name, part.filter(|value| !value.is_empty()));
                }
            }
        }

        Some(params)
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
