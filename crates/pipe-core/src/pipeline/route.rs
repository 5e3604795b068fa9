use indexmap::IndexMap;

use crate::errors::ConfigurationError;
use crate::model::ValueType;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(RouteParam),
}

/// Placeholder de una ruta: `{name}` o `{name:constraint}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParam {
    pub name: String,
    pub constraint: Option<ValueType>,
}

/// Template de ruta parseado, p. ej. `/items/{id:int}/edit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<Segment>,
}

fn split(path: &str) -> Vec<&str> {
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

impl RouteTemplate {
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidRoute { route: raw.to_string(),
                                                                         reason: reason.to_string() };
        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        let mut segments = Vec::new();
        for part in split(raw) {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
                if part.contains(['{', '}']) {
                    return Err(invalid("placeholders must span a whole segment"));
                }
                segments.push(Segment::Literal(part.to_string()));
                continue;
            };
            let (name, constraint) = match inner.split_once(':') {
                Some((name, c)) => {
                    let ty = ValueType::from_constraint(c).ok_or_else(|| invalid(&format!("unknown constraint '{c}'")))?;
                    (name, Some(ty))
                }
                None => (inner, None),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid(&format!("invalid parameter name '{name}'")));
            }
            if segments.iter().any(|s| matches!(s, Segment::Param(p) if p.name == name)) {
                return Err(invalid(&format!("parameter '{name}' appears twice")));
            }
            segments.push(Segment::Param(RouteParam { name: name.to_string(),
                                                      constraint }));
        }
        Ok(Self { raw: raw.to_string(),
                  segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn params(&self) -> impl Iterator<Item = &RouteParam> {
        self.segments.iter().filter_map(|s| match s {
                                Segment::Param(p) => Some(p),
                                Segment::Literal(_) => None,
                            })
    }

    pub fn param(&self, name: &str) -> Option<&RouteParam> {
        self.params().find(|p| p.name == name)
    }

    /// Valores crudos de los placeholders si `path` coincide con el template.
    /// Los literales se comparan sin distinguir mayúsculas; las restricciones
    /// de tipo deben poder convertirse.
    pub fn match_path(&self, path: &str) -> Option<IndexMap<String, String>> {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let parts = split(path);
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = IndexMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit.eq_ignore_ascii_case(part) => {}
                Segment::Literal(_) => return None,
                Segment::Param(param) => {
                    if part.is_empty() {
                        return None;
                    }
                    if let Some(ty) = param.constraint {
                        ty.coerce_str(part)?;
                    }
                    params.insert(param.name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_params_and_constraints() {
        let route = RouteTemplate::parse("/items/{id:int}/notes/{slug}").unwrap();
        let params: Vec<_> = route.params().map(|p| (p.name.as_str(), p.constraint)).collect();
        assert_eq!(params, vec![("id", Some(ValueType::Int)), ("slug", None)]);
        assert!(RouteTemplate::parse("/").unwrap().params().next().is_none());
    }

    #[test]
    fn rejects_malformed_templates() {
        for raw in ["items", "/a//b", "/x{id}", "/{id:uuidish}", "/{}", "/{id}/{id}"] {
            assert!(matches!(RouteTemplate::parse(raw), Err(ConfigurationError::InvalidRoute { .. })), "{raw}");
        }
    }

    #[test]
    fn matches_paths_and_enforces_constraints() {
        let route = RouteTemplate::parse("/items/{id:int}").unwrap();
        let params = route.match_path("/Items/42/?x=1").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(route.match_path("/items/abc").is_none());
        assert!(route.match_path("/items").is_none());
        assert!(route.match_path("/orders/1").is_none());
    }
}
