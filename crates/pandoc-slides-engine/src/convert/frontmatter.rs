use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("Invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("Front matter key `pandoc` must be a mapping")]
    NotAMapping,
}

/// YAML block between a leading `---` line and the next `---` or `...` line.
pub fn split_front_matter(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let first_line_end = text.find('\n')?;
    if text[..first_line_end].trim_end() != "---" {
        return None;
    }

    let body = &text[first_line_end + 1..];
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(&body[..offset]);
        }
        offset += line.len();
    }
    None
}

/// The `pandoc` mapping of a document's front matter, or an empty map when
/// the document has no front matter or no such key.
pub fn pandoc_options(text: &str) -> Result<Map<String, Value>, FrontMatterError> {
    let Some(yaml) = split_front_matter(text) else {
        return Ok(Map::new());
    };
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }

    let front_matter: Value = serde_yml::from_str(yaml)?;
    match front_matter.get("pandoc") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(options)) => Ok(options.clone()),
        Some(_) => Err(FrontMatterError::NotAMapping),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_split_front_matter() {
        let text = "---\ntitle: Talk\n---\n# Slide\n";
        assert_eq!(split_front_matter(text), Some("title: Talk\n"));

        let dots = "---\r\ntitle: Talk\r\n...\r\nbody";
        assert_eq!(split_front_matter(dots), Some("title: Talk\r\n"));
    }

    #[test]
    fn test_no_front_matter() {
        assert_eq!(split_front_matter("# Slide\n---\n"), None);
        assert_eq!(split_front_matter("---\nunterminated: true\n"), None);
        assert!(pandoc_options("# Just slides").unwrap().is_empty());
    }

    #[test]
    fn test_pandoc_options_extracted() {
        let text = r#"---
title: Talk
pandoc:
  to: revealjs
  slide-level: 2
  variables:
    theme: moon
---
# Slide
"#;

        let options = pandoc_options(text).unwrap();

        assert_eq!(
            Value::Object(options),
            json!({
                "to": "revealjs",
                "slide-level": 2,
                "variables": {"theme": "moon"},
            })
        );
    }

    #[test]
    fn test_front_matter_without_pandoc_key() {
        let options = pandoc_options("---\ntitle: Talk\n---\n").unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_pandoc_key_must_be_mapping() {
        let result = pandoc_options("---\npandoc: revealjs\n---\n");
        assert!(matches!(result, Err(FrontMatterError::NotAMapping)));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let result = pandoc_options("---\npandoc: [unclosed\n---\n");
        assert!(matches!(result, Err(FrontMatterError::Yaml(_))));
    }
}
