use crate::utils::error::Result;
use std::path::Path;

/// One line of a `.env` file. Comments and blanks are kept so a rendered
/// file round-trips without losing operator notes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Pair { key: String, value: String },
    Raw(String),
}

/// A parsed `KEY=VALUE` environment file: the only persistent state the
/// pipeline reads or writes on the target host.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    lines: Vec<Line>,
}

impl EnvFile {
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Line::Raw(line.to_string());
                }
                match trimmed.split_once('=') {
                    Some((key, value)) if !key.trim().is_empty() => Line::Pair {
                        key: key.trim().to_string(),
                        value: value.trim().to_string(),
                    },
                    // Malformed lines pass through untouched.
                    _ => Line::Raw(line.to_string()),
                }
            })
            .collect();
        Self { lines }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Pair { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set a key in place, appending when absent. With duplicate keys the
    /// last occurrence is updated, the one `get` (and dotenv) honors.
    pub fn set(&mut self, key: &str, value: &str) {
        for line in self.lines.iter_mut().rev() {
            if let Line::Pair { key: k, value: v } = line {
                if k == key {
                    *v = value.to_string();
                    return;
                }
            }
        }
        self.lines.push(Line::Pair {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Pair { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                Line::Raw(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Application
APP_PORT=8080
IMAGE_TAG=20250101120000

# Database
DB_PASSWORD=secret
";

    #[test]
    fn test_parse_and_get() {
        let env = EnvFile::parse(SAMPLE);
        assert_eq!(env.get("APP_PORT"), Some("8080"));
        assert_eq!(env.get("IMAGE_TAG"), Some("20250101120000"));
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn test_set_existing_key_preserves_layout() {
        let mut env = EnvFile::parse(SAMPLE);
        env.set("IMAGE_TAG", "20250202000000");

        let rendered = env.render();
        assert!(rendered.contains("IMAGE_TAG=20250202000000"));
        assert!(rendered.contains("# Application"));
        assert!(rendered.contains("# Database"));
        // Comment ordering intact: tag line still before the DB block.
        let tag_pos = rendered.find("IMAGE_TAG").unwrap();
        let db_pos = rendered.find("# Database").unwrap();
        assert!(tag_pos < db_pos);
    }

    #[test]
    fn test_set_new_key_appends() {
        let mut env = EnvFile::parse(SAMPLE);
        env.set("REDIS_PORT", "6379");
        assert_eq!(env.get("REDIS_PORT"), Some("6379"));
        assert!(env.render().ends_with("REDIS_PORT=6379\n"));
    }

    #[test]
    fn test_duplicate_keys_get_and_set_agree_on_the_last() {
        let mut env = EnvFile::parse("IMAGE_TAG=v1\nIMAGE_TAG=v2\n");
        assert_eq!(env.get("IMAGE_TAG"), Some("v2"));

        env.set("IMAGE_TAG", "v3");
        assert_eq!(env.get("IMAGE_TAG"), Some("v3"));

        // The earlier duplicate is left alone; the effective one changed.
        let rendered = env.render();
        assert!(rendered.starts_with("IMAGE_TAG=v1\n"));
        assert!(rendered.ends_with("IMAGE_TAG=v3\n"));
    }

    #[test]
    fn test_values_may_contain_equals() {
        let env = EnvFile::parse("APP_KEY=base64:abc=def=\n");
        assert_eq!(env.get("APP_KEY"), Some("base64:abc=def="));
    }

    #[test]
    fn test_empty_value_is_present_but_empty() {
        let env = EnvFile::parse("IMAGE_TAG=\n");
        assert_eq!(env.get("IMAGE_TAG"), Some(""));
    }

    #[test]
    fn test_round_trip() {
        let env = EnvFile::parse(SAMPLE);
        assert_eq!(env.render(), SAMPLE);
    }
}
