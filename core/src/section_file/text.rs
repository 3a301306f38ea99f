//! Plain-text rendering of a section file.
//!
//! ```text
//! [savefile]
//! version=20
//! options=" +version2 specials"
//! trait_vector="Expansionist","Trader"
//! ```
//!
//! A one-element vector is written with a trailing comma so it reads
//! back as a vector; an empty value reads back as an empty vector.

use super::{SectionFile, Value};
use crate::error::{SaveError, SaveResult};
use std::fmt::Write as _;
use std::path::Path;

impl SectionFile {
    pub fn read(path: impl AsRef<Path>) -> SaveResult<SectionFile> {
        let text = std::fs::read_to_string(path)?;
        SectionFile::parse(&text)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> SaveResult<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut sections: Vec<&str> = Vec::new();
        for (path, _) in self.entries() {
            let section = split_path(path).0;
            if !sections.contains(&section) {
                sections.push(section);
            }
        }

        let mut out = String::new();
        for section in sections {
            if !section.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                let _ = writeln!(out, "[{section}]");
            }
            for (path, value) in self.entries() {
                let (s, key) = split_path(path);
                if s != section {
                    continue;
                }
                let _ = writeln!(out, "{key}={}", render_value(value));
            }
        }
        out
    }

    pub fn parse(text: &str) -> SaveResult<SectionFile> {
        let mut file = SectionFile::new();
        let mut section = String::new();

        for (n, raw) in text.lines().enumerate() {
            let line_no = n + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| SaveError::Parse {
                    line: line_no,
                    message: "unterminated section header".into(),
                })?;
                section = name.trim().to_string();
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| SaveError::Parse {
                line: line_no,
                message: format!("expected key=value, got '{line}'"),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(SaveError::Parse { line: line_no, message: "empty key".into() });
            }
            let value = parse_value(value.trim())
                .map_err(|message| SaveError::Parse { line: line_no, message })?;
            let path = if section.is_empty() {
                key.to_string()
            } else {
                format!("{section}.{key}")
            };
            file.insert(path, value);
        }
        Ok(file)
    }
}

fn split_path(path: &str) -> (&str, &str) {
    path.split_once('.').unwrap_or(("", path))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Bool(true) => "TRUE".into(),
        Value::Bool(false) => "FALSE".into(),
        Value::Str(s) => quote(s),
        Value::StrVec(v) if v.len() == 1 => format!("{},", quote(&v[0])),
        Value::StrVec(v) => v.iter().map(|s| quote(s)).collect::<Vec<_>>().join(","),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn parse_value(raw: &str) -> Result<Value, String> {
    if raw.is_empty() {
        return Ok(Value::StrVec(Vec::new()));
    }
    if raw.starts_with('"') {
        return parse_strings(raw);
    }
    match raw {
        "TRUE" => Ok(Value::Bool(true)),
        "FALSE" => Ok(Value::Bool(false)),
        _ => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("cannot parse value '{raw}'")),
    }
}

fn parse_strings(raw: &str) -> Result<Value, String> {
    let mut items = Vec::new();
    let mut chars = raw.chars().peekable();
    let mut trailing_comma = false;

    loop {
        match chars.next() {
            Some('"') => {}
            Some(c) => return Err(format!("expected '\"', found '{c}'")),
            None => break,
        }
        let mut item = String::new();
        loop {
            match chars.next() {
                Some('"') => break,
                Some('\\') => match chars.next() {
                    Some('n') => item.push('\n'),
                    Some(c) => item.push(c),
                    None => return Err("dangling escape".into()),
                },
                Some(c) => item.push(c),
                None => return Err("unterminated string".into()),
            }
        }
        items.push(item);
        trailing_comma = false;

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => {
                trailing_comma = true;
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
            }
            Some(c) => return Err(format!("unexpected '{c}' after string")),
        }
    }

    if items.len() == 1 && !trailing_comma {
        Ok(Value::Str(items.remove(0)))
    } else {
        Ok(Value::StrVec(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_in_first_appearance_order() {
        let mut file = SectionFile::new();
        file.insert_int("savefile.version", 20);
        file.insert_int("game.turn", 5);
        file.insert_str("savefile.reason", "Autosave");
        let text = file.to_text();
        assert_eq!(
            text,
            "[savefile]\nversion=20\nreason=\"Autosave\"\n\n[game]\nturn=5\n"
        );
    }

    #[test]
    fn text_preserves_every_value_kind() {
        let mut file = SectionFile::new();
        file.insert_int("game.year", -4000);
        file.insert_bool("game.save_players", true);
        file.insert_str("map.t0000", " :gp\"\\");
        file.insert_str_vec("savefile.roads_vector", &["Road"]);
        file.insert_str_vec("savefile.bases_vector", &["Fortress", "Airbase"]);
        file.insert_str_vec("savefile.trait_vector", &[] as &[&str]);
        file.insert_str("script.vars", "a\nb");

        let parsed = SectionFile::parse(&file.to_text()).expect("parse");
        assert_eq!(parsed, file);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "; header\n\n[game]\n# turn\nturn=3\n";
        let file = SectionFile::parse(text).expect("parse");
        assert_eq!(file.lookup_int("game.turn"), Some(3));
        assert_eq!(file.len(), 1);
    }

    #[test]
    fn syntax_errors_report_line() {
        let err = SectionFile::parse("[game]\nturn=three\n").unwrap_err();
        assert!(matches!(err, SaveError::Parse { line: 2, .. }), "got {err:?}");

        let err = SectionFile::parse("[game\n").unwrap_err();
        assert!(matches!(err, SaveError::Parse { line: 1, .. }), "got {err:?}");
    }
}
