//! JSON-lines persistence helpers shared by the record store.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Reads every line of `path` as a `T`. A missing file is an empty list;
/// lines that fail to decode or parse are skipped with a warning.
pub fn load_lines<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut items = Vec::new();
    for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line?;
        if line.trim_ascii().is_empty() {
            continue;
        }
        match serde_json::from_slice(&line) {
            Ok(item) => items.push(item),
            Err(e) => warn!(path = %path.display(), line = idx + 1, "skipping malformed record: {e}"),
        }
    }
    Ok(items)
}

pub fn append_line<T: Serialize>(path: &Path, item: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(item).map_err(io::Error::other)?;
    writeln!(file, "{line}")
}

/// Replaces the contents of `path` with `items`, one per line. Writes go to a
/// sibling temp file first so readers never see a half-written file.
pub fn rewrite_lines<'a, T, I>(path: &Path, items: I) -> io::Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut writer = BufWriter::new(fs::File::create(&tmp)?);
        for item in items {
            serde_json::to_writer(&mut writer, item).map_err(io::Error::other)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)
}

/// Maps an arbitrary key (user id, device id) onto a safe file stem.
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes `_`
/// followed by two hex digits, so distinct keys never share a stem.
pub fn sanitize_key(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{byte:02x}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        n: u32,
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Row> = load_lines(&dir.path().join("nope.jsonl")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn append_then_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rows.jsonl");

        append_line(&path, &Row { n: 1 }).unwrap();
        append_line(&path, &Row { n: 2 }).unwrap();
        assert_eq!(
            load_lines::<Row>(&path).unwrap(),
            vec![Row { n: 1 }, Row { n: 2 }]
        );

        rewrite_lines(&path, [Row { n: 3 }].iter()).unwrap();
        assert_eq!(load_lines::<Row>(&path).unwrap(), vec![Row { n: 3 }]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        fs::write(&path, "{\"n\":1}\nnot json\n\n{\"n\":4}\n").unwrap();
        assert_eq!(
            load_lines::<Row>(&path).unwrap(),
            vec![Row { n: 1 }, Row { n: 4 }]
        );
    }

    #[test]
    fn undecodable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        for n in 1..=3 {
            append_line(&path, &Row { n }).unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"\xff\xfe garbage\n").unwrap();
        append_line(&path, &Row { n: 4 }).unwrap();

        let rows: Vec<Row> = load_lines(&path).unwrap();
        assert_eq!(rows.iter().map(|r| r.n).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn sanitize_escapes_path_characters() {
        assert_eq!(sanitize_key("../etc/passwd"), "_2e_2e_2fetc_2fpasswd");
        assert_eq!(sanitize_key("user-42"), "user-42");
    }

    #[test]
    fn sanitized_keys_do_not_collide() {
        let keys = [
            "john.doe@example.com",
            "john_doe_example_com",
            "john_2edoe@example.com",
            "john doe",
        ];
        let stems: std::collections::HashSet<String> =
            keys.iter().map(|k| sanitize_key(k)).collect();
        assert_eq!(stems.len(), keys.len());
    }
}
