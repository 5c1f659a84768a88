//! `host.json` のランタイム実行ファイルの固定
//!
//! 生成した host 記述子は環境変数基準のランタイムパスを指しています。
//! Linux のホスティング環境では実際のインストールパスが必要なため、
//! パッケージング中だけ値を差し替え、終わったら元に戻します。

use crate::error::{BuildError, Result};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXECUTABLE_PATH_PATTERN: &str = r#"("defaultExecutablePath"\s*:\s*")((?:[^"\\]|\\.)*)(")"#;

/// 固定前の `host.json` の `defaultExecutablePath` の値
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pinned host.json should be restored"]
pub struct RuntimePin {
    host_file: PathBuf,
    previous: String,
}

impl RuntimePin {
    pub fn host_file(&self) -> &Path {
        &self.host_file
    }

    /// 置き換えた値（ファイル内のJSONエスケープのまま）
    pub fn previous(&self) -> &str {
        &self.previous
    }

    /// 元の値を書き戻す
    pub fn restore(self) -> Result<()> {
        let content = read(&self.host_file)?;
        let (updated, _) = replace_executable_path(&content, &self.previous)?;
        write(&self.host_file, &updated)?;
        debug!(host_file = %self.host_file.display(), "Runtime path restored");
        Ok(())
    }
}

/// `host_file` の `defaultExecutablePath` を `runtime_path` に向ける
///
/// キーが無い場合はファイルを変更せず `None` を返す
pub fn pin_runtime_path(host_file: &Path, runtime_path: &str) -> Result<Option<RuntimePin>> {
    let content = read(host_file)?;
    let (updated, previous) = replace_executable_path(&content, &escape_json(runtime_path))?;

    let Some(previous) = previous else {
        warn!(host_file = %host_file.display(), "No defaultExecutablePath to pin");
        return Ok(None);
    };

    write(host_file, &updated)?;
    debug!(
        host_file = %host_file.display(),
        runtime_path = %runtime_path,
        "Runtime path pinned"
    );
    Ok(Some(RuntimePin {
        host_file: host_file.to_path_buf(),
        previous,
    }))
}

/// 最初の値を `escaped` に置き換え、見つかれば元の値を返す
fn replace_executable_path(content: &str, escaped: &str) -> Result<(String, Option<String>)> {
    let re = Regex::new(EXECUTABLE_PATH_PATTERN)
        .map_err(|e| BuildError::Pattern(e.to_string()))?;

    let previous = re.captures(content).map(|caps| caps[2].to_string());
    let updated = re
        .replacen(content, 1, |caps: &Captures| {
            format!("{}{}{}", &caps[1], escaped, &caps[3])
        })
        .into_owned();
    Ok((updated, previous))
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| BuildError::io(path, e))
}
