use crate::error::{BuildError, Result};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// 相対パスにこの文字列を含むエントリはアーカイブに入れない
pub const DEFAULT_EXCLUDE_MARKER: &str = "Dockerfile";

const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// アーカイブに格納した内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// 設定ディレクトリからデプロイ用 zip を作成
pub struct PackageBuilder {
    exclude_marker: String,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self {
            exclude_marker: DEFAULT_EXCLUDE_MARKER.to_string(),
        }
    }

    pub fn with_exclude_marker(mut self, marker: impl Into<String>) -> Self {
        self.exclude_marker = marker.into();
        self
    }

    /// `root` 配下をすべて `dest` に zip 圧縮
    ///
    /// `dest` は `root` の中にあってもよく、自分自身は追加しない。エントリは
    /// ファイル名順に走査するので、何度実行しても同じ順序になる。
    /// 失敗時は書きかけのアーカイブを削除する
    #[tracing::instrument(skip_all, fields(root = %root.display(), dest = %dest.display()))]
    pub fn build(&self, root: &Path, dest: &Path) -> Result<ArchiveSummary> {
        if !root.is_dir() {
            return Err(BuildError::SourceNotFound(root.to_path_buf()));
        }
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        let file = File::create(dest).map_err(|e| BuildError::io(dest, e))?;
        let result = self.write_archive(root, dest, file);
        if result.is_err() {
            // 書きかけのアーカイブを後のアップロードで拾わせない
            let _ = std::fs::remove_file(dest);
        }
        let summary = result?;

        broaden_permissions(dest)?;
        info!(
            files = summary.files,
            directories = summary.directories,
            bytes = summary.bytes,
            "Archive written"
        );
        Ok(summary)
    }

    fn write_archive(&self, root: &Path, dest: &Path, file: File) -> Result<ArchiveSummary> {
        let root = root.canonicalize().map_err(|e| BuildError::io(root, e))?;
        let dest_canonical = dest.canonicalize().map_err(|e| BuildError::io(dest, e))?;

        let mut writer = ArchiveWriter::new(dest, file);
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.is_included(&root, &dest_canonical, entry));

        for entry in walker {
            let entry = entry.map_err(|e| BuildError::Walk {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                message: e.to_string(),
            })?;
            let name = entry_name(&root, entry.path());

            if entry.file_type().is_dir() {
                writer.add_directory(&name)?;
            } else {
                writer.add_file(&name, entry.path())?;
            }
        }

        writer.finish()
    }

    fn is_included(&self, root: &Path, dest: &Path, entry: &DirEntry) -> bool {
        if entry.path() == dest {
            return false;
        }
        let name = entry_name(root, entry.path());
        if !self.exclude_marker.is_empty() && name.contains(&self.exclude_marker) {
            debug!(entry = %name, "Excluded from archive");
            return false;
        }
        true
    }
}

/// `root` からの `/` 区切りの相対パス
fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// zip ストリームの唯一の所有者
///
/// エントリの開始とバイト列の書き込みは1回の `&mut self` 呼び出しで
/// 行うため、エントリが混ざることはない
struct ArchiveWriter<'a> {
    dest: &'a Path,
    zip: ZipWriter<BufWriter<File>>,
    summary: ArchiveSummary,
}

impl<'a> ArchiveWriter<'a> {
    fn new(dest: &'a Path, file: File) -> Self {
        Self {
            dest,
            zip: ZipWriter::new(BufWriter::new(file)),
            summary: ArchiveSummary {
                path: dest.to_path_buf(),
                files: 0,
                directories: 0,
                bytes: 0,
            },
        }
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
    }

    fn add_directory(&mut self, name: &str) -> Result<()> {
        let name = format!("{}/", name.trim_end_matches('/'));
        debug!(entry = %name, "Adding directory");
        self.zip
            .add_directory(name, Self::options())
            .map_err(|e| BuildError::archive(self.dest, e))?;
        self.summary.directories += 1;
        Ok(())
    }

    fn add_file(&mut self, name: &str, source: &Path) -> Result<()> {
        debug!(entry = %name, "Adding file");
        let mut input = File::open(source).map_err(|e| BuildError::io(source, e))?;
        self.zip
            .start_file(name, Self::options())
            .map_err(|e| BuildError::archive(self.dest, e))?;

        let copied = copy_buffered(&mut input, &mut self.zip).map_err(|e| BuildError::io(source, e))?;
        self.summary.files += 1;
        self.summary.bytes += copied;
        Ok(())
    }

    /// セントラルディレクトリを書き込み、flush と sync を行う
    fn finish(self) -> Result<ArchiveSummary> {
        let buffered = self
            .zip
            .finish()
            .map_err(|e| BuildError::archive(self.dest, e))?;
        let file = buffered
            .into_inner()
            .map_err(|e| BuildError::io(self.dest, e.into_error()))?;
        file.sync_all().map_err(|e| BuildError::io(self.dest, e))?;
        Ok(self.summary)
    }
}

/// 固定長バッファでのコピー。各チャンクはオフセット0から書き込む
fn copy_buffered<R: Read, W: Write>(input: &mut R, output: &mut W) -> io::Result<u64> {
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        output.write_all(&buffer[..read])?;
        total += read as u64;
    }
    Ok(total)
}

/// アーカイブとクラスローダーディレクトリは別ユーザーで動く
/// プロセスからも使われる
#[cfg(unix)]
pub(crate) fn broaden_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))
        .map_err(|e| BuildError::io(path, e))
}

#[cfg(not(unix))]
pub(crate) fn broaden_permissions(path: &Path) -> Result<()> {
    let mut permissions = std::fs::metadata(path)
        .map_err(|e| BuildError::io(path, e))?
        .permissions();
    permissions.set_readonly(false);
    std::fs::set_permissions(path, permissions).map_err(|e| BuildError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn entries(archive: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        let mut out = BTreeMap::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            out.insert(entry.name().to_string(), content);
        }
        out
    }

    #[test]
    fn test_directories_and_files() {
        let src = tempdir().unwrap();
        fs::create_dir_all(src.path().join("Orders_GET_list")).unwrap();
        fs::create_dir_all(src.path().join("empty/nested")).unwrap();
        fs::write(src.path().join("Orders_GET_list/function.json"), "{}").unwrap();
        fs::write(src.path().join("host.json"), "{\"version\":\"2.0\"}").unwrap();
        fs::write(src.path().join("zero.bin"), b"").unwrap();

        let out = tempdir().unwrap();
        let dest = out.path().join("app.zip");
        let summary = PackageBuilder::new().build(src.path(), &dest).unwrap();

        assert_eq!(summary.files, 3);
        assert_eq!(summary.directories, 3);

        let entries = entries(&dest);
        let names: Vec<&str> = entries.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "Orders_GET_list/",
                "Orders_GET_list/function.json",
                "empty/",
                "empty/nested/",
                "host.json",
                "zero.bin",
            ]
        );
        assert!(entries["empty/nested/"].is_empty());
        assert!(entries["zero.bin"].is_empty());
        assert_eq!(entries["host.json"], b"{\"version\":\"2.0\"}");
    }

    #[test]
    fn test_excludes_marker_and_self() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("host.json"), "{}").unwrap();
        fs::write(src.path().join("Dockerfile"), "FROM scratch").unwrap();
        fs::create_dir(src.path().join("Dockerfile.d")).unwrap();
        fs::write(src.path().join("Dockerfile.d/extra"), "x").unwrap();

        // 圧縮対象のツリー内に置いたアーカイブ
        let dest = src.path().join("app.zip");
        fs::write(&dest, "stale archive").unwrap();
        PackageBuilder::new().build(src.path(), &dest).unwrap();

        let entries = entries(&dest);
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["host.json"]);
        assert!(!entries.keys().any(|k| k.contains("Dockerfile")));
        assert!(!entries.contains_key("app.zip"));
    }

    #[test]
    fn test_large_file_is_copied_intact() {
        let src = tempdir().unwrap();
        let content: Vec<u8> = (0..(COPY_BUFFER_SIZE * 3 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        fs::write(src.path().join("handler.jar"), &content).unwrap();

        let out = tempdir().unwrap();
        let dest = out.path().join("app.zip");
        let summary = PackageBuilder::new().build(src.path(), &dest).unwrap();

        assert_eq!(summary.bytes, content.len() as u64);
        assert_eq!(entries(&dest)["handler.jar"], content);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let out = tempdir().unwrap();
        let err = PackageBuilder::new()
            .build(&out.path().join("missing"), &out.path().join("app.zip"))
            .unwrap_err();
        assert!(matches!(err, BuildError::SourceNotFound(_)));
        assert!(!out.path().join("app.zip").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_archive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempdir().unwrap();
        fs::write(src.path().join("host.json"), "{}").unwrap();
        let out = tempdir().unwrap();
        let dest = out.path().join("app.zip");
        PackageBuilder::new().build(src.path(), &dest).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[test]
    fn test_copy_buffered_short_reads() {
        let data = vec![7u8; COPY_BUFFER_SIZE + 1];
        let mut output = Vec::new();
        let copied = copy_buffered(&mut data.as_slice(), &mut output).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(output, data);
    }
}
