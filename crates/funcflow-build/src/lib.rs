//! funcflow パッケージング
//!
//! 生成した設定ディレクトリを、デプロイ方式に渡す zip アーカイブにします。
//! パッケージング中は `host.json` のランタイム実行ファイルを固定し、
//! コンパイル済みアプリケーションを設定の隣に配置します。

pub mod archive;
pub mod error;
pub mod pin;
pub mod progress;
pub mod staging;

pub use archive::{ArchiveSummary, DEFAULT_EXCLUDE_MARKER, PackageBuilder};
pub use error::{BuildError, Result};
pub use pin::{RuntimePin, pin_runtime_path};
pub use progress::StepProgress;
pub use staging::{ArtifactStager, StagedArtifacts};
