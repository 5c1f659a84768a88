//! funcflow コア
//!
//! コンパイル済みサーバアプリケーションのアノテーション付き HTTP ハンドラを、
//! サーバーレス関数アプリの設定ツリーに変換します。
//!
//! ```text
//! metadata manifest ──▶ discovery ──▶ Vec<RouteModel> ──▶ ConfigGenerator
//!                                                           │
//!                                    <configDir>/<Owner>_<VERB>_<handler>/function.json
//!                                    <configDir>/host.json
//!                                    <configDir>/local.settings.json
//!                                    <configDir>/Dockerfile (optional)
//! ```

pub mod discovery;
pub mod error;
pub mod generator;
pub mod model;
pub mod template;

pub use discovery::{
    Annotation, ManifestSource, MetadataManifest, MetadataSource, MethodDecl, ProjectInfo,
    TypeDecl, discover_routes,
};
pub use error::{CoreError, Result};
pub use generator::{ConfigGenerator, GeneratedConfig};
pub use model::{
    DiscoveryContext, HttpVerb, Packaging, RouteModel, RuntimeContext, TargetOs,
    normalize_runtime_version, pinned_runtime_path,
};
pub use template::{ConfigRenderer, TemplateKind};
