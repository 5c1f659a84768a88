//! データモデル
//!
//! コンパイル済みメタデータから探索したルートと、生成する全設定ファイルで
//! 共有するランタイムコンテキスト

mod route;
mod runtime;
mod verb;

// 再エクスポート
pub use route::*;
pub use runtime::*;
pub use verb::*;
