use super::HttpVerb;
use std::fmt;
use std::sync::Arc;

/// 1回の探索で全ルートが共有するアーティファクト単位の値
///
/// アプリケーションルート宣言から一度だけ組み立て、構築時に各
/// [`RouteModel`] へ渡す。以後は変更しない
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryContext {
    base_app_prefix: String,
}

impl DiscoveryContext {
    pub fn new(base_app_prefix: impl Into<String>) -> Self {
        Self {
            base_app_prefix: base_app_prefix.into(),
        }
    }

    pub fn base_app_prefix(&self) -> &str {
        &self.base_app_prefix
    }
}

/// HTTP メソッドに紐付いた1つのハンドラ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteModel {
    context: Arc<DiscoveryContext>,
    class_prefix: String,
    method_suffix: String,
    http_verb: HttpVerb,
    handler_name: String,
    owner_type_name: String,
    owner_qualified_name: String,
}

impl RouteModel {
    /// `owner_qualified_name` は完全修飾型名。フォルダ名に使う
    /// 型名はその最後の `.` 区切り部分
    pub fn new(
        context: Arc<DiscoveryContext>,
        owner_qualified_name: impl Into<String>,
        handler_name: impl Into<String>,
        http_verb: HttpVerb,
        class_prefix: impl Into<String>,
        method_suffix: impl Into<String>,
    ) -> Self {
        let owner_qualified_name = owner_qualified_name.into();
        let owner_type_name = owner_qualified_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            context,
            class_prefix: class_prefix.into(),
            method_suffix: method_suffix.into(),
            http_verb,
            handler_name: handler_name.into(),
            owner_type_name,
            owner_qualified_name,
        }
    }

    pub fn class_prefix(&self) -> &str {
        &self.class_prefix
    }

    pub fn method_suffix(&self) -> &str {
        &self.method_suffix
    }

    pub fn base_app_prefix(&self) -> &str {
        self.context.base_app_prefix()
    }

    pub fn http_verb(&self) -> HttpVerb {
        self.http_verb
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn owner_type_name(&self) -> &str {
        &self.owner_type_name
    }

    pub fn owner_qualified_name(&self) -> &str {
        &self.owner_qualified_name
    }

    /// 関数アプリのルートからの完全なルート
    ///
    /// `base / class / method` を連結し、先頭と末尾の `/` を取り除き、
    /// 連続する `/` を1つにまとめる
    pub fn complete_route(&self) -> String {
        let joined = format!(
            "{}/{}/{}",
            self.context.base_app_prefix(),
            self.class_prefix,
            self.method_suffix
        );

        let mut route = String::with_capacity(joined.len());
        for ch in joined.chars() {
            if ch == '/' && (route.is_empty() || route.ends_with('/')) {
                continue;
            }
            route.push(ch);
        }
        if route.ends_with('/') {
            route.pop();
        }
        route
    }

    /// 関数フォルダ名: `<Owner>_<VERB>_<handler>`
    pub fn folder_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.owner_type_name, self.http_verb, self.handler_name
        )
    }
}

impl fmt::Display for RouteModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} {}",
            self.handler_name,
            self.owner_qualified_name,
            self.http_verb,
            self.complete_route()
        )
    }
}
