use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ハンドラに紐付く HTTP メソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpVerb {
    /// ルート探索で使う固定の走査順
    ///
    /// 複数のメソッドアノテーションを持つハンドラは、この一覧で
    /// 最初に現れるメソッドに紐付く
    pub const ALL: [HttpVerb; 7] = [
        HttpVerb::Get,
        HttpVerb::Put,
        HttpVerb::Post,
        HttpVerb::Patch,
        HttpVerb::Delete,
        HttpVerb::Head,
        HttpVerb::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Post => "POST",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpVerb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::InvalidValue {
                key: "http verb".to_string(),
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_round_trips_through_name() {
        for verb in HttpVerb::ALL {
            assert_eq!(verb.as_str().parse::<HttpVerb>().unwrap(), verb);
        }
        assert_eq!("patch".parse::<HttpVerb>().unwrap(), HttpVerb::Patch);
    }

    #[test]
    fn test_unknown_verb_is_rejected() {
        assert!("TRACE".parse::<HttpVerb>().is_err());
    }
}
