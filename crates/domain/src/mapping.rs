//! # 転送先解決
//!
//! 受信者アドレスを転送先アドレス集合へ付け替えるルックアップテーブルを定義する。
//!
//! ## 解決の優先順位
//!
//! 1 受信者につき、最初にマッチした 1 ルールだけが適用される:
//!
//! | 優先 | キーの形式 | 例 |
//! |-----|-----------|----|
//! | 1 | 完全一致 | `info@example.com` |
//! | 2 | ドメイン一致 | `@example.com` |
//! | 3 | ローカルパート一致 | `info` |
//! | 4 | 全ドメインワイルドカード | `@` |
//!
//! どのルールにもマッチしない受信者は転送先に寄与しない。
//!
//! ## 正規化
//!
//! - キーも受信者も小文字化して比較する
//! - `allow_plus_sign` が有効な場合、完全一致の前に `+タグ` を除去する
//!   （`info+news@example.com` → `info@example.com`）

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::DomainError;

/// `+タグ` 付きアドレスのタグ部分（最初の `+` から `@` の直前まで）
static PLUS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+.*?@").expect("正規表現パターンが不正"));

/// 転送マッピングテーブル
///
/// キーは完全アドレス・`@ドメイン`・ローカルパート・`@` のいずれか。
/// 値はそのキーにマッチした受信者の転送先アドレス一覧。
#[derive(Debug, Clone)]
pub struct ForwardMapping {
    table:           HashMap<String, Vec<String>>,
    allow_plus_sign: bool,
}

/// 受信者リストの解決結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemappedRecipients {
    /// 解決された転送先（マッチ順の連結。重複除去はしない）
    pub forward_to:       Vec<String>,
    /// 最後にルールへマッチした元の受信者
    ///
    /// 転送時のエンベロープ送信元（検証済みドメインのアドレス）として使用する。
    pub matched_original: String,
}

impl ForwardMapping {
    /// マッピングテーブルを構築する
    ///
    /// キーはここで小文字化される。空のテーブルはバリデーションエラー。
    pub fn new(
        table: HashMap<String, Vec<String>>,
        allow_plus_sign: bool,
    ) -> Result<Self, DomainError> {
        if table.is_empty() {
            return Err(DomainError::Validation(
                "転送マッピングテーブルが空です".to_string(),
            ));
        }
        let table = table
            .into_iter()
            .map(|(key, dests)| (key.to_lowercase(), dests))
            .collect();
        Ok(Self {
            table,
            allow_plus_sign,
        })
    }

    /// JSON 文字列（`{"キー": ["転送先", ...]}`）からテーブルを構築する
    pub fn from_json(json: &str, allow_plus_sign: bool) -> Result<Self, DomainError> {
        let table: HashMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| DomainError::Validation(format!("転送マッピングのパースに失敗: {e}")))?;
        Self::new(table, allow_plus_sign)
    }

    /// 1 受信者の転送先を優先順位に従って解決する
    ///
    /// マッチしない場合は `None`（その受信者は転送先に寄与しない）。
    pub fn resolve(&self, recipient: &str) -> Option<&[String]> {
        let key = recipient.to_lowercase();
        let key = if self.allow_plus_sign {
            PLUS_TAG.replace(&key, "@").into_owned()
        } else {
            key
        };

        // 1. 完全一致
        if let Some(dests) = self.table.get(&key) {
            return Some(dests);
        }

        // `@` の位置でローカルパートとドメインに分割（`@` がなければ全体をローカルパート扱い）
        let (local_part, domain) = match key.rfind('@') {
            Some(pos) => (&key[..pos], Some(&key[pos..])),
            None => (key.as_str(), None),
        };

        // 2. ドメイン一致
        if let Some(dests) = domain.and_then(|d| self.table.get(d)) {
            return Some(dests);
        }

        // 3. ローカルパート一致
        if !local_part.is_empty()
            && let Some(dests) = self.table.get(local_part)
        {
            return Some(dests);
        }

        // 4. 全ドメインワイルドカード
        self.table.get("@").map(Vec::as_slice)
    }

    /// 受信者リスト全体を転送先へ付け替える
    ///
    /// 各受信者の解決結果をマッチ順に連結する。転送先が 1 件も得られない
    /// 場合は [`DomainError::NoMatchingRecipients`] を返す。
    pub fn remap(&self, recipients: &[String]) -> Result<RemappedRecipients, DomainError> {
        let mut forward_to = Vec::new();
        let mut matched_original = None;

        for recipient in recipients {
            if let Some(dests) = self.resolve(recipient) {
                forward_to.extend(dests.iter().cloned());
                matched_original = Some(recipient.clone());
            }
        }

        match (forward_to.is_empty(), matched_original) {
            (false, Some(matched_original)) => Ok(RemappedRecipients {
                forward_to,
                matched_original,
            }),
            _ => Err(DomainError::NoMatchingRecipients {
                original: recipients.to_vec(),
            }),
        }
    }
}
