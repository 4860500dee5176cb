//! # 生ヘッダー書き換え
//!
//! 転送前に生メッセージ（RFC 5322 テキスト）のヘッダーブロックを書き換える。
//! MIME パーサは使わず、ヘッダーブロックに対するテキスト変換のみを行う。
//! 本文ブロックは 1 バイトも変更しない。
//!
//! ## 変換内容（適用順）
//!
//! 1. `Reply-To` がなければ元の `From` の値で追加する
//! 2. `From` を書き換える（送信側で検証済みのアドレスに差し替える）
//! 3. `Subject` に接頭辞を付ける（設定時のみ）
//! 4. `To` を固定アドレスで上書きする（設定時のみ）
//! 5. `Return-Path` / `Sender` / `Message-ID` / `DKIM-Signature` を取り除く
//!
//! `From` の書き換えが必要なのは、メール中継サービスが未検証アドレスからの
//! 送信を拒否するため。書き換え後は元の DKIM 署名が無効になるので、
//! 署名ヘッダーごと取り除く（重複ヘッダーエラーの回避も兼ねる）。
//!
//! ## 折り返しヘッダー
//!
//! `From` と `DKIM-Signature` は複数行に折り返されている場合がある。
//! 継続行（空白またはタブで始まる行）も含めて 1 ヘッダーとして扱う。

use std::sync::LazyLock;

use regex::Regex;

/// Reply-To ヘッダーの存在確認
static REPLY_TO_PRESENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^reply-to:[ \t]?").expect("正規表現パターンが不正"));

/// From ヘッダー（継続行と末尾改行を含む値のキャプチャ。Reply-To 追加用）
static FROM_WITH_NEWLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^from:[ \t]?(.*(?:\r?\n[ \t]+.*)*\r?\n)").expect("正規表現パターンが不正")
});

/// From ヘッダー（継続行を含む値のキャプチャ。書き換え用）
///
/// 値に `\r` を含めないため `.` ではなく `[^\r\n]` でマッチする
/// （CRLF の改行を壊さない）。
static FROM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^from:[ \t]?([^\r\n]*(?:\r?\n[ \t]+[^\r\n]*)*)")
        .expect("正規表現パターンが不正")
});

/// 角括弧形式のアドレス部（`<addr>`）
static ANGLE_ADDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(.*)>").expect("正規表現パターンが不正"));

/// Subject ヘッダー
static SUBJECT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^subject:[ \t]?([^\r\n]*)").expect("正規表現パターンが不正")
});

/// To ヘッダー
static TO_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^to:[ \t]?[^\r\n]*").expect("正規表現パターンが不正"));

/// Return-Path ヘッダー（行ごと除去）
static RETURN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^return-path:[ \t]?.*\r?\n").expect("正規表現パターンが不正"));

/// Sender ヘッダー（行ごと除去）
static SENDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^sender:[ \t]?.*\r?\n").expect("正規表現パターンが不正"));

/// Message-ID ヘッダー（行ごと除去）
static MESSAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^message-id:[ \t]?.*\r?\n").expect("正規表現パターンが不正"));

/// DKIM-Signature ヘッダー（継続行も含めて除去）
static DKIM_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^dkim-signature:[ \t]?.*\r?\n(?:[ \t]+.*\r?\n)*")
        .expect("正規表現パターンが不正")
});

/// ヘッダー書き換えの設定
#[derive(Debug, Clone, Default)]
pub struct RewriteConfig {
    /// 書き換え後の From アドレス（検証済みであること）
    ///
    /// 未設定の場合は、マッチした元の受信者（検証済みドメインのアドレス）を
    /// From アドレスとして使用する。
    pub from_address:   Option<String>,
    /// To ヘッダーを固定で上書きするアドレス
    pub to_address:     Option<String>,
    /// Subject に付ける接頭辞
    pub subject_prefix: Option<String>,
}

/// 書き換え結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenMail {
    /// 書き換え後の生メッセージ全文
    pub text:           String,
    /// 追加された `Reply-To` の値（元の `From` 由来。追加しなかった場合は `None`）
    pub added_reply_to: Option<String>,
}

/// 生メッセージを転送用に書き換える
///
/// `original_recipient` はマッピングでマッチした元の受信者。
/// `from_address` 未設定時の From アドレスとして使用する。
pub fn rewrite_for_forwarding(
    raw: &str,
    config: &RewriteConfig,
    original_recipient: &str,
) -> RewrittenMail {
    let (header, body) = split_message(raw);
    let mut header = header.to_string();

    // 1. Reply-To がなければ元の From の値で追加する
    let mut added_reply_to = None;
    if !REPLY_TO_PRESENT.is_match(&header)
        && let Some(caps) = FROM_WITH_NEWLINE.captures(&header)
    {
        let from_value = caps[1].to_string();
        header.push_str("Reply-To: ");
        header.push_str(&from_value);
        added_reply_to = Some(from_value.trim().to_string());
    }

    // 2. From を書き換える
    header = FROM_HEADER
        .replace_all(&header, |caps: &regex::Captures<'_>| {
            let from_value = &caps[1];
            match &config.from_address {
                Some(from_address) => {
                    // 表示名は残し、アドレス部を検証済みアドレスに差し替える
                    let display = ANGLE_ADDR.replace(from_value, "");
                    format!("From: {} <{}>", display.trim(), from_address)
                }
                None => {
                    // 元の From 全体を表示名へ落とし、元の受信者をアドレスにする
                    let munged = from_value.replacen('<', "at ", 1).replacen('>', "", 1);
                    format!("From: {munged} <{original_recipient}>")
                }
            }
        })
        .into_owned();

    // 3. Subject に接頭辞を付ける
    if let Some(prefix) = &config.subject_prefix {
        header = SUBJECT_HEADER
            .replace_all(&header, |caps: &regex::Captures<'_>| {
                format!("Subject: {prefix}{}", &caps[1])
            })
            .into_owned();
    }

    // 4. To を固定アドレスで上書きする
    if let Some(to_address) = &config.to_address {
        header = TO_HEADER
            .replace_all(&header, |_: &regex::Captures<'_>| format!("To: {to_address}"))
            .into_owned();
    }

    // 5. 転送後に無効・有害になるヘッダーを取り除く
    header = RETURN_PATH.replace_all(&header, "").into_owned();
    header = SENDER.replace_all(&header, "").into_owned();
    header = MESSAGE_ID.replace_all(&header, "").into_owned();
    header = DKIM_SIGNATURE.replace_all(&header, "").into_owned();

    RewrittenMail {
        text: header + body,
        added_reply_to,
    }
}

/// 最初の空行でヘッダーブロックと本文ブロックに分割する
///
/// ヘッダーブロックは最終ヘッダー行の改行まで、本文ブロックは区切りの
/// 空行（の改行）から始まる。空行がなければ全体をヘッダーブロックとして扱う。
fn split_message(raw: &str) -> (&str, &str) {
    let crlf = raw.find("\r\n\r\n").map(|pos| pos + 2);
    let lf = raw.find("\n\n").map(|pos| pos + 1);
    let split_at = match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match split_at {
        Some(pos) => (&raw[..pos], &raw[pos..]),
        None => (raw, ""),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const ORIGINAL_RECIPIENT: &str = "info@ferry.example.com";

    fn config_with_from() -> RewriteConfig {
        RewriteConfig {
            from_address: Some("noreply@ferry.example.com".to_string()),
            ..RewriteConfig::default()
        }
    }

    // ===== split_message のテスト =====

    #[test]
    fn test_crlfの空行でヘッダーと本文に分割される() {
        let raw = "From: a@example.com\r\nTo: b@example.com\r\n\r\nbody line\r\n";
        let (header, body) = split_message(raw);
        assert_eq!(header, "From: a@example.com\r\nTo: b@example.com\r\n");
        assert_eq!(body, "\r\nbody line\r\n");
    }

    #[test]
    fn test_lfの空行でヘッダーと本文に分割される() {
        let raw = "From: a@example.com\nTo: b@example.com\n\nbody line\n";
        let (header, body) = split_message(raw);
        assert_eq!(header, "From: a@example.com\nTo: b@example.com\n");
        assert_eq!(body, "\nbody line\n");
    }

    #[test]
    fn test_空行がなければ全体がヘッダーブロックになる() {
        let raw = "From: a@example.com\r\nTo: b@example.com\r\n";
        let (header, body) = split_message(raw);
        assert_eq!(header, raw);
        assert_eq!(body, "");
    }

    // ===== Reply-To 追加のテスト =====

    #[test]
    fn test_reply_toがなければ元のfromで追加される() {
        let raw = "From: Jane Doe <jane@example.com>\r\nSubject: hello\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains("Reply-To: Jane Doe <jane@example.com>\r\n"));
        assert_eq!(
            result.added_reply_to.as_deref(),
            Some("Jane Doe <jane@example.com>")
        );
    }

    #[test]
    fn test_既存のreply_toは上書きされない() {
        let raw =
            "From: Jane Doe <jane@example.com>\r\nReply-To: keep@example.com\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains("Reply-To: keep@example.com"));
        assert_eq!(result.added_reply_to, None);
        assert_eq!(result.text.matches("Reply-To:").count(), 1);
    }

    #[test]
    fn test_fromが抽出できなければreply_toは追加されない() {
        let raw = "Subject: hello\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(!result.text.contains("Reply-To:"));
        assert_eq!(result.added_reply_to, None);
    }

    #[test]
    fn test_折り返されたfromヘッダーも丸ごとreply_toになる() {
        let raw = "From: Jane Doe\r\n  <jane@example.com>\r\nSubject: x\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains("Reply-To: Jane Doe\r\n  <jane@example.com>\r\n"));
    }

    // ===== From 書き換えのテスト =====

    #[test]
    fn test_from_address設定時は表示名を残してアドレスを差し替える() {
        let raw = "From: Jane Doe <jane@example.com>\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains("From: Jane Doe <noreply@ferry.example.com>\r\n"));
        assert!(!result.text.contains("From: Jane Doe <jane@example.com>"));
    }

    #[test]
    fn test_from_address未設定時は元の受信者がfromアドレスになる() {
        let raw = "From: Jane Doe <jane@example.com>\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &RewriteConfig::default(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains(
            "From: Jane Doe at jane@example.com <info@ferry.example.com>\r\n"
        ));
    }

    #[test]
    fn test_表示名なしのfromも書き換えられる() {
        let raw = "From: jane@example.com\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains("From: jane@example.com <noreply@ferry.example.com>\r\n"));
    }

    // ===== Subject / To のテスト =====

    #[test]
    fn test_subject接頭辞が付く() {
        let raw = "From: a@example.com\r\nSubject: hello\r\n\r\nbody\r\n";
        let config = RewriteConfig {
            subject_prefix: Some("[FWD] ".to_string()),
            ..config_with_from()
        };
        let result = rewrite_for_forwarding(raw, &config, ORIGINAL_RECIPIENT);

        assert!(result.text.contains("Subject: [FWD] hello\r\n"));
    }

    #[test]
    fn test_接頭辞未設定ならsubjectはそのまま() {
        let raw = "From: a@example.com\r\nSubject: hello\r\n\r\nbody\r\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains("Subject: hello\r\n"));
    }

    #[test]
    fn test_to_address設定時はtoが上書きされる() {
        let raw = "From: a@example.com\r\nTo: original@example.com\r\n\r\nbody\r\n";
        let config = RewriteConfig {
            to_address: Some("forced@ferry.example.com".to_string()),
            ..config_with_from()
        };
        let result = rewrite_for_forwarding(raw, &config, ORIGINAL_RECIPIENT);

        assert!(result.text.contains("To: forced@ferry.example.com\r\n"));
        assert!(!result.text.contains("original@example.com"));
    }

    // ===== ヘッダー除去のテスト =====

    #[test]
    fn test_転送後に無効になるヘッダーが取り除かれる() {
        let raw = concat!(
            "Return-Path: <bounce@example.com>\r\n",
            "From: Jane Doe <jane@example.com>\r\n",
            "Sender: sender@example.com\r\n",
            "Message-ID: <abc123@example.com>\r\n",
            "Subject: hello\r\n",
            "\r\n",
            "body\r\n",
        );
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(!result.text.contains("Return-Path:"));
        assert!(!result.text.contains("Sender:"));
        assert!(!result.text.contains("Message-ID:"));
        assert!(result.text.contains("Subject: hello\r\n"));
    }

    #[test]
    fn test_折り返しを含むdkim署名がすべて取り除かれる() {
        let raw = concat!(
            "DKIM-Signature: v=1; a=rsa-sha256; d=example.com;\r\n",
            "  h=from:to:subject;\r\n",
            "  b=abcdef;\r\n",
            "From: Jane Doe <jane@example.com>\r\n",
            "DKIM-Signature: v=1; a=rsa-sha256; d=other.example.com; b=ghijkl;\r\n",
            "Subject: hello\r\n",
            "\r\n",
            "body\r\n",
        );
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(!result.text.contains("DKIM-Signature"));
        assert!(!result.text.contains("h=from:to:subject"));
        assert!(result.text.contains("Subject: hello\r\n"));
    }

    // ===== 本文保全のテスト =====

    #[test]
    fn test_本文ブロックは変更されない() {
        let raw = concat!(
            "From: Jane Doe <jane@example.com>\r\n",
            "Subject: hello\r\n",
            "\r\n",
            "From: this is body text, not a header\r\n",
            "Subject: also body\r\n",
            "message-id: still body\r\n",
        );
        let config = RewriteConfig {
            subject_prefix: Some("[FWD] ".to_string()),
            ..config_with_from()
        };
        let result = rewrite_for_forwarding(raw, &config, ORIGINAL_RECIPIENT);

        assert!(result.text.ends_with(concat!(
            "\r\n",
            "From: this is body text, not a header\r\n",
            "Subject: also body\r\n",
            "message-id: still body\r\n",
        )));
    }

    #[test]
    fn test_lf改行のメッセージも書き換えられる() {
        let raw = "From: Jane Doe <jane@example.com>\nSubject: hello\n\nbody\n";
        let result = rewrite_for_forwarding(raw, &config_with_from(), ORIGINAL_RECIPIENT);

        assert!(result.text.contains("From: Jane Doe <noreply@ferry.example.com>\n"));
        assert!(result.text.contains("Reply-To: Jane Doe <jane@example.com>\n"));
        assert!(result.text.ends_with("\nbody\n"));
    }
}
