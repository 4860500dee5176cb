//! # 転送 Lambda のライブラリ部分
//!
//! エントリーポイント（`main.rs`）から使用するモジュールを公開する。
//! パイプライン本体（[`handler::Forwarder`]）はインフラのトレイトに対して
//! ジェネリックであり、テストではインメモリモックを差し込む。

pub mod config;
pub mod error;
pub mod handler;
