//! # スタック管理（CloudFormation）
//!
//! 受信トリガー・保存バケット・通知キューを束ねるスタックを宣言的テンプレート
//! から作成・更新する。
//!
//! ## デプロイの流れ
//!
//! 1. `DescribeStacks` でスタックの存在を確認する
//! 2. 存在しなければ `CreateStack`、存在すれば `UpdateStack` を呼ぶ
//!    （「No updates are to be performed.」は変更なしの成功として扱う）
//! 3. 終端状態に到達するまで `DescribeStacks` をポーリングする
//!    （失敗状態・タイムアウトはエラー）
//!
//! ## 構造
//!
//! 生の API 呼び出しは [`StackApi`] の薄いシームに隔離する。分岐と
//! ポーリングのロジックは [`CfnStackDeployer`] に置き、テストでは
//! インメモリの `StackApi` 実装で駆動する。

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_cloudformation::{
    Client,
    error::ProvideErrorMetadata as _,
    types::{Capability, Parameter},
};
use tokio::time::{Instant, sleep};

use crate::InfraError;

/// デフォルトのポーリング間隔
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// デフォルトの完了待機上限（30 分）
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

/// デプロイ対象スタックの定義
#[derive(Debug, Clone)]
pub struct StackPlan {
    /// スタック名
    pub stack_name:    String,
    /// テンプレート本文（YAML / JSON）
    pub template_body: String,
    /// テンプレートパラメータ（キーと値の組）
    pub parameters:    Vec<(String, String)>,
    /// `CAPABILITY_NAMED_IAM` を付与するか（IAM リソースを含むテンプレートで必須）
    pub named_iam:     bool,
}

/// デプロイの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOutcome {
    /// 新規作成された
    Created,
    /// 更新された
    Updated,
    /// 変更なし（テンプレート・パラメータが現状と一致）
    Unchanged,
}

/// スタックデプロイのインターフェース
///
/// テスト時はモックに差し替え可能。
#[async_trait]
pub trait StackDeployer: Send + Sync {
    /// スタックを作成または更新し、完了まで待機する
    async fn deploy(&self, plan: &StackPlan) -> Result<StackOutcome, InfraError>;
}

/// DescribeStacks から抜き出したスタック状態
#[derive(Debug, Clone)]
pub struct StackState {
    /// 状態文字列（例: `CREATE_COMPLETE`）
    pub status:        String,
    /// 状態の理由（失敗時に入ることが多い）
    pub status_reason: Option<String>,
}

/// UpdateStack の受理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 更新が開始された
    Started,
    /// 変更なし（「No updates are to be performed.」）
    NoChanges,
}

/// CloudFormation API の薄いシーム
///
/// 生の SDK 呼び出しだけを担当する。デプロイの分岐とポーリングは
/// [`CfnStackDeployer`] 側にあり、このトレイトのインメモリ実装で
/// ネットワークなしにテストできる。
#[async_trait]
pub trait StackApi: Send + Sync {
    /// スタックの現在状態を取得する（存在しなければ `None`）
    async fn describe(&self, stack_name: &str) -> Result<Option<StackState>, InfraError>;

    /// スタックを新規作成する
    async fn create(&self, plan: &StackPlan) -> Result<(), InfraError>;

    /// スタックを更新する
    async fn update(&self, plan: &StackPlan) -> Result<UpdateOutcome, InfraError>;
}

/// `aws_sdk_cloudformation::Client` による [`StackApi`] 実装
pub struct SdkStackApi {
    client: Client,
}

impl SdkStackApi {
    /// SDK クライアントをラップする
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_sdk_parameters(plan: &StackPlan) -> Vec<Parameter> {
    plan.parameters
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

fn to_sdk_capabilities(plan: &StackPlan) -> Option<Vec<Capability>> {
    plan.named_iam.then(|| vec![Capability::CapabilityNamedIam])
}

#[async_trait]
impl StackApi for SdkStackApi {
    /// 存在しないスタックへの `DescribeStacks` はサービスエラーになるため、
    /// メッセージに「does not exist」を含むエラーは `None` として扱う。
    async fn describe(&self, stack_name: &str) -> Result<Option<StackState>, InfraError> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.stacks().first().map(|stack| StackState {
                status:        stack
                    .stack_status()
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                status_reason: stack.stack_status_reason().map(str::to_string),
            })),
            Err(err) => {
                let not_found = err
                    .meta()
                    .message()
                    .is_some_and(|msg| msg.contains("does not exist"));
                if not_found {
                    Ok(None)
                } else {
                    Err(InfraError::cloud_formation(format!(
                        "DescribeStacks の実行に失敗: {err}"
                    )))
                }
            }
        }
    }

    async fn create(&self, plan: &StackPlan) -> Result<(), InfraError> {
        self.client
            .create_stack()
            .stack_name(&plan.stack_name)
            .template_body(&plan.template_body)
            .set_parameters(Some(to_sdk_parameters(plan)))
            .set_capabilities(to_sdk_capabilities(plan))
            .send()
            .await
            .map_err(|e| InfraError::cloud_formation(format!("CreateStack の実行に失敗: {e}")))?;
        Ok(())
    }

    async fn update(&self, plan: &StackPlan) -> Result<UpdateOutcome, InfraError> {
        let result = self
            .client
            .update_stack()
            .stack_name(&plan.stack_name)
            .template_body(&plan.template_body)
            .set_parameters(Some(to_sdk_parameters(plan)))
            .set_capabilities(to_sdk_capabilities(plan))
            .send()
            .await;

        match result {
            Ok(_) => Ok(UpdateOutcome::Started),
            Err(err) => {
                let no_updates = err
                    .meta()
                    .message()
                    .is_some_and(|msg| msg.contains("No updates are to be performed"));
                if no_updates {
                    Ok(UpdateOutcome::NoChanges)
                } else {
                    Err(InfraError::cloud_formation(format!(
                        "UpdateStack の実行に失敗: {err}"
                    )))
                }
            }
        }
    }
}

/// CloudFormation スタックデプロイ
///
/// describe → create/update の分岐と完了待機のポーリングを実装する。
pub struct CfnStackDeployer<A = SdkStackApi> {
    api:           A,
    poll_interval: Duration,
    max_wait:      Duration,
}

impl CfnStackDeployer {
    /// デフォルトの待機設定（15 秒間隔・30 分上限）でデプロイヤを作成する
    pub fn new(client: Client) -> Self {
        Self::with_wait(client, DEFAULT_POLL_INTERVAL, DEFAULT_MAX_WAIT)
    }

    /// 待機設定を指定してデプロイヤを作成する
    pub fn with_wait(client: Client, poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            api: SdkStackApi::new(client),
            poll_interval,
            max_wait,
        }
    }
}

impl<A: StackApi> CfnStackDeployer<A> {
    #[cfg(test)]
    fn with_api(api: A, poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            api,
            poll_interval,
            max_wait,
        }
    }

    /// スタックが終端状態に到達するまでポーリングする
    async fn wait_for_completion(&self, stack_name: &str) -> Result<(), InfraError> {
        let started = Instant::now();

        loop {
            let state = self.api.describe(stack_name).await?.ok_or_else(|| {
                InfraError::cloud_formation(format!(
                    "スタック {stack_name} が DescribeStacks の結果に含まれません"
                ))
            })?;

            match classify_status(&state.status) {
                StackProgress::Succeeded => {
                    tracing::info!(
                        stack = stack_name,
                        status = %state.status,
                        "スタックが完了状態になりました"
                    );
                    return Ok(());
                }
                StackProgress::Failed => {
                    if let Some(reason) = &state.status_reason {
                        tracing::error!(
                            stack = stack_name,
                            status = %state.status,
                            reason,
                            "スタックが失敗状態になりました"
                        );
                    }
                    return Err(InfraError::stack_failed(stack_name, state.status));
                }
                StackProgress::InProgress => {
                    if started.elapsed() >= self.max_wait {
                        return Err(InfraError::stack_timeout(
                            stack_name,
                            started.elapsed().as_secs(),
                        ));
                    }
                    tracing::debug!(
                        stack = stack_name,
                        status = %state.status,
                        "スタックの完了を待機中"
                    );
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl<A: StackApi> StackDeployer for CfnStackDeployer<A> {
    async fn deploy(&self, plan: &StackPlan) -> Result<StackOutcome, InfraError> {
        let exists = self.api.describe(&plan.stack_name).await?.is_some();

        let outcome = if exists {
            match self.api.update(plan).await? {
                UpdateOutcome::NoChanges => {
                    tracing::info!(stack = %plan.stack_name, "スタックに変更はありません");
                    return Ok(StackOutcome::Unchanged);
                }
                UpdateOutcome::Started => StackOutcome::Updated,
            }
        } else {
            self.api.create(plan).await?;
            StackOutcome::Created
        };

        self.wait_for_completion(&plan.stack_name).await?;
        Ok(outcome)
    }
}

/// CloudFormation クライアントを作成する
///
/// 認証情報とリージョンは SDK のデフォルトチェーンで解決する。
pub async fn create_client() -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    Client::new(&config)
}

/// ポーリング中のスタック状態の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackProgress {
    /// 成功の終端状態
    Succeeded,
    /// まだ進行中
    InProgress,
    /// 回復しない失敗状態
    Failed,
}

/// スタック状態文字列を分類する
///
/// ロールバック系は進行中であっても失敗として即座に打ち切る
/// （待ち続けても成功状態には到達しない）。
fn classify_status(status: &str) -> StackProgress {
    match status {
        "CREATE_COMPLETE" | "UPDATE_COMPLETE" => StackProgress::Succeeded,
        s if s.ends_with("_IN_PROGRESS") && !s.contains("ROLLBACK") => StackProgress::InProgress,
        _ => StackProgress::Failed,
    }
}
